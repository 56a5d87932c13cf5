//! Offline construction of heap files.
//!
//! The heap file itself is read-only; these helpers lay out a fresh file from
//! rows (or ready-made pages) in one pass, the way a bulk loader would.

use crate::access::value::{DataType, Value, ValueError};
use crate::catalog::schema::Schema;
use crate::storage::disk::heap_file::{file_id_for_path, resolve_path};
use crate::storage::error::StorageResult;
use crate::storage::page::{HeapPage, Page, PageId};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Write `pages` back to back, replacing any existing file at `path`.
pub fn write_pages(path: &Path, pages: &[HeapPage]) -> StorageResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for page in pages {
        writer.write_all(&page.to_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Pack `rows` into as few pages as possible and write them to `path`.
/// Returns the number of pages written.
pub fn encode_rows<I>(
    path: &Path,
    schema: &Arc<Schema>,
    page_size: usize,
    rows: I,
) -> StorageResult<u32>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let file_id = file_id_for_path(&resolve_path(path)?);

    let mut page_no = 0u32;
    let mut page = HeapPage::empty(PageId::new(file_id, page_no), Arc::clone(schema), page_size);

    for row in rows {
        if page.free_slots() == 0 {
            writer.write_all(&page.to_bytes())?;
            page_no += 1;
            page = HeapPage::empty(PageId::new(file_id, page_no), Arc::clone(schema), page_size);
        }
        page.insert_record(row)?;
    }

    // A partially filled last page is still written; an empty input yields an empty file
    if page.used_slots() > 0 {
        writer.write_all(&page.to_bytes())?;
        page_no += 1;
    }
    writer.flush()?;

    Ok(page_no)
}

/// Parse one comma separated line into values of `schema`.
pub fn parse_row(line: &str, schema: &Schema) -> Result<Vec<Value>, ValueError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != schema.len() {
        return Err(ValueError::ArityMismatch {
            values: fields.len(),
            columns: schema.len(),
        });
    }

    fields
        .into_iter()
        .zip(schema.columns())
        .map(|(field, column)| match column.data_type {
            DataType::Int32 => field
                .parse::<i32>()
                .map(Value::Int32)
                .map_err(|_| ValueError::TypeMismatch {
                    value: Value::String(field.to_string()),
                    data_type: DataType::Int32,
                }),
            DataType::Boolean => match field.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Value::Boolean(true)),
                "false" | "f" | "0" => Ok(Value::Boolean(false)),
                _ => Err(ValueError::TypeMismatch {
                    value: Value::String(field.to_string()),
                    data_type: DataType::Boolean,
                }),
            },
            DataType::Varchar => Ok(Value::String(field.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_encode_rows_fills_pages() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.dat");
        let schema = Arc::new(Schema::from_types(&[DataType::Int32, DataType::Int32]));
        let per_page = HeapPage::slot_count_for(4096, schema.record_size());

        let rows = (0..(per_page + 3) as i32).map(|i| vec![Value::Int32(i), Value::Int32(-i)]);
        let pages = encode_rows(&path, &schema, 4096, rows)?;

        assert_eq!(pages, 2);
        assert_eq!(std::fs::metadata(&path)?.len(), 2 * 4096);
        Ok(())
    }

    #[test]
    fn test_encode_no_rows_gives_empty_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.dat");
        let schema = Arc::new(Schema::from_types(&[DataType::Boolean]));

        assert_eq!(encode_rows(&path, &schema, 4096, Vec::new())?, 0);
        assert_eq!(std::fs::metadata(&path)?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_parse_row() {
        let schema = Schema::parse("int,varchar,bool").unwrap();
        assert_eq!(
            parse_row(" 42, Alice ,true", &schema).unwrap(),
            vec![
                Value::Int32(42),
                Value::String("Alice".to_string()),
                Value::Boolean(true)
            ]
        );
        assert!(parse_row("x,Alice,true", &schema).is_err());
        assert!(parse_row("1,Alice,maybe", &schema).is_err());
        assert!(matches!(
            parse_row("1,Alice", &schema),
            Err(ValueError::ArityMismatch { .. })
        ));
    }
}
