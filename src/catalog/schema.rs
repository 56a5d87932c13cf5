//! Record layout descriptors.

use crate::access::value::{DataType, ValueError};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Describes the fixed layout shared by every record of a heap file.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a schema with generated column names (`col0`, `col1`, ...).
    pub fn from_types(types: &[DataType]) -> Self {
        let columns = types
            .iter()
            .enumerate()
            .map(|(i, ty)| Column::new(format!("col{i}"), *ty))
            .collect();
        Self { columns }
    }

    /// Parse a comma separated type list such as `int,varchar,bool`.
    pub fn parse(list: &str) -> Result<Self, ValueError> {
        let types = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<DataType>, _>>()?;
        Ok(Self::from_types(&types))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Size in bytes of one record.
    pub fn record_size(&self) -> usize {
        self.columns.iter().map(|c| c.data_type.width()).sum()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::VARCHAR_LEN;

    #[test]
    fn test_record_size() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Int32),
            Column::new("name", DataType::Varchar),
            Column::new("active", DataType::Boolean),
        ]);
        assert_eq!(schema.record_size(), 4 + 4 + VARCHAR_LEN + 1);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
    }

    #[test]
    fn test_parse() {
        let schema = Schema::parse("int, varchar,bool").unwrap();
        assert_eq!(
            schema.types(),
            vec![DataType::Int32, DataType::Varchar, DataType::Boolean]
        );
        assert_eq!(schema.columns()[2].name, "col2");

        assert!(Schema::parse("int,blob").is_err());
        assert!(Schema::parse("").unwrap().is_empty());
    }
}
