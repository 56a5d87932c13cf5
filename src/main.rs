//! heapdb - inspect and build heap files

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use heapdb::access::DbFileIterator;
use heapdb::catalog::{Catalog, Schema};
use heapdb::config::HeapConfig;
use heapdb::storage::disk::encoder::{encode_rows, parse_row};
use heapdb::storage::{BufferPool, DbFile, HeapFile, HeapPage};
use heapdb::transaction::TransactionIdGenerator;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Page size in bytes (overrides the configuration file)
    #[arg(short, long, global = true)]
    page_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identity and geometry of a heap file
    Info {
        file: PathBuf,
        /// Column types, e.g. `int,varchar,bool`
        #[arg(short, long)]
        schema: String,
    },
    /// Print every record of a heap file
    Scan {
        file: PathBuf,
        #[arg(short, long)]
        schema: String,
        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Build a heap file from comma separated text, one record per line
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long)]
        schema: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => HeapConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HeapConfig::default(),
    };
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }
    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Info { file, schema } => info(&config, file, &schema),
        Command::Scan {
            file,
            schema,
            limit,
        } => scan(&config, file, &schema, limit),
        Command::Convert {
            input,
            output,
            schema,
        } => convert(&config, input, output, &schema),
    }
}

fn open_heap_file(config: &HeapConfig, path: PathBuf, schema: &str) -> Result<Arc<HeapFile>> {
    let schema = Arc::new(Schema::parse(schema).context("Invalid schema")?);
    let file = HeapFile::new(&path, schema, config)
        .with_context(|| format!("Failed to open heap file {}", path.display()))?;
    Ok(Arc::new(file))
}

fn info(config: &HeapConfig, path: PathBuf, schema: &str) -> Result<()> {
    let file = open_heap_file(config, path, schema)?;
    let record_size = file.schema().record_size();

    println!("path:           {}", file.path().display());
    println!("file id:        {}", file.file_id().0);
    println!("page size:      {}", file.page_size());
    println!("pages:          {}", file.num_pages()?);
    println!("record size:    {}", record_size);
    println!(
        "slots per page: {}",
        HeapPage::slot_count_for(file.page_size(), record_size)
    );
    Ok(())
}

fn scan(config: &HeapConfig, path: PathBuf, schema: &str, limit: Option<usize>) -> Result<()> {
    let file = open_heap_file(config, path, schema)?;
    let catalog = Arc::new(Catalog::new());
    catalog.add_table("scan", Arc::clone(&file) as Arc<dyn DbFile>);
    let pool = BufferPool::new(catalog, config)?;

    let txn = TransactionIdGenerator::new().next();
    let mut records = file.iterator(txn, pool.shared());
    records.open()?;

    let mut count = 0;
    while limit.map_or(true, |limit| count < limit) {
        let Some(record) = records.next_record()? else {
            break;
        };
        let line: Vec<String> = record.values.iter().map(ToString::to_string).collect();
        println!("{}", line.join("\t"));
        count += 1;
    }

    records.close();
    pool.transaction_complete(txn);
    println!("({count} records)");
    Ok(())
}

fn convert(config: &HeapConfig, input: PathBuf, output: PathBuf, schema: &str) -> Result<()> {
    let schema = Arc::new(Schema::parse(schema).context("Invalid schema")?);
    let reader = BufReader::new(
        std::fs::File::open(&input)
            .with_context(|| format!("Failed to open {}", input.display()))?,
    );

    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line, &schema)
            .with_context(|| format!("{}:{}", input.display(), line_no + 1))?;
        rows.push(row);
    }

    let count = rows.len();
    let pages = encode_rows(&output, &schema, config.page_size, rows)?;
    println!(
        "wrote {count} records in {pages} pages to {}",
        output.display()
    );
    Ok(())
}
