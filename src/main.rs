use std::env;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use tabload::{loader, LoadConfig, SchemaMap, DEFAULT_BATCH_SIZE};

/// Load tab-delimited extract files into a relational database.
#[derive(Parser, Debug)]
#[command(name = "tabload", version)]
struct Cli {
    /// Root directory containing extracted .txt data files.
    #[arg(long, default_value = "extracted")]
    indir: PathBuf,

    /// Directory containing *_columns.csv codebook files.
    #[arg(long, default_value = "database_info/codebook_tables")]
    codebook_dir: PathBuf,

    /// JSON file with per-table primary key, foreign key, and index
    /// metadata. Tables without an entry get a surrogate key.
    #[arg(long)]
    schema_map: Option<PathBuf>,

    /// Database URI (overrides DATABASE_URL from the environment or .env).
    #[arg(long)]
    db_uri: Option<String>,

    /// Rows accumulated per insert batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let database_url = match cli.db_uri.or_else(|| env::var("DATABASE_URL").ok()) {
        Some(url) => url,
        None => {
            eprintln!("database URI not provided and DATABASE_URL not set in environment or .env");
            process::exit(2);
        }
    };

    let schema_map = match &cli.schema_map {
        Some(path) => match SchemaMap::from_json_file(path) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("failed to read schema map {}: {}", path.display(), e);
                process::exit(2);
            }
        },
        None => SchemaMap::default(),
    };

    let config = LoadConfig {
        data_dir: cli.indir,
        codebook_dir: cli.codebook_dir,
        database_url,
        batch_size: cli.batch_size,
    };

    match loader::run(&config, &schema_map).await {
        Ok(report) => {
            println!("{:<45} {:>12}", "table", "rows");
            for table in &report.tables {
                match &table.error {
                    None => println!("{:<45} {:>12}", table.table_name, table.rows_inserted),
                    Some(e) => println!("{:<45} ERROR: {}", table.table_name, e),
                }
            }
        }
        Err(e) => {
            eprintln!("load failed: {}", e);
            process::exit(1);
        }
    }
}
