//! Spindle CLI - partial inclusion dependency discovery over CSV files.

mod cli;

use clap::Parser;
use colored::Colorize;
use log::info;
use spindle::{
    CsvReaderConfig, CsvTableReader, DiscoveryResult, Result, Spindle, SpindleConfig, TableReader,
};

use cli::Cli;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SpindleConfig {
        threshold: cli.threshold,
        null_handling: cli.nulls.into(),
        duplicate_handling: cli.duplicates.into(),
        temp_dir: cli.temp_dir.clone(),
        ..SpindleConfig::default()
    };
    if let Some(threads) = cli.threads {
        config.workers = threads;
    }

    let reader_config = CsvReaderConfig {
        delimiter: cli.delimiter.map(|c| c as u8).unwrap_or(b','),
        has_header: !cli.no_header,
        null_token: cli.null_token.clone().unwrap_or_default(),
        ..CsvReaderConfig::default()
    };

    let mut tables: Vec<Box<dyn TableReader + Send>> = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let reader = CsvTableReader::with_config(path, reader_config.clone())?;
        info!("opened table '{}'", reader.table_name());
        tables.push(Box::new(reader));
    }

    let result = Spindle::with_config(config).discover(tables)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text(&result);
    }
    Ok(())
}

fn print_text(result: &DiscoveryResult) {
    let summary = &result.summary;
    println!(
        "{} {} pINDs across {} columns in {} tables ({} spill files)",
        "Discovered".green().bold(),
        summary.pind_count,
        summary.column_count,
        summary.table_count,
        summary.spill_files,
    );
    for pind in &result.pinds {
        println!(
            "{}.{} < {}.{}  ({:.3})",
            pind.dependent_table,
            pind.dependent_column,
            pind.referenced_table,
            pind.referenced_column,
            pind.confidence,
        );
    }
    println!(
        "phases: ingest {}ms, sort {}ms, discovery {}ms",
        summary.ingest_ms, summary.sort_ms, summary.discovery_ms,
    );
}
