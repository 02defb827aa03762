//! gdsn-transform: Transform records with a mapping profile
//!
//! Usage:
//!   # Transform a single record or an array of records
//!   gdsn-transform --profile profile.json record.json
//!
//!   # Read from stdin
//!   cat record.json | gdsn-transform -p profile.json --compact
//!
//!   # Process NDJSON, one output record per line
//!   gdsn-transform -p profile.json --ndjson records.jsonl

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use gdsn_transform::{transform_json, GdsnTransformer, TenantSettings, TransformProfile};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gdsn-transform")]
#[command(about = "Transform records into another schema using a field mapping profile", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Transform profile (JSON)
    #[arg(long, short = 'p')]
    profile: String,

    /// Process newline-delimited JSON (one record per line)
    #[arg(long)]
    ndjson: bool,

    /// Delimiter joining the parts of a composite context key
    #[arg(long, default_value = "_")]
    context_delimiter: String,

    /// Write compact instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let profile = TransformProfile::from_path(&args.profile)?;
    let tenant = TenantSettings::new(args.context_delimiter.clone());
    let transformer = GdsnTransformer::new(&profile, &tenant)
        .with_context(|| format!("Invalid transform profile: {}", args.profile))?;
    tracing::debug!("{}", transformer);

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.ndjson {
        let count = transform_json(reader, &mut out, &transformer)?;
        tracing::info!("Transformed {} records", count);
    } else {
        let output = transform_document(reader, &transformer)?;
        if args.compact {
            serde_json::to_writer(&mut out, &output)?;
        } else {
            serde_json::to_writer_pretty(&mut out, &output)?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

/// Transform a whole JSON document: a single record, or an array of records
fn transform_document(mut reader: Box<dyn BufRead>, transformer: &GdsnTransformer) -> Result<Value> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;

    let input: Value = simd_json::serde::from_slice(&mut content).context("Failed to parse JSON")?;

    match input {
        Value::Array(records) => records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                transformer
                    .transform(record)
                    .with_context(|| format!("Failed to transform record {}", index))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        record => Ok(transformer.transform(&record)?),
    }
}
