//! boltwire: inspect SQL scripts and wire payloads from the command line
//!
//! # Usage
//!
//! ```bash
//! # Show how a script splits and where its markers are
//! boltwire split migrations.sql
//!
//! # Bind parameters
//! boltwire bind "SELECT * FROM t WHERE id IN (?, ?)" --bind 5,7
//!
//! # Decode a (compressed) response body
//! boltwire decode response.bin --compressed --format json
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use boltwire::config::OutputFormat;
use boltwire::prelude::*;
use boltwire::result::open_compressed;

#[derive(Parser)]
#[command(name = "boltwire")]
#[command(version)]
#[command(about = "SQL splitting, parameter binding and wire payload decoding", long_about = None)]
#[command(after_help = "EXAMPLES:
    boltwire split script.sql
    boltwire bind 'SELECT * FROM t WHERE id IN (?, ?)' --bind 5,7
    boltwire compress body.tsv body.lz4
    boltwire decode body.lz4 --compressed --format json")]
struct Cli {
    /// Config file (default: ./boltwire.toml, then the user config dir)
    #[arg(short, long, global = true, env = "BOLTWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a script into statements and describe each one
    Split {
        /// SQL file, or - for stdin
        file: String,
    },
    /// Bind values to the ? markers of a statement or script
    Bind {
        /// The SQL text
        sql: String,

        /// Values for the markers, in order
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,
    },
    /// Decode a response body into typed rows
    Decode {
        /// Response file, or - for stdin
        file: String,

        /// The body is a stream of compressed blocks
        #[arg(long)]
        compressed: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<Format>,
    },
    /// Write a file as compressed blocks
    Compress {
        /// Input file, or - for stdin
        input: String,

        /// Output file
        output: PathBuf,

        /// Plaintext bytes per block
        #[arg(long)]
        block_size: Option<usize>,
    },
    /// Print the CityHash128 of a file
    Hash {
        /// Input file, or - for stdin
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("boltwire=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("boltwire=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = BoltConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match &cli.command {
        Commands::Split { file } => split_script(file),
        Commands::Bind { sql, bind } => bind_sql(sql, bind),
        Commands::Decode {
            file,
            compressed,
            format,
        } => {
            let compressed = *compressed || config.decode.compressed;
            let format = format.unwrap_or(match config.output.format {
                OutputFormat::Table => Format::Table,
                OutputFormat::Json => Format::Json,
            });
            decode_body(file, compressed, format, &config)
        }
        Commands::Compress {
            input,
            output,
            block_size,
        } => compress_file(input, output, block_size.unwrap_or(config.codec.max_block_size)),
        Commands::Hash { file } => hash_file(file),
    }
}

fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    Ok(Box::new(file))
}

fn read_input(path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    open_input(path)?
        .read_to_end(&mut buf)
        .with_context(|| format!("reading {path}"))?;
    Ok(buf)
}

fn split_script(path: &str) -> Result<()> {
    let sql = String::from_utf8(read_input(path)?).context("script is not valid UTF-8")?;
    let batch = boltwire::split(&sql)?;

    if batch.is_empty() {
        println!("{}", "(no statements)".dimmed());
        return Ok(());
    }

    for (i, statement) in batch.iter().enumerate() {
        let kind = match statement.statement_type() {
            StatementType::Query => "QUERY".green(),
            StatementType::NonQuery => "NON_QUERY".yellow(),
            StatementType::ParamSetting => "SET".cyan(),
        };
        let span = statement.span();
        println!(
            "{} {} {}",
            format!("[{}]", i + 1).bold(),
            kind.bold(),
            format!("bytes {}..{}", span.start, span.end).dimmed()
        );

        match statement.kind() {
            StatementKind::Query { db, table } => {
                if let Some(db) = db {
                    println!("  {} {}", "Database:".dimmed(), db.white());
                }
                if let Some(table) = table {
                    println!("  {} {}", "Table:".dimmed(), table.white());
                }
            }
            StatementKind::SetParam { key, value } => {
                println!("  {} {} = {}", "Param:".dimmed(), key.cyan(), value.yellow());
            }
            StatementKind::NonQuery => {}
        }

        if !statement.markers().is_empty() {
            let offsets: Vec<String> = statement
                .markers()
                .iter()
                .map(|m| format!("?{}@{}", m.id, m.offset))
                .collect();
            println!("  {} {}", "Markers:".dimmed(), offsets.join(" ").yellow());
        }
        println!("  {}", statement.clean_sql().white());
    }

    println!();
    println!(
        "{} statement(s), {} marker(s)",
        batch.len().to_string().cyan(),
        batch.total_markers().to_string().cyan()
    );
    Ok(())
}

/// Number, then float, then boolean, else text. Words like `nan` or `inf`
/// stay text.
fn infer_param(raw: &str) -> ParamValue {
    let has_digit = raw.bytes().any(|b| b.is_ascii_digit());
    if let Ok(n) = raw.parse::<i64>() {
        ParamValue::Int(n)
    } else if let Some(f) = raw.parse::<f64>().ok().filter(|_| has_digit) {
        ParamValue::Float(f)
    } else if raw == "true" {
        ParamValue::Bool(true)
    } else if raw == "false" {
        ParamValue::Bool(false)
    } else {
        ParamValue::Text(raw.to_string())
    }
}

fn bind_sql(sql: &str, bindings: &[String]) -> Result<()> {
    let batch = boltwire::split(sql)?;
    let literals: HashMap<usize, String> = bindings
        .iter()
        .enumerate()
        .map(|(i, raw)| (i + 1, infer_param(raw).render()))
        .collect();

    for bound in batch.bind_all(&literals)? {
        println!("{}", bound.white());
    }
    Ok(())
}

fn decode_body(path: &str, compressed: bool, format: Format, config: &BoltConfig) -> Result<()> {
    let input = open_input(path)?;
    if compressed {
        let cursor = open_compressed(input, config.codec.read_max_block_size)?;
        print_rows(cursor, format)
    } else {
        let cursor = ResultCursor::open(input)?;
        print_rows(cursor, format)
    }
}

fn print_rows<R: Read>(mut cursor: ResultCursor<R>, format: Format) -> Result<()> {
    let mut rows: Vec<Vec<TypedValue>> = Vec::new();
    while cursor.next()? {
        let values = cursor
            .values()
            .with_context(|| format!("decoding row {}", cursor.row_count()))?;
        rows.push(values);
    }
    let columns = cursor.columns().to_vec();
    cursor.close();

    match format {
        Format::Json => {
            let objects: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let map: serde_json::Map<String, serde_json::Value> = columns
                        .iter()
                        .zip(row)
                        .map(|(column, value)| (column.name.clone(), value.to_json()))
                        .collect();
                    serde_json::Value::Object(map)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects)?);
        }
        Format::Table => print_table(&columns, &rows),
    }
    Ok(())
}

fn print_table(columns: &[WireColumn], rows: &[Vec<TypedValue>]) {
    if columns.is_empty() {
        println!("{}", "(empty result)".dimmed());
        return;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(TypedValue::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| c.name.chars().count().max(c.type_name().chars().count()))
        .collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c.name, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let types: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c.type_name(), width = *w))
        .collect();
    println!("{}", types.join(" │ ").dimmed());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(columns.iter().zip(&widths))
            .map(|(cell, (column, w))| {
                if column.kind.is_numeric() {
                    format!("{:>width$}", cell, width = *w)
                } else {
                    format!("{:width$}", cell, width = *w)
                }
            })
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn compress_file(input: &str, output: &Path, block_size: usize) -> Result<()> {
    let plain = read_input(input)?;
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;

    let mut writer = FrameWriter::with_block_size(BufWriter::new(file), block_size);
    writer.write_all(&plain)?;
    writer.flush()?;
    let blocks = writer.blocks_written();
    writer.finish()?.flush()?;

    let written = fs::metadata(output).map(|m| m.len()).unwrap_or_default();
    println!(
        "{} {} bytes -> {} bytes in {} block(s)",
        "✓".green(),
        plain.len(),
        written,
        blocks.to_string().cyan()
    );
    Ok(())
}

fn hash_file(path: &str) -> Result<()> {
    let data = read_input(path)?;
    let (low, high) = hash128(&data);
    println!("{low:016x}{high:016x}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_param_kinds() {
        assert_eq!(infer_param("42"), ParamValue::Int(42));
        assert_eq!(infer_param("-1.5"), ParamValue::Float(-1.5));
        assert_eq!(infer_param("1e3"), ParamValue::Float(1000.0));
        assert_eq!(infer_param("true"), ParamValue::Bool(true));
        assert_eq!(infer_param("alice"), ParamValue::Text("alice".to_string()));
    }

    #[test]
    fn test_infer_param_float_words_stay_text() {
        for word in ["nan", "NaN", "inf", "-inf", "infinity", "Infinity"] {
            assert_eq!(infer_param(word), ParamValue::Text(word.to_string()), "{word}");
            assert_eq!(infer_param(word).render(), format!("'{word}'"));
        }
    }
}
