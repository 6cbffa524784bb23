use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use outage_extract::classify::classify_row;
use outage_extract::context::ScheduleContext;
use outage_extract::types::NormalizedRecord;
use outage_extract::{ExtractConfig, InputFormat, Reconciler, extract_document, load_rows};

const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Parser)]
#[command(
    name = "outage-extract",
    about = "Address extractor for power-outage schedule tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract address records from a schedule → <out>/*.json
    Extract {
        /// Row file (csv, json, txt) or a directory of them
        input: PathBuf,
        /// Input format; guessed from the extension when omitted
        #[arg(long)]
        format: Option<String>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,
    },
    /// Re-run settlement repair over an existing addresses.json
    Reconcile {
        records: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,
    },
    /// Print each row's classification and the context after it
    Classify {
        input: PathBuf,
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            input,
            format,
            config,
            out,
        } => run_extract(&input, format.as_deref(), config.as_deref(), &out),
        Command::Reconcile {
            records,
            config,
            out,
        } => run_reconcile(&records, config.as_deref(), &out),
        Command::Classify { input, format } => run_classify(&input, format.as_deref()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════
//  OUTPUT FILE HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn load_config(path: Option<&Path>) -> anyhow::Result<ExtractConfig> {
    match path {
        Some(path) => ExtractConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ExtractConfig::default()),
    }
}

fn parse_format(format: Option<&str>) -> anyhow::Result<Option<InputFormat>> {
    Ok(format.map(str::parse::<InputFormat>).transpose()?)
}

fn write_json<T: serde::Serialize>(dir: &Path, name: &str, data: &T) -> anyhow::Result<()> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(&path, &json).with_context(|| format!("cannot write {}", path.display()))?;
    info!("  {} ({} bytes)", path.display(), json.len());
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  EXTRACT MODE
// ═══════════════════════════════════════════════════════════════════════

fn run_extract(
    input: &Path,
    format: Option<&str>,
    config: Option<&Path>,
    out: &Path,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let rows = load_rows(input, parse_format(format)?)
        .with_context(|| format!("loading rows from {}", input.display()))?;
    info!("{} rows from {}", rows.len(), input.display());

    let report = extract_document(&rows, &config)
        .with_context(|| format!("extracting {}", input.display()))?;

    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;
    write_json(out, "addresses.json", &report.records)?;
    write_json(out, "unresolved.json", &report.unresolved)?;
    write_json(out, "unparsed.json", &report.unparsed)?;
    write_json(
        out,
        "stats.json",
        &serde_json::json!({
            "extract": report.stats,
            "reconcile": report.reconcile,
            "slot_counts": report.slot_counts,
        }),
    )?;

    info!(
        "{} records, {} unresolved, {} unparsed rows",
        report.records.len(),
        report.unresolved.len(),
        report.unparsed.len()
    );
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  RECONCILE MODE: repair an existing records file
// ═══════════════════════════════════════════════════════════════════════

fn run_reconcile(records: &Path, config: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let json = std::fs::read_to_string(records)
        .with_context(|| format!("cannot read {}", records.display()))?;
    let input: Vec<NormalizedRecord> = serde_json::from_str(&json)
        .with_context(|| format!("cannot parse {}", records.display()))?;
    info!("{} records from {}", input.len(), records.display());

    let reconciled = Reconciler::new(&config.reconcile).reconcile(input);

    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;
    write_json(out, "addresses.json", &reconciled.records)?;
    write_json(out, "unresolved.json", &reconciled.unresolved)?;
    write_json(out, "reconcile_stats.json", &reconciled.stats)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  CLASSIFY MODE: row-by-row trace to stdout
// ═══════════════════════════════════════════════════════════════════════

fn run_classify(input: &Path, format: Option<&str>) -> anyhow::Result<()> {
    let rows = load_rows(input, parse_format(format)?)
        .with_context(|| format!("loading rows from {}", input.display()))?;

    let mut context = ScheduleContext::default();
    for (i, row) in rows.iter().enumerate() {
        let Some(lead) = row.lead() else {
            println!("{:>5}  empty", i + 1);
            continue;
        };
        let kind = classify_row(lead);
        context = context.transition(&kind);
        println!(
            "{:>5}  {:<40} {} [{}] {}",
            i + 1,
            format!("{kind:?}"),
            context.branch.as_deref().unwrap_or("-"),
            context.slot_key().unwrap_or_else(|| "-".to_string()),
            truncate(row.address_cell(), 60)
        );
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
