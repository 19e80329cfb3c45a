use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rainfall_register::export::write_exports;
use rainfall_register::register::{
    RawMetadataDocument, RawMonthlyDocument, RawTotalsDocument, RegisterTables, Tolerance,
};
use rainfall_register::services::{CleanedRegister, RawRegisterDocument, RegisterCleaningService};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One JSON file holding metadata, monthly and totals together
    Document,
    /// Separate metadata/monthly/totals files as written by the extractor
    Fragments,
    /// Every *.json document in a directory, cleaned in parallel
    Batch,
}

#[derive(Parser)]
#[command(name = "clean-register")]
#[command(about = "Clean and align OCR-extracted rainfall register data", long_about = None)]
struct Cli {
    /// Input mode
    #[arg(long, value_enum, default_value = "document")]
    mode: Mode,

    /// Combined register document (document mode)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Monthly grid JSON (fragments mode)
    #[arg(long)]
    monthly: Option<PathBuf>,

    /// Totals JSON (fragments mode)
    #[arg(long)]
    totals: Option<PathBuf>,

    /// Station metadata JSON (fragments mode, optional)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Directory of register documents (batch mode)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Years the page covers, comma separated (overrides year discovery)
    #[arg(long, value_delimiter = ',')]
    expected_years: Option<Vec<i32>>,

    /// Absolute tolerance for matching totals to monthly sums
    #[arg(long, env = "TOTALS_TOL_ABS", default_value_t = Tolerance::DEFAULT_ABS)]
    tol_abs: f64,

    /// Relative tolerance for matching totals to monthly sums
    #[arg(long, env = "TOTALS_TOL_REL", default_value_t = Tolerance::DEFAULT_REL)]
    tol_rel: f64,

    /// Keep exact zeros as values instead of treating them as missing
    #[arg(long)]
    keep_zero: bool,

    /// Number of documents cleaned concurrently (batch mode)
    #[arg(long, env = "CLEAN_WORKER_CONCURRENCY", default_value = "4")]
    parallel: usize,

    /// Directory the cleaned JSON files are written to
    #[arg(long, default_value = "cleaned")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let tables = if cli.keep_zero {
        RegisterTables::standard().keeping_zero()
    } else {
        RegisterTables::standard()
    };
    let service = RegisterCleaningService::new(tables, Tolerance::new(cli.tol_abs, cli.tol_rel)?);

    match cli.mode {
        Mode::Document => {
            let file = cli.file.ok_or("--file is required for document mode")?;
            let mut document: RawRegisterDocument = read_json(&file)?;
            if cli.expected_years.is_some() {
                document.expected_years = cli.expected_years;
            }
            clean_single(&service, &document, &cli.output_dir)?;
        }
        Mode::Fragments => {
            let monthly = cli.monthly.ok_or("--monthly is required for fragments mode")?;
            let totals = cli.totals.ok_or("--totals is required for fragments mode")?;
            let document = RawRegisterDocument {
                metadata: cli
                    .metadata
                    .as_deref()
                    .map(read_json::<RawMetadataDocument>)
                    .transpose()?,
                monthly: read_json::<RawMonthlyDocument>(&monthly)?,
                totals: read_json::<RawTotalsDocument>(&totals)?,
                expected_years: cli.expected_years,
            };
            clean_single(&service, &document, &cli.output_dir)?;
        }
        Mode::Batch => {
            let dir = cli.dir.ok_or("--dir is required for batch mode")?;
            clean_directory(&service, &dir, &cli.output_dir, cli.parallel).await?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("Malformed JSON in {}: {}", path.display(), e))?;
    Ok(value)
}

fn clean_single(
    service: &RegisterCleaningService,
    document: &RawRegisterDocument,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let cleaned = service.clean(document);
    let files = write_exports(&cleaned, output_dir)?;
    print_summary(&cleaned);
    println!("Wrote {}", files.monthly.display());
    println!("Wrote {}", files.totals.display());
    println!("Wrote {}", files.metadata.display());
    println!("Wrote {}", files.report.display());
    Ok(())
}

async fn clean_directory(
    service: &RegisterCleaningService,
    dir: &Path,
    output_dir: &Path,
    parallel: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    info!("Found {} register documents in {}", paths.len(), dir.display());

    let mut failed: Vec<(String, String)> = Vec::new();
    let mut documents = Vec::new();
    for path in &paths {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match read_json::<RawRegisterDocument>(path) {
            Ok(document) => documents.push((label, document)),
            Err(e) => failed.push((label, e.to_string())),
        }
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} documents ({msg})")
            .unwrap()
            .progress_chars("##-"),
    );

    let cleaned_ok = AtomicUsize::new(0);
    let cleaned_err = AtomicUsize::new(0);
    let results = service
        .clean_batch_with_progress(documents, parallel, |label, result| {
            match result {
                Ok(_) => cleaned_ok.fetch_add(1, Ordering::Relaxed),
                Err(_) => {
                    debug!("Cleaning {} failed", label);
                    cleaned_err.fetch_add(1, Ordering::Relaxed)
                }
            };
            pb.set_message(format!(
                "{} successful, {} failed",
                cleaned_ok.load(Ordering::Relaxed),
                cleaned_err.load(Ordering::Relaxed)
            ));
            pb.inc(1);
        })
        .await;

    let mut successful = 0;
    let mut with_warnings = 0;
    for (label, result) in results {
        match result.and_then(|cleaned| {
            write_exports(&cleaned, &output_dir.join(&label)).map(|_| cleaned)
        }) {
            Ok(cleaned) => {
                successful += 1;
                if !cleaned.warnings.is_empty() {
                    with_warnings += 1;
                }
            }
            Err(e) => {
                error!("Failed to clean {}: {}", label, e);
                failed.push((label, e.to_string()));
            }
        }
    }

    pb.finish_with_message(format!(
        "Complete: {} successful, {} failed",
        successful,
        failed.len()
    ));

    println!("\n============================================================");
    println!("Batch Cleaning Summary");
    println!("============================================================");
    println!("Documents:          {}", paths.len());
    println!("Cleaned:            {successful}");
    println!("With warnings:      {with_warnings}");
    println!("Failed:             {}", failed.len());
    println!("------------------------------------------------------------");
    println!("Total Time:         {:.2}s", start_time.elapsed().as_secs_f64());
    println!("============================================================");

    if !failed.is_empty() {
        println!("\nFailed Documents:");
        for (label, error) in &failed {
            println!("  {label}: {error}");
        }
        return Err(format!("{} documents failed to clean", failed.len()).into());
    }

    Ok(())
}

fn print_summary(cleaned: &CleanedRegister) {
    println!("\n============================================================");
    println!("Register Cleaning Summary");
    println!("============================================================");
    if let Some(meta) = &cleaned.metadata {
        for field in rainfall_register::register::MetadataField::ALL {
            println!("{:<20}{}", format!("{}:", field.label()), meta.display_value(field));
        }
        println!("------------------------------------------------------------");
    }
    for block in &cleaned.monthly.years {
        let total = cleaned
            .totals
            .total_for(block.year)
            .map(|t| t.to_token())
            .unwrap_or_else(|| "-".to_string());
        let sum = block
            .sum()
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  months {:>2}/12  sum {:>8}  total {:>8}",
            block.year,
            block.present_months(),
            sum,
            total
        );
    }
    println!("============================================================");
    for warning in &cleaned.warnings {
        println!("⚠ {warning}");
    }
}
