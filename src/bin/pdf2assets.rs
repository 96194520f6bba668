//! CLI binary for pdf2assets.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the requested stage, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2assets::{
    inspect_documents, run_curation, run_detection, run_fallback, run_harvest,
    run_missing_report, run_pipeline, PipelineConfig, PipelineObserver, PipelineSummary, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal progress observer: one bar per stage, per-page and per-item log
/// lines printed above it. The pipeline is sequential, so events arrive in
/// order; the mutexes only satisfy `Send + Sync`.
struct CliObserver {
    /// Bar for the stage currently running; replaced on each stage start.
    bar: Mutex<ProgressBar>,
    /// Which stage the item events belong to.
    stage: Mutex<Stage>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(ProgressBar::hidden()),
            stage: Mutex::new(Stage::Detection),
        })
    }
}

/// Bar with a counter when the stage knows its unit total, spinner otherwise.
fn stage_bar(total_units: usize) -> ProgressBar {
    let ticks: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];
    if total_units == 0 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(ticks),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        let bar = ProgressBar::new(total_units as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(ticks),
        );
        bar
    }
}

impl PipelineObserver for CliObserver {
    fn on_stage_start(&self, stage: Stage, total_units: usize) {
        *self.stage.lock().unwrap() = stage;
        let bar = stage_bar(total_units);
        bar.set_prefix(match stage {
            Stage::Detection => "Detecting",
            Stage::Harvest => "Harvesting",
            Stage::Fallback => "Matching",
            Stage::Curation => "Cleaning",
        });
        let mut guard = self.bar.lock().unwrap();
        guard.finish_and_clear();
        *guard = bar;
    }

    fn on_page_processed(&self, stage: Stage, page: u32, found: usize, wanted: usize) {
        let bar = self.bar.lock().unwrap();
        if stage == Stage::Detection {
            let tick = if found >= wanted { green("✓") } else { cyan("⚠") };
            bar.println(format!("  {tick} Page {page:>3}  {found}/{wanted} photos"));
        }
        bar.inc(1);
    }

    fn on_item_matched(&self, item_id: &str, filename: &str) {
        // Detection already reports matches in its per-page lines.
        if *self.stage.lock().unwrap() != Stage::Fallback {
            return;
        }
        let bar = self.bar.lock().unwrap();
        bar.println(format!("  {} {item_id:<12}  {}", green("✓"), dim(filename)));
        bar.inc(1);
    }

    fn on_item_unresolved(&self, item_id: &str, page: u32) {
        let stage = *self.stage.lock().unwrap();
        let bar = self.bar.lock().unwrap();
        match stage {
            Stage::Detection => {
                bar.println(format!("  {} Page {page:>3}  item {item_id} missing", red("✗")));
            }
            Stage::Fallback => {
                bar.println(format!(
                    "  {} {item_id:<12}  {}",
                    red("✗"),
                    dim(&format!("page {page}"))
                ));
                bar.inc(1);
            }
            _ => {}
        }
    }

    fn on_stage_complete(&self, stage: Stage, handled: usize) {
        let bar = self.bar.lock().unwrap();
        bar.finish_and_clear();
        let count = bold(&handled.to_string());
        match stage {
            Stage::Detection => eprintln!("{} {count} photos assigned by detection", green("✔")),
            Stage::Harvest => eprintln!("{} {count} embedded images pooled", green("✔")),
            Stage::Fallback => eprintln!("{} {count} items recovered from the pool", green("✔")),
            Stage::Curation => eprintln!("{} {count} manifest entries dropped", green("✔")),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline over a two-part catalog
  pdf2assets run part1.pdf part2.pdf

  # Detection only, custom manifest and output directory
  pdf2assets --manifest catalog.json --output-dir product_images detect part1.pdf

  # Rebuild the raw embedded-image pool
  pdf2assets harvest part1.pdf part2.pdf

  # Recover items the detector missed
  pdf2assets match part1.pdf part2.pdf

  # Drop junk and duplicate photos
  pdf2assets clean

  # List items still without a photo
  pdf2assets report --out missing_photos.txt

  # Page and embedded-image counts (no manifest needed)
  pdf2assets inspect part1.pdf

STAGES:
  detect    render each product page, crop the photo band above the table,
            pair photos with items in reading order, log shortfalls
  harvest   decode every embedded image into the raw pool
  match     find an item's id in the page text, copy that page's pool image
  clean     drop undersized, banner-shaped, and duplicate photos
  report    write "item | description" lines for photos still missing

FILES:
  catalog.json          product manifest: products[] plus tracked images[]
  product_images/       canonical Page{n}_{item}_{description}.png crops
  raw_images/           pool of embedded images, {doc}_P{n}_I{i}.png
  extraction_log.txt    per-page detection results and missing items
  missing_photos.txt    items with no usable photo after all stages

ENVIRONMENT VARIABLES:
  PDF2ASSETS_MANIFEST       Manifest path (default catalog.json)
  PDF2ASSETS_OUTPUT_DIR     Canonical photo directory (default product_images)
  PDF2ASSETS_POOL_DIR       Raw pool directory (default raw_images)
  PDF2ASSETS_ZOOM           Render scale (default 2)
  PDF2ASSETS_MIN_PHOTO_PX   Junk filter: minimum photo side (default 45)
  PDF2ASSETS_MAX_ASPECT     Junk filter: aspect-ratio limit (default 4)
  PDFIUM_LIB_PATH           Directory holding the pdfium shared library

SETUP:
  pdfium is loaded at runtime, not linked. Drop libpdfium.so (or the
  platform equivalent) next to the binary, or point PDFIUM_LIB_PATH at
  its directory. Prebuilt libraries:
  https://github.com/bblanchon/pdfium-binaries
"#;

/// Extract per-product photos from PDF catalogs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2assets",
    version,
    about = "Extract per-product photos from PDF catalogs",
    long_about = "Extract per-product photos from PDF catalogs and reconcile them with a JSON \
product manifest. Photos are cropped from rendered pages by contour detection, named after the \
product they belong to, and backed up by a text-anchored match over the raw embedded images.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Product manifest JSON path.
    #[arg(long, global = true, env = "PDF2ASSETS_MANIFEST", default_value = "catalog.json")]
    manifest: PathBuf,

    /// Directory for canonical product photos.
    #[arg(
        long,
        global = true,
        env = "PDF2ASSETS_OUTPUT_DIR",
        default_value = "product_images"
    )]
    output_dir: PathBuf,

    /// Directory for the raw embedded-image pool.
    #[arg(long, global = true, env = "PDF2ASSETS_POOL_DIR", default_value = "raw_images")]
    pool_dir: PathBuf,

    /// Render scale applied to both page dimensions.
    #[arg(long, global = true, env = "PDF2ASSETS_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// Minimum photo side in pixels; smaller images are curated out.
    #[arg(long, global = true, env = "PDF2ASSETS_MIN_PHOTO_PX", default_value_t = 45)]
    min_photo_px: u32,

    /// Maximum width/height (or height/width) ratio before a photo counts as junk.
    #[arg(long, global = true, env = "PDF2ASSETS_MAX_ASPECT", default_value_t = 4.0)]
    max_aspect: f32,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDF2ASSETS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2ASSETS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2ASSETS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every stage: detect, harvest, match, clean, report.
    Run {
        /// Catalog PDFs. The first usable one is the detection catalog.
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Contour-detect and crop product photos page by page.
    Detect {
        /// Catalog PDFs. The first usable one is scanned.
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Pull every embedded image into the raw pool.
    Harvest {
        /// Catalog PDFs, all of them harvested.
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Text-anchored matching for items still without a photo.
    Match {
        /// Catalog PDFs, scanned in the order given.
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Drop junk and duplicate photos; prune the manifest.
    Clean,
    /// Write the missing-photo report from the manifest.
    Report {
        /// Report path.
        #[arg(long, default_value = "missing_photos.txt")]
        out: PathBuf,
    },
    /// Show page and embedded-image counts per document.
    Inspect {
        /// Catalog PDFs to probe.
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    // In verbose mode we always want all logs regardless of progress.
    let filter = if cli.verbose { "debug" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let observer: Option<Arc<dyn PipelineObserver>> = if show_progress {
        Some(CliObserver::new())
    } else {
        None
    };

    match &cli.command {
        Command::Run { documents } => {
            let config = build_config(&cli, documents, observer)?;
            let summary = run_pipeline(&config).context("Pipeline failed")?;
            if !cli.quiet {
                print_run_summary(&summary);
            }
        }
        Command::Detect { documents } => {
            let config = build_config(&cli, documents, observer)?;
            let summary = run_detection(&config).context("Detection failed")?;
            if !cli.quiet {
                eprintln!(
                    "{} {}/{} products got a photo over {} pages  →  {}",
                    if summary.unresolved == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    bold(&summary.assigned.to_string()),
                    summary.assigned + summary.unresolved,
                    summary.pages,
                    bold(&cli.output_dir.display().to_string()),
                );
            }
        }
        Command::Harvest { documents } => {
            let config = build_config(&cli, documents, observer)?;
            let total = run_harvest(&config).context("Harvest failed")?;
            if !cli.quiet {
                eprintln!(
                    "{} {} embedded images  →  {}",
                    green("✔"),
                    bold(&total.to_string()),
                    bold(&cli.pool_dir.display().to_string()),
                );
            }
        }
        Command::Match { documents } => {
            let config = build_config(&cli, documents, observer)?;
            let summary = run_fallback(&config).context("Matching failed")?;
            if !cli.quiet {
                eprintln!(
                    "{} {} recovered, {} still unresolved",
                    if summary.unresolved == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    bold(&summary.matched.to_string()),
                    summary.unresolved,
                );
            }
        }
        Command::Clean => {
            let config = build_config(&cli, &[], observer)?;
            let summary = run_curation(&config).context("Curation failed")?;
            if !cli.quiet {
                eprintln!(
                    "{} {} photos scanned: {} junk, {} duplicates  ({} manifest entries dropped)",
                    green("✔"),
                    bold(&summary.scanned.to_string()),
                    summary.junk.len(),
                    summary.duplicates.len(),
                    summary.removed_from_manifest,
                );
            }
        }
        Command::Report { out } => {
            let mut config = build_config(&cli, &[], observer)?;
            config.missing_report = out.clone();
            let count = run_missing_report(&config).context("Report failed")?;
            if !cli.quiet {
                eprintln!(
                    "{} {} items without a photo  →  {}",
                    if count == 0 { green("✔") } else { cyan("⚠") },
                    bold(&count.to_string()),
                    bold(&out.display().to_string()),
                );
            }
        }
        Command::Inspect { documents } => {
            // No progress here: the probe is near-instant and prints directly.
            let config = build_config(&cli, documents, None)?;
            let probes = inspect_documents(&config).context("Inspect failed")?;
            for probe in &probes {
                println!("{}", bold(&probe.label));
                println!("  File:   {}", probe.path.display());
                match probe.pages {
                    Some(pages) => println!("  Pages:  {pages}"),
                    None => println!("  Pages:  {}", red("unreadable")),
                }
                for (page, count) in &probe.image_counts {
                    println!("  page {page:>3}  {count:>3} embedded images");
                }
                if let Some(pages) = probe.pages {
                    if pages > pdf2assets::extract::INSPECT_PAGE_LIMIT {
                        println!(
                            "  {}",
                            dim(&format!(
                                "(first {} pages shown)",
                                pdf2assets::extract::INSPECT_PAGE_LIMIT
                            ))
                        );
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(
    cli: &Cli,
    documents: &[PathBuf],
    observer: Option<Arc<dyn PipelineObserver>>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .documents(documents.iter().cloned())
        .manifest_path(&cli.manifest)
        .output_dir(&cli.output_dir)
        .pool_dir(&cli.pool_dir)
        .zoom(cli.zoom)
        .min_photo_px(cli.min_photo_px)
        .max_aspect_ratio(cli.max_aspect);

    if let Some(obs) = observer {
        builder = builder.observer(obs);
    }

    builder.build().context("Invalid configuration")
}

/// Final totals for the `run` subcommand (stage observers already printed
/// their own per-stage ticks).
fn print_run_summary(summary: &PipelineSummary) {
    eprintln!(
        "{} {} photos assigned, {} recovered from the pool, {} still missing  {}",
        if summary.missing_reported == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(&summary.detection.assigned.to_string()),
        bold(&summary.fallback.matched.to_string()),
        bold(&summary.missing_reported.to_string()),
        dim(&format!("{}ms", summary.total_duration_ms)),
    );
    eprintln!(
        "   {} pooled  /  {} junk dropped  /  {} duplicates dropped",
        dim(&summary.harvested.to_string()),
        dim(&summary.curation.junk.len().to_string()),
        dim(&summary.curation.duplicates.len().to_string()),
    );
}
