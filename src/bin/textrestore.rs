//! CLI binary for textrestore.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RestoreConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use textrestore::{
    check_services, restore_to_file, EnhancementMethod, RestoreConfig, RestoreProgressCallback,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner for the fixed stages, switching to a bar
/// once the number of repair regions is known.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Checking services…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl RestoreProgressCallback for CliProgressCallback {
    fn on_preflight_complete(&self) {
        self.bar.set_message("Detecting text and enhancing image…");
    }

    fn on_detection_complete(&self, blocks: Option<usize>) {
        let note = match blocks {
            Some(n) => format!("{n} text block(s) found"),
            None => "no detection possible".to_string(),
        };
        self.bar.println(format!("{} {}", cyan("◆"), note));
    }

    fn on_enhancement_complete(&self, method: EnhancementMethod, success: bool) {
        let mark = if success { green("✔") } else { red("✘") };
        self.bar
            .println(format!("{mark} whole-image enhancement via {method}"));
    }

    fn on_region_start(&self, index: usize, total: usize) {
        if index == 0 {
            self.bar.set_length(total as u64);
            self.bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} Repairing regions [{bar:30.green/238}] {pos}/{len}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        }
        self.bar.set_position(index as u64);
    }

    fn on_region_repaired(&self, index: usize, _total: usize) {
        self.bar.set_position(index as u64 + 1);
    }

    fn on_region_failed(&self, index: usize, _total: usize, error: &str) {
        self.bar
            .println(format!("{} region {}: {error}", red("✘"), index + 1));
        self.bar.set_position(index as u64 + 1);
    }

    fn on_run_complete(&self, regions_repaired: usize, regions_failed: usize) {
        self.bar.finish_and_clear();
        println!(
            "{} {regions_repaired} region(s) repaired, {regions_failed} failed",
            green("✔")
        );
    }
}

// ── Args ─────────────────────────────────────────────────────────────────────

/// Restore blurry text images using local AI backends.
#[derive(Parser, Debug)]
#[command(name = "textrestore", version, about)]
struct Args {
    /// Input image file (PNG or JPEG).
    #[arg(required_unless_present = "check")]
    input: Option<PathBuf>,

    /// Output path for the restored image. Default: `<input>.restored.png`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check backend availability and exit.
    #[arg(long)]
    check: bool,

    /// Text-detection service URL.
    #[arg(long, env = "DETECTION_SERVICE_URL", default_value = "http://localhost:8001")]
    detection_url: String,

    /// Image-enhancement service URL (also the region-repair default).
    #[arg(long, env = "ENHANCE_SERVICE_URL", default_value = "http://localhost:8000")]
    enhance_url: String,

    /// Region-repair service URL. Defaults to the enhancement URL.
    #[arg(long, env = "REPAIR_SERVICE_URL")]
    repair_url: Option<String>,

    /// Credential for the cloud fallback. Absent: cloud branches disabled.
    #[arg(long, env = "CLOUD_API_KEY", hide_env_values = true)]
    cloud_api_key: Option<String>,

    /// Confidence threshold below which a text region is repaired.
    #[arg(long, default_value_t = 0.7)]
    score_threshold: f64,

    /// Availability-probe timeout in seconds.
    #[arg(long, default_value_t = 5)]
    probe_timeout: u64,

    /// Print the detected text blocks after restoration.
    #[arg(long)]
    show_text: bool,
}

fn build_config(args: &Args, progress: bool) -> Result<RestoreConfig> {
    let mut builder = RestoreConfig::builder()
        .detection_url(&args.detection_url)
        .enhancement_url(&args.enhance_url)
        .repair_url(args.repair_url.as_deref().unwrap_or(&args.enhance_url))
        .score_threshold(args.score_threshold)
        .probe_timeout_secs(args.probe_timeout);
    if let Some(ref key) = args.cloud_api_key {
        builder = builder.cloud_api_key(key);
    }
    if progress {
        builder = builder.progress_callback(CliProgressCallback::new());
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.check {
        let config = build_config(&args, false)?;
        let status = check_services(&config).await?;
        println!("{}", status.report());
        if !status.all_available() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let input = args
        .input
        .clone()
        .context("an input image is required unless --check is given")?;
    let output = args.output.clone().unwrap_or_else(|| {
        let mut p = input.clone();
        p.set_extension("restored.png");
        p
    });

    let config = build_config(&args, true)?;
    let result = restore_to_file(&input, &output, &config)
        .await
        .with_context(|| format!("restoring '{}'", input.display()))?;

    println!(
        "{} {} → {}",
        green("✔"),
        bold(&input.display().to_string()),
        bold(&output.display().to_string())
    );
    println!(
        "  method: {}   blocks: {}   repaired: {}/{}   {}ms",
        result.enhancement_method,
        result.stats.blocks_detected,
        result.stats.regions_repaired,
        result.stats.regions_selected,
        result.stats.total_duration_ms
    );

    if args.show_text {
        for block in &result.text_blocks {
            println!("  [{:.2}] {}", block.score, block.content);
        }
    }

    Ok(())
}
