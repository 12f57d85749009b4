mod cleanup;
mod config;
mod converter;
mod crawler;
mod dates;
mod document;
mod error;
mod http;
mod images;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use config::{CleanOptions, ConvertOptions, CrawlOptions};
use http::HttpClient;

#[derive(Parser)]
#[command(name = "quora_archive", about = "Archive Quora answers as portable HTML")]
struct Cli {
    /// Enable debug messages
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Network timeout in seconds (0 waits forever)
    #[arg(long, global = true, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a set of answers listed in a JSON file of [url, date] pairs
    Crawl {
        /// File containing the JSON-encoded list of timestamped URLs
        input_file: PathBuf,
        /// Where to store the downloaded answers
        #[arg(default_value = "./quora-answers")]
        output_dir: PathBuf,
        /// Time to sleep between answers, in seconds
        #[arg(short, long, default_value_t = 0.0)]
        delay: f64,
        /// JS time (milliseconds) when the list of URLs was fetched
        #[arg(short = 't', long)]
        origin_timestamp: Option<i64>,
        /// Browser time zone offset in minutes (as from getTimezoneOffset)
        #[arg(short = 'z', long, allow_hyphen_values = true)]
        origin_timezone: Option<i64>,
        /// Overwrite existing answers
        #[arg(short, long)]
        overwrite: bool,
    },
    /// Convert downloaded answers into a more portable HTML format
    Convert {
        /// Directory containing raw answers
        #[arg(default_value = "./quora-answers")]
        input_dir: PathBuf,
        /// Where to store the images and converted answers
        #[arg(default_value = "./quora-answers-cooked")]
        output_dir: PathBuf,
        /// Time to sleep between image downloads, in seconds
        #[arg(short, long, default_value_t = 0.0)]
        delay: f64,
        /// Do not save images
        #[arg(short = 'n', long)]
        no_download: bool,
        /// Origin prefixed to site-relative links
        #[arg(long, default_value = config::SITE_ORIGIN)]
        site: String,
        /// Copy <p> elements as-is instead of stripping their attributes
        #[arg(long)]
        raw_paragraphs: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let t0 = Instant::now();
    let client = HttpClient::new(config::timeout_from_secs(cli.timeout))?;
    let show_progress = !cli.verbose;

    match cli.command {
        Commands::Crawl {
            input_file,
            output_dir,
            delay,
            origin_timestamp,
            origin_timezone,
            overwrite,
        } => {
            let opts = CrawlOptions {
                input_file,
                output_dir,
                delay: config::delay_from_secs(delay)?,
                origin: config::resolve_origin(origin_timestamp, origin_timezone)?,
                overwrite,
            };
            let stats = crawler::crawl(&opts, &client, show_progress).await?;
            println!(
                "Done. Downloaded {} of {} answers ({} skipped, {} failed).",
                stats.downloaded, stats.total, stats.skipped, stats.failed
            );
        }
        Commands::Convert {
            input_dir,
            output_dir,
            delay,
            no_download,
            site,
            raw_paragraphs,
        } => {
            let opts = ConvertOptions {
                input_dir,
                output_dir,
                delay: config::delay_from_secs(delay)?,
                download_images: !no_download,
                clean: CleanOptions {
                    site_origin: site,
                    keep_paragraphs: !raw_paragraphs,
                },
            };
            let stats = converter::convert_all(&opts, &client, show_progress).await?;
            println!(
                "Done. Converted {} of {} answers ({} failed, {} images saved).",
                stats.converted, stats.total, stats.failed, stats.images
            );
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
