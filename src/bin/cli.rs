use bilidl::{Config, Downloader, Quality};
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

const EXIT_TOKENS: [&str; 3] = ["q", "quit", "exit"];

#[derive(Parser, Clone)]
#[command(version, about)]
pub struct Cli {
    /// Video page URL. Without it, URLs are read interactively.
    pub url: Option<String>,

    /// Quality code (80, 64, 32 or 16). Prompted for when omitted.
    #[arg(long = "quality", short)]
    pub quality: Option<u32>,

    #[arg(long = "output-dir", short)]
    pub output_dir: Option<PathBuf>,

    /// Path to the ffmpeg executable.
    #[arg(long = "ffmpeg")]
    pub ffmpeg: Option<PathBuf>,

    /// Config file, defaults to `<config dir>/bilidl/config.toml`.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "verbosity",
        short,
        default_value = "info",
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Cli::parse();
    let progress = init_logging(&args.verbosity)?;

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(output_dir) = args.output_dir.clone() {
        config.output_dir = output_dir;
    }
    if let Some(ffmpeg) = args.ffmpeg.clone() {
        config.ffmpeg = ffmpeg;
    }

    let downloader = Downloader::new(config)?.with_progress(progress);

    if let Some(url) = args.url.as_deref() {
        let quality = resolve_quality(args.quality, downloader.config().quality);
        let output = downloader.download(url, quality).await?;
        println!("{}", output.display());
        return Ok(());
    }

    loop {
        let url = prompt("\nEnter a bilibili video URL ('q' to quit): ")?;

        if EXIT_TOKENS.contains(&url.to_lowercase().as_str()) {
            println!("Bye.");
            break;
        }
        if url.is_empty() || !url.contains("bilibili.com") {
            println!("Please enter a valid bilibili video URL.");
            continue;
        }

        let quality = match args.quality {
            Some(code) => resolve_quality(Some(code), downloader.config().quality),
            None => ask_quality(downloader.config().quality)?,
        };

        match downloader.download(&url, quality).await {
            Ok(output) => info!("Download complete: {}", output.display()),
            Err(e) => error!("{}", e),
        }
    }

    Ok(())
}

/// Installs env_logger behind the progress bars and returns their container.
fn init_logging(
    verbosity: &str,
) -> Result<MultiProgress, Box<dyn std::error::Error + Send + Sync>> {
    let level = match verbosity {
        "none" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "debug" => LevelFilter::Debug,
        "full" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let logger = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .build();
    let max_level = logger.filter();

    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    log::set_max_level(max_level);

    Ok(progress)
}

fn prompt(message: &str) -> std::io::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Falls back to the configured default, then to the highest tier.
fn resolve_quality(code: Option<u32>, default: u32) -> Quality {
    match code {
        Some(code) => Quality::from_code(code).unwrap_or_else(|| {
            warn!("Unknown quality {}, using {}", code, Quality::default());
            Quality::default()
        }),
        None => Quality::from_code_or_default(Some(default)),
    }
}

fn ask_quality(default: u32) -> std::io::Result<Quality> {
    let default = Quality::from_code_or_default(Some(default));

    println!("\nAvailable qualities:");
    for quality in Quality::ALL {
        println!("{}: {}", quality.code(), quality.label());
    }

    let answer = prompt(&format!("Quality code (default {}): ", default.code()))?;
    if answer.is_empty() {
        return Ok(default);
    }

    match answer.parse::<u32>() {
        Ok(code) => Ok(resolve_quality(Some(code), default.code())),
        Err(_) => {
            warn!("Invalid quality {:?}, using {}", answer, Quality::default());
            Ok(Quality::default())
        }
    }
}
