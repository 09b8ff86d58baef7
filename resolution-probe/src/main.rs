use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use display_common::Size;
use display_manager::{Config, DisplayContext, TextContext};
use display_scaling::{DisplayId, ResolutionCatalog, ResolutionCategory};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod report;
mod scenario;

use report::ClassifyReport;
use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "resolution-probe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose logging level (repeat for more verbosity: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE", env = "RESOLUTION_PROBE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a native panel resolution
    /// Examples: 3840x2160, 2560x1440
    Classify {
        #[arg(value_name = "WIDTHxHEIGHT")]
        resolution: String,

        /// OS scale factor the panel is driven at
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Base text size in pixels
        #[arg(long, default_value_t = 24.0)]
        text_size: f64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Load a display scenario and print the derived display state
    Displays {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Display id to assign for projection
        #[arg(long, value_name = "ID")]
        projection: Option<u64>,

        /// Base text size in pixels
        #[arg(long, default_value_t = 24.0)]
        text_size: f64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the known resolutions
    Catalog {
        /// Only list one tier (8k, 4k, 2k, 1080p, hd, legacy)
        #[arg(long)]
        category: Option<ResolutionCategory>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_resolution(text: &str) -> Result<Size> {
    let Some((width, height)) = text.trim().split_once(|c: char| c == 'x' || c == 'X') else {
        bail!("Expected WIDTHxHEIGHT, got '{}'", text);
    };
    let width: u32 = width.trim().parse().context("Invalid width")?;
    let height: u32 = height.trim().parse().context("Invalid height")?;
    if width == 0 || height == 0 {
        bail!("Resolution must be non-zero");
    }
    Ok(Size::new(width, height))
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "resolution-probe")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            debug!("Using config {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        _ => Ok(Config::default()),
    }
}

fn init_logging(level: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run_displays(
    config: Config,
    path: &Path,
    projection: Option<u64>,
    text_size: f64,
    json: bool,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "Loaded scenario {} with {} display(s)",
        path.display(),
        scenario.displays.len()
    );

    let context = DisplayContext::builder()
        .config(config)
        .host(scenario.host())
        .build()?;
    context.initialize().await;

    if let Some(id) = projection {
        if !context.store().set_projection_display(DisplayId(id)).await {
            bail!("Display {} cannot be used for projection", id);
        }
    }

    let state = context.store().state();
    if json {
        return report::print_json(&state);
    }

    let sizes = [
        ("editor", TextContext::Editor),
        ("preview", TextContext::Preview),
        ("projection", TextContext::Projection),
    ]
    .map(|(name, ctx)| (name, context.store().get_optimal_text_size(text_size, ctx)));
    report::print_store(&state, text_size, &sizes);
    Ok(())
}

fn run_catalog(category: Option<ResolutionCategory>, json: bool) -> Result<()> {
    let entries: Vec<_> = ResolutionCatalog::entries()
        .iter()
        .filter(|entry| category.map_or(true, |c| entry.category == c))
        .collect();

    if json {
        return report::print_json(&entries);
    }
    for entry in entries {
        println!(
            "{:>6} {:>5}x{:<5} {:<8} {}",
            entry.category.as_str(),
            entry.width,
            entry.height,
            entry.name,
            entry.common_name
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Classify {
            resolution,
            scale,
            text_size,
            json,
        } => {
            let native = parse_resolution(&resolution)
                .with_context(|| format!("Failed to parse resolution '{}'", resolution))?;
            if !scale.is_finite() || scale <= 0.0 {
                bail!("Scale factor must be positive");
            }

            let report = ClassifyReport::new(&config.calculator(), native, scale, text_size);
            if json {
                report::print_json(&report)
            } else {
                report::print_classify(&report, text_size);
                Ok(())
            }
        }
        Command::Displays {
            scenario,
            projection,
            text_size,
            json,
        } => run_displays(config, &scenario, projection, text_size, json).await,
        Command::Catalog { category, json } => run_catalog(category, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("3840x2160").unwrap(), Size::new(3840, 2160));
        assert_eq!(parse_resolution(" 1920X1080 ").unwrap(), Size::new(1920, 1080));
        assert_eq!(parse_resolution("2560 x 1440").unwrap(), Size::new(2560, 1440));
    }

    #[test]
    fn test_parse_resolution_invalid() {
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("axb").is_err());
        assert!(parse_resolution("0x1080").is_err());
        assert!(parse_resolution("-1x1080").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "resolution-probe",
            "-vv",
            "displays",
            "desk.toml",
            "--projection",
            "2",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Displays { projection, .. } => assert_eq!(projection, Some(2)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_catalog_category_arg() {
        let args = Args::try_parse_from(["resolution-probe", "catalog", "--category", "4k"]).unwrap();
        match args.command {
            Command::Catalog { category, .. } => {
                assert_eq!(category, Some(ResolutionCategory::FourK))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/probe.toml"))).is_err());
    }
}
