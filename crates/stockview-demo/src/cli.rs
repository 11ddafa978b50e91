#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args by hand. `STOCKVIEW_DEMO_*` environment variables provide
//! defaults that explicit flags override.

use std::env;
use std::path::PathBuf;
use std::process;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
stockview demo: drive the inventory screen headlessly and print frames

USAGE:
    stockview-demo [OPTIONS]

OPTIONS:
    --inventory=PATH     Inventory JSON file (default: bundled sample)
    --config=PATH        Screen config JSON file
    --viewport=H         Viewport height in pixels (default: 640)
    --width=W            Card width in pixels (default: 360)
    --tap=ID             Tap the card with this record id (repeatable)
    --scroll=PX          Scroll by PX pixels after loading
    --refresh            Pull to refresh once after loading
    --json-logs          Emit logs as JSON
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    STOCKVIEW_DEMO_INVENTORY   Override --inventory
    STOCKVIEW_DEMO_VIEWPORT    Override --viewport
    STOCKVIEW_DEMO_LOG_JSON    Set to 1 for --json-logs
    RUST_LOG                   Log filter (default: info)
    STOCKVIEW_*                Screen config overrides (see ScreenConfig)";

fn bundled_inventory() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/inventory.json"))
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    pub inventory: PathBuf,
    pub config: Option<PathBuf>,
    pub viewport: f32,
    pub width: f32,
    /// Record ids to tap, in order.
    pub taps: Vec<String>,
    pub scroll: f32,
    pub refresh: bool,
    pub json_logs: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            inventory: bundled_inventory(),
            config: None,
            viewport: 640.0,
            width: 360.0,
            taps: Vec::new(),
            scroll: 0.0,
            refresh: false,
            json_logs: false,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment. Exits on `--help`,
    /// `--version`, and invalid input.
    pub fn parse() -> Self {
        match parse_from(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("stockview-demo {VERSION}");
                process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }
}

/// Parse `args` with environment defaults read through `get_env`.
pub fn parse_from<I, F>(args: I, get_env: F) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
    F: Fn(&str) -> Option<String>,
{
    let mut opts = Opts::default();

    if let Some(val) = get_env("STOCKVIEW_DEMO_INVENTORY") {
        opts.inventory = PathBuf::from(val);
    }
    if let Some(val) = get_env("STOCKVIEW_DEMO_VIEWPORT")
        && let Ok(n) = val.parse()
    {
        opts.viewport = n;
    }
    if let Some(val) = get_env("STOCKVIEW_DEMO_LOG_JSON") {
        opts.json_logs = matches!(val.as_str(), "1" | "true" | "yes");
    }

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--json-logs" => opts.json_logs = true,
            "--refresh" => opts.refresh = true,
            other => {
                if let Some(val) = other.strip_prefix("--inventory=") {
                    opts.inventory = PathBuf::from(val);
                } else if let Some(val) = other.strip_prefix("--config=") {
                    opts.config = Some(PathBuf::from(val));
                } else if let Some(val) = other.strip_prefix("--viewport=") {
                    opts.viewport = parse_pixels("--viewport", val)?;
                } else if let Some(val) = other.strip_prefix("--width=") {
                    opts.width = parse_pixels("--width", val)?;
                } else if let Some(val) = other.strip_prefix("--tap=") {
                    opts.taps.push(val.to_string());
                } else if let Some(val) = other.strip_prefix("--scroll=") {
                    opts.scroll = val
                        .parse()
                        .map_err(|_| format!("Invalid --scroll value: {val}"))?;
                } else {
                    return Err(format!("Unknown argument: {other}"));
                }
            }
        }
    }

    Ok(Command::Run(opts))
}

fn parse_pixels(flag: &str, val: &str) -> Result<f32, String> {
    match val.parse::<f32>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(format!("Invalid {flag} value: {val}")),
    }
}
