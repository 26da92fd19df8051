use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use renderer::{AspectRatio, Interpolation};

#[derive(Parser, Debug)]
#[command(
    name = "turrell-glow",
    author,
    version,
    about = "Ambient colour-field glow driven by cross-fading palettes",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Sequence document (JSON). Defaults to `sequence.json` in the config directory.
    #[arg(value_name = "SEQUENCE")]
    pub sequence: Option<PathBuf>,

    /// Open the preview window (the default unless `--export` is given).
    #[arg(long, conflicts_with = "export")]
    pub window: bool,

    /// Render one frame at `--time` to the given PNG path and exit.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Sequence time to render: milliseconds or a duration such as `4s` or `1m 30s`.
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub time: Option<Duration>,

    /// Window or export resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Optional FPS cap for the preview window (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Open the preview window paused; press space to start.
    #[arg(long)]
    pub paused: bool,

    /// Ask the compositor for a transparent window.
    #[arg(long)]
    pub transparent: bool,

    #[arg(long, value_name = "AMOUNT")]
    pub feather: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub intensity: Option<f32>,

    #[arg(long, value_name = "AMOUNT")]
    pub aspect_fix: Option<f32>,

    /// Stop slots per palette (1-16).
    #[arg(long, value_name = "COUNT")]
    pub max_stops: Option<usize>,

    /// Horizontal stretch: `auto` follows the surface, a number fixes it.
    #[arg(long, value_name = "auto|RATIO", value_parser = parse_aspect_ratio)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Curve inside palette segments: `linear`, `smoothstep` or `ease-in-out`.
    #[arg(long, value_name = "CURVE", value_parser = parse_interpolation)]
    pub interpolation: Option<Interpolation>,

    /// Settings file to use instead of `settings.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a sequence document and print a summary.
    Check(CheckArgs),
    /// Print resolved configuration paths.
    Where,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "SEQUENCE")]
    pub sequence: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_time(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time must not be empty".to_string());
    }
    if let Ok(millis) = trimmed.parse::<f64>() {
        if !millis.is_finite() || millis < 0.0 {
            return Err(format!("time must be a non-negative number, got '{trimmed}'"));
        }
        return Duration::try_from_secs_f64(millis / 1000.0)
            .map_err(|err| format!("time '{trimmed}' is out of range: {err}"));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid time '{trimmed}': {err}"))
}

pub fn parse_aspect_ratio(value: &str) -> Result<AspectRatio, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("aspect ratio must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "auto" | "viewport" => Ok(AspectRatio::Viewport),
        other => {
            let ratio: f32 = other
                .parse()
                .map_err(|_| format!("invalid aspect ratio '{trimmed}'; use auto or a number"))?;
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(format!("aspect ratio must be positive, got {ratio}"));
            }
            Ok(AspectRatio::Fixed(ratio))
        }
    }
}

pub fn parse_interpolation(value: &str) -> Result<Interpolation, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("interpolation must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "linear" => Ok(Interpolation::Linear),
        "smoothstep" | "smooth" => Ok(Interpolation::Smoothstep),
        "ease-in-out" | "ease" | "easeinout" => Ok(Interpolation::EaseInOut),
        _ => Err(format!(
            "unknown interpolation '{trimmed}' (expected linear, smoothstep or ease-in-out)"
        )),
    }
}
