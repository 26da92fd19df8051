use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use player::TimeSource;
use renderer::{
    export_png, time_source_for_policy, Engine, RenderPolicy, RendererConfig, WindowRuntime,
};
use sequence::Sequence;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::settings::Settings;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_or_default(&paths.settings_file())?,
    };
    tracing::debug!(
        config = %paths.config_dir().display(),
        settings = ?settings,
        "resolved turrell-glow settings"
    );

    let sequence_path = resolve_sequence_path(&args, &paths)?;
    let sequence = load_sequence(&sequence_path)?;
    let options = settings.engine_options(&args)?;
    let engine = Engine::new(sequence, options).context("invalid engine options")?;
    let size = settings.surface_size(&args)?;

    match &args.export {
        Some(path) => {
            let policy = RenderPolicy::Export {
                time: args.time.unwrap_or(Duration::ZERO),
                path: path.clone(),
            };
            run_export(engine, size, policy)
        }
        None => {
            let policy = match args.time {
                Some(time) => RenderPolicy::Still { time },
                None => RenderPolicy::Animate {
                    target_fps: settings.target_fps(&args),
                },
            };
            let mut config = RendererConfig {
                surface_size: size,
                policy,
                surface_alpha: settings.surface_alpha(&args),
                ..RendererConfig::default()
            };
            if let Some(title) = settings.title() {
                config.title = title.to_string();
            }
            run_window(engine, config, args.paused)
        }
    }
}

fn resolve_sequence_path(args: &RunArgs, paths: &AppPaths) -> Result<PathBuf> {
    if let Some(path) = &args.sequence {
        return Ok(path.clone());
    }
    let fallback = paths.default_sequence();
    if !fallback.exists() {
        anyhow::bail!(
            "no sequence given and {} does not exist; pass a sequence document",
            fallback.display()
        );
    }
    Ok(fallback)
}

fn load_sequence(path: &Path) -> Result<Sequence> {
    let sequence = Sequence::load(path)
        .with_context(|| format!("failed to load sequence {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        steps = sequence.len(),
        cycle = %humantime::format_duration(sequence.total_cycle()),
        "loaded sequence"
    );
    Ok(sequence)
}

fn run_export(mut engine: Engine, size: (u32, u32), policy: RenderPolicy) -> Result<()> {
    let RenderPolicy::Export { path, .. } = &policy else {
        anyhow::bail!("export requires an export render policy");
    };
    let (width, height) = size;
    engine.resize(width, height);
    let mut clock = time_source_for_policy(&policy);
    let uniforms = engine.frame_at(clock.sample().delta);
    export_png(&uniforms, width, height, path)?;
    Ok(())
}

fn run_window(engine: Engine, config: RendererConfig, paused: bool) -> Result<()> {
    let start_playing = !paused && config.policy.is_animated();
    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        policy = ?config.policy,
        "opening preview window (space toggles playback, escape closes)"
    );
    let runtime = WindowRuntime::spawn(engine, config)?;
    if start_playing {
        runtime.play()?;
    }
    runtime.wait()
}

pub fn check(path: &Path) -> Result<()> {
    let sequence = load_sequence(path)?;
    println!("{}: ok", path.display());
    println!(
        "  steps: {}  cycle: {}  widest palette: {} stops",
        sequence.len(),
        humantime::format_duration(sequence.total_cycle()),
        sequence.max_palette_len()
    );
    for (index, step) in sequence.steps().iter().enumerate() {
        let palette = step.palette();
        println!(
            "  step {index:<3} stops={:<2} fade={:<8} hold={:<8} {} -> {}",
            palette.len(),
            humantime::format_duration(step.fade()).to_string(),
            humantime::format_duration(step.hold()).to_string(),
            palette.first().colour,
            palette.last().colour
        );
    }
    Ok(())
}

pub fn print_paths() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration paths:");
    println!("  config:   {}", paths.config_dir().display());
    println!("  settings: {}", paths.settings_file().display());
    println!("  sequence: {}", paths.default_sequence().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_sequence_wins() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let args = RunArgs {
            sequence: Some(PathBuf::from("custom.json")),
            ..RunArgs::default()
        };
        assert_eq!(
            resolve_sequence_path(&args, &paths).unwrap(),
            PathBuf::from("custom.json")
        );
    }

    #[test]
    fn falls_back_to_the_config_dir_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let args = RunArgs::default();
        let err = resolve_sequence_path(&args, &paths).unwrap_err();
        assert!(err.to_string().contains("sequence.json"), "{err}");

        std::fs::write(paths.default_sequence(), "[]").unwrap();
        assert_eq!(
            resolve_sequence_path(&args, &paths).unwrap(),
            paths.default_sequence()
        );
    }
}
