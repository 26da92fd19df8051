//! `settings.toml` handling.
//!
//! Every value is optional. Resolution order is CLI flag, then settings
//! file, then the built-in default.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use renderer::{EngineOptions, SurfaceAlpha};
use serde::Deserialize;

use crate::cli::{parse_aspect_ratio, parse_interpolation, RunArgs};

const DEFAULT_SURFACE_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub engine: EngineSettings,
    pub window: WindowSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub feather: Option<f32>,
    pub aspect_fix: Option<f32>,
    pub intensity: Option<f32>,
    pub max_stops: Option<usize>,
    pub aspect_ratio: Option<String>,
    pub horizontal_width: Option<f32>,
    pub vertical_stretch: Option<f32>,
    pub roundness: Option<f32>,
    pub alpha: Option<f32>,
    pub interpolation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub size: Option<String>,
    pub fps: Option<f32>,
    pub title: Option<String>,
    pub transparent: Option<bool>,
}

impl Settings {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse settings file at {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Engine options with file values applied over the defaults and CLI
    /// flags over both. Validation is left to the engine.
    pub fn engine_options(&self, args: &RunArgs) -> Result<EngineOptions> {
        let file = &self.engine;
        let defaults = EngineOptions::default();

        let aspect_ratio = match (&args.aspect_ratio, &file.aspect_ratio) {
            (Some(ratio), _) => *ratio,
            (None, Some(raw)) => {
                parse_aspect_ratio(raw).map_err(|err| anyhow!("[engine] aspect_ratio: {err}"))?
            }
            (None, None) => defaults.aspect_ratio,
        };
        let interpolation = match (&args.interpolation, &file.interpolation) {
            (Some(curve), _) => *curve,
            (None, Some(raw)) => {
                parse_interpolation(raw).map_err(|err| anyhow!("[engine] interpolation: {err}"))?
            }
            (None, None) => defaults.interpolation,
        };

        Ok(EngineOptions {
            feather: args.feather.or(file.feather).unwrap_or(defaults.feather),
            aspect_fix: args
                .aspect_fix
                .or(file.aspect_fix)
                .unwrap_or(defaults.aspect_fix),
            intensity: args
                .intensity
                .or(file.intensity)
                .unwrap_or(defaults.intensity),
            max_stops: args
                .max_stops
                .or(file.max_stops)
                .unwrap_or(defaults.max_stops),
            aspect_ratio,
            horizontal_width: file.horizontal_width.unwrap_or(defaults.horizontal_width),
            vertical_stretch: file.vertical_stretch.unwrap_or(defaults.vertical_stretch),
            roundness: file.roundness.unwrap_or(defaults.roundness),
            alpha: file.alpha.unwrap_or(defaults.alpha),
            interpolation,
        })
    }

    pub fn surface_size(&self, args: &RunArgs) -> Result<(u32, u32)> {
        match (&args.size, &self.window.size) {
            (Some(spec), _) => parse_surface_size(spec),
            (None, Some(spec)) => {
                parse_surface_size(spec).context("invalid [window] size in settings")
            }
            (None, None) => Ok(DEFAULT_SURFACE_SIZE),
        }
    }

    pub fn target_fps(&self, args: &RunArgs) -> Option<f32> {
        args.fps.or(self.window.fps)
    }

    pub fn surface_alpha(&self, args: &RunArgs) -> SurfaceAlpha {
        if args.transparent || self.window.transparent.unwrap_or(false) {
            SurfaceAlpha::Transparent
        } else {
            SurfaceAlpha::Opaque
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.window.title.as_deref()
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow!("expected WxH format, e.g. 1920x1080"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}
