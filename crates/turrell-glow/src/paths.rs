use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "TURRELL_GLOW_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "TurrellGlow";
const APPLICATION: &str = "turrell-glow";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn default_sequence(&self) -> PathBuf {
        self.config_dir.join("sequence.json")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

fn env_override(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_in_the_config_dir() {
        let paths = AppPaths::from_raw(PathBuf::from("/tmp/glow"));
        assert_eq!(paths.config_dir(), Path::new("/tmp/glow"));
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/tmp/glow/settings.toml")
        );
        assert_eq!(
            paths.default_sequence(),
            PathBuf::from("/tmp/glow/sequence.json")
        );
    }
}
