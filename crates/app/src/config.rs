//! Demo configuration from the environment

use std::path::PathBuf;

use bristle_config::{ConfigError, PaintConfig};

/// Path to a JSON `PaintConfig`
pub const CONFIG_ENV: &str = "BRISTLE_CONFIG";

/// Directory the final textures are written to
pub const OUTPUT_ENV: &str = "BRISTLE_OUT";

#[derive(Debug, thiserror::Error)]
pub enum DemoConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything the demo needs to run
#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    pub paint: PaintConfig,
    pub output_dir: Option<PathBuf>,
}

impl DemoConfig {
    /// Parse from BRISTLE_CONFIG and BRISTLE_OUT
    pub fn from_env() -> Result<Self, DemoConfigError> {
        let paint = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_paint(PathBuf::from(path))?,
            None => PaintConfig::default(),
        };
        let output_dir = std::env::var_os(OUTPUT_ENV).map(PathBuf::from);
        Ok(Self { paint, output_dir })
    }

    fn load_paint(path: PathBuf) -> Result<PaintConfig, DemoConfigError> {
        let json = std::fs::read_to_string(&path)
            .map_err(|source| DemoConfigError::Read { path, source })?;
        Ok(PaintConfig::from_json_str(&json)?)
    }
}
