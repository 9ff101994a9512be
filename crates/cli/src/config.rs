use std::path::{Path, PathBuf};

use llm::LlmConfig;
use orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

pub const RESEARCHER_DIR: &str = ".researcher";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives `runs/<run_id>.{json,md}`
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(RESEARCHER_DIR),
        }
    }
}

/// Settings stored in `.researcher/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearcherConfig {
    pub llm: LlmConfig,
    pub orchestrator: OrchestratorConfig,
    pub output: OutputConfig,
}

impl ResearcherConfig {
    pub fn path_in(project_path: &Path) -> PathBuf {
        project_path.join(RESEARCHER_DIR).join(CONFIG_FILE)
    }

    /// Read config from a project directory, falling back to defaults.
    pub async fn read(project_path: &Path) -> Self {
        let config_path = Self::path_in(project_path);

        if !config_path.exists() {
            debug!(path = %config_path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&config_path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    debug!(path = %config_path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(path = %config_path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    pub async fn write(&self, project_path: &Path) -> anyhow::Result<PathBuf> {
        let config_path = Self::path_in(project_path);
        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content).await?;
        Ok(config_path)
    }

    /// Output directory, resolved against the project directory when relative.
    pub fn output_dir(&self, project_path: &Path) -> PathBuf {
        if self.output.dir.is_absolute() {
            self.output.dir.clone()
        } else {
            project_path.join(&self.output.dir)
        }
    }
}
