use std::path::{Path, PathBuf};
use tracing::debug;

use super::CliConfig;
use crate::environment::EnvReader;
use crate::error::{ErrorCode, StackError};

pub const CONFIG_FILE_NAME: &str = "stackctl.yaml";

/// Locates and reads `stackctl.yaml`
///
/// Search order: an explicit path, `$STACKCTL_CLI_CONFIG_PATH/stackctl.yaml`,
/// `./stackctl.yaml`, then `<user config dir>/stackctl/stackctl.yaml`. When
/// nothing is found the defaults are used.
pub struct ConfigLoader<'a> {
    env: &'a dyn EnvReader,
    explicit: Option<PathBuf>,
    working_dir: PathBuf,
    user_config_dir: Option<PathBuf>,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(env: &'a dyn EnvReader) -> Self {
        Self {
            env,
            explicit: None,
            working_dir: PathBuf::from("."),
            user_config_dir: dirs::config_dir().map(|dir| dir.join("stackctl")),
        }
    }

    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_user_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_config_dir = dir;
        self
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = self.env.non_empty("STACKCTL_CLI_CONFIG_PATH") {
            candidates.push(PathBuf::from(dir).join(CONFIG_FILE_NAME));
        }
        candidates.push(self.working_dir.join(CONFIG_FILE_NAME));
        if let Some(dir) = &self.user_config_dir {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }
        candidates
    }

    pub async fn load(&self) -> Result<CliConfig, StackError> {
        let mut config = match &self.explicit {
            Some(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(StackError::config_with_code(
                        ErrorCode::CONFIG_NOT_FOUND,
                        format!("configuration file '{}' does not exist", path.display()),
                    ));
                }
                read_config_file(path).await?
            }
            None => {
                let mut found = None;
                for candidate in self.candidates() {
                    if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                        found = Some(read_config_file(&candidate).await?);
                        break;
                    }
                }
                found.unwrap_or_else(|| {
                    debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                    CliConfig::default()
                })
            }
        };

        config.merge_env_vars(self.env);
        Ok(config)
    }
}

async fn read_config_file(path: &Path) -> Result<CliConfig, StackError> {
    debug!("Loading configuration from {}", path.display());

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        StackError::config(format!("failed to read '{}'", path.display())).with_source(e)
    })?;

    let mut config: CliConfig = if content.trim().is_empty() {
        CliConfig::default()
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            StackError::config_with_code(
                ErrorCode::CONFIG_INVALID_YAML,
                format!("invalid YAML in '{}'", path.display()),
            )
            .with_source(e)
        })?
    };

    config.cli_config_path = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(config)
}

/// Load configuration the way the CLI does
pub async fn load_config(
    env: &dyn EnvReader,
    explicit: Option<PathBuf>,
) -> Result<CliConfig, StackError> {
    ConfigLoader::new(env).with_file(explicit).load().await
}
