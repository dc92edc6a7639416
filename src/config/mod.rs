//! CLI configuration
//!
//! `CliConfig` is loaded once (see [`loader`]) and passed by reference to
//! everything that needs it. Nothing reads configuration from globals.
//!
//! Layering, lowest priority first:
//!
//! 1. Hardcoded defaults
//! 2. `stackctl.yaml`
//! 3. Environment variables (`STACKCTL_*`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environment::EnvReader;
use crate::error::StackError;

pub mod loader;

pub use loader::{load_config, ConfigLoader, CONFIG_FILE_NAME};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Root that component base paths are resolved against
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    #[serde(default)]
    pub components: ComponentsConfig,

    /// Directory the configuration file was loaded from
    #[serde(skip)]
    pub cli_config_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentsConfig {
    #[serde(default)]
    pub terraform: TerraformSettings,
    #[serde(default)]
    pub helmfile: HelmfileSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerraformSettings {
    /// Executable to run
    #[serde(default = "default_terraform_command")]
    pub command: String,

    #[serde(default = "default_terraform_base_path")]
    pub base_path: String,

    /// Add `-auto-approve` to every `apply`
    #[serde(default)]
    pub apply_auto_approve: bool,

    /// Run `init` before `deploy`
    #[serde(default = "default_true")]
    pub deploy_run_init: bool,

    /// Pass `-reconfigure` to `init`
    #[serde(default = "default_true")]
    pub init_run_reconfigure: bool,

    /// Value for `TF_APPEND_USER_AGENT` unless the environment sets one
    #[serde(default)]
    pub append_user_agent: String,

    /// Write `backend.tf.json` into the component before `init`
    #[serde(default)]
    pub auto_generate_backend_file: bool,

    #[serde(default)]
    pub init: TerraformInitSettings,

    #[serde(default)]
    pub plan: TerraformPlanSettings,

    /// Backend types that have no notion of workspaces
    #[serde(default = "default_workspaces_disabled_backends")]
    pub workspaces_disabled_backends: Vec<String>,

    /// Host variables that are reported when set
    #[serde(default = "default_env_warn_exact")]
    pub env_warn_exact: Vec<String>,

    /// Host variable prefixes that are reported when set
    #[serde(default = "default_env_warn_prefixes")]
    pub env_warn_prefixes: Vec<String>,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TerraformInitSettings {
    /// Pass the var file to `init` as well
    #[serde(default)]
    pub pass_vars: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TerraformPlanSettings {
    /// Do not add `-out <planfile>` to `plan`
    #[serde(default)]
    pub skip_planfile: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelmfileSettings {
    #[serde(default = "default_helmfile_command")]
    pub command: String,

    #[serde(default = "default_helmfile_base_path")]
    pub base_path: String,

    /// Download a kubeconfig with `aws eks update-kubeconfig` first
    #[serde(default)]
    pub use_eks: bool,

    #[serde(default)]
    pub kubeconfig_path: String,

    /// e.g. `{namespace}-{tenant}-gbl-{stage}-helm`
    #[serde(default)]
    pub helm_aws_profile_pattern: String,

    /// e.g. `{namespace}-{tenant}-{environment}-{stage}-eks-cluster`
    #[serde(default)]
    pub cluster_name_pattern: String,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_terraform_command() -> String {
    "terraform".to_string()
}

fn default_terraform_base_path() -> String {
    "components/terraform".to_string()
}

fn default_helmfile_command() -> String {
    "helmfile".to_string()
}

fn default_helmfile_base_path() -> String {
    "components/helmfile".to_string()
}

fn default_workspaces_disabled_backends() -> Vec<String> {
    vec!["http".to_string()]
}

fn default_env_warn_exact() -> Vec<String> {
    vec!["TF_CLI_ARGS".to_string(), "TF_WORKSPACE".to_string()]
}

fn default_env_warn_prefixes() -> Vec<String> {
    vec!["TF_VAR_".to_string(), "TF_CLI_ARGS_".to_string()]
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            components: ComponentsConfig::default(),
            cli_config_path: PathBuf::new(),
        }
    }
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            command: default_terraform_command(),
            base_path: default_terraform_base_path(),
            apply_auto_approve: false,
            deploy_run_init: true,
            init_run_reconfigure: true,
            append_user_agent: String::new(),
            auto_generate_backend_file: false,
            init: TerraformInitSettings::default(),
            plan: TerraformPlanSettings::default(),
            workspaces_disabled_backends: default_workspaces_disabled_backends(),
            env_warn_exact: default_env_warn_exact(),
            env_warn_prefixes: default_env_warn_prefixes(),
            command_timeout: None,
        }
    }
}

impl Default for HelmfileSettings {
    fn default() -> Self {
        Self {
            command: default_helmfile_command(),
            base_path: default_helmfile_base_path(),
            use_eks: false,
            kubeconfig_path: String::new(),
            helm_aws_profile_pattern: String::new(),
            cluster_name_pattern: String::new(),
            command_timeout: None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl CliConfig {
    /// Apply `STACKCTL_*` overrides
    pub fn merge_env_vars(&mut self, env: &dyn EnvReader) {
        if let Some(base_path) = env.non_empty("STACKCTL_BASE_PATH") {
            self.base_path = PathBuf::from(base_path);
        }

        let terraform = &mut self.components.terraform;
        if let Some(command) = env.non_empty("STACKCTL_COMPONENTS_TERRAFORM_COMMAND") {
            terraform.command = command;
        }
        if let Some(base_path) = env.non_empty("STACKCTL_COMPONENTS_TERRAFORM_BASE_PATH") {
            terraform.base_path = base_path;
        }
        for (key, flag) in [
            (
                "STACKCTL_COMPONENTS_TERRAFORM_APPLY_AUTO_APPROVE",
                &mut terraform.apply_auto_approve,
            ),
            (
                "STACKCTL_COMPONENTS_TERRAFORM_DEPLOY_RUN_INIT",
                &mut terraform.deploy_run_init,
            ),
            (
                "STACKCTL_COMPONENTS_TERRAFORM_INIT_RUN_RECONFIGURE",
                &mut terraform.init_run_reconfigure,
            ),
        ] {
            if let Some(value) = env.non_empty(key) {
                match parse_bool(&value) {
                    Some(parsed) => *flag = parsed,
                    None => tracing::warn!("Ignoring {}={}: expected a boolean", key, value),
                }
            }
        }

        let helmfile = &mut self.components.helmfile;
        if let Some(command) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_COMMAND") {
            helmfile.command = command;
        }
        if let Some(base_path) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_BASE_PATH") {
            helmfile.base_path = base_path;
        }
        if let Some(path) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_KUBECONFIG_PATH") {
            helmfile.kubeconfig_path = path;
        }
        if let Some(pattern) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_HELM_AWS_PROFILE_PATTERN")
        {
            helmfile.helm_aws_profile_pattern = pattern;
        }
        if let Some(pattern) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_CLUSTER_NAME_PATTERN") {
            helmfile.cluster_name_pattern = pattern;
        }
        if let Some(value) = env.non_empty("STACKCTL_COMPONENTS_HELMFILE_USE_EKS") {
            match parse_bool(&value) {
                Some(parsed) => helmfile.use_eks = parsed,
                None => tracing::warn!(
                    "Ignoring STACKCTL_COMPONENTS_HELMFILE_USE_EKS={}: expected a boolean",
                    value
                ),
            }
        }
    }

    /// Directory holding terraform components
    pub fn terraform_dir(&self) -> PathBuf {
        self.base_path.join(&self.components.terraform.base_path)
    }

    /// Directory holding helmfile components
    pub fn helmfile_dir(&self) -> PathBuf {
        self.base_path.join(&self.components.helmfile.base_path)
    }

    /// `base_path` made absolute against the current directory
    pub fn absolute_base_path(&self) -> PathBuf {
        absolute(&self.base_path)
    }

    /// Fail early when terraform cannot be run with this configuration
    pub fn check_terraform(&self) -> Result<(), StackError> {
        if self.components.terraform.base_path.trim().is_empty() {
            return Err(StackError::ConfigPrecondition {
                key: "components.terraform.base_path".to_string(),
                env_var: "STACKCTL_COMPONENTS_TERRAFORM_BASE_PATH".to_string(),
                message: "the base path to terraform components is required".to_string(),
            });
        }
        Ok(())
    }

    /// Fail early when helmfile cannot be run with this configuration
    pub fn check_helmfile(&self) -> Result<(), StackError> {
        let helmfile = &self.components.helmfile;

        if helmfile.base_path.trim().is_empty() {
            return Err(StackError::ConfigPrecondition {
                key: "components.helmfile.base_path".to_string(),
                env_var: "STACKCTL_COMPONENTS_HELMFILE_BASE_PATH".to_string(),
                message: "the base path to helmfile components is required".to_string(),
            });
        }

        if helmfile.use_eks {
            let required = [
                (
                    &helmfile.kubeconfig_path,
                    "kubeconfig_path",
                    "the kubeconfig path is required when use_eks is enabled",
                ),
                (
                    &helmfile.helm_aws_profile_pattern,
                    "helm_aws_profile_pattern",
                    "the helm AWS profile pattern is required when use_eks is enabled",
                ),
                (
                    &helmfile.cluster_name_pattern,
                    "cluster_name_pattern",
                    "the cluster name pattern is required when use_eks is enabled",
                ),
            ];
            for (value, field, message) in required {
                if value.trim().is_empty() {
                    return Err(StackError::ConfigPrecondition {
                        key: format!("components.helmfile.{field}"),
                        env_var: format!("STACKCTL_COMPONENTS_HELMFILE_{}", field.to_uppercase()),
                        message: message.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => {
            let joined = cwd.join(path);
            joined.canonicalize().unwrap_or(joined)
        }
        Err(_) => path.to_path_buf(),
    }
}
