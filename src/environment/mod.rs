//! Process environment assembly for tool invocations
//!
//! The list handed to the tool is ordered; when a name appears twice the
//! later entry wins. Host variables are only read, never modified.

pub mod reader;

pub use reader::{EnvReader, MockEnvReader, RealEnvReader};

use tracing::{debug, trace};

use crate::config::CliConfig;
use crate::context::InvocationContext;

pub const ENV_CLI_CONFIG_PATH: &str = "STACKCTL_CLI_CONFIG_PATH";
pub const ENV_BASE_PATH: &str = "STACKCTL_BASE_PATH";
pub const ENV_TF_IN_AUTOMATION: &str = "TF_IN_AUTOMATION";
pub const ENV_TF_APPEND_USER_AGENT: &str = "TF_APPEND_USER_AGENT";
pub const ENV_TF_WORKSPACE: &str = "TF_WORKSPACE";

/// `KEY=VALUE` entries for a child process plus advisory warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledEnv {
    pub vars: Vec<String>,
    /// Host variables that may override what the tool is told
    pub warnings: Vec<String>,
}

impl AssembledEnv {
    pub fn push(&mut self, key: &str, value: impl std::fmt::Display) {
        self.vars.push(format!("{key}={value}"));
    }

    /// Entries split into name and value; malformed entries are skipped
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Last value assigned to `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.as_pairs()
            .into_iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn push_context_vars(env: &mut AssembledEnv, ctx: &InvocationContext, reader: &dyn EnvReader) {
    let context = ctx.component_context();
    for (name, value) in context.env_pairs() {
        push_unless_set(env, reader, name, value);
    }
}

/// Push `key` unless the caller's environment already sets it
fn push_unless_set(
    env: &mut AssembledEnv,
    reader: &dyn EnvReader,
    key: &str,
    value: impl std::fmt::Display,
) {
    if reader.non_empty(key).is_none() {
        env.push(key, value);
    } else {
        trace!("{} is set by the caller, not overriding", key);
    }
}

fn push_config_paths(env: &mut AssembledEnv, config: &CliConfig, reader: &dyn EnvReader) {
    push_unless_set(env, reader, ENV_CLI_CONFIG_PATH, config.cli_config_path.display());
    push_unless_set(env, reader, ENV_BASE_PATH, config.absolute_base_path().display());
}

/// Environment for a terraform process
pub fn assemble_terraform_env(
    ctx: &InvocationContext,
    config: &CliConfig,
    reader: &dyn EnvReader,
) -> AssembledEnv {
    let terraform = &config.components.terraform;
    let mut env = AssembledEnv {
        vars: ctx.env_list.clone(),
        warnings: find_dangerous_vars(
            reader,
            &terraform.env_warn_exact,
            &terraform.env_warn_prefixes,
        ),
    };

    push_context_vars(&mut env, ctx, reader);
    push_config_paths(&mut env, config, reader);
    push_unless_set(&mut env, reader, ENV_TF_IN_AUTOMATION, "true");

    let user_agent = reader
        .non_empty(ENV_TF_APPEND_USER_AGENT)
        .or_else(|| Some(terraform.append_user_agent.clone()).filter(|ua| !ua.is_empty()));
    if let Some(user_agent) = user_agent {
        env.push(ENV_TF_APPEND_USER_AGENT, user_agent);
    }

    debug!("Assembled {} environment entries", env.vars.len());
    env
}

/// Environment for a helmfile process
///
/// `eks_env` carries `AWS_PROFILE`/`KUBECONFIG` from the kubeconfig download.
pub fn assemble_helmfile_env(
    ctx: &InvocationContext,
    config: &CliConfig,
    reader: &dyn EnvReader,
    eks_env: &[String],
) -> AssembledEnv {
    let helmfile = &config.components.helmfile;
    let mut env = AssembledEnv {
        vars: ctx.env_list.clone(),
        warnings: Vec::new(),
    };

    env.push("STACK", &ctx.stack);
    push_context_vars(&mut env, ctx, reader);

    if !helmfile.kubeconfig_path.is_empty() {
        env.push("KUBECONFIG", &helmfile.kubeconfig_path);
    }
    if helmfile.use_eks {
        env.vars.extend(eks_env.iter().cloned());
    }
    push_config_paths(&mut env, config, reader);

    debug!("Assembled {} environment entries", env.vars.len());
    env
}

/// Host variables matching an exact name or a prefix
///
/// Advisory only: the result is sorted and deduplicated.
pub fn find_dangerous_vars(
    reader: &dyn EnvReader,
    exact: &[String],
    prefixes: &[String],
) -> Vec<String> {
    let mut found: Vec<String> = reader
        .vars()
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| {
            exact.iter().any(|e| e == name) || prefixes.iter().any(|p| name.starts_with(p.as_str()))
        })
        .collect();
    found.sort();
    found.dedup();
    found
}
