//! Common test utilities and helpers
#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use stackctl::abstractions::FixedTerminal;
use stackctl::config::CliConfig;
use stackctl::context::{InvocationContext, Sections, ToolKind};
use stackctl::environment::MockEnvReader;
use stackctl::exec::Collaborators;
use stackctl::subprocess::{MockProcessRunner, SubprocessManager};

pub const STACK: &str = "tenant1-ue2-dev";
pub const TERRAFORM_COMPONENT: &str = "vpc";
pub const HELMFILE_COMPONENT: &str = "echo-server";

/// A base path with one terraform and one helmfile component
pub struct Fixture {
    temp_dir: TempDir,
    pub config: CliConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = CliConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let fixture = Self { temp_dir, config };
        std::fs::create_dir_all(fixture.terraform_component()).expect("terraform component");
        std::fs::create_dir_all(fixture.helmfile_component()).expect("helmfile component");
        fixture
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn terraform_component(&self) -> PathBuf {
        self.config.terraform_dir().join(TERRAFORM_COMPONENT)
    }

    pub fn helmfile_component(&self) -> PathBuf {
        self.config.helmfile_dir().join(HELMFILE_COMPONENT)
    }

    pub fn terraform_var_file(&self) -> PathBuf {
        self.terraform_component()
            .join(format!("{STACK}-{TERRAFORM_COMPONENT}.terraform.tfvars.json"))
    }

    pub fn terraform_plan_file(&self) -> PathBuf {
        self.terraform_component()
            .join(format!("{STACK}-{TERRAFORM_COMPONENT}.planfile"))
    }

    pub fn helmfile_var_file(&self) -> PathBuf {
        self.helmfile_component()
            .join(format!("{STACK}-{HELMFILE_COMPONENT}.helmfile.vars.yaml"))
    }
}

pub fn vars() -> Value {
    json!({
        "namespace": "cp",
        "tenant": "tenant1",
        "environment": "ue2",
        "stage": "dev",
        "region": "us-east-2",
        "cidr_block": "10.0.0.0/16",
        "subnets": ["a", "b"],
        "tags": {"team": "platform"}
    })
}

pub fn sections(value: Value) -> Sections {
    match value {
        Value::Object(map) => map,
        _ => Sections::new(),
    }
}

/// A resolved terraform context for `vpc` in the test stack
pub fn terraform_context(sub_command: &str, extra: Value) -> InvocationContext {
    let mut document = sections(json!({
        "vars": vars(),
        "env": {"TF_LOG": "INFO"},
        "backend_type": "s3",
        "backend": {"bucket": "tfstate", "key": "terraform.tfstate"}
    }));
    document.extend(sections(extra));

    let mut ctx =
        InvocationContext::from_sections(ToolKind::Terraform, TERRAFORM_COMPONENT, STACK, document)
            .expect("valid context");
    ctx.sub_command = sub_command.to_string();
    ctx
}

/// A resolved helmfile context for `echo-server` in the test stack
pub fn helmfile_context(sub_command: &str, extra: Value) -> InvocationContext {
    let mut document = sections(json!({ "vars": vars() }));
    document.extend(sections(extra));

    let mut ctx =
        InvocationContext::from_sections(ToolKind::Helmfile, HELMFILE_COMPONENT, STACK, document)
            .expect("valid context");
    ctx.sub_command = sub_command.to_string();
    ctx
}

/// Collaborators around a mock runner, with a fixed terminal answer
pub fn collaborators(env: MockEnvReader, interactive: bool) -> (Collaborators, MockProcessRunner) {
    let (subprocess, mock) = SubprocessManager::mock();
    let mut collaborators = Collaborators::new(subprocess, Arc::new(env));
    collaborators.terminal = Arc::new(FixedTerminal(interactive));
    (collaborators, mock)
}

/// Matches calls whose first argument is `sub_command`
pub fn first_arg(sub_command: &'static str) -> impl Fn(&[String]) -> bool + Send + Sync + 'static {
    move |args: &[String]| args.first().map(String::as_str) == Some(sub_command)
}

/// Matches `workspace <action> ...`
pub fn workspace_action(action: &'static str) -> impl Fn(&[String]) -> bool + Send + Sync + 'static {
    move |args: &[String]| {
        args.first().map(String::as_str) == Some("workspace")
            && args.get(1).map(String::as_str) == Some(action)
    }
}

pub fn count_flag(args: &[String], flag: &str) -> usize {
    args.iter().filter(|arg| *arg == flag).count()
}
