//! Orchestration of terraform and helmfile invocations
//!
//! One invocation is a strict sequence of steps: gate, artifacts, `init`,
//! workspace, primary command, cleanup. Every collaborator that touches the
//! outside world is reached through [`Collaborators`].

pub mod args;
pub mod helmfile;
pub mod terraform;

pub use args::{build_init_args, build_terraform_args, ensure_auto_approve, AUTO_APPROVE_FLAG};
pub use helmfile::execute_helmfile;
pub use terraform::execute_terraform;

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::abstractions::{
    AllowAllPolicy, ComponentCleaner, FsComponentCleaner, InteractiveShellLauncher,
    OverrideGenerator, PlanDiffer, PolicyValidator, ShellLauncher, StdinTerminal,
    TerminalProbe, TerraformJsonGenerator, TerraformPlanDiffer,
};
use crate::artifacts::{ArtifactWriter, FsArtifactWriter};
use crate::context::InvocationContext;
use crate::environment::{EnvReader, RealEnvReader};
use crate::subprocess::{StderrTarget, SubprocessManager};

/// Result of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The component is disabled
    Skipped,
    /// Finished; `sub_command` is the subcommand after rewrites
    Completed { sub_command: String },
}

impl ExecOutcome {
    fn completed(ctx: &InvocationContext) -> Self {
        ExecOutcome::Completed {
            sub_command: ctx.sub_command.clone(),
        }
    }
}

/// Everything the orchestrator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub subprocess: SubprocessManager,
    pub writer: Arc<dyn ArtifactWriter>,
    pub policy: Arc<dyn PolicyValidator>,
    pub generator: Arc<dyn OverrideGenerator>,
    pub cleaner: Arc<dyn ComponentCleaner>,
    pub plan_differ: Arc<dyn PlanDiffer>,
    pub shell_launcher: Arc<dyn ShellLauncher>,
    pub terminal: Arc<dyn TerminalProbe>,
    pub env: Arc<dyn EnvReader>,
}

impl Collaborators {
    /// Default implementations around the given process runner and environment
    pub fn new(subprocess: SubprocessManager, env: Arc<dyn EnvReader>) -> Self {
        let writer: Arc<dyn ArtifactWriter> = Arc::new(FsArtifactWriter);
        Self {
            generator: Arc::new(TerraformJsonGenerator::new(Arc::clone(&writer))),
            plan_differ: Arc::new(TerraformPlanDiffer::new(subprocess.shell())),
            shell_launcher: Arc::new(InteractiveShellLauncher::new(
                subprocess.shell(),
                Arc::clone(&env),
            )),
            writer,
            policy: Arc::new(AllowAllPolicy),
            cleaner: Arc::new(FsComponentCleaner),
            terminal: Arc::new(StdinTerminal),
            subprocess,
            env,
        }
    }

    pub fn production() -> Self {
        Self::new(SubprocessManager::production(), Arc::new(RealEnvReader))
    }
}

/// Where the tool's stderr goes, from `--redirect-stderr`
pub(crate) fn stderr_target(ctx: &InvocationContext) -> StderrTarget {
    ctx.redirect_stderr
        .as_deref()
        .map(StderrTarget::parse)
        .unwrap_or_default()
}

/// Debug summary of what is about to run
pub(crate) fn log_context(ctx: &InvocationContext, executable: &str, working_dir: &Path) {
    debug!("{} context:", ctx.tool);
    debug!("  executable: {}", executable);
    debug!("  command: {}", ctx.command_line());
    debug!("  component: {}", ctx.component_from_arg);
    debug!("  stack: {}", ctx.stack_from_arg);
    debug!("  arguments and flags: {:?}", ctx.additional_args);
    if !ctx.base_component.is_empty() {
        debug!("  base component: {}", ctx.base_component);
    }
    let inheritance = ctx.inheritance_chain();
    if !inheritance.is_empty() {
        debug!("  inheritance: {}", inheritance);
    }
    debug!("  working directory: {}", working_dir.display());

    if tracing::enabled!(tracing::Level::TRACE) {
        match serde_yaml::to_string(&ctx.vars) {
            Ok(vars) => tracing::trace!("Variables for component '{}':\n{}", ctx.component_from_arg, vars),
            Err(e) => tracing::trace!("Variables could not be rendered: {}", e),
        }
        for entry in &ctx.env_list {
            tracing::trace!("  env: {}", entry);
        }
    }
}
