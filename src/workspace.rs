//! Workspace selection with create-on-first-use
//!
//! Terraform has no "does this workspace exist" query, so existence is probed
//! by selecting it. `terraform workspace select` exits with code 1 when the
//! workspace is missing, and that is the only signal used.
//!
//! Known precision gap: any other failure of `select` that also exits with
//! code 1 is treated as "not found" as well, and leads to a `workspace new`
//! attempt whose own error is then reported.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::context::{SUBCOMMAND_INIT, SUBCOMMAND_WORKSPACE};
use crate::environment::{EnvReader, ENV_TF_WORKSPACE};
use crate::error::StackError;
use crate::subprocess::{ProcessError, ShellExecutor, ShellInvocation, StderrTarget};

/// Exit code of `terraform workspace select` for a missing workspace
pub const WORKSPACE_NOT_FOUND_EXIT_CODE: i32 = 1;

/// Outcome of probing a workspace by selecting it
#[derive(Debug)]
pub enum WorkspaceProbeResult {
    Selected,
    NotFound,
    Error(ProcessError),
}

impl WorkspaceProbeResult {
    pub fn classify(result: Result<(), ProcessError>) -> Self {
        match result {
            Ok(()) => WorkspaceProbeResult::Selected,
            Err(err) if err.exit_code() == Some(WORKSPACE_NOT_FOUND_EXIT_CODE) => {
                WorkspaceProbeResult::NotFound
            }
            Err(err) => WorkspaceProbeResult::Error(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InitCommand,
    ExplicitWorkspaceCommand,
    PinnedByEnvironment,
    BackendDisallowsWorkspaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOutcome {
    Skipped(SkipReason),
    Selected,
    Created,
}

/// Inputs for [`WorkspaceManager::ensure`]
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRequest {
    pub program: String,
    pub sub_command: String,
    pub sub_command2: String,
    pub workspace: String,
    pub working_dir: PathBuf,
    pub env: Vec<String>,
    pub redirect_stderr: Option<String>,
    pub backend_disallows_workspaces: bool,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
}

pub struct WorkspaceManager {
    shell: ShellExecutor,
    env: Arc<dyn EnvReader>,
}

impl WorkspaceManager {
    pub fn new(shell: ShellExecutor, env: Arc<dyn EnvReader>) -> Self {
        Self { shell, env }
    }

    fn skip_reason(&self, request: &WorkspaceRequest) -> Option<SkipReason> {
        if request.sub_command == SUBCOMMAND_INIT {
            Some(SkipReason::InitCommand)
        } else if request.sub_command == SUBCOMMAND_WORKSPACE && !request.sub_command2.is_empty()
        {
            Some(SkipReason::ExplicitWorkspaceCommand)
        } else if self.env.non_empty(ENV_TF_WORKSPACE).is_some() {
            Some(SkipReason::PinnedByEnvironment)
        } else if request.backend_disallows_workspaces {
            Some(SkipReason::BackendDisallowsWorkspaces)
        } else {
            None
        }
    }

    fn invocation(&self, request: &WorkspaceRequest, action: &str) -> ShellInvocation {
        ShellInvocation::new(
            &request.program,
            ["workspace", action, request.workspace.as_str()],
        )
        .in_dir(&request.working_dir)
        .with_env(&request.env)
        .dry_run(request.dry_run)
        .timeout(request.timeout)
    }

    /// Select the workspace, creating it when it does not exist yet
    pub async fn ensure(&self, request: &WorkspaceRequest) -> Result<WorkspaceOutcome, StackError> {
        if let Some(reason) = self.skip_reason(request) {
            debug!("Skipping workspace selection: {:?}", reason);
            return Ok(WorkspaceOutcome::Skipped(reason));
        }

        // A missing workspace is expected here, keep its complaint off stderr
        let select_stderr = match &request.redirect_stderr {
            Some(target) if !target.is_empty() => StderrTarget::parse(target),
            _ => StderrTarget::Stdout,
        };
        let select = self
            .invocation(request, "select")
            .stderr(select_stderr);

        match WorkspaceProbeResult::classify(self.shell.execute(select).await) {
            WorkspaceProbeResult::Selected => Ok(WorkspaceOutcome::Selected),
            WorkspaceProbeResult::NotFound => {
                info!("Workspace '{}' does not exist, creating it", request.workspace);
                let create_stderr = request
                    .redirect_stderr
                    .as_deref()
                    .map(StderrTarget::parse)
                    .unwrap_or_default();
                self.shell
                    .execute(self.invocation(request, "new").stderr(create_stderr))
                    .await?;
                Ok(WorkspaceOutcome::Created)
            }
            WorkspaceProbeResult::Error(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MockEnvReader;
    use crate::subprocess::SubprocessManager;

    fn request() -> WorkspaceRequest {
        WorkspaceRequest {
            program: "terraform".to_string(),
            sub_command: "plan".to_string(),
            workspace: "dev".to_string(),
            working_dir: PathBuf::from("/tmp/components/terraform/vpc"),
            ..Default::default()
        }
    }

    fn is_select(args: &[String]) -> bool {
        args.get(1).map(String::as_str) == Some("select")
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            WorkspaceProbeResult::classify(Ok(())),
            WorkspaceProbeResult::Selected
        ));
        assert!(matches!(
            WorkspaceProbeResult::classify(Err(ProcessError::ExitCode {
                command: "terraform workspace select dev".to_string(),
                code: 1
            })),
            WorkspaceProbeResult::NotFound
        ));
        assert!(matches!(
            WorkspaceProbeResult::classify(Err(ProcessError::ExitCode {
                command: "terraform workspace select dev".to_string(),
                code: 2
            })),
            WorkspaceProbeResult::Error(_)
        ));
        assert!(matches!(
            WorkspaceProbeResult::classify(Err(ProcessError::CommandNotFound(
                "terraform".to_string()
            ))),
            WorkspaceProbeResult::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_existing_workspace_is_selected() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("terraform").with_args(is_select).finish();
        let manager = WorkspaceManager::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        let outcome = manager.ensure(&request()).await.unwrap();

        assert_eq!(outcome, WorkspaceOutcome::Selected);
        let calls = mock.get_call_history();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["workspace", "select", "dev"]);
        assert_eq!(calls[0].stderr, StderrTarget::Stdout);
    }

    #[tokio::test]
    async fn test_not_found_creates_exactly_once() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("terraform")
            .with_args(is_select)
            .returns_exit_code(1)
            .finish();
        mock.expect_command("terraform")
            .with_args(|args| args.get(1).map(String::as_str) == Some("new"))
            .times(1)
            .finish();
        let manager = WorkspaceManager::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        let mut req = request();
        req.redirect_stderr = Some("/dev/null".to_string());
        let outcome = manager.ensure(&req).await.unwrap();

        assert_eq!(outcome, WorkspaceOutcome::Created);
        let calls = mock.get_call_history();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].args, vec!["workspace", "new", "dev"]);
        assert_eq!(calls[0].stderr, StderrTarget::Null);
        assert_eq!(calls[1].stderr, StderrTarget::Null);
    }

    #[tokio::test]
    async fn test_other_exit_code_propagates_without_create() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("terraform")
            .with_args(is_select)
            .returns_exit_code(2)
            .finish();
        let manager = WorkspaceManager::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        let err = manager.ensure(&request()).await.unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert_eq!(mock.get_call_history().len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_reported() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("terraform")
            .with_args(is_select)
            .returns_exit_code(1)
            .finish();
        mock.expect_command("terraform")
            .with_args(|args| args.get(1).map(String::as_str) == Some("new"))
            .returns_exit_code(3)
            .finish();
        let manager = WorkspaceManager::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        let err = manager.ensure(&request()).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("workspace new dev"));
    }

    #[tokio::test]
    async fn test_skip_reasons() {
        let (subprocess, mock) = SubprocessManager::mock();
        let manager = WorkspaceManager::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        let mut req = request();
        req.sub_command = "init".to_string();
        assert_eq!(
            manager.ensure(&req).await.unwrap(),
            WorkspaceOutcome::Skipped(SkipReason::InitCommand)
        );

        let mut req = request();
        req.sub_command = "workspace".to_string();
        req.sub_command2 = "list".to_string();
        assert_eq!(
            manager.ensure(&req).await.unwrap(),
            WorkspaceOutcome::Skipped(SkipReason::ExplicitWorkspaceCommand)
        );

        let mut req = request();
        req.backend_disallows_workspaces = true;
        assert_eq!(
            manager.ensure(&req).await.unwrap(),
            WorkspaceOutcome::Skipped(SkipReason::BackendDisallowsWorkspaces)
        );

        let pinned = WorkspaceManager::new(
            subprocess.shell(),
            Arc::new(MockEnvReader::new().with_env("TF_WORKSPACE", "prod")),
        );
        assert_eq!(
            pinned.ensure(&request()).await.unwrap(),
            WorkspaceOutcome::Skipped(SkipReason::PinnedByEnvironment)
        );

        assert!(mock.get_call_history().is_empty());
    }
}
