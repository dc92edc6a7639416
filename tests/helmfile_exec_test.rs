//! End-to-end tests of the helmfile orchestrator against a mock process runner

mod common;

use serde_json::json;

use common::*;
use stackctl::environment::MockEnvReader;
use stackctl::error::StackError;
use stackctl::exec::{execute_helmfile, ExecOutcome};
use stackctl::subprocess::OutputMode;

fn var_file_name() -> String {
    format!("{STACK}-{HELMFILE_COMPONENT}.helmfile.vars.yaml")
}

#[tokio::test]
async fn test_diff_passes_state_values_and_options() {
    let fixture = Fixture::new();
    let (collaborators, mut mock) = collaborators(MockEnvReader::new(), false);
    mock.expect_command("helmfile").finish();

    let mut ctx = helmfile_context("diff", json!({}));
    ctx.global_options = vec!["--no-color".to_string()];
    ctx.additional_args = vec!["--suppress-secrets".to_string()];

    let outcome = execute_helmfile(ctx, &fixture.config, &collaborators)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExecOutcome::Completed {
            sub_command: "diff".to_string()
        }
    );
    let calls = mock.get_call_history();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].args,
        vec![
            "--state-values-file".to_string(),
            var_file_name(),
            "--no-color".to_string(),
            "diff".to_string(),
            "--suppress-secrets".to_string(),
        ]
    );
    assert_eq!(calls[0].env.get("STACK"), Some(&STACK.to_string()));
    assert_eq!(
        calls[0].working_dir.as_deref(),
        Some(fixture.helmfile_component().as_path())
    );

    // Removed once helmfile has finished
    assert!(!fixture.helmfile_var_file().exists());
}

#[tokio::test]
async fn test_deploy_becomes_sync() {
    let fixture = Fixture::new();
    let (collaborators, mut mock) = collaborators(MockEnvReader::new(), false);
    mock.expect_command("helmfile").finish();

    let outcome = execute_helmfile(helmfile_context("deploy", json!({})), &fixture.config, &collaborators)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExecOutcome::Completed {
            sub_command: "sync".to_string()
        }
    );
    let recorded = mock.recorded_args();
    assert_eq!(recorded[0][2], "sync");
}

#[tokio::test]
async fn test_eks_kubeconfig_is_downloaded_first() {
    let mut fixture = Fixture::new();
    let helmfile = &mut fixture.config.components.helmfile;
    helmfile.use_eks = true;
    helmfile.kubeconfig_path = "/dev/shm".to_string();
    helmfile.helm_aws_profile_pattern = "{namespace}-{tenant}-gbl-{stage}-helm".to_string();
    helmfile.cluster_name_pattern = "{namespace}-{tenant}-{environment}-{stage}-eks-cluster".to_string();

    let (collaborators, mut mock) = collaborators(MockEnvReader::new(), false);
    mock.expect_command("aws").times(1).finish();
    mock.expect_command("helmfile").finish();

    execute_helmfile(helmfile_context("sync", json!({})), &fixture.config, &collaborators)
        .await
        .unwrap();

    let calls = mock.get_call_history();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "aws");
    assert!(calls[0]
        .args
        .contains(&"--name=cp-tenant1-ue2-dev-eks-cluster".to_string()));
    assert_eq!(calls[1].program, "helmfile");
    assert_eq!(calls[0].output, OutputMode::Inherit);
    assert_eq!(calls[1].output, OutputMode::Interactive);
    assert_eq!(
        calls[1].env.get("AWS_PROFILE"),
        Some(&"cp-tenant1-gbl-dev-helm".to_string())
    );
    assert_eq!(
        calls[1].env.get("KUBECONFIG"),
        Some(&format!("/dev/shm/{STACK}-kubecfg"))
    );
}

#[tokio::test]
async fn test_failed_sync_reports_exit_code() {
    let fixture = Fixture::new();
    let (collaborators, mut mock) = collaborators(MockEnvReader::new(), false);
    mock.expect_command("helmfile").returns_exit_code(3).finish();

    let err = execute_helmfile(helmfile_context("sync", json!({})), &fixture.config, &collaborators)
        .await
        .unwrap_err();

    assert!(matches!(err, StackError::Process(_)));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_abstract_component_cannot_sync() {
    let fixture = Fixture::new();
    let (collaborators, mock) = collaborators(MockEnvReader::new(), false);

    let ctx = helmfile_context("sync", json!({"metadata": {"type": "abstract"}}));
    let err = execute_helmfile(ctx, &fixture.config, &collaborators)
        .await
        .unwrap_err();

    assert!(matches!(err, StackError::AbstractComponent { .. }));
    assert!(mock.get_call_history().is_empty());
    assert!(!fixture.helmfile_var_file().exists());
}

#[tokio::test]
async fn test_dry_run_spawns_nothing() {
    let fixture = Fixture::new();
    let (collaborators, mock) = collaborators(MockEnvReader::new(), false);

    let mut ctx = helmfile_context("diff", json!({}));
    ctx.dry_run = true;

    execute_helmfile(ctx, &fixture.config, &collaborators)
        .await
        .unwrap();

    assert!(mock.get_call_history().is_empty());
    assert!(!fixture.helmfile_var_file().exists());
}
