//! Helmfile invocation state machine

use tracing::{debug, info};

use crate::artifacts::{
    helmfile_var_file_name, helmfile_var_file_path, remove_best_effort, working_dir,
};
use crate::config::CliConfig;
use crate::context::{InvocationContext, SUBCOMMAND_DEPLOY, SUBCOMMAND_SYNC, SUBCOMMAND_VERSION};
use crate::environment::assemble_helmfile_env;
use crate::error::StackError;
use crate::gate::{self, GateDecision};
use crate::subprocess::ShellInvocation;

use super::{log_context, stderr_target, Collaborators, ExecOutcome};

/// Arguments for `aws eks update-kubeconfig` and the variables it yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EksKubeconfig {
    pub profile: String,
    pub cluster: String,
    pub region: String,
    pub kubeconfig: String,
}

impl EksKubeconfig {
    pub fn resolve(ctx: &InvocationContext, config: &CliConfig) -> Self {
        let helmfile = &config.components.helmfile;
        let context = ctx.component_context();
        Self {
            profile: context.replace_tokens(&helmfile.helm_aws_profile_pattern),
            cluster: context.replace_tokens(&helmfile.cluster_name_pattern),
            kubeconfig: format!(
                "{}/{}-kubecfg",
                helmfile.kubeconfig_path,
                ctx.context_prefix()
            ),
            region: context.region,
        }
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "--profile".to_string(),
            self.profile.clone(),
            "eks".to_string(),
            "update-kubeconfig".to_string(),
            format!("--name={}", self.cluster),
            format!("--region={}", self.region),
            format!("--kubeconfig={}", self.kubeconfig),
        ]
    }

    pub fn env(&self) -> Vec<String> {
        vec![
            format!("AWS_PROFILE={}", self.profile),
            format!("KUBECONFIG={}", self.kubeconfig),
        ]
    }
}

/// `--state-values-file <varfile> [global options] <subcommand> [extra]`
pub fn build_helmfile_args(ctx: &InvocationContext) -> Vec<String> {
    let mut args = vec![
        "--state-values-file".to_string(),
        helmfile_var_file_name(ctx),
    ];
    args.extend(ctx.global_options.iter().cloned());
    args.push(ctx.sub_command.clone());
    args.extend(ctx.additional_args.iter().cloned());
    args
}

/// Run one helmfile invocation for a resolved component
pub async fn execute_helmfile(
    mut ctx: InvocationContext,
    config: &CliConfig,
    collaborators: &Collaborators,
) -> Result<ExecOutcome, StackError> {
    let settings = &config.components.helmfile;
    let program = ctx.executable(&settings.command).to_string();
    let shell = collaborators.subprocess.shell();

    if ctx.sub_command == SUBCOMMAND_VERSION {
        shell
            .execute(
                ShellInvocation::new(&program, [SUBCOMMAND_VERSION])
                    .stderr(stderr_target(&ctx)),
            )
            .await?;
        return Ok(ExecOutcome::completed(&ctx));
    }

    if gate::approve(&ctx, config, collaborators.policy.as_ref()).await? == GateDecision::Skip {
        return Ok(ExecOutcome::Skipped);
    }

    let work_dir = working_dir(config, &ctx);
    let var_file_path = helmfile_var_file_path(config, &ctx);

    if ctx.dry_run {
        info!("Dry run: would write the var file {}", var_file_path.display());
    } else {
        debug!("Writing the variables to {}", var_file_path.display());
        collaborators
            .writer
            .write_yaml(&var_file_path, &ctx.vars)
            .await?;
    }

    if ctx.sub_command == SUBCOMMAND_DEPLOY {
        ctx.sub_command = SUBCOMMAND_SYNC.to_string();
    }

    let stderr = stderr_target(&ctx);

    let mut eks_env = Vec::new();
    if settings.use_eks {
        let eks = EksKubeconfig::resolve(&ctx, config);
        debug!(
            "Downloading the kubeconfig for cluster '{}' to {} with AWS profile '{}'",
            eks.cluster, eks.kubeconfig, eks.profile
        );
        shell
            .execute(
                ShellInvocation::new("aws", eks.args())
                    .in_dir(&work_dir)
                    .dry_run(ctx.dry_run)
                    .stderr(stderr.clone())
                    .timeout(settings.command_timeout),
            )
            .await?;
        eks_env = eks.env();
    }

    log_context(&ctx, &program, &work_dir);
    debug!("  global options: {:?}", ctx.global_options);

    let env = assemble_helmfile_env(&ctx, config, collaborators.env.as_ref(), &eks_env);
    let args = build_helmfile_args(&ctx);

    shell
        .execute_interactive(
            ShellInvocation::new(&program, &args)
                .in_dir(&work_dir)
                .with_env(&env.vars)
                .dry_run(ctx.dry_run)
                .stderr(stderr)
                .timeout(settings.command_timeout),
        )
        .await?;

    if !ctx.dry_run {
        remove_best_effort(collaborators.writer.as_ref(), &var_file_path).await;
    }

    Ok(ExecOutcome::completed(&ctx))
}
