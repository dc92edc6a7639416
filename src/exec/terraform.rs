//! Terraform invocation state machine

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::abstractions::ShellRequest;
use crate::artifacts::{
    component_path, remove_best_effort, terraform_plan_file_path, terraform_var_file_name,
    terraform_var_file_path, working_dir,
};
use crate::config::CliConfig;
use crate::context::{
    InvocationContext, SUBCOMMAND_APPLY, SUBCOMMAND_CLEAN, SUBCOMMAND_DEPLOY, SUBCOMMAND_IMPORT, SUBCOMMAND_INIT,
    SUBCOMMAND_PLAN, SUBCOMMAND_PLAN_DIFF, SUBCOMMAND_SHELL, SUBCOMMAND_SHOW, SUBCOMMAND_VERSION,
    SUBCOMMAND_WORKSPACE,
};
use crate::environment::assemble_terraform_env;
use crate::error::StackError;
use crate::gate::{self, workspaces_disabled, GateDecision};
use crate::subprocess::ShellInvocation;
use crate::workspace::{WorkspaceManager, WorkspaceRequest};

use super::args::{
    build_init_args, build_terraform_args, file_flag_value, rewrite_deploy, AUTO_APPROVE_FLAG,
};
use super::{log_context, stderr_target, Collaborators, ExecOutcome};

/// Terraform's pointer to the workspace selected by the last `init`
const ENVIRONMENT_FILE: &str = ".terraform/environment";

fn needs_init(ctx: &InvocationContext, config: &CliConfig) -> bool {
    if ctx.skip_init {
        debug!("Skipping 'terraform init' due to --skip-init");
        return false;
    }
    !(ctx.sub_command == SUBCOMMAND_INIT
        || ctx.sub_command == SUBCOMMAND_CLEAN
        || (ctx.sub_command == SUBCOMMAND_DEPLOY && !config.components.terraform.deploy_run_init))
}

async fn remove_environment_file(collaborators: &Collaborators, component_path: &Path) {
    remove_best_effort(
        collaborators.writer.as_ref(),
        &component_path.join(ENVIRONMENT_FILE),
    )
    .await;
}

/// Run one terraform invocation for a resolved component
pub async fn execute_terraform(
    mut ctx: InvocationContext,
    config: &CliConfig,
    collaborators: &Collaborators,
) -> Result<ExecOutcome, StackError> {
    let settings = &config.components.terraform;
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

    let component_dir = component_path(config, &ctx);

    if ctx.sub_command == SUBCOMMAND_CLEAN {
        collaborators
            .cleaner
            .clean(&ctx, &component_dir, config)
            .await?;
        return Ok(ExecOutcome::completed(&ctx));
    }

    let work_dir = working_dir(config, &ctx);

    if ctx.is_materialize_varfile() {
        let path = match file_flag_value(&ctx.additional_args) {
            Some(file) => PathBuf::from(file),
            None => terraform_var_file_path(config, &ctx),
        };
        if ctx.dry_run {
            info!("Dry run: would write the var file {}", path.display());
        } else {
            info!("Writing the variables to {}", path.display());
            collaborators.writer.write_json(&path, &ctx.vars).await?;
        }
        return Ok(ExecOutcome::completed(&ctx));
    }

    let run_init = needs_init(&ctx, config);
    let init_args = build_init_args(&ctx, settings);

    rewrite_deploy(&mut ctx, settings);
    let args = build_terraform_args(&ctx, settings);

    // Checked before anything is written or spawned
    if ctx.sub_command == SUBCOMMAND_APPLY
        && !args.iter().any(|arg| arg == AUTO_APPROVE_FLAG)
        && !collaborators.terminal.is_interactive()
    {
        return Err(StackError::NoInteractiveTerminal {
            component: ctx.component_from_arg.clone(),
            stack: ctx.stack.clone(),
        });
    }

    log_context(&ctx, &program, &work_dir);

    if ctx.sub_command != SUBCOMMAND_WORKSPACE && !ctx.use_plan {
        let path = terraform_var_file_path(config, &ctx);
        if ctx.dry_run {
            info!("Dry run: would write the var file {}", path.display());
        } else {
            debug!("Writing the variables to {}", path.display());
            collaborators.writer.write_json(&path, &ctx.vars).await?;
        }
    }

    collaborators
        .generator
        .generate(config, &ctx, &work_dir)
        .await?;

    let mut env = assemble_terraform_env(&ctx, config, collaborators.env.as_ref());
    for name in &env.warnings {
        warn!(
            "{} is set in the environment and may override what stackctl passes to terraform",
            name
        );
    }

    let timeout = settings.command_timeout;
    let invocation = |args: &[String], env: &[String]| {
        ShellInvocation::new(&program, args)
            .in_dir(&component_dir)
            .with_env(env)
            .dry_run(ctx.dry_run)
            .stderr(stderr_target(&ctx))
            .timeout(timeout)
    };

    if run_init {
        remove_environment_file(collaborators, &component_dir).await;
        shell.execute(invocation(&init_args, &env.vars)).await?;
    }
    if ctx.sub_command == SUBCOMMAND_INIT {
        remove_environment_file(collaborators, &component_dir).await;
    }

    if ctx.sub_command == SUBCOMMAND_PLAN_DIFF {
        collaborators
            .plan_differ
            .diff(config, &ctx, &env.vars)
            .await?;
        return Ok(ExecOutcome::completed(&ctx));
    }

    let workspaces = WorkspaceManager::new(shell.clone(), collaborators.env.clone());
    workspaces
        .ensure(&WorkspaceRequest {
            program: program.clone(),
            sub_command: ctx.sub_command.clone(),
            sub_command2: ctx.sub_command2.clone(),
            workspace: ctx.workspace.clone(),
            working_dir: component_dir.clone(),
            env: env.vars.clone(),
            redirect_stderr: ctx.redirect_stderr.clone(),
            backend_disallows_workspaces: workspaces_disabled(config, &ctx),
            dry_run: ctx.dry_run,
            timeout,
        })
        .await?;

    if ctx.sub_command == SUBCOMMAND_IMPORT {
        if let Some(region) = ctx.vars.get("region").and_then(|v| v.as_str()) {
            env.push("AWS_REGION", region);
        }
    }

    if ctx.sub_command == SUBCOMMAND_SHELL {
        collaborators
            .shell_launcher
            .launch(ShellRequest {
                component: ctx.component_from_arg.clone(),
                stack: ctx.stack.clone(),
                working_dir: work_dir.clone(),
                env: env.vars.clone(),
                var_file: terraform_var_file_name(&ctx),
                workspace: ctx.workspace.clone(),
                dry_run: ctx.dry_run,
            })
            .await?;
        return Ok(ExecOutcome::completed(&ctx));
    }

    if !(ctx.sub_command == SUBCOMMAND_WORKSPACE && ctx.sub_command2.is_empty()) {
        shell
            .execute_interactive(invocation(&args, &env.vars))
            .await?;
    }

    if ctx.sub_command != SUBCOMMAND_PLAN
        && ctx.sub_command != SUBCOMMAND_SHOW
        && ctx.plan_file.is_none()
    {
        remove_best_effort(
            collaborators.writer.as_ref(),
            &terraform_plan_file_path(config, &ctx),
        )
        .await;
    }

    if ctx.sub_command == SUBCOMMAND_APPLY {
        remove_best_effort(
            collaborators.writer.as_ref(),
            &terraform_var_file_path(config, &ctx),
        )
        .await;
    }

    Ok(ExecOutcome::completed(&ctx))
}
