//! Argument vectors for terraform
//!
//! Generated flags come first, caller arguments after them. The precomputed
//! plan for `apply` goes last because terraform expects it after all flags.

use crate::artifacts::{terraform_plan_file_name, terraform_var_file_name};
use crate::config::TerraformSettings;
use crate::context::{
    InvocationContext, SUBCOMMAND_APPLY, SUBCOMMAND_DESTROY, SUBCOMMAND_IMPORT, SUBCOMMAND_INIT,
    SUBCOMMAND_PLAN, SUBCOMMAND_REFRESH, SUBCOMMAND_WORKSPACE,
};

pub const AUTO_APPROVE_FLAG: &str = "-auto-approve";
pub const VAR_FILE_FLAG: &str = "-var-file";
pub const OUT_FLAG: &str = "-out";
pub const RECONFIGURE_FLAG: &str = "-reconfigure";

/// Append `-auto-approve` unless it is already there
pub fn ensure_auto_approve(args: &mut Vec<String>) {
    if !args.iter().any(|arg| arg == AUTO_APPROVE_FLAG) {
        args.push(AUTO_APPROVE_FLAG.to_string());
    }
}

/// Apply `deploy` → `apply` and the configured auto-approve policy
///
/// Neither applies when a precomputed plan is consumed.
pub fn rewrite_deploy(ctx: &mut InvocationContext, settings: &TerraformSettings) {
    if ctx.sub_command == "deploy" {
        ctx.sub_command = SUBCOMMAND_APPLY.to_string();
        if !ctx.use_plan {
            ensure_auto_approve(&mut ctx.additional_args);
        }
    }

    if ctx.sub_command == SUBCOMMAND_APPLY && settings.apply_auto_approve && !ctx.use_plan {
        ensure_auto_approve(&mut ctx.additional_args);
    }
}

fn push_var_file(args: &mut Vec<String>, ctx: &InvocationContext) {
    args.push(VAR_FILE_FLAG.to_string());
    args.push(terraform_var_file_name(ctx));
}

/// Arguments of the `init` run that precedes other subcommands
pub fn build_init_args(ctx: &InvocationContext, settings: &TerraformSettings) -> Vec<String> {
    let mut args = vec![SUBCOMMAND_INIT.to_string()];
    if ctx.sub_command == SUBCOMMAND_WORKSPACE || settings.init_run_reconfigure {
        args.push(RECONFIGURE_FLAG.to_string());
    }
    if settings.init.pass_vars {
        push_var_file(&mut args, ctx);
    }
    args
}

/// The full argument vector for the primary terraform command
pub fn build_terraform_args(ctx: &InvocationContext, settings: &TerraformSettings) -> Vec<String> {
    let mut args: Vec<String> = ctx
        .sub_command
        .split_whitespace()
        .map(str::to_string)
        .collect();

    match ctx.sub_command.as_str() {
        SUBCOMMAND_PLAN => {
            push_var_file(&mut args, ctx);
            if !ctx.has_additional_flag(OUT_FLAG) && !settings.plan.skip_planfile {
                args.push(OUT_FLAG.to_string());
                args.push(terraform_plan_file_name(ctx));
            }
        }
        SUBCOMMAND_DESTROY | SUBCOMMAND_IMPORT | SUBCOMMAND_REFRESH => {
            push_var_file(&mut args, ctx);
        }
        SUBCOMMAND_APPLY => {
            if !ctx.use_plan {
                push_var_file(&mut args, ctx);
            }
        }
        SUBCOMMAND_INIT => {
            if settings.init_run_reconfigure {
                args.push(RECONFIGURE_FLAG.to_string());
            }
            if settings.init.pass_vars {
                push_var_file(&mut args, ctx);
            }
        }
        SUBCOMMAND_WORKSPACE => match ctx.sub_command2.as_str() {
            "" => {}
            "list" | "show" => args.push(ctx.sub_command2.clone()),
            other => {
                args.push(other.to_string());
                args.push(ctx.workspace.clone());
            }
        },
        _ => {}
    }

    args.extend(ctx.additional_args.iter().cloned());

    if ctx.sub_command == SUBCOMMAND_APPLY && ctx.use_plan {
        args.push(terraform_plan_file_name(ctx));
    }

    args
}

/// Value of `-f`/`--file` in the caller's arguments
pub fn file_flag_value(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-f" || arg == "--file" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--file=") {
            return Some(value.to_string());
        }
    }
    None
}
