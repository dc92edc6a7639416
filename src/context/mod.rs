//! The resolved unit of work for one invocation
//!
//! An [`InvocationContext`] is built once from the resolver document (the
//! component's sections in a stack) plus the command line, then handed to
//! the orchestrator. After construction only the subcommand and the
//! argument lists are ever changed.

pub mod tokens;

pub use tokens::ComponentContext;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::StackError;

/// A component's resolved configuration sections (`vars`, `env`, `backend`, ...)
pub type Sections = Map<String, Value>;

pub const SUBCOMMAND_VERSION: &str = "version";
pub const SUBCOMMAND_CLEAN: &str = "clean";
pub const SUBCOMMAND_VARFILE: &str = "varfile";
pub const SUBCOMMAND_WRITE: &str = "write";
pub const SUBCOMMAND_PLAN: &str = "plan";
pub const SUBCOMMAND_APPLY: &str = "apply";
pub const SUBCOMMAND_DEPLOY: &str = "deploy";
pub const SUBCOMMAND_DESTROY: &str = "destroy";
pub const SUBCOMMAND_IMPORT: &str = "import";
pub const SUBCOMMAND_REFRESH: &str = "refresh";
pub const SUBCOMMAND_INIT: &str = "init";
pub const SUBCOMMAND_WORKSPACE: &str = "workspace";
pub const SUBCOMMAND_SHELL: &str = "shell";
pub const SUBCOMMAND_SHOW: &str = "show";
pub const SUBCOMMAND_PLAN_DIFF: &str = "plan-diff";
pub const SUBCOMMAND_SYNC: &str = "sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Terraform,
    Helmfile,
}

impl ToolKind {
    /// Executable used when neither the context nor the config names one
    pub fn default_command(&self) -> &'static str {
        self.component_type()
    }

    pub fn component_type(&self) -> &'static str {
        match self {
            ToolKind::Terraform => "terraform",
            ToolKind::Helmfile => "helmfile",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.component_type())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvocationContext {
    pub tool: ToolKind,
    /// Executable override; empty means use the configured command
    pub command: String,
    pub sub_command: String,
    pub sub_command2: String,

    /// Component as given on the command line
    pub component_from_arg: String,
    /// Component name after alias resolution
    pub component: String,
    /// Directory name of the component under the tool's base path
    pub final_component: String,
    pub component_folder_prefix: String,
    pub base_component: String,

    pub stack_from_arg: String,
    pub stack: String,

    pub vars: Map<String, Value>,
    /// `KEY=VALUE` entries from the component's `env` section
    pub env_list: Vec<String>,
    pub backend_type: String,
    pub backend: Map<String, Value>,
    pub providers: Map<String, Value>,
    pub workspace: String,
    pub inheritance: Vec<String>,
    pub settings: Map<String, Value>,
    /// The full resolver document, for collaborators that need it
    pub sections: Sections,

    pub dry_run: bool,
    pub skip_init: bool,
    /// Consume a previously generated plan instead of planning again
    pub use_plan: bool,
    pub plan_file: Option<String>,
    pub var_file: Option<String>,
    pub redirect_stderr: Option<String>,
    pub enabled: bool,
    pub is_abstract: bool,
    pub locked: bool,
    pub force: bool,

    /// Caller arguments appended after all generated flags
    pub additional_args: Vec<String>,
    /// Helmfile options placed before the subcommand
    pub global_options: Vec<String>,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            command: String::new(),
            sub_command: String::new(),
            sub_command2: String::new(),
            component_from_arg: String::new(),
            component: String::new(),
            final_component: String::new(),
            component_folder_prefix: String::new(),
            base_component: String::new(),
            stack_from_arg: String::new(),
            stack: String::new(),
            vars: Map::new(),
            env_list: Vec::new(),
            backend_type: String::new(),
            backend: Map::new(),
            providers: Map::new(),
            workspace: String::new(),
            inheritance: Vec::new(),
            settings: Map::new(),
            sections: Sections::new(),
            dry_run: false,
            skip_init: false,
            use_plan: false,
            plan_file: None,
            var_file: None,
            redirect_stderr: None,
            enabled: true,
            is_abstract: false,
            locked: false,
            force: false,
            additional_args: Vec::new(),
            global_options: Vec::new(),
        }
    }
}

fn str_of<'a>(sections: &'a Sections, key: &str) -> Option<&'a str> {
    sections
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn map_of(sections: &Sections, key: &str) -> Map<String, Value> {
    sections
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn env_entry(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) => format!("{key}={s}"),
        Value::Null => format!("{key}="),
        other => format!("{key}={other}"),
    }
}

impl InvocationContext {
    /// Build a context from a resolver document
    ///
    /// Recognized sections: `component`, `stack`, `workspace`, `command`,
    /// `vars`, `env`, `backend_type`, `backend`, `providers`, `settings`,
    /// `inheritance`, `base_component` and `metadata` (`type: abstract`,
    /// `locked`, `enabled`).
    pub fn from_sections(
        tool: ToolKind,
        component_from_arg: &str,
        stack_from_arg: &str,
        sections: Sections,
    ) -> Result<Self, StackError> {
        if let Some(vars) = sections.get("vars") {
            if !vars.is_object() && !vars.is_null() {
                return Err(StackError::invalid_invocation(format!(
                    "the `vars` section of component '{component_from_arg}' must be a map"
                )));
            }
        }

        let metadata = map_of(&sections, "metadata");
        let component = str_of(&sections, "component")
            .unwrap_or(component_from_arg)
            .to_string();

        let (component_folder_prefix, final_component) =
            match str_of(&sections, "component_folder_prefix") {
                Some(prefix) => (prefix.to_string(), component.clone()),
                None => match component.rsplit_once('/') {
                    Some((prefix, name)) => (prefix.to_string(), name.to_string()),
                    None => (String::new(), component.clone()),
                },
            };

        let env_list = map_of(&sections, "env")
            .iter()
            .map(|(key, value)| env_entry(key, value))
            .collect();

        let inheritance = sections
            .get("inheritance")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let stack = str_of(&sections, "stack")
            .unwrap_or(stack_from_arg)
            .to_string();
        let workspace = str_of(&sections, "workspace")
            .map(str::to_string)
            .unwrap_or_else(|| context_prefix(&stack));

        Ok(Self {
            tool,
            command: str_of(&sections, "command").unwrap_or_default().to_string(),
            component_from_arg: component_from_arg.to_string(),
            component,
            final_component,
            component_folder_prefix,
            base_component: str_of(&sections, "base_component")
                .unwrap_or_default()
                .to_string(),
            stack_from_arg: stack_from_arg.to_string(),
            stack,
            vars: map_of(&sections, "vars"),
            env_list,
            backend_type: str_of(&sections, "backend_type")
                .unwrap_or_default()
                .to_string(),
            backend: map_of(&sections, "backend"),
            providers: map_of(&sections, "providers"),
            workspace,
            inheritance,
            settings: map_of(&sections, "settings"),
            enabled: metadata
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            is_abstract: metadata.get("type").and_then(Value::as_str) == Some("abstract"),
            locked: metadata
                .get("locked")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            sections,
            ..Self::default()
        })
    }

    /// Stack name made safe for file names
    pub fn context_prefix(&self) -> String {
        context_prefix(&self.stack)
    }

    pub fn component_context(&self) -> ComponentContext {
        ComponentContext::from_vars(&self.vars)
    }

    /// Executable to run, honouring the context override
    pub fn executable<'a>(&'a self, configured: &'a str) -> &'a str {
        if !self.command.is_empty() {
            &self.command
        } else if !configured.is_empty() {
            configured
        } else {
            self.tool.default_command()
        }
    }

    /// `varfile` and the legacy `write varfile`
    pub fn is_materialize_varfile(&self) -> bool {
        self.sub_command == SUBCOMMAND_VARFILE
            || (self.sub_command == SUBCOMMAND_WRITE && self.sub_command2 == SUBCOMMAND_VARFILE)
    }

    /// `subcommand [subcommand2]` for messages
    pub fn command_line(&self) -> String {
        if self.sub_command2.is_empty() {
            self.sub_command.clone()
        } else {
            format!("{} {}", self.sub_command, self.sub_command2)
        }
    }

    /// Component path relative to the tool base path, for messages
    pub fn qualified_component(&self) -> String {
        if self.component_folder_prefix.is_empty() {
            self.component.clone()
        } else {
            format!("{}/{}", self.component_folder_prefix, self.component)
        }
    }

    /// `component -> base -> ...` or empty when nothing is inherited
    pub fn inheritance_chain(&self) -> String {
        if self.inheritance.is_empty() {
            String::new()
        } else {
            format!(
                "{} -> {}",
                self.component_from_arg,
                self.inheritance.join(" -> ")
            )
        }
    }

    /// Whether the caller already passed `flag` (as `flag` or `flag=value`)
    pub fn has_additional_flag(&self, flag: &str) -> bool {
        let with_value = format!("{flag}=");
        self.additional_args
            .iter()
            .any(|arg| arg == flag || arg.starts_with(&with_value))
    }
}

/// Replace path separators in a stack name with `-`
pub fn context_prefix(stack: &str) -> String {
    stack.replace(['/', '\\'], "-")
}
