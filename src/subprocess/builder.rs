use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::subprocess::{OutputMode, ProcessCommand, StderrTarget};

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: ProcessCommand {
                program: program.to_string(),
                args: Vec::new(),
                env: HashMap::new(),
                working_dir: None,
                timeout: None,
                output: OutputMode::default(),
                stderr: StderrTarget::default(),
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Add `KEY=VALUE` entries; later entries win, malformed ones are skipped
    pub fn env_list<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    self.command.env.insert(key.to_string(), value.to_string());
                }
                _ => tracing::warn!("Ignoring malformed environment entry '{}'", entry),
            }
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.command.output = output;
        self
    }

    pub fn stderr(mut self, target: StderrTarget) -> Self {
        self.command.stderr = target;
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_list_later_entries_win() {
        let command = ProcessCommandBuilder::new("terraform")
            .env_list(["TF_IN_AUTOMATION=true", "REGION=us-east-2", "REGION=us-west-2"])
            .build();

        assert_eq!(command.env.get("REGION"), Some(&"us-west-2".to_string()));
        assert_eq!(command.env.get("TF_IN_AUTOMATION"), Some(&"true".to_string()));
    }

    #[test]
    fn test_env_list_keeps_equals_in_value() {
        let command = ProcessCommandBuilder::new("terraform")
            .env_list(["TF_CLI_ARGS_plan=-var-file=a.json", "BROKEN", "=nokey"])
            .build();

        assert_eq!(
            command.env.get("TF_CLI_ARGS_plan"),
            Some(&"-var-file=a.json".to_string())
        );
        assert_eq!(command.env.len(), 1);
    }
}
