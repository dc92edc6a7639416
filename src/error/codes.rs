/// Error code registry for stackctl
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Invocation and guard errors
/// - 3000-3999: Artifact and backend state errors
/// - 4000-4999: Execution errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;

    // Invocation and guard errors (2000-2999)
    pub const INVOCATION_INVALID: u16 = 2000;
    pub const INVOCATION_MISSING_STACK: u16 = 2001;
    pub const COMPONENT_INVALID: u16 = 2002;
    pub const COMPONENT_ABSTRACT: u16 = 2003;
    pub const COMPONENT_LOCKED: u16 = 2004;
    pub const COMPONENT_NOT_VALID: u16 = 2005;
    pub const WORKSPACE_UNSUPPORTED: u16 = 2006;
    pub const TTY_REQUIRED: u16 = 2007;

    // Artifact and backend state errors (3000-3999)
    pub const ARTIFACT_WRITE_FAILED: u16 = 3001;
    pub const BACKEND_UNSUPPORTED_TYPE: u16 = 3010;
    pub const BACKEND_STATE_PARSE: u16 = 3011;
    pub const BACKEND_READ_FAILED: u16 = 3012;
    pub const BACKEND_CONFIGURATION: u16 = 3013;
    pub const BACKEND_INVALID_QUERY: u16 = 3014;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;
    pub const EXEC_PLAN_DIFF: u16 = 4020;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1004 => "Required configuration value is missing",

        2000 => "Invalid invocation",
        2001 => "Stack was not specified",
        2002 => "Component directory does not exist",
        2003 => "Abstract component cannot be provisioned",
        2004 => "Locked component cannot be modified",
        2005 => "Component did not pass validation policies",
        2006 => "Backend does not support workspaces",
        2007 => "Interactive terminal required",

        3001 => "Failed to write artifact file",
        3010 => "Unsupported backend type",
        3011 => "Failed to process state file",
        3012 => "Failed to read backend state",
        3013 => "Invalid backend configuration",
        3014 => "Invalid output query expression",

        4000 => "Generic execution error",
        4001 => "Command not found",
        4002 => "Command timed out",
        4003 => "Subprocess failed",
        4005 => "Subprocess terminated by signal",
        4007 => "Failed to spawn process",
        4020 => "Plan comparison failed",

        9000 => "Generic error",
        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_descriptions() {
        for code in [
            ErrorCode::INVOCATION_MISSING_STACK,
            ErrorCode::COMPONENT_ABSTRACT,
            ErrorCode::COMPONENT_LOCKED,
            ErrorCode::BACKEND_UNSUPPORTED_TYPE,
            ErrorCode::BACKEND_STATE_PARSE,
        ] {
            assert_ne!(describe_error_code(code), "Unknown error code");
        }
        assert_eq!(describe_error_code(1234), "Unknown error code");
    }
}
