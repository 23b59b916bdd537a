use crate::utils::{DeedError, Result};
use log::debug;
use std::io::ErrorKind;
use std::process::{Command, Output};

/// Run an external tool to completion and return its stdout.
///
/// A missing binary maps to `ToolNotFound`; a non-zero exit status maps
/// through `on_failure` with the tool's stderr.
pub fn run_tool<F>(mut command: Command, tool: &str, on_failure: F) -> Result<Vec<u8>>
where
    F: FnOnce(String) -> DeedError,
{
    debug!("Running {:?}", command);
    let output: Output = match command.output() {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(DeedError::ToolNotFound(tool.to_string()))
        }
        Err(e) => return Err(DeedError::Io(e)),
    };

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(on_failure(format!("{} failed ({}): {}", tool, output.status, stderr.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported_by_name() {
        let err = run_tool(
            Command::new("deedscan-no-such-tool"),
            "deedscan-no-such-tool",
            DeedError::Recognition,
        )
        .unwrap_err();
        assert!(matches!(err, DeedError::ToolNotFound(name) if name == "deedscan-no-such-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo broken page >&2; exit 3"]);
        let err = run_tool(command, "sh", DeedError::Rasterization).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken page"), "{}", msg);
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "printf hello"]);
        let out = run_tool(command, "sh", DeedError::Rasterization).unwrap();
        assert_eq!(out, b"hello");
    }
}
