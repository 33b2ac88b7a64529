//! Debug bridge client - shells out to the external adb binary.
//!
//! Output parsing follows the `[key]: [value]` property dump format and the
//! `adb devices -l` listing.

use frp_common::ToolError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured stdout/stderr of a finished tool invocation
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Locate a tool binary: bundled `tools/` directory next to the executable
/// first, then `$PATH`.
pub(crate) fn find_binary(name: &str) -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let bundled = dir.join("tools").join(name);
            if bundled.is_file() {
                return Some(bundled);
            }
        }
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Run a tool with a timeout, requiring a zero exit status.
pub(crate) async fn run_tool(
    tool: &'static str,
    binary: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    debug!("Running {} {:?}", tool, args);

    let output = tokio::time::timeout(timeout, Command::new(binary).args(args).output())
        .await
        .map_err(|_| ToolError::Timeout {
            tool,
            seconds: timeout.as_secs(),
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(ToolError::CommandFailed {
            tool,
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Client for the debug bridge binary
pub struct AdbClient {
    binary: PathBuf,
    timeout: Duration,
}

impl AdbClient {
    pub fn locate(timeout: Duration) -> Result<Self, ToolError> {
        let binary = find_binary("adb").ok_or(ToolError::NotFound { tool: "adb" })?;
        Ok(Self { binary, timeout })
    }

    #[allow(dead_code)]
    pub fn with_binary(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    async fn run(&self, args: &[&str]) -> Result<String, ToolError> {
        let output = run_tool("adb", &self.binary, args, self.timeout).await?;
        Ok(output.stdout)
    }

    /// Serials of devices in `device` or `recovery` state.
    pub async fn devices(&self) -> Result<Vec<String>, ToolError> {
        let stdout = self.run(&["devices", "-l"]).await?;
        Ok(parse_device_list(&stdout))
    }

    /// Run a shell command on a specific device, returning its stdout.
    pub async fn shell(&self, serial: &str, cmd: &[&str]) -> Result<String, ToolError> {
        let mut args = vec!["-s", serial, "shell"];
        args.extend_from_slice(cmd);
        self.run(&args).await
    }

    /// Full property dump as a key/value map.
    pub async fn properties(&self, serial: &str) -> Result<HashMap<String, String>, ToolError> {
        let stdout = self.shell(serial, &["getprop"]).await?;
        Ok(parse_properties(&stdout))
    }

    /// Single property value, trimmed.
    pub async fn property(&self, serial: &str, key: &str) -> Result<String, ToolError> {
        let stdout = self.shell(serial, &["getprop", key]).await?;
        Ok(stdout.trim().to_string())
    }
}

/// Parse `adb devices -l` output, keeping `device` and `recovery` states.
pub(crate) fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1) // header
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            matches!(state, "device" | "recovery").then(|| serial.to_string())
        })
        .collect()
}

/// Parse getprop dump lines of the form `[key]: [value]`.
pub(crate) fn parse_properties(output: &str) -> HashMap<String, String> {
    static PROP_LINE: OnceLock<Regex> = OnceLock::new();
    let re = PROP_LINE
        .get_or_init(|| Regex::new(r"\[([^\]]+)\]:\s*\[([^\]]*)\]").expect("static regex"));

    output
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some((caps[1].to_string(), caps[2].to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_list_skips_header_and_offline() {
        let output = "List of devices attached\n\
                      R58M123ABC\tdevice usb:1-1 product:beyond1\n\
                      emulator-5554\toffline\n\
                      XY99Z\trecovery\n";
        let serials = parse_device_list(output);
        assert_eq!(serials, vec!["R58M123ABC", "XY99Z"]);
    }

    #[test]
    fn device_list_handles_empty_output() {
        assert!(parse_device_list("List of devices attached\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn property_dump_parses_bracket_pairs() {
        let dump = "[ro.product.model]: [SM-G991B]\n\
                    [ro.product.manufacturer]: [samsung]\n\
                    [ro.build.version.release]: [13]\n\
                    [ro.frp.pst]: []\n\
                    not a property line\n";
        let props = parse_properties(dump);
        assert_eq!(props.get("ro.product.model").map(String::as_str), Some("SM-G991B"));
        assert_eq!(props.get("ro.frp.pst").map(String::as_str), Some(""));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn property_values_may_contain_colons() {
        let dump = "[ro.boot.boottime]: [1BLL:85,1BLE:898]\n";
        let props = parse_properties(dump);
        assert_eq!(
            props.get("ro.boot.boottime").map(String::as_str),
            Some("1BLL:85,1BLE:898")
        );
    }
}
