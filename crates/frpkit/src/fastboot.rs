//! Bootloader flasher client.
//!
//! fastboot prints `getvar` results on stderr, so variable parsing reads the
//! stderr stream rather than stdout.

use crate::adb::{find_binary, run_tool};
use frp_common::ToolError;
use std::path::PathBuf;
use std::time::Duration;

pub struct FastbootClient {
    binary: PathBuf,
    timeout: Duration,
}

impl FastbootClient {
    pub fn locate(timeout: Duration) -> Result<Self, ToolError> {
        let binary = find_binary("fastboot").ok_or(ToolError::NotFound { tool: "fastboot" })?;
        Ok(Self { binary, timeout })
    }

    #[allow(dead_code)]
    pub fn with_binary(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    /// Serials of devices waiting in fastboot mode.
    pub async fn devices(&self) -> Result<Vec<String>, ToolError> {
        let output = run_tool("fastboot", &self.binary, &["devices"], self.timeout).await?;
        Ok(parse_serials(&output.stdout))
    }

    /// Query a bootloader variable. Returns None when the variable is absent.
    pub async fn getvar(&self, serial: &str, var: &str) -> Result<Option<String>, ToolError> {
        let output = run_tool(
            "fastboot",
            &self.binary,
            &["-s", serial, "getvar", var],
            self.timeout,
        )
        .await?;
        Ok(parse_getvar(&output.stderr, var))
    }
}

fn parse_serials(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|serial| serial.to_string())
        .collect()
}

/// Extract `var: value` from getvar stderr output.
fn parse_getvar(stderr: &str, var: &str) -> Option<String> {
    stderr.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == var).then(|| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_list_parses_tab_separated() {
        let output = "R58M123ABC\tfastboot\n0a1b2c3d\tfastboot\n";
        assert_eq!(parse_serials(output), vec!["R58M123ABC", "0a1b2c3d"]);
    }

    #[test]
    fn getvar_reads_stderr_format() {
        let stderr = "product: beyond1lte\nFinished. Total time: 0.002s\n";
        assert_eq!(parse_getvar(stderr, "product"), Some("beyond1lte".to_string()));
        assert_eq!(parse_getvar(stderr, "version-bootloader"), None);
    }

    #[test]
    fn getvar_ignores_unrelated_colon_lines() {
        let stderr = "version-bootloader: G991BXXU5DVJA\nFinished. Total time: 0.001s\n";
        assert_eq!(
            parse_getvar(stderr, "version-bootloader"),
            Some("G991BXXU5DVJA".to_string())
        );
    }
}
