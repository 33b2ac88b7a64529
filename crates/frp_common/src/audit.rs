//! Audit Logger - Append-only JSONL logging for all bypass activity
//!
//! Events are newline-delimited JSON. With encryption enabled every line is
//! hex(nonce || AES-256-GCM ciphertext) so the file stays line-oriented.

use crate::types::{BypassOutcome, DeviceInfo};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

pub const AUDIT_FILE: &str = "audit.jsonl";

/// Nonce length for AES-GCM records
const NONCE_LEN: usize = 12;

/// One audit trail event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub success: bool,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn device_detection(device: &DeviceInfo) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: "device_detection".to_string(),
            success: true,
            details: serde_json::json!({
                "model": device.model,
                "manufacturer": device.manufacturer,
                "android_version": device.android_version,
                "connection": device.connection.as_str(),
                "serial_partial": device.masked_serial(),
            }),
        }
    }

    pub fn bypass_attempt(
        device: &DeviceInfo,
        method: &str,
        outcome: BypassOutcome,
        duration_secs: f64,
        error: Option<&str>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: "bypass_attempt".to_string(),
            success: outcome.is_success(),
            details: serde_json::json!({
                "serial_partial": device.masked_serial(),
                "signature": device.signature(),
                "bypass_method": method,
                "outcome": outcome.as_str(),
                "duration_secs": duration_secs,
                "error": error,
            }),
        }
    }

    pub fn security(kind: &str, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: format!("security_{}", kind),
            success: true,
            details,
        }
    }

    pub fn general(event_type: &str, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            success: true,
            details,
        }
    }
}

/// Audit logger writing to a single append-only file
pub struct AuditLogger {
    log_path: PathBuf,
    cipher: Option<Aes256Gcm>,
}

impl AuditLogger {
    /// Create a logger under `logs_dir`. Pass a key to encrypt records.
    pub async fn new(logs_dir: &Path, key: Option<[u8; 32]>) -> Result<Self> {
        create_dir_all(logs_dir)
            .await
            .context("Failed to create audit log directory")?;

        let cipher = key.map(|k| Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&k)));
        let log_path = logs_dir.join(AUDIT_FILE);

        info!(
            "Audit logger initialized: {} (encrypted: {})",
            log_path.display(),
            cipher.is_some()
        );

        Ok(Self { log_path, cipher })
    }

    /// Append one event.
    pub async fn log(&self, event: &AuditEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let line = match &self.cipher {
            Some(cipher) => seal(cipher, &json)?,
            None => json,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .context("Failed to open audit log")?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await.context("Failed to sync audit log")?;

        Ok(())
    }

    /// Read back all parseable events.
    pub async fn read_all(&self) -> Result<Vec<AuditEvent>> {
        Ok(self
            .read_plaintext_lines()
            .await?
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    /// Decrypted (or raw, if unencrypted) log lines for display.
    /// Lines that fail to decrypt are kept with an error marker.
    pub async fn read_plaintext_lines(&self) -> Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(&self.log_path)
            .await
            .context("Failed to read audit log")?;

        let lines = content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| match &self.cipher {
                Some(cipher) => open(cipher, line)
                    .unwrap_or_else(|e| format!("[decryption error: {}]", e)),
                None => line.to_string(),
            })
            .collect();

        Ok(lines)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

fn seal(cipher: &Aes256Gcm, plaintext: &str) -> Result<String> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("Audit record encryption failed: {}", e))?;

    let mut record = nonce_bytes.to_vec();
    record.extend_from_slice(&ciphertext);
    Ok(hex::encode(record))
}

fn open(cipher: &Aes256Gcm, line: &str) -> Result<String> {
    let raw = hex::decode(line).context("not a hex record")?;
    if raw.len() <= NONCE_LEN {
        bail!("record too short");
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| anyhow::anyhow!("decrypt failed: {}", e))?;

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionMode, FrpStatus};
    use tempfile::TempDir;

    fn device() -> DeviceInfo {
        DeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM-G991B".to_string(),
            manufacturer: "Samsung".to_string(),
            android_version: "13.0".to_string(),
            sdk_version: "33".to_string(),
            bootloader_version: "unknown".to_string(),
            security_patch: "2023-05-01".to_string(),
            chipset: "exynos2100".to_string(),
            frp_status: FrpStatus::FrpLocked,
            connection: ConnectionMode::Adb,
        }
    }

    #[tokio::test]
    async fn plain_logging_round_trip() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path(), None).await.unwrap();

        logger
            .log(&AuditEvent::device_detection(&device()))
            .await
            .unwrap();
        logger
            .log(&AuditEvent::bypass_attempt(
                &device(),
                "adb_setup_wizard",
                BypassOutcome::Partial,
                42.5,
                None,
            ))
            .await
            .unwrap();

        let events = logger.read_all().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "device_detection");
        assert_eq!(events[1].event_type, "bypass_attempt");
        assert!(!events[1].success);
        assert_eq!(
            events[1].details.get("signature").and_then(|v| v.as_str()),
            Some("samsung|sm-g991b|13.0")
        );
        assert_eq!(
            events[1].details.get("duration_secs").and_then(|v| v.as_f64()),
            Some(42.5)
        );
    }

    #[tokio::test]
    async fn encrypted_logging_round_trip() {
        let dir = TempDir::new().unwrap();
        let key = [7u8; 32];
        let logger = AuditLogger::new(dir.path(), Some(key)).await.unwrap();

        logger
            .log(&AuditEvent::security(
                "rate_limit",
                serde_json::json!({"serial_partial": "R58M****"}),
            ))
            .await
            .unwrap();

        // raw file must not contain the plaintext
        let raw = std::fs::read_to_string(logger.path()).unwrap();
        assert!(!raw.contains("rate_limit"));

        let events = logger.read_all().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "security_rate_limit");
    }

    #[tokio::test]
    async fn wrong_key_yields_marker_line() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path(), Some([1u8; 32])).await.unwrap();
        logger
            .log(&AuditEvent::general("test", serde_json::json!({})))
            .await
            .unwrap();

        let other = AuditLogger {
            log_path: logger.path().to_path_buf(),
            cipher: Some(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&[2u8; 32]))),
        };

        let lines = other.read_plaintext_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[decryption error"));
    }

    #[test]
    fn serial_is_masked_in_events() {
        let event = AuditEvent::device_detection(&device());
        let rendered = serde_json::to_string(&event).unwrap();
        assert!(rendered.contains("R58M****"));
        assert!(!rendered.contains("R58M123ABC"));
    }
}
