//! Device detection and property scraping.
//!
//! Scans the debug bridge and the flasher for connected devices, pulls a
//! property snapshot per serial, and classifies the FRP lock state. Missing
//! tool binaries degrade to a warning; the scan returns whatever is
//! reachable.

use crate::adb::AdbClient;
use crate::fastboot::FastbootClient;
use anyhow::{Context, Result};
use frp_common::{Config, ConnectionMode, DeviceInfo, FrpStatus};
use std::time::Duration;
use tracing::{error, info, warn};

const UNKNOWN: &str = "unknown";

pub struct DeviceManager {
    adb: Option<AdbClient>,
    fastboot: Option<FastbootClient>,
    devices: Vec<DeviceInfo>,
}

impl DeviceManager {
    pub fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.device.timeout_secs);

        let adb = match AdbClient::locate(timeout) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{}. ADB features disabled.", e);
                None
            }
        };

        let fastboot = match FastbootClient::locate(timeout) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{}. Fastboot features disabled.", e);
                None
            }
        };

        Self {
            adb,
            fastboot,
            devices: Vec::new(),
        }
    }

    /// Scan all transports for connected devices and cache the result.
    pub async fn scan_devices(&mut self) -> Vec<DeviceInfo> {
        info!("Scanning for connected devices...");

        let mut devices = Vec::new();
        devices.extend(self.scan_adb().await);
        devices.extend(self.scan_fastboot().await);
        // Download-mode detection (Odin, EDL) would slot in here; no
        // portable probe exists for it today.

        info!("Found {} connected device(s)", devices.len());
        self.devices = devices.clone();
        devices
    }

    /// Last scan result without re-probing.
    pub fn connected_devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn device_by_serial(&self, serial: &str) -> Option<&DeviceInfo> {
        self.devices.iter().find(|d| d.serial == serial)
    }

    /// Re-probe one device and update the cached entry.
    pub async fn refresh_device(&mut self, serial: &str) -> Option<DeviceInfo> {
        let current = self.device_by_serial(serial)?.clone();

        let updated = match current.connection {
            ConnectionMode::Adb => self.adb_device_info(serial).await,
            ConnectionMode::Fastboot => self.fastboot_device_info(serial).await,
            ConnectionMode::Download => return Some(current),
        };

        match updated {
            Some(device) => {
                if let Some(slot) = self.devices.iter_mut().find(|d| d.serial == serial) {
                    *slot = device.clone();
                }
                Some(device)
            }
            None => Some(current),
        }
    }

    /// Run a shell command on an ADB device.
    pub async fn adb_shell(&self, serial: &str, cmd: &[&str]) -> Result<String> {
        let adb = self.adb.as_ref().context("ADB not available")?;
        Ok(adb.shell(serial, cmd).await?)
    }

    async fn scan_adb(&self) -> Vec<DeviceInfo> {
        let Some(adb) = &self.adb else {
            return Vec::new();
        };

        let serials = match adb.devices().await {
            Ok(serials) => serials,
            Err(e) => {
                error!("Error scanning ADB devices: {}", e);
                return Vec::new();
            }
        };

        let mut devices = Vec::new();
        for serial in serials {
            if let Some(device) = self.adb_device_info(&serial).await {
                devices.push(device);
            }
        }
        devices
    }

    async fn adb_device_info(&self, serial: &str) -> Option<DeviceInfo> {
        let adb = self.adb.as_ref()?;

        let props = match adb.properties(serial).await {
            Ok(props) => props,
            Err(e) => {
                error!("Error getting device info for {}: {}", serial, e);
                return None;
            }
        };

        let prop = |key: &str| {
            props
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        let frp_status = self.check_frp_status(serial).await;

        Some(DeviceInfo {
            serial: serial.to_string(),
            model: prop("ro.product.model"),
            manufacturer: prop("ro.product.manufacturer"),
            android_version: prop("ro.build.version.release"),
            sdk_version: prop("ro.build.version.sdk"),
            bootloader_version: prop("ro.bootloader"),
            security_patch: prop("ro.build.version.security_patch"),
            chipset: prop("ro.hardware"),
            frp_status,
            connection: ConnectionMode::Adb,
        })
    }

    /// Probe the three FRP signals over ADB and classify them.
    async fn check_frp_status(&self, serial: &str) -> FrpStatus {
        let Some(adb) = &self.adb else {
            return FrpStatus::Unknown;
        };

        let frp_pst = adb.property(serial, "ro.frp.pst").await.ok();
        let accounts = adb
            .shell(
                serial,
                &[
                    "sqlite3",
                    "/data/system/users/0/accounts.db",
                    "'SELECT count(*) FROM accounts'",
                ],
            )
            .await
            .ok();
        let setup_complete = adb
            .shell(serial, &["settings", "get", "secure", "user_setup_complete"])
            .await
            .ok();

        classify_frp_status(
            frp_pst.as_deref(),
            accounts.as_deref(),
            setup_complete.as_deref(),
        )
    }

    async fn scan_fastboot(&self) -> Vec<DeviceInfo> {
        let Some(fastboot) = &self.fastboot else {
            return Vec::new();
        };

        let serials = match fastboot.devices().await {
            Ok(serials) => serials,
            Err(e) => {
                error!("Error scanning fastboot devices: {}", e);
                return Vec::new();
            }
        };

        let mut devices = Vec::new();
        for serial in serials {
            if let Some(device) = self.fastboot_device_info(&serial).await {
                devices.push(device);
            }
        }
        devices
    }

    async fn fastboot_device_info(&self, serial: &str) -> Option<DeviceInfo> {
        let fastboot = self.fastboot.as_ref()?;

        let product = fastboot.getvar(serial, "product").await.ok().flatten();
        let bootloader = fastboot
            .getvar(serial, "version-bootloader")
            .await
            .ok()
            .flatten();

        // Fastboot exposes very little; most fields stay unknown until the
        // device boots into a mode the bridge can reach.
        Some(DeviceInfo {
            serial: serial.to_string(),
            model: product.unwrap_or_else(|| UNKNOWN.to_string()),
            manufacturer: UNKNOWN.to_string(),
            android_version: UNKNOWN.to_string(),
            sdk_version: UNKNOWN.to_string(),
            bootloader_version: bootloader.unwrap_or_else(|| UNKNOWN.to_string()),
            security_patch: UNKNOWN.to_string(),
            chipset: UNKNOWN.to_string(),
            frp_status: FrpStatus::Unknown,
            connection: ConnectionMode::Fastboot,
        })
    }
}

/// Classify the FRP lock state from the three probe signals, strongest
/// first: persistent FRP property, accounts database row count, setup
/// wizard completion flag. A signal that is missing or unparseable falls
/// through to the next.
pub(crate) fn classify_frp_status(
    frp_pst: Option<&str>,
    accounts_count: Option<&str>,
    setup_complete: Option<&str>,
) -> FrpStatus {
    if let Some(value) = frp_pst.map(str::trim) {
        if !value.is_empty() {
            return if matches!(value, "0" | "none") {
                FrpStatus::Disabled
            } else {
                FrpStatus::Enabled
            };
        }
    }

    if let Some(count) = accounts_count {
        if let Ok(n) = count.trim().parse::<u64>() {
            return if n > 0 {
                FrpStatus::Enabled
            } else {
                FrpStatus::Disabled
            };
        }
    }

    match setup_complete.map(str::trim) {
        Some("0") => FrpStatus::FrpLocked,
        Some("1") => FrpStatus::SetupComplete,
        _ => FrpStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frp_property_wins_over_weaker_signals() {
        assert_eq!(
            classify_frp_status(Some("/dev/block/persistent"), Some("0"), Some("1")),
            FrpStatus::Enabled
        );
        assert_eq!(
            classify_frp_status(Some("0"), Some("2"), None),
            FrpStatus::Disabled
        );
        assert_eq!(
            classify_frp_status(Some("none"), None, None),
            FrpStatus::Disabled
        );
    }

    #[test]
    fn empty_property_falls_through_to_accounts() {
        assert_eq!(
            classify_frp_status(Some(""), Some("2\n"), None),
            FrpStatus::Enabled
        );
        assert_eq!(
            classify_frp_status(Some(""), Some("0"), Some("0")),
            FrpStatus::Disabled
        );
    }

    #[test]
    fn unreadable_accounts_db_falls_through_to_setup_flag() {
        let sqlite_error = Some("Error: unable to open database file");
        assert_eq!(
            classify_frp_status(None, sqlite_error, Some("0\n")),
            FrpStatus::FrpLocked
        );
        assert_eq!(
            classify_frp_status(None, sqlite_error, Some("1")),
            FrpStatus::SetupComplete
        );
    }

    #[test]
    fn no_usable_signal_is_unknown() {
        assert_eq!(classify_frp_status(None, None, None), FrpStatus::Unknown);
        assert_eq!(
            classify_frp_status(Some(""), Some("null"), Some("garbage")),
            FrpStatus::Unknown
        );
    }
}
