//! Bypass method catalog.
//!
//! A fixed table of known methods with declared metadata. Sections are gated
//! by config toggles so risky paths stay off unless explicitly enabled.

use frp_common::config::BypassConfig;
use frp_common::{MethodCategory, MethodDescriptor, RiskLevel};

pub struct MethodCatalog {
    methods: Vec<MethodDescriptor>,
}

impl MethodCatalog {
    pub fn load(config: &BypassConfig) -> Self {
        let mut methods = Vec::new();

        if config.adb_exploits {
            methods.push(descriptor(
                "adb_setup_wizard",
                "Exploit setup wizard to enable ADB debugging",
                MethodCategory::Adb,
                RiskLevel::Low,
                0.85,
                5,
                &["USB connection", "Setup wizard active"],
                &["Samsung", "Google", "LG", "HTC"],
                &["5.0", "6.0", "7.0", "8.0", "9.0"],
            ));
            methods.push(descriptor(
                "adb_talkback",
                "Use TalkBack accessibility to bypass FRP",
                MethodCategory::Adb,
                RiskLevel::Low,
                0.75,
                8,
                &["ADB access", "TalkBack available"],
                &["Samsung", "Google", "Xiaomi"],
                &["5.0", "6.0", "7.0", "8.0"],
            ));
        }

        if config.interface_exploits {
            methods.push(descriptor(
                "emergency_call_exploit",
                "Exploit emergency call interface to access settings",
                MethodCategory::Interface,
                RiskLevel::Low,
                0.70,
                10,
                &["Physical access", "Emergency call available"],
                &["Samsung", "LG", "HTC"],
                &["5.0", "6.0", "7.0"],
            ));
            methods.push(descriptor(
                "chrome_intent_exploit",
                "Use Chrome browser intent to bypass setup",
                MethodCategory::Interface,
                RiskLevel::Medium,
                0.65,
                12,
                &["ADB access", "Chrome browser"],
                &["Samsung", "Google", "Xiaomi"],
                &["6.0", "7.0", "8.0", "9.0"],
            ));
        }

        if config.bootloader_exploits {
            methods.push(descriptor(
                "accounts_db_modification",
                "Modify accounts database to remove FRP",
                MethodCategory::System,
                RiskLevel::Medium,
                0.90,
                15,
                &["Root access", "Custom recovery"],
                &["Samsung", "Google", "Xiaomi", "OnePlus"],
                &["5.0", "6.0", "7.0", "8.0", "9.0", "10.0"],
            ));
            methods.push(descriptor(
                "persist_partition_edit",
                "Edit persist partition to disable FRP",
                MethodCategory::System,
                RiskLevel::High,
                0.95,
                20,
                &["Unlocked bootloader", "Custom recovery"],
                &["Samsung", "Google", "Xiaomi"],
                &["6.0", "7.0", "8.0", "9.0", "10.0", "11.0"],
            ));
        }

        if config.hardware_methods {
            methods.push(descriptor(
                "download_mode_flash",
                "Flash custom firmware via download mode",
                MethodCategory::Hardware,
                RiskLevel::High,
                0.85,
                30,
                &["Download mode", "Custom firmware"],
                &["Samsung"],
                &["5.0", "6.0", "7.0", "8.0", "9.0", "10.0"],
            ));
            methods.push(descriptor(
                "qualcomm_edl_exploit",
                "Use Qualcomm EDL mode to bypass FRP",
                MethodCategory::Hardware,
                RiskLevel::High,
                0.80,
                45,
                &["EDL mode", "Qualcomm chipset"],
                &["Xiaomi", "OnePlus", "Google"],
                &["6.0", "7.0", "8.0", "9.0", "10.0", "11.0"],
            ));
        }

        Self { methods }
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[allow(clippy::too_many_arguments)]
fn descriptor(
    name: &str,
    description: &str,
    category: MethodCategory,
    risk: RiskLevel,
    success_rate: f64,
    estimated_minutes: u32,
    requirements: &[&str],
    supported_devices: &[&str],
    android_versions: &[&str],
) -> MethodDescriptor {
    MethodDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        category,
        risk,
        success_rate,
        estimated_minutes,
        requirements: requirements.iter().map(|s| s.to_string()).collect(),
        supported_devices: supported_devices.iter().map(|s| s.to_string()).collect(),
        android_versions: android_versions.iter().map(|s| s.to_string()).collect(),
    }
}
