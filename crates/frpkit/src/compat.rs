//! Method/device compatibility rules.
//!
//! A method applies to a device when the brand is on its supported list, the
//! Android version matches exactly or by major release, and the device's
//! connection mode can carry the method's category. Unknown device fields
//! are treated permissively so fastboot-only snapshots still get candidates.

use frp_common::{ConnectionMode, DeviceInfo, MethodCategory, MethodDescriptor};

pub fn is_compatible(method: &MethodDescriptor, device: &DeviceInfo) -> bool {
    brand_supported(method, device)
        && version_supported(method, device)
        && connection_supported(method, device)
}

fn brand_supported(method: &MethodDescriptor, device: &DeviceInfo) -> bool {
    let brand = device.brand();
    if brand == "unknown" {
        return true;
    }
    method
        .supported_devices
        .iter()
        .any(|supported| supported.to_lowercase() == brand)
}

fn version_supported(method: &MethodDescriptor, device: &DeviceInfo) -> bool {
    let version = device.android_version.trim();
    if version.is_empty() || version == "unknown" {
        return true;
    }

    let major = version.split('.').next().unwrap_or(version);
    method.android_versions.iter().any(|supported| {
        supported == version || supported.split('.').next() == Some(major)
    })
}

fn connection_supported(method: &MethodDescriptor, device: &DeviceInfo) -> bool {
    match method.category {
        MethodCategory::Adb => device.connection == ConnectionMode::Adb,
        MethodCategory::Hardware => matches!(
            device.connection,
            ConnectionMode::Fastboot | ConnectionMode::Download
        ),
        MethodCategory::Interface | MethodCategory::System => true,
    }
}
