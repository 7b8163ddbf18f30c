use crate::{config::Platform, device::DeviceClassifier};

/// Admin context wins over any device classification.
pub fn select_platform(is_admin: bool, device: &dyn DeviceClassifier) -> Platform {
    if is_admin {
        Platform::Admin
    } else if device.is_tablet() {
        Platform::TouchPad
    } else if device.is_mobile() {
        Platform::TouchPhone
    } else {
        Platform::Desktop
    }
}
