//! Platform detection for camera sources

use std::env;

use crate::config::SourceKind;

/// Platform information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformInfo {
    /// macOS (Darwin)
    MacOS,

    /// Raspberry Pi (detected via /proc/device-tree)
    RaspberryPi,

    /// Generic Linux
    Linux,
}

impl PlatformInfo {
    /// Capture source used when the config says `auto`
    pub fn default_source(self) -> SourceKind {
        match self {
            PlatformInfo::MacOS => SourceKind::Avf,
            PlatformInfo::RaspberryPi => SourceKind::Libcamera,
            PlatformInfo::Linux => SourceKind::V4l2,
        }
    }
}

/// Detects current platform
pub fn detect_platform() -> PlatformInfo {
    match env::consts::OS {
        "macos" => PlatformInfo::MacOS,
        "linux" if is_raspberry_pi() => PlatformInfo::RaspberryPi,
        _ => PlatformInfo::Linux,
    }
}

/// Resolves `auto` against the platform; explicit choices pass through
pub fn resolve_source(kind: SourceKind, platform: PlatformInfo) -> SourceKind {
    match kind {
        SourceKind::Auto => platform.default_source(),
        other => other,
    }
}

/// Checks if running on Raspberry Pi
fn is_raspberry_pi() -> bool {
    let model = std::fs::read_to_string("/proc/device-tree/model")
        .or_else(|_| std::fs::read_to_string("/sys/firmware/devicetree/base/model"));
    matches!(model, Ok(m) if m.contains("Raspberry Pi"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        let platform = detect_platform();
        assert!(matches!(
            platform,
            PlatformInfo::MacOS | PlatformInfo::Linux | PlatformInfo::RaspberryPi
        ));
    }

    #[test]
    fn test_auto_source_per_platform() {
        assert_eq!(resolve_source(SourceKind::Auto, PlatformInfo::RaspberryPi), SourceKind::Libcamera);
        assert_eq!(resolve_source(SourceKind::Auto, PlatformInfo::Linux), SourceKind::V4l2);
        assert_eq!(resolve_source(SourceKind::Auto, PlatformInfo::MacOS), SourceKind::Avf);
    }

    #[test]
    fn test_explicit_source_kept() {
        assert_eq!(resolve_source(SourceKind::Test, PlatformInfo::RaspberryPi), SourceKind::Test);
        assert_eq!(resolve_source(SourceKind::V4l2, PlatformInfo::MacOS), SourceKind::V4l2);
    }
}
