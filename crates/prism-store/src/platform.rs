//! Target platform model (operating system × word size)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A buildable target platform.
///
/// The set is fixed: records for different platforms live in disjoint
/// snapshot partitions and acquisition runs one task per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "linux32")]
    Linux32,
    #[serde(rename = "linux64")]
    Linux64,
    #[serde(rename = "mac64")]
    Mac64,
    #[serde(rename = "win32")]
    Win32,
    #[serde(rename = "win64")]
    Win64,
}

/// Operating system family, used for linkage rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Unix,
    Windows,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown platform: {0}")]
pub struct PlatformParseError(pub String);

impl Platform {
    /// Every known platform
    pub const ALL: [Platform; 5] = [
        Platform::Linux32,
        Platform::Linux64,
        Platform::Mac64,
        Platform::Win32,
        Platform::Win64,
    ];

    /// Stable key used in manifests and snapshot files
    pub fn as_key(&self) -> &'static str {
        match self {
            Platform::Linux32 => "linux32",
            Platform::Linux64 => "linux64",
            Platform::Mac64 => "mac64",
            Platform::Win32 => "win32",
            Platform::Win64 => "win64",
        }
    }

    /// Operating system family
    pub fn family(&self) -> OsFamily {
        match self {
            Platform::Linux32 | Platform::Linux64 | Platform::Mac64 => OsFamily::Unix,
            Platform::Win32 | Platform::Win64 => OsFamily::Windows,
        }
    }

    /// Whether compiled modules on this platform dynamically link
    /// against the base runtime package
    pub fn needs_runtime_linkage(&self) -> bool {
        self.family() == OsFamily::Unix
    }

    /// Detect the platform of the running process.
    ///
    /// This is a process-lifetime constant; callers memoize it through
    /// a permanent cache.
    pub fn current() -> Platform {
        let wide = cfg!(target_pointer_width = "64");
        if cfg!(target_os = "windows") {
            if wide {
                Platform::Win64
            } else {
                Platform::Win32
            }
        } else if cfg!(target_os = "macos") {
            Platform::Mac64
        } else if wide {
            Platform::Linux64
        } else {
            Platform::Linux32
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .find(|p| p.as_key() == s)
            .copied()
            .ok_or_else(|| PlatformParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Platform::Linux32, "linux32")]
    #[case(Platform::Linux64, "linux64")]
    #[case(Platform::Mac64, "mac64")]
    #[case(Platform::Win32, "win32")]
    #[case(Platform::Win64, "win64")]
    fn test_key_roundtrip(#[case] platform: Platform, #[case] key: &str) {
        assert_eq!(platform.as_key(), key);
        assert_eq!(key.parse::<Platform>().unwrap(), platform);
        assert_eq!(platform.to_string(), key);
    }

    #[test]
    fn test_parse_unknown_platform() {
        let err = "beos64".parse::<Platform>().unwrap_err();
        assert_eq!(err, PlatformParseError("beos64".to_string()));
    }

    #[test]
    fn test_runtime_linkage_by_family() {
        assert!(Platform::Linux64.needs_runtime_linkage());
        assert!(Platform::Mac64.needs_runtime_linkage());
        assert!(!Platform::Win64.needs_runtime_linkage());
        assert!(!Platform::Win32.needs_runtime_linkage());
    }

    #[test]
    fn test_current_is_in_known_set() {
        assert!(Platform::ALL.contains(&Platform::current()));
    }

    #[test]
    fn test_serde_uses_stable_keys() {
        let json = serde_json::to_string(&Platform::Linux64).unwrap();
        assert_eq!(json, "\"linux64\"");
        let back: Platform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Platform::Linux64);
    }
}
