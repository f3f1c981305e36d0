// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Artifact naming per target platform and architecture.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root of the public Crosswalk release tree.
const RELEASES_ROOT: &str = "https://download.01.org/crosswalk/releases/crosswalk";

/// Target platform of the packaged application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Windows,
}

/// CPU architecture of the packaged application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    #[default]
    Arm,
    X86,
    Arm64,
    X86_64,
}

impl Arch {
    pub fn is_64bit(&self) -> bool {
        matches!(self, Arch::Arm64 | Arch::X86_64)
    }
}

impl Platform {
    /// Base URL of the release listings for this platform.
    pub fn default_base_url(&self) -> String {
        format!("{}/{}", RELEASES_ROOT, self)
    }
}

/// Filename of the runtime archive for a version on a platform/arch pair.
///
/// Android ships one archive for 32-bit targets and a `-64bit` archive for
/// 64-bit ones. Windows only publishes a 64-bit build.
pub fn artifact_file_name(platform: Platform, arch: Arch, version: &str) -> String {
    match (platform, arch) {
        (Platform::Android, Arch::Arm | Arch::X86) => format!("crosswalk-{}.zip", version),
        (Platform::Android, Arch::Arm64 | Arch::X86_64) => {
            format!("crosswalk-{}-64bit.zip", version)
        }
        (Platform::Windows, _) => format!("crosswalk64-{}.zip", version),
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Android => "android",
            Platform::Windows => "windows",
        })
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "windows" => Ok(Platform::Windows),
            other => Err(format!("unsupported platform '{}' (expected android or windows)", other)),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::Arm => "arm",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
        })
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm" | "armeabi-v7a" => Ok(Arch::Arm),
            "x86" => Ok(Arch::X86),
            "arm64" | "arm64-v8a" => Ok(Arch::Arm64),
            "x86_64" | "x86-64" => Ok(Arch::X86_64),
            other => Err(format!("unsupported architecture '{}'", other)),
        }
    }
}
