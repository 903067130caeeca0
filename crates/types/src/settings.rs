//! The settings bundle: target os, architecture, compiler and build type
//!
//! Settings are read-only input supplied by the invoking framework, either
//! as `key=value` pairs (`compiler.version=13`) or from a profile file.

use crate::cppstd::CppStd;
use crate::version::parse_loose;
use kiln_errors::{ConfigurationError, VersionError};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

macro_rules! setting_enum {
    ($(#[$meta:meta])* $name:ident, $key:literal { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigurationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_ascii_lowercase();
                $(
                    if lowered == $text.to_ascii_lowercase() $(|| lowered == $alias)* {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ConfigurationError::InvalidSetting {
                    key: $key.to_string(),
                    value: s.to_string(),
                })
            }
        }
    };
}

setting_enum!(
    /// Target operating system
    Os, "os" {
        Linux => "Linux",
        Macos => "Macos" | "macos" | "darwin",
        Windows => "Windows",
        FreeBsd => "FreeBSD",
        Android => "Android",
        Ios => "iOS",
    }
);

setting_enum!(
    /// Target CPU architecture
    Arch, "arch" {
        X86 => "x86",
        X86_64 => "x86_64" | "amd64",
        Armv7 => "armv7",
        Armv8 => "armv8" | "aarch64" | "arm64",
        Ppc64le => "ppc64le",
        Riscv64 => "riscv64",
        S390x => "s390x",
        Wasm => "wasm",
    }
);

setting_enum!(
    /// Compiler family
    CompilerKind, "compiler" {
        Gcc => "gcc",
        Clang => "clang",
        AppleClang => "apple-clang",
        Msvc => "msvc",
        VisualStudio => "Visual Studio",
        IntelCc => "intel-cc",
    }
);

setting_enum!(
    /// CMake-style build configuration
    BuildType, "build_type" {
        Release => "Release",
        Debug => "Debug",
        RelWithDebInfo => "RelWithDebInfo",
        MinSizeRel => "MinSizeRel",
    }
);

setting_enum!(
    /// C/C++ runtime linkage
    Runtime, "compiler.runtime" {
        Static => "static" | "mt" | "mtd",
        Dynamic => "dynamic" | "md" | "mdd",
    }
);

impl CompilerKind {
    /// True for both spellings of the Microsoft compiler
    #[must_use]
    pub fn is_msvc(self) -> bool {
        matches!(self, Self::Msvc | Self::VisualStudio)
    }
}

impl Os {
    /// Operating system kiln itself runs on
    #[must_use]
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            "freebsd" => Some(Self::FreeBsd),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            _ => None,
        }
    }
}

impl Arch {
    /// Architecture kiln itself runs on
    #[must_use]
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X86_64),
            "arm" => Some(Self::Armv7),
            "aarch64" => Some(Self::Armv8),
            "powerpc64" => Some(Self::Ppc64le),
            "riscv64" => Some(Self::Riscv64),
            "s390x" => Some(Self::S390x),
            "wasm32" => Some(Self::Wasm),
            _ => None,
        }
    }
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub kind: CompilerKind,
    /// Loose version as written (`7`, `7.5`, `192`)
    pub version: String,
    pub cppstd: Option<CppStd>,
    pub runtime: Option<Runtime>,
    pub libcxx: Option<String>,
}

impl CompilerSettings {
    /// Parsed compiler version
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the stored version is not a loose version.
    pub fn parsed_version(&self) -> Result<Version, VersionError> {
        parse_loose(&self.version)
    }
}

/// Build machine description, present when cross-building is possible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMachine {
    pub os: Os,
    pub arch: Arch,
}

/// The complete settings bundle for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: CompilerSettings,
    pub build_type: BuildType,
    pub build: Option<BuildMachine>,
}

impl Settings {
    /// Start building a settings bundle from key/value pairs
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Whether the build machine differs from the host (target) machine
    #[must_use]
    pub fn is_cross_building(&self) -> bool {
        self.build
            .is_some_and(|build| build.os != self.os || build.arch != self.arch)
    }

    #[must_use]
    pub fn is_msvc(&self) -> bool {
        self.compiler.kind.is_msvc()
    }

    /// Flatten into `key=value` form, as written in profiles
    #[must_use]
    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        let mut pairs = BTreeMap::new();
        pairs.insert("os".to_string(), self.os.to_string());
        pairs.insert("arch".to_string(), self.arch.to_string());
        pairs.insert("build_type".to_string(), self.build_type.to_string());
        pairs.insert("compiler".to_string(), self.compiler.kind.to_string());
        pairs.insert("compiler.version".to_string(), self.compiler.version.clone());
        if let Some(cppstd) = self.compiler.cppstd {
            pairs.insert("compiler.cppstd".to_string(), cppstd.to_string());
        }
        if let Some(runtime) = self.compiler.runtime {
            pairs.insert("compiler.runtime".to_string(), runtime.to_string());
        }
        if let Some(libcxx) = &self.compiler.libcxx {
            pairs.insert("compiler.libcxx".to_string(), libcxx.clone());
        }
        if let Some(build) = self.build {
            pairs.insert("build.os".to_string(), build.os.to_string());
            pairs.insert("build.arch".to_string(), build.arch.to_string());
        }
        pairs
    }
}

/// Accumulates `key=value` settings; later values override earlier ones
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    os: Option<Os>,
    arch: Option<Arch>,
    compiler: Option<CompilerKind>,
    compiler_version: Option<String>,
    cppstd: Option<CppStd>,
    runtime: Option<Runtime>,
    libcxx: Option<String>,
    build_type: Option<BuildType>,
    build_os: Option<Os>,
    build_arch: Option<Arch>,
}

impl SettingsBuilder {
    /// Set a single setting
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSetting` for unknown keys or
    /// unparsable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<&mut Self, ConfigurationError> {
        let value = value.trim();
        match key.trim() {
            "os" => self.os = Some(value.parse()?),
            "arch" => self.arch = Some(value.parse()?),
            "build_type" => self.build_type = Some(value.parse()?),
            "compiler" => self.compiler = Some(value.parse()?),
            "compiler.version" => {
                parse_loose(value).map_err(|_| ConfigurationError::InvalidSetting {
                    key: "compiler.version".to_string(),
                    value: value.to_string(),
                })?;
                self.compiler_version = Some(value.to_string());
            }
            "compiler.cppstd" => self.cppstd = Some(value.parse()?),
            "compiler.runtime" => self.runtime = Some(value.parse()?),
            "compiler.libcxx" => self.libcxx = Some(value.to_string()),
            "build.os" | "os_build" => self.build_os = Some(value.parse()?),
            "build.arch" | "arch_build" => self.build_arch = Some(value.parse()?),
            other => {
                return Err(ConfigurationError::InvalidSetting {
                    key: other.to_string(),
                    value: value.to_string(),
                })
            }
        }
        Ok(self)
    }

    /// Set a setting from a `key=value` pair
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSetting` if the pair has no `=`
    /// or `set` rejects it.
    pub fn set_pair(&mut self, pair: &str) -> Result<&mut Self, ConfigurationError> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ConfigurationError::InvalidSetting {
                key: pair.to_string(),
                value: String::new(),
            })?;
        self.set(key, value)
    }

    /// Finish the bundle
    ///
    /// `os` and `arch` default to the host, `build_type` to Release. The
    /// build machine is recorded when either `build.os` or `build.arch` is
    /// given; the missing half is taken from the host.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingSetting` when the compiler or its
    /// version is absent, or os/arch cannot be derived from the host.
    pub fn build(&self) -> Result<Settings, ConfigurationError> {
        let missing = |key: &str| ConfigurationError::MissingSetting {
            key: key.to_string(),
        };

        let os = self.os.or_else(Os::host).ok_or_else(|| missing("os"))?;
        let arch = self.arch.or_else(Arch::host).ok_or_else(|| missing("arch"))?;
        let kind = self.compiler.ok_or_else(|| missing("compiler"))?;
        let version = self
            .compiler_version
            .clone()
            .ok_or_else(|| missing("compiler.version"))?;

        let build = if self.build_os.is_some() || self.build_arch.is_some() {
            Some(BuildMachine {
                os: self
                    .build_os
                    .or_else(Os::host)
                    .ok_or_else(|| missing("build.os"))?,
                arch: self
                    .build_arch
                    .or_else(Arch::host)
                    .ok_or_else(|| missing("build.arch"))?,
            })
        } else {
            None
        };

        Ok(Settings {
            os,
            arch,
            compiler: CompilerSettings {
                kind,
                version,
                cppstd: self.cppstd,
                runtime: self.runtime,
                libcxx: self.libcxx.clone(),
            },
            build_type: self.build_type.unwrap_or(BuildType::Release),
            build,
        })
    }
}
