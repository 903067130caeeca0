//! YAML recipe format for kiln
//!
//! A recipe describes one C/C++ library: identity, options, compatibility
//! requirements, per-version sources, build tool configuration, packaging
//! steps and the metadata exported to consumers.

use crate::options::OptionSet;
use kiln_types::{
    Arch, BuildType, CompilerKind, OptionValue, Os, Reference, Runtime, Settings, StdLevel,
    Version, VersionRange,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Complete YAML recipe structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package identity (required)
    pub metadata: Metadata,

    /// Named values available to `${...}` expansion
    #[serde(default)]
    pub facts: BTreeMap<String, String>,

    /// Option declarations
    #[serde(default)]
    pub options: BTreeMap<String, OptionDecl>,

    /// Pruning rules applied while computing the effective option set
    #[serde(default)]
    pub option_rules: Vec<OptionRule>,

    #[serde(default)]
    pub requirements: Requirements,

    #[serde(default)]
    pub compatibility: Compatibility,

    /// Sources keyed by version, exactly as written
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSpec>,

    /// Build tool configuration (required)
    pub build: Build,

    /// Ordered packaging steps
    #[serde(default)]
    pub package: Vec<PackageStep>,

    #[serde(default)]
    pub exports: Exports,
}

impl Recipe {
    /// Versions that have a sources entry, in table order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub license: String,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub package_type: PackageType,
}

/// Kind of package a recipe produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    #[default]
    Library,
    StaticLibrary,
    SharedLibrary,
    HeaderLibrary,
    Application,
}

/// An option declaration: its domain and default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDecl {
    pub values: Vec<OptionValue>,
    pub default: OptionValue,
    #[serde(default)]
    pub description: Option<String>,
}

impl OptionDecl {
    #[must_use]
    pub fn allows(&self, value: &OptionValue) -> bool {
        self.values.contains(value)
    }

    /// Domain rendered for messages: `True, False`
    #[must_use]
    pub fn domain(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Remove an option from the effective set when a condition holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRule {
    pub remove: String,
    pub when: Condition,
}

impl OptionRule {
    /// Rules that only look at settings run before user values are applied
    #[must_use]
    pub fn is_platform_rule(&self) -> bool {
        self.when.options.is_empty()
    }
}

/// Declared requirements; informational, never resolved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub requires: Vec<Reference>,
    #[serde(default)]
    pub tool_requires: Vec<Reference>,
}

impl Requirements {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.tool_requires.is_empty()
    }
}

/// Cross-building policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossBuilding {
    #[default]
    Allow,
    Forbid,
}

/// Compatibility table for the validator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compatibility {
    #[serde(default)]
    pub cross_building: CrossBuilding,

    /// First matching rule wins; a rule without `versions` is the fallback
    #[serde(default)]
    pub cppstd: Vec<CppStdRule>,

    /// Minimum compiler versions per standard
    #[serde(default)]
    pub compilers: BTreeMap<StdLevel, HashMap<CompilerKind, String>>,

    /// Combinations rejected for the current toolchain
    #[serde(default)]
    pub invalid: Vec<InvalidRule>,
}

impl Compatibility {
    /// Standard required by `version`, if any rule applies
    #[must_use]
    pub fn required_cppstd(&self, version: &Version) -> Option<StdLevel> {
        self.cppstd
            .iter()
            .find(|rule| rule.versions.as_ref().is_none_or(|range| range.matches(version)))
            .map(|rule| rule.standard)
    }

    /// Minimum version of `compiler` able to build `standard`
    ///
    /// Unlisted standards and unlisted compilers carry no constraint.
    #[must_use]
    pub fn minimum_compiler_version(
        &self,
        standard: StdLevel,
        compiler: CompilerKind,
    ) -> Option<&str> {
        self.compilers
            .get(&standard)
            .and_then(|table| table.get(&compiler))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CppStdRule {
    #[serde(default)]
    pub versions: Option<VersionRange>,
    pub standard: StdLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidRule {
    pub when: Condition,
    pub reason: String,
}

/// A `when:` clause; every field that is present must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
    /// `msvc` matches both `msvc` and `Visual Studio`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_building: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

impl Condition {
    /// Evaluate the settings fields only, ignoring option entries
    #[must_use]
    pub fn matches_settings(&self, settings: &Settings) -> bool {
        let compiler_matches = self.compiler.is_none_or(|kind| {
            if kind == CompilerKind::Msvc {
                settings.is_msvc()
            } else {
                settings.compiler.kind == kind
            }
        });

        self.os.is_none_or(|os| os == settings.os)
            && self.arch.is_none_or(|arch| arch == settings.arch)
            && compiler_matches
            && self
                .build_type
                .is_none_or(|build_type| build_type == settings.build_type)
            && self
                .runtime
                .is_none_or(|runtime| settings.compiler.runtime == Some(runtime))
            && self
                .cross_building
                .is_none_or(|cross| cross == settings.is_cross_building())
    }

    /// Evaluate against settings and the effective option set
    ///
    /// An option that is absent from the set never matches.
    #[must_use]
    pub fn matches(&self, settings: &Settings, options: &OptionSet) -> bool {
        self.matches_settings(settings)
            && self
                .options
                .iter()
                .all(|(name, expected)| options.get(name) == Some(expected))
    }

    /// Names of options this condition refers to
    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }
}

/// Evaluates an optional condition; no condition always holds
#[must_use]
pub fn holds(condition: Option<&Condition>, settings: &Settings, options: &OptionSet) -> bool {
    condition.is_none_or(|c| c.matches(settings, options))
}

/// Sources for one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Primary URL followed by mirrors
    pub url: UrlList,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default = "default_true")]
    pub strip_root: bool,
    #[serde(default)]
    pub patches: Vec<PatchSpec>,
}

fn default_true() -> bool {
    true
}

/// One URL or an ordered list of mirrors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlList {
    One(String),
    Many(Vec<String>),
}

impl UrlList {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(url) => std::slice::from_ref(url),
            Self::Many(urls) => urls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Path relative to the recipe directory
    pub patch_file: String,
    #[serde(default)]
    pub patch_description: Option<String>,
    #[serde(default)]
    pub patch_type: Option<String>,
}

/// Supported build systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystemKind {
    Meson,
    Cmake,
}

impl BuildSystemKind {
    #[must_use]
    pub fn event_kind(self) -> kiln_events::BuildSystem {
        match self {
            Self::Meson => kiln_events::BuildSystem::Meson,
            Self::Cmake => kiln_events::BuildSystem::CMake,
        }
    }
}

/// Build stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub system: BuildSystemKind,

    /// meson project options / cmake `-D` style options
    #[serde(default)]
    pub options: BTreeMap<String, ConditionalValue>,

    /// cmake cache variables
    #[serde(default)]
    pub variables: BTreeMap<String, ConditionalValue>,

    /// Text substitutions applied to the source tree before configuring
    #[serde(default)]
    pub source_edits: Vec<SourceEdit>,
}

/// A plain value, or `when/then/else`
///
/// `else` may itself be a `when/then/else`, giving a chain of cases. A
/// failed condition without `else` omits the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionalValue {
    Conditional {
        when: Condition,
        then: OptionValue,
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<ConditionalValue>>,
    },
    Plain(OptionValue),
}

impl ConditionalValue {
    #[must_use]
    pub fn resolve(&self, settings: &Settings, options: &OptionSet) -> Option<OptionValue> {
        match self {
            Self::Plain(value) => Some(value.clone()),
            Self::Conditional {
                when,
                then,
                otherwise,
            } => {
                if when.matches(settings, options) {
                    Some(then.clone())
                } else {
                    otherwise
                        .as_deref()
                        .and_then(|value| value.resolve(settings, options))
                }
            }
        }
    }

    /// Every condition in the chain, outermost first
    #[must_use]
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut found = Vec::new();
        let mut current = Some(self);
        while let Some(Self::Conditional {
            when, otherwise, ..
        }) = current
        {
            found.push(when);
            current = otherwise.as_deref();
        }
        found
    }
}

/// Resolve a table of conditional values, dropping omitted entries
#[must_use]
pub fn resolve_table(
    table: &BTreeMap<String, ConditionalValue>,
    settings: &Settings,
    options: &OptionSet,
) -> BTreeMap<String, OptionValue> {
    table
        .iter()
        .filter_map(|(key, value)| {
            value
                .resolve(settings, options)
                .map(|resolved| (key.clone(), resolved))
        })
        .collect()
}

/// Targeted text substitution in a source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEdit {
    /// Path relative to the source folder
    pub file: String,
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub when: Option<Condition>,
}

/// Folder a `copy` step reads from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    #[default]
    Source,
    Build,
    Package,
}

/// A packaging step
///
/// Written either as a bare name (`- install`) or a single-key map
/// (`- copy: { pattern: COPYING, dst: licenses }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawStep")]
pub enum PackageStep {
    Copy(CopyStep),
    Install,
    Move(MoveStep),
    Rename(MoveStep),
    Rmdir(RmdirStep),
    Rm(RmStep),
    FixAppleInstallName,
    PruneEmptyDirs,
}

impl PackageStep {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy(_) => "copy",
            Self::Install => "install",
            Self::Move(_) => "move",
            Self::Rename(_) => "rename",
            Self::Rmdir(_) => "rmdir",
            Self::Rm(_) => "rm",
            Self::FixAppleInstallName => "fix_apple_install_name",
            Self::PruneEmptyDirs => "prune_empty_dirs",
        }
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Copy(step) => step.when.as_ref(),
            Self::Move(step) | Self::Rename(step) => step.when.as_ref(),
            Self::Rmdir(step) => step.condition(),
            Self::Rm(step) => step.when.as_ref(),
            Self::Install | Self::FixAppleInstallName | Self::PruneEmptyDirs => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    Bare(String),
    Keyed(BTreeMap<String, serde_yml::Value>),
}

impl TryFrom<RawStep> for PackageStep {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        fn body<T: serde::de::DeserializeOwned>(
            step: &str,
            value: serde_yml::Value,
        ) -> Result<T, String> {
            serde_yml::from_value(value).map_err(|e| format!("invalid {step} step: {e}"))
        }

        match raw {
            RawStep::Bare(name) => match name.as_str() {
                "install" => Ok(Self::Install),
                "fix_apple_install_name" => Ok(Self::FixAppleInstallName),
                "prune_empty_dirs" => Ok(Self::PruneEmptyDirs),
                other => Err(format!("unknown package step: {other}")),
            },
            RawStep::Keyed(map) => {
                let mut entries = map.into_iter();
                let (Some((name, value)), None) = (entries.next(), entries.next()) else {
                    return Err("a package step must have exactly one key".to_string());
                };
                match name.as_str() {
                    "copy" => body(&name, value).map(Self::Copy),
                    "move" => body(&name, value).map(Self::Move),
                    "rename" => body(&name, value).map(Self::Rename),
                    "rmdir" => body(&name, value).map(Self::Rmdir),
                    "rm" => body(&name, value).map(Self::Rm),
                    "install" => Ok(Self::Install),
                    "fix_apple_install_name" => Ok(Self::FixAppleInstallName),
                    "prune_empty_dirs" => Ok(Self::PruneEmptyDirs),
                    other => Err(format!("unknown package step: {other}")),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStep {
    pub pattern: String,
    #[serde(default)]
    pub src: Folder,
    /// Destination relative to the package folder
    #[serde(default)]
    pub dst: String,
    /// Keep the matched file's path below `src`; false flattens
    #[serde(default = "default_true")]
    pub keep_path: bool,
    #[serde(default)]
    pub when: Option<Condition>,
}

/// `move` and `rename`: both paths relative to the package folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStep {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub when: Option<Condition>,
}

/// `rmdir: lib/pkgconfig` or `rmdir: { path: ..., when: ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RmdirStep {
    Path(String),
    Conditional {
        path: String,
        #[serde(default)]
        when: Option<Condition>,
    },
}

impl RmdirStep {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Conditional { path, .. } => path,
        }
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Path(_) => None,
            Self::Conditional { when, .. } => when.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmStep {
    pub pattern: String,
    /// Directory relative to the package folder
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub when: Option<Condition>,
}

/// Consumer-facing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exports {
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default = "default_includedirs")]
    pub includedirs: Vec<String>,
    #[serde(default = "default_libdirs")]
    pub libdirs: Vec<String>,
    #[serde(default = "default_bindirs")]
    pub bindirs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub system_libs: Vec<String>,
    #[serde(default)]
    pub properties: ExportProperties,
    #[serde(default)]
    pub legacy: LegacyNames,
}

impl Default for Exports {
    fn default() -> Self {
        Self {
            libs: Vec::new(),
            includedirs: default_includedirs(),
            libdirs: default_libdirs(),
            bindirs: default_bindirs(),
            defines: Vec::new(),
            system_libs: Vec::new(),
            properties: ExportProperties::default(),
            legacy: LegacyNames::default(),
        }
    }
}

fn default_includedirs() -> Vec<String> {
    vec!["include".to_string()]
}

fn default_libdirs() -> Vec<String> {
    vec!["lib".to_string()]
}

fn default_bindirs() -> Vec<String> {
    vec!["bin".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkg_config_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmake_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmake_target_name: Option<String>,
}

/// Generator-specific names kept for older consumers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyNames {
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default)]
    pub filenames: BTreeMap<String, String>,
}
