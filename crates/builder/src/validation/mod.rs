//! Compatibility validation
//!
//! Rules are checked in a fixed order and the first violation is returned:
//! cross-building, minimum C++ standard, minimum compiler version, then the
//! recipe's invalid combinations. Validation runs before any source is
//! fetched.

use crate::options::OptionSet;
use crate::recipe::model::{CrossBuilding, Recipe};
use kiln_errors::ConfigurationError;
use kiln_types::{parse_loose, PackageId, Settings, StdLevel, Version};
use serde::Serialize;

/// What validation established about the requested build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Standard the recipe requires for this version
    pub required_cppstd: Option<StdLevel>,
    /// Minimum version of the configured compiler for that standard
    pub minimum_compiler_version: Option<String>,
}

/// Validate a settings bundle and effective option set against a recipe
pub struct Validator<'a> {
    recipe: &'a Recipe,
    package: &'a PackageId,
    version: &'a Version,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(recipe: &'a Recipe, package: &'a PackageId, version: &'a Version) -> Self {
        Self {
            recipe,
            package,
            version,
        }
    }

    /// Run every rule in order
    ///
    /// # Errors
    ///
    /// Returns the `ConfigurationError` for the first violated rule.
    pub fn validate(
        &self,
        settings: &Settings,
        options: &OptionSet,
    ) -> Result<ValidationReport, ConfigurationError> {
        let compat = &self.recipe.compatibility;

        if compat.cross_building == CrossBuilding::Forbid && settings.is_cross_building() {
            return Err(ConfigurationError::CrossBuildingUnsupported {
                package: self.package.to_string(),
            });
        }

        let required = compat.required_cppstd(self.version);

        if let Some(required) = required {
            self.check_min_cppstd(settings, required)?;
        }

        let minimum = required
            .and_then(|standard| compat.minimum_compiler_version(standard, settings.compiler.kind));
        if let (Some(standard), Some(minimum)) = (required, minimum) {
            self.check_compiler_version(settings, standard, minimum)?;
        }

        for rule in &compat.invalid {
            if rule.when.matches(settings, options) {
                return Err(ConfigurationError::InvalidCombination {
                    package: self.package.to_string(),
                    reason: rule.reason.clone(),
                });
            }
        }

        Ok(ValidationReport {
            required_cppstd: required,
            minimum_compiler_version: minimum.map(ToString::to_string),
        })
    }

    /// Fail when `compiler.cppstd` is set below `required`
    ///
    /// An unset `compiler.cppstd` passes; the compiler's default is checked
    /// through the minimum compiler version instead.
    fn check_min_cppstd(
        &self,
        settings: &Settings,
        required: StdLevel,
    ) -> Result<(), ConfigurationError> {
        match settings.compiler.cppstd {
            Some(actual) if actual.level < required => Err(ConfigurationError::CppStdTooLow {
                package: self.package.to_string(),
                required: required.to_string(),
                actual: actual.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_compiler_version(
        &self,
        settings: &Settings,
        standard: StdLevel,
        minimum: &str,
    ) -> Result<(), ConfigurationError> {
        let invalid_setting = || ConfigurationError::InvalidSetting {
            key: "compiler.version".to_string(),
            value: settings.compiler.version.clone(),
        };
        let actual = settings
            .compiler
            .parsed_version()
            .map_err(|_| invalid_setting())?;
        let floor = parse_loose(minimum).map_err(|_| invalid_setting())?;

        if actual < floor {
            return Err(ConfigurationError::CompilerTooOld {
                package: self.package.to_string(),
                standard: standard.to_string(),
                compiler: settings.compiler.kind.to_string(),
                version: settings.compiler.version.clone(),
                minimum: minimum.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSetBuilder;
    use crate::recipe::parser::parse_recipe_from_str;
    use kiln_types::OptionValue;

    const RECIPE: &str = r#"
metadata: { name: demo }
options:
  shared: { values: [true, false], default: false }
compatibility:
  cross_building: forbid
  cppstd:
    - { versions: ">=5.4.0", standard: "17" }
    - { standard: "11" }
  compilers:
    "17": { gcc: "8", clang: "7", msvc: "192" }
  invalid:
    - { when: { compiler: msvc, options: { shared: true } }, reason: "cannot be shared on msvc" }
build: { system: meson }
"#;

    fn settings(pairs: &[&str]) -> Settings {
        let mut builder = Settings::builder();
        for pair in pairs {
            builder.set_pair(pair).unwrap();
        }
        builder.build().unwrap()
    }

    fn run(version: &str, settings: &Settings, shared: bool) -> Result<ValidationReport, ConfigurationError> {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let options = OptionSetBuilder::new(&recipe, settings)
            .value("shared", OptionValue::Bool(shared))
            .build()
            .unwrap();
        let package = PackageId::new("demo", version);
        let parsed = parse_loose(version).unwrap();
        Validator::new(&recipe, &package, &parsed).validate(settings, &options)
    }

    #[test]
    fn test_required_standard_by_version() {
        let s = settings(&["os=Linux", "arch=x86_64", "compiler=gcc", "compiler.version=13"]);
        assert_eq!(run("5.5.0", &s, false).unwrap().required_cppstd, Some(StdLevel::Cxx17));
        assert_eq!(run("5.3.0", &s, false).unwrap().required_cppstd, Some(StdLevel::Cxx11));
    }

    #[test]
    fn test_old_compiler_rejected_only_for_new_versions() {
        let s = settings(&["os=Linux", "arch=x86_64", "compiler=gcc", "compiler.version=7"]);
        let err = run("5.5.0", &s, false).unwrap_err();
        assert!(matches!(err, ConfigurationError::CompilerTooOld { .. }));
        assert!(run("5.3.0", &s, false).is_ok());
    }

    #[test]
    fn test_cppstd_too_low() {
        let s = settings(&[
            "os=Linux",
            "arch=x86_64",
            "compiler=gcc",
            "compiler.version=13",
            "compiler.cppstd=gnu14",
        ]);
        let err = run("5.5.0", &s, false).unwrap_err();
        assert!(matches!(err, ConfigurationError::CppStdTooLow { .. }));
    }

    #[test]
    fn test_cross_building_checked_first() {
        let s = settings(&[
            "os=Linux",
            "arch=armv8",
            "compiler=gcc",
            "compiler.version=7",
            "build.os=Linux",
            "build.arch=x86_64",
        ]);
        let err = run("5.5.0", &s, false).unwrap_err();
        assert!(matches!(err, ConfigurationError::CrossBuildingUnsupported { .. }));
    }

    #[test]
    fn test_invalid_combination() {
        let s = settings(&["os=Windows", "arch=x86_64", "compiler=msvc", "compiler.version=193"]);
        let err = run("5.5.0", &s, true).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidCombination { .. }));
        assert!(run("5.5.0", &s, false).is_ok());
    }

    #[test]
    fn test_unlisted_compiler_passes() {
        let s = settings(&["os=Linux", "arch=x86_64", "compiler=intel-cc", "compiler.version=1"]);
        let report = run("5.5.0", &s, false).unwrap();
        assert_eq!(report.minimum_compiler_version, None);
    }
}
