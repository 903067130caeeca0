//! Package descriptor export
//!
//! The descriptor is purely descriptive: it tells consumers which libraries
//! to link, where headers live and which generator names to use. It is
//! written as pretty JSON next to the artifacts.

use crate::options::OptionSet;
use crate::recipe::model::{ExportProperties, LegacyNames, PackageType, Recipe};
use kiln_errors::{BuildError, Error, PackagingError};
use kiln_types::{OptionValue, PackageId, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Descriptor file name inside a package folder
pub const DESCRIPTOR_FILE: &str = "package-info.json";

/// Consumer metadata for one built package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub package_type: PackageType,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub includedirs: Vec<String>,
    #[serde(default)]
    pub libdirs: Vec<String>,
    #[serde(default)]
    pub bindirs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub system_libs: Vec<String>,
    #[serde(default)]
    pub properties: ExportProperties,
    #[serde(default)]
    pub legacy: LegacyNames,
    /// Declared requirements, as written
    #[serde(default)]
    pub requires: Vec<String>,
    /// Effective options the package was built with
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    /// Settings the package was built with, in `key=value` form
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl PackageInfo {
    /// Describe a package from its expanded recipe and build inputs
    #[must_use]
    pub fn from_recipe(
        recipe: &Recipe,
        package: &PackageId,
        options: &OptionSet,
        settings: &Settings,
    ) -> Self {
        let exports = &recipe.exports;
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            package_type: recipe.metadata.package_type,
            license: recipe.metadata.license.clone(),
            libs: exports.libs.clone(),
            includedirs: exports.includedirs.clone(),
            libdirs: exports.libdirs.clone(),
            bindirs: exports.bindirs.clone(),
            defines: exports.defines.clone(),
            system_libs: exports.system_libs.clone(),
            properties: exports.properties.clone(),
            legacy: exports.legacy.clone(),
            requires: recipe
                .requirements
                .requires
                .iter()
                .map(ToString::to_string)
                .collect(),
            options: options.to_map(),
            settings: settings.to_pairs(),
        }
    }

    /// Name of the pkg-config module
    #[must_use]
    pub fn pkg_config_name(&self) -> &str {
        self.properties
            .pkg_config_name
            .as_deref()
            .unwrap_or(&self.name)
    }

    /// Base name of the cmake config file
    #[must_use]
    pub fn cmake_file_name(&self) -> &str {
        self.properties
            .cmake_file_name
            .as_deref()
            .unwrap_or(&self.name)
    }

    /// Imported target, `name::name` unless overridden
    #[must_use]
    pub fn cmake_target_name(&self) -> String {
        self.properties
            .cmake_target_name
            .clone()
            .unwrap_or_else(|| format!("{0}::{0}", self.name))
    }

    /// Write the descriptor into `package_dir`
    ///
    /// # Errors
    ///
    /// Returns `PackagingError::DescriptorWrite` if serialization or the
    /// write fails.
    pub async fn write(&self, package_dir: &Path) -> Result<PathBuf, Error> {
        let path = package_dir.join(DESCRIPTOR_FILE);
        let descriptor_error = |message: String| PackagingError::DescriptorWrite {
            path: path.display().to_string(),
            message,
        };

        let json =
            serde_json::to_string_pretty(self).map_err(|e| descriptor_error(e.to_string()))?;
        tokio::fs::write(&path, format!("{json}\n"))
            .await
            .map_err(|e| descriptor_error(e.to_string()))?;

        Ok(path)
    }

    /// Load the descriptor of an already built package folder
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is missing, or
    /// `BuildError::RecipeError` if it is not a valid descriptor.
    pub async fn load(package_dir: &Path) -> Result<Self, Error> {
        let path = package_dir.join(DESCRIPTOR_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io_with_path(&e, &path))?;
        serde_json::from_str(&content).map_err(|e| {
            BuildError::RecipeError {
                message: format!("invalid package descriptor {}: {e}", path.display()),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::{expand_variables, parse_recipe_from_str};

    const RECIPE: &str = r#"
metadata: { name: testcpp, license: Unlicense }
facts: { lib_version: "5.0" }
options:
  shared: { values: [true, false], default: false }
requirements:
  requires: ["libxml2/[>=2.12.5 <3]"]
build: { system: cmake }
exports:
  libs: ["TestCPP-${lib_version}"]
  properties:
    cmake_file_name: TestCPP
    cmake_target_name: "testcpp::testcpp"
  legacy:
    names: { cmake_find_package: PACKAGE }
"#;

    fn settings() -> Settings {
        let mut builder = Settings::builder();
        builder
            .set_pair("os=Linux")
            .unwrap()
            .set_pair("arch=x86_64")
            .unwrap()
            .set_pair("compiler=gcc")
            .unwrap()
            .set_pair("compiler.version=13")
            .unwrap();
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_write_and_load_descriptor() {
        let recipe = expand_variables(&parse_recipe_from_str(RECIPE).unwrap(), "1.1.0");
        let package = PackageId::new("testcpp", "1.1.0");
        let options: OptionSet = [("shared".to_string(), OptionValue::Bool(false))]
            .into_iter()
            .collect();
        let info = PackageInfo::from_recipe(&recipe, &package, &options, &settings());

        assert_eq!(info.libs, vec!["TestCPP-5.0"]);
        assert_eq!(info.includedirs, vec!["include"]);
        assert_eq!(info.requires, vec!["libxml2/[>=2.12.5 <3.0.0]"]);
        assert_eq!(info.cmake_file_name(), "TestCPP");
        assert_eq!(info.cmake_target_name(), "testcpp::testcpp");
        assert_eq!(info.pkg_config_name(), "testcpp");

        let temp = tempfile::tempdir().unwrap();
        let path = info.write(temp.path()).await.unwrap();
        assert_eq!(path, temp.path().join(DESCRIPTOR_FILE));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["options"]["shared"], false);
        assert_eq!(json["settings"]["compiler"], "gcc");

        let loaded = PackageInfo::load(temp.path()).await.unwrap();
        assert_eq!(loaded, info);
    }
}
