//! CMake config files for supplied dependencies
//!
//! Each dependency gets `<name>-config.cmake` declaring one imported
//! interface target, plus a `<name>-config-version.cmake` that accepts any
//! requested version not newer than the supplied one.

use crate::build_systems::portable_path;
use crate::export::PackageInfo;
use std::fmt::Write as _;
use std::path::Path;

/// Base of the config file names; CMake matches them case-insensitively
/// against the lowercased package name
fn file_stem(info: &PackageInfo) -> String {
    info.cmake_file_name().to_lowercase()
}

#[must_use]
pub fn config_file_name(info: &PackageInfo) -> String {
    format!("{}-config.cmake", file_stem(info))
}

#[must_use]
pub fn version_file_name(info: &PackageInfo) -> String {
    format!("{}-config-version.cmake", file_stem(info))
}

fn cmake_list(items: impl IntoIterator<Item = String>) -> String {
    items.into_iter().collect::<Vec<_>>().join(";")
}

/// Render the config file of a dependency installed at `package_dir`
///
/// `requires` pairs the config file name and imported target of each
/// supplied requirement.
#[must_use]
pub fn render_config_file(
    info: &PackageInfo,
    package_dir: &Path,
    requires: &[(String, String)],
) -> String {
    let prefix = portable_path(package_dir);
    let file_name = info.cmake_file_name();
    let target = info.cmake_target_name();

    let includes = cmake_list(info.includedirs.iter().map(|dir| format!("{prefix}/{dir}")));
    let libdirs = cmake_list(info.libdirs.iter().map(|dir| format!("{prefix}/{dir}")));
    let links = cmake_list(
        info.libs
            .iter()
            .chain(&info.system_libs)
            .cloned()
            .chain(requires.iter().map(|(_, target)| target.clone())),
    );
    let defines = cmake_list(info.defines.iter().cloned());

    let mut out = String::from("# Generated by kiln, do not edit\n");
    let _ = writeln!(out, "if(TARGET {target})\n  return()\nendif()\n");
    if !requires.is_empty() {
        out.push_str("include(CMakeFindDependencyMacro)\n");
        for (file_name, _) in requires {
            let _ = writeln!(out, "find_dependency({file_name})");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "set({file_name}_FOUND TRUE)");
    let _ = writeln!(out, "set({file_name}_VERSION \"{}\")", info.version);
    let _ = writeln!(out, "set({file_name}_INCLUDE_DIRS \"{includes}\")");
    let _ = writeln!(out, "set({file_name}_LIBRARIES {target})");
    out.push('\n');
    let _ = writeln!(out, "add_library({target} INTERFACE IMPORTED)");
    let _ = writeln!(out, "set_target_properties({target} PROPERTIES");
    let _ = writeln!(out, "  INTERFACE_INCLUDE_DIRECTORIES \"{includes}\"");
    let _ = writeln!(out, "  INTERFACE_LINK_DIRECTORIES \"{libdirs}\"");
    let _ = writeln!(out, "  INTERFACE_LINK_LIBRARIES \"{links}\"");
    let _ = writeln!(out, "  INTERFACE_COMPILE_DEFINITIONS \"{defines}\"");
    out.push_str(")\n");
    out
}

/// Render the version file of a dependency
#[must_use]
pub fn render_version_file(info: &PackageInfo) -> String {
    format!(
        "\
# Generated by kiln, do not edit
set(PACKAGE_VERSION \"{version}\")
if(PACKAGE_FIND_VERSION VERSION_GREATER PACKAGE_VERSION)
  set(PACKAGE_VERSION_COMPATIBLE FALSE)
else()
  set(PACKAGE_VERSION_COMPATIBLE TRUE)
  if(PACKAGE_FIND_VERSION STREQUAL PACKAGE_VERSION)
    set(PACKAGE_VERSION_EXACT TRUE)
  endif()
endif()
",
        version = info.version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::{ExportProperties, LegacyNames, PackageType};
    use std::collections::BTreeMap;

    fn testcpp() -> PackageInfo {
        PackageInfo {
            name: "testcpp".to_string(),
            version: "1.1.0".to_string(),
            package_type: PackageType::Library,
            license: "Unlicense".to_string(),
            libs: vec!["TestCPP".to_string()],
            includedirs: vec!["include".to_string()],
            libdirs: vec!["lib".to_string()],
            bindirs: vec!["bin".to_string()],
            defines: Vec::new(),
            system_libs: Vec::new(),
            properties: ExportProperties {
                cmake_file_name: Some("TestCPP".to_string()),
                cmake_target_name: Some("testcpp::testcpp".to_string()),
                ..ExportProperties::default()
            },
            legacy: LegacyNames::default(),
            requires: Vec::new(),
            options: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_render_config_file() {
        let rendered = render_config_file(&testcpp(), Path::new("/deps/testcpp"), &[]);

        assert!(rendered.starts_with("# Generated by kiln, do not edit\nif(TARGET testcpp::testcpp)\n"));
        assert!(rendered.contains("add_library(testcpp::testcpp INTERFACE IMPORTED)\n"));
        assert!(rendered.contains("  INTERFACE_INCLUDE_DIRECTORIES \"/deps/testcpp/include\"\n"));
        assert!(rendered.contains("  INTERFACE_LINK_DIRECTORIES \"/deps/testcpp/lib\"\n"));
        assert!(rendered.contains("  INTERFACE_LINK_LIBRARIES \"TestCPP\"\n"));
        assert!(rendered.contains("set(TestCPP_VERSION \"1.1.0\")\n"));
    }

    #[test]
    fn test_file_names_are_lowercase() {
        assert_eq!(config_file_name(&testcpp()), "testcpp-config.cmake");
        assert_eq!(version_file_name(&testcpp()), "testcpp-config-version.cmake");
        assert!(render_version_file(&testcpp()).contains("set(PACKAGE_VERSION \"1.1.0\")"));
    }

    #[test]
    fn test_requirement_targets_are_linked() {
        let rendered = render_config_file(
            &testcpp(),
            Path::new("/d"),
            &[("LibXml2".to_string(), "LibXml2::LibXml2".to_string())],
        );
        assert!(rendered.contains("include(CMakeFindDependencyMacro)\nfind_dependency(LibXml2)\n"));
        assert!(rendered.contains("  INTERFACE_LINK_LIBRARIES \"TestCPP;LibXml2::LibXml2\"\n"));
    }
}
