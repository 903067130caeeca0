//! Supplied dependency packages
//!
//! Dependencies are never resolved here. The caller points at package
//! folders that were already built; their descriptors are read and turned
//! into pkg-config and CMake config files in the generators folder.

pub mod cmake;
pub mod pkgconfig;

use crate::export::PackageInfo;
use crate::recipe::model::Requirements;
use kiln_errors::Error;
use kiln_types::parse_loose;
use std::path::{Path, PathBuf};

/// An already built dependency package
#[derive(Debug, Clone)]
pub struct SuppliedDependency {
    pub package_dir: PathBuf,
    pub info: PackageInfo,
}

/// Read the descriptors of the given package folders
///
/// # Errors
///
/// Returns an error if a folder has no readable `package-info.json`.
pub async fn load_dependencies(dirs: &[PathBuf]) -> Result<Vec<SuppliedDependency>, Error> {
    let mut dependencies = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let info = PackageInfo::load(dir).await?;
        let package_dir = tokio::fs::canonicalize(dir)
            .await
            .map_err(|e| Error::io_with_path(&e, dir))?;
        dependencies.push(SuppliedDependency { package_dir, info });
    }
    Ok(dependencies)
}

/// Problems between declared requirements and supplied packages
///
/// Tool requirements are found on `PATH` and are not checked.
#[must_use]
pub fn check_requirements(
    requirements: &Requirements,
    dependencies: &[SuppliedDependency],
) -> Vec<String> {
    let mut problems = Vec::new();
    for reference in &requirements.requires {
        let Some(dependency) = dependencies
            .iter()
            .find(|dependency| dependency.info.name == reference.name)
        else {
            problems.push(format!("requirement {reference} is not supplied"));
            continue;
        };

        let satisfied = parse_loose(&dependency.info.version)
            .is_ok_and(|version| reference.range.matches(&version));
        if !satisfied {
            problems.push(format!(
                "supplied {}/{} does not satisfy {reference}",
                dependency.info.name, dependency.info.version
            ));
        }
    }
    problems
}

/// Write dependency files for every supplied package into `generators_dir`
///
/// # Errors
///
/// Returns an I/O error if a file cannot be written.
pub async fn generate_dependency_files(
    dependencies: &[SuppliedDependency],
    generators_dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    tokio::fs::create_dir_all(generators_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, generators_dir))?;

    let mut written = Vec::new();
    for dependency in dependencies {
        let info = &dependency.info;
        let supplied_requires: Vec<&PackageInfo> = info
            .requires
            .iter()
            .filter_map(|requirement| {
                let name = requirement.split('/').next().unwrap_or(requirement);
                dependencies
                    .iter()
                    .map(|other| &other.info)
                    .find(|other| other.name == name)
            })
            .collect();

        let pc_requires: Vec<String> = supplied_requires
            .iter()
            .map(|other| other.pkg_config_name().to_string())
            .collect();
        let cmake_requires: Vec<(String, String)> = supplied_requires
            .iter()
            .map(|other| (other.cmake_file_name().to_string(), other.cmake_target_name()))
            .collect();

        let files = [
            (
                pkgconfig::pc_file_name(info),
                pkgconfig::render_pc_file(info, &dependency.package_dir, &pc_requires),
            ),
            (
                cmake::config_file_name(info),
                cmake::render_config_file(info, &dependency.package_dir, &cmake_requires),
            ),
            (
                cmake::version_file_name(info),
                cmake::render_version_file(info),
            ),
        ];

        for (name, content) in files {
            let path = generators_dir.join(name);
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| Error::io_with_path(&e, &path))?;
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::{ExportProperties, LegacyNames, PackageType};
    use kiln_types::Reference;
    use std::collections::BTreeMap;

    fn info(name: &str, version: &str, requires: &[&str]) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            package_type: PackageType::Library,
            license: String::new(),
            libs: vec![name.to_string()],
            includedirs: vec!["include".to_string()],
            libdirs: vec!["lib".to_string()],
            bindirs: vec!["bin".to_string()],
            defines: Vec::new(),
            system_libs: Vec::new(),
            properties: ExportProperties::default(),
            legacy: LegacyNames::default(),
            requires: requires.iter().map(ToString::to_string).collect(),
            options: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    fn requirements(refs: &[&str]) -> Requirements {
        Requirements {
            requires: refs.iter().map(|r| Reference::parse(r).unwrap()).collect(),
            tool_requires: vec![Reference::parse("meson/[>=1.2.3 <2]").unwrap()],
        }
    }

    #[test]
    fn test_check_requirements() {
        let deps = vec![
            SuppliedDependency {
                package_dir: PathBuf::from("/d/libxml2"),
                info: info("libxml2", "2.12.5", &[]),
            },
            SuppliedDependency {
                package_dir: PathBuf::from("/d/glibmm"),
                info: info("glibmm", "2.66.0", &[]),
            },
        ];
        let problems =
            check_requirements(&requirements(&["libxml2/[>=2.12.5 <3]", "glibmm/2.75.0", "zlib/1.3"]), &deps);

        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("glibmm/2.66.0"));
        assert!(problems[1].contains("zlib"));
    }

    #[tokio::test]
    async fn test_generate_and_load() {
        let temp = tempfile::tempdir().unwrap();
        let zlib_dir = temp.path().join("zlib");
        let xml_dir = temp.path().join("libxml2");
        std::fs::create_dir_all(&zlib_dir).unwrap();
        std::fs::create_dir_all(&xml_dir).unwrap();
        info("zlib", "1.3.1", &[]).write(&zlib_dir).await.unwrap();
        info("libxml2", "2.12.5", &["zlib/[>=1.2.11 <2]"])
            .write(&xml_dir)
            .await
            .unwrap();

        let deps = load_dependencies(&[zlib_dir, xml_dir]).await.unwrap();
        assert_eq!(deps.len(), 2);

        let generators = temp.path().join("generators");
        let written = generate_dependency_files(&deps, &generators).await.unwrap();
        assert_eq!(written.len(), 6);

        let pc = std::fs::read_to_string(generators.join("libxml2.pc")).unwrap();
        assert!(pc.contains("Requires: zlib\n"));
        let config = std::fs::read_to_string(generators.join("libxml2-config.cmake")).unwrap();
        assert!(config.contains("find_dependency(zlib)"));
        assert!(generators.join("zlib-config-version.cmake").is_file());
    }

    #[tokio::test]
    async fn test_missing_descriptor() {
        let temp = tempfile::tempdir().unwrap();
        assert!(load_dependencies(&[temp.path().to_path_buf()]).await.is_err());
    }
}
