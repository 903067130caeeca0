//! pkg-config `.pc` files for supplied dependencies

use crate::build_systems::portable_path;
use crate::export::PackageInfo;
use std::fmt::Write as _;
use std::path::Path;

/// Variable name for the n-th directory of a kind: `libdir`, `libdir1`, ...
fn dir_variable(kind: &str, index: usize) -> String {
    if index == 0 {
        kind.to_string()
    } else {
        format!("{kind}{index}")
    }
}

/// Render the `.pc` file of a dependency installed at `package_dir`
///
/// `requires` lists the pkg-config names of the dependency's own
/// requirements that are also supplied.
#[must_use]
pub fn render_pc_file(info: &PackageInfo, package_dir: &Path, requires: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "prefix={}", portable_path(package_dir));
    for (index, dir) in info.libdirs.iter().enumerate() {
        let _ = writeln!(out, "{}=${{prefix}}/{dir}", dir_variable("libdir", index));
    }
    for (index, dir) in info.includedirs.iter().enumerate() {
        let _ = writeln!(out, "{}=${{prefix}}/{dir}", dir_variable("includedir", index));
    }
    out.push('\n');

    let _ = writeln!(out, "Name: {}", info.pkg_config_name());
    let _ = writeln!(out, "Description: {} built by kiln", info.name);
    let _ = writeln!(out, "Version: {}", info.version);

    let mut libs: Vec<String> = (0..info.libdirs.len())
        .map(|index| format!("-L${{{}}}", dir_variable("libdir", index)))
        .collect();
    libs.extend(info.libs.iter().map(|lib| format!("-l{lib}")));
    libs.extend(info.system_libs.iter().map(|lib| format!("-l{lib}")));
    let _ = writeln!(out, "Libs: {}", libs.join(" "));

    let mut cflags: Vec<String> = (0..info.includedirs.len())
        .map(|index| format!("-I${{{}}}", dir_variable("includedir", index)))
        .collect();
    cflags.extend(info.defines.iter().map(|define| format!("-D{define}")));
    let _ = writeln!(out, "Cflags: {}", cflags.join(" "));

    if !requires.is_empty() {
        let _ = writeln!(out, "Requires: {}", requires.join(" "));
    }

    out
}

/// File name of a dependency's `.pc` file
#[must_use]
pub fn pc_file_name(info: &PackageInfo) -> String {
    format!("{}.pc", info.pkg_config_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::{ExportProperties, LegacyNames, PackageType};
    use std::collections::BTreeMap;

    fn libxml2() -> PackageInfo {
        PackageInfo {
            name: "libxml2".to_string(),
            version: "2.12.5".to_string(),
            package_type: PackageType::Library,
            license: "MIT".to_string(),
            libs: vec!["xml2".to_string()],
            includedirs: vec!["include/libxml2".to_string()],
            libdirs: vec!["lib".to_string()],
            bindirs: vec!["bin".to_string()],
            defines: vec!["LIBXML_STATIC".to_string()],
            system_libs: vec!["m".to_string()],
            properties: ExportProperties {
                pkg_config_name: Some("libxml-2.0".to_string()),
                ..ExportProperties::default()
            },
            legacy: LegacyNames::default(),
            requires: Vec::new(),
            options: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_render_pc_file() {
        let rendered = render_pc_file(&libxml2(), Path::new("/deps/libxml2"), &[]);
        let expected = "\
prefix=/deps/libxml2
libdir=${prefix}/lib
includedir=${prefix}/include/libxml2

Name: libxml-2.0
Description: libxml2 built by kiln
Version: 2.12.5
Libs: -L${libdir} -lxml2 -lm
Cflags: -I${includedir} -DLIBXML_STATIC
";
        assert_eq!(rendered, expected);
        assert_eq!(pc_file_name(&libxml2()), "libxml-2.0.pc");
    }

    #[test]
    fn test_multiple_dirs_and_requires() {
        let mut info = libxml2();
        info.includedirs.push("include".to_string());
        let rendered = render_pc_file(&info, Path::new("/d"), &["zlib".to_string()]);

        assert!(rendered.contains("includedir1=${prefix}/include\n"));
        assert!(rendered.contains("Cflags: -I${includedir} -I${includedir1} -DLIBXML_STATIC\n"));
        assert!(rendered.ends_with("Requires: zlib\n"));
    }
}
