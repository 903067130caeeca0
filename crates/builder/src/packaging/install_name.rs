//! Mach-O install names of packaged dylibs

use crate::environment::BuildEnvironment;
use kiln_errors::{Error, PackagingError};
use object::FileKind;
use std::path::{Path, PathBuf};

/// Check if a file is a dylib based on its name pattern
///
/// Handles versioned dylibs like `libfoo.1.dylib` and `libbar.2.3.4.dylib`.
fn is_dylib(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.contains(".dylib"))
}

/// Extract the install name from `otool -D` output
///
/// `otool -D` prints the file path followed by the install name:
/// ```text
/// /path/to/libfoo.dylib:
/// /usr/local/lib/libfoo.1.dylib
/// ```
#[must_use]
pub fn parse_install_name(otool_output: &str) -> Option<&str> {
    otool_output
        .lines()
        .nth(1)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Only absolute install names are rewritten; `@rpath/`, `@loader_path/`
/// and `@executable_path/` names are already relocatable
#[must_use]
pub fn needs_install_name_fix(install_name: &str) -> bool {
    install_name.starts_with('/')
}

/// Library references from `otool -L` output
///
/// The first line names the file; each following line is an install name
/// with version details in parentheses:
/// ```text
/// /pkg/bin/xmllint:
///         /pkg/lib/libxml++-5.0.1.dylib (compatibility version 2.0.0, current version 2.0.0)
/// ```
#[must_use]
pub fn parse_library_references(otool_output: &str) -> Vec<&str> {
    otool_output
        .lines()
        .skip(1)
        .map(|line| {
            let line = line.trim();
            line.find(" (").map_or(line, |end| &line[..end])
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// `(old, new)` install name pairs a file needs `-change`d
#[must_use]
pub fn plan_reference_changes<'a>(
    references: &[&str],
    renamed: &'a [(String, String)],
) -> Vec<(&'a str, &'a str)> {
    renamed
        .iter()
        .filter(|(old, _)| references.contains(&old.as_str()))
        .map(|(old, new)| (old.as_str(), new.as_str()))
        .collect()
}

/// Files below `package_dir` matching `keep`, symlinks excluded
fn find_files(package_dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    ignore::WalkBuilder::new(package_dir)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| keep(path))
        .collect()
}

fn find_dylibs(package_dir: &Path) -> Vec<PathBuf> {
    find_files(package_dir, is_dylib)
}

/// Thin or fat Mach-O, judged by the magic at the start of the file
fn is_macho(path: &Path) -> bool {
    let mut header = [0u8; 16];
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(read) = std::io::Read::read(&mut file, &mut header) else {
        return false;
    };
    matches!(
        FileKind::parse(&header[..read]),
        Ok(FileKind::MachO32 | FileKind::MachO64 | FileKind::MachOFat32 | FileKind::MachOFat64)
    )
}

/// What `fix_apple_install_names` rewrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallNameFixes {
    /// Dylibs whose id was set to `@rpath/<file name>`
    pub ids: Vec<PathBuf>,
    /// Packaged Mach-O files whose references to a rewritten id were updated
    pub references: Vec<PathBuf>,
}

/// Set the id of every dylib with an absolute install name to
/// `@rpath/<file name>`, then point packaged binaries and dylibs that
/// still reference an old id at the new one
///
/// # Errors
///
/// Returns `BuildError::ToolNotFound` if `otool` or `install_name_tool`
/// is unavailable, and `PackagingError::InstallNameFailed` when either
/// tool fails on a file.
pub async fn fix_apple_install_names(
    env: &BuildEnvironment,
    package_dir: &Path,
) -> Result<InstallNameFixes, Error> {
    let mut fixes = InstallNameFixes::default();
    let mut renamed = Vec::new();

    for dylib in find_dylibs(package_dir) {
        let path_str = dylib.display().to_string();
        let failed = |message: String| PackagingError::InstallNameFailed {
            path: path_str.clone(),
            message,
        };

        let otool = env
            .execute_command("otool", &["-D", &path_str], Some(package_dir))
            .await?;
        if !otool.success {
            return Err(failed(format!("otool -D: {}", otool.failure_output())).into());
        }

        let Some(install_name) = parse_install_name(&otool.stdout) else {
            continue;
        };
        if !needs_install_name_fix(install_name) {
            continue;
        }

        let Some(file_name) = dylib.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let new_id = format!("@rpath/{file_name}");
        let result = env
            .execute_command(
                "install_name_tool",
                &["-id", &new_id, &path_str],
                Some(package_dir),
            )
            .await?;
        if !result.success {
            return Err(failed(result.failure_output().to_string()).into());
        }
        renamed.push((install_name.to_string(), new_id));
        fixes.ids.push(dylib);
    }

    if renamed.is_empty() {
        return Ok(fixes);
    }

    for file in find_files(package_dir, is_macho) {
        let path_str = file.display().to_string();
        let failed = |message: String| PackagingError::InstallNameFailed {
            path: path_str.clone(),
            message,
        };

        let otool = env
            .execute_command("otool", &["-L", &path_str], Some(package_dir))
            .await?;
        if !otool.success {
            return Err(failed(format!("otool -L: {}", otool.failure_output())).into());
        }

        let references = parse_library_references(&otool.stdout);
        let changes = plan_reference_changes(&references, &renamed);
        if changes.is_empty() {
            continue;
        }

        let mut args = Vec::with_capacity(changes.len() * 3 + 1);
        for (old, new) in &changes {
            args.extend(["-change", *old, *new]);
        }
        args.push(&path_str);
        let result = env
            .execute_command("install_name_tool", &args, Some(package_dir))
            .await?;
        if !result.success {
            return Err(failed(result.failure_output().to_string()).into());
        }
        fixes.references.push(file);
    }

    Ok(fixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_install_name() {
        let output = "/pkg/lib/libxml++-5.0.1.dylib:\n/pkg/lib/libxml++-5.0.1.dylib\n";
        assert_eq!(
            parse_install_name(output),
            Some("/pkg/lib/libxml++-5.0.1.dylib")
        );
        assert_eq!(parse_install_name("/pkg/lib/libfoo.a:\n"), None);
        assert_eq!(parse_install_name(""), None);
    }

    #[test]
    fn test_needs_install_name_fix() {
        assert!(needs_install_name_fix("/usr/local/lib/libfoo.dylib"));
        assert!(!needs_install_name_fix("@rpath/libfoo.dylib"));
        assert!(!needs_install_name_fix("@loader_path/libfoo.dylib"));
    }

    #[test]
    fn test_find_dylibs() {
        let temp = tempfile::tempdir().unwrap();
        let lib = temp.path().join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("libfoo.1.2.dylib"), "").unwrap();
        std::fs::write(lib.join("libfoo.a"), "").unwrap();

        let found = find_dylibs(temp.path());
        assert_eq!(found, vec![lib.join("libfoo.1.2.dylib")]);
    }

    #[test]
    fn test_parse_library_references() {
        let output = "/pkg/bin/xmltool:\n\
            \t/pkg/lib/libxml++-5.0.1.dylib (compatibility version 2.0.0, current version 2.0.0)\n\
            \t/usr/lib/libc++.1.dylib (compatibility version 1.0.0, current version 1700.255.0)\n";
        assert_eq!(
            parse_library_references(output),
            vec!["/pkg/lib/libxml++-5.0.1.dylib", "/usr/lib/libc++.1.dylib"]
        );
        assert!(parse_library_references("/pkg/lib/libfoo.a:\n").is_empty());
    }

    #[test]
    fn test_plan_reference_changes() {
        let renamed = vec![
            (
                "/pkg/lib/libxml++-5.0.1.dylib".to_string(),
                "@rpath/libxml++-5.0.1.dylib".to_string(),
            ),
            (
                "/pkg/lib/libother.dylib".to_string(),
                "@rpath/libother.dylib".to_string(),
            ),
        ];
        let references = ["/pkg/lib/libxml++-5.0.1.dylib", "/usr/lib/libc++.1.dylib"];

        assert_eq!(
            plan_reference_changes(&references, &renamed),
            vec![(
                "/pkg/lib/libxml++-5.0.1.dylib",
                "@rpath/libxml++-5.0.1.dylib"
            )]
        );
        assert!(plan_reference_changes(&["/usr/lib/libSystem.B.dylib"], &renamed).is_empty());
    }

    #[test]
    fn test_is_macho() {
        let temp = tempfile::tempdir().unwrap();
        let thin = temp.path().join("tool");
        let mut header = vec![0xcf, 0xfa, 0xed, 0xfe];
        header.resize(32, 0);
        std::fs::write(&thin, &header).unwrap();
        let text = temp.path().join("README");
        std::fs::write(&text, "plain text, not a binary").unwrap();

        assert!(is_macho(&thin));
        assert!(!is_macho(&text));
        assert!(!is_macho(&temp.path().join("missing")));
    }
}
