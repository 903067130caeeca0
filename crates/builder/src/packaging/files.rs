//! File-level packaging steps: copy, move, rmdir and rm

use crate::utils::fileops::join_within;
use globset::{Glob, GlobMatcher};
use kiln_errors::{Error, PackagingError};
use std::path::{Path, PathBuf};

fn matcher(pattern: &str) -> Result<GlobMatcher, Error> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| {
            PackagingError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
            .into()
        })
}

/// Resolve `relative` inside `base` or fail with `InvalidPattern`
pub(crate) fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf, Error> {
    join_within(base, relative).ok_or_else(|| {
        PackagingError::InvalidPattern {
            pattern: relative.to_string(),
            message: "path leaves the package folder".to_string(),
        }
        .into()
    })
}

/// Copy every file below `src_root` whose relative path matches `pattern`
///
/// `*` also matches across `/`, so `*.h` finds headers at any depth. With
/// `keep_path` the relative path is kept below `dst`; otherwise files land
/// directly in `dst`. Returns the number of files copied.
pub(crate) async fn copy_matching(
    pattern: &str,
    src_root: &Path,
    dst: &Path,
    keep_path: bool,
) -> Result<usize, Error> {
    let glob = matcher(pattern)?;
    if !src_root.is_dir() {
        return Ok(0);
    }

    let matches: Vec<(PathBuf, PathBuf)> = ignore::WalkBuilder::new(src_root)
        .standard_filters(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file() || t.is_symlink()))
        .filter_map(|entry| {
            let path = entry.into_path();
            let relative = path.strip_prefix(src_root).ok()?.to_path_buf();
            glob.is_match(&relative).then_some((path, relative))
        })
        .collect();

    for (path, relative) in &matches {
        let target = if keep_path {
            dst.join(relative)
        } else {
            match path.file_name() {
                Some(name) => dst.join(name),
                None => continue,
            }
        };
        let copy_failed = |e: std::io::Error| PackagingError::CopyFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(copy_failed)?;
        }
        tokio::fs::copy(path, &target).await.map_err(copy_failed)?;
    }

    Ok(matches.len())
}

/// Outcome of a `move` or `rename`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Moved {
    Moved,
    AlreadyInPlace,
}

/// Move `from` to `to`, both below `package_dir`
///
/// A missing source with an existing destination is a no-op, so the step
/// can run against an already normalized tree.
pub(crate) async fn move_path(package_dir: &Path, from: &str, to: &str) -> Result<Moved, Error> {
    let source = resolve_within(package_dir, from)?;
    let target = resolve_within(package_dir, to)?;

    if !source.exists() {
        if target.exists() {
            return Ok(Moved::AlreadyInPlace);
        }
        return Err(PackagingError::MissingArtifact {
            path: from.to_string(),
        }
        .into());
    }

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    if target.is_dir() {
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| Error::io_with_path(&e, &target))?;
    } else if target.exists() {
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| Error::io_with_path(&e, &target))?;
    }

    tokio::fs::rename(&source, &target)
        .await
        .map_err(|e| Error::io_with_path(&e, &source))?;
    Ok(Moved::Moved)
}

/// Remove a directory tree below `package_dir`; missing is a no-op
pub(crate) async fn remove_dir(package_dir: &Path, path: &str) -> Result<bool, Error> {
    let dir = resolve_within(package_dir, path)?;
    if dir == package_dir {
        return Err(PackagingError::InvalidPattern {
            pattern: path.to_string(),
            message: "refusing to remove the package folder".to_string(),
        }
        .into());
    }
    if !dir.is_dir() {
        return Ok(false);
    }
    tokio::fs::remove_dir_all(&dir)
        .await
        .map_err(|e| Error::io_with_path(&e, &dir))?;
    Ok(true)
}

/// Remove files in `dir` whose name matches `pattern`
///
/// Only `dir` itself is searched unless `recursive` is set. A missing
/// `dir` removes nothing. Returns the number of files removed.
pub(crate) async fn remove_matching(
    package_dir: &Path,
    pattern: &str,
    dir: &str,
    recursive: bool,
) -> Result<usize, Error> {
    let glob = matcher(pattern)?;
    let root = resolve_within(package_dir, dir)?;
    if !root.is_dir() {
        return Ok(0);
    }

    let mut walker = ignore::WalkBuilder::new(&root);
    walker.standard_filters(false);
    if !recursive {
        walker.max_depth(Some(1));
    }

    let doomed: Vec<PathBuf> = walker
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| !t.is_dir()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| path.file_name().is_some_and(|name| glob.is_match(name)))
        .collect();

    for path in &doomed {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
    }
    Ok(doomed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, path.display().to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_copy_keep_path_and_flatten() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        touch(&src.join("include/a.h"));
        touch(&src.join("include/detail/b.h"));
        touch(&src.join("src/c.cpp"));
        let dst = temp.path().join("pkg");

        let copied = copy_matching("*.h", &src, &dst.join("include"), false)
            .await
            .unwrap();
        assert_eq!(copied, 2);
        assert!(dst.join("include/a.h").is_file());
        assert!(dst.join("include/b.h").is_file());

        let copied = copy_matching("include/*", &src, &dst.join("kept"), true)
            .await
            .unwrap();
        assert_eq!(copied, 2);
        assert!(dst.join("kept/include/detail/b.h").is_file());
    }

    #[tokio::test]
    async fn test_move_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let pkg = temp.path();
        touch(&pkg.join("lib/libxml++-5.0/include/libxml++config.h"));

        let from = "lib/libxml++-5.0/include/libxml++config.h";
        let to = "include/libxml++-5.0/libxml++config.h";
        assert_eq!(move_path(pkg, from, to).await.unwrap(), Moved::Moved);
        assert!(pkg.join(to).is_file());
        assert_eq!(move_path(pkg, from, to).await.unwrap(), Moved::AlreadyInPlace);

        let err = move_path(pkg, "lib/missing.a", "lib/also-missing.lib")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Packaging(PackagingError::MissingArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_matching_depth() {
        let temp = tempfile::tempdir().unwrap();
        let pkg = temp.path();
        touch(&pkg.join("lib/a.la"));
        touch(&pkg.join("lib/nested/b.la"));
        touch(&pkg.join("lib/libc.a"));

        assert_eq!(remove_matching(pkg, "*.la", "lib", false).await.unwrap(), 1);
        assert!(pkg.join("lib/nested/b.la").exists());
        assert_eq!(remove_matching(pkg, "*.la", "lib", true).await.unwrap(), 1);
        assert!(pkg.join("lib/libc.a").exists());
        assert_eq!(remove_matching(pkg, "*.pdb", "bin", false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_paths_cannot_escape() {
        let temp = tempfile::tempdir().unwrap();
        let err = remove_dir(temp.path(), "../outside").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Packaging(PackagingError::InvalidPattern { .. })
        ));
        assert!(!remove_dir(temp.path(), "lib/pkgconfig").await.unwrap());
    }
}
