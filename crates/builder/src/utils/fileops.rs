//! File system operations for build processes

use kiln_errors::Error;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Recursively copy directory contents
///
/// Symlinks are copied as the files they point to.
pub fn copy_directory_recursive<'a>(
    src: &'a Path,
    dst: &'a Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), Error>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir_all(dst)
            .await
            .map_err(|e| Error::io_with_path(&e, dst))?;

        let mut entries = fs::read_dir(src)
            .await
            .map_err(|e| Error::io_with_path(&e, src))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(&e, src))?
        {
            let entry_path = entry.path();
            let dst_path = dst.join(entry.file_name());

            if entry_path.is_dir() {
                copy_directory_recursive(&entry_path, &dst_path).await?;
            } else {
                fs::copy(&entry_path, &dst_path)
                    .await
                    .map_err(|e| Error::io_with_path(&e, &entry_path))?;
            }
        }

        Ok(())
    })
}

/// Remove empty directories below `root`, deepest first
///
/// `root` itself is kept. Returns the number of directories removed.
pub fn prune_empty_dirs(
    root: &Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<usize, Error>> + Send + '_>> {
    Box::pin(async move {
        let mut removed = 0;
        let mut entries = fs::read_dir(root)
            .await
            .map_err(|e| Error::io_with_path(&e, root))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(&e, root))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io_with_path(&e, &path))?;
            if !file_type.is_dir() {
                continue;
            }

            removed += prune_empty_dirs(&path).await?;
            if is_empty_dir(&path).await? {
                fs::remove_dir(&path)
                    .await
                    .map_err(|e| Error::io_with_path(&e, &path))?;
                removed += 1;
            }
        }
        Ok(removed)
    })
}

async fn is_empty_dir(path: &Path) -> Result<bool, Error> {
    let mut entries = fs::read_dir(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    Ok(entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, path))?
        .is_none())
}

/// Join a recipe-relative path onto `base`, refusing to leave it
///
/// Returns `None` for absolute paths and for `..` components that climb
/// above `base`.
#[must_use]
pub fn join_within(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut depth = 0usize;
    let mut joined = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1)?;
                joined.pop();
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
