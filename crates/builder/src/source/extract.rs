//! Archive extraction into the source folder

use kiln_errors::{AcquisitionError, Error};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Supported source archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveKind {
    /// Detect the format from a file name extension
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Detect the format from the first bytes of a file
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(Self::TarXz)
        } else if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(Self::Zip)
        } else if header.get(257..262) == Some(b"ustar".as_slice()) {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Determine the archive format, by extension first and then by content
///
/// # Errors
///
/// Returns `AcquisitionError::UnsupportedArchive` when neither identifies a
/// known format, or an I/O error if the file cannot be read.
pub async fn detect_archive(path: &Path) -> Result<ArchiveKind, Error> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(kind) = ArchiveKind::from_file_name(&file_name) {
        return Ok(kind);
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    let mut header = Vec::with_capacity(512);
    file.take(512)
        .read_to_end(&mut header)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;

    ArchiveKind::from_magic(&header).ok_or_else(|| {
        AcquisitionError::UnsupportedArchive {
            file: path.display().to_string(),
        }
        .into()
    })
}

fn extraction_error(message: impl Into<String>) -> Error {
    AcquisitionError::Extraction {
        message: message.into(),
    }
    .into()
}

/// Extract `archive` into `dest`
///
/// The archive is unpacked into a staging folder created inside
/// `staging_parent`, so the final move into `dest` stays on one file system.
/// With `strip_root` the archive must hold exactly one top-level directory,
/// whose contents become `dest`. An existing `dest` is replaced.
///
/// # Errors
///
/// Returns `AcquisitionError::Extraction` for corrupt archives or a root
/// that cannot be stripped, `AcquisitionError::UnsupportedArchive` for an
/// unknown format.
pub async fn extract_archive(
    archive: &Path,
    dest: &Path,
    staging_parent: &Path,
    strip_root: bool,
) -> Result<ArchiveKind, Error> {
    let kind = detect_archive(archive).await?;

    tokio::fs::create_dir_all(staging_parent)
        .await
        .map_err(|e| Error::io_with_path(&e, staging_parent))?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(staging_parent)
        .map_err(|e| extraction_error(format!("failed to create staging directory: {e}")))?;
    let unpacked = staging.path().join("unpacked");
    tokio::fs::create_dir_all(&unpacked)
        .await
        .map_err(|e| Error::io_with_path(&e, &unpacked))?;

    match kind {
        ArchiveKind::Tar => unpack_tar(archive.to_path_buf(), unpacked.clone()).await?,
        ArchiveKind::Zip => unpack_zip(archive.to_path_buf(), unpacked.clone()).await?,
        ArchiveKind::TarGz | ArchiveKind::TarBz2 | ArchiveKind::TarXz => {
            let tar_path = staging.path().join("archive.tar");
            decompress(archive, &tar_path, kind).await?;
            unpack_tar(tar_path, unpacked.clone()).await?;
        }
    }

    let root = if strip_root {
        single_root(&unpacked).await?
    } else {
        unpacked
    };

    if dest.exists() {
        tokio::fs::remove_dir_all(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    if tokio::fs::rename(&root, dest).await.is_err() {
        crate::utils::fileops::copy_directory_recursive(&root, dest).await?;
    }

    Ok(kind)
}

/// Decompress a compressed tarball to a plain tar file
async fn decompress(archive: &Path, tar_path: &Path, kind: ArchiveKind) -> Result<(), Error> {
    use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder};
    use tokio::fs::File;
    use tokio::io::{AsyncWriteExt, BufReader};

    let input_file = File::open(archive)
        .await
        .map_err(|e| extraction_error(format!("failed to open archive: {e}")))?;
    let mut output_file = File::create(tar_path)
        .await
        .map_err(|e| extraction_error(format!("failed to create temp file: {e}")))?;
    let reader = BufReader::new(input_file);

    let copied = match kind {
        ArchiveKind::TarGz => {
            let mut decoder = GzipDecoder::new(reader);
            tokio::io::copy(&mut decoder, &mut output_file).await
        }
        ArchiveKind::TarBz2 => {
            let mut decoder = BzDecoder::new(reader);
            tokio::io::copy(&mut decoder, &mut output_file).await
        }
        ArchiveKind::TarXz => {
            let mut decoder = XzDecoder::new(reader);
            tokio::io::copy(&mut decoder, &mut output_file).await
        }
        ArchiveKind::Tar | ArchiveKind::Zip => {
            return Err(Error::internal(format!("{kind:?} is not a compressed tarball")))
        }
    };
    copied.map_err(|e| extraction_error(format!("failed to decompress {kind:?} archive: {e}")))?;

    output_file
        .flush()
        .await
        .map_err(|e| extraction_error(format!("failed to flush temp file: {e}")))
}

async fn unpack_tar(tar_path: PathBuf, dest: PathBuf) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&tar_path)
            .map_err(|e| extraction_error(format!("failed to open tar archive: {e}")))?;
        let mut archive = tar::Archive::new(file);
        archive.set_preserve_permissions(true);
        archive
            .unpack(&dest)
            .map_err(|e| extraction_error(format!("failed to unpack tar archive: {e}")))
    })
    .await
    .map_err(|e| extraction_error(format!("task join error: {e}")))?
}

async fn unpack_zip(zip_path: PathBuf, dest: PathBuf) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&zip_path)
            .map_err(|e| extraction_error(format!("failed to open zip archive: {e}")))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| extraction_error(format!("failed to read zip archive: {e}")))?;
        archive
            .extract(&dest)
            .map_err(|e| extraction_error(format!("failed to unpack zip archive: {e}")))
    })
    .await
    .map_err(|e| extraction_error(format!("task join error: {e}")))?
}

/// The only top-level entry of `dir`, which must be a directory
async fn single_root(dir: &Path) -> Result<PathBuf, Error> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?;
    let mut roots = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?
    {
        roots.push(entry.path());
    }

    match roots.as_slice() {
        [root] if root.is_dir() => Ok(root.clone()),
        [] => Err(extraction_error("archive is empty")),
        [single] => Err(extraction_error(format!(
            "cannot strip root: the only top-level entry {} is not a directory",
            single.display()
        ))),
        many => Err(extraction_error(format!(
            "cannot strip root: archive has {} top-level entries",
            many.len()
        ))),
    }
}
