//! Source acquisition
//!
//! Resolves the requested version to its source entry, fetches the archive
//! from the first URL that works, verifies it, extracts it into the source
//! folder and applies the recipe's patches.

mod extract;
mod fetch;
mod patch;

pub use extract::{detect_archive, extract_archive, ArchiveKind};
pub use patch::{apply_patches, apply_source_edits};

use crate::core::context::PackageLayout;
use crate::environment::BuildEnvironment;
use crate::recipe::model::{Recipe, SourceSpec};
use fetch::Fetched;
use kiln_errors::{AcquisitionError, Error};
use kiln_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use kiln_net::NetClient;
use kiln_types::{parse_loose, PackageId};
use std::path::{Path, PathBuf};

/// Source entry for the requested version
///
/// Versions are looked up as written first, then by loose equality so
/// `5.0` finds a `5.0.0` entry.
///
/// # Errors
///
/// Returns `AcquisitionError::UnknownVersion` listing the available
/// versions when the recipe has no entry.
pub fn resolve_source<'r>(
    recipe: &'r Recipe,
    package: &PackageId,
) -> Result<&'r SourceSpec, AcquisitionError> {
    if let Some(spec) = recipe.sources.get(&package.version) {
        return Ok(spec);
    }

    let wanted = parse_loose(&package.version).ok();
    recipe
        .sources
        .iter()
        .find(|(version, _)| wanted.is_some() && parse_loose(version).ok() == wanted)
        .map(|(_, spec)| spec)
        .ok_or_else(|| AcquisitionError::UnknownVersion {
            package: package.name.clone(),
            version: package.version.clone(),
            available: recipe.versions().collect::<Vec<_>>().join(", "),
        })
}

/// Outcome of a successful acquisition
#[derive(Debug, Clone)]
pub struct AcquiredSource {
    /// URL the source came from
    pub url: String,
    /// sha256 of the archive; `None` for a local source tree
    pub sha256: Option<String>,
    pub archive_kind: Option<ArchiveKind>,
    pub patches_applied: usize,
}

/// Fetches, verifies, extracts and patches one version's sources
pub struct SourceAcquirer<'a> {
    spec: &'a SourceSpec,
    package: &'a PackageId,
    recipe_dir: &'a Path,
    client: &'a NetClient,
    env: &'a BuildEnvironment,
    checksum_required: bool,
}

impl EventEmitter for SourceAcquirer<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.env.event_sender()
    }
}

impl<'a> SourceAcquirer<'a> {
    /// Create an acquirer for the requested version of a recipe
    ///
    /// # Errors
    ///
    /// Returns `AcquisitionError::UnknownVersion` when the recipe has no
    /// source for the version.
    pub fn new(
        recipe: &'a Recipe,
        package: &'a PackageId,
        recipe_dir: &'a Path,
        client: &'a NetClient,
        env: &'a BuildEnvironment,
    ) -> Result<Self, Error> {
        Ok(Self {
            spec: resolve_source(recipe, package)?,
            package,
            recipe_dir,
            client,
            env,
            checksum_required: false,
        })
    }

    /// Refuse a remote source that has no sha256 instead of warning
    #[must_use]
    pub fn with_checksum_required(mut self, required: bool) -> Self {
        self.checksum_required = required;
        self
    }

    /// Run the whole acquisition into `layout.source_dir`
    ///
    /// # Errors
    ///
    /// Returns the last fetch error when every URL fails, a checksum
    /// mismatch immediately, and extraction or patch errors. With
    /// checksums required, a remote source without sha256 fails with
    /// `AcquisitionError::MissingChecksum` before anything is fetched.
    pub async fn acquire(&self, layout: &PackageLayout) -> Result<AcquiredSource, Error> {
        if self.spec.sha256.is_none() && self.checksum_required {
            let remote = self.spec.url.as_slice().iter().find(|url| {
                matches!(
                    fetch::Location::parse(url, self.recipe_dir),
                    fetch::Location::Remote(_)
                )
            });
            if let Some(url) = remote {
                return Err(AcquisitionError::MissingChecksum {
                    package: self.package.to_string(),
                    url: url.clone(),
                }
                .into());
            }
        }

        if self.spec.sha256.is_none() {
            self.emit_warning_with_context(
                format!(
                    "{}: source declares no sha256, the archive is not verified",
                    self.package
                ),
                self.spec.url.as_slice().first().cloned().unwrap_or_default(),
            );
        }

        tokio::fs::create_dir_all(&layout.downloads_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &layout.downloads_dir))?;

        let (url, fetched) = self.fetch_first(&layout.downloads_dir).await?;

        let (sha256, archive_kind) = match fetched {
            Fetched::Archive { path, sha256 } => {
                let kind = extract_archive(
                    &path,
                    &layout.source_dir,
                    &layout.root,
                    self.spec.strip_root,
                )
                .await?;
                (Some(sha256), Some(kind))
            }
            Fetched::Directory(dir) => {
                if layout.source_dir.exists() {
                    tokio::fs::remove_dir_all(&layout.source_dir)
                        .await
                        .map_err(|e| Error::io_with_path(&e, &layout.source_dir))?;
                }
                crate::utils::fileops::copy_directory_recursive(&dir, &layout.source_dir)
                    .await?;
                (None, None)
            }
        };

        let patches_applied = apply_patches(
            self.env,
            &self.spec.patches,
            self.recipe_dir,
            &layout.source_dir,
        )
        .await?;

        self.emit_debug(format!(
            "{}: sources ready in {}",
            self.package,
            layout.source_dir.display()
        ));

        Ok(AcquiredSource {
            url,
            sha256,
            archive_kind,
            patches_applied,
        })
    }

    /// Try each URL in order; a checksum mismatch stops the search
    async fn fetch_first(&self, downloads_dir: &Path) -> Result<(String, Fetched), Error> {
        let fallback_sender;
        let tx = if let Some(tx) = self.event_sender() {
            tx
        } else {
            fallback_sender = kiln_events::channel().0;
            &fallback_sender
        };

        let urls = self.spec.url.as_slice();
        let package = self.package.to_string();
        let mut last_error = None;

        for (index, url) in urls.iter().enumerate() {
            match fetch::fetch(
                self.client,
                url,
                &package,
                self.recipe_dir,
                downloads_dir,
                self.spec.sha256.as_deref(),
                tx,
            )
            .await
            {
                Ok(fetched) => return Ok((url.clone(), fetched)),
                Err(err @ Error::Acquisition(AcquisitionError::ChecksumMismatch { .. })) => {
                    return Err(err)
                }
                Err(err) => {
                    self.emit(AppEvent::Download(DownloadEvent::Failed {
                        url: url.clone(),
                        package: Some(package.clone()),
                        error: err.to_string(),
                        next_mirror: urls.get(index + 1).cloned(),
                    }));
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AcquisitionError::DownloadFailed {
                url: String::new(),
                message: "no source URL".to_string(),
            }
            .into()
        }))
    }

    /// Archive path a URL is stored under
    #[must_use]
    pub fn download_path(&self, downloads_dir: &Path, url: &str) -> PathBuf {
        downloads_dir.join(fetch::archive_file_name(url))
    }
}
