//! Build request, folder layout and builder configuration

use kiln_config::{Config, ToolsConfig};
use kiln_events::{EventEmitter, EventSender};
use kiln_net::NetConfig;
use kiln_types::{OptionValue, PackageId, Settings};
use std::path::{Path, PathBuf};

/// One recipe invocation: what to build and with which inputs
#[derive(Clone, Debug)]
pub struct BuildRequest {
    /// Recipe file path
    pub recipe_path: PathBuf,
    /// Version to build; must have a sources entry
    pub version: String,
    /// Target toolchain
    pub settings: Settings,
    /// User option values, already unscoped
    pub options: Vec<(String, OptionValue)>,
    /// Root under which `<name>/<version>/...` folders are created
    pub workspace: PathBuf,
    /// Package folders of already built dependencies
    pub dependency_dirs: Vec<PathBuf>,
    /// Parallel jobs override; `None` uses the builder configuration
    pub jobs: Option<usize>,
    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

impl EventEmitter for BuildRequest {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl BuildRequest {
    /// Create new build request
    #[must_use]
    pub fn new(
        recipe_path: impl Into<PathBuf>,
        version: impl Into<String>,
        settings: Settings,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipe_path: recipe_path.into(),
            version: version.into(),
            settings,
            options: Vec::new(),
            workspace: workspace.into(),
            dependency_dirs: Vec::new(),
            jobs: None,
            event_sender: None,
        }
    }

    /// Set user option values
    #[must_use]
    pub fn with_options(mut self, options: Vec<(String, OptionValue)>) -> Self {
        self.options = options;
        self
    }

    /// Add a dependency package folder
    #[must_use]
    pub fn with_dependency_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dependency_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Directory patch files are resolved against
    #[must_use]
    pub fn recipe_dir(&self) -> PathBuf {
        self.recipe_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

/// The isolated folder triple of one invocation
///
/// `<workspace>/<name>/<version>/{source, build, package}` plus a
/// `downloads` folder for fetched archives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub package_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

impl PackageLayout {
    #[must_use]
    pub fn new(workspace: &Path, package: &PackageId) -> Self {
        let root = workspace.join(&package.name).join(&package.version);
        Self {
            source_dir: root.join("source"),
            build_dir: root.join("build"),
            package_dir: root.join("package"),
            downloads_dir: root.join("downloads"),
            root,
        }
    }

    /// Toolchain and dependency files live here
    #[must_use]
    pub fn generators_dir(&self) -> PathBuf {
        self.build_dir.join("generators")
    }

    /// Create the folders an invocation starts from
    ///
    /// The package folder is always emptied so it only ever holds this
    /// invocation's artifacts. The build folder is emptied when
    /// `clean_build` is set.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a folder cannot be removed or created.
    pub async fn prepare(&self, clean_build: bool) -> Result<(), kiln_errors::Error> {
        let mut fresh = vec![&self.package_dir];
        if clean_build {
            fresh.push(&self.build_dir);
        }
        for dir in fresh {
            if dir.exists() {
                tokio::fs::remove_dir_all(dir)
                    .await
                    .map_err(|e| kiln_errors::Error::io_with_path(&e, dir))?;
            }
        }

        for dir in [
            &self.downloads_dir,
            &self.build_dir,
            &self.package_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| kiln_errors::Error::io_with_path(&e, dir))?;
        }
        Ok(())
    }
}

/// Builder-wide settings taken from the tool configuration
#[derive(Clone, Debug)]
pub struct BuilderConfig {
    /// Parallel jobs, already resolved (never 0)
    pub jobs: usize,
    pub cmake_generator: Option<String>,
    pub clean_build_dir: bool,
    pub require_checksums: bool,
    pub tools: ToolsConfig,
    pub net: NetConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            jobs: kiln_config::calculate_build_jobs(0),
            cmake_generator: None,
            clean_build_dir: false,
            require_checksums: false,
            tools: ToolsConfig::default(),
            net: NetConfig::default(),
        }
    }
}

impl From<&Config> for BuilderConfig {
    fn from(config: &Config) -> Self {
        Self {
            jobs: config.build_jobs(),
            cmake_generator: config.build.cmake_generator.clone(),
            clean_build_dir: config.build.clean_build_dir,
            require_checksums: config.build.require_checksums,
            tools: config.tools.clone(),
            net: NetConfig::from(&config.network),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = PackageLayout::new(Path::new("/ws"), &PackageId::new("libxmlpp", "5.5.0"));
        assert_eq!(layout.root, PathBuf::from("/ws/libxmlpp/5.5.0"));
        assert_eq!(layout.source_dir, PathBuf::from("/ws/libxmlpp/5.5.0/source"));
        assert_eq!(layout.package_dir, PathBuf::from("/ws/libxmlpp/5.5.0/package"));
        assert_eq!(
            layout.generators_dir(),
            PathBuf::from("/ws/libxmlpp/5.5.0/build/generators")
        );
    }

    #[tokio::test]
    async fn test_prepare_empties_package_folder() {
        let temp = tempfile::tempdir().unwrap();
        let layout = PackageLayout::new(temp.path(), &PackageId::new("demo", "1.0"));
        layout.prepare(false).await.unwrap();

        std::fs::write(layout.package_dir.join("stale.txt"), "old").unwrap();
        std::fs::write(layout.build_dir.join("cache.txt"), "keep").unwrap();
        layout.prepare(false).await.unwrap();

        assert!(!layout.package_dir.join("stale.txt").exists());
        assert!(layout.build_dir.join("cache.txt").exists());
        assert!(layout.downloads_dir.is_dir());
    }
}
