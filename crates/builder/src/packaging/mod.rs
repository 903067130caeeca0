//! Packaging: normalizing the installed tree
//!
//! Steps run in recipe order. A step whose condition does not hold is
//! skipped. Every step tolerates a tree it already normalized, so the
//! whole list can be re-run.

mod files;
pub mod install_name;

use crate::build_systems::{BuildSystem, BuildSystemContext};
use crate::core::context::PackageLayout;
use crate::environment::BuildEnvironment;
use crate::options::OptionSet;
use crate::recipe::model::{holds, Folder, PackageStep};
use crate::utils::fileops::prune_empty_dirs;
use files::Moved;
use kiln_errors::Error;
use kiln_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use kiln_types::{Os, Settings};
use std::path::Path;

/// What a packaging run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackagingSummary {
    pub steps_run: usize,
    pub steps_skipped: usize,
}

/// Runs package steps against a layout
pub struct Packager<'a> {
    layout: &'a PackageLayout,
    settings: &'a Settings,
    options: &'a OptionSet,
    env: &'a BuildEnvironment,
    installer: Option<(&'a dyn BuildSystem, &'a BuildSystemContext)>,
}

impl EventEmitter for Packager<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.env.event_sender()
    }
}

impl<'a> Packager<'a> {
    #[must_use]
    pub fn new(
        layout: &'a PackageLayout,
        settings: &'a Settings,
        options: &'a OptionSet,
        env: &'a BuildEnvironment,
    ) -> Self {
        Self {
            layout,
            settings,
            options,
            env,
            installer: None,
        }
    }

    /// Build system that runs the `install` step
    #[must_use]
    pub fn with_installer(
        mut self,
        build_system: &'a dyn BuildSystem,
        ctx: &'a BuildSystemContext,
    ) -> Self {
        self.installer = Some((build_system, ctx));
        self
    }

    /// Run `steps` in order
    ///
    /// # Errors
    ///
    /// Returns the first step error: `PackagingError` for file steps,
    /// `BuildError::InstallFailed` from the install step.
    pub async fn run(&self, steps: &[PackageStep]) -> Result<PackagingSummary, Error> {
        let mut summary = PackagingSummary::default();

        for step in steps {
            if !holds(step.condition(), self.settings, self.options) {
                self.emit_debug(format!("Skipping package step {}: condition not met", step.name()));
                summary.steps_skipped += 1;
                continue;
            }

            let detail = self.run_step(step).await?;
            self.emit(AppEvent::Build(BuildEvent::PackageStep {
                session_id: self.env.session_id().to_string(),
                package: self.env.package().to_string(),
                step: step.name().to_string(),
                detail,
            }));
            summary.steps_run += 1;
        }

        Ok(summary)
    }

    fn folder(&self, folder: Folder) -> &Path {
        match folder {
            Folder::Source => &self.layout.source_dir,
            Folder::Build => &self.layout.build_dir,
            Folder::Package => &self.layout.package_dir,
        }
    }

    async fn run_step(&self, step: &PackageStep) -> Result<String, Error> {
        let package_dir = &self.layout.package_dir;

        match step {
            PackageStep::Copy(copy) => {
                let dst = files::resolve_within(package_dir, &copy.dst)?;
                let copied = files::copy_matching(
                    &copy.pattern,
                    self.folder(copy.src),
                    &dst,
                    copy.keep_path,
                )
                .await?;
                Ok(format!("{copied} file(s) matching {} to {}", copy.pattern, copy.dst))
            }
            PackageStep::Install => {
                let (build_system, ctx) = self
                    .installer
                    .ok_or_else(|| Error::internal("install step without a build system"))?;
                build_system.install(ctx).await?;
                Ok(format!("{} install", build_system.name()))
            }
            PackageStep::Move(step) | PackageStep::Rename(step) => {
                match files::move_path(package_dir, &step.from, &step.to).await? {
                    Moved::Moved => Ok(format!("{} -> {}", step.from, step.to)),
                    Moved::AlreadyInPlace => Ok(format!("{} already in place", step.to)),
                }
            }
            PackageStep::Rmdir(step) => {
                if files::remove_dir(package_dir, step.path()).await? {
                    Ok(format!("removed {}", step.path()))
                } else {
                    Ok(format!("{} not present", step.path()))
                }
            }
            PackageStep::Rm(step) => {
                let removed =
                    files::remove_matching(package_dir, &step.pattern, &step.dir, step.recursive)
                        .await?;
                Ok(format!("removed {removed} file(s) matching {}", step.pattern))
            }
            PackageStep::FixAppleInstallName => {
                if self.settings.os != Os::Macos || !self.options.is_true("shared") {
                    return Ok("not a shared macOS build".to_string());
                }
                let fixes = install_name::fix_apple_install_names(self.env, package_dir).await?;
                Ok(format!(
                    "{} dylib id(s) set to @rpath, {} file(s) relinked",
                    fixes.ids.len(),
                    fixes.references.len()
                ))
            }
            PackageStep::PruneEmptyDirs => {
                let removed = prune_empty_dirs(package_dir).await?;
                Ok(format!("removed {removed} empty director(ies)"))
            }
        }
    }
}
