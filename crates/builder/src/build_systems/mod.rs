//! Build system abstraction and implementations
//!
//! Each build system renders a native toolchain file from the effective
//! options and settings, then drives configure, build and install through
//! the shared `BuildEnvironment`.

use async_trait::async_trait;
use kiln_errors::Error;
use std::path::PathBuf;

mod cmake;
mod core;
mod meson;

pub use cmake::CMakeBuildSystem;
pub(crate) use core::portable_path;
pub use core::{BuildSystemContext, ToolchainSpec};
pub use meson::MesonBuildSystem;

use crate::recipe::model::BuildSystemKind;

/// Trait for build system implementations
#[async_trait]
pub trait BuildSystem: Send + Sync {
    /// Get build system name
    fn name(&self) -> &'static str;

    /// File name of the generated toolchain inside the generators folder
    fn toolchain_file_name(&self) -> &'static str;

    /// Render the toolchain file; the output depends only on `spec`
    fn render_toolchain(&self, spec: &ToolchainSpec) -> String;

    /// Configure phase
    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Build phase
    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Install phase, into the package folder
    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Path of the toolchain file for a context
    fn toolchain_path(&self, ctx: &BuildSystemContext) -> PathBuf {
        ctx.generators_dir.join(self.toolchain_file_name())
    }

    /// Render and write the toolchain file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the generators folder cannot be written.
    async fn generate(
        &self,
        ctx: &BuildSystemContext,
        spec: &ToolchainSpec,
    ) -> Result<PathBuf, Error> {
        let path = self.toolchain_path(ctx);
        tokio::fs::create_dir_all(&ctx.generators_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &ctx.generators_dir))?;
        tokio::fs::write(&path, self.render_toolchain(spec))
            .await
            .map_err(|e| Error::io_with_path(&e, &path))?;
        Ok(path)
    }
}

/// Build system implementation for a recipe's `build.system`
#[must_use]
pub fn build_system_for(kind: BuildSystemKind) -> Box<dyn BuildSystem> {
    match kind {
        BuildSystemKind::Meson => Box::new(MesonBuildSystem::new()),
        BuildSystemKind::Cmake => Box::new(CMakeBuildSystem::new()),
    }
}
