//! CMake build system implementation

use super::core::portable_path;
use super::{BuildSystem, BuildSystemContext, ToolchainSpec};
use async_trait::async_trait;
use kiln_errors::{BuildError, Error};
use kiln_types::{BuildType, OptionValue, Runtime};
use std::fmt::Write as _;

/// Toolchain file written to the generators folder
pub const TOOLCHAIN_FILE: &str = "kiln_toolchain.cmake";

/// CMake build system
#[derive(Debug, Default)]
pub struct CMakeBuildSystem;

impl CMakeBuildSystem {
    /// Create a new CMake build system instance
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Get CMake configuration arguments
    fn get_cmake_args(&self, ctx: &BuildSystemContext) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            ctx.source_dir.display().to_string(),
            "-B".to_string(),
            ctx.build_dir.display().to_string(),
            format!("-DCMAKE_TOOLCHAIN_FILE={}", self.toolchain_path(ctx).display()),
        ];

        if let Some(generator) = &ctx.cmake_generator {
            args.push("-G".to_string());
            args.push(generator.clone());
        }

        args
    }
}

fn msvc_runtime_library(runtime: Runtime, build_type: BuildType) -> String {
    let mut value = String::from("MultiThreaded");
    if build_type == BuildType::Debug {
        value.push_str("Debug");
    }
    if runtime == Runtime::Dynamic {
        value.push_str("DLL");
    }
    value
}

fn cmake_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// Cache entry for a recipe value: booleans as `BOOL`, the rest as `STRING`
fn cache_entry(key: &str, value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(b) => {
            format!("set({key} {} CACHE BOOL \"Variable {key}\" FORCE)\n", on_off(*b))
        }
        OptionValue::Str(s) => format!(
            "set({key} {} CACHE STRING \"Variable {key}\" FORCE)\n",
            cmake_quote(s)
        ),
    }
}

/// Render the toolchain file for a toolchain spec
#[must_use]
pub fn render_toolchain_file(spec: &ToolchainSpec) -> String {
    let settings = &spec.settings;
    let mut out = String::from("# Generated by kiln, do not edit\n");

    let _ = writeln!(
        out,
        "set(CMAKE_BUILD_TYPE {} CACHE STRING \"\" FORCE)",
        cmake_quote(settings.build_type.as_str())
    );
    let _ = writeln!(
        out,
        "set(BUILD_SHARED_LIBS {} CACHE BOOL \"\" FORCE)",
        on_off(spec.shared())
    );
    if let Some(fpic) = spec.fpic() {
        let _ = writeln!(
            out,
            "set(CMAKE_POSITION_INDEPENDENT_CODE {} CACHE BOOL \"\" FORCE)",
            on_off(fpic)
        );
    }

    if let Some(cppstd) = settings.compiler.cppstd {
        let _ = writeln!(out, "set(CMAKE_CXX_STANDARD {})", cppstd.cmake_value());
        let _ = writeln!(
            out,
            "set(CMAKE_CXX_EXTENSIONS {})",
            on_off(cppstd.gnu_extensions)
        );
        out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n");
    }

    if settings.is_msvc() {
        if let Some(runtime) = settings.compiler.runtime {
            out.push_str("cmake_policy(SET CMP0091 NEW)\n");
            let _ = writeln!(
                out,
                "set(CMAKE_MSVC_RUNTIME_LIBRARY {})",
                cmake_quote(&msvc_runtime_library(runtime, settings.build_type))
            );
        }
    }

    out.push_str("set(BUILD_TESTING OFF CACHE BOOL \"\" FORCE)\n");
    let _ = writeln!(
        out,
        "list(PREPEND CMAKE_PREFIX_PATH {})",
        cmake_quote(&portable_path(&spec.deps_dir))
    );
    out.push_str("set(CMAKE_FIND_PACKAGE_PREFER_CONFIG ON)\n");
    let _ = writeln!(
        out,
        "set(CMAKE_INSTALL_PREFIX {} CACHE PATH \"\" FORCE)",
        cmake_quote(&portable_path(&spec.package_dir))
    );

    for (key, value) in spec.project_options.iter().chain(&spec.variables) {
        out.push_str(&cache_entry(key, value));
    }

    out
}

#[async_trait]
impl BuildSystem for CMakeBuildSystem {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn toolchain_file_name(&self) -> &'static str {
        TOOLCHAIN_FILE
    }

    fn render_toolchain(&self, spec: &ToolchainSpec) -> String {
        render_toolchain_file(spec)
    }

    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let cmake_args = self.get_cmake_args(ctx);
        let arg_refs: Vec<&str> = cmake_args.iter().map(String::as_str).collect();

        let result = ctx
            .execute("cmake", &arg_refs, Some(&ctx.source_dir))
            .await?;

        if !result.success {
            return Err(BuildError::ConfigureFailed {
                message: format!("cmake configure failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let build_dir_str = ctx.build_dir.display().to_string();
        let jobs_str = ctx.jobs.to_string();
        let args = [
            "--build",
            &build_dir_str,
            "--config",
            &ctx.build_type,
            "--parallel",
            &jobs_str,
        ];

        let result = ctx.execute("cmake", &args, Some(&ctx.build_dir)).await?;

        if !result.success {
            return Err(BuildError::CompileFailed {
                message: format!("cmake build failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }

    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let build_dir_str = ctx.build_dir.display().to_string();
        let prefix_str = ctx.package_dir.display().to_string();
        let args = [
            "--install",
            &build_dir_str,
            "--config",
            &ctx.build_type,
            "--prefix",
            &prefix_str,
        ];

        let result = ctx.execute("cmake", &args, Some(&ctx.build_dir)).await?;

        if !result.success {
            return Err(BuildError::InstallFailed {
                message: format!("cmake install failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }
}
