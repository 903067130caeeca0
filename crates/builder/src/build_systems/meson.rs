//! Meson build system implementation

use super::core::portable_path;
use super::{BuildSystem, BuildSystemContext, ToolchainSpec};
use async_trait::async_trait;
use kiln_errors::{BuildError, Error};
use kiln_types::{BuildType, OptionValue, Runtime};

/// Native file written to the generators folder
pub const NATIVE_FILE: &str = "kiln_meson_native.ini";

/// Keys that belong in `[built-in options]` even when a recipe lists them
/// with its project options
const BUILTIN_OPTIONS: &[&str] = &[
    "buildtype",
    "debug",
    "default_library",
    "optimization",
    "warning_level",
    "werror",
    "wrap_mode",
    "cpp_std",
    "c_std",
    "prefix",
    "libdir",
    "bindir",
    "includedir",
    "pkg_config_path",
];

fn is_builtin(key: &str) -> bool {
    key.starts_with("b_") || BUILTIN_OPTIONS.contains(&key)
}

/// Meson build system
#[derive(Debug, Default)]
pub struct MesonBuildSystem;

impl MesonBuildSystem {
    /// Create a new Meson build system instance
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Get `meson setup` arguments
    fn get_setup_args(&self, ctx: &BuildSystemContext) -> Vec<String> {
        let mut args = vec![
            "setup".to_string(),
            format!("--native-file={}", self.toolchain_path(ctx).display()),
        ];

        // An already configured build folder must be reconfigured in place
        if ctx.build_dir.join("meson-private").exists() {
            args.push("--reconfigure".to_string());
        }

        args.push(ctx.build_dir.display().to_string());
        args.push(ctx.source_dir.display().to_string());
        args
    }
}

fn buildtype(build_type: BuildType) -> &'static str {
    match build_type {
        BuildType::Release => "release",
        BuildType::Debug => "debug",
        BuildType::RelWithDebInfo => "debugoptimized",
        BuildType::MinSizeRel => "minsize",
    }
}

fn vscrt(runtime: Runtime, build_type: BuildType) -> &'static str {
    match (runtime, build_type == BuildType::Debug) {
        (Runtime::Static, false) => "mt",
        (Runtime::Static, true) => "mtd",
        (Runtime::Dynamic, false) => "md",
        (Runtime::Dynamic, true) => "mdd",
    }
}

/// Render a machine-file value: booleans bare, everything else quoted
fn meson_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(b) => b.to_string(),
        OptionValue::Str(s) => quote(s),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Ordered `key = value` section; setting an existing key replaces it
#[derive(Default)]
struct Section(Vec<(String, String)>);

impl Section {
    fn set(&mut self, key: &str, value: String) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        out.push_str(&format!("[{name}]\n"));
        for (key, value) in &self.0 {
            out.push_str(&format!("{key} = {value}\n"));
        }
    }
}

/// Render the native file for a toolchain spec
#[must_use]
pub fn render_native_file(spec: &ToolchainSpec) -> String {
    let settings = &spec.settings;
    let mut builtin = Section::default();

    builtin.set("buildtype", quote(buildtype(settings.build_type)));
    builtin.set(
        "default_library",
        quote(if spec.shared() { "shared" } else { "static" }),
    );
    if let Some(fpic) = spec.fpic() {
        builtin.set("b_staticpic", fpic.to_string());
    }
    if let Some(cppstd) = settings.compiler.cppstd {
        builtin.set("cpp_std", quote(&cppstd.meson_value()));
    }
    if settings.is_msvc() {
        if let Some(runtime) = settings.compiler.runtime {
            builtin.set("b_vscrt", quote(vscrt(runtime, settings.build_type)));
        }
    }
    builtin.set("prefix", quote(&portable_path(&spec.package_dir)));
    builtin.set("libdir", quote("lib"));
    builtin.set("bindir", quote("bin"));
    builtin.set("includedir", quote("include"));
    builtin.set("wrap_mode", quote("nofallback"));
    builtin.set(
        "pkg_config_path",
        format!("[{}]", quote(&portable_path(&spec.deps_dir))),
    );

    let mut project = Section::default();
    for (key, value) in &spec.project_options {
        if is_builtin(key) {
            builtin.set(key, meson_value(value));
        } else {
            project.set(key, meson_value(value));
        }
    }

    let mut out = String::from("# Generated by kiln, do not edit\n");
    builtin.render("built-in options", &mut out);
    if !project.0.is_empty() {
        out.push('\n');
        project.render("project options", &mut out);
    }
    out
}

#[async_trait]
impl BuildSystem for MesonBuildSystem {
    fn name(&self) -> &'static str {
        "meson"
    }

    fn toolchain_file_name(&self) -> &'static str {
        NATIVE_FILE
    }

    fn render_toolchain(&self, spec: &ToolchainSpec) -> String {
        render_native_file(spec)
    }

    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let setup_args = self.get_setup_args(ctx);
        let arg_refs: Vec<&str> = setup_args.iter().map(String::as_str).collect();

        let result = ctx
            .execute("meson", &arg_refs, Some(&ctx.source_dir))
            .await?;

        if !result.success {
            return Err(BuildError::ConfigureFailed {
                message: format!("meson setup failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let jobs_str = ctx.jobs.to_string();
        let build_dir_str = ctx.build_dir.display().to_string();
        let compile_args = ["compile", "-C", &build_dir_str, "-j", &jobs_str];

        let result = ctx
            .execute("meson", &compile_args, Some(&ctx.source_dir))
            .await?;

        if !result.success {
            return Err(BuildError::CompileFailed {
                message: format!("meson compile failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }

    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let build_dir_str = ctx.build_dir.display().to_string();
        let result = ctx
            .execute(
                "meson",
                &["install", "-C", &build_dir_str],
                Some(&ctx.source_dir),
            )
            .await?;

        if !result.success {
            return Err(BuildError::InstallFailed {
                message: format!("meson install failed: {}", result.failure_output()),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSet;
    use crate::BuildEnvironment;
    use kiln_types::Settings;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn spec(pairs: &[&str], options: &[(&str, OptionValue)]) -> ToolchainSpec {
        let mut builder = Settings::builder();
        for pair in pairs {
            builder.set_pair(pair).unwrap();
        }
        ToolchainSpec {
            settings: builder.build().unwrap(),
            options: options
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<OptionSet>(),
            project_options: BTreeMap::new(),
            variables: BTreeMap::new(),
            package_dir: PathBuf::from("/work/pkg"),
            deps_dir: PathBuf::from("/work/build/generators"),
        }
    }

    #[test]
    fn test_native_file_static_linux() {
        let mut spec = spec(
            &["os=Linux", "arch=x86_64", "compiler=gcc", "compiler.version=13", "compiler.cppstd=gnu17"],
            &[("shared", OptionValue::Bool(false)), ("fPIC", OptionValue::Bool(true))],
        );
        spec.project_options
            .insert("build-tests".to_string(), OptionValue::Bool(false));
        spec.project_options.insert(
            "msvc14x-parallel-installable".to_string(),
            OptionValue::Bool(false),
        );

        let rendered = render_native_file(&spec);
        let expected = "\
# Generated by kiln, do not edit
[built-in options]
buildtype = 'release'
default_library = 'static'
b_staticpic = true
cpp_std = 'gnu++17'
prefix = '/work/pkg'
libdir = 'lib'
bindir = 'bin'
includedir = 'include'
wrap_mode = 'nofallback'
pkg_config_path = ['/work/build/generators']

[project options]
build-tests = false
msvc14x-parallel-installable = false
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_native_file_shared_msvc() {
        let mut spec = spec(
            &[
                "os=Windows",
                "arch=x86_64",
                "compiler=msvc",
                "compiler.version=193",
                "compiler.runtime=dynamic",
                "build_type=Debug",
            ],
            &[("shared", OptionValue::Bool(true))],
        );
        spec.project_options
            .insert("default_library".to_string(), OptionValue::Str("shared".into()));

        let rendered = render_native_file(&spec);
        assert!(rendered.contains("buildtype = 'debug'\n"));
        assert!(rendered.contains("default_library = 'shared'\n"));
        assert!(rendered.contains("b_vscrt = 'mdd'\n"));
        assert!(!rendered.contains("b_staticpic"));
        assert!(!rendered.contains("[project options]"));
        assert_eq!(rendered.matches("default_library").count(), 1);
    }

    #[test]
    fn test_setup_args() {
        let env = BuildEnvironment::new("session", "demo/1.0");
        let ctx = BuildSystemContext::new(env, PathBuf::from("/w/src"), PathBuf::from("/w/build"));
        let args = MesonBuildSystem::new().get_setup_args(&ctx);

        assert_eq!(args[0], "setup");
        assert_eq!(
            args[1],
            "--native-file=/w/build/generators/kiln_meson_native.ini"
        );
        assert_eq!(&args[2..], ["/w/build", "/w/src"]);
    }
}
