//! Settings profiles and command line overrides

use crate::cli::RequestArgs;
use crate::error::CliError;
use kiln_builder::parse_option_pair;
use kiln_types::{OptionValue, Settings};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A TOML profile
///
/// ```toml
/// [settings]
/// os = "Linux"
/// compiler = "gcc"
/// "compiler.version" = "13"
///
/// [options]
/// shared = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub settings: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl Profile {
    pub async fn load(path: &Path) -> Result<Self, CliError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&contents).map_err(|message| CliError::Profile {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }
}

fn scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Settings and user options of one request
pub struct ResolvedInputs {
    pub settings: Settings,
    pub options: Vec<(String, OptionValue)>,
}

/// Merge the profile (if any) with `-s`/`-o` flags; flags win
pub async fn resolve_inputs(args: &RequestArgs, package: &str) -> Result<ResolvedInputs, CliError> {
    let profile = match &args.profile {
        Some(path) => Profile::load(path).await?,
        None => Profile::default(),
    };
    merge(&profile, args, package)
}

fn merge(profile: &Profile, args: &RequestArgs, package: &str) -> Result<ResolvedInputs, CliError> {
    let mut builder = Settings::builder();
    for (key, value) in &profile.settings {
        builder.set(key, &scalar(value)).map_err(kiln_errors::Error::from)?;
    }
    for pair in &args.settings {
        builder.set_pair(pair).map_err(kiln_errors::Error::from)?;
    }
    let settings = builder.build().map_err(kiln_errors::Error::from)?;

    let mut options: BTreeMap<String, OptionValue> = BTreeMap::new();
    for (name, value) in &profile.options {
        let pair = format!("{name}={}", scalar(value));
        if let Some((name, value)) =
            parse_option_pair(&pair, package).map_err(kiln_errors::Error::from)?
        {
            options.insert(name, value);
        }
    }
    for pair in &args.options {
        if let Some((name, value)) =
            parse_option_pair(pair, package).map_err(kiln_errors::Error::from)?
        {
            options.insert(name, value);
        }
    }

    Ok(ResolvedInputs {
        settings,
        options: options.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_types::{CompilerKind, Os};
    use std::path::PathBuf;

    fn args(settings: &[&str], options: &[&str]) -> RequestArgs {
        RequestArgs {
            recipe: PathBuf::from("recipe.yml"),
            package_version: "1.0.0".to_string(),
            settings: settings.iter().map(ToString::to_string).collect(),
            options: options.iter().map(ToString::to_string).collect(),
            profile: None,
        }
    }

    const PROFILE: &str = r#"
[settings]
os = "Linux"
arch = "x86_64"
compiler = "gcc"
"compiler.version" = "13"

[options]
shared = true
"libxmlpp:fPIC" = false
"other:shared" = false
"#;

    #[test]
    fn test_flags_override_profile() {
        let profile = Profile::from_toml(PROFILE).unwrap();
        let inputs = merge(
            &profile,
            &args(&["compiler=clang", "compiler.version=17"], &["shared=False"]),
            "libxmlpp",
        )
        .unwrap();

        assert_eq!(inputs.settings.os, Os::Linux);
        assert_eq!(inputs.settings.compiler.kind, CompilerKind::Clang);
        assert_eq!(inputs.settings.compiler.version, "17");
        assert_eq!(
            inputs.options,
            vec![
                ("fPIC".to_string(), OptionValue::Bool(false)),
                ("shared".to_string(), OptionValue::Bool(false)),
            ]
        );
    }

    #[test]
    fn test_unknown_setting_rejected() {
        let err = merge(
            &Profile::default(),
            &args(&["compiler=gcc", "compiler.version=13", "colour=blue"], &[]),
            "demo",
        );
        assert!(err.is_err());
    }
}
