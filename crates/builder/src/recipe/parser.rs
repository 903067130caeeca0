//! YAML recipe parser with validation and variable expansion

use super::model::{
    Condition, ConditionalValue, CopyStep, MoveStep, PackageStep, Recipe, RmStep, RmdirStep,
};
use kiln_errors::{BuildError, Error};
use kiln_types::OptionValue;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Parse a YAML recipe from a file
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The YAML is invalid
/// - Required fields are missing
/// - Validation fails
pub async fn parse_recipe(path: &Path) -> Result<Recipe, Error> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BuildError::RecipeError {
            message: format!("failed to read recipe {}: {e}", path.display()),
        })?;

    parse_recipe_from_str(&content)
}

/// Parse a YAML recipe from a string
///
/// # Errors
///
/// Returns an error if the YAML is invalid, required fields are missing or
/// validation fails.
pub fn parse_recipe_from_str(content: &str) -> Result<Recipe, Error> {
    let recipe: Recipe = serde_yml::from_str(content).map_err(|e| BuildError::RecipeError {
        message: format!("failed to parse YAML: {e}"),
    })?;

    validate_recipe(&recipe)?;

    Ok(recipe)
}

fn recipe_error(message: impl Into<String>) -> Error {
    BuildError::RecipeError {
        message: message.into(),
    }
    .into()
}

/// Validate a parsed recipe
///
/// # Errors
///
/// Returns `BuildError::RecipeError` describing the first problem found.
pub fn validate_recipe(recipe: &Recipe) -> Result<(), Error> {
    if recipe.metadata.name.trim().is_empty() {
        return Err(recipe_error("metadata.name cannot be empty"));
    }

    for (name, decl) in &recipe.options {
        if decl.values.is_empty() {
            return Err(recipe_error(format!("option {name} declares no values")));
        }
        if !decl.allows(&decl.default) {
            return Err(recipe_error(format!(
                "default '{}' of option {name} is not one of: {}",
                decl.default,
                decl.domain()
            )));
        }
    }

    let declared = |name: &str| recipe.options.contains_key(name);
    let check_condition = |context: &str, condition: Option<&Condition>| -> Result<(), Error> {
        if let Some(unknown) = condition
            .into_iter()
            .flat_map(Condition::option_names)
            .find(|name| !declared(name))
        {
            return Err(recipe_error(format!(
                "{context} refers to undeclared option {unknown}"
            )));
        }
        Ok(())
    };

    for rule in &recipe.option_rules {
        if !declared(&rule.remove) {
            return Err(recipe_error(format!(
                "option rule removes undeclared option {}",
                rule.remove
            )));
        }
        check_condition("option rule", Some(&rule.when))?;
    }

    for rule in &recipe.compatibility.invalid {
        check_condition("compatibility.invalid", Some(&rule.when))?;
    }

    for (key, value) in &recipe.build.options {
        for condition in value.conditions() {
            check_condition(&format!("build.options.{key}"), Some(condition))?;
        }
    }
    for (key, value) in &recipe.build.variables {
        for condition in value.conditions() {
            check_condition(&format!("build.variables.{key}"), Some(condition))?;
        }
    }
    for edit in &recipe.build.source_edits {
        check_condition(&format!("source edit of {}", edit.file), edit.when.as_ref())?;
    }
    for step in &recipe.package {
        check_condition(&format!("package step {}", step.name()), step.condition())?;
    }

    for (version, source) in &recipe.sources {
        if source.url.as_slice().is_empty() {
            return Err(recipe_error(format!("sources.{version} lists no url")));
        }
    }

    Ok(())
}

/// Expand `${...}` references for one version of the recipe
///
/// Built-ins are `name` and `version`; facts may refer to them and are
/// expanded first. Unknown references are left untouched.
#[must_use]
pub fn expand_variables(recipe: &Recipe, version: &str) -> Recipe {
    let mut context = HashMap::new();
    context.insert("name".to_string(), recipe.metadata.name.clone());
    context.insert("version".to_string(), version.to_string());

    for (key, value) in &recipe.facts {
        let expanded = expand_string(value, &context);
        context.insert(key.clone(), expanded);
    }

    let mut recipe = recipe.clone();
    let expand = |s: &mut String| *s = expand_string(s, &context);

    for value in recipe.facts.values_mut() {
        expand(value);
    }

    for source in recipe.sources.values_mut() {
        match &mut source.url {
            super::model::UrlList::One(url) => expand(url),
            super::model::UrlList::Many(urls) => urls.iter_mut().for_each(expand),
        }
    }

    expand_table(&mut recipe.build.options, &context);
    expand_table(&mut recipe.build.variables, &context);

    for edit in &mut recipe.build.source_edits {
        expand(&mut edit.file);
        expand(&mut edit.search);
        expand(&mut edit.replace);
    }

    for step in &mut recipe.package {
        match step {
            PackageStep::Copy(CopyStep { pattern, dst, .. }) => {
                expand(pattern);
                expand(dst);
            }
            PackageStep::Move(MoveStep { from, to, .. })
            | PackageStep::Rename(MoveStep { from, to, .. }) => {
                expand(from);
                expand(to);
            }
            PackageStep::Rmdir(RmdirStep::Path(path) | RmdirStep::Conditional { path, .. }) => {
                expand(path);
            }
            PackageStep::Rm(RmStep { pattern, dir, .. }) => {
                expand(pattern);
                expand(dir);
            }
            PackageStep::Install | PackageStep::FixAppleInstallName | PackageStep::PruneEmptyDirs => {}
        }
    }

    let exports = &mut recipe.exports;
    for list in [
        &mut exports.libs,
        &mut exports.includedirs,
        &mut exports.libdirs,
        &mut exports.bindirs,
        &mut exports.defines,
        &mut exports.system_libs,
    ] {
        list.iter_mut().for_each(expand);
    }
    for property in [
        &mut exports.properties.pkg_config_name,
        &mut exports.properties.cmake_file_name,
        &mut exports.properties.cmake_target_name,
    ]
    .into_iter()
    .flatten()
    {
        expand(property);
    }
    for value in exports
        .legacy
        .names
        .values_mut()
        .chain(exports.legacy.filenames.values_mut())
    {
        expand(value);
    }

    recipe
}

fn expand_table(table: &mut BTreeMap<String, ConditionalValue>, context: &HashMap<String, String>) {
    let expand_value = |value: &mut OptionValue| {
        if let OptionValue::Str(s) = value {
            *value = OptionValue::parse(&expand_string(s, context));
        }
    };

    for value in table.values_mut() {
        let mut current = Some(value);
        while let Some(value) = current {
            current = match value {
                ConditionalValue::Plain(plain) => {
                    expand_value(plain);
                    None
                }
                ConditionalValue::Conditional {
                    then, otherwise, ..
                } => {
                    expand_value(then);
                    otherwise.as_deref_mut()
                }
            };
        }
    }
}

/// Replace every `${key}` in `input` with its value from `context`
#[must_use]
pub fn expand_string(input: &str, context: &HashMap<String, String>) -> String {
    let mut result = input.to_string();
    for (key, value) in context {
        result = result.replace(&format!("${{{key}}}"), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::BuildSystemKind;

    const MINIMAL: &str = r#"
metadata:
  name: demo
facts:
  lib_version: "2.0"
  archive: "${name}-${version}.tar.gz"
options:
  shared: { values: [true, false], default: false }
sources:
  "2.0.1":
    url: "https://example.com/${archive}"
    sha256: "abc"
build:
  system: cmake
  variables:
    DEMO_VERSION: "${lib_version}"
package:
  - install
  - rmdir: lib/demo-${lib_version}
  - rm: { pattern: "*.pdb", dir: bin, when: { compiler: msvc } }
  - move: { from: "lib/demo-${lib_version}/config.h", to: "include/config.h" }
exports:
  libs: ["demo-${lib_version}"]
"#;

    #[test]
    fn test_parse_minimal_recipe() {
        let recipe = parse_recipe_from_str(MINIMAL).unwrap();
        assert_eq!(recipe.metadata.name, "demo");
        assert_eq!(recipe.build.system, BuildSystemKind::Cmake);
        assert_eq!(recipe.package.len(), 4);
        assert_eq!(recipe.package[0], PackageStep::Install);
        assert_eq!(recipe.exports.includedirs, vec!["include"]);
        assert!(recipe.sources["2.0.1"].strip_root);
        assert!(recipe.requirements.is_empty());
    }

    #[test]
    fn test_expand_variables() {
        let recipe = parse_recipe_from_str(MINIMAL).unwrap();
        let expanded = expand_variables(&recipe, "2.0.1");

        assert_eq!(
            expanded.sources["2.0.1"].url.as_slice(),
            ["https://example.com/demo-2.0.1.tar.gz"]
        );
        assert_eq!(expanded.exports.libs, vec!["demo-2.0"]);
        assert_eq!(
            expanded.package[1],
            PackageStep::Rmdir(RmdirStep::Path("lib/demo-2.0".to_string()))
        );
        assert_eq!(
            expanded.build.variables["DEMO_VERSION"],
            ConditionalValue::Plain(OptionValue::Str("2.0".to_string()))
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let content = "metadata: { name: \"\" }\nbuild: { system: meson }\n";
        let err = parse_recipe_from_str(content).unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_default_outside_domain_rejected() {
        let content = r"
metadata: { name: demo }
options:
  shared: { values: [true, false], default: maybe }
build: { system: meson }
";
        let err = parse_recipe_from_str(content).unwrap_err();
        assert!(err.to_string().contains("default 'maybe'"));
    }

    #[test]
    fn test_rule_on_undeclared_option_rejected() {
        let content = r"
metadata: { name: demo }
options:
  shared: { values: [true, false], default: false }
option_rules:
  - { remove: fPIC, when: { os: Windows } }
build: { system: meson }
";
        let err = parse_recipe_from_str(content).unwrap_err();
        assert!(err.to_string().contains("undeclared option fPIC"));
    }

    #[test]
    fn test_conditional_on_undeclared_option_rejected() {
        let content = r"
metadata: { name: demo }
build:
  system: meson
  options:
    default_library: { when: { options: { shared: true } }, then: shared, else: static }
";
        let err = parse_recipe_from_str(content).unwrap_err();
        assert!(err.to_string().contains("build.options.default_library"));
    }

    #[test]
    fn test_unknown_package_step_rejected() {
        let content = r"
metadata: { name: demo }
build: { system: meson }
package:
  - explode
";
        assert!(parse_recipe_from_str(content).is_err());
    }

    #[test]
    fn test_expand_string() {
        let context = HashMap::from([("v".to_string(), "1".to_string())]);
        assert_eq!(expand_string("a-${v}-${w}", &context), "a-1-${w}");
    }
}
