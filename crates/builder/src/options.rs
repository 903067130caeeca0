//! Effective option set computation
//!
//! The effective set is computed once per invocation, in four steps:
//! declared defaults, settings-only pruning rules, user values, then
//! value-dependent pruning. A pruned option is absent from the set rather
//! than false.

use crate::recipe::model::Recipe;
use kiln_errors::ConfigurationError;
use kiln_events::{EventEmitter, EventSender};
use kiln_types::{OptionValue, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The effective options of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet {
    values: BTreeMap<String, OptionValue>,
}

impl OptionSet {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// True only when the option is present and set to `True`
    #[must_use]
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, OptionValue> {
        self.values.clone()
    }
}

impl FromIterator<(String, OptionValue)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Builds the effective option set for a recipe and settings bundle
pub struct OptionSetBuilder<'a> {
    recipe: &'a Recipe,
    settings: &'a Settings,
    user_values: BTreeMap<String, OptionValue>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for OptionSetBuilder<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl<'a> OptionSetBuilder<'a> {
    #[must_use]
    pub fn new(recipe: &'a Recipe, settings: &'a Settings) -> Self {
        Self {
            recipe,
            settings,
            user_values: BTreeMap::new(),
            event_sender: None,
        }
    }

    /// Set event sender for pruned-option warnings
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: Option<EventSender>) -> Self {
        self.event_sender = event_sender;
        self
    }

    /// Record a user value; later values override earlier ones
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.user_values.insert(name.into(), value);
        self
    }

    /// Record several user values
    #[must_use]
    pub fn values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (String, OptionValue)>,
    {
        self.user_values.extend(values);
        self
    }

    /// Compute the effective option set
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownOption` for a user value naming an
    /// undeclared option, and `ConfigurationError::InvalidOptionValue` for a
    /// value outside the declared domain.
    pub fn build(&self) -> Result<OptionSet, ConfigurationError> {
        let mut values: BTreeMap<String, OptionValue> = self
            .recipe
            .options
            .iter()
            .map(|(name, decl)| (name.clone(), decl.default.clone()))
            .collect();

        for rule in self
            .recipe
            .option_rules
            .iter()
            .filter(|rule| rule.is_platform_rule())
        {
            if rule.when.matches_settings(self.settings) {
                values.remove(&rule.remove);
            }
        }

        for (name, value) in &self.user_values {
            let decl =
                self.recipe
                    .options
                    .get(name)
                    .ok_or_else(|| ConfigurationError::UnknownOption {
                        name: name.clone(),
                    })?;

            if !decl.allows(value) {
                return Err(ConfigurationError::InvalidOptionValue {
                    name: name.clone(),
                    value: value.to_string(),
                    allowed: decl.domain(),
                });
            }

            match values.get_mut(name) {
                Some(slot) => *slot = value.clone(),
                None => self.emit_warning(format!(
                    "option {name}={value} ignored: the option does not apply to {} builds",
                    self.settings.os
                )),
            }
        }

        let mut set = OptionSet { values };
        for rule in self
            .recipe
            .option_rules
            .iter()
            .filter(|rule| !rule.is_platform_rule())
        {
            if rule.when.matches(self.settings, &set) {
                set.values.remove(&rule.remove);
            }
        }

        Ok(set)
    }
}

/// Parse a `name=value` option pair
///
/// A leading `<package>:` scope is accepted and stripped when it names the
/// recipe or is `*`.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidOptionValue` when the pair has no `=`.
pub fn parse_option_pair(
    pair: &str,
    package: &str,
) -> Result<Option<(String, OptionValue)>, ConfigurationError> {
    let (key, value) =
        pair.split_once('=')
            .ok_or_else(|| ConfigurationError::InvalidOptionValue {
                name: pair.to_string(),
                value: String::new(),
                allowed: "name=value".to_string(),
            })?;

    let key = match key.trim().split_once(':') {
        Some((scope, name)) => {
            let scope = scope.trim_end_matches("/*");
            if scope != "*" && scope != package {
                return Ok(None);
            }
            name
        }
        None => key,
    };

    Ok(Some((key.trim().to_string(), OptionValue::parse(value))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::parse_recipe_from_str;

    const RECIPE: &str = r"
metadata: { name: demo }
options:
  shared: { values: [true, false], default: false }
  fPIC: { values: [true, false], default: true }
  flavor: { values: [plain, fancy], default: plain }
option_rules:
  - { remove: fPIC, when: { os: Windows } }
  - { remove: fPIC, when: { options: { shared: true } } }
build: { system: meson }
";

    fn settings(os: &str) -> Settings {
        let mut builder = Settings::builder();
        builder
            .set("os", os)
            .unwrap()
            .set("arch", "x86_64")
            .unwrap()
            .set("compiler", "gcc")
            .unwrap()
            .set("compiler.version", "13")
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_defaults() {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let settings = settings("Linux");
        let set = OptionSetBuilder::new(&recipe, &settings).build().unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("shared"), Some(&OptionValue::Bool(false)));
        assert!(set.is_true("fPIC"));
    }

    #[test]
    fn test_shared_removes_fpic() {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let settings = settings("Linux");
        let set = OptionSetBuilder::new(&recipe, &settings)
            .value("shared", OptionValue::Bool(true))
            .build()
            .unwrap();

        assert!(set.is_true("shared"));
        assert!(!set.contains("fPIC"));
    }

    #[test]
    fn test_platform_rule_and_ignored_user_value() {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let settings = settings("Windows");
        let (tx, mut rx) = kiln_events::channel();
        let set = OptionSetBuilder::new(&recipe, &settings)
            .with_event_sender(Some(tx))
            .value("fPIC", OptionValue::Bool(false))
            .build()
            .unwrap();

        assert!(!set.contains("fPIC"));
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            kiln_events::AppEvent::General(kiln_events::GeneralEvent::Warning { .. })
        ));
    }

    #[test]
    fn test_unknown_option() {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let settings = settings("Linux");
        let err = OptionSetBuilder::new(&recipe, &settings)
            .value("with_docs", OptionValue::Bool(true))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownOption { .. }));
    }

    #[test]
    fn test_value_outside_domain() {
        let recipe = parse_recipe_from_str(RECIPE).unwrap();
        let settings = settings("Linux");
        let err = OptionSetBuilder::new(&recipe, &settings)
            .value("flavor", OptionValue::parse("spicy"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidOptionValue { .. }));
    }

    #[test]
    fn test_parse_option_pair() {
        assert_eq!(
            parse_option_pair("shared=True", "demo").unwrap(),
            Some(("shared".to_string(), OptionValue::Bool(true)))
        );
        assert_eq!(
            parse_option_pair("demo/*:shared=False", "demo").unwrap(),
            Some(("shared".to_string(), OptionValue::Bool(false)))
        );
        assert_eq!(parse_option_pair("other:shared=True", "demo").unwrap(), None);
        assert!(parse_option_pair("shared", "demo").is_err());
    }
}
