//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::{Style, Term};
use kiln_builder::{BuildReport, BuildSystemKind, Recipe, ValidatedRecipe, ValidationReport};
use kiln_builder::recipe::model::PackageType;
use kiln_types::{ColorChoice, OptionValue, PackageId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;

/// Result of a command, rendered as text or JSON
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    Build(BuildReport),
    Validate(ValidationSummary),
    Info(RecipeSummary),
}

#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub package: PackageId,
    pub options: BTreeMap<String, OptionValue>,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl From<ValidatedRecipe> for ValidationSummary {
    fn from(validated: ValidatedRecipe) -> Self {
        Self {
            package: validated.package,
            options: validated.options.to_map(),
            report: validated.report,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OptionSummary {
    pub name: String,
    pub values: Vec<String>,
    pub default: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub name: String,
    pub description: String,
    pub license: String,
    pub homepage: Option<String>,
    pub package_type: PackageType,
    pub build_system: BuildSystemKind,
    pub versions: Vec<String>,
    pub options: Vec<OptionSummary>,
    pub requires: Vec<String>,
    pub tool_requires: Vec<String>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        let metadata = &recipe.metadata;
        Self {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            license: metadata.license.clone(),
            homepage: metadata.homepage.clone(),
            package_type: metadata.package_type,
            build_system: recipe.build.system,
            versions: recipe.versions().map(ToString::to_string).collect(),
            options: recipe
                .options
                .iter()
                .map(|(name, decl)| OptionSummary {
                    name: name.clone(),
                    values: decl.values.iter().map(ToString::to_string).collect(),
                    default: decl.default.to_string(),
                })
                .collect(),
            requires: recipe
                .requirements
                .requires
                .iter()
                .map(ToString::to_string)
                .collect(),
            tool_requires: recipe
                .requirements
                .tool_requires
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Build(report) => self.render_build_report(report),
            CommandResult::Validate(summary) => self.render_validation(summary),
            CommandResult::Info(summary) => self.render_recipe_info(summary),
        }
        Ok(())
    }

    fn render_build_report(&self, report: &BuildReport) {
        println!("{}", self.style_heading(&format!("Built {}", report.package)));
        println!();
        println!("Package:    {}", report.package_dir.display());
        println!("Descriptor: {}", report.descriptor_path.display());
        println!("Source:     {}", report.source_url);
        println!("Duration:   {:.1}s", report.duration.as_secs_f64());
        if !report.info.libs.is_empty() {
            println!("Libraries:  {}", report.info.libs.join(", "));
        }
    }

    fn render_validation(&self, summary: &ValidationSummary) {
        println!(
            "{}",
            self.style_heading(&format!("{} is valid for these settings", summary.package))
        );
        println!();

        match summary.report.required_cppstd {
            Some(standard) => {
                let minimum = summary
                    .report
                    .minimum_compiler_version
                    .as_deref()
                    .map(|version| format!(" (compiler >= {version})"))
                    .unwrap_or_default();
                println!("Required C++ standard: {standard}{minimum}");
            }
            None => println!("Required C++ standard: none"),
        }
        println!();

        if summary.options.is_empty() {
            println!("No options.");
            return;
        }
        let mut table = Self::table(&["Option", "Value"]);
        for (name, value) in &summary.options {
            table.add_row(vec![Cell::new(name), Cell::new(value.to_string())]);
        }
        println!("{table}");
    }

    fn render_recipe_info(&self, summary: &RecipeSummary) {
        println!("{}", self.style_heading(&summary.name));
        println!();
        if !summary.description.is_empty() {
            println!("Description:  {}", summary.description);
        }
        if !summary.license.is_empty() {
            println!("License:      {}", summary.license);
        }
        if let Some(homepage) = &summary.homepage {
            println!("Homepage:     {homepage}");
        }
        println!("Build system: {}", kind_name(summary.build_system));
        println!("Versions:     {}", summary.versions.join(", "));
        if !summary.requires.is_empty() {
            println!("Requires:     {}", summary.requires.join(", "));
        }
        if !summary.tool_requires.is_empty() {
            println!("Tools:        {}", summary.tool_requires.join(", "));
        }

        if !summary.options.is_empty() {
            println!();
            let mut table = Self::table(&["Option", "Values", "Default"]);
            for option in &summary.options {
                table.add_row(vec![
                    Cell::new(&option.name),
                    Cell::new(option.values.join(", ")),
                    Cell::new(&option.default),
                ]);
            }
            println!("{table}");
        }
    }

    fn table(headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            headers
                .iter()
                .map(|header| Cell::new(header).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn style_heading(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn kind_name(kind: BuildSystemKind) -> &'static str {
    match kind {
        BuildSystemKind::Meson => "meson",
        BuildSystemKind::Cmake => "cmake",
    }
}
