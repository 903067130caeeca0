//! High-level build orchestration
//!
//! One `build` call runs one recipe invocation through the pipeline:
//! validate, acquire sources, configure, build, package, export. Phases run
//! one after the other on the calling task.

use super::context::{BuildRequest, BuilderConfig, PackageLayout};
use super::pipeline::{Pipeline, PipelineState};
use crate::build_systems::{build_system_for, BuildSystemContext, ToolchainSpec};
use crate::dependencies::{check_requirements, generate_dependency_files, load_dependencies};
use crate::environment::BuildEnvironment;
use crate::export::PackageInfo;
use crate::options::{OptionSet, OptionSetBuilder};
use crate::packaging::Packager;
use crate::recipe::model::{resolve_table, PackageStep, Recipe};
use crate::recipe::parser::{expand_variables, parse_recipe};
use crate::source::{apply_source_edits, SourceAcquirer};
use crate::validation::{ValidationReport, Validator};
use chrono::{DateTime, Utc};
use kiln_errors::Error;
use kiln_events::{AppEvent, BuildEvent, BuildPhase, EventEmitter, EventSender, FailureContext};
use kiln_net::NetClient;
use kiln_types::{parse_loose, PackageId};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Result of a successful invocation
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub package: PackageId,
    pub package_dir: PathBuf,
    pub descriptor_path: PathBuf,
    pub info: PackageInfo,
    /// URL the sources came from
    pub source_url: String,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

/// A recipe that passed validation for one settings bundle
#[derive(Debug, Clone)]
pub struct ValidatedRecipe {
    /// Recipe with `${...}` references expanded
    pub recipe: Recipe,
    pub package: PackageId,
    pub options: OptionSet,
    pub report: ValidationReport,
}

/// Event and state bookkeeping of one invocation
struct Session {
    id: String,
    package: PackageId,
    pipeline: Pipeline,
    event_sender: Option<EventSender>,
}

impl EventEmitter for Session {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Session {
    /// Run one phase and advance the pipeline to `next` on success
    async fn phase<T, F>(&mut self, next: PipelineState, work: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let phase = next
            .reached_by()
            .ok_or_else(|| Error::internal(format!("no phase reaches {next}")))?;

        self.emit_phase_started(&self.id, self.package.to_string(), phase);
        let started = Instant::now();

        match work.await.and_then(|value| self.pipeline.advance(next).map(|()| value)) {
            Ok(value) => {
                self.emit_phase_completed(
                    &self.id,
                    self.package.to_string(),
                    phase,
                    started.elapsed(),
                );
                Ok(value)
            }
            Err(err) => {
                self.pipeline.fail(phase);
                self.emit(AppEvent::Build(BuildEvent::SessionFailed {
                    session_id: self.id.clone(),
                    package: self.package.name.clone(),
                    version: self.package.version.clone(),
                    phase: Some(phase),
                    failure: FailureContext::from_error(&err),
                }));
                Err(err.in_phase(phase.as_str()))
            }
        }
    }
}

/// Package builder
#[derive(Clone, Default)]
pub struct Builder {
    config: BuilderConfig,
    net: Option<NetClient>,
}

impl Builder {
    /// Create new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create builder with configuration
    #[must_use]
    pub fn with_config(config: BuilderConfig) -> Self {
        Self { config, net: None }
    }

    /// Set network client
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    fn net_client(&self) -> Result<NetClient, Error> {
        match &self.net {
            Some(client) => Ok(client.clone()),
            None => NetClient::new(&self.config.net),
        }
    }

    /// Load a recipe and compute the effective options for a request,
    /// then validate them
    ///
    /// Nothing is fetched or written.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipe cannot be parsed, the user options are
    /// invalid, or the settings violate the recipe's compatibility rules.
    pub async fn validate_only(&self, request: &BuildRequest) -> Result<ValidatedRecipe, Error> {
        let recipe = parse_recipe(&request.recipe_path).await?;
        let recipe = expand_variables(&recipe, &request.version);
        let package = PackageId::new(&recipe.metadata.name, &request.version);
        let (options, report) = validate(&recipe, &package, request)?;
        Ok(ValidatedRecipe {
            recipe,
            package,
            options,
            report,
        })
    }

    /// Build a package from a recipe
    ///
    /// # Errors
    ///
    /// Returns `Error::PhaseFailed` naming the failed phase, wrapping the
    /// recipe, configuration, acquisition, build or packaging error.
    pub async fn build(&self, request: BuildRequest) -> Result<BuildReport, Error> {
        let started = Instant::now();

        let recipe = parse_recipe(&request.recipe_path)
            .await
            .map_err(|e| e.in_phase(BuildPhase::Validate.as_str()))?;
        let recipe = expand_variables(&recipe, &request.version);
        let package = PackageId::new(&recipe.metadata.name, &request.version);
        let layout = PackageLayout::new(&request.workspace, &package);

        let mut session = Session {
            id: kiln_events::new_session_id(),
            package: package.clone(),
            pipeline: Pipeline::new(),
            event_sender: request.event_sender.clone(),
        };
        session.emit(AppEvent::Build(BuildEvent::SessionStarted {
            session_id: session.id.clone(),
            package: package.name.clone(),
            version: package.version.clone(),
            build_system: recipe.build.system.event_kind(),
        }));

        if recipe.requirements.is_empty() {
            session.emit_warning(format!("{package}: recipe declares no requirements"));
        }

        let (options, _report) = session
            .phase(PipelineState::Validated, async {
                validate(&recipe, &package, &request)
            })
            .await?;

        let env = BuildEnvironment::new(session.id.clone(), package.to_string())
            .with_tools(self.config.tools.clone())
            .with_event_sender(request.event_sender.clone());
        let settings = &request.settings;

        let acquired = session
            .phase(PipelineState::SourceReady, async {
                layout.prepare(self.config.clean_build_dir).await?;
                let client = self.net_client()?;
                let recipe_dir = request.recipe_dir();
                SourceAcquirer::new(&recipe, &package, &recipe_dir, &client, &env)?
                    .with_checksum_required(self.config.require_checksums)
                    .acquire(&layout)
                    .await
            })
            .await?;

        let build_system = build_system_for(recipe.build.system);
        let ctx = BuildSystemContext::new(
            env.clone(),
            layout.source_dir.clone(),
            layout.build_dir.clone(),
        )
        .with_package_dir(layout.package_dir.clone())
        .with_generators_dir(layout.generators_dir())
        .with_jobs(resolve_jobs(request.jobs, self.config.jobs))
        .with_cmake_generator(self.config.cmake_generator.clone())
        .with_build_type(settings.build_type.as_str());

        session
            .phase(PipelineState::Configured, async {
                apply_source_edits(
                    &env,
                    &recipe.build.source_edits,
                    &layout.source_dir,
                    settings,
                    &options,
                )
                .await?;

                let dependencies = load_dependencies(&request.dependency_dirs).await?;
                for problem in check_requirements(&recipe.requirements, &dependencies) {
                    env.emit_warning_with_context(format!("{package}: {problem}"), "dependencies");
                }
                generate_dependency_files(&dependencies, &ctx.generators_dir).await?;

                let spec = ToolchainSpec {
                    settings: settings.clone(),
                    options: options.clone(),
                    project_options: resolve_table(&recipe.build.options, settings, &options),
                    variables: resolve_table(&recipe.build.variables, settings, &options),
                    package_dir: layout.package_dir.clone(),
                    deps_dir: ctx.generators_dir.clone(),
                };
                let toolchain = build_system.generate(&ctx, &spec).await?;
                env.emit_debug(format!("Wrote {}", toolchain.display()));

                build_system.configure(&ctx).await
            })
            .await?;

        session
            .phase(PipelineState::Built, build_system.build(&ctx))
            .await?;

        let steps = if recipe.package.is_empty() {
            vec![PackageStep::Install]
        } else {
            recipe.package.clone()
        };
        session
            .phase(PipelineState::Packaged, async {
                Packager::new(&layout, settings, &options, &env)
                    .with_installer(build_system.as_ref(), &ctx)
                    .run(&steps)
                    .await
            })
            .await?;

        let info = PackageInfo::from_recipe(&recipe, &package, &options, settings);
        let descriptor_path = session
            .phase(PipelineState::Exported, info.write(&layout.package_dir))
            .await?;

        let duration = started.elapsed();
        session.emit(AppEvent::Build(BuildEvent::SessionCompleted {
            session_id: session.id.clone(),
            package: package.name.clone(),
            version: package.version.clone(),
            package_dir: layout.package_dir.clone(),
            duration,
        }));

        Ok(BuildReport {
            package,
            package_dir: layout.package_dir,
            descriptor_path,
            info,
            source_url: acquired.url,
            duration,
            finished_at: Utc::now(),
        })
    }
}

/// Effective options plus compatibility validation
fn validate(
    recipe: &Recipe,
    package: &PackageId,
    request: &BuildRequest,
) -> Result<(OptionSet, ValidationReport), Error> {
    let options = OptionSetBuilder::new(recipe, &request.settings)
        .with_event_sender(request.event_sender.clone())
        .values(request.options.iter().cloned())
        .build()?;
    let version = parse_loose(&package.version)?;
    let report = Validator::new(recipe, package, &version).validate(&request.settings, &options)?;
    Ok((options, report))
}

/// Job count for one build; a requested 0 picks the automatic count
fn resolve_jobs(requested: Option<usize>, configured: usize) -> usize {
    requested.map_or(configured, kiln_config::calculate_build_jobs)
}
