//! kiln - Build C/C++ packages from declarative recipes
//!
//! This is the CLI front end: it resolves settings and options from
//! profiles and flags, drives the builder and renders its events.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod profile;

use crate::cli::{Cli, Commands, RequestArgs};
use crate::display::{CommandResult, OutputRenderer, RecipeSummary, ValidationSummary};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use kiln_builder::{parse_recipe, BuildRequest, Builder, BuilderConfig};
use kiln_config::Config;
use kiln_events::{EventReceiver, EventSender};
use kiln_types::{ColorChoice, OutputFormat};
use std::path::PathBuf;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting kiln v{}", env!("CARGO_PKG_VERSION"));

    // 1. File config (or defaults), 2. environment, 3. CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli);

    let json_output = cli.global.json || config.general.default_output == OutputFormat::Json;
    let color = config.general.color;
    let renderer = OutputRenderer::new(json_output, color);

    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_output);

    let (event_sender, event_receiver) = kiln_events::channel();

    let result = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Apply CLI configuration overrides
fn apply_cli_config(config: &mut Config, cli: &Cli) {
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }
    if let Commands::Build {
        jobs: Some(jobs), ..
    } = &cli.command
    {
        config.build.jobs = *jobs;
    }
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));
    let mut channel_open = true;

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv(), if channel_open => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => channel_open = false,
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    let builder = Builder::with_config(BuilderConfig::from(&config));

    match command {
        Commands::Build {
            request,
            workspace,
            deps,
            jobs,
        } => {
            let workspace = workspace.unwrap_or_else(|| config.workspace_path());
            let mut build_request = build_request(&request, workspace, event_sender).await?;
            build_request = build_request.with_jobs(jobs);
            for dir in deps {
                if !dir.is_dir() {
                    return Err(CliError::InvalidArguments(format!(
                        "dependency folder {} does not exist",
                        dir.display()
                    )));
                }
                build_request = build_request.with_dependency_dir(dir);
            }

            let report = builder.build(build_request).await?;
            Ok(CommandResult::Build(report))
        }

        Commands::Validate { request } => {
            let build_request =
                build_request(&request, config.workspace_path(), event_sender).await?;
            let validated = builder.validate_only(&build_request).await?;
            Ok(CommandResult::Validate(ValidationSummary::from(validated)))
        }

        Commands::Info { recipe } => {
            let recipe = parse_recipe(&recipe).await?;
            Ok(CommandResult::Info(RecipeSummary::from(&recipe)))
        }
    }
}

/// Resolve a request's settings and options against its recipe
async fn build_request(
    args: &RequestArgs,
    workspace: PathBuf,
    event_sender: EventSender,
) -> Result<BuildRequest, CliError> {
    // Scoped options (`-o name:opt=value`) need the recipe name
    let recipe = parse_recipe(&args.recipe).await?;
    let inputs = profile::resolve_inputs(args, &recipe.metadata.name).await?;

    Ok(BuildRequest::new(
        &args.recipe,
        &args.package_version,
        inputs.settings,
        workspace,
    )
    .with_options(inputs.options)
    .with_event_sender(event_sender))
}

/// Initialize tracing/logging
///
/// Logs go to stderr so stdout stays reserved for results. JSON mode
/// switches the formatter to JSON lines.
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug,kiln=debug"
    } else {
        "warn,kiln=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(debug_enabled)
            .init();
    }
}
