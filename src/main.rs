//! webpilot - browser workflow engine with self-healing selectors
//!
//! Main entry point for the webpilot CLI and HTTP server.

mod bootstrap;
mod cli;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webpilot_api::{ApiServer, AppState};
use webpilot_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use webpilot_engine::{NodeRegistry, WorkflowGraph};
use webpilot_recovery::{analyze, analyze_with_dom, FixContext};

use bootstrap::{build_engine, build_recovery, load_page, load_workflow, BoxError};
use cli::{Cli, Commands};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console layer on stderr plus a daily-rotated file layer.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(config: &LoggingConfig) -> Result<(), BoxError> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("webpilot")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (json_file, text_file) = if config.json {
        (Some(fmt::layer().json().with_writer(non_blocking)), None)
    } else {
        (None, Some(fmt::layer().with_writer(non_blocking).with_ansi(false)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(json_file)
        .with(text_file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging)?;

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Run { host, port }) => run_server(config, host, port).await,
        Some(Commands::Validate { workflow }) => validate(&workflow),
        Some(Commands::Analyze {
            workflow,
            error,
            node,
            dom,
            url,
        }) => analyze_error(&workflow, &error, node.as_deref(), dom.as_deref(), url.as_deref()),
        Some(Commands::Fix {
            workflow,
            error,
            dom,
            url,
            output,
        }) => fix(&config, &workflow, &error, dom.as_deref(), url.as_deref(), output.as_deref()).await,
        Some(Commands::CheckConfig) => check_config(&config),
    }
}

/// Run the HTTP server until Ctrl-C.
async fn run_server(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<(), BoxError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!(path = %err.path, "{}", err.message);
        }
        return Err("Invalid configuration".into());
    }

    info!("Starting webpilot v{}", env!("CARGO_PKG_VERSION"));
    let engine = Arc::new(build_engine(&config)?);
    let recovery = Arc::new(build_recovery(&config, engine.registry()));
    info!(
        driver = engine.driver().id(),
        node_types = engine.registry().len(),
        strategies = ?recovery.strategy_names(),
        "Engine ready"
    );

    let state = Arc::new(AppState::new(engine, recovery));
    let server = ApiServer::new(config.server.clone(), state);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| -> BoxError { e.to_string().into() })?;

    info!("webpilot stopped");
    Ok(())
}

fn validate(path: &Path) -> Result<(), BoxError> {
    let workflow = load_workflow(path)?;
    let registry = NodeRegistry::with_builtins();
    let graph = WorkflowGraph::build(workflow, &registry)?;
    println!(
        "{}: valid ({} nodes, {} edges)",
        path.display(),
        graph.len(),
        graph.workflow().edges.len()
    );
    Ok(())
}

fn analyze_error(
    path: &Path,
    error: &str,
    node: Option<&str>,
    dom: Option<&Path>,
    url: Option<&str>,
) -> Result<(), BoxError> {
    let workflow = load_workflow(path)?;
    let analyses = match (dom, url) {
        (Some(dom), Some(url)) => {
            let page = load_page(dom, url)?;
            analyze_with_dom(&workflow, error, &[], node, &page)
        }
        _ => analyze(&workflow, error, &[], node),
    };
    println!("{}", serde_json::to_string_pretty(&analyses)?);
    Ok(())
}

async fn fix(
    config: &Config,
    path: &Path,
    error: &str,
    dom: Option<&Path>,
    url: Option<&str>,
    output: Option<&Path>,
) -> Result<(), BoxError> {
    let workflow = load_workflow(path)?;
    let mut ctx = FixContext::new().with_error_message(error);
    let analyses = match (dom, url) {
        (Some(dom), Some(url)) => {
            let page = load_page(dom, url)?;
            let analyses = analyze_with_dom(&workflow, error, &[], None, &page);
            ctx = ctx.with_snapshot(page);
            analyses
        }
        _ => analyze(&workflow, error, &[], None),
    };

    let recovery = build_recovery(config, &NodeRegistry::with_builtins());
    let report = recovery.try_fix(&workflow, &analyses, &ctx).await?;
    match output {
        Some(out) => {
            std::fs::write(out, serde_json::to_string_pretty(&report.workflow)?)?;
            info!(path = %out.display(), strategy = ?report.strategy, "Repaired workflow written");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn check_config(config: &Config) -> Result<(), BoxError> {
    let validation = ConfigValidator::validate(config);
    for warning in &validation.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for err in &validation.errors {
        println!("error: {}: {}", err.path, err.message);
    }
    if !validation.is_valid() {
        return Err(format!("{} configuration error(s)", validation.errors.len()).into());
    }

    let mut shown = config.clone();
    if shown.llm.api_key.is_some() {
        shown.llm.api_key = Some("********".to_string());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
