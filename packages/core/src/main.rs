use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use elkkana_portal::app::{CommandError, Portal};
use elkkana_portal::cli::Cli;
use elkkana_portal::config::{Config, DeployMode};
use elkkana_portal::handler::{ErrorHandler, RawError};
use elkkana_portal::logging::init_logging;
use elkkana_portal::metrics::PortalMetrics;
use elkkana_portal::navigation::{RecordingNavigator, Route};
use elkkana_portal::remote::AppwriteClient;
use elkkana_portal::services::Services;
use elkkana_portal::session::FileSessionStorage;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(DeployMode::detect().default_log_level());

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(project) = cli.project {
        config.project_id = project;
    }
    tracing::debug!("Loaded config: {:?}", config);

    let metrics = match PortalMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(err) => {
            tracing::error!("Failed to register metrics: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let session = match FileSessionStorage::open(&config.session_file) {
        Ok(session) => Arc::new(session),
        Err(err) => {
            tracing::error!("Failed to open session file {:?}: {}", config.session_file, err);
            return ExitCode::FAILURE;
        }
    };
    let navigator = Arc::new(RecordingNavigator::new(Route::Home));
    let handler = Arc::new(
        ErrorHandler::from_config(&config, session.clone(), navigator.clone())
            .with_metrics(metrics.clone()),
    );

    let client = match AppwriteClient::from_config(&config, session) {
        Ok(client) => client.with_metrics(metrics.clone()),
        Err(err) => {
            let error = handler.handle(RawError::from(err)).await;
            eprintln!("{}", error.message());
            return ExitCode::FAILURE;
        }
    };

    let services = Services::from_config(Arc::new(client), &config);
    let portal = Portal::new(services, handler, navigator);
    portal.store().initialize().await;

    let status = match portal.execute(cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(CommandError::InvalidInput(errors)) => {
            for (field, message) in errors {
                eprintln!("{}: {}", field, message);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    };

    if cli.print_metrics {
        match metrics.render() {
            Ok(text) => print!("{}", text),
            Err(err) => tracing::error!("Failed to render metrics: {}", err),
        }
    }

    status
}
