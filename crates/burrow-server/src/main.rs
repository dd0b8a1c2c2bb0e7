//! Burrow - personal file server with WebDAV and a JSON file API

use burrow_server::{
    bootstrap, modules::default_registry, routes::create_router, run_server, setup::TerminalPrompter,
    BootstrapPaths, Bootstrapped, ServerOptions,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "burrowd")]
#[command(about = "Personal file server with WebDAV and a JSON file API")]
#[command(version)]
struct Args {
    /// Path of the JSON config file
    #[arg(short, long, default_value = "./config.json", env = "BURROW_CONFIG")]
    config: PathBuf,

    /// Path of the JSON credential file
    #[arg(short, long, default_value = "./auth.json", env = "BURROW_AUTH")]
    auth: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "BURROW_HOST")]
    host: String,

    /// Disable the access log
    #[arg(long)]
    no_access_log: bool,

    /// Disable static asset serving
    #[arg(long)]
    no_static: bool,

    /// Enable debug logging
    #[arg(short, long, env = "BURROW_DEBUG")]
    debug: bool,
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let log_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("burrow_server={log_level},tower_http={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(args.debug) {
        eprintln!("failed to initialize logging: {e}");
    }

    let paths = BootstrapPaths {
        config: args.config,
        auth: args.auth,
    };
    let options = ServerOptions {
        host: args.host,
        access_log: !args.no_access_log,
        serve_static: !args.no_static,
        ..Default::default()
    };

    // Prompts run here, before the listener exists.
    let Ok(Bootstrapped {
        context,
        router,
        modules,
        private_paths,
        ..
    }) = bootstrap(&paths, &mut TerminalPrompter, &default_registry())
    else {
        return ExitCode::from(1);
    };

    let app = match create_router(router, &context.config, &modules, &private_paths, &options) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to mount runtime routes");
            return ExitCode::from(1);
        }
    };

    let addr = options.bind_addr(context.config.port);
    match run_server(app, &addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::from(2)
        }
    }
}
