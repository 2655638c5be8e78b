//! Coachly CLI and REST API entry point.
//!
//! Binary name: `coachly`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, CoachCommand, Commands, SessionCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = coachly_observe::tracing_setup::filter_for_verbosity(cli.verbose, cli.quiet);
    if let Err(e) = coachly_observe::tracing_setup::init_tracing(cli.otel, filter) {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    coachly_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "coachly", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match &cli.command {
        Commands::Coach { action } => {
            let user = cli.resolve_user(&state).await?;
            match action {
                CoachCommand::Create(args) => {
                    cli::coach::create_coach(&state, user, args.clone(), cli.json).await?;
                }
                CoachCommand::List { mine } => {
                    cli::coach::list_coaches(&state, user, *mine, cli.json).await?;
                }
                CoachCommand::Show { id } => {
                    cli::coach::show_coach(&state, user, id, cli.json).await?;
                }
                CoachCommand::Delete { id, force } => {
                    cli::coach::delete_coach(&state, user, id, *force, cli.json).await?;
                }
            }
        }

        Commands::Session { action } => {
            let user = cli.resolve_user(&state).await?;
            match action {
                SessionCommand::Begin { coach, kind, recap } => {
                    cli::session::begin_session(&state, user, coach, *kind, *recap, cli.json).await?;
                }
                SessionCommand::End { id } => {
                    cli::session::end_session(&state, user, id, cli.json).await?;
                }
                SessionCommand::List { kind } => {
                    cli::session::list_sessions(&state, user, *kind, cli.json).await?;
                }
                SessionCommand::Show { id } => {
                    cli::session::show_session(&state, user, id, cli.json).await?;
                }
            }
        }

        Commands::Chat { conversation } => {
            let user = cli.resolve_user(&state).await?;
            cli::chat::run_chat(&state, user, cli.entitlement(), conversation).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "api server listening");

            println!(
                "  {} Coachly API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let sweeper = state.spawn_sweeper();
            let router = http::router::build_router(state);
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await;
            sweeper.abort();
            served?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
