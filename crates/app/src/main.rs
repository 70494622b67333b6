use std::net::SocketAddr;

use anyhow::{Context, Result};
use app::config::{Cli, Command, SeedArgs, ServeArgs};
use app::{router, seed, telemetry};
use clap::Parser;
use services::{AppServices, Clock, PasswordHasher};
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;
use tokio::net::TcpListener;

async fn run_serve(args: ServeArgs) -> Result<()> {
    let db_url = args.db.prepared_url()?;
    let auth = args.secrets.auth_settings();
    let services = AppServices::new_sqlite(&db_url, Clock::system(), &auth)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    let addr = SocketAddr::new(args.host, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(local_addr = %listener.local_addr()?, db = %db_url, "MathWrks server running");

    axum::serve(listener, router(services))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn run_seed(args: SeedArgs) -> Result<()> {
    let db_url = args.db.prepared_url()?;
    let repo = SqliteRepository::connect(&db_url).await?;
    repo.migrate().await?;
    repo.clear_all().await?;

    let storage = Storage::from_repository(repo);
    let report = seed::load(
        &storage,
        seed::bundled_catalog()?,
        &PasswordHasher::default(),
        Clock::system(),
    )
    .await?;

    tracing::info!(
        db = %db_url,
        modules = report.modules,
        concepts = report.concepts,
        questions = report.questions,
        puzzles = report.puzzles,
        students = report.students,
        "database seeded"
    );
    tracing::info!("default teacher login: username=\"teacher\", password=\"teacherpass\"");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = &err as &dyn std::error::Error, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Seed(args) => run_seed(args).await,
    }
}
