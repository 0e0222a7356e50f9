//! Academy-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use academy_api::{AppState, app};
use academy_common::Config;
use academy_core::{
    DbCourseCatalog, DbEnrollmentStore, EnrollmentService, NotificationDispatcher,
    NotificationService, SessionIdVerifier, UserService,
};
use academy_db::repositories::{
    CourseRepository, EnrollmentRepository, LessonRepository, NotificationRepository,
    UserRepository,
};
use anyhow::Context;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting academy-rs server...");

    let config = Config::load().context("Failed to load configuration")?;

    let db = academy_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    academy_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let course_repo = CourseRepository::new(Arc::clone(&db));
    let lesson_repo = LessonRepository::new(Arc::clone(&db));
    let enrollment_repo = EnrollmentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Initialize services
    let user_service = UserService::new(user_repo);
    let notification_service = NotificationService::new(notification_repo);

    let (dispatcher, worker) =
        NotificationDispatcher::from_config(Arc::new(notification_service.clone()), &config.dispatch);
    let worker_handle = worker.map(|worker| {
        info!(
            workers = config.dispatch.workers,
            queue_capacity = config.dispatch.queue_capacity,
            "Starting background notification dispatch"
        );
        worker.start()
    });

    let enrollment_service = EnrollmentService::new(
        Arc::new(DbEnrollmentStore::new(enrollment_repo, course_repo.clone())),
        Arc::new(DbCourseCatalog::new(course_repo, lesson_repo)),
        Arc::new(SessionIdVerifier),
        dispatcher,
    );

    let state = AppState {
        user_service,
        enrollment_service,
        notification_service,
    };

    let app = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last dispatcher; the worker drains what is queued and exits
    if let Some(handle) = worker_handle {
        info!("Waiting for queued notifications...");
        if let Err(e) = handle.await {
            error!(error = %e, "Dispatch worker panicked");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
