//! Rowlift Server - Main entry point

use std::sync::Arc;

use anyhow::Result;
use apalis_postgres::PostgresStorage;
use rowlift_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use rowlift_server::{
    config::Config,
    db,
    import::{ApalisQueue, JobQueue, JobScheduler, ModuleRegistry, WorkerContext},
    modules::ContactsModule,
    storage::{config::StorageConfig, FileStorage, S3Storage},
    store::{PgFailedRowStore, PgImportFileStore, PgImportRecordStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("rowlift-server".to_string())
        .filter_directives("rowlift_server=debug,sqlx=info".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Rowlift Server");

    // Load configuration
    let config = Config::load()?;

    // Initialize database connection pool
    let pool = db::create_pool(&config.database).await?;

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Initialize S3/MinIO storage
    let storage_config = StorageConfig::from_env()?;
    let storage: Arc<dyn FileStorage> = Arc::new(S3Storage::new(storage_config));
    info!("Storage client initialized");

    // Set up the apalis queue schema and job storages
    PostgresStorage::setup(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up job queue schema: {}", e))?;

    let imports = PostgresStorage::new(&pool);
    let reports = PostgresStorage::new(&pool);
    let queue: Arc<dyn JobQueue> = Arc::new(ApalisQueue::new(imports.clone(), reports.clone()));

    // Register import modules
    let modules = Arc::new(ModuleRegistry::new().register(Arc::new(ContactsModule::new(pool.clone()))));
    info!(modules = modules.len(), "Import modules registered");

    let ctx = Arc::new(WorkerContext {
        records: Arc::new(PgImportRecordStore::new(pool.clone())),
        failed_rows: Arc::new(PgFailedRowStore::new(pool.clone())),
        files: Arc::new(PgImportFileStore::new(pool.clone())),
        storage,
        queue,
        modules,
        max_task_duration_secs: config.import.max_task_duration_secs,
    });

    let scheduler = JobScheduler::new(ctx, imports, reports, config.import.worker_count);

    tokio::select! {
        result = scheduler.run() => result?,
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping workers");
        },
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
