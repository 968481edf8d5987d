//! HTTP server wiring for the rental service

use crate::{
    api,
    config::{Config, StorageBackend},
    domain::{
        Clock, CustomerService, FleetService, RentalEngine, RiskClassifier,
        RuleBasedRiskClassifier,
    },
    error::{RentalError, Result},
    storage::{seed_demo_data, MemoryStore, PgStore, RentalStore},
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RentalStore>,
    pub clock: Arc<dyn Clock>,
    pub customers: Arc<CustomerService>,
    pub fleet: Arc<FleetService>,
    pub rentals: Arc<RentalEngine>,
    pub risk: Arc<dyn RiskClassifier>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RentalStore>, clock: Arc<dyn Clock>) -> Self {
        let risk = Arc::new(RuleBasedRiskClassifier::new(config.risk.young_rider_age));
        Self::with_classifier(config, store, clock, risk)
    }

    pub fn with_classifier(
        config: Config,
        store: Arc<dyn RentalStore>,
        clock: Arc<dyn Clock>,
        risk: Arc<dyn RiskClassifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            customers: Arc::new(CustomerService::new(store.clone(), clock.clone())),
            fleet: Arc::new(FleetService::new(store.clone())),
            rentals: Arc::new(RentalEngine::new(store.clone(), clock.clone())),
            store,
            clock,
            risk,
        }
    }
}

/// Open the configured backend, migrating and seeding as configured
pub async fn open_store(config: &Config) -> Result<Arc<dyn RentalStore>> {
    let store: Arc<dyn RentalStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let store = PgStore::connect(config).await?;
            store.run_migrations().await?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    if config.service.seed_demo_data {
        seed_demo_data(store.as_ref()).await?;
    }

    Ok(store)
}

/// Application router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(api::routes::health::health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .with_state(state.clone());

    api::middleware::apply_middleware(app, &state)
}

pub struct Server {
    config: Arc<Config>,
    app: Router,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        info!(
            "Initializing rental server ({} environment)",
            state.config.service.environment
        );
        Self {
            config: state.config.clone(),
            app: build_router(state),
        }
    }

    /// Run the server until shutdown signal
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_address()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RentalError::Configuration {
                message: format!("Failed to bind to address {addr}: {e}"),
            })?;

        info!("Rental service listening on {}", addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RentalError::Configuration {
                message: format!("Server error: {e}"),
            })?;

        info!("Rental service stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}
