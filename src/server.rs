//! Reusable service runtime.
//!
//! [`ServerHandle`] wraps the full lifecycle: storage init, migrations,
//! optional demo seeding, the expiry reclaimer, the REST API, metrics and
//! graceful shutdown. The CLI binary and the integration tests both use it.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use chrono::{Duration, NaiveTime};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    ExpiryReclaimer, PaymentOracle, PaymentService, ReservationCoordinator, ShowingCatalog,
    SimulatedPaymentOracle,
};
use crate::config::AppConfig;
use crate::domain::{DomainResult, NewShowing, SeatLayout, ShowingId, UnitOfWork};
use crate::infrastructure::{database, InMemoryStore, SeaOrmUnitOfWork};
use crate::interfaces::http::modules::metrics::describe_metrics;
use crate::interfaces::http::{create_api_router, ApiState};
use crate::shared::clock::{SharedClock, SystemClock};
use crate::shared::retry::RetryConfig;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub const DEMO_SHOWING_ID: &str = "demo-showing";

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Seed a demo showing when the store has none.
    pub seed_demo: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            seed_demo: false,
        }
    }
}

// ── Services ───────────────────────────────────────────────────────

/// The application services wired over one storage backend.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<ShowingCatalog>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub payments: Arc<PaymentService>,
    pub reclaimer: Arc<ExpiryReclaimer>,
    pub clock: SharedClock,
}

impl Services {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: SharedClock,
        oracle: Arc<dyn PaymentOracle>,
        config: &AppConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(ShowingCatalog::new(uow.clone())),
            coordinator: Arc::new(ReservationCoordinator::new(
                uow.clone(),
                clock.clone(),
                config.reservation_policy(),
            )),
            payments: Arc::new(PaymentService::new(uow.clone(), clock.clone(), oracle)),
            reclaimer: Arc::new(ExpiryReclaimer::new(
                uow,
                clock.clone(),
                config.sweep_interval(),
            )),
            clock,
        }
    }

    pub fn api_state(&self, db: Option<DatabaseConnection>) -> ApiState {
        ApiState {
            catalog: self.catalog.clone(),
            coordinator: self.coordinator.clone(),
            payments: self.payments.clone(),
            clock: self.clock.clone(),
            retry: RetryConfig::default(),
            db,
            started_at: Arc::new(Instant::now()),
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running service.
///
/// ```rust,no_run
/// use showtime::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub services: Services,
    pub config: AppConfig,
    /// Address the REST API is bound to
    pub api_addr: std::net::SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    reclaimer_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service:
    /// 1. Install the Prometheus recorder
    /// 2. Open storage (SQLite via SeaORM, or the in-memory store) and migrate
    /// 3. Seed the demo showing (if enabled)
    /// 4. Start the expiry reclaimer and the REST API
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting Showtime booking service...");
        let prometheus = prometheus_handle();

        // ── Storage ────────────────────────────────────────────
        let (uow, db): (Arc<dyn UnitOfWork>, Option<DatabaseConnection>) =
            if app_cfg.database.uses_memory_store() {
                warn!("Using the in-memory store; data is lost on shutdown");
                (Arc::new(InMemoryStore::new()), None)
            } else {
                if let Some(dir) = app_cfg.database.sqlite_parent_dir() {
                    std::fs::create_dir_all(&dir)?;
                }
                let db = database::init_database(&app_cfg.database.to_database_config()).await?;
                if opts.auto_migrate {
                    database::run_migrations(&db).await?;
                }
                (Arc::new(SeaOrmUnitOfWork::new(db.clone())), Some(db))
            };

        // ── Services ───────────────────────────────────────────
        let clock: SharedClock = Arc::new(SystemClock);
        let oracle: Arc<dyn PaymentOracle> =
            Arc::new(SimulatedPaymentOracle::new(app_cfg.payments.approve_all));
        let services = Services::new(uow, clock, oracle, &app_cfg);

        if opts.seed_demo || app_cfg.reservations.seed_demo_showing {
            seed_demo_showing(&services).await?;
        }

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let reclaimer_task = services.reclaimer.clone().start(shutdown_signal.clone());

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(services.api_state(db.clone()), prometheus);

        let listener = tokio::net::TcpListener::bind(app_cfg.api_address()).await?;
        let api_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!(
            hold_duration_secs = app_cfg.reservations.hold_duration_secs,
            sweep_interval_secs = app_cfg.reservations.sweep_interval_secs,
            "🚀 Service started"
        );

        Ok(Self {
            services,
            config: app_cfg,
            api_addr,
            db,
            shutdown,
            api_task,
            reclaimer_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API and the reclaimer to stop after shutdown was
    /// triggered, bounded by `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            reclaimer_task,
            ..
        } = self;

        shutdown
            .drain(async move {
                if let Err(e) = api_task.await {
                    error!("REST API server task panicked: {}", e);
                }
                if let Err(e) = reclaimer_task.await {
                    error!("Expiry reclaimer task panicked: {}", e);
                }
            })
            .await;

        if let Some(db) = db {
            match db.close().await {
                Ok(()) => info!("✅ Database connection closed"),
                Err(e) => warn!("Error closing database connection: {}", e),
            }
        }

        info!("👋 Showtime booking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished() || !self.reclaimer_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process, so restarts
/// within one process reuse it. `None` if another recorder got there first.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe_metrics();
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
                None
            }
        })
        .clone()
}

/// Create the demo showing (standard layout, tomorrow 19:30) unless the
/// store already has showings.
pub async fn seed_demo_showing(services: &Services) -> DomainResult<()> {
    if !services.catalog.list_showings().await?.is_empty() {
        return Ok(());
    }

    let tomorrow = (services.clock.now() + Duration::days(1)).date_naive();
    let show_time = NaiveTime::from_hms_opt(19, 30, 0).unwrap_or(NaiveTime::MIN);
    let showing = services
        .catalog
        .create_showing(NewShowing {
            id: ShowingId::new(DEMO_SHOWING_ID),
            movie_id: "demo-movie".to_string(),
            theatre_id: "demo-theatre".to_string(),
            screen_number: 1,
            show_date: tomorrow,
            show_time,
            layout: SeatLayout::standard(),
        })
        .await?;

    info!(
        showing_id = %showing.id,
        seats = showing.seats.len(),
        show_date = %tomorrow,
        "🎬 Demo showing seeded"
    );
    Ok(())
}

/// Initialize tracing from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialised: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::clock::ManualClock;

    fn memory_services() -> Services {
        let clock = Arc::new(ManualClock::default());
        Services::new(
            Arc::new(InMemoryStore::new()),
            clock,
            Arc::new(SimulatedPaymentOracle::approving()),
            &AppConfig::default(),
        )
    }

    #[tokio::test]
    async fn demo_seed_runs_once() {
        let services = memory_services();
        seed_demo_showing(&services).await.unwrap();
        seed_demo_showing(&services).await.unwrap();

        let showings = services.catalog.list_showings().await.unwrap();
        assert_eq!(showings.len(), 1);
        assert_eq!(showings[0].id.as_str(), DEMO_SHOWING_ID);
        assert_eq!(showings[0].seats.len(), 100);
    }

    #[tokio::test]
    async fn starts_and_stops_on_memory_store() {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".into();
        config.database.url = "memory".into();
        config.server.shutdown_timeout = 5;

        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        config.server.api_port = probe.local_addr().unwrap().port();
        drop(probe);

        let handle = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
            seed_demo: true,
        })
        .await
        .unwrap();
        assert!(handle.is_running());
        assert_eq!(handle.services.catalog.list_showings().await.unwrap().len(), 1);

        handle.shutdown().await;
    }
}
