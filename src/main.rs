use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use aquacare_api as api;
use api::{
    circuit_breaker::CircuitBreaker,
    events::{EventHandler, EventSender},
    notifications::{mailer_from_config, NotificationDispatcher},
    services::{courier::courier_from_config, geocoding::geocoder_from_config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("loading configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool)
            .await
            .context("running migrations")?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(EventSender::new(event_tx));

    // External integrations, each behind its own breaker
    let courier_breaker = Arc::new(CircuitBreaker::new(
        "courier",
        5,
        Duration::from_secs(60),
        2,
    ));
    let geocoding_breaker = Arc::new(CircuitBreaker::new(
        "geocoding",
        5,
        Duration::from_secs(30),
        1,
    ));
    let courier =
        courier_from_config(&cfg.courier, courier_breaker).context("configuring courier")?;
    let geocoder = geocoder_from_config(&cfg.geocoding, geocoding_breaker)
        .context("configuring geocoder")?;
    let mailer = mailer_from_config(&cfg.email).context("configuring mailer")?;
    info!(courier = courier.provider(), email = cfg.email.enabled, "Integrations ready");

    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        event_sender,
        &cfg,
        courier,
        geocoder,
    );

    // Notifications and emails run off the request path
    let dispatcher: Arc<dyn EventHandler> = Arc::new(NotificationDispatcher::new(
        db_arc.clone(),
        (*services.notifications).clone(),
        mailer,
        cfg.email.admin_email.clone(),
    ));
    tokio::spawn(api::events::process_events(event_rx, Some(dispatcher)));

    let app_state = api::AppState::new(db_arc, cfg.clone(), services);
    tokio::spawn(api::rate_limiter::start_cleanup_task(
        app_state.rate_limiter.clone(),
        Duration::from_secs(cfg.rate_limit_window_seconds.max(1)),
    ));

    let app = api::build_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("parsing listen address {}:{}", cfg.host, cfg.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding listener on {}", addr))?;
    info!("aquacare-api listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
