use std::net::SocketAddr;
use std::sync::Arc;

use gasguard_api::config::ServerConfig;
use gasguard_api::router::build_app_router;
use gasguard_api::state::AppState;
use gasguard_events::{
    ChannelDispatcher, EmailConfig, EmailDelivery, EventBus, SmsConfig, SmsDelivery,
};
use gasguard_monitor::{Monitor, MonitorSettings, SimulatedSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gasguard_api=debug,gasguard_monitor=info,gasguard_events=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let settings = MonitorSettings::from_env();
    tracing::info!(
        poll_ms = settings.poll_interval.as_millis() as u64,
        heartbeat_timeout_secs = settings.heartbeat_timeout.num_seconds(),
        "Monitor settings loaded"
    );

    // --- Notification channels ---
    let event_bus = Arc::new(EventBus::default());
    let mut dispatcher = ChannelDispatcher::new(Arc::clone(&event_bus));

    match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(host = %email_config.smtp_host, "Email delivery configured");
            dispatcher = dispatcher.with_email(EmailDelivery::new(email_config));
        }
        None => tracing::info!("SMTP_HOST not set, email alerts disabled"),
    }

    match SmsConfig::from_env() {
        Some(sms_config) => {
            let sms = SmsDelivery::new(sms_config).expect("Failed to build SMS gateway client");
            tracing::info!("SMS delivery configured");
            dispatcher = dispatcher.with_sms(sms);
        }
        None => tracing::info!("SMS_GATEWAY_URL not set, SMS alerts disabled"),
    }

    // --- Monitor ---
    let monitor = Monitor::new(
        settings,
        Arc::new(SimulatedSource::default()),
        Arc::new(dispatcher),
        Arc::clone(&event_bus),
    );
    monitor.start().await;

    let state = AppState {
        config: Arc::new(config.clone()),
        monitor: Arc::clone(&monitor),
        event_bus,
    };

    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped, shutting down monitor");
    monitor.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Listens for SIGINT (Ctrl-C) and, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
