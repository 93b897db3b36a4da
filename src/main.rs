use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::{Context, anyhow};
use attendance_tracker::attendance::{AttendanceEngine, DayPolicy};
use attendance_tracker::config::Config;
use attendance_tracker::db::init_store;
use attendance_tracker::docs::ApiDoc;
use attendance_tracker::realtime::Notifier;
use attendance_tracker::routes::{self, Limiters};
use attendance_tracker::utils::clock::SystemClock;
use std::sync::Arc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .pretty()
        .init();

    info!(store = %config.store_backend, addr = %config.server_addr, "Server starting...");

    let policy = DayPolicy::from_offset_minutes(config.utc_offset_minutes).ok_or_else(|| {
        anyhow!("invalid UTC offset: {} minutes", config.utc_offset_minutes)
    })?;
    let store = init_store(&config).await?;
    let notifier = Arc::new(Notifier::new());
    let engine = Data::new(AttendanceEngine::new(
        store,
        notifier.clone(),
        Arc::new(SystemClock),
        policy,
    ));
    let notifier = Data::from(notifier);
    let limiters = Limiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let config = config_data.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config.clone())
            .app_data(engine.clone())
            .app_data(notifier.clone())
            .configure(move |cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
