//! EduFund backend server
//!
//! Serves the Admin Portal and E-Service APIs and runs the account-closure
//! and top-up batch jobs.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use edufund_api::{configure, json_config, path_config, query_config, ServiceFactory};
use edufund_auth::{JwtService, PasswordService};
use edufund_core::models::{User, UserRole};
use edufund_core::traits::Repository;
use edufund_core::AppConfig;
use edufund_db::{create_pool, run_migrations, PgUserRepository};
use edufund_services::BatchScheduler;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Username of the superadmin created on an empty database
const BOOTSTRAP_ADMIN: &str = "admin";

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "edufund={0},edufund_api={0},edufund_services={0},edufund_db={0},edufund_auth={0},actix_web=info,sqlx=warn",
            log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Create the first superadmin when no staff user exists yet
async fn bootstrap_admin(
    pool: &PgPool,
    config: &AppConfig,
    password_service: &PasswordService,
) -> anyhow::Result<()> {
    let users = PgUserRepository::new(pool.clone());
    if users.count().await? > 0 {
        return Ok(());
    }

    let Some(password) = config.auth.bootstrap_admin_password.as_deref() else {
        warn!("No staff users exist and auth.bootstrap_admin_password is not set");
        return Ok(());
    };

    let admin = User {
        username: BOOTSTRAP_ADMIN.to_string(),
        password_hash: password_service.hash_new_password(password)?,
        full_name: Some("System Administrator".to_string()),
        role: UserRole::Superadmin,
        ..Default::default()
    };
    users.create(&admin).await?;

    info!(username = BOOTSTRAP_ADMIN, "Bootstrap superadmin created");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting EduFund backend v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("Failed to load configuration")?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    info!(
        "Database connection established with {} max connections",
        config.database.max_connections
    );

    if config.database.run_migrations {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    let jwt_service = Arc::new(JwtService::from_config(&config.auth));
    let password_service = Arc::new(PasswordService::new());

    bootstrap_admin(&pool, &config, &password_service).await?;

    let factory = web::Data::new(
        ServiceFactory::new(pool.clone(), config.clone()).context("Invalid batch configuration")?,
    );

    let _scheduler = if config.batch.enabled {
        let scheduler = BatchScheduler::from_config(
            &config.batch,
            Arc::new(factory.education_accounts()),
            Arc::new(factory.top_ups()),
        )?;
        Some(scheduler.spawn())
    } else {
        info!("Batch scheduler disabled");
        None
    };

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let payload_limit = config.server.payload_limit_bytes;
    let cors_config = config.cors.clone();

    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_config = cors_config.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| cors_config.allows(o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::COOKIE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(factory.clone())
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(password_service.clone()))
            .app_data(web::PayloadConfig::new(payload_limit))
            .app_data(json_config(payload_limit))
            .app_data(query_config())
            .app_data(path_config())
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
