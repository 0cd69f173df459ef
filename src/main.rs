use actix_web::{middleware::Compress, App, HttpServer};
use actix_cors::Cors;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod models;
mod notify;
mod openapi;
mod repo;
mod routes;
mod storage;

use notify::{LogNotifier, Notifier};
use openapi::ApiDoc;
#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
use repo::inmem::InMemRepo;
use routes::{config, AppState};
use std::sync::Arc;
use storage::build_media_store;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Environment variables must be set externally (shell, systemd, Docker, etc.)
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping glitchdesk server");

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = InMemRepo::new();
    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    info!("Using in-memory repository backend");

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres-store");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .expect("Failed to connect to Postgres");
        repo::pg::ensure_schema(&pool)
            .await
            .expect("Failed to prepare database schema");
        info!("Using Postgres repository backend");
        repo::pg::PgRepo::new(pool)
    };

    let media_store = build_media_store().await; // S3/MinIO; fatal if misconfigured
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        // Dashboard and submission forms are served from arbitrary origins;
        // preflight results are cached for 12 hours.
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers([
                actix_web::http::header::ORIGIN,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .expose_headers([actix_web::http::header::CONTENT_LENGTH])
            .supports_credentials()
            .max_age(12 * 3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                media_store: media_store.clone(),
                notifier: notifier.clone(),
            }))
    })
    .bind(("0.0.0.0", 8080))?;

    info!("Listening on http://0.0.0.0:8080");

    server.run().await
}

/// Validate that required environment variables are set
fn validate_env_vars() {
    use std::env;

    let mut required = vec!["S3_ENDPOINT"];
    if cfg!(feature = "postgres-store") {
        required.push("DATABASE_URL");
    }

    let missing: Vec<_> = required
        .into_iter()
        .filter(|var| env::var(var).is_err())
        .collect();

    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {missing:?}");
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    }
}
