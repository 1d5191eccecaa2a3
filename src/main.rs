pub mod admin;
pub mod auth;
mod config;
mod error;
mod extract;
pub mod facility;
mod model;
pub mod policy;
pub mod reference;
mod schema;
pub mod scope;
mod seed;
mod store;
pub mod validate;

use std::net::Ipv4Addr;
use std::sync::Arc;

use auth::{Keys, SecurityAddon};
use axum::http::{header, HeaderValue, Method};
use casbin::{CoreApi, Enforcer};
use config::Config;
use diesel::{pg::Pg, Connection, PgConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

const PUBLIC_TAG: &str = "public";
const FACILITY_TAG: &str = "facility";
const ADMIN_TAG: &str = "admin";

type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone)]
pub struct State {
    pool: Pool,
    enforcer: Arc<Enforcer>,
    keys: Arc<Keys>,
    token_ttl_hours: u64,
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    tags(
        (name = PUBLIC_TAG, description = "Read-only campus directory"),
        (name = FACILITY_TAG, description = "Facility management for admins"),
        (name = ADMIN_TAG, description = "Admin login and account management")
    )
)]
struct ApiDoc;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_migrations(
    connection: &mut impl MigrationHarness<Pg>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_filter(filter),
        )
        .init();

    let config = Config::from_env()?;

    let mut bootstrap_connection = PgConnection::establish(&config.database_url)?;
    run_migrations(&mut bootstrap_connection)?;
    if seed::seed_admin(
        &mut bootstrap_connection,
        &config.seed_admin_email,
        &config.seed_admin_password,
    )? {
        info!("Seeded default admin: {}", config.seed_admin_email);
    }
    let seeded = seed::seed_reference_data(&mut bootstrap_connection)?;
    if seeded > 0 {
        info!("Seeded {} infrastructure items", seeded);
    }
    drop(bootstrap_connection);

    // set up connection pool
    let manager =
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url.as_str());
    let pool = bb8::Pool::builder().build(manager).await?;
    let acl_model: &'static str = config.acl_model.clone().leak();
    let acl_policy: &'static str = config.acl_policy.clone().leak();
    let enforcer = Enforcer::new(acl_model, acl_policy).await?;

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest(
            "/api/public",
            reference::router().merge(facility::public_router()),
        )
        .nest(
            "/api/admin",
            admin::auth_router()
                .merge(admin::admin_router())
                .merge(facility::admin_router()),
        )
        .with_state(State {
            pool,
            enforcer: Arc::new(enforcer),
            keys: Arc::new(Keys::new(&config.jwt_secret)),
            token_ttl_hours: config.token_ttl_hours,
        })
        .split_for_parts();

    let router = router
        .merge(SwaggerUi::new("/swagger-ui").url("/apidoc/openapi.json", api))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
    info!("Listening on 0.0.0.0:{}", config.port);
    Ok(axum::serve(listener, router).await?)
}
