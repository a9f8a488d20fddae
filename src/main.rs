use tracing_subscriber::EnvFilter;

mod app;
mod audit;
mod auth;
mod config;
mod error;
mod locations;
mod state;
mod trails;
mod users;

const DEFAULT_LOG_FILTER: &str = "trailservice=debug,axum=info,tower_http=info";

/// `RUST_LOG` picks levels, `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.with_target(false).json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = state::AppState::init().await?;
    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "schema migration failed; serving with the existing schema");
    }

    app::serve(app::build_app(state)).await
}
