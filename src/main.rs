use docvault::config::AppConfig;
use docvault::context::{AppContext, AppError};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let start_path = config.start_path.clone();
    let ctx = AppContext::build(config)?;

    ctx.session.initialize_auth();
    let landed = ctx
        .router
        .push(&start_path)
        .map(|l| l.to_string())
        .unwrap_or_default();
    tracing::info!(
        start = %start_path,
        landed = %landed,
        authenticated = ctx.session.is_authenticated(),
        "docvault shell ready"
    );

    let validity_check = ctx.start_validity_check();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    validity_check.cancel();
    tracing::info!("docvault shell stopped");
    Ok(())
}
