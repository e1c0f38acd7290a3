mod api_doc;
mod error;
mod handlers;
mod setup;
mod state;

use vidmill_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load .env if present; real environments set variables directly.
    dotenvy::dotenv().ok();

    setup::init_tracing();

    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
