use usermgmt::{
    app,
    client::{build_client_app, ClientState},
    config::ClientConfig,
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing("usermgmt=debug,axum=info,tower_http=info");

    let config = ClientConfig::from_env()?;
    let addr = config.addr()?;
    tracing::info!(api_url = %config.api_url, "frontend talking to api");

    let state = ClientState::new(config)?;
    app::serve(build_client_app(state), addr).await
}
