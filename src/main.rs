use usermgmt::{app, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing("usermgmt=debug,axum=info,tower_http=info");

    let state = AppState::init().await?;
    let addr = state.config.addr()?;

    app::serve(app::build_app(state), addr).await
}
