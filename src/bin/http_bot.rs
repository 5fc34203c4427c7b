use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use log::{error, info};
use serenity::http::Http;
use std::sync::Arc;

use guidebot::commands::{build_registry, BotContext, Dispatcher};
use guidebot::config::Config;
use guidebot::discord::SerenityPlatform;
use guidebot::http_server::start_http_server;
use guidebot::platform::Platform;
use guidebot::web_apis::HttpWebApis;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::load()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("🚀 Starting guide bot HTTP interactions server...");

    // Deferred replies edit the original response, which needs the application id
    let application_id = config
        .application_id
        .ok_or_else(|| anyhow!("DISCORD_APPLICATION_ID is required for HTTP interactions"))?;
    let http = Arc::new(Http::new_with_application_id(
        &config.discord_token,
        application_id,
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(build_registry()?),
        config.handler_timeout(),
    ));
    let platform = SerenityPlatform::connect(http.clone()).await?;
    info!("🤖 Bot ID: {}", platform.bot_user_id().await?);
    let ctx = BotContext::new(
        Arc::new(platform),
        Arc::new(HttpWebApis::from_config(&config)?),
    );
    info!("✅ {} commands registered", dispatcher.registry().len());

    if let Err(e) = start_http_server(config, dispatcher, ctx, http).await {
        error!("❌ HTTP server failed: {}", e);
        return Err(e);
    }

    Ok(())
}
