use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::{Arc, OnceLock};

use guidebot::commands::{
    build_registry, register_global_commands, register_guild_commands, BotContext, Dispatcher,
};
use guidebot::config::Config;
use guidebot::discord::{handle_command, SerenityPlatform};
use guidebot::web_apis::{HttpWebApis, WebApis};

struct Handler {
    dispatcher: Arc<Dispatcher>,
    web: Arc<dyn WebApis>,
    guild_id: Option<GuildId>,
    /// Built on the first ready event, once the bot's own id is known
    bot_ctx: OnceLock<BotContext>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        let platform = SerenityPlatform::new(ctx.http.clone(), ready.user.id);
        let _ = self
            .bot_ctx
            .set(BotContext::new(Arc::new(platform), self.web.clone()));

        let registry = self.dispatcher.registry();
        let result = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, registry, guild_id).await,
            None => register_global_commands(&ctx, registry).await,
        };

        match result {
            Ok(()) => info!("✅ Registered {} slash commands", registry.len()),
            Err(e) => error!("❌ Failed to register slash commands: {}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        let Some(bot_ctx) = self.bot_ctx.get() else {
            warn!("⏳ Ignoring /{} received before ready", command.data.name);
            return;
        };

        let name = command.data.name.clone();
        if let Err(e) = handle_command(&self.dispatcher, bot_ctx, ctx.http.clone(), command).await
        {
            error!("❌ Failed to reply to slash command '{}': {}", name, e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::load()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("🚀 Starting guide bot (gateway)...");

    let registry = build_registry()?;
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        config.handler_timeout(),
    ));
    let web: Arc<dyn WebApis> = Arc::new(HttpWebApis::from_config(&config)?);

    let handler = Handler {
        dispatcher,
        web,
        guild_id: config.guild_id.map(GuildId),
        bot_ctx: OnceLock::new(),
    };

    // Slash commands need no privileged intents
    let intents = GatewayIntents::GUILDS;

    let mut builder = Client::builder(&config.discord_token, intents).event_handler(handler);
    if let Some(application_id) = config.application_id {
        builder = builder.application_id(application_id);
    }

    let mut client = builder.await.map_err(|e| {
        error!("❌ Failed to create Discord client: {}", e);
        anyhow::anyhow!("Client creation failed: {}", e)
    })?;

    info!("🔌 Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("❌ Gateway connection failed: {:?}", why);
        return Err(anyhow::anyhow!("Failed to establish gateway connection: {}", why));
    }

    Ok(())
}
