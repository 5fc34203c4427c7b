//! # HTTP interactions endpoint
//!
//! Receives signed interaction webhooks instead of gateway events. Every
//! request is verified against the application's Ed25519 public key before
//! it is parsed.

use anyhow::{anyhow, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::commands::options::supplied_from_json;
use crate::commands::{BotContext, Dispatcher, InboundInteraction, Preparation};
use crate::config::Config;
use crate::discord::{attachment_files, delivery_fallback};
use crate::error::CommandError;
use crate::reply::{Embed, Reply};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub ctx: BotContext,
    pub http: Arc<Http>,
    pub public_key: VerifyingKey,
}

#[derive(Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub interaction_type: u8,
    pub data: Option<Value>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub member: Option<Value>,
    pub user: Option<Value>,
    pub token: String,
    pub id: String,
}

#[derive(Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub response_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Discord interaction types
const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

// Discord interaction response types
const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;

/// Message flag hiding a reply from everyone but the invoking user
const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Decodes the hex-encoded application public key
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| anyhow!("Failed to decode Discord public key: {}", e))?;
    let len = bytes.len();
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("Public key must be 32 bytes, got {}", len))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| anyhow!("Invalid Discord public key: {}", e))
}

pub fn create_server(
    config: &Config,
    dispatcher: Arc<Dispatcher>,
    ctx: BotContext,
    http: Arc<Http>,
) -> Result<Router> {
    let discord_public_key = config.discord_public_key.as_ref().ok_or_else(|| {
        anyhow!("DISCORD_PUBLIC_KEY environment variable is required for HTTP interactions")
    })?;

    info!("🔑 Loading Discord public key for signature verification");
    let public_key = parse_public_key(discord_public_key)?;
    info!("✅ Discord public key loaded");

    let state = AppState {
        dispatcher,
        ctx,
        http,
        public_key,
    };

    let app = Router::new()
        .route("/", get(health_check))
        .route("/interactions", post(handle_interaction))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    Ok(app)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Guide bot HTTP interactions endpoint is running",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, StatusCode> {
    let request_id = uuid::Uuid::new_v4();
    debug!(
        "[{}] 📥 HTTP interaction received | Body length: {}",
        request_id,
        body.len()
    );

    if let Err(e) = verify_discord_signature(&state.public_key, &headers, &body) {
        warn!("[{}] ❌ Signature verification failed: {}", request_id, e);
        return Err(StatusCode::UNAUTHORIZED);
    }

    let interaction: InteractionPayload = serde_json::from_slice(&body).map_err(|e| {
        error!("[{}] ❌ Failed to parse interaction payload: {}", request_id, e);
        StatusCode::BAD_REQUEST
    })?;

    match interaction.interaction_type {
        PING => {
            info!("[{}] 🏓 Received ping interaction", request_id);
            Ok(Json(InteractionResponse {
                response_type: PONG,
                data: None,
            }))
        }
        APPLICATION_COMMAND => handle_application_command(interaction, state).await,
        other => {
            warn!("[{}] ⚠️ Unsupported interaction type: {}", request_id, other);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

fn verify_discord_signature(
    public_key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<()> {
    let signature_header = headers
        .get("x-signature-ed25519")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| anyhow!("Missing signature header"))?;

    let timestamp_header = headers
        .get("x-signature-timestamp")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| anyhow!("Missing timestamp header"))?;

    let signature_bytes =
        hex::decode(signature_header).map_err(|e| anyhow!("Invalid signature format: {}", e))?;
    let signature_array: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| anyhow!("Signature must be 64 bytes"))?;
    let signature = Signature::from_bytes(&signature_array);

    let message = [timestamp_header.as_bytes(), body].concat();
    public_key
        .verify(&message, &signature)
        .map_err(|e| anyhow!("Signature verification failed: {}", e))?;

    Ok(())
}

fn snowflake(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(raw) => raw.parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}

fn user_tag(user: &Value) -> String {
    let name = user.get("username").and_then(Value::as_str).unwrap_or("unknown");
    match user.get("discriminator").and_then(Value::as_str) {
        Some(discriminator) if discriminator != "0" => format!("{}#{}", name, discriminator),
        _ => name.to_string(),
    }
}

/// Builds the dispatcher's view of a webhook interaction. Guild interactions
/// carry the user under `member`, direct messages under `user`.
pub fn inbound_from_payload(payload: &InteractionPayload) -> Option<InboundInteraction> {
    let data = payload.data.as_ref()?;
    let command = data.get("name")?.as_str()?.to_string();
    let user = payload
        .member
        .as_ref()
        .and_then(|member| member.get("user"))
        .or(payload.user.as_ref())?;

    Some(InboundInteraction {
        command,
        options: supplied_from_json(data.get("options")),
        user_id: UserId(snowflake(user.get("id"))?),
        user_tag: user_tag(user),
        guild_id: payload
            .guild_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .map(GuildId),
        channel_id: ChannelId(payload.channel_id.as_deref()?.parse().ok()?),
    })
}

fn embed_payload(embed: &Embed) -> Value {
    let mut payload = json!({});
    if let Some(title) = &embed.title {
        payload["title"] = json!(title);
    }
    if let Some(url) = &embed.url {
        payload["url"] = json!(url);
    }
    if let Some(colour) = embed.colour {
        payload["color"] = json!(colour);
    }
    if !embed.fields.is_empty() {
        payload["fields"] = embed
            .fields
            .iter()
            .map(|field| json!({"name": field.name, "value": field.value, "inline": field.inline}))
            .collect();
    }
    if let Some(image) = &embed.image_url {
        payload["image"] = json!({ "url": image });
    }
    payload
}

/// Message body for a reply. Attachments become image embeds since inline
/// webhook responses are plain JSON; deferred replies upload them as files.
pub fn reply_payload(reply: &Reply) -> Value {
    let mut embeds: Vec<Value> = reply.embeds.iter().map(embed_payload).collect();
    embeds.extend(
        reply
            .attachments
            .iter()
            .map(|attachment| embed_payload(&Embed::new().image(&attachment.url))),
    );

    let mut payload = json!({ "embeds": embeds });
    if let Some(content) = &reply.content {
        payload["content"] = json!(content);
    }
    if reply.ephemeral {
        payload["flags"] = json!(EPHEMERAL_FLAG);
    }
    payload
}

async fn handle_application_command(
    interaction: InteractionPayload,
    state: AppState,
) -> Result<Json<InteractionResponse>, StatusCode> {
    let inbound = inbound_from_payload(&interaction).ok_or_else(|| {
        warn!("⚠️ Malformed application command interaction {}", interaction.id);
        StatusCode::BAD_REQUEST
    })?;

    let Some(preparation) = state.dispatcher.prepare(&state.ctx, &inbound).await else {
        debug!("❓ Unknown command /{}", inbound.command);
        return Err(StatusCode::NOT_FOUND);
    };

    let prepared = match preparation {
        Preparation::Ready(prepared) => prepared,
        Preparation::Rejected(reply) => {
            return Ok(Json(InteractionResponse {
                response_type: CHANNEL_MESSAGE_WITH_SOURCE,
                data: Some(reply_payload(&reply)),
            }));
        }
    };

    if prepared.should_defer() {
        info!("⏳ Deferring response for /{}", prepared.identifier());
        let token = interaction.token;
        tokio::spawn(async move {
            let reply = state.dispatcher.execute(&state.ctx, &inbound, prepared).await;
            let Err(e) = deliver_deferred(&state, &token, &reply).await else {
                return;
            };
            error!("❌ Failed to deliver deferred reply for /{}: {}", inbound.command, e);

            if let Some(fallback) = delivery_fallback(&reply) {
                if let Err(e) = deliver_deferred(&state, &token, &fallback).await {
                    error!("❌ Failed to deliver fallback for /{}: {}", inbound.command, e);
                }
            }
        });

        return Ok(Json(InteractionResponse {
            response_type: DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
            data: None,
        }));
    }

    let reply = state.dispatcher.execute(&state.ctx, &inbound, prepared).await;
    Ok(Json(InteractionResponse {
        response_type: CHANNEL_MESSAGE_WITH_SOURCE,
        data: Some(reply_payload(&reply)),
    }))
}

/// Completes a deferred interaction. Replies with attachments go out as a
/// followup carrying the downloaded files, which replaces the loading message.
async fn deliver_deferred(state: &AppState, token: &str, reply: &Reply) -> Result<(), CommandError> {
    if reply.attachments.is_empty() {
        state
            .http
            .edit_original_interaction_response(token, &reply_payload(reply))
            .await?;
        return Ok(());
    }

    let files = attachment_files(state.ctx.web.as_ref(), reply).await?;
    let message = Reply {
        attachments: Vec::new(),
        ..reply.clone()
    };
    state
        .http
        .create_followup_message_with_files(token, &reply_payload(&message), files)
        .await?;
    Ok(())
}

pub async fn start_http_server(
    config: Config,
    dispatcher: Arc<Dispatcher>,
    ctx: BotContext,
    http: Arc<Http>,
) -> Result<()> {
    let port = config.http_port;
    let app = create_server(&config, dispatcher, ctx, http)?;

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port))
        .await
        .map_err(|e| anyhow!("Failed to bind to port {}: {}", port, e))?;

    info!("🌐 HTTP server starting on port {}", port);
    info!("📡 Interactions endpoint: http://0.0.0.0:{}/interactions", port);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
