//! # Gateway transport
//!
//! Serenity-backed [`Platform`] plus the glue between gateway interaction
//! events and the dispatcher.

use chrono::Utc;
use log::{debug, error, info};
use serenity::async_trait;
use serenity::builder::CreateEmbed;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::{
    AttachmentType, Channel, ChannelType, PermissionOverwrite, PermissionOverwriteType,
};
use serenity::model::guild::{PartialGuild, Role};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::commands::options::supplied_from_gateway;
use crate::commands::{BotContext, Dispatcher, InboundInteraction, Preparation};
use crate::error::{CommandError, GENERIC_FAILURE};
use crate::overwrites::{self, everyone_role};
use crate::platform::{GuildSummary, Platform, PlatformResult};
use crate::reply::{Embed, Reply};
use crate::web_apis::WebApis;

/// Messages older than this can't be bulk deleted.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_id: UserId,
}

impl SerenityPlatform {
    /// `bot_id` is resolved once, from the ready event or at startup
    pub fn new(http: Arc<Http>, bot_id: UserId) -> Self {
        SerenityPlatform { http, bot_id }
    }

    /// Looks up the bot's own id, then builds the platform
    pub async fn connect(http: Arc<Http>) -> PlatformResult<Self> {
        let bot_id = http.get_current_user().await?.id;
        Ok(Self::new(http, bot_id))
    }

    async fn guild(&self, guild: GuildId) -> PlatformResult<PartialGuild> {
        Ok(self.http.get_guild(guild.0).await?)
    }

    async fn member_roles(&self, guild: GuildId, user: UserId) -> PlatformResult<Vec<RoleId>> {
        Ok(self.http.get_member(guild.0, user.0).await?.roles)
    }

    /// Overwrites and parent category of a guild channel
    async fn channel_overwrites(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<(Vec<PermissionOverwrite>, Option<ChannelId>)> {
        match self.http.get_channel(channel.0).await? {
            Channel::Guild(channel) => Ok((channel.permission_overwrites, channel.parent_id)),
            Channel::Category(category) => Ok((category.permission_overwrites, None)),
            _ => Err(CommandError::validation(
                "This command can only be used in a server channel.",
            )),
        }
    }
}

fn role_permissions(roles: &HashMap<RoleId, Role>) -> HashMap<RoleId, Permissions> {
    roles
        .iter()
        .map(|(id, role)| (*id, role.permissions))
        .collect()
}

#[async_trait]
impl Platform for SerenityPlatform {
    async fn bot_user_id(&self) -> PlatformResult<UserId> {
        Ok(self.bot_id)
    }

    async fn guild_summary(&self, guild: GuildId) -> PlatformResult<GuildSummary> {
        let guild = self.http.get_guild_with_counts(guild.0).await?;
        Ok(GuildSummary {
            name: guild.name,
            member_count: guild.approximate_member_count,
        })
    }

    async fn member_permissions(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> PlatformResult<Permissions> {
        let (partial, member_roles) =
            tokio::try_join!(self.guild(guild), self.member_roles(guild, user))?;
        Ok(overwrites::guild_permissions(
            guild,
            partial.owner_id,
            user,
            &member_roles,
            &role_permissions(&partial.roles),
        ))
    }

    async fn member_channel_permissions(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> PlatformResult<Permissions> {
        let (partial, member_roles, (channel_overwrites, _)) = tokio::try_join!(
            self.guild(guild),
            self.member_roles(guild, user),
            self.channel_overwrites(channel),
        )?;

        let base = overwrites::guild_permissions(
            guild,
            partial.owner_id,
            user,
            &member_roles,
            &role_permissions(&partial.roles),
        );
        Ok(overwrites::channel_permissions(
            base,
            guild,
            user,
            &member_roles,
            &channel_overwrites,
        ))
    }

    async fn highest_role_channel_permissions(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> PlatformResult<Permissions> {
        let (partial, member_roles, (channel_overwrites, _)) = tokio::try_join!(
            self.guild(guild),
            self.member_roles(guild, user),
            self.channel_overwrites(channel),
        )?;

        let highest = member_roles
            .iter()
            .filter_map(|id| partial.roles.get(id))
            .max_by_key(|role| (role.position, std::cmp::Reverse(role.id.0)))
            .map(|role| role.id)
            .unwrap_or_else(|| everyone_role(guild));

        Ok(overwrites::role_channel_permissions(
            guild,
            highest,
            &role_permissions(&partial.roles),
            &channel_overwrites,
        ))
    }

    async fn member_role_names(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> PlatformResult<Vec<String>> {
        let (partial, member_roles) =
            tokio::try_join!(self.guild(guild), self.member_roles(guild, user))?;
        Ok(member_roles
            .iter()
            .filter_map(|id| partial.roles.get(id))
            .map(|role| role.name.clone())
            .collect())
    }

    async fn role_names(&self, guild: GuildId) -> PlatformResult<Vec<String>> {
        let roles = self.http.get_guild_roles(guild.0).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    async fn everyone_permissions(&self, guild: GuildId) -> PlatformResult<Permissions> {
        let partial = self.guild(guild).await?;
        Ok(partial
            .roles
            .get(&everyone_role(guild))
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty))
    }

    async fn set_everyone_permissions(
        &self,
        guild: GuildId,
        permissions: Permissions,
    ) -> PlatformResult<()> {
        guild
            .edit_role(&self.http, everyone_role(guild), |role| {
                role.permissions(permissions)
            })
            .await?;
        Ok(())
    }

    async fn create_role(
        &self,
        guild: GuildId,
        name: &str,
        permissions: Permissions,
    ) -> PlatformResult<()> {
        let role = guild
            .create_role(&self.http, |role| role.name(name).permissions(permissions))
            .await?;
        info!("🛡️ Created role {} ({}) in guild {}", role.name, role.id, guild);
        Ok(())
    }

    async fn bulk_delete(&self, channel: ChannelId, amount: u64) -> PlatformResult<usize> {
        let cutoff = Utc::now().timestamp() - BULK_DELETE_MAX_AGE_SECS;
        let messages = channel
            .messages(&self.http, |retriever| retriever.limit(amount))
            .await?;

        let recent: Vec<_> = messages
            .iter()
            .filter(|message| message.timestamp.unix_timestamp() > cutoff)
            .map(|message| message.id)
            .collect();

        debug!(
            "Bulk deleting {} of {} fetched messages in {}",
            recent.len(),
            messages.len(),
            channel
        );

        match recent.as_slice() {
            [] => {}
            [single] => channel.delete_message(&self.http, *single).await?,
            _ => channel.delete_messages(&self.http, &recent).await?,
        }
        Ok(recent.len())
    }

    async fn set_channel_overwrites(
        &self,
        channel: ChannelId,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<()> {
        channel
            .edit(&self.http, |edit| edit.permissions(overwrites))
            .await?;
        Ok(())
    }

    async fn delete_everyone_overwrite(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<()> {
        channel
            .delete_permission(
                &self.http,
                PermissionOverwriteType::Role(everyone_role(guild)),
            )
            .await?;
        Ok(())
    }

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<ChannelId> {
        let channel = guild
            .create_channel(&self.http, |create| {
                create
                    .name(name)
                    .kind(ChannelType::Text)
                    .permissions(overwrites)
            })
            .await?;
        Ok(channel.id)
    }

    async fn channel_category(&self, channel: ChannelId) -> PlatformResult<Option<String>> {
        let (_, parent) = self.channel_overwrites(channel).await?;
        let Some(parent) = parent else {
            return Ok(None);
        };

        match self.http.get_channel(parent.0).await? {
            Channel::Category(category) => Ok(Some(category.name)),
            Channel::Guild(channel) => Ok(Some(channel.name)),
            _ => Ok(None),
        }
    }

    async fn sync_with_category(&self, channel: ChannelId) -> PlatformResult<()> {
        let (_, parent) = self.channel_overwrites(channel).await?;
        let parent =
            parent.ok_or_else(|| CommandError::validation("This channel is not in a category."))?;
        let (category_overwrites, _) = self.channel_overwrites(parent).await?;
        self.set_channel_overwrites(channel, category_overwrites)
            .await
    }
}

pub fn inbound_from_command(command: &ApplicationCommandInteraction) -> InboundInteraction {
    InboundInteraction {
        command: command.data.name.clone(),
        options: supplied_from_gateway(&command.data.options),
        user_id: command.user.id,
        user_tag: command.user.tag(),
        guild_id: command.guild_id,
        channel_id: command.channel_id,
    }
}

fn create_embed(embed: &Embed) -> CreateEmbed {
    let mut created = CreateEmbed::default();
    if let Some(title) = &embed.title {
        created.title(title);
    }
    if let Some(url) = &embed.url {
        created.url(url);
    }
    if let Some(colour) = embed.colour {
        created.colour(colour);
    }
    for field in &embed.fields {
        created.field(&field.name, &field.value, field.inline);
    }
    if let Some(image) = &embed.image_url {
        created.image(image);
    }
    created
}

/// Downloads every attachment of a reply so it uploads under its own filename
pub async fn attachment_files(
    web: &dyn WebApis,
    reply: &Reply,
) -> Result<Vec<AttachmentType<'static>>, CommandError> {
    let mut files = Vec::with_capacity(reply.attachments.len());
    for attachment in &reply.attachments {
        let data = web.download(&attachment.url).await?;
        files.push(AttachmentType::Bytes {
            data: Cow::Owned(data),
            filename: attachment.filename.clone(),
        });
    }
    Ok(files)
}

/// What to send once `failed` could not be delivered. `None` when the
/// generic failure itself is what failed.
pub fn delivery_fallback(failed: &Reply) -> Option<Reply> {
    let fallback = Reply::ephemeral(GENERIC_FAILURE);
    if *failed == fallback {
        None
    } else {
        Some(fallback)
    }
}

/// Delivers the one reply of a gateway interaction. Sending consumes the
/// responder, so a second reply can't be expressed.
pub struct GatewayResponder {
    http: Arc<Http>,
    web: Arc<dyn WebApis>,
    command: ApplicationCommandInteraction,
    deferred: bool,
}

impl GatewayResponder {
    pub fn new(
        http: Arc<Http>,
        web: Arc<dyn WebApis>,
        command: ApplicationCommandInteraction,
    ) -> Self {
        GatewayResponder {
            http,
            web,
            command,
            deferred: false,
        }
    }

    /// Acknowledges the interaction so the reply may arrive later
    pub async fn defer(&mut self) -> Result<(), CommandError> {
        self.command
            .create_interaction_response(&self.http, |response| {
                response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await?;
        self.deferred = true;
        Ok(())
    }

    /// Sends `reply`, or the generic failure text when `reply` can't be
    /// delivered, so an acknowledged interaction always gets an answer.
    pub async fn send(self, reply: Reply) -> Result<(), CommandError> {
        let Err(e) = self.deliver(&reply).await else {
            return Ok(());
        };
        let Some(fallback) = delivery_fallback(&reply) else {
            return Err(e);
        };

        error!(
            "⚠️ Failed to deliver reply to /{}: {}; sending the generic failure",
            self.command.data.name, e
        );
        self.deliver(&fallback).await
    }

    async fn deliver(&self, reply: &Reply) -> Result<(), CommandError> {
        let embeds: Vec<CreateEmbed> = reply.embeds.iter().map(create_embed).collect();
        let files = attachment_files(self.web.as_ref(), reply).await?;
        let content = reply.content();
        let ephemeral = reply.ephemeral;

        if self.deferred {
            self.command
                .create_followup_message(&self.http, |message| {
                    if !content.is_empty() {
                        message.content(content);
                    }
                    message.add_embeds(embeds).add_files(files).ephemeral(ephemeral)
                })
                .await?;
        } else {
            self.command
                .create_interaction_response(&self.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|data| {
                            if !content.is_empty() {
                                data.content(content);
                            }
                            data.add_embeds(embeds).add_files(files).ephemeral(ephemeral)
                        })
                })
                .await?;
        }
        Ok(())
    }
}

/// Runs one gateway command interaction to completion. Rejected input is
/// answered right away; only commands that passed their checks are deferred.
pub async fn handle_command(
    dispatcher: &Dispatcher,
    ctx: &BotContext,
    http: Arc<Http>,
    command: ApplicationCommandInteraction,
) -> Result<(), CommandError> {
    let inbound = inbound_from_command(&command);
    let Some(preparation) = dispatcher.prepare(ctx, &inbound).await else {
        debug!("❓ Ignoring unknown command /{}", inbound.command);
        return Ok(());
    };

    let mut responder = GatewayResponder::new(http, ctx.web.clone(), command);
    let reply = match preparation {
        Preparation::Rejected(reply) => reply,
        Preparation::Ready(prepared) => {
            if prepared.should_defer() {
                responder.defer().await?;
            }
            dispatcher.execute(ctx, &inbound, prepared).await
        }
    };
    responder.send(reply).await
}
