//! Permission demonstration slash commands: /mod-everyone, /unmod-everyone,
//! /create-mod, /check-mod, /can-kick, /make-private, /create-private,
//! /unprivate, /my-permissions, /lock-permissions, /role-permissions
//!
//! Every command here is guild-only, requires the bot to hold
//! [`DEMO_BOT_PERMISSIONS`] in the guild and is deferred, since each one
//! makes several REST calls before it can answer.

use serenity::async_trait;
use serenity::model::channel::{PermissionOverwrite, PermissionOverwriteType};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;
use std::sync::Arc;

use crate::commands::dispatcher::{Invocation, SlashCommand};
use crate::commands::registry::{CommandDescriptor, CommandRegistry};
use crate::error::{CommandError, RegistryError};
use crate::overwrites::{everyone_role, permission_report};
use crate::reply::Reply;

pub const MOD_ROLE: &str = "Mod";

/// What the `Mod` role and the mod toggles grant
pub const MOD_PERMISSIONS: Permissions = Permissions::from_bits_truncate(
    Permissions::MANAGE_MESSAGES.bits() | Permissions::KICK_MEMBERS.bits(),
);

pub const DEMO_BOT_PERMISSIONS: Permissions = Permissions::from_bits_truncate(
    Permissions::MANAGE_MESSAGES.bits()
        | Permissions::KICK_MEMBERS.bits()
        | Permissions::MANAGE_ROLES.bits()
        | Permissions::MANAGE_CHANNELS.bits(),
);

/// Registers permission demonstration commands
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    let commands: [(&str, &str, Arc<dyn SlashCommand>); 11] = [
        ("mod-everyone", "Give @everyone moderation permissions.", Arc::new(ModEveryone)),
        ("unmod-everyone", "Take moderation permissions from @everyone.", Arc::new(UnmodEveryone)),
        ("create-mod", "Create a Mod role.", Arc::new(CreateMod)),
        ("check-mod", "Check whether you have a role called Mod.", Arc::new(CheckMod)),
        ("can-kick", "Check whether you can kick members.", Arc::new(CanKick)),
        ("make-private", "Hide this channel from everyone but you and me.", Arc::new(MakePrivate)),
        ("create-private", "Create a private channel.", Arc::new(CreatePrivate)),
        ("unprivate", "Make this channel visible to everyone again.", Arc::new(Unprivate)),
        ("my-permissions", "Show your permissions in this channel.", Arc::new(MyPermissions)),
        ("lock-permissions", "Sync this channel's permissions with its category.", Arc::new(LockPermissions)),
        ("role-permissions", "Show your highest role's permissions in this channel.", Arc::new(RolePermissions)),
    ];

    for (identifier, description, handler) in commands {
        registry.register(
            CommandDescriptor::new(identifier, description)
                .guild_only()
                .deferred()
                .bot_permissions(DEMO_BOT_PERMISSIONS),
            handler,
        )?;
    }
    Ok(())
}

/// Fails unless the bot may manage roles in the invocation channel
async fn ensure_bot_manages_roles(
    invocation: &Invocation<'_>,
    guild: GuildId,
) -> Result<(), CommandError> {
    let platform = &invocation.ctx.platform;
    let bot = platform.bot_user_id().await?;
    let granted = platform
        .member_channel_permissions(guild, invocation.channel_id, bot)
        .await?;

    if granted.contains(Permissions::MANAGE_ROLES) {
        Ok(())
    } else {
        Err(CommandError::validation(
            "Please make sure I have the `MANAGE_ROLES` permission in this channel and retry.",
        ))
    }
}

/// Hidden from `@everyone`, visible to the bot and one member
pub fn private_overwrites(guild: GuildId, bot: UserId, user: UserId) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(everyone_role(guild)),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user),
        },
    ]
}

fn mention(channel: ChannelId) -> String {
    format!("<#{}>", channel.0)
}

pub struct ModEveryone;

#[async_trait]
impl SlashCommand for ModEveryone {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let platform = &invocation.ctx.platform;

        let permissions = platform.everyone_permissions(guild).await? | MOD_PERMISSIONS;
        platform.set_everyone_permissions(guild, permissions).await?;
        Ok(Reply::text("Added mod permissions to `@everyone`."))
    }
}

pub struct UnmodEveryone;

#[async_trait]
impl SlashCommand for UnmodEveryone {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let platform = &invocation.ctx.platform;

        let mut permissions = platform.everyone_permissions(guild).await?;
        permissions.remove(MOD_PERMISSIONS);
        platform.set_everyone_permissions(guild, permissions).await?;
        Ok(Reply::text("Removed mod permissions from `@everyone`."))
    }
}

pub struct CreateMod;

#[async_trait]
impl SlashCommand for CreateMod {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let platform = &invocation.ctx.platform;

        let roles = platform.role_names(guild).await?;
        if roles.iter().any(|name| name == MOD_ROLE) {
            return Ok(Reply::text(
                "A role with the name \"Mod\" already exists on this server.",
            ));
        }

        platform.create_role(guild, MOD_ROLE, MOD_PERMISSIONS).await?;
        Ok(Reply::text("Created Mod role."))
    }
}

pub struct CheckMod;

#[async_trait]
impl SlashCommand for CheckMod {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let roles = invocation
            .ctx
            .platform
            .member_role_names(guild, invocation.user_id)
            .await?;

        if roles.iter().any(|name| name == MOD_ROLE) {
            Ok(Reply::text("You do have a role called Mod."))
        } else {
            Ok(Reply::text("You don't have a role called Mod."))
        }
    }
}

pub struct CanKick;

#[async_trait]
impl SlashCommand for CanKick {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let permissions = invocation
            .ctx
            .platform
            .member_permissions(guild, invocation.user_id)
            .await?;

        if permissions.contains(Permissions::KICK_MEMBERS) {
            Ok(Reply::text("You can kick members."))
        } else {
            Ok(Reply::text("You cannot kick members."))
        }
    }
}

pub struct MakePrivate;

#[async_trait]
impl SlashCommand for MakePrivate {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        ensure_bot_manages_roles(invocation, guild).await?;

        let platform = &invocation.ctx.platform;
        let bot = platform.bot_user_id().await?;
        platform
            .set_channel_overwrites(
                invocation.channel_id,
                private_overwrites(guild, bot, invocation.user_id),
            )
            .await?;
        Ok(Reply::text(format!(
            "Made channel {} private.",
            mention(invocation.channel_id)
        )))
    }
}

pub struct CreatePrivate;

#[async_trait]
impl SlashCommand for CreatePrivate {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let platform = &invocation.ctx.platform;

        let bot = platform.bot_user_id().await?;
        platform
            .create_text_channel(
                guild,
                "private",
                private_overwrites(guild, bot, invocation.user_id),
            )
            .await?;
        Ok(Reply::text("Created a private channel."))
    }
}

pub struct Unprivate;

#[async_trait]
impl SlashCommand for Unprivate {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        ensure_bot_manages_roles(invocation, guild).await?;

        invocation
            .ctx
            .platform
            .delete_everyone_overwrite(guild, invocation.channel_id)
            .await?;
        Ok(Reply::text(format!(
            "Made channel {} public.",
            mention(invocation.channel_id)
        )))
    }
}

pub struct MyPermissions;

#[async_trait]
impl SlashCommand for MyPermissions {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let permissions = invocation
            .ctx
            .platform
            .member_channel_permissions(guild, invocation.channel_id, invocation.user_id)
            .await?;
        Ok(Reply::text(permission_report(permissions)))
    }
}

pub struct LockPermissions;

#[async_trait]
impl SlashCommand for LockPermissions {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let platform = &invocation.ctx.platform;

        let Some(category) = platform.channel_category(invocation.channel_id).await? else {
            return Ok(Reply::text("This channel is not placed under a category."));
        };
        ensure_bot_manages_roles(invocation, guild).await?;

        platform.sync_with_category(invocation.channel_id).await?;
        Ok(Reply::text(format!(
            "Synchronized overwrites of {} with the `{}` category.",
            mention(invocation.channel_id),
            category
        )))
    }
}

pub struct RolePermissions;

#[async_trait]
impl SlashCommand for RolePermissions {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let permissions = invocation
            .ctx
            .platform
            .highest_role_channel_permissions(guild, invocation.channel_id, invocation.user_id)
            .await?;
        Ok(Reply::text(permission_report(permissions)))
    }
}
