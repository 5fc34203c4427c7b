//! Guild operations the command handlers rely on.
//!
//! Handlers only ever talk to the chat platform through this trait, which
//! keeps them independent of the client library and testable with fakes.

use serenity::async_trait;
use serenity::model::channel::PermissionOverwrite;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;

use crate::error::CommandError;

pub type PlatformResult<T> = Result<T, CommandError>;

/// Name and approximate size of a guild
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSummary {
    pub name: String,
    pub member_count: Option<u64>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn bot_user_id(&self) -> PlatformResult<UserId>;

    async fn guild_summary(&self, guild: GuildId) -> PlatformResult<GuildSummary>;

    /// Guild-level permissions of a member
    async fn member_permissions(&self, guild: GuildId, user: UserId)
        -> PlatformResult<Permissions>;

    /// Effective permissions of a member in one channel
    async fn member_channel_permissions(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> PlatformResult<Permissions>;

    /// Effective channel permissions of the member's highest role
    async fn highest_role_channel_permissions(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> PlatformResult<Permissions>;

    async fn member_role_names(&self, guild: GuildId, user: UserId)
        -> PlatformResult<Vec<String>>;

    async fn role_names(&self, guild: GuildId) -> PlatformResult<Vec<String>>;

    async fn everyone_permissions(&self, guild: GuildId) -> PlatformResult<Permissions>;

    async fn set_everyone_permissions(
        &self,
        guild: GuildId,
        permissions: Permissions,
    ) -> PlatformResult<()>;

    async fn create_role(
        &self,
        guild: GuildId,
        name: &str,
        permissions: Permissions,
    ) -> PlatformResult<()>;

    /// Deletes up to `amount` recent messages, skipping those older than two
    /// weeks. Returns how many were deleted.
    async fn bulk_delete(&self, channel: ChannelId, amount: u64) -> PlatformResult<usize>;

    /// Replaces every overwrite on the channel
    async fn set_channel_overwrites(
        &self,
        channel: ChannelId,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<()>;

    /// Removes the `@everyone` overwrite from the channel
    async fn delete_everyone_overwrite(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<()>;

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<ChannelId>;

    /// Name of the category the channel sits in, if any
    async fn channel_category(&self, channel: ChannelId) -> PlatformResult<Option<String>>;

    /// Copies the parent category's overwrites onto the channel
    async fn sync_with_category(&self, channel: ChannelId) -> PlatformResult<()>;
}
