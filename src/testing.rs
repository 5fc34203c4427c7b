//! In-memory fakes of the platform and web services for unit tests.

use serde_json::Value;
use serenity::async_trait;
use serenity::model::channel::PermissionOverwrite;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::commands::{Invocation, InboundInteraction, SlashCommand};
use crate::error::CommandError;
use crate::platform::{GuildSummary, Platform, PlatformResult};
use crate::reply::Reply;
use crate::web_apis::{Definition, WebApis};

pub const GUILD: GuildId = GuildId(100);
pub const CHANNEL: ChannelId = ChannelId(200);
pub const USER: UserId = UserId(300);
pub const BOT: UserId = UserId(999);

pub fn interaction(command: &str, options: &[(&str, Value)]) -> InboundInteraction {
    InboundInteraction {
        command: command.to_string(),
        options: options
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
        user_id: USER,
        user_tag: "tester#0001".to_string(),
        guild_id: Some(GUILD),
        channel_id: CHANNEL,
    }
}

/// Replies with fixed text and counts invocations
pub struct FixedReply {
    text: String,
    calls: AtomicUsize,
}

impl FixedReply {
    pub fn new(text: &str) -> Self {
        FixedReply {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlashCommand for FixedReply {
    async fn execute(&self, _invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::text(self.text.clone()))
    }
}

pub struct FailingCommand;

#[async_trait]
impl SlashCommand for FailingCommand {
    async fn execute(&self, _invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        Err(CommandError::transport("simulated failure"))
    }
}

pub struct SlowCommand(pub Duration);

#[async_trait]
impl SlashCommand for SlowCommand {
    async fn execute(&self, _invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        tokio::time::sleep(self.0).await;
        Ok(Reply::text("too late"))
    }
}

/// A guild with one channel, one invoking member and the bot.
pub struct FakePlatform {
    pub bot_permissions: Permissions,
    pub bot_channel_permissions: Permissions,
    pub member_permissions: Permissions,
    pub member_channel_permissions: Permissions,
    pub role_channel_permissions: Permissions,
    pub member_roles: Vec<String>,
    pub roles: Mutex<Vec<String>>,
    pub everyone: Mutex<Permissions>,
    pub category: Option<String>,
    pub fail_writes: bool,
    pub deleted: Mutex<Option<u64>>,
    pub overwrites: Mutex<Vec<PermissionOverwrite>>,
    pub created_channels: Mutex<Vec<(String, Vec<PermissionOverwrite>)>>,
    pub synced: Mutex<bool>,
    pub everyone_overwrite_deleted: Mutex<bool>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        FakePlatform {
            bot_permissions: Permissions::MANAGE_MESSAGES
                | Permissions::KICK_MEMBERS
                | Permissions::MANAGE_ROLES
                | Permissions::MANAGE_CHANNELS,
            bot_channel_permissions: Permissions::MANAGE_ROLES | Permissions::SEND_MESSAGES,
            member_permissions: Permissions::SEND_MESSAGES,
            member_channel_permissions: Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL,
            role_channel_permissions: Permissions::VIEW_CHANNEL,
            member_roles: Vec::new(),
            roles: Mutex::new(vec!["@everyone".to_string()]),
            everyone: Mutex::new(Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL),
            category: Some("General".to_string()),
            fail_writes: false,
            deleted: Mutex::new(None),
            overwrites: Mutex::new(Vec::new()),
            created_channels: Mutex::new(Vec::new()),
            synced: Mutex::new(false),
            everyone_overwrite_deleted: Mutex::new(false),
        }
    }
}

impl FakePlatform {
    fn write(&self) -> PlatformResult<()> {
        if self.fail_writes {
            Err(CommandError::transport("simulated Discord failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn bot_user_id(&self) -> PlatformResult<UserId> {
        Ok(BOT)
    }

    async fn guild_summary(&self, _guild: GuildId) -> PlatformResult<GuildSummary> {
        Ok(GuildSummary {
            name: "Test Server".to_string(),
            member_count: Some(42),
        })
    }

    async fn member_permissions(
        &self,
        _guild: GuildId,
        user: UserId,
    ) -> PlatformResult<Permissions> {
        Ok(if user == BOT {
            self.bot_permissions
        } else {
            self.member_permissions
        })
    }

    async fn member_channel_permissions(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
        user: UserId,
    ) -> PlatformResult<Permissions> {
        Ok(if user == BOT {
            self.bot_channel_permissions
        } else {
            self.member_channel_permissions
        })
    }

    async fn highest_role_channel_permissions(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
        _user: UserId,
    ) -> PlatformResult<Permissions> {
        Ok(self.role_channel_permissions)
    }

    async fn member_role_names(
        &self,
        _guild: GuildId,
        _user: UserId,
    ) -> PlatformResult<Vec<String>> {
        Ok(self.member_roles.clone())
    }

    async fn role_names(&self, _guild: GuildId) -> PlatformResult<Vec<String>> {
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn everyone_permissions(&self, _guild: GuildId) -> PlatformResult<Permissions> {
        Ok(*self.everyone.lock().unwrap())
    }

    async fn set_everyone_permissions(
        &self,
        _guild: GuildId,
        permissions: Permissions,
    ) -> PlatformResult<()> {
        self.write()?;
        *self.everyone.lock().unwrap() = permissions;
        Ok(())
    }

    async fn create_role(
        &self,
        _guild: GuildId,
        name: &str,
        _permissions: Permissions,
    ) -> PlatformResult<()> {
        self.write()?;
        self.roles.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn bulk_delete(&self, _channel: ChannelId, amount: u64) -> PlatformResult<usize> {
        self.write()?;
        *self.deleted.lock().unwrap() = Some(amount);
        Ok(amount as usize)
    }

    async fn set_channel_overwrites(
        &self,
        _channel: ChannelId,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<()> {
        self.write()?;
        *self.overwrites.lock().unwrap() = overwrites;
        Ok(())
    }

    async fn delete_everyone_overwrite(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
    ) -> PlatformResult<()> {
        self.write()?;
        *self.everyone_overwrite_deleted.lock().unwrap() = true;
        Ok(())
    }

    async fn create_text_channel(
        &self,
        _guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> PlatformResult<ChannelId> {
        self.write()?;
        self.created_channels
            .lock()
            .unwrap()
            .push((name.to_string(), overwrites));
        Ok(ChannelId(201))
    }

    async fn channel_category(&self, _channel: ChannelId) -> PlatformResult<Option<String>> {
        Ok(self.category.clone())
    }

    async fn sync_with_category(&self, _channel: ChannelId) -> PlatformResult<()> {
        self.write()?;
        *self.synced.lock().unwrap() = true;
        Ok(())
    }
}

/// Web services returning canned data; `None` simulates an HTTP failure.
#[derive(Default)]
pub struct FakeWeb {
    pub cat_url: Option<String>,
    pub definitions: Option<Vec<Definition>>,
    pub image: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl FakeWeb {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebApis for FakeWeb {
    async fn random_cat(&self) -> Result<String, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cat_url
            .clone()
            .ok_or_else(|| CommandError::transport("random.cat is down"))
    }

    async fn define(&self, _term: &str) -> Result<Vec<Definition>, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.definitions
            .clone()
            .ok_or_else(|| CommandError::transport("Urban Dictionary is down"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image
            .clone()
            .ok_or_else(|| CommandError::transport(format!("{} is unreachable", url)))
    }
}
