//! # Dispatcher
//!
//! Routes one inbound interaction to its handler:
//!
//! 1. resolve the identifier (unknown identifiers are dropped, no reply)
//! 2. check guild-only and bot permission preconditions
//! 3. extract and validate the declared options
//! 4. run the handler under a timeout
//!
//! Steps 1 to 3 are [`Dispatcher::prepare`], step 4 is [`Dispatcher::execute`],
//! so a transport can reject bad input before it acknowledges a deferred
//! command. Every resolved interaction yields exactly one [`Reply`]; handler
//! failures are turned into a reply here rather than propagated to the
//! transport.

use log::{debug, error, info, warn};
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;

use super::options::{extract_options, OptionValues, SuppliedOptions};
use super::registry::{CommandDescriptor, CommandRegistry};
use crate::error::CommandError;
use crate::platform::Platform;
use crate::reply::Reply;
use crate::web_apis::WebApis;

/// Services handed to every handler. Built by the transport, never global.
#[derive(Clone)]
pub struct BotContext {
    pub platform: Arc<dyn Platform>,
    pub web: Arc<dyn WebApis>,
}

impl BotContext {
    pub fn new(platform: Arc<dyn Platform>, web: Arc<dyn WebApis>) -> Self {
        BotContext { platform, web }
    }
}

/// One user-triggered command invocation, as received from a transport
#[derive(Debug, Clone)]
pub struct InboundInteraction {
    pub command: String,
    pub options: SuppliedOptions,
    pub user_id: UserId,
    pub user_tag: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
}

/// What a handler sees: validated options plus who invoked it and where.
pub struct Invocation<'a> {
    pub ctx: &'a BotContext,
    pub options: OptionValues,
    pub user_id: UserId,
    pub user_tag: &'a str,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
}

impl Invocation<'_> {
    pub fn guild(&self) -> Result<GuildId, CommandError> {
        self.guild_id.ok_or_else(|| CommandError::validation(GUILD_ONLY))
    }
}

const GUILD_ONLY: &str = "This command can only be used inside a server.";

#[async_trait]
pub trait SlashCommand: Send + Sync {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError>;
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    handler_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, handler_timeout: Duration) -> Self {
        Dispatcher {
            registry,
            handler_timeout,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Resolves the interaction and checks everything that can be checked
    /// before the handler runs. `None` for unknown commands.
    pub async fn prepare(
        &self,
        ctx: &BotContext,
        interaction: &InboundInteraction,
    ) -> Option<Preparation> {
        let (descriptor, handler) = match self.registry.resolve(&interaction.command) {
            Ok(found) => found,
            Err(e) => {
                debug!("Dropping interaction: {}", e);
                return None;
            }
        };

        let preparation = match check_preconditions(ctx, descriptor, interaction).await {
            Ok(options) => Preparation::Ready(PreparedCommand {
                identifier: descriptor.identifier.clone(),
                defer: descriptor.defer,
                handler: handler.clone(),
                options,
            }),
            Err(e) => Preparation::Rejected(failure_reply(&descriptor.identifier, e)),
        };
        Some(preparation)
    }

    /// Runs a prepared command's handler under the handler timeout
    pub async fn execute(
        &self,
        ctx: &BotContext,
        interaction: &InboundInteraction,
        prepared: PreparedCommand,
    ) -> Reply {
        info!(
            "Dispatching /{} from user: {}",
            prepared.identifier, interaction.user_id
        );

        let invocation = Invocation {
            ctx,
            options: prepared.options,
            user_id: interaction.user_id,
            user_tag: &interaction.user_tag,
            guild_id: interaction.guild_id,
            channel_id: interaction.channel_id,
        };

        let result = match tokio::time::timeout(
            self.handler_timeout,
            prepared.handler.execute(&invocation),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CommandError::Timeout(self.handler_timeout)),
        };

        result.unwrap_or_else(|e| failure_reply(&prepared.identifier, e))
    }

    /// Prepares and executes in one go, with no acknowledgement in between
    pub async fn dispatch(
        &self,
        ctx: &BotContext,
        interaction: &InboundInteraction,
    ) -> Option<Reply> {
        match self.prepare(ctx, interaction).await? {
            Preparation::Rejected(reply) => Some(reply),
            Preparation::Ready(prepared) => Some(self.execute(ctx, interaction, prepared).await),
        }
    }
}

/// A resolved command whose preconditions and options passed
pub struct PreparedCommand {
    identifier: String,
    defer: bool,
    handler: Arc<dyn SlashCommand>,
    options: OptionValues,
}

impl PreparedCommand {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether the transport should acknowledge before executing
    pub fn should_defer(&self) -> bool {
        self.defer
    }
}

pub enum Preparation {
    Ready(PreparedCommand),
    /// Failed a precondition or option check; send this reply instead
    Rejected(Reply),
}

async fn check_preconditions(
    ctx: &BotContext,
    descriptor: &CommandDescriptor,
    interaction: &InboundInteraction,
) -> Result<OptionValues, CommandError> {
    if descriptor.guild_only && interaction.guild_id.is_none() {
        return Err(CommandError::validation(GUILD_ONLY));
    }

    if !descriptor.bot_permissions.is_empty() {
        check_bot_permissions(ctx, descriptor, interaction).await?;
    }

    extract_options(descriptor, &interaction.options)
}

async fn check_bot_permissions(
    ctx: &BotContext,
    descriptor: &CommandDescriptor,
    interaction: &InboundInteraction,
) -> Result<(), CommandError> {
    let guild = interaction
        .guild_id
        .ok_or_else(|| CommandError::validation(GUILD_ONLY))?;
    let bot = ctx.platform.bot_user_id().await?;
    let granted = ctx.platform.member_permissions(guild, bot).await?;

    if granted.contains(descriptor.bot_permissions) {
        return Ok(());
    }

    Err(CommandError::validation(format!(
        "I need the permissions {} for this demonstration to work properly",
        descriptor.bot_permissions.get_permission_names().join(", ")
    )))
}

fn failure_reply(command: &str, err: CommandError) -> Reply {
    if err.is_validation() {
        warn!("Rejected /{}: {}", command, err);
    } else {
        error!("Error handling slash command '{}': {}", command, err);
    }
    Reply::ephemeral(err.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry::{OptionKind, OptionSpec};
    use crate::error::GENERIC_FAILURE;
    use crate::testing::{interaction, FailingCommand, FakePlatform, FakeWeb, FixedReply, SlowCommand};
    use serde_json::json;
    use serenity::model::permissions::Permissions;

    struct Fixture {
        dispatcher: Dispatcher,
        echo: Arc<FixedReply>,
        ctx: BotContext,
    }

    fn fixture(platform: FakePlatform) -> Fixture {
        let echo = Arc::new(FixedReply::new("echoed"));
        let mut registry = CommandRegistry::new();
        registry
            .register(
                CommandDescriptor::new("echo", "Echo the input").option(
                    OptionSpec::new("input", "The input to echo back", OptionKind::String)
                        .required(),
                ),
                echo.clone(),
            )
            .unwrap();
        registry
            .register(
                CommandDescriptor::new("guarded", "Needs bot permissions")
                    .guild_only()
                    .bot_permissions(Permissions::MANAGE_ROLES | Permissions::KICK_MEMBERS),
                Arc::new(FixedReply::new("guarded ok")),
            )
            .unwrap();
        registry
            .register(
                CommandDescriptor::new("broken", "Always fails"),
                Arc::new(FailingCommand),
            )
            .unwrap();
        registry
            .register(
                CommandDescriptor::new("slow", "Never finishes in time").deferred(),
                Arc::new(SlowCommand(Duration::from_secs(5))),
            )
            .unwrap();

        Fixture {
            dispatcher: Dispatcher::new(Arc::new(registry), Duration::from_millis(100)),
            echo,
            ctx: BotContext::new(Arc::new(platform), Arc::new(FakeWeb::default())),
        }
    }

    #[tokio::test]
    async fn test_dispatch_invokes_matching_handler_once() {
        let f = fixture(FakePlatform::default());
        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("echo", &[("input", json!("hello"))]))
            .await;

        assert_eq!(reply.unwrap().content(), "echoed");
        assert_eq!(f.echo.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_dropped() {
        let f = fixture(FakePlatform::default());
        let reply = f.dispatcher.dispatch(&f.ctx, &interaction("nope", &[])).await;

        assert!(reply.is_none());
        assert_eq!(f.echo.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_option_skips_handler() {
        let f = fixture(FakePlatform::default());
        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("echo", &[]))
            .await
            .unwrap();

        assert!(reply.ephemeral);
        assert_eq!(reply.content(), "Missing required option `input`.");
        assert_eq!(f.echo.calls(), 0);
    }

    #[tokio::test]
    async fn test_guild_only_rejects_direct_messages() {
        let f = fixture(FakePlatform::default());
        let mut dm = interaction("guarded", &[]);
        dm.guild_id = None;

        let reply = f.dispatcher.dispatch(&f.ctx, &dm).await.unwrap();
        assert_eq!(reply.content(), GUILD_ONLY);
    }

    #[tokio::test]
    async fn test_missing_bot_permissions() {
        let platform = FakePlatform {
            bot_permissions: Permissions::MANAGE_ROLES,
            ..Default::default()
        };
        let f = fixture(platform);

        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("guarded", &[]))
            .await
            .unwrap();
        assert!(reply.content().starts_with("I need the permissions"));
        assert!(reply
            .content()
            .contains(Permissions::KICK_MEMBERS.get_permission_names()[0]));
    }

    #[tokio::test]
    async fn test_bot_permissions_present() {
        let f = fixture(FakePlatform::default());
        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("guarded", &[]))
            .await
            .unwrap();
        assert_eq!(reply.content(), "guarded ok");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_generic_reply() {
        let f = fixture(FakePlatform::default());
        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("broken", &[]))
            .await
            .unwrap();
        assert_eq!(reply.content(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_handler_timeout_becomes_generic_reply() {
        let f = fixture(FakePlatform::default());
        let reply = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("slow", &[]))
            .await
            .unwrap();
        assert_eq!(reply.content(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_dispatches_are_independent() {
        let f = fixture(FakePlatform::default());
        let failed = f.dispatcher.dispatch(&f.ctx, &interaction("broken", &[])).await;
        let ok = f
            .dispatcher
            .dispatch(&f.ctx, &interaction("echo", &[("input", json!("again"))]))
            .await;

        assert_eq!(failed.unwrap().content(), GENERIC_FAILURE);
        assert_eq!(ok.unwrap().content(), "echoed");
    }

    #[tokio::test]
    async fn test_prepare_reports_deferral() {
        let f = fixture(FakePlatform::default());

        let Some(Preparation::Ready(slow)) = f.dispatcher.prepare(&f.ctx, &interaction("slow", &[])).await
        else {
            panic!("slow should be ready");
        };
        assert!(slow.should_defer());
        assert_eq!(slow.identifier(), "slow");

        let echo = interaction("echo", &[("input", json!("hi"))]);
        let Some(Preparation::Ready(echo)) = f.dispatcher.prepare(&f.ctx, &echo).await else {
            panic!("echo should be ready");
        };
        assert!(!echo.should_defer());

        assert!(f.dispatcher.prepare(&f.ctx, &interaction("nope", &[])).await.is_none());
    }

    #[tokio::test]
    async fn test_prepare_rejects_without_running_handler() {
        let f = fixture(FakePlatform::default());
        let Some(Preparation::Rejected(reply)) =
            f.dispatcher.prepare(&f.ctx, &interaction("echo", &[])).await
        else {
            panic!("missing option should be rejected");
        };

        assert!(reply.ephemeral);
        assert_eq!(reply.content(), "Missing required option `input`.");
        assert_eq!(f.echo.calls(), 0);
    }

    #[tokio::test]
    async fn test_execute_prepared_command() {
        let f = fixture(FakePlatform::default());
        let inbound = interaction("echo", &[("input", json!("later"))]);
        let Some(Preparation::Ready(prepared)) = f.dispatcher.prepare(&f.ctx, &inbound).await
        else {
            panic!("echo should be ready");
        };
        assert_eq!(f.echo.calls(), 0);

        let reply = f.dispatcher.execute(&f.ctx, &inbound, prepared).await;
        assert_eq!(reply.content(), "echoed");
        assert_eq!(f.echo.calls(), 1);
    }
}
