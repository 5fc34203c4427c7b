//! Basic slash commands: /ping, /server, /user-info, /options-info

use serenity::async_trait;
use std::sync::Arc;

use crate::commands::dispatcher::{Invocation, SlashCommand};
use crate::commands::registry::{CommandDescriptor, CommandRegistry, OptionKind, OptionSpec};
use crate::error::{CommandError, RegistryError};
use crate::reply::Reply;

/// Registers basic commands
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandDescriptor::new("ping", "Replies with Pong!"),
        Arc::new(Ping),
    )?;
    registry.register(
        CommandDescriptor::new("server", "Display info about this server.").guild_only(),
        Arc::new(Server),
    )?;
    registry.register(
        CommandDescriptor::new("user-info", "Display info about yourself."),
        Arc::new(UserInfo),
    )?;
    registry.register(
        CommandDescriptor::new("options-info", "Information about the options provided.")
            .option(OptionSpec::new(
                "input",
                "The input to echo back",
                OptionKind::String,
            )),
        Arc::new(OptionsInfo),
    )?;
    Ok(())
}

pub struct Ping;

#[async_trait]
impl SlashCommand for Ping {
    async fn execute(&self, _invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        Ok(Reply::text("Pong!"))
    }
}

pub struct Server;

#[async_trait]
impl SlashCommand for Server {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let guild = invocation.guild()?;
        let summary = invocation.ctx.platform.guild_summary(guild).await?;

        let members = summary
            .member_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Reply::text(format!(
            "Server name: {}\nTotal members: {}",
            summary.name, members
        )))
    }
}

pub struct UserInfo;

#[async_trait]
impl SlashCommand for UserInfo {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        Ok(Reply::text(format!(
            "Your tag: {}\nYour id: {}",
            invocation.user_tag, invocation.user_id
        )))
    }
}

/// Echoes the optional `input` option
pub struct OptionsInfo;

#[async_trait]
impl SlashCommand for OptionsInfo {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        match invocation.options.string("input") {
            Some(value) => Ok(Reply::text(format!("The options value is: `{}`", value))),
            None => Ok(Reply::text("No option was provided!")),
        }
    }
}
