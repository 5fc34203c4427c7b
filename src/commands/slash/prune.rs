//! Prune slash command: /prune

use log::error;
use serenity::async_trait;
use std::sync::Arc;

use crate::commands::dispatcher::{Invocation, SlashCommand};
use crate::commands::registry::{CommandDescriptor, CommandRegistry, OptionKind, OptionSpec};
use crate::error::{CommandError, RegistryError};
use crate::reply::Reply;

/// Bulk deletion accepts between 2 and 100 messages per request
pub const MIN_PRUNE: i64 = 2;
pub const MAX_PRUNE: i64 = 100;

/// Registers the prune command
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandDescriptor::new("prune", "Prune up to 100 messages.")
            .guild_only()
            .option(
                OptionSpec::new("amount", "Number of messages to prune", OptionKind::Integer)
                    .required(),
            ),
        Arc::new(Prune),
    )
}

pub struct Prune;

#[async_trait]
impl SlashCommand for Prune {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let amount = invocation.options.required_integer("amount")?;

        if !(MIN_PRUNE..=MAX_PRUNE).contains(&amount) {
            return Ok(Reply::ephemeral(format!(
                "You need to input a number between {} and {}.",
                MIN_PRUNE, MAX_PRUNE
            )));
        }

        match invocation
            .ctx
            .platform
            .bulk_delete(invocation.channel_id, amount as u64)
            .await
        {
            Ok(_) => Ok(Reply::ephemeral(format!(
                "Successfully pruned `{}` messages.",
                amount
            ))),
            Err(e) => {
                error!("Failed to prune messages in {}: {}", invocation.channel_id, e);
                Ok(Reply::ephemeral(
                    "There was an error trying to prune messages in this channel!",
                ))
            }
        }
    }
}
