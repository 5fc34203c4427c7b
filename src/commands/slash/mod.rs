//! # Slash Commands (/)
//!
//! The guide's example commands, one registry entry each, and their
//! conversion into Discord application command definitions.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Definitions derived from the command registry
//! - 1.0.0: Reorganized from monolithic slash_commands.rs

mod basic;
mod permissions;
mod prune;
mod rest_api;

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

use super::registry::{CommandDescriptor, CommandRegistry};
use crate::error::RegistryError;

pub use permissions::{DEMO_BOT_PERMISSIONS, MOD_PERMISSIONS};
pub use prune::{MAX_PRUNE, MIN_PRUNE};

/// Registers every example command
pub fn register_all(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    // Basic commands
    basic::register(registry)?;

    // Moderation
    prune::register(registry)?;

    // Web API lookups
    rest_api::register(registry)?;

    // Permission demonstrations
    permissions::register(registry)?;

    Ok(())
}

/// Builds a registry holding every example command
pub fn build_registry() -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}

/// Creates the Discord definition of one command
pub fn create_application_command(descriptor: &CommandDescriptor) -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name(&descriptor.identifier)
        .description(&descriptor.description);

    if descriptor.guild_only {
        command.dm_permission(false);
    }

    for option in &descriptor.options {
        command.create_option(|builder| {
            builder
                .name(&option.name)
                .description(&option.description)
                .kind(option.kind.into())
                .required(option.required)
        });
    }

    command
}

/// Creates all slash command definitions
pub fn create_slash_commands(registry: &CommandRegistry) -> Vec<CreateApplicationCommand> {
    registry
        .descriptors()
        .map(create_application_command)
        .collect()
}

/// Registers all slash commands globally
pub async fn register_global_commands(ctx: &Context, registry: &CommandRegistry) -> Result<()> {
    let slash_commands = create_slash_commands(registry);

    Command::set_global_application_commands(&ctx.http, |commands| {
        for command in slash_commands {
            commands.add_application_command(command);
        }
        commands
    })
    .await?;

    info!("Global slash commands registered successfully");
    Ok(())
}

/// Registers all slash commands for a specific guild (faster for testing)
pub async fn register_guild_commands(
    ctx: &Context,
    registry: &CommandRegistry,
    guild_id: GuildId,
) -> Result<()> {
    let slash_commands = create_slash_commands(registry);

    guild_id
        .set_application_commands(&ctx.http, |commands| {
            for command in slash_commands {
                commands.add_application_command(command);
            }
            commands
        })
        .await?;

    info!(
        "Guild slash commands registered successfully for guild: {}",
        guild_id
    );
    Ok(())
}
