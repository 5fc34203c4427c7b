//! Command registry: identifier → descriptor + handler.

use serenity::model::application::command::CommandOptionType;
use serenity::model::permissions::Permissions;
use std::collections::HashMap;
use std::sync::Arc;

use super::dispatcher::SlashCommand;
use crate::error::RegistryError;

/// Value type of a declared option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Boolean => "boolean",
            OptionKind::User => "user",
            OptionKind::Channel => "channel",
            OptionKind::Role => "role",
        }
    }
}

impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
        }
    }
}

/// One declared input of a command
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionKind) -> Self {
        OptionSpec {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static registration record for a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDescriptor {
    pub identifier: String,
    pub description: String,
    pub options: Vec<OptionSpec>,
    /// Acknowledge first, reply once the handler's external call returns
    pub defer: bool,
    /// Refuse invocations outside a guild
    pub guild_only: bool,
    /// Permissions the bot must hold in the guild before the handler runs
    pub bot_permissions: Permissions,
}

impl CommandDescriptor {
    pub fn new(identifier: impl Into<String>, description: impl Into<String>) -> Self {
        CommandDescriptor {
            identifier: identifier.into(),
            description: description.into(),
            options: Vec::new(),
            defer: false,
            guild_only: false,
            bot_permissions: Permissions::empty(),
        }
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn deferred(mut self) -> Self {
        self.defer = true;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn bot_permissions(mut self, permissions: Permissions) -> Self {
        self.bot_permissions = permissions;
        self
    }

    pub fn required_options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.iter().filter(|option| option.required)
    }
}

struct RegisteredCommand {
    descriptor: CommandDescriptor,
    handler: Arc<dyn SlashCommand>,
}

/// Built once at startup, read-only afterwards.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, RegisteredCommand>,
    order: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: CommandDescriptor,
        handler: Arc<dyn SlashCommand>,
    ) -> Result<(), RegistryError> {
        if self.commands.contains_key(&descriptor.identifier) {
            return Err(RegistryError::Duplicate(descriptor.identifier));
        }

        for (index, option) in descriptor.options.iter().enumerate() {
            if descriptor.options[..index].iter().any(|o| o.name == option.name) {
                return Err(RegistryError::DuplicateOption {
                    command: descriptor.identifier.clone(),
                    option: option.name.clone(),
                });
            }
        }

        self.order.push(descriptor.identifier.clone());
        self.commands.insert(
            descriptor.identifier.clone(),
            RegisteredCommand {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, identifier: &str) -> Result<&CommandDescriptor, RegistryError> {
        self.commands
            .get(identifier)
            .map(|command| &command.descriptor)
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    pub(crate) fn resolve(
        &self,
        identifier: &str,
    ) -> Result<(&CommandDescriptor, &Arc<dyn SlashCommand>), RegistryError> {
        self.commands
            .get(identifier)
            .map(|command| (&command.descriptor, &command.handler))
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.order
            .iter()
            .filter_map(|identifier| self.commands.get(identifier))
            .map(|command| &command.descriptor)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
