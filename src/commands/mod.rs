//! # Command System
//!
//! Command dispatch convention: a registry maps each command identifier to a
//! descriptor and a handler, the dispatcher validates the declared options and
//! runs the handler, and every handled interaction yields exactly one reply.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Registry-driven dispatch, one handler per identifier
//! - 1.0.0: Initial reorganization with modular command structure

pub mod dispatcher;
pub mod options;
pub mod registry;
pub mod slash;

pub use dispatcher::{
    BotContext, Dispatcher, InboundInteraction, Invocation, Preparation, PreparedCommand,
    SlashCommand,
};
pub use options::{extract_options, OptionValue, OptionValues, SuppliedOptions};
pub use registry::{CommandDescriptor, CommandRegistry, OptionKind, OptionSpec};
pub use slash::{
    build_registry, create_slash_commands, register_global_commands, register_guild_commands,
};
