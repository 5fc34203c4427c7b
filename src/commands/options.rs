//! Option extraction: raw supplied values → typed values checked against the
//! command's declared options.

use serde_json::Value;
use serenity::model::application::interaction::application_command::CommandDataOption;
use serenity::model::id::{ChannelId, RoleId, UserId};
use std::collections::BTreeMap;

use super::registry::{CommandDescriptor, OptionKind, OptionSpec};
use crate::error::CommandError;

/// Raw option values as supplied by the transport, keyed by option name.
pub type SuppliedOptions = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
}

impl OptionValue {
    /// Parses a raw value as `kind`. Snowflakes arrive as strings.
    pub fn parse(kind: OptionKind, raw: &Value) -> Option<Self> {
        match kind {
            OptionKind::String => raw.as_str().map(|s| OptionValue::String(s.to_string())),
            OptionKind::Integer => raw.as_i64().map(OptionValue::Integer),
            OptionKind::Boolean => raw.as_bool().map(OptionValue::Boolean),
            OptionKind::User => parse_snowflake(raw).map(|id| OptionValue::User(UserId(id))),
            OptionKind::Channel => {
                parse_snowflake(raw).map(|id| OptionValue::Channel(ChannelId(id)))
            }
            OptionKind::Role => parse_snowflake(raw).map(|id| OptionValue::Role(RoleId(id))),
        }
    }
}

fn parse_snowflake(raw: &Value) -> Option<u64> {
    raw.as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| raw.as_u64())
}

/// Validated option values handed to a handler. Only declared options are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionValues {
    values: BTreeMap<String, OptionValue>,
}

impl OptionValues {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(OptionValue::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<UserId> {
        match self.values.get(name) {
            Some(OptionValue::User(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        match self.values.get(name) {
            Some(OptionValue::Channel(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<RoleId> {
        match self.values.get(name) {
            Some(OptionValue::Role(value)) => Some(*value),
            _ => None,
        }
    }

    /// For required options, which the dispatcher has already checked.
    pub fn required_string(&self, name: &str) -> Result<&str, CommandError> {
        self.string(name).ok_or_else(|| missing(name))
    }

    pub fn required_integer(&self, name: &str) -> Result<i64, CommandError> {
        self.integer(name).ok_or_else(|| missing(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn missing(name: &str) -> CommandError {
    CommandError::validation(format!("Missing required option `{}`.", name))
}

fn mistyped(spec: &OptionSpec) -> CommandError {
    CommandError::validation(format!(
        "Option `{}` must be of type {}.",
        spec.name,
        spec.kind.as_str()
    ))
}

/// Checks `supplied` against the descriptor's declared options.
///
/// Missing required options and values of the wrong type are validation
/// failures. Supplied options the descriptor doesn't declare are dropped.
pub fn extract_options(
    descriptor: &CommandDescriptor,
    supplied: &SuppliedOptions,
) -> Result<OptionValues, CommandError> {
    let mut values = BTreeMap::new();

    for spec in &descriptor.options {
        match supplied.get(&spec.name) {
            Some(Value::Null) | None => {
                if spec.required {
                    return Err(missing(&spec.name));
                }
            }
            Some(raw) => {
                let value = OptionValue::parse(spec.kind, raw).ok_or_else(|| mistyped(spec))?;
                values.insert(spec.name.clone(), value);
            }
        }
    }

    Ok(OptionValues { values })
}

/// Collects the values of a gateway interaction's top-level options.
pub fn supplied_from_gateway(options: &[CommandDataOption]) -> SuppliedOptions {
    options
        .iter()
        .filter_map(|option| {
            option
                .value
                .as_ref()
                .map(|value| (option.name.clone(), value.clone()))
        })
        .collect()
}

/// Collects option values from an interaction webhook's `data.options` array.
pub fn supplied_from_json(options: Option<&Value>) -> SuppliedOptions {
    options
        .and_then(|options| options.as_array())
        .map(|options| {
            options
                .iter()
                .filter_map(|option| {
                    let name = option.get("name")?.as_str()?;
                    let value = option.get("value")?;
                    Some((name.to_string(), value.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prune_descriptor() -> CommandDescriptor {
        CommandDescriptor::new("prune", "Prune up to 100 messages.")
            .option(
                OptionSpec::new("amount", "Number of messages to prune", OptionKind::Integer)
                    .required(),
            )
            .option(OptionSpec::new("reason", "Why", OptionKind::String))
            .option(OptionSpec::new("target", "Whose messages", OptionKind::User))
    }

    fn supplied(pairs: &[(&str, Value)]) -> SuppliedOptions {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_extracts_declared_options() {
        let values = extract_options(
            &prune_descriptor(),
            &supplied(&[
                ("amount", json!(50)),
                ("reason", json!("spam")),
                ("target", json!("80351110224678912")),
            ]),
        )
        .unwrap();

        assert_eq!(values.integer("amount"), Some(50));
        assert_eq!(values.string("reason"), Some("spam"));
        assert_eq!(values.user("target"), Some(UserId(80351110224678912)));
    }

    #[test]
    fn test_missing_required_option() {
        let err = extract_options(&prune_descriptor(), &supplied(&[("reason", json!("spam"))]))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Missing required option `amount`.");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = extract_options(&prune_descriptor(), &supplied(&[("amount", Value::Null)]))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = extract_options(&prune_descriptor(), &supplied(&[("amount", json!("fifty"))]))
            .unwrap_err();
        assert_eq!(err.user_message(), "Option `amount` must be of type integer.");
    }

    #[test]
    fn test_optional_options_may_be_absent() {
        let values =
            extract_options(&prune_descriptor(), &supplied(&[("amount", json!(2))])).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.string("reason"), None);
    }

    #[test]
    fn test_undeclared_options_dropped() {
        let values = extract_options(
            &prune_descriptor(),
            &supplied(&[("amount", json!(5)), ("sneaky", json!("value"))]),
        )
        .unwrap();
        assert!(values.get("sneaky").is_none());
    }

    #[test]
    fn test_typed_getters_do_not_coerce() {
        let values =
            extract_options(&prune_descriptor(), &supplied(&[("amount", json!(5))])).unwrap();
        assert_eq!(values.string("amount"), None);
        assert!(values.required_string("amount").is_err());
        assert_eq!(values.required_integer("amount").unwrap(), 5);
    }

    #[test]
    fn test_supplied_from_json() {
        let raw = json!([
            {"name": "term", "type": 3, "value": "yeet"},
            {"name": "broken", "type": 3}
        ]);
        let options = supplied_from_json(Some(&raw));
        assert_eq!(options.len(), 1);
        assert_eq!(options.get("term"), Some(&json!("yeet")));

        assert!(supplied_from_json(None).is_empty());
    }

    #[test]
    fn test_snowflake_parsing() {
        assert_eq!(
            OptionValue::parse(OptionKind::Channel, &json!("123")),
            Some(OptionValue::Channel(ChannelId(123)))
        );
        assert_eq!(
            OptionValue::parse(OptionKind::Role, &json!(456)),
            Some(OptionValue::Role(RoleId(456)))
        );
        assert_eq!(OptionValue::parse(OptionKind::Role, &json!("abc")), None);
    }
}
