//! Slash commands backed by public web APIs: /cat, /urban

use serenity::async_trait;
use std::sync::Arc;

use crate::commands::dispatcher::{Invocation, SlashCommand};
use crate::commands::registry::{CommandDescriptor, CommandRegistry, OptionKind, OptionSpec};
use crate::error::{CommandError, RegistryError};
use crate::reply::{Attachment, Embed, Reply};

pub const URBAN_COLOUR: u32 = 0xEFFF00;

/// Registers web API commands
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandDescriptor::new("cat", "Get a random cat picture.").deferred(),
        Arc::new(Cat),
    )?;
    registry.register(
        CommandDescriptor::new("urban", "Look up a term on Urban Dictionary.")
            .deferred()
            .option(OptionSpec::new("term", "The term to look up", OptionKind::String).required()),
        Arc::new(Urban),
    )?;
    Ok(())
}

pub struct Cat;

#[async_trait]
impl SlashCommand for Cat {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let file = invocation.ctx.web.random_cat().await?;
        Ok(Reply::attachment(Attachment {
            filename: "cat.png".to_string(),
            url: file,
        }))
    }
}

pub struct Urban;

#[async_trait]
impl SlashCommand for Urban {
    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Reply, CommandError> {
        let term = invocation.options.required_string("term")?;
        let definitions = invocation.ctx.web.define(term).await?;

        let Some(answer) = definitions.first() else {
            return Ok(Reply::text(format!("No results found for **{}**.", term)));
        };

        let embed = Embed::new()
            .colour(URBAN_COLOUR)
            .title(&answer.word)
            .url(&answer.permalink)
            .field("Definition", &answer.definition)
            .field("Example", &answer.example)
            .field(
                "Rating",
                &format!(
                    "{} thumbs up. {} thumbs down.",
                    answer.thumbs_up, answer.thumbs_down
                ),
            );
        Ok(Reply::embed(embed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{BotContext, Dispatcher};
    use crate::error::GENERIC_FAILURE;
    use crate::testing::{interaction, FakePlatform, FakeWeb};
    use crate::web_apis::Definition;
    use serde_json::json;
    use std::time::Duration;

    async fn run(web: Arc<FakeWeb>, command: &str, options: &[(&str, serde_json::Value)]) -> Reply {
        let mut registry = CommandRegistry::new();
        register(&mut registry).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(registry), Duration::from_secs(5));
        let ctx = BotContext::new(Arc::new(FakePlatform::default()), web);

        dispatcher
            .dispatch(&ctx, &interaction(command, options))
            .await
            .unwrap()
    }

    fn definition(text: &str) -> Definition {
        Definition {
            word: "yeet".to_string(),
            permalink: "https://yeet.urbanup.com/1".to_string(),
            definition: text.to_string(),
            example: "he yeeted the ball".to_string(),
            thumbs_up: 120,
            thumbs_down: 7,
        }
    }

    #[tokio::test]
    async fn test_cat_attaches_image() {
        let web = Arc::new(FakeWeb {
            cat_url: Some("https://purr.example/cat.jpg".to_string()),
            ..Default::default()
        });
        let reply = run(web.clone(), "cat", &[]).await;

        assert_eq!(reply.attachments.len(), 1);
        assert_eq!(reply.attachments[0].filename, "cat.png");
        assert_eq!(reply.attachments[0].url, "https://purr.example/cat.jpg");
        assert_eq!(web.calls(), 1);
    }

    #[tokio::test]
    async fn test_cat_failure_is_error_reply() {
        let reply = run(Arc::new(FakeWeb::default()), "cat", &[]).await;
        assert_eq!(reply.content(), GENERIC_FAILURE);
        assert!(reply.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_urban_builds_embed() {
        let web = Arc::new(FakeWeb {
            definitions: Some(vec![definition("to throw"), definition("second")]),
            ..Default::default()
        });
        let reply = run(web, "urban", &[("term", json!("yeet"))]).await;

        assert_eq!(reply.embeds.len(), 1);
        let embed = &reply.embeds[0];
        assert_eq!(embed.colour, Some(URBAN_COLOUR));
        assert_eq!(embed.title.as_deref(), Some("yeet"));
        assert_eq!(embed.url.as_deref(), Some("https://yeet.urbanup.com/1"));
        assert_eq!(embed.fields[0].value, "to throw");
        assert_eq!(embed.fields[2].value, "120 thumbs up. 7 thumbs down.");
    }

    #[tokio::test]
    async fn test_urban_trims_long_definitions() {
        let web = Arc::new(FakeWeb {
            definitions: Some(vec![definition(&"a".repeat(3000))]),
            ..Default::default()
        });
        let reply = run(web, "urban", &[("term", json!("yeet"))]).await;

        let value = &reply.embeds[0].fields[0].value;
        assert_eq!(value.chars().count(), 1024);
        assert!(value.ends_with("..."));
    }

    #[tokio::test]
    async fn test_urban_no_results() {
        let web = Arc::new(FakeWeb {
            definitions: Some(Vec::new()),
            ..Default::default()
        });
        let reply = run(web, "urban", &[("term", json!("qwxz"))]).await;
        assert_eq!(reply.content(), "No results found for **qwxz**.");
    }

    #[tokio::test]
    async fn test_urban_http_failure_is_single_error_reply() {
        let web = Arc::new(FakeWeb::default());
        let reply = run(web.clone(), "urban", &[("term", json!("yeet"))]).await;

        assert_eq!(reply.content(), GENERIC_FAILURE);
        assert!(reply.embeds.is_empty());
        assert_eq!(web.calls(), 1);
    }

    #[tokio::test]
    async fn test_urban_requires_term() {
        let web = Arc::new(FakeWeb::default());
        let reply = run(web.clone(), "urban", &[]).await;

        assert_eq!(reply.content(), "Missing required option `term`.");
        assert_eq!(web.calls(), 0);
    }
}
