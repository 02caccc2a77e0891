use serde::Serialize;

use helpline_core::domain::moderation::{ModerationAction, DURATION_CHOICES};
use helpline_core::moderation::ModerationFeedback;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Markdown { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Markdown { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
    /// Only visible to the user who triggered the message.
    pub ephemeral: bool,
}

impl MessageTemplate {
    /// Fallback text plus every block, as a single string. Handy for assertions and logs.
    pub fn render(&self) -> String {
        let mut rendered = self.fallback_text.clone();
        for block in &self.blocks {
            let parts: Vec<&str> = match block {
                Block::Section { text, .. } => vec![text.text()],
                Block::Context { elements, .. } => elements.iter().map(TextObject::text).collect(),
            };
            for part in parts {
                rendered.push('\n');
                rendered.push_str(part);
            }
        }
        rendered
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
    ephemeral: bool,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new(), ephemeral: false }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            blocks: self.blocks,
            ephemeral: self.ephemeral,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn markdown(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::markdown(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn markdown(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::markdown(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Tips posted into every freshly opened help thread.
pub fn help_thread_explanation() -> MessageTemplate {
    MessageBuilder::new(
        "While you are waiting for getting help, here are some tips to improve your experience:",
    )
    .section("help.explanation.formatting.v1", |section| {
        section.markdown(
            "Code is much easier to read if posted with **syntax highlighting** and proper formatting.",
        );
    })
    .section("help.explanation.details.v1", |section| {
        section.markdown(
            "If nobody is calling back, that usually means that your question was **not well asked** \
             and hence nobody feels confident enough answering. Try to use your time to elaborate, \
             **provide details**, context, more code, examples and maybe some screenshots. \
             With enough info, someone knows the answer for sure.",
        );
    })
    .section("help.explanation.close.v1", |section| {
        section.plain(
            "Don't forget to close your thread when your question has been answered, thanks.",
        );
    })
    .build()
}

pub fn category_changed_message(category: &str, helper_mention: Option<&str>) -> MessageTemplate {
    let builder = MessageBuilder::new(format!("Changed the category to {category}."))
        .section("help.category.changed.v1", |section| {
            section.markdown(format!("Changed the category to **{category}**."));
        });

    match helper_mention {
        Some(mention) => builder
            .context("help.category.helpers.v1", |context| {
                context.plain(format!("{mention} please have a look, thanks."));
            })
            .build(),
        None => builder.build(),
    }
}

pub fn category_unchanged_message(category: &str) -> MessageTemplate {
    MessageBuilder::new(format!("The thread is already categorized as {category}."))
        .ephemeral()
        .build()
}

pub fn title_changed_message(title: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Changed the title to {title}."))
        .section("help.title.changed.v1", |section| {
            section.markdown(format!("Changed the title to **{title}**."));
        })
        .build()
}

pub fn title_unchanged_message(title: &str) -> MessageTemplate {
    MessageBuilder::new(format!("The thread is already titled {title}.")).ephemeral().build()
}

pub fn moderation_feedback_message(feedback: &ModerationFeedback) -> MessageTemplate {
    MessageBuilder::new(feedback.title())
        .section("moderation.feedback.summary.v1", |section| {
            section.markdown(format!("**{}**", feedback.title()));
        })
        .section("moderation.feedback.details.v1", |section| {
            section.plain(feedback.description());
        })
        .context("moderation.feedback.id.v1", |context| {
            context.plain(format!("Action id: {}", feedback.action_id.0));
        })
        .build()
}

pub fn audit_message(target: &str, actions: &[ModerationAction]) -> MessageTemplate {
    if actions.is_empty() {
        return MessageBuilder::new(format!("{target} has no recorded moderation actions."))
            .ephemeral()
            .build();
    }

    let lines: Vec<String> = actions
        .iter()
        .map(|action| {
            let expiry = action
                .expires_at
                .map(|expires_at| format!(" (until {})", expires_at.format("%Y-%m-%d %H:%M UTC")))
                .unwrap_or_default();
            format!(
                "{} {} by <@{}>{expiry}: {}",
                action.issued_at.format("%Y-%m-%d %H:%M"),
                action.kind,
                action.actor_id.0,
                action.reason
            )
        })
        .collect();

    MessageBuilder::new(format!("{target} has {} recorded moderation action(s).", actions.len()))
        .ephemeral()
        .section("moderation.audit.history.v1", |section| {
            section.plain(lines.join("\n"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Helpline commands")
        .ephemeral()
        .section("help.commands.v1", |section| {
            section.markdown(
                "`/help-thread category <name>` - change the category of the current help thread\n\
                 `/help-thread title <title>` - rename the current help thread\n\
                 `/mute <user> <duration> <reason>` and `/ban <user> <duration> <reason>`\n\
                 `/quarantine <user> <reason>`, `/kick <user> <reason>`, `/warn <user> <reason>`\n\
                 `/audit <user>` - list recorded moderation actions",
            );
        })
        .context("help.commands.durations.v1", |context| {
            context.plain(format!("Durations: {}", DURATION_CHOICES.join(", ")));
        })
        .build()
}

pub fn error_message(message: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(message.to_owned())
        .ephemeral()
        .context("error.correlation.v1", |context| {
            context.plain(format!("Reference: {correlation_id}"));
        })
        .build()
}
