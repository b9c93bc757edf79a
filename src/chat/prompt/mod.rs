
use serde::{Deserialize, Serialize};

use super::ConversationTurn;
use crate::database::SearchResult;

pub const SYSTEM_PROMPT: &str = "Answer the question based on the given context. Also return the source URL and any relevant metadata for each part of your answer.";

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
const MISSING: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One retrieved chunk rendered for the system message
#[inline]
pub fn format_context_block(result: &SearchResult) -> String {
    let metadata = &result.metadata;
    format!(
        "Source Title: {}\nAuthor: {}\nPublished Date: {}\nSource URL: {}\nTags: {}\nEntities: {}\n\nContent:\n{}",
        or_missing(metadata.source_title.as_deref()),
        or_missing(metadata.author_or_channel.as_deref()),
        or_missing(metadata.published_date.as_deref()),
        or_missing(metadata.source_url.as_deref()),
        or_missing(metadata.tags.as_deref()),
        or_missing(metadata.entities.as_deref()),
        result.document
    )
}

#[inline]
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(format_context_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// System message with context, prior turns in order, then the new question
#[inline]
pub fn build_messages(
    question: &str,
    results: &[SearchResult],
    history: &[ConversationTurn],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(format!(
        "{} Context: {}",
        SYSTEM_PROMPT,
        build_context(results)
    )));

    for turn in history {
        messages.push(ChatMessage::user(turn.user.as_str()));
        messages.push(ChatMessage::assistant(turn.assistant.as_str()));
    }

    messages.push(ChatMessage::user(question));
    messages
}

fn or_missing(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}
