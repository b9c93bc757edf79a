// Answer composition
// Retrieval results and conversation history become a chat completion request


pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::knowledge::KnowledgeBase;

pub use openai::{ChatClient, Transcriber};
pub use prompt::{ChatMessage, Role, SYSTEM_PROMPT, build_context, build_messages, format_context_block};

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

impl ConversationTurn {
    #[inline]
    pub fn new<U: Into<String>, A: Into<String>>(user: U, assistant: A) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Produces an answer for a question given the conversation so far
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, question: &str, history: &[ConversationTurn]) -> Result<String>;
}

/// Retrieve, compose and complete
pub struct Assistant {
    knowledge: KnowledgeBase,
    client: ChatClient,
}

impl Assistant {
    #[inline]
    pub fn new(knowledge: KnowledgeBase, client: ChatClient) -> Self {
        Self { knowledge, client }
    }

    #[inline]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }
}

#[async_trait]
impl Responder for Assistant {
    async fn respond(&self, question: &str, history: &[ConversationTurn]) -> Result<String> {
        let results = self.knowledge.retrieve(question).await?;
        debug!(
            "Answering with {} context chunks and {} prior turns",
            results.len(),
            history.len()
        );

        let messages = build_messages(question, &results, history);
        self.client.complete(&messages)
    }
}
