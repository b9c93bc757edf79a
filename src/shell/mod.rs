// Interactive chat shell
// Holds the conversation, dispatches slash commands and renders answers


pub mod facts;

use std::path::PathBuf;

use anyhow::Result;
use console::style;
use dialoguer::{Input, Select};
use tracing::{debug, error};

use crate::chat::{ConversationTurn, Responder, Transcriber};

const FAILURE_MESSAGE: &str = "Sorry, something went wrong while answering. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was sent and history is unchanged
    Ignored,
    Answered(String),
}

/// Conversation state for one shell session
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ConversationTurn>,
}

impl ChatSession {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Ask `responder` and record the turn. Whitespace-only input never reaches it.
    #[inline]
    pub async fn submit(
        &mut self,
        input: &str,
        responder: &dyn Responder,
    ) -> crate::Result<SubmitOutcome> {
        if input.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let answer = responder.respond(input, &self.history).await?;
        self.history.push(ConversationTurn::new(input, answer.as_str()));
        Ok(SubmitOutcome::Answered(answer))
    }

    #[inline]
    pub fn clear(&mut self) {
        debug!("Clearing {} turns", self.history.len());
        self.history.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Quick,
    Audio(Option<PathBuf>),
    Facts,
    Clear,
    Help,
    Quit,
    Unknown(String),
}

/// Lines starting with `/` are commands; anything else is a question
#[inline]
pub fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ShellCommand::Ask(trimmed.to_string());
    };

    let (name, argument) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name.to_ascii_lowercase().as_str() {
        "quick" | "q" => ShellCommand::Quick,
        "audio" => ShellCommand::Audio((!argument.is_empty()).then(|| PathBuf::from(argument))),
        "facts" => ShellCommand::Facts,
        "clear" => ShellCommand::Clear,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(trimmed.to_string()),
    }
}

#[inline]
pub fn help_text() -> String {
    [
        "/quick          pick one of the preset questions",
        "/audio <file>   transcribe a WAV file and ask it",
        "/facts          show the fact panels",
        "/clear          forget the conversation so far",
        "/help           show this help",
        "/quit           leave the shell",
    ]
    .join("\n")
}

/// Read questions until `/quit` or end of input
#[inline]
pub async fn run_shell(
    session: &mut ChatSession,
    responder: &dyn Responder,
    transcriber: Option<&Transcriber>,
) -> Result<()> {
    eprintln!(
        "{}",
        style(format!("🥊 Ask me about {}", facts::FOCUS_FIGHTER))
            .bold()
            .cyan()
    );
    eprintln!("{}", facts::render_sample_prompts());
    eprintln!("Type /help for commands.");
    eprintln!();

    loop {
        let line = match Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                debug!("Input closed: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            ShellCommand::Ask(question) => ask(session, responder, &question).await,
            ShellCommand::Quick => {
                let choice = Select::new()
                    .with_prompt("Quick question")
                    .items(facts::QUICK_QUESTIONS)
                    .default(0)
                    .interact_opt()?;
                if let Some(index) = choice {
                    let question = facts::QUICK_QUESTIONS[index];
                    eprintln!("You: {}", question);
                    ask(session, responder, question).await;
                }
            }
            ShellCommand::Audio(None) => eprintln!("Usage: /audio <file.wav>"),
            ShellCommand::Audio(Some(path)) => match transcriber {
                None => eprintln!(
                    "{}",
                    style("Transcription is unavailable (no API key)").yellow()
                ),
                Some(transcriber) => match transcriber.transcribe_file(&path) {
                    Ok(text) => {
                        eprintln!("Transcribed: {}", style(&text).italic());
                        ask(session, responder, &text).await;
                    }
                    Err(e) => {
                        error!("Transcription of {} failed: {}", path.display(), e);
                        eprintln!("{}", style("Could not transcribe that file.").red());
                    }
                },
            },
            ShellCommand::Facts => println!("{}", facts::render_all()),
            ShellCommand::Clear => {
                session.clear();
                eprintln!("{}", style("Conversation cleared.").green());
            }
            ShellCommand::Help => eprintln!("{}", help_text()),
            ShellCommand::Quit => break,
            ShellCommand::Unknown(command) => {
                eprintln!("Unknown command {}. Type /help for commands.", command);
            }
        }
    }

    Ok(())
}

async fn ask(session: &mut ChatSession, responder: &dyn Responder, question: &str) {
    match session.submit(question, responder).await {
        Ok(SubmitOutcome::Answered(answer)) => {
            println!("{} {}", style("Assistant:").bold().green(), answer);
        }
        Ok(SubmitOutcome::Ignored) => {}
        Err(e) => {
            error!("Failed to answer question: {}", e);
            eprintln!("{}", style(FAILURE_MESSAGE).red());
        }
    }
}
