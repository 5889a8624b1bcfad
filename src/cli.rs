//! Line-based terminal front end
//!
//! Plain lines are sent as chat messages; lines starting with `/` are
//! commands. Reveal ticks come from a tokio interval and everything the
//! session does is rendered from its event stream.

use crate::backend::Backend;
use crate::conversations::{Conversation, ConversationId};
use crate::messages::Role;
use crate::session::{ChatSession, SendOutcome, SessionEvent};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const HELP: &str = "\
Commands:
  /new            start a new conversation
  /list           show conversations, newest first
  /select <id>    switch to a conversation
  /delete <id>    delete a conversation
  /dismiss        clear the error notice
  /help           show this help
  /quit           exit
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    List,
    Select(ConversationId),
    Delete(ConversationId),
    Dismiss,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("new", None) => Command::New,
        ("list", None) => Command::List,
        ("dismiss", None) => Command::Dismiss,
        ("help", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        ("select" | "delete", Some(raw)) => match raw.parse::<ConversationId>() {
            Ok(id) if name == "select" => Command::Select(id),
            Ok(id) => Command::Delete(id),
            Err(_) => Command::Invalid(format!("not a conversation id: {raw}")),
        },
        ("select" | "delete", None) => Command::Invalid(format!("usage: /{name} <id>")),
        _ => Command::Invalid(format!("unknown command: {trimmed}")),
    }
}

/// Writes session events as a plain-text transcript
pub struct Renderer<W> {
    out: W,
    /// Characters of the running reveal already written, if one is on screen
    revealed: Option<usize>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, revealed: None }
    }

    pub fn render(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::ConversationChanged {
                conversation_id: Some(id),
            } => writeln!(self.out, "--- conversation {id} ---")?,
            SessionEvent::ConversationChanged {
                conversation_id: None,
            } => writeln!(self.out, "--- no conversation, use /new ---")?,
            SessionEvent::MessagesReplaced { messages } => {
                for message in messages {
                    writeln!(self.out, "{}: {}", message.role.label(), message.content)?;
                }
            }
            SessionEvent::RevealStarted => {
                self.revealed = Some(0);
                write!(self.out, "assistant: ")?;
            }
            SessionEvent::RevealFrame { visible } => {
                let shown = self.revealed.unwrap_or_default();
                let delta: String = visible.chars().skip(shown).collect();
                self.revealed = Some(shown + delta.chars().count());
                write!(self.out, "{delta}")?;
            }
            SessionEvent::MessageAppended { message } => {
                // User lines are already on screen as typed
                if message.role == Role::Assistant {
                    match self.revealed.take() {
                        Some(shown) => {
                            let rest: String = message.content.chars().skip(shown).collect();
                            writeln!(self.out, "{rest}")?;
                        }
                        None => writeln!(self.out, "assistant: {}", message.content)?,
                    }
                }
            }
            SessionEvent::MessageRemoved { message } => {
                writeln!(self.out, "(not sent: {})", message.content)?;
            }
            SessionEvent::RevealCancelled => {
                writeln!(self.out, " (reply discarded)")?;
                self.revealed = None;
            }
            SessionEvent::ConversationsUpdated { conversations } => {
                tracing::debug!(count = conversations.len(), "Conversation list refreshed");
            }
            SessionEvent::Notice(notice) => {
                writeln!(self.out, "[{}] {} (/dismiss)", notice.title, notice.message)?;
            }
        }
        self.out.flush()
    }

    pub fn conversations(
        &mut self,
        conversations: &[Conversation],
        active: Option<ConversationId>,
    ) -> io::Result<()> {
        if conversations.is_empty() {
            writeln!(self.out, "(no conversations)")?;
        }
        for conversation in conversations {
            let marker = if Some(conversation.id) == active { '*' } else { ' ' };
            writeln!(
                self.out,
                "{marker} {:>4}  {}  {}",
                conversation.id,
                conversation.created_at.format("%Y-%m-%d %H:%M"),
                conversation.title
            )?;
        }
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}

/// Apply one input line. Returns `false` when the user asked to quit.
async fn handle_line<B: Backend, W: Write>(
    session: &mut ChatSession<B>,
    renderer: &mut Renderer<W>,
    line: &str,
) -> io::Result<bool> {
    match parse_command(line) {
        Command::Send(text) => {
            if text.trim().is_empty() {
                return Ok(true);
            }
            session.set_input(text);
            if session.submit_input().await == SendOutcome::Ignored && session.is_pending() {
                renderer.line("(busy, message ignored)")?;
            }
        }
        Command::New => {
            session.new_conversation().await;
        }
        Command::List => {
            session.sync_conversations().await;
            renderer.conversations(session.conversations(), session.active_conversation_id())?;
        }
        Command::Select(id) => session.select_conversation(id).await,
        Command::Delete(id) => session.delete_conversation(id).await,
        Command::Dismiss => session.dismiss_notice(),
        Command::Help => renderer.line(HELP)?,
        Command::Quit => return Ok(false),
        Command::Invalid(reason) => renderer.line(&reason)?,
    }

    session.sync_conversations().await;
    Ok(true)
}

/// Drive the session from stdin until EOF or `/quit`
pub async fn run<B: Backend>(session: &mut ChatSession<B>) -> io::Result<()> {
    let mut renderer = Renderer::new(io::stdout());
    let mut events = BroadcastStream::new(session.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticks = session.reveal_scheduler().interval();

    session.start().await;
    renderer.line("Type a message, or /help for commands.")?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle_line(session, &mut renderer, &line).await? {
                    break;
                }
                if session.is_revealing() {
                    ticks.reset();
                }
            }
            _ = ticks.tick(), if session.is_revealing() => {
                session.tick();
            }
            Some(event) = events.next() => match event {
                Ok(event) => renderer.render(&event)?,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind, events dropped");
                }
            },
        }
    }

    tracing::info!("Session ended");
    Ok(())
}
