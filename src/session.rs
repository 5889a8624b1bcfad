//! Chat session orchestrator
//!
//! Binds the conversation cache, the message store, the reveal scheduler and
//! the backend into the send/receive protocol. All mutation happens through
//! `&mut self` on one logical thread; the backend calls and reveal ticks are
//! the only suspension points.


use crate::backend::{Backend, ChatReply, ChatRequest, TransportError};
use crate::conversations::{Conversation, ConversationId, ConversationStore};
use crate::messages::{Message, MessageStore};
use crate::refresh::{RefreshReason, RefreshSignal, RefreshToken};
use crate::reveal::{RevealScheduler, RevealStep, RevealTask};
use crate::state_machine::{
    transition, Effect, Event, SendContext, SendId, SendState, TransitionError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Dismissible error notice shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn generic_error() -> Self {
        Self {
            title: "Error".to_string(),
            message: "An error occurred. Please try again.".to_string(),
        }
    }
}

/// Events broadcast to the front end
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ConversationChanged {
        conversation_id: Option<ConversationId>,
    },
    MessagesReplaced {
        messages: Vec<Message>,
    },
    MessageAppended {
        message: Message,
    },
    MessageRemoved {
        message: Message,
    },
    RevealStarted,
    RevealFrame {
        visible: String,
    },
    RevealCancelled,
    ConversationsUpdated {
        conversations: Vec<Conversation>,
    },
    Notice(Notice),
}

/// How a send resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Rejected up front: blank text, no conversation, or already pending
    Ignored,
    /// Reply received and being revealed
    Revealing,
    /// Empty reply, committed at once with nothing to reveal
    Committed,
    /// Request failed and the optimistic message was removed
    RolledBack,
    /// The reply arrived for a send abandoned by a conversation switch
    Discarded,
}

/// A chat request issued by [`ChatSession::begin_send`], awaiting its reply
#[derive(Debug)]
pub struct PendingSend {
    send_id: SendId,
    request: ChatRequest,
    request_id: Uuid,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Everything the session owns about the active conversation
#[derive(Debug, Default)]
pub struct SessionState {
    pub active_conversation_id: Option<ConversationId>,
    pub messages: MessageStore,
    pub send: SendState,
    /// Assistant reply being revealed. Not part of `messages` until complete.
    pub revealing: Option<RevealTask>,
    pub input: String,
}

impl SessionState {
    pub fn pending(&self) -> bool {
        self.send.is_pending()
    }
}

pub struct ChatSession<B: Backend> {
    backend: Arc<B>,
    conversations: ConversationStore<B>,
    refresh: RefreshSignal,
    scheduler: RevealScheduler,
    state: SessionState,
    notice: Option<Notice>,
    next_send_id: u64,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl<B: Backend> ChatSession<B> {
    pub fn new(backend: Arc<B>, reveal_tick: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            conversations: ConversationStore::new(backend.clone()),
            backend,
            refresh: RefreshSignal::new(),
            scheduler: RevealScheduler::new(reveal_tick),
            state: SessionState::default(),
            notice: None,
            next_send_id: 1,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    // ==================== Accessors ====================
    // Several are only read by tests and alternative front ends.

    #[allow(dead_code)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages.messages()
    }

    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state.active_conversation_id
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending()
    }

    pub fn is_revealing(&self) -> bool {
        self.state.revealing.is_some()
    }

    /// Partial assistant reply shown as an overlay below the messages
    #[allow(dead_code)]
    pub fn revealing_text(&self) -> Option<&str> {
        self.state.revealing.as_ref().map(RevealTask::visible)
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.conversations()
    }

    #[allow(dead_code)]
    pub fn conversations_loading(&self) -> bool {
        self.conversations.is_loading()
    }

    #[allow(dead_code)]
    pub fn refresh_token(&self) -> RefreshToken {
        self.refresh.current()
    }

    pub fn reveal_scheduler(&self) -> &RevealScheduler {
        &self.scheduler
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    #[allow(dead_code)]
    pub fn input(&self) -> &str {
        &self.state.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
    }

    // ==================== Lifecycle ====================

    /// Mount: open a fresh conversation if none is active, then fill the sidebar
    pub async fn start(&mut self) {
        if self.state.active_conversation_id.is_none() {
            self.new_conversation().await;
        }
        self.sync_conversations().await;
    }

    /// Create a conversation and make it active with an empty view.
    ///
    /// Returns `None` (and raises a notice) if the backend refused; the
    /// current conversation stays active in that case.
    pub async fn new_conversation(&mut self) -> Option<ConversationId> {
        let conversation = match self.conversations.create().await {
            Ok(conversation) => conversation,
            Err(e) => {
                tracing::error!(error = %e, "Error creating conversation");
                self.raise_notice();
                return None;
            }
        };

        self.leave_conversation();
        self.state.active_conversation_id = Some(conversation.id);
        self.state.messages.clear();
        self.emit(SessionEvent::ConversationChanged {
            conversation_id: Some(conversation.id),
        });
        self.emit(SessionEvent::MessagesReplaced { messages: vec![] });
        self.refresh.bump(RefreshReason::Created);
        Some(conversation.id)
    }

    /// Switch to `id`, discarding any reveal and replacing the view wholesale
    pub async fn select_conversation(&mut self, id: ConversationId) {
        self.leave_conversation();
        self.state.active_conversation_id = Some(id);
        // Nothing from the previous view survives, even if the load fails
        self.state.messages.clear();
        self.emit(SessionEvent::ConversationChanged {
            conversation_id: Some(id),
        });

        match self.backend.load_messages(id).await {
            Ok(messages) => {
                self.state.messages.load(messages);
                tracing::info!(conv_id = id, count = self.state.messages.len(), "Messages loaded");
            }
            Err(e) => {
                tracing::error!(conv_id = id, error = %e, "Error loading messages");
                self.raise_notice();
            }
        }
        self.emit(SessionEvent::MessagesReplaced {
            messages: self.state.messages.messages().to_vec(),
        });
    }

    /// Delete `id`. Deleting the active conversation moves the session to a
    /// freshly created one first.
    pub async fn delete_conversation(&mut self, id: ConversationId) {
        self.conversations.delete(id).await;

        if self.state.active_conversation_id == Some(id)
            && self.new_conversation().await.is_none()
        {
            // Creation failed: never stay pointed at the deleted conversation
            self.leave_conversation();
            self.state.active_conversation_id = None;
            self.state.messages.clear();
            self.emit(SessionEvent::ConversationChanged {
                conversation_id: None,
            });
            self.emit(SessionEvent::MessagesReplaced { messages: vec![] });
        }

        self.refresh.bump(RefreshReason::Deleted);
    }

    /// Re-list conversations if the refresh token moved since the last sync.
    ///
    /// Returns whether the list was re-fetched.
    pub async fn sync_conversations(&mut self) -> bool {
        match self.conversations.sync(self.refresh.current()).await {
            Ok(true) => {
                self.emit(SessionEvent::ConversationsUpdated {
                    conversations: self.conversations.conversations().to_vec(),
                });
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching conversations");
                false
            }
        }
    }

    // ==================== Send protocol ====================

    /// Send the current input buffer
    pub async fn submit_input(&mut self) -> SendOutcome {
        let text = self.state.input.clone();
        self.send_message(&text).await
    }

    /// Full send: optimistic append, backend call, then reveal or rollback
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        let Some(pending) = self.begin_send(text) else {
            return SendOutcome::Ignored;
        };
        let result = self.backend.send_chat(pending.request()).await;
        self.complete_send(pending, result)
    }

    /// First half of a send, up to the suspension point.
    ///
    /// Returns `None` when the send is silently ignored.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let send_id = SendId(self.next_send_id);
        let effects = match self.dispatch(Event::Submit {
            text: text.to_string(),
            send_id,
        }) {
            Ok(effects) => effects,
            Err(e) => {
                tracing::debug!(reason = %e, "Send ignored");
                return None;
            }
        };

        self.next_send_id += 1;
        let request = self.execute_effects(effects)?;
        let request_id = Uuid::new_v4();
        tracing::info!(
            request_id = %request_id,
            send_id = %send_id,
            conv_id = request.conversation_id,
            "Sending message"
        );
        Some(PendingSend {
            send_id,
            request,
            request_id,
        })
    }

    /// Second half of a send, once the backend has answered
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<ChatReply, TransportError>,
    ) -> SendOutcome {
        let PendingSend {
            send_id,
            request,
            request_id,
        } = pending;
        let conversation_id = request.conversation_id;
        let event = match result {
            Ok(reply) => Event::ChatSucceeded {
                send_id,
                response: reply.response,
            },
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    conv_id = conversation_id,
                    error = %e,
                    "Error sending message"
                );
                Event::ChatFailed {
                    send_id,
                    error: e.to_string(),
                }
            }
        };

        match self.dispatch(event) {
            Ok(effects) => {
                let rolled_back = effects
                    .iter()
                    .any(|effect| matches!(effect, Effect::Rollback { .. }));
                self.execute_effects(effects);
                if rolled_back {
                    SendOutcome::RolledBack
                } else if matches!(self.state.send, SendState::Revealing { .. }) {
                    SendOutcome::Revealing
                } else {
                    SendOutcome::Committed
                }
            }
            Err(e) => {
                tracing::info!(
                    request_id = %request_id,
                    send_id = %send_id,
                    conv_id = conversation_id,
                    reason = %e,
                    "Discarding reply"
                );
                SendOutcome::Discarded
            }
        }
    }

    /// Advance the running reveal by one tick.
    ///
    /// Returns `None` when nothing is being revealed.
    pub fn tick(&mut self) -> Option<RevealStep> {
        let task = self.state.revealing.as_mut()?;
        let step = task.advance();

        match &step {
            RevealStep::Frame => {
                let visible = task.visible().to_string();
                self.emit(SessionEvent::RevealFrame { visible });
            }
            RevealStep::Complete(text) => {
                self.state.revealing = None;
                let completed = self.state.send.send_id().map(|send_id| Event::RevealCompleted {
                    send_id,
                    text: text.clone(),
                });
                match completed.map(|event| self.dispatch(event)) {
                    Some(Ok(effects)) => {
                        self.execute_effects(effects);
                    }
                    Some(Err(e)) => tracing::warn!(reason = %e, "Reveal completion rejected"),
                    None => tracing::warn!("Reveal completed with no send in flight"),
                }
            }
            RevealStep::Cancelled => {
                self.state.revealing = None;
                if let Ok(effects) = self.dispatch(Event::RevealCancelled) {
                    self.execute_effects(effects);
                }
                self.emit(SessionEvent::RevealCancelled);
            }
            RevealStep::Finished => {
                self.state.revealing = None;
            }
        }

        Some(step)
    }

    // ==================== Internals ====================

    fn leave_conversation(&mut self) {
        if let Ok(effects) = self.dispatch(Event::ConversationLeft) {
            self.execute_effects(effects);
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let context = SendContext {
            active_conversation_id: self.state.active_conversation_id,
            mark: self.state.messages.mark(),
        };
        let result = transition(&self.state.send, &context, event)?;
        if result.new_state != self.state.send {
            tracing::debug!(
                from = self.state.send.name(),
                to = result.new_state.name(),
                conv_id = ?result.new_state.conversation_id(),
                "Send state transition"
            );
        }
        self.state.send = result.new_state;
        Ok(result.effects)
    }

    /// Apply effects in order; hands back the chat request if one was issued
    fn execute_effects(&mut self, effects: Vec<Effect>) -> Option<ChatRequest> {
        let mut request = None;
        for effect in effects {
            match effect {
                Effect::AppendMessage(message) => {
                    self.state.messages.append(message.clone());
                    self.emit(SessionEvent::MessageAppended { message });
                }
                Effect::ClearInput => self.state.input.clear(),
                Effect::RequestChat(chat) => request = Some(chat),
                Effect::StartReveal { text } => {
                    if let Some(previous) = self.state.revealing.take() {
                        RevealScheduler::cancel(previous.handle());
                    }
                    self.state.revealing = Some(self.scheduler.start(text));
                    self.emit(SessionEvent::RevealStarted);
                }
                Effect::CancelReveal => {
                    if let Some(task) = self.state.revealing.take() {
                        RevealScheduler::cancel(task.handle());
                        self.emit(SessionEvent::RevealCancelled);
                    }
                }
                Effect::Rollback { mark } => {
                    if let Some(message) = self.state.messages.rollback(mark) {
                        self.emit(SessionEvent::MessageRemoved { message });
                    }
                }
                Effect::NotifyError { message } => {
                    tracing::warn!(error = %message, "Surfacing error notice");
                    self.raise_notice();
                }
            }
        }
        request
    }

    fn raise_notice(&mut self) {
        let notice = Notice::generic_error();
        self.notice = Some(notice.clone());
        self.emit(SessionEvent::Notice(notice));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }
}
