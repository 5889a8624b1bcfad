//! In-memory backend for testing
//!
//! Behaves like the real service (ids assigned on create, chat turns persisted
//! on success) and records every call so tests can assert on traffic.

use super::{Backend, ChatReply, ChatRequest, TransportError};
use crate::conversations::{Conversation, ConversationId, DEFAULT_TITLE};
use crate::messages::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    List,
    Create,
    Delete(ConversationId),
    Load(ConversationId),
    Chat(ChatRequest),
}

#[derive(Default)]
struct ServerState {
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    next_id: ConversationId,
}

/// Mock backend with queued chat replies and injectable failures
#[allow(dead_code)]
pub struct MockBackend {
    server: Mutex<ServerState>,
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    list_failures: Mutex<VecDeque<TransportError>>,
    create_failures: Mutex<VecDeque<TransportError>>,
    load_failures: Mutex<VecDeque<TransportError>>,
    stall_list: Mutex<bool>,
    /// Record of all calls made
    pub calls: Mutex<Vec<BackendCall>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            server: Mutex::new(ServerState {
                next_id: 1,
                ..ServerState::default()
            }),
            replies: Mutex::new(VecDeque::new()),
            list_failures: Mutex::new(VecDeque::new()),
            create_failures: Mutex::new(VecDeque::new()),
            load_failures: Mutex::new(VecDeque::new()),
            stall_list: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The next created conversation gets this id
    pub fn set_next_id(&self, id: ConversationId) {
        self.server.lock().unwrap().next_id = id;
    }

    pub fn seed_conversation(&self, id: ConversationId, created_at: DateTime<Utc>) {
        self.server.lock().unwrap().conversations.push(Conversation {
            id,
            title: DEFAULT_TITLE.to_string(),
            created_at,
        });
    }

    pub fn seed_messages(&self, id: ConversationId, messages: Vec<Message>) {
        let mut server = self.server.lock().unwrap();
        if !server.conversations.iter().any(|c| c.id == id) {
            server.conversations.push(Conversation::placeholder(id));
        }
        server.messages.insert(id, messages);
    }

    /// Queue a successful chat reply
    pub fn queue_reply(&self, response: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    /// Queue a failed chat reply
    pub fn queue_chat_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_next_list(&self, error: TransportError) {
        self.list_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_create(&self, error: TransportError) {
        self.create_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_load(&self, error: TransportError) {
        self.load_failures.lock().unwrap().push_back(error);
    }

    /// The next listing never answers
    pub fn stall_next_list(&self) {
        *self.stall_list.lock().unwrap() = true;
    }

    pub fn recorded_calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.recorded_calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Chat(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<ConversationId> {
        self.recorded_calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::List))
            .count()
    }

    /// Messages the server has persisted for a conversation
    pub fn stored_messages(&self, id: ConversationId) -> Vec<Message> {
        self.server
            .lock()
            .unwrap()
            .messages
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        self.record(BackendCall::List);
        let stall = std::mem::take(&mut *self.stall_list.lock().unwrap());
        if stall {
            std::future::pending::<()>().await;
        }
        if let Some(error) = self.list_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut conversations = self.server.lock().unwrap().conversations.clone();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn create_conversation(&self) -> Result<ConversationId, TransportError> {
        self.record(BackendCall::Create);
        if let Some(error) = self.create_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut server = self.server.lock().unwrap();
        let id = server.next_id;
        server.next_id += 1;
        server.conversations.push(Conversation::placeholder(id));
        Ok(id)
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<(), TransportError> {
        self.record(BackendCall::Delete(id));
        let mut server = self.server.lock().unwrap();
        let before = server.conversations.len();
        server.conversations.retain(|c| c.id != id);
        server.messages.remove(&id);
        if server.conversations.len() == before {
            return Err(TransportError::status(404, "Conversation not found"));
        }
        Ok(())
    }

    async fn load_messages(&self, id: ConversationId) -> Result<Vec<Message>, TransportError> {
        self.record(BackendCall::Load(id));
        if let Some(error) = self.load_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.stored_messages(id))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        self.record(BackendCall::Chat(request.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))?;

        let mut server = self.server.lock().unwrap();
        let history = server.messages.entry(request.conversation_id).or_default();
        history.push(Message::user(request.message.clone()));
        history.push(Message::assistant(reply.clone()));
        Ok(ChatReply { response: reply })
    }
}
