//! Append-only conversation log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::Message;

/// Ordered conversation history owned by a single run.
///
/// Entries are never edited or removed once appended.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    messages: Vec<Message>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing conversation.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Owned copy of the current history, used for model requests and hooks.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// History handle shared between a running event stream and its owner.
///
/// Locks are held only for the duration of a single append or read.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedHistory(Arc<Mutex<HistoryStore>>);

impl SharedHistory {
    pub(crate) fn new(store: HistoryStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    fn lock(&self) -> MutexGuard<'_, HistoryStore> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn append(&self, message: Message) {
        self.lock().append(message);
    }

    pub(crate) fn snapshot(&self) -> Vec<Message> {
        self.lock().snapshot()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
