use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::documents::DocumentStore;
use crate::error::AppError;
use crate::gateway::InferenceGateway;
use crate::models::{ChatRequest, ChatResponse, Message};
use crate::sessions::SessionStore;

const LOG_PREVIEW_CHARS: usize = 100;

/// One async mutex per session id, so turns on a session run one at a time.
#[derive(Default)]
struct TurnLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TurnLocks {
    async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<dyn SessionStore>,
    documents: Arc<dyn DocumentStore>,
    gateway: InferenceGateway,
    turns: Arc<TurnLocks>,
}

impl ChatService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        documents: Arc<dyn DocumentStore>,
        gateway: InferenceGateway,
    ) -> Self {
        Self {
            sessions,
            documents,
            gateway,
            turns: Arc::new(TurnLocks::default()),
        }
    }

    pub async fn answer(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        if request.session_id.is_empty() {
            return Err(AppError::Validation("No session ID provided".to_string()));
        }
        let session_id = request.session_id.as_str();

        tracing::info!(
            session_id,
            use_pdf = request.use_pdf,
            message_len = request.message.len(),
            "received chat message"
        );

        let _turn = self.turns.acquire(session_id).await;
        self.sessions.ensure(session_id);

        let content = self.effective_message(&request);
        let user_turn = Message::user(content);
        self.sessions.append(session_id, user_turn.clone());

        // A concurrent clear can remove the session between append and list.
        let history = self
            .sessions
            .list(session_id)
            .unwrap_or_else(|| vec![user_turn]);

        // The user turn stays recorded even when the engine fails.
        let reply = self.gateway.complete(history).await?;

        tracing::info!(
            session_id,
            "AI response received: {}...",
            preview(&reply, LOG_PREVIEW_CHARS)
        );
        // A clear during the turn removes the session; don't bring it back.
        if !self
            .sessions
            .append_if_present(session_id, Message::assistant(reply.clone()))
        {
            tracing::info!(session_id, "session cleared during turn; reply not recorded");
        }

        Ok(ChatResponse { response: reply })
    }

    /// Grounds the message in the session's document when asked and one exists.
    /// A missing document falls back to the plain message without error.
    fn effective_message(&self, request: &ChatRequest) -> String {
        if !request.use_pdf {
            return request.message.clone();
        }

        match self.documents.get(&request.session_id) {
            Some(document) => grounded_prompt(&document.text, &request.message),
            None => {
                tracing::debug!(
                    session_id = %request.session_id,
                    "use_pdf requested but no document uploaded; sending message as-is"
                );
                request.message.clone()
            }
        }
    }

    pub fn history(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        self.sessions
            .list(session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.list_ids()
    }

    /// Waits for any in-flight turn on the session before removing it.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        let deleted = {
            let _turn = self.turns.acquire(session_id).await;
            self.sessions.delete(session_id)
        };
        self.turns.prune();
        if !deleted {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        tracing::info!(session_id, "session deleted");
        Ok(())
    }

    pub fn clear_sessions(&self) -> usize {
        let removed = self.sessions.clear_all();
        self.turns.prune();
        tracing::info!(removed, "all chat sessions cleared");
        removed
    }
}

pub fn grounded_prompt(document_text: &str, message: &str) -> String {
    format!("PDF Content: {document_text}\n\nUser Question: {message}")
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
