//! Conversation sessions.
//!
//! A session is owned by exactly one logical chat. The store hands out one async mutex per
//! session id, so a conversation is processed strictly in order while different
//! conversations proceed in parallel.

use crate::constants::*;
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationSession {
    pub persona: Option<String>,
    pub history: Vec<Turn>,
}

impl ConversationSession {
    /// Fresh session seeded with the persona's initialization exchange.
    pub fn seeded(persona: Option<&str>) -> Self {
        let mut session = Self::default();
        session.reseed(persona);
        session
    }

    /// Returns the session in `slot`, replacing it when none exists or when `persona`
    /// differs from the stored one. Replacement discards the previous history.
    /// Empty or whitespace-only personas count as absent.
    pub fn get_or_create<'a>(slot: &'a mut Option<Self>, persona: Option<&str>) -> &'a mut Self {
        let persona = persona.filter(|p| !p.trim().is_empty());
        let stale = match (slot.as_ref(), persona) {
            (None, _) => true,
            (Some(existing), Some(p)) => existing.persona.as_deref() != Some(p),
            (Some(_), None) => false,
        };

        if stale {
            if slot.is_some() {
                tracing::info!("[🎭] Persona changed, resetting session");
            }
            *slot = Some(Self::seeded(persona));
        }

        slot.get_or_insert_with(|| Self::seeded(persona))
    }

    pub fn append_turn(&mut self, role: Role, text: impl Into<String>) {
        self.history.push(Turn {
            role,
            text: text.into(),
        });
    }

    /// Back to uninitialized: no persona, no history.
    pub fn reset(&mut self) {
        self.persona = None;
        self.history.clear();
    }

    /// Replaces persona and history with the seed exchange. `None` seeds the default persona.
    pub fn reseed(&mut self, persona: Option<&str>) {
        self.persona = Some(persona.unwrap_or(DEFAULT_PERSONA).to_string());
        self.history = vec![
            Turn::user(PERSONA_INIT_PROMPT),
            Turn::model(persona_greeting(persona)),
        ];
        tracing::info!(
            "[🎭] Persona-driven session initialized (has_persona: {}, persona_len: {})",
            persona.is_some(),
            persona.map(|p| p.len()).unwrap_or(0)
        );
    }

    pub fn is_initialized(&self) -> bool {
        !self.history.is_empty()
    }

    /// Persona used for prompting, falling back to the default assistant.
    pub fn effective_persona(&self) -> &str {
        self.persona.as_deref().unwrap_or(DEFAULT_PERSONA)
    }
}

/// Canned greeting for a new session, chosen by keyword.
pub fn persona_greeting(persona: Option<&str>) -> &'static str {
    let persona = match persona {
        Some(p) if !p.contains("helpful AI assistant") => p.to_lowercase(),
        _ => return "Hello! I'm ready to assist you.",
    };

    if persona.contains("pirate") {
        "Ahoy there, matey! Captain's ready for adventure!"
    } else if persona.contains("scientist") {
        "Fascinating! My neural networks are fully operational and ready for scientific inquiry."
    } else if persona.contains("detective") {
        "The case is afoot. What mystery shall we solve today?"
    } else {
        "I'm fully initialized and ready to engage in character."
    }
}

pub type SessionHandle = Arc<Mutex<Option<ConversationSession>>>;

struct SessionEntry {
    handle: SessionHandle,
    last_used: Instant,
}

impl SessionEntry {
    /// No request holds the handle besides the store itself.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.handle) == 1
    }
}

/// Session handles keyed by id, bounded by `max_sessions`. When full, the least
/// recently used idle session makes room for a new one.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Handle for `id`, creating an empty slot on first use.
    pub async fn handle(&self, id: &SessionId) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.handle.clone();
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, e)| e.is_idle())
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    sessions.remove(&k);
                    tracing::debug!("[🎭] Session store full, evicted {}", k.short());
                }
                None => tracing::warn!(
                    "[🎭] Session store over capacity ({}), all sessions busy",
                    sessions.len()
                ),
            }
        }

        let handle: SessionHandle = Arc::new(Mutex::new(None));
        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                last_used: now,
            },
        );
        handle
    }

    /// Clears the session's persona and history but keeps its slot. Returns false for unknown ids.
    pub async fn reset(&self, id: &SessionId) -> bool {
        let handle = match self.sessions.read().await.get(id) {
            Some(e) => e.handle.clone(),
            None => return false,
        };
        *handle.lock().await = None;
        tracing::info!("[🎭] Session {} cleared", id.short());
        true
    }

    /// Drops the session entirely. A request already holding its handle finishes undisturbed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!("[🎭] Session {} removed", id.short());
        }
        removed
    }

    /// Removes idle sessions untouched for at least `ttl`. Returns how many went.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| !e.is_idle() || e.last_used.elapsed() < ttl);
        before - sessions.len()
    }

    /// Runs `evict_idle` every `ttl / 2` for as long as the store lives.
    pub fn spawn_idle_sweep(self: &Arc<Self>, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = (ttl / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    tracing::info!(
                        "[🎭] Evicted {} idle session(s), {} remain",
                        evicted,
                        store.len().await
                    );
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
