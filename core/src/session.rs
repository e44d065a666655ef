//! Per-session conversation manager.
//!
//! Each browser session owns one [`Session`]: the active persona, the ordered
//! message log, and the credential gate state. Every user interaction is a
//! discrete synchronous step on the session; nothing here touches the UI or
//! the database, which keeps the whole state machine testable headlessly.
//!
//! Lifecycle: a session starts locked. A successful credential probe unlocks
//! it; the opening greeting is then synthesized lazily on the next fetch or
//! message, mirroring how the conversation restarts after a persona switch
//! or an explicit clear.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::crisis;
use crate::errors::HearthError;
use crate::personas::{self, Assessment, Persona, DEFAULT_PERSONA_ID};
use crate::provider::{ChatBackend, ChatMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn in the session's message log. Never mutated after the append;
/// only a full conversation reset removes entries.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Opaque proof that the credential passed the live probe. The key never
/// leaves session memory.
#[derive(Clone)]
pub struct ProviderHandle {
    credential: String,
}

impl ProviderHandle {
    fn new(credential: String) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConversationState {
    Uninitialized,
    Ready,
}

/// Outcome of one chat turn, surfaced to the API layer.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: Message,
    pub crisis: bool,
    /// Provider failure converted into the apology turn, kept for diagnostics.
    pub generation_error: Option<String>,
}

pub struct Session {
    pub id: Uuid,
    persona_id: &'static str,
    log: Vec<Message>,
    handle: Option<ProviderHandle>,
    state: ConversationState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            persona_id: DEFAULT_PERSONA_ID,
            log: Vec::new(),
            handle: None,
            state: ConversationState::Uninitialized,
        }
    }

    /// Exactly one persona is active at any time.
    pub fn persona(&self) -> &'static Persona {
        personas::get(self.persona_id).expect("active persona is always registered")
    }

    pub fn unlocked(&self) -> bool {
        self.handle.is_some()
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    /// One live probe call; no retry, no credential format inspection. On
    /// success the session unlocks and the conversation restarts fresh. On
    /// failure the gate stays locked and the user may simply resubmit.
    pub async fn submit_credential(
        &mut self,
        backend: &dyn ChatBackend,
        credential: &str,
    ) -> Result<(), HearthError> {
        backend.probe(credential).await?;
        self.handle = Some(ProviderHandle::new(credential.to_string()));
        self.reset_conversation();
        Ok(())
    }

    /// Discard the handle and lock the session again ("change API key").
    pub fn revoke_credential(&mut self) {
        self.handle = None;
        self.reset_conversation();
    }

    /// Switch the active persona. Returns true when the persona actually
    /// changed (and the conversation restarted); selecting the already
    /// active persona is a no-op.
    pub fn select_persona(&mut self, id: &str) -> Result<bool, HearthError> {
        let persona = personas::get(id).ok_or_else(|| HearthError::UnknownPersona(id.into()))?;
        if persona.id == self.persona_id {
            return Ok(false);
        }
        self.persona_id = persona.id;
        self.reset_conversation();
        Ok(true)
    }

    /// Run the assessment decision table and switch to its pick.
    pub fn apply_recommendation(&mut self, assessment: &Assessment) -> (&'static Persona, bool) {
        let persona = personas::recommend(assessment);
        let switched = self
            .select_persona(persona.id)
            .expect("recommended persona is always registered");
        (persona, switched)
    }

    pub fn clear_chat(&mut self) {
        self.reset_conversation();
    }

    fn reset_conversation(&mut self) {
        self.log.clear();
        self.state = ConversationState::Uninitialized;
    }

    /// Synthesize the opening greeting once the session is unlocked. The log
    /// is non-empty only after this runs.
    pub fn ensure_greeting(&mut self) {
        if self.state == ConversationState::Uninitialized && self.handle.is_some() {
            self.log.push(Message {
                role: Role::Assistant,
                content: self.persona().greeting(),
            });
            self.state = ConversationState::Ready;
        }
    }

    /// Handle one user turn: crisis interception first, otherwise a single
    /// provider call over the full prior history. A provider failure becomes
    /// one apology turn; the user's message stays in the log untouched.
    pub async fn send_message(
        &mut self,
        backend: &dyn ChatBackend,
        text: &str,
    ) -> Result<TurnOutcome, HearthError> {
        let handle = self.handle.clone().ok_or(HearthError::SessionLocked)?;
        self.ensure_greeting();

        self.log.push(Message {
            role: Role::User,
            content: text.to_string(),
        });

        if crisis::classify(text) {
            let reply = Message {
                role: Role::Assistant,
                content: crisis::CRISIS_RESPONSE.to_string(),
            };
            self.log.push(reply.clone());
            return Ok(TurnOutcome {
                reply,
                crisis: true,
                generation_error: None,
            });
        }

        let request = self.build_request(text);
        let (content, generation_error) = match backend.chat(handle.credential(), &request).await {
            Ok(reply) => (reply, None),
            Err(err) => (
                format!("I apologize, but I encountered an error: {err}. Please try again."),
                Some(err.to_string()),
            ),
        };

        let reply = Message {
            role: Role::Assistant,
            content,
        };
        self.log.push(reply.clone());
        Ok(TurnOutcome {
            reply,
            crisis: false,
            generation_error,
        })
    }

    /// System prompt, then every prior turn, then the current user text
    /// wrapped in the persona's role framing.
    fn build_request(&self, text: &str) -> Vec<ChatMessage> {
        let persona = self.persona();
        let mut request = vec![ChatMessage::new("system", persona.system_prompt)];
        for msg in &self.log[..self.log.len() - 1] {
            request.push(ChatMessage::new(msg.role.as_str(), msg.content.clone()));
        }
        request.push(ChatMessage::new("user", persona.frame_message(text)));
        request
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Sessions idle longer than this are dropped by the periodic sweep.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// In-memory registry of live sessions. Each session sits behind its own
/// mutex so a slow provider call stalls only that session. Abandoned
/// sessions do not linger: the page deletes its session on unload and the
/// server sweeps anything idle past [`SESSION_IDLE_TTL`].
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id;
        self.inner.lock().await.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Fetch a session and refresh its idle clock.
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, HearthError> {
        let mut map = self.inner.lock().await;
        let entry = map.get_mut(&id).ok_or(HearthError::SessionNotFound)?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    /// Drop a session outright. Returns false when it was already gone.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.inner.lock().await.remove(&id).is_some()
    }

    /// Sweep out sessions idle longer than `ttl`; returns how many dropped.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, entry| entry.last_seen.elapsed() <= ttl);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        chat_calls: AtomicUsize,
        probe_ok: bool,
        fail_chat: bool,
    }

    impl StubBackend {
        fn accepting() -> Self {
            Self {
                chat_calls: AtomicUsize::new(0),
                probe_ok: true,
                fail_chat: false,
            }
        }

        fn rejecting() -> Self {
            Self {
                probe_ok: false,
                ..Self::accepting()
            }
        }

        fn failing_chat() -> Self {
            Self {
                fail_chat: true,
                ..Self::accepting()
            }
        }

        fn chat_calls(&self) -> usize {
            self.chat_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn probe(&self, _credential: &str) -> Result<(), HearthError> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(HearthError::CredentialRejected("API key not valid".into()))
            }
        }

        async fn chat(
            &self,
            _credential: &str,
            _messages: &[ChatMessage],
        ) -> Result<String, HearthError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_chat {
                Err(HearthError::GenerationFailed("503 from provider".into()))
            } else {
                Ok("That sounds hard. Let's work through it together.".into())
            }
        }
    }

    async fn unlocked_session(backend: &StubBackend) -> Session {
        let mut session = Session::new();
        session.submit_credential(backend, "test-key").await.unwrap();
        session
    }

    #[tokio::test]
    async fn probe_success_unlocks_and_stores_handle() {
        let backend = StubBackend::accepting();
        let session = unlocked_session(&backend).await;
        assert!(session.unlocked());
    }

    #[tokio::test]
    async fn probe_failure_leaves_session_locked() {
        let backend = StubBackend::rejecting();
        let mut session = Session::new();
        let err = session
            .submit_credential(&backend, "bad-key")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::CredentialRejected(_)));
        assert!(!session.unlocked());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn locked_session_rejects_messages() {
        let backend = StubBackend::accepting();
        let mut session = Session::new();
        let err = session.send_message(&backend, "hello").await.unwrap_err();
        assert!(matches!(err, HearthError::SessionLocked));
        assert_eq!(backend.chat_calls(), 0);
    }

    #[tokio::test]
    async fn greeting_is_synthesized_once_unlocked() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        assert!(session.messages().is_empty());
        session.ensure_greeting();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert!(session.messages()[0].content.contains("Sage"));
        // idempotent
        session.ensure_greeting();
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn normal_turn_calls_provider_once_and_appends_reply() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        let outcome = session
            .send_message(&backend, "my exams are next week")
            .await
            .unwrap();
        assert!(!outcome.crisis);
        assert_eq!(backend.chat_calls(), 1);
        // greeting, user turn, assistant reply
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].role, Role::User);
        assert_eq!(session.messages()[2].content, outcome.reply.content);
    }

    #[tokio::test]
    async fn crisis_turn_never_reaches_the_provider() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        let outcome = session
            .send_message(&backend, "I want to end it all")
            .await
            .unwrap();
        assert!(outcome.crisis);
        assert_eq!(backend.chat_calls(), 0);
        assert!(outcome.reply.content.contains("KIRAN"));
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn provider_failure_becomes_one_apology_turn() {
        let backend = StubBackend::failing_chat();
        let mut session = unlocked_session(&backend).await;
        let outcome = session
            .send_message(&backend, "tell me about bedtime routines")
            .await
            .unwrap();
        assert!(outcome.reply.content.starts_with("I apologize"));
        assert!(outcome.generation_error.is_some());
        assert_eq!(session.messages().len(), 3);
        // the user's message stays in the log unmodified
        assert_eq!(
            session.messages()[1].content,
            "tell me about bedtime routines"
        );
        // the session stays usable afterwards
        assert!(session.unlocked());
    }

    #[tokio::test]
    async fn persona_switch_clears_log_before_the_next_greeting() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        session.send_message(&backend, "hi").await.unwrap();
        assert!(session.messages().len() > 1);

        assert!(session.select_persona("nurture").unwrap());
        assert!(session.messages().is_empty());
        session.ensure_greeting();
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].content.contains("Nurture"));
    }

    #[tokio::test]
    async fn selecting_the_active_persona_keeps_the_log() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        session.send_message(&backend, "hi").await.unwrap();
        let before = session.messages().len();
        assert!(!session.select_persona("sage").unwrap());
        assert_eq!(session.messages().len(), before);
    }

    #[tokio::test]
    async fn unknown_persona_is_rejected() {
        let mut session = Session::new();
        let err = session.select_persona("mystic").unwrap_err();
        assert!(matches!(err, HearthError::UnknownPersona(_)));
    }

    #[tokio::test]
    async fn clear_chat_restarts_with_a_fresh_greeting() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        session.send_message(&backend, "hello").await.unwrap();
        session.clear_chat();
        assert!(session.messages().is_empty());
        session.ensure_greeting();
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn revoking_the_credential_locks_and_wipes_the_session() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        session.send_message(&backend, "hello").await.unwrap();
        session.revoke_credential();
        assert!(!session.unlocked());
        assert!(session.messages().is_empty());
        // no greeting while locked
        session.ensure_greeting();
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn recommendation_switches_to_the_table_pick() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        let (persona, switched) = session.apply_recommendation(&Assessment {
            age_group: "Parent/Guardian",
            concern: "Parenting",
            mood: 4,
        });
        assert_eq!(persona.id, "nurture");
        assert!(switched);
        assert_eq!(session.persona().id, "nurture");

        // second identical assessment is a no-op
        let (_, switched) = session.apply_recommendation(&Assessment {
            age_group: "Parent/Guardian",
            concern: "Parenting",
            mood: 4,
        });
        assert!(!switched);
    }

    #[tokio::test]
    async fn request_carries_system_prompt_history_and_framing() {
        let backend = StubBackend::accepting();
        let mut session = unlocked_session(&backend).await;
        session.ensure_greeting();
        session.log.push(Message {
            role: Role::User,
            content: "how do I focus?".into(),
        });
        let request = session.build_request("how do I focus?");
        assert_eq!(request[0].role, "system");
        assert!(request[0].content.starts_with("You are Sage"));
        // greeting sits between system prompt and the framed user text
        assert_eq!(request[1].role, "assistant");
        let last = request.last().unwrap();
        assert_eq!(last.role, "user");
        assert!(last.content.contains("respond to: how do I focus?"));
    }

    #[tokio::test]
    async fn store_isolates_sessions() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);

        let backend = StubBackend::accepting();
        {
            let shared = store.get(a).await.unwrap();
            let mut session = shared.lock().await;
            session.submit_credential(&backend, "key").await.unwrap();
        }
        let shared = store.get(b).await.unwrap();
        assert!(!shared.lock().await.unlocked());

        let missing = store.get(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(HearthError::SessionNotFound)));
    }

    #[tokio::test]
    async fn removed_session_is_not_found() {
        let store = SessionStore::new();
        let id = store.create().await;
        assert!(store.remove(id).await);
        assert!(matches!(
            store.get(id).await,
            Err(HearthError::SessionNotFound)
        ));
        assert!(!store.remove(id).await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn idle_sweep_drops_stale_sessions() {
        let store = SessionStore::new();
        let id = store.create().await;

        // fresh sessions survive a generous TTL
        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(store.len().await, 1);

        // with a zero TTL any elapsed idle time counts as expired
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.evict_idle(Duration::ZERO).await, 1);
        assert!(matches!(
            store.get(id).await,
            Err(HearthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn fetching_a_session_refreshes_its_idle_clock() {
        let store = SessionStore::new();
        let id = store.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(id).await.unwrap();
        // just touched, so a TTL covering the touch keeps it alive
        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 0);
        assert!(store.get(id).await.is_ok());
    }
}
