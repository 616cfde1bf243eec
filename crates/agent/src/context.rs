use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use leadvox_core::domain::action::Action;

/// Turn history kept per user; oldest entries fall off first.
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingConfirmation,
    /// Reserved for multi-step edit flows; nothing enters it yet.
    Editing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub action: Action,
    pub bot_response: String,
}

/// Per-user conversational memory.
///
/// Invariant: `pending_confirmation` is `Some` if and only if `state` is
/// `AwaitingConfirmation`. The store's `set_pending`/`clear_pending` are the
/// only mutators of that pair besides creation.
#[derive(Clone, Debug)]
pub struct UserContext {
    pub user_id: i64,
    pub last_lead_id: Option<i64>,
    pub last_lead_name: Option<String>,
    pub last_action: Option<&'static str>,
    pub pending_confirmation: Option<Action>,
    pub history: VecDeque<ConversationTurn>,
    pub state: ConversationState,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            last_lead_id: None,
            last_lead_name: None,
            last_action: None,
            pending_confirmation: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            state: ConversationState::Idle,
        }
    }

    fn push_turn(&mut self, turn: ConversationTurn) {
        self.last_action = Some(turn.action.intent.label());
        self.history.push_back(turn);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }
}

struct Entry {
    context: UserContext,
    last_seen: Instant,
}

/// Owns every `UserContext`. Callers get snapshots and mutate through the
/// store; nothing holds a context reference across calls.
///
/// Every public entry point first sweeps contexts idle past the TTL, so a
/// stale pending confirmation can never be resurrected. Turns of one user are
/// serialized through a per-user gate; different users never contend.
pub struct ContextStore {
    ttl: Duration,
    entries: Mutex<HashMap<i64, Entry>>,
    gates: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContextStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()), gates: Mutex::new(HashMap::new()) }
    }

    pub fn from_ttl_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes * 60))
    }

    /// Serializes turns of one user. Hold the guard for the whole turn; the
    /// read-modify-write against this store is not safe without it.
    pub async fn begin_turn(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().expect("gate map lock");
            Arc::clone(gates.entry(user_id).or_default())
        };
        gate.lock_owned().await
    }

    /// Snapshot of the user's context; creates a fresh one on first contact
    /// and refreshes the activity timestamp.
    pub fn snapshot(&self, user_id: i64) -> UserContext {
        let mut entries = self.entries.lock().expect("context map lock");
        self.sweep(&mut entries);
        let entry = entries
            .entry(user_id)
            .or_insert_with(|| Entry { context: UserContext::new(user_id), last_seen: Instant::now() });
        entry.last_seen = Instant::now();
        entry.context.clone()
    }

    pub fn note_lead(&self, user_id: i64, lead_id: i64, lead_name: Option<String>) {
        self.with_context(user_id, |context| {
            context.last_lead_id = Some(lead_id);
            if lead_name.is_some() {
                context.last_lead_name = lead_name;
            }
        });
    }

    /// Arms the confirmation gate: stores the action and flips the state in
    /// one critical section so the two can never disagree.
    pub fn set_pending(&self, user_id: i64, action: Action) {
        self.with_context(user_id, |context| {
            context.pending_confirmation = Some(action);
            context.state = ConversationState::AwaitingConfirmation;
        });
    }

    pub fn clear_pending(&self, user_id: i64) {
        self.with_context(user_id, |context| {
            context.pending_confirmation = None;
            context.state = ConversationState::Idle;
        });
    }

    pub fn record_turn(&self, user_id: i64, turn: ConversationTurn) {
        self.with_context(user_id, |context| context.push_turn(turn));
    }

    /// Number of live conversations, after sweeping.
    pub fn active_count(&self) -> usize {
        let mut entries = self.entries.lock().expect("context map lock");
        self.sweep(&mut entries);
        entries.len()
    }

    fn with_context(&self, user_id: i64, mutate: impl FnOnce(&mut UserContext)) {
        let mut entries = self.entries.lock().expect("context map lock");
        self.sweep(&mut entries);
        let entry = entries
            .entry(user_id)
            .or_insert_with(|| Entry { context: UserContext::new(user_id), last_seen: Instant::now() });
        entry.last_seen = Instant::now();
        mutate(&mut entry.context);
    }

    fn sweep(&self, entries: &mut HashMap<i64, Entry>) {
        let before = entries.len();
        entries.retain(|_, entry| entry.last_seen.elapsed() <= self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(event_name = "context.swept", evicted, "evicted stale user contexts");
            let mut gates = self.gates.lock().expect("gate map lock");
            gates.retain(|user_id, _| entries.contains_key(user_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use leadvox_core::domain::action::{Action, ExtractedEntities, Intent};

    use super::{ContextStore, ConversationState, ConversationTurn, HISTORY_CAPACITY};

    fn action(intent: Intent, text: &str) -> Action {
        Action::new(intent, ExtractedEntities::default(), 0.8, text)
    }

    fn turn(intent: Intent, text: &str) -> ConversationTurn {
        ConversationTurn {
            timestamp: Utc::now(),
            user_input: text.to_owned(),
            action: action(intent, text),
            bot_response: "ok".to_owned(),
        }
    }

    #[test]
    fn pending_action_and_state_move_together() {
        let store = ContextStore::from_ttl_minutes(120);

        let fresh = store.snapshot(1);
        assert_eq!(fresh.state, ConversationState::Idle);
        assert!(fresh.pending_confirmation.is_none());

        store.set_pending(1, action(Intent::DeleteLead, "видали ліда #3"));
        let armed = store.snapshot(1);
        assert_eq!(armed.state, ConversationState::AwaitingConfirmation);
        assert!(armed.pending_confirmation.is_some());

        store.clear_pending(1);
        let cleared = store.snapshot(1);
        assert_eq!(cleared.state, ConversationState::Idle);
        assert!(cleared.pending_confirmation.is_none());
    }

    #[test]
    fn history_is_capped_fifo() {
        let store = ContextStore::from_ttl_minutes(120);

        for index in 0..(HISTORY_CAPACITY + 4) {
            store.record_turn(5, turn(Intent::ListLeads, &format!("turn {index}")));
        }

        let context = store.snapshot(5);
        assert_eq!(context.history.len(), HISTORY_CAPACITY);
        assert_eq!(context.history.front().map(|t| t.user_input.as_str()), Some("turn 4"));
        assert_eq!(context.history.back().map(|t| t.user_input.as_str()), Some("turn 13"));
        assert_eq!(context.last_action, Some("list_leads"));
    }

    #[tokio::test]
    async fn stale_context_is_fully_evicted_and_recreated_empty() {
        let store = ContextStore::new(Duration::from_millis(5));

        store.note_lead(9, 42, Some("Nikolas".to_owned()));
        store.set_pending(9, action(Intent::DeleteLead, "видали його"));
        assert_eq!(store.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;

        // Any entry point sweeps; an access by another user also evicts.
        let _ = store.snapshot(777);
        let reborn = store.snapshot(9);
        assert_eq!(reborn.last_lead_id, None);
        assert!(reborn.pending_confirmation.is_none());
        assert_eq!(reborn.state, ConversationState::Idle);
        assert!(reborn.history.is_empty());
    }

    #[tokio::test]
    async fn sweep_is_idempotent_and_activity_refreshes_ttl() {
        let store = ContextStore::new(Duration::from_millis(50));

        store.note_lead(2, 7, None);
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            // Each access refreshes the timestamp, so the context survives
            // well past one TTL of wall time.
            assert_eq!(store.snapshot(2).last_lead_id, Some(7));
        }

        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test]
    async fn per_user_gate_serializes_one_user_only() {
        let store = std::sync::Arc::new(ContextStore::from_ttl_minutes(120));

        let first = store.begin_turn(1).await;
        // A different user's turn proceeds while user 1 is mid-turn.
        let other = tokio::time::timeout(Duration::from_millis(50), store.begin_turn(2)).await;
        assert!(other.is_ok(), "other users must not contend");

        // The same user's next turn waits for the gate.
        let same = tokio::time::timeout(Duration::from_millis(50), store.begin_turn(1)).await;
        assert!(same.is_err(), "same user must serialize");

        drop(first);
        let unblocked = tokio::time::timeout(Duration::from_millis(50), store.begin_turn(1)).await;
        assert!(unblocked.is_ok(), "gate must release after the turn ends");
    }

    #[test]
    fn note_lead_keeps_existing_name_when_none_is_given() {
        let store = ContextStore::from_ttl_minutes(120);

        store.note_lead(3, 10, Some("Olha".to_owned()));
        store.note_lead(3, 11, None);

        let context = store.snapshot(3);
        assert_eq!(context.last_lead_id, Some(11));
        assert_eq!(context.last_lead_name.as_deref(), Some("Olha"));
    }
}
