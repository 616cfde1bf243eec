//! Conversational command understanding for the leadvox CRM bot.
//!
//! This crate turns free-form user input (typed or voice-transcribed) into a
//! structured, confirmable CRM action:
//!
//! 1. **Entity Extraction** (`entities`) - ids, contacts, tags, free text
//! 2. **Intent Detection** (`intent`) - ordered rule table, three-tier cascade
//! 3. **Quality Assessment** (`quality`) - advisory transcript legibility score
//! 4. **Conversation Context** (`context`) - per-user state with TTL eviction
//! 5. **Dialogue Orchestration** (`orchestrator`) - confirmation gating,
//!    reference resolution, AI fallback routing
//!
//! # Safety Principle
//!
//! The generative backend is strictly a fallback for utterances the rule
//! table cannot classify. It NEVER executes actions and NEVER bypasses the
//! confirmation gate; mutating the CRM is always a deterministic decision
//! made here and delegated to the data-access collaborator.

pub mod context;
pub mod entities;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod quality;
pub mod responses;

pub use context::{ContextStore, ConversationState, ConversationTurn, UserContext};
pub use entities::EntityExtractor;
pub use intent::IntentDetector;
pub use llm::{ChatBackend, LlmError, OpenAiChatClient};
pub use orchestrator::DialogueOrchestrator;
pub use quality::{QualityAssessment, QualityAssessor, QualityLabel};
pub use responses::{ResponseKind, TurnOutcome};
