//! Telegram integration - long-poll bot interface
//!
//! This crate provides the Telegram surface for leadvox:
//! - **Bot API types** (`api`) - updates, messages, voice payloads, and the
//!   `BotTransport` seam with its HTTP implementation
//! - **Handlers** (`handlers`) - route text and voice messages through the
//!   quality assessor, the transcription chain, and the dialogue orchestrator
//! - **Runner** (`runner`) - the long-poll loop with backoff that never
//!   crashes the process on transport trouble
//!
//! # Architecture
//!
//! ```text
//! Telegram Updates → BotRunner → UpdateHandler → DialogueOrchestrator
//!                       ↓                              ↓
//!                  sendMessage  ←  rendered reply  ←  TurnOutcome
//! ```
//!
//! Updates are processed in arrival order per chat, so one user's turns are
//! handled sequentially; the context store's per-user gate backs this up.

pub mod api;
pub mod handlers;
pub mod runner;
