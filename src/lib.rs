//! # QuizQuest - Quiz Encounter Engine
//!
//! QuizQuest runs the quiz encounters of a single-player RPG: the player
//! answers a phase's questions while spending lives and mana, triggers hotbar
//! abilities, earns XP and coins, and has progress saved to a local profile
//! store and pushed to a score endpoint.
//!
//! ## Features
//!
//! - **Encounter State Machine**: lives, mana, once-per-phase hotbar slots and
//!   single-answer effects, with XP payout depending on whether an ability
//!   was active.
//! - **Profile Persistence**: Sled-backed profiles with field-level,
//!   transactional updates.
//! - **Score Sync**: Fire-and-forget XP pushes on tokio tasks, cancelled when
//!   the encounter is torn down.
//! - **Shop & Hotbar**: Buy items with coins and bind them to slots `1`-`8`
//!   and `A`-`G`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quizquest::quiz::{
//!     DisabledScoreSink, EncounterDriver, EncounterRules, GameSession, QuestionBank,
//!     SledProfileStore, StartOutcome,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SledProfileStore::open("data/profiles")?);
//!     let bank = QuestionBank::load_from_json("data/questions.json")?;
//!     let session = Arc::new(GameSession::new(
//!         "alice",
//!         store,
//!         Arc::new(DisabledScoreSink),
//!         EncounterRules::default(),
//!     ));
//!
//!     if let StartOutcome::Ready(mut driver) = EncounterDriver::start(session, &bank, 1) {
//!         driver.answer("let")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`quiz`] - Encounter engine, collaborators and profile model
//! - [`config`] - Configuration management

pub mod config;
pub mod quiz;
