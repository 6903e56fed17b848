//! Quiz encounter engine.
//!
//! The [`encounter`] state machine is pure; [`session`] layers persistence
//! ([`storage`]) and remote XP sync ([`score`]) on top of it. Questions come
//! from a [`questions::QuestionSource`], items from the static [`catalog`].

pub mod catalog;
pub mod encounter;
pub mod errors;
pub mod progress;
pub mod questions;
pub mod score;
pub mod session;
pub mod shop;
pub mod storage;
pub mod types;

pub use catalog::{ItemCatalog, ItemCategory, ItemDef, ItemEffect};
pub use encounter::{
    AnswerOutcome, Encounter, EncounterState, EncounterStatus, FeedbackEvent, ItemRejection,
    ItemUse,
};
pub use errors::QuizError;
pub use progress::{next_open_phase, record_phase, PhaseResult};
pub use questions::{starter_bank_json, QuestionBank, QuestionSource};
#[cfg(feature = "score-sync")]
pub use score::HttpScoreSink;
pub use score::{score_url, DisabledScoreSink, ScoreSink, ScoreSync, ScoreUpdate};
pub use session::{EncounterDriver, GameSession, PhaseSummary, StartOutcome};
pub use shop::{equip, format_hotbar, format_shop_listing, purchase, unequip};
pub use storage::{ProfileStore, ProfileUpdate, SledProfileStore, SledProfileStoreBuilder};
pub use types::*;
