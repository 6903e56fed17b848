//! Session context and the encounter driver.
//!
//! [`GameSession`] is created once at launch and carries everything an
//! encounter needs to reach the outside world: who is playing, the session id
//! the score endpoint knows them by, and the collaborator handles.
//! [`EncounterDriver`] wraps the pure [`Encounter`] state machine and performs
//! the side effects after each action:
//!
//! - profile updates are applied synchronously and field-by-field; a failed
//!   write is logged and play continues on the in-memory copy
//! - XP deltas go to [`ScoreSync`] and are never awaited
//! - a question fetch failure aborts the attempt back to the overworld

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::quiz::catalog::ItemCatalog;
use crate::quiz::encounter::{AnswerOutcome, Encounter, FeedbackEvent, ItemRejection, ItemUse};
use crate::quiz::errors::QuizError;
use crate::quiz::progress::PhaseResult;
use crate::quiz::questions::QuestionSource;
use crate::quiz::score::{ScoreSink, ScoreSync};
use crate::quiz::storage::{ProfileStore, ProfileUpdate};
use crate::quiz::types::{EncounterRules, HotbarSlot, PhaseNumber, PlayerProfile};

pub struct GameSession {
    username: String,
    session_id: String,
    store: Arc<dyn ProfileStore>,
    score_sink: Arc<dyn ScoreSink>,
    catalog: ItemCatalog,
    rules: EncounterRules,
}

impl GameSession {
    pub fn new(
        username: &str,
        store: Arc<dyn ProfileStore>,
        score_sink: Arc<dyn ScoreSink>,
        rules: EncounterRules,
    ) -> Self {
        Self {
            username: username.to_string(),
            session_id: Uuid::new_v4().to_string(),
            store,
            score_sink,
            catalog: ItemCatalog::standard(),
            rules,
        }
    }

    /// Use a session id issued elsewhere instead of a generated one.
    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &EncounterRules {
        &self.rules
    }

    /// Read the player's profile, creating one on first play.
    pub fn load_or_create_profile(&self) -> Result<PlayerProfile, QuizError> {
        match self.store.read(&self.username) {
            Ok(profile) => Ok(profile),
            Err(QuizError::NotFound(_)) => {
                let profile = PlayerProfile::new(&self.username, &self.rules);
                self.store.write(&profile)?;
                info!("created profile for {}", self.username);
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }
}

pub enum StartOutcome {
    Ready(EncounterDriver),
    /// The phase could not be loaded; the player goes back to the map.
    ReturnToOverworld { phase: PhaseNumber, reason: String },
}

/// What the results screen shows after a phase attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub result: PhaseResult,
    /// False when the progress write failed and only the in-memory copy has it.
    pub saved: bool,
    pub total_xp: u32,
    pub level: u32,
}

pub struct EncounterDriver {
    session: Arc<GameSession>,
    encounter: Encounter,
    profile: PlayerProfile,
    score: ScoreSync,
}

impl EncounterDriver {
    /// Load `phase` for the session's player.
    pub fn start(
        session: Arc<GameSession>,
        source: &dyn QuestionSource,
        phase: PhaseNumber,
    ) -> StartOutcome {
        let score = ScoreSync::new(Arc::clone(&session.score_sink), &session.session_id);
        Self::start_with(session, source, phase, score)
    }

    fn start_with(
        session: Arc<GameSession>,
        source: &dyn QuestionSource,
        phase: PhaseNumber,
        score: ScoreSync,
    ) -> StartOutcome {
        let profile = match session.load_or_create_profile() {
            Ok(profile) => profile,
            Err(e) => {
                warn!("could not load profile for {}: {}", session.username, e);
                return StartOutcome::ReturnToOverworld {
                    phase,
                    reason: format!("profile unavailable: {}", e),
                };
            }
        };

        let mut encounter = Encounter::new(phase, session.rules.clone(), profile.vitals());
        let loaded = source
            .questions_for_phase(phase)
            .and_then(|questions| encounter.load(questions));
        if let Err(e) = loaded {
            warn!("phase {} unavailable, returning to overworld: {}", phase, e);
            return StartOutcome::ReturnToOverworld {
                phase,
                reason: e.to_string(),
            };
        }

        info!(
            "{} entered phase {} ({} questions, {} lives, {} mana)",
            session.username,
            phase,
            encounter.question_count(),
            encounter.state().lives,
            encounter.state().mana
        );
        StartOutcome::Ready(Self {
            session,
            encounter,
            profile,
            score,
        })
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Latest known profile (stored copy, or in-memory if a write failed).
    pub fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn drain_feedback(&mut self) -> Vec<FeedbackEvent> {
        self.encounter.drain_feedback()
    }

    /// Number of XP pushes still in flight.
    pub fn pending_score_updates(&self) -> usize {
        self.score.in_flight()
    }

    /// Use whatever is bound to `slot`.
    pub fn use_slot(&mut self, slot: HotbarSlot) -> Result<ItemUse, ItemRejection> {
        let Some(item_id) = self.profile.binding(slot).map(str::to_string) else {
            return Err(self.encounter.note_rejection(ItemRejection::EmptySlot(slot)));
        };
        let Some(item) = self.session.catalog.get(&item_id) else {
            return Err(self
                .encounter
                .note_rejection(ItemRejection::UnknownItem(item_id)));
        };

        let used = self.encounter.use_item(slot, item)?;
        debug!(
            "{} used {} from slot {} (lives {}, mana {})",
            self.session.username, used.item, slot, used.vitals.lives, used.vitals.mana
        );
        self.persist(&[
            ProfileUpdate::ItemUsed {
                item: used.item.to_string(),
            },
            ProfileUpdate::Vitals {
                lives: used.vitals.lives,
                mana: used.vitals.mana,
            },
        ]);
        Ok(used)
    }

    /// Answer the question on screen.
    pub fn answer(&mut self, option: &str) -> Result<AnswerOutcome, QuizError> {
        let outcome = self.encounter.submit_answer(option)?;
        let vitals = self.encounter.state().vitals();
        let mut updates = vec![ProfileUpdate::Vitals {
            lives: vitals.lives,
            mana: vitals.mana,
        }];
        if outcome.xp_awarded > 0 {
            updates.push(ProfileUpdate::XpGained(outcome.xp_awarded));
        }
        self.persist(&updates);
        self.score.submit(outcome.xp_awarded);
        Ok(outcome)
    }

    /// Wait out the resolve delay, tally the attempt and record progress.
    pub async fn finish(&mut self) -> Result<PhaseSummary, QuizError> {
        if !self.encounter.is_pending_resolution() {
            return Err(QuizError::InvalidState(format!(
                "phase {} is still in progress",
                self.encounter.phase()
            )));
        }
        let delay = self.session.rules.resolve_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self.encounter.resolve()?;
        let mut updates = vec![ProfileUpdate::PhaseCompleted(result.to_progress(Utc::now()))];
        if result.coins > 0 {
            updates.push(ProfileUpdate::CoinsAwarded(result.coins));
        }
        let saved = self.persist(&updates);
        info!(
            "{} {} phase {} ({} correct, {} wrong, {} XP)",
            self.session.username,
            if result.passed { "passed" } else { "failed" },
            result.phase,
            result.correct_count,
            result.wrong_count,
            result.xp_earned
        );
        Ok(PhaseSummary {
            result,
            saved,
            total_xp: self.profile.total_xp,
            level: self.profile.level(),
        })
    }

    /// Replay the same phase with the last saved lives and mana.
    pub fn retry(&mut self) -> Result<(), QuizError> {
        let saved = match self.session.store.read(&self.session.username) {
            Ok(profile) => {
                let vitals = profile.vitals();
                self.profile = profile;
                vitals
            }
            Err(e) => {
                warn!(
                    "could not re-read profile for {}; retrying with in-memory vitals: {}",
                    self.session.username, e
                );
                self.profile.vitals()
            }
        };
        self.encounter.retry(saved)?;
        info!(
            "{} retrying phase {}",
            self.session.username,
            self.encounter.phase()
        );
        Ok(())
    }

    /// Tear down this encounter and load the next phase. In-flight score
    /// pushes carry over to the new encounter.
    pub fn advance(self, source: &dyn QuestionSource) -> StartOutcome {
        let next = self.encounter.phase() + 1;
        let Self { session, score, .. } = self;
        Self::start_with(session, source, next, score)
    }

    /// End the encounter, cancelling any XP pushes still in flight.
    pub fn close(mut self) {
        self.score.shutdown();
    }

    /// Wait for queued XP pushes before closing.
    pub async fn close_gracefully(mut self) {
        self.score.settle().await;
    }

    fn persist(&mut self, updates: &[ProfileUpdate]) -> bool {
        match self.session.store.apply(&self.session.username, updates) {
            Ok(profile) => {
                self.profile = profile;
                true
            }
            Err(e) => {
                warn!(
                    "profile write failed for {}; keeping in-memory state: {}",
                    self.session.username, e
                );
                for update in updates {
                    update.apply_to(&mut self.profile);
                }
                false
            }
        }
    }
}
