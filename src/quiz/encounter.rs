//! Quiz encounter state machine.
//!
//! An [`Encounter`] covers one attempt at one phase:
//!
//! ```text
//! Loading ──load()──▶ AwaitingAnswer ──submit_answer()──▶ AwaitingAnswer
//!                            │                                  │
//!                            └──── last question / no lives ────┴──resolve()──▶ Resolved
//!                                                                                   │
//!                                            AwaitingAnswer ◀──────retry()──────────┘
//! ```
//!
//! The type does no I/O. Persistence and score sync are layered on top by
//! [`crate::quiz::session::EncounterDriver`].

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::quiz::catalog::{ItemDef, ItemEffect};
use crate::quiz::errors::QuizError;
use crate::quiz::progress::PhaseResult;
use crate::quiz::types::{EffectFlag, EncounterRules, HotbarSlot, PhaseNumber, Question, Vitals};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterStatus {
    Loading,
    AwaitingAnswer,
    Resolved,
}

/// Mutable counters for the current attempt. Discarded when the phase ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncounterState {
    pub lives: u32,
    pub mana: u32,
    pub active_effects: BTreeSet<EffectFlag>,
    pub used_slots: BTreeSet<HotbarSlot>,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub total_xp_earned: u32,
}

impl EncounterState {
    fn fresh(vitals: Vitals) -> Self {
        Self {
            lives: vitals.lives,
            mana: vitals.mana,
            ..Self::default()
        }
    }

    pub fn vitals(&self) -> Vitals {
        Vitals {
            lives: self.lives,
            mana: self.mana,
        }
    }

    pub fn has_active_effect(&self) -> bool {
        !self.active_effects.is_empty()
    }
}

/// Why a hotbar action did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRejection {
    NotAwaitingAnswer,
    EmptySlot(HotbarSlot),
    UnknownItem(String),
    SlotAlreadyUsed(HotbarSlot),
    InsufficientMana { needed: u32, available: u32 },
    LivesFull,
    ManaFull,
    NothingToRemove,
}

impl fmt::Display for ItemRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRejection::NotAwaitingAnswer => write!(f, "Nothing to use that on right now."),
            ItemRejection::EmptySlot(slot) => write!(f, "Slot {} is empty.", slot),
            ItemRejection::UnknownItem(id) => write!(f, "Unknown item '{}'.", id),
            ItemRejection::SlotAlreadyUsed(slot) => {
                write!(f, "Slot {} was already used this phase.", slot)
            }
            ItemRejection::InsufficientMana { needed, available } => {
                write!(f, "Not enough mana ({} needed, {} left).", needed, available)
            }
            ItemRejection::LivesFull => write!(f, "You are already at max lives."),
            ItemRejection::ManaFull => write!(f, "Your mana is already full."),
            ItemRejection::NothingToRemove => {
                write!(f, "There is no wrong option left to remove.")
            }
        }
    }
}

/// UI feedback queued by the encounter (floating text, particles, popups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    Correct { xp: u32 },
    Wrong { lives_left: u32 },
    ItemUsed { slot: HotbarSlot, item: &'static str },
    Rejected(ItemRejection),
    /// Interrupts the encounter view until acknowledged.
    ShowExample { text: String },
}

/// Result of a successful hotbar action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUse {
    pub slot: HotbarSlot,
    pub item: &'static str,
    pub effect: Option<EffectFlag>,
    pub vitals: Vitals,
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub xp_awarded: u32,
    pub lives: u32,
    /// Set when the attempt is over; resolve after this delay.
    pub resolve_after: Option<Duration>,
}

const NO_EXAMPLE: &str = "No example is available for this question.";

#[derive(Debug, Clone)]
pub struct Encounter {
    phase: PhaseNumber,
    rules: EncounterRules,
    status: EncounterStatus,
    questions: Vec<Question>,
    cursor: usize,
    state: EncounterState,
    removed_option: Option<usize>,
    pending_resolution: bool,
    feedback: VecDeque<FeedbackEvent>,
}

impl Encounter {
    /// Start a new attempt in `Loading` with the saved vitals clamped to the rules.
    pub fn new(phase: PhaseNumber, rules: EncounterRules, vitals: Vitals) -> Self {
        let vitals = starting_vitals(vitals, &rules);
        Self {
            phase,
            rules,
            status: EncounterStatus::Loading,
            questions: Vec::new(),
            cursor: 0,
            state: EncounterState::fresh(vitals),
            removed_option: None,
            pending_resolution: false,
            feedback: VecDeque::new(),
        }
    }

    pub fn load(&mut self, questions: Vec<Question>) -> Result<(), QuizError> {
        if self.status != EncounterStatus::Loading {
            return Err(QuizError::InvalidState(format!(
                "phase {} already loaded",
                self.phase
            )));
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions(self.phase));
        }
        self.questions = questions;
        self.status = EncounterStatus::AwaitingAnswer;
        Ok(())
    }

    pub fn phase(&self) -> PhaseNumber {
        self.phase
    }

    pub fn rules(&self) -> &EncounterRules {
        &self.rules
    }

    pub fn status(&self) -> EncounterStatus {
        self.status
    }

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    pub fn is_pending_resolution(&self) -> bool {
        self.pending_resolution
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 1-based number of the question on screen.
    pub fn question_number(&self) -> usize {
        (self.cursor + 1).min(self.questions.len())
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.accepting_input() {
            self.questions.get(self.cursor)
        } else {
            None
        }
    }

    /// Options to display, minus any removed by a remove-wrong ability.
    pub fn visible_options(&self) -> Vec<&str> {
        let Some(question) = self.current_question() else {
            return Vec::new();
        };
        question
            .options
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != self.removed_option)
            .map(|(_, opt)| opt.as_str())
            .collect()
    }

    pub fn drain_feedback(&mut self) -> Vec<FeedbackEvent> {
        self.feedback.drain(..).collect()
    }

    fn accepting_input(&self) -> bool {
        self.status == EncounterStatus::AwaitingAnswer && !self.pending_resolution
    }

    /// Queue the on-screen message for a refused action and hand the reason back.
    pub fn note_rejection(&mut self, reason: ItemRejection) -> ItemRejection {
        self.feedback.push_back(FeedbackEvent::Rejected(reason.clone()));
        reason
    }

    fn reject(&mut self, reason: ItemRejection) -> Result<ItemUse, ItemRejection> {
        Err(self.note_rejection(reason))
    }

    /// Apply the item bound to `slot`. Rejections leave the state untouched.
    pub fn use_item(
        &mut self,
        slot: HotbarSlot,
        item: &'static ItemDef,
    ) -> Result<ItemUse, ItemRejection> {
        if !self.accepting_input() {
            return self.reject(ItemRejection::NotAwaitingAnswer);
        }
        if self.state.used_slots.contains(&slot) {
            return self.reject(ItemRejection::SlotAlreadyUsed(slot));
        }
        if item.mana_cost > self.state.mana {
            return self.reject(ItemRejection::InsufficientMana {
                needed: item.mana_cost,
                available: self.state.mana,
            });
        }

        let mut effect = None;
        match item.effect {
            ItemEffect::RestoreLives(amount) => {
                if self.state.lives >= self.rules.max_lives {
                    return self.reject(ItemRejection::LivesFull);
                }
                self.state.lives = (self.state.lives + amount).min(self.rules.max_lives);
            }
            ItemEffect::RestoreMana(amount) => {
                if self.state.mana >= self.rules.max_mana {
                    return self.reject(ItemRejection::ManaFull);
                }
                self.state.mana = (self.state.mana + amount).min(self.rules.max_mana);
            }
            ItemEffect::Grant(flag) => {
                if flag == EffectFlag::RemoveWrong && !self.can_remove_wrong_option() {
                    return self.reject(ItemRejection::NothingToRemove);
                }
                self.state.mana -= item.mana_cost;
                self.state.active_effects.insert(flag);
                if flag == EffectFlag::RemoveWrong {
                    self.remove_wrong_option();
                }
                effect = Some(flag);
            }
        }

        self.state.used_slots.insert(slot);
        self.feedback.push_back(FeedbackEvent::ItemUsed {
            slot,
            item: item.id,
        });

        let example = if item.shows_example() {
            let text = self
                .questions
                .get(self.cursor)
                .and_then(|q| q.example.clone())
                .unwrap_or_else(|| NO_EXAMPLE.to_string());
            self.feedback
                .push_back(FeedbackEvent::ShowExample { text: text.clone() });
            Some(text)
        } else {
            None
        };

        Ok(ItemUse {
            slot,
            item: item.id,
            effect,
            vitals: self.state.vitals(),
            example,
        })
    }

    /// At least two options stay on screen, and only one is ever hidden.
    fn can_remove_wrong_option(&self) -> bool {
        self.removed_option.is_none()
            && self.questions.get(self.cursor).is_some_and(|q| {
                q.options.len() > 2 && !q.wrong_option_indices().is_empty()
            })
    }

    fn remove_wrong_option(&mut self) {
        if !self.can_remove_wrong_option() {
            return;
        }
        if let Some(question) = self.questions.get(self.cursor) {
            let wrong = question.wrong_option_indices();
            self.removed_option = wrong.choose(&mut rand::thread_rng()).copied();
        }
    }

    /// Resolve the answer to the question on screen.
    ///
    /// Both outcomes move past the question; a wrong answer is never shown
    /// again in the same attempt.
    pub fn submit_answer(&mut self, option: &str) -> Result<AnswerOutcome, QuizError> {
        if !self.accepting_input() {
            return Err(QuizError::InvalidState(
                "no question is awaiting an answer".to_string(),
            ));
        }
        let question = self
            .questions
            .get(self.cursor)
            .ok_or_else(|| QuizError::Internal("question cursor out of range".to_string()))?;

        let correct = question.is_correct(option);
        let mut xp_awarded = 0;
        if correct {
            xp_awarded = if self.state.has_active_effect() {
                self.rules.xp_low
            } else {
                self.rules.xp_high
            };
            self.state.correct_count += 1;
            self.state.total_xp_earned += xp_awarded;
            self.state.active_effects.clear();
            self.feedback
                .push_back(FeedbackEvent::Correct { xp: xp_awarded });
        } else {
            self.state.lives = self.state.lives.saturating_sub(1);
            self.state.wrong_count += 1;
            self.feedback.push_back(FeedbackEvent::Wrong {
                lives_left: self.state.lives,
            });
        }

        self.cursor += 1;
        self.removed_option = None;

        let finished = self.cursor >= self.questions.len() || self.state.lives == 0;
        if finished {
            self.pending_resolution = true;
        }

        Ok(AnswerOutcome {
            correct,
            xp_awarded,
            lives: self.state.lives,
            resolve_after: finished.then_some(self.rules.resolve_delay),
        })
    }

    /// Close the attempt once the final answer has been given.
    pub fn resolve(&mut self) -> Result<PhaseResult, QuizError> {
        if !self.pending_resolution || self.status != EncounterStatus::AwaitingAnswer {
            return Err(QuizError::InvalidState(format!(
                "phase {} is not ready to resolve",
                self.phase
            )));
        }
        self.pending_resolution = false;
        self.status = EncounterStatus::Resolved;
        Ok(PhaseResult::tally(
            self.phase,
            self.state.correct_count,
            self.state.wrong_count,
            self.state.total_xp_earned,
            &self.rules,
        ))
    }

    /// Start over on the same questions with the last saved vitals.
    pub fn retry(&mut self, saved: Vitals) -> Result<(), QuizError> {
        if self.status != EncounterStatus::Resolved {
            return Err(QuizError::InvalidState(format!(
                "phase {} has not been resolved",
                self.phase
            )));
        }
        self.state = EncounterState::fresh(starting_vitals(saved, &self.rules));
        self.cursor = 0;
        self.removed_option = None;
        self.feedback.clear();
        self.status = EncounterStatus::AwaitingAnswer;
        Ok(())
    }
}

/// Clamp saved vitals into range. Otherwise the save carries over as-is.
fn starting_vitals(saved: Vitals, rules: &EncounterRules) -> Vitals {
    Vitals {
        lives: saved.lives.min(rules.max_lives),
        mana: saved.mana.min(rules.max_mana),
    }
}
