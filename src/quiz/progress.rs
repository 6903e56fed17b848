//! Phase outcome bookkeeping: pass/fail, coin reward, and the per-phase
//! progress record written into the player profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::types::{EncounterRules, PhaseNumber, PhaseProgress, PlayerProfile};

/// Final tally of one phase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: PhaseNumber,
    pub passed: bool,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub xp_earned: u32,
    pub coins: u32,
}

impl PhaseResult {
    /// Pass/fail depends only on the correct count, not on how the attempt ended.
    pub fn tally(
        phase: PhaseNumber,
        correct_count: u32,
        wrong_count: u32,
        xp_earned: u32,
        rules: &EncounterRules,
    ) -> Self {
        let passed = correct_count >= rules.pass_threshold;
        Self {
            phase,
            passed,
            correct_count,
            wrong_count,
            xp_earned,
            coins: if passed { rules.coin_bonus } else { 0 },
        }
    }

    pub fn to_progress(&self, recorded_at: DateTime<Utc>) -> PhaseProgress {
        PhaseProgress {
            phase: self.phase,
            completed: self.passed,
            correct_count: self.correct_count,
            wrong_count: self.wrong_count,
            xp_earned: self.xp_earned,
            coins_awarded: self.coins,
            recorded_at,
        }
    }

    /// Short results-screen text.
    pub fn summary_line(&self) -> String {
        if self.passed {
            format!(
                "Phase {} cleared! {} correct, {} wrong, +{} XP, +{} coins",
                self.phase, self.correct_count, self.wrong_count, self.xp_earned, self.coins
            )
        } else {
            format!(
                "Phase {} failed. {} correct, {} wrong, +{} XP",
                self.phase, self.correct_count, self.wrong_count, self.xp_earned
            )
        }
    }
}

/// Store a progress record and raise the highest-phase marker.
///
/// A later failed attempt never overwrites an earlier completed record for
/// the same phase.
pub fn record_phase(profile: &mut PlayerProfile, record: PhaseProgress) {
    let phase = record.phase;
    let keep_existing = profile
        .phase_progress
        .get(&phase)
        .is_some_and(|existing| existing.completed && !record.completed);
    if !keep_existing {
        profile.phase_progress.insert(phase, record);
    }
    if phase > profile.highest_phase {
        profile.highest_phase = phase;
    }
}

/// First phase the player has not completed yet.
pub fn next_open_phase(profile: &PlayerProfile) -> PhaseNumber {
    let mut phase = 1;
    while profile.is_phase_completed(phase) {
        phase += 1;
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> EncounterRules {
        EncounterRules::default()
    }

    #[test]
    fn pass_requires_threshold_correct_answers() {
        let result = PhaseResult::tally(1, 3, 2, 90, &rules());
        assert!(result.passed);
        assert_eq!(result.coins, rules().coin_bonus);

        let result = PhaseResult::tally(1, 2, 0, 60, &rules());
        assert!(!result.passed);
        assert_eq!(result.coins, 0);
    }

    #[test]
    fn record_phase_raises_highest_phase_only_upwards() {
        let mut profile = PlayerProfile::new("alice", &rules());
        let now = Utc::now();
        record_phase(&mut profile, PhaseResult::tally(3, 3, 0, 90, &rules()).to_progress(now));
        assert_eq!(profile.highest_phase, 3);
        record_phase(&mut profile, PhaseResult::tally(2, 3, 0, 90, &rules()).to_progress(now));
        assert_eq!(profile.highest_phase, 3);
        assert!(profile.is_phase_completed(2));
    }

    #[test]
    fn failed_retry_keeps_completed_record() {
        let mut profile = PlayerProfile::new("alice", &rules());
        let now = Utc::now();
        record_phase(&mut profile, PhaseResult::tally(1, 4, 1, 120, &rules()).to_progress(now));
        record_phase(&mut profile, PhaseResult::tally(1, 0, 4, 0, &rules()).to_progress(now));
        let record = profile.phase_progress.get(&1).expect("record");
        assert!(record.completed);
        assert_eq!(record.correct_count, 4);
    }

    #[test]
    fn next_open_phase_skips_completed() {
        let mut profile = PlayerProfile::new("alice", &rules());
        assert_eq!(next_open_phase(&profile), 1);
        let now = Utc::now();
        record_phase(&mut profile, PhaseResult::tally(1, 3, 0, 90, &rules()).to_progress(now));
        record_phase(&mut profile, PhaseResult::tally(2, 1, 3, 30, &rules()).to_progress(now));
        assert_eq!(next_open_phase(&profile), 2);
    }
}
