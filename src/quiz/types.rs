use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const PROFILE_SCHEMA_VERSION: u8 = 1;

/// XP required for each level after the first.
pub const XP_PER_LEVEL: u32 = 100;

/// Coins granted to a freshly created profile.
pub const STARTING_COINS: u32 = 50;

pub type PhaseNumber = u32;
pub type ItemId = String;

// ============================================================================
// Questions
// ============================================================================

/// Maximum number of answer options shown for a question.
pub const MAX_OPTIONS: usize = 3;

/// A single quiz question as served by the question source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
    /// Illustrative example shown by reveal-type abilities.
    #[serde(default)]
    pub example: Option<String>,
}

impl Question {
    pub fn new(text: &str, options: &[&str], answer: &str) -> Self {
        Self {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: answer.to_string(),
            example: None,
        }
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// Answers are matched on trimmed text, ignoring ASCII case.
    pub fn is_correct(&self, option: &str) -> bool {
        option.trim().eq_ignore_ascii_case(self.answer.trim())
    }

    /// Indices of options that are not the correct answer.
    pub fn wrong_option_indices(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opt)| !self.is_correct(opt))
            .map(|(idx, _)| idx)
            .collect()
    }
}

// ============================================================================
// Hotbar
// ============================================================================

/// Fixed equip slots: numeric `1`..`8` and letters `A`..`G`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HotbarSlot {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl HotbarSlot {
    pub const ALL: [HotbarSlot; 15] = [
        HotbarSlot::One,
        HotbarSlot::Two,
        HotbarSlot::Three,
        HotbarSlot::Four,
        HotbarSlot::Five,
        HotbarSlot::Six,
        HotbarSlot::Seven,
        HotbarSlot::Eight,
        HotbarSlot::A,
        HotbarSlot::B,
        HotbarSlot::C,
        HotbarSlot::D,
        HotbarSlot::E,
        HotbarSlot::F,
        HotbarSlot::G,
    ];

    pub fn label(self) -> char {
        match self {
            HotbarSlot::One => '1',
            HotbarSlot::Two => '2',
            HotbarSlot::Three => '3',
            HotbarSlot::Four => '4',
            HotbarSlot::Five => '5',
            HotbarSlot::Six => '6',
            HotbarSlot::Seven => '7',
            HotbarSlot::Eight => '8',
            HotbarSlot::A => 'A',
            HotbarSlot::B => 'B',
            HotbarSlot::C => 'C',
            HotbarSlot::D => 'D',
            HotbarSlot::E => 'E',
            HotbarSlot::F => 'F',
            HotbarSlot::G => 'G',
        }
    }

    pub fn from_label(label: char) -> Option<Self> {
        let upper = label.to_ascii_uppercase();
        Self::ALL.into_iter().find(|slot| slot.label() == upper)
    }
}

impl fmt::Display for HotbarSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for HotbarSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_label(c).ok_or_else(|| format!("unknown hotbar slot '{}'", s))
            }
            _ => Err(format!("unknown hotbar slot '{}'", s)),
        }
    }
}

/// Slot → item bindings. A slot missing from the map is empty.
pub type HotbarBindings = BTreeMap<HotbarSlot, ItemId>;

// ============================================================================
// Effects & rules
// ============================================================================

/// Named effect granted by a weapon or skill until the next correct answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EffectFlag {
    /// Weapon strike; changes the XP payout rule for the next answer.
    PowerStrike,
    /// Shows the current question's example.
    Reveal,
    /// Hides one wrong option.
    RemoveWrong,
    /// Extends the answer timer.
    ExtraTime,
}

impl fmt::Display for EffectFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectFlag::PowerStrike => "power strike",
            EffectFlag::Reveal => "reveal",
            EffectFlag::RemoveWrong => "remove wrong",
            EffectFlag::ExtraTime => "extra time",
        };
        f.write_str(name)
    }
}

/// Tunables for one encounter. Built from `[game]` config.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterRules {
    pub max_lives: u32,
    pub max_mana: u32,
    /// Payout for a correct answer while an effect is active.
    pub xp_low: u32,
    /// Payout for an unassisted correct answer.
    pub xp_high: u32,
    pub pass_threshold: u32,
    pub coin_bonus: u32,
    /// Pause before resolving so feedback can finish animating.
    pub resolve_delay: Duration,
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self {
            max_lives: 4,
            max_mana: 5,
            xp_low: 10,
            xp_high: 30,
            pass_threshold: 3,
            coin_bonus: 25,
            resolve_delay: Duration::from_millis(1500),
        }
    }
}

// ============================================================================
// Player profile
// ============================================================================

/// Saved lives/mana carried between attempts and sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vitals {
    pub lives: u32,
    pub mana: u32,
}

impl Vitals {
    pub fn full(rules: &EncounterRules) -> Self {
        Self {
            lives: rules.max_lives,
            mana: rules.max_mana,
        }
    }
}

/// Outcome record for one phase, keyed by phase number in the profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseProgress {
    pub phase: PhaseNumber,
    pub completed: bool,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub xp_earned: u32,
    pub coins_awarded: u32,
    pub recorded_at: DateTime<Utc>,
}

/// The persisted record for one player account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProfile {
    pub username: String,
    pub coins: u32,
    #[serde(default)]
    pub inventory: BTreeMap<ItemId, u32>,
    #[serde(default)]
    pub hotbar: HotbarBindings,
    #[serde(default)]
    pub phase_progress: BTreeMap<PhaseNumber, PhaseProgress>,
    /// Highest phase the player has reached (0 before any attempt).
    #[serde(default)]
    pub highest_phase: PhaseNumber,
    #[serde(default)]
    pub total_xp: u32,
    pub lives: u32,
    pub mana: u32,
    /// Lifetime use counts per item.
    #[serde(default)]
    pub item_usage: BTreeMap<ItemId, u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerProfile {
    pub fn new(username: &str, rules: &EncounterRules) -> Self {
        let now = Utc::now();
        let mut inventory = BTreeMap::new();
        inventory.insert("health_potion".to_string(), 1);
        inventory.insert("mana_potion".to_string(), 1);
        let mut hotbar = HotbarBindings::new();
        hotbar.insert(HotbarSlot::One, "health_potion".to_string());
        hotbar.insert(HotbarSlot::Two, "mana_potion".to_string());
        Self {
            username: username.to_string(),
            coins: STARTING_COINS,
            inventory,
            hotbar,
            phase_progress: BTreeMap::new(),
            highest_phase: 0,
            total_xp: 0,
            lives: rules.max_lives,
            mana: rules.max_mana,
            item_usage: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            schema_version: PROFILE_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn level(&self) -> u32 {
        1 + self.total_xp / XP_PER_LEVEL
    }

    pub fn vitals(&self) -> Vitals {
        Vitals {
            lives: self.lives,
            mana: self.mana,
        }
    }

    pub fn binding(&self, slot: HotbarSlot) -> Option<&str> {
        self.hotbar.get(&slot).map(String::as_str)
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    pub fn is_phase_completed(&self, phase: PhaseNumber) -> bool {
        self.phase_progress
            .get(&phase)
            .is_some_and(|record| record.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotbar_slot_labels_round_trip() {
        for slot in HotbarSlot::ALL {
            let parsed: HotbarSlot = slot.to_string().parse().expect("parse label");
            assert_eq!(parsed, slot);
        }
        assert_eq!("a".parse::<HotbarSlot>(), Ok(HotbarSlot::A));
        assert!("9".parse::<HotbarSlot>().is_err());
        assert!("H".parse::<HotbarSlot>().is_err());
        assert!("12".parse::<HotbarSlot>().is_err());
    }

    #[test]
    fn hotbar_serializes_with_slot_labels() {
        let mut bindings = HotbarBindings::new();
        bindings.insert(HotbarSlot::Three, "iron_sword".to_string());
        bindings.insert(HotbarSlot::C, "haste".to_string());
        let json = serde_json::to_string(&bindings).expect("json");
        assert_eq!(json, r#"{"3":"iron_sword","C":"haste"}"#);
    }

    #[test]
    fn answers_match_ignoring_case_and_whitespace() {
        let q = Question::new("2 + 2?", &["3", "Four", "5"], "four");
        assert!(q.is_correct(" FOUR "));
        assert!(!q.is_correct("5"));
        assert_eq!(q.wrong_option_indices(), vec![0, 2]);
    }

    #[test]
    fn level_grows_every_hundred_xp() {
        let mut profile = PlayerProfile::new("alice", &EncounterRules::default());
        assert_eq!(profile.level(), 1);
        profile.total_xp = 99;
        assert_eq!(profile.level(), 1);
        profile.total_xp = 250;
        assert_eq!(profile.level(), 3);
    }

    #[test]
    fn new_profile_starts_with_starter_hotbar() {
        let profile = PlayerProfile::new("bob", &EncounterRules::default());
        assert_eq!(profile.binding(HotbarSlot::One), Some("health_potion"));
        assert_eq!(profile.binding(HotbarSlot::Two), Some("mana_potion"));
        assert_eq!(profile.binding(HotbarSlot::A), None);
        assert_eq!(profile.lives, 4);
        assert_eq!(profile.mana, 5);
    }
}
