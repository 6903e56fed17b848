use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::IVec;

use crate::quiz::errors::QuizError;
use crate::quiz::progress::record_phase;
use crate::quiz::types::{ItemId, PhaseProgress, PlayerProfile, PROFILE_SCHEMA_VERSION};

const TREE_PROFILES: &str = "quizquest_profiles";

/// A field-level change to a stored profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    Vitals { lives: u32, mana: u32 },
    ItemUsed { item: ItemId },
    XpGained(u32),
    CoinsAwarded(u32),
    PhaseCompleted(PhaseProgress),
}

impl ProfileUpdate {
    pub fn apply_to(&self, profile: &mut PlayerProfile) {
        match self {
            ProfileUpdate::Vitals { lives, mana } => {
                profile.lives = *lives;
                profile.mana = *mana;
            }
            ProfileUpdate::ItemUsed { item } => {
                *profile.item_usage.entry(item.clone()).or_insert(0) += 1;
            }
            ProfileUpdate::XpGained(xp) => {
                profile.total_xp = profile.total_xp.saturating_add(*xp);
            }
            ProfileUpdate::CoinsAwarded(coins) => {
                profile.coins = profile.coins.saturating_add(*coins);
            }
            ProfileUpdate::PhaseCompleted(record) => record_phase(profile, record.clone()),
        }
    }
}

/// Persistence boundary for player profiles.
pub trait ProfileStore: Send + Sync {
    fn read(&self, username: &str) -> Result<PlayerProfile, QuizError>;

    /// Overwrite the whole stored profile.
    fn write(&self, profile: &PlayerProfile) -> Result<(), QuizError>;

    /// Apply `updates` atomically against the latest stored profile and
    /// return the result.
    fn apply(
        &self,
        username: &str,
        updates: &[ProfileUpdate],
    ) -> Result<PlayerProfile, QuizError>;
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct SledProfileStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl SledProfileStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Delete the database when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<SledProfileStore, QuizError> {
        std::fs::create_dir_all(&self.path)?;
        let db = sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary)
            .open()?;
        SledProfileStore::from_db(db)
    }
}

/// Sled-backed profile persistence. Profiles are bincode-encoded.
pub struct SledProfileStore {
    _db: sled::Db,
    profiles: sled::Tree,
}

impl SledProfileStore {
    /// Open (or create) the profile store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, QuizError> {
        SledProfileStoreBuilder::new(path.as_ref()).open()
    }

    fn from_db(db: sled::Db) -> Result<Self, QuizError> {
        let profiles = db.open_tree(TREE_PROFILES)?;
        Ok(Self { _db: db, profiles })
    }

    fn profile_key(username: &str) -> Vec<u8> {
        format!("profiles:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn serialize(profile: &PlayerProfile) -> Result<Vec<u8>, QuizError> {
        Ok(bincode::serialize(profile)?)
    }

    fn deserialize(bytes: &IVec) -> Result<PlayerProfile, QuizError> {
        let record: PlayerProfile = bincode::deserialize(bytes)?;
        if record.schema_version != PROFILE_SCHEMA_VERSION {
            return Err(QuizError::SchemaMismatch {
                entity: "profile",
                expected: PROFILE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn exists(&self, username: &str) -> Result<bool, QuizError> {
        Ok(self.profiles.contains_key(Self::profile_key(username))?)
    }

    /// List all stored usernames.
    pub fn list_usernames(&self) -> Result<Vec<String>, QuizError> {
        let mut names = Vec::new();
        for entry in self.profiles.scan_prefix(b"profiles:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(username) = text.strip_prefix("profiles:") {
                names.push(username.to_string());
            }
        }
        Ok(names)
    }
}

impl ProfileStore for SledProfileStore {
    fn read(&self, username: &str) -> Result<PlayerProfile, QuizError> {
        let key = Self::profile_key(username);
        let Some(bytes) = self.profiles.get(&key)? else {
            return Err(QuizError::NotFound(format!("profile: {}", username)));
        };
        Self::deserialize(&bytes)
    }

    fn write(&self, profile: &PlayerProfile) -> Result<(), QuizError> {
        let mut profile = profile.clone();
        profile.schema_version = PROFILE_SCHEMA_VERSION;
        profile.touch();
        let key = Self::profile_key(&profile.username);
        let bytes = Self::serialize(&profile)?;
        self.profiles.insert(key, bytes)?;
        self.profiles.flush()?;
        Ok(())
    }

    fn apply(
        &self,
        username: &str,
        updates: &[ProfileUpdate],
    ) -> Result<PlayerProfile, QuizError> {
        let key = Self::profile_key(username);
        let result = self.profiles.transaction(|tx| {
            let Some(bytes) = tx.get(key.as_slice())? else {
                return Err(ConflictableTransactionError::Abort(QuizError::NotFound(
                    format!("profile: {}", username),
                )));
            };
            let mut profile =
                Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
            for update in updates {
                update.apply_to(&mut profile);
            }
            profile.updated_at = Utc::now();
            let encoded = Self::serialize(&profile).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(key.as_slice(), encoded)?;
            Ok(profile)
        });
        let profile = result.map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => QuizError::Sled(err),
        })?;
        self.profiles.flush()?;
        debug!(
            "applied {} profile update(s) for {}",
            updates.len(),
            username
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::types::EncounterRules;
    use tempfile::TempDir;

    fn store() -> (SledProfileStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = SledProfileStoreBuilder::new(dir.path()).open().expect("store");
        (store, dir)
    }

    #[test]
    fn store_round_trip_profile() {
        let (store, _dir) = store();
        let mut profile = PlayerProfile::new("Alice", &EncounterRules::default());
        profile.coins = 42;
        store.write(&profile).expect("write");
        let fetched = store.read("alice").expect("read");
        assert_eq!(fetched.username, "Alice");
        assert_eq!(fetched.coins, 42);
        assert_eq!(fetched.schema_version, PROFILE_SCHEMA_VERSION);
        assert_eq!(store.list_usernames().expect("list"), vec!["alice".to_string()]);
    }

    #[test]
    fn missing_profile_is_not_found() {
        let (store, _dir) = store();
        assert!(matches!(store.read("ghost"), Err(QuizError::NotFound(_))));
        assert!(matches!(
            store.apply("ghost", &[ProfileUpdate::XpGained(5)]),
            Err(QuizError::NotFound(_))
        ));
        assert!(!store.exists("ghost").expect("exists"));
    }

    #[test]
    fn apply_touches_only_named_fields() {
        let (store, _dir) = store();
        let mut profile = PlayerProfile::new("bob", &EncounterRules::default());
        profile.coins = 7;
        store.write(&profile).expect("write");

        let updated = store
            .apply(
                "bob",
                &[
                    ProfileUpdate::Vitals { lives: 2, mana: 1 },
                    ProfileUpdate::ItemUsed {
                        item: "haste".to_string(),
                    },
                    ProfileUpdate::ItemUsed {
                        item: "haste".to_string(),
                    },
                    ProfileUpdate::XpGained(30),
                ],
            )
            .expect("apply");
        assert_eq!(updated.lives, 2);
        assert_eq!(updated.mana, 1);
        assert_eq!(updated.item_usage.get("haste"), Some(&2));
        assert_eq!(updated.total_xp, 30);
        assert_eq!(updated.coins, 7);
        assert_eq!(store.read("bob").expect("read"), updated);
    }
}
