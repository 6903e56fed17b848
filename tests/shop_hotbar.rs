/// Integration tests for buying items, binding them to the hotbar and using
/// them inside an encounter.
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use quizquest::quiz::{
    equip, purchase, DisabledScoreSink, EffectFlag, EncounterDriver, EncounterRules,
    FeedbackEvent, GameSession, HotbarSlot, ItemCatalog, ProfileStore, Question, QuestionBank,
    QuizError, SledProfileStore, StartOutcome,
};

fn rules() -> EncounterRules {
    EncounterRules {
        resolve_delay: Duration::ZERO,
        ..EncounterRules::default()
    }
}

#[tokio::test]
async fn bought_and_equipped_skill_is_usable_in_encounter() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ProfileStore> = Arc::new(SledProfileStore::open(dir.path()).unwrap());
    let session = Arc::new(GameSession::new(
        "carol",
        Arc::clone(&store),
        Arc::new(DisabledScoreSink),
        rules(),
    ));
    let catalog = ItemCatalog::standard();

    let mut profile = session.load_or_create_profile().unwrap();
    profile.coins = 100;
    purchase(&mut profile, &catalog, "banish", 1).unwrap();
    equip(&mut profile, &catalog, HotbarSlot::B, "banish").unwrap();
    store.write(&profile).unwrap();

    let reloaded = store.read("carol").unwrap();
    assert_eq!(reloaded.coins, 50);
    assert_eq!(reloaded.binding(HotbarSlot::B), Some("banish"));

    let bank = QuestionBank::new().with_phase(
        1,
        vec![Question::new("Capital of France?", &["Paris", "Rome", "Oslo"], "Paris")
            .with_example("Paris sits on the Seine.")],
    );
    let mut driver = match EncounterDriver::start(Arc::clone(&session), &bank, 1) {
        StartOutcome::Ready(driver) => driver,
        StartOutcome::ReturnToOverworld { reason, .. } => panic!("{}", reason),
    };

    let used = driver.use_slot(HotbarSlot::B).unwrap();
    assert_eq!(used.effect, Some(EffectFlag::RemoveWrong));
    assert_eq!(used.example.as_deref(), Some("Paris sits on the Seine."));
    assert!(driver
        .drain_feedback()
        .contains(&FeedbackEvent::ShowExample {
            text: "Paris sits on the Seine.".to_string()
        }));

    let visible = driver.encounter().visible_options();
    assert_eq!(visible.len(), 2);
    assert!(visible.contains(&"Paris"));

    let outcome = driver.answer("Paris").unwrap();
    assert_eq!(outcome.xp_awarded, rules().xp_low);

    let stored = store.read("carol").unwrap();
    assert_eq!(stored.mana, 3);
    assert_eq!(stored.item_usage.get("banish"), Some(&1));
}

#[test]
fn purchase_is_refused_without_coins() {
    let catalog = ItemCatalog::standard();
    let mut profile = quizquest::quiz::PlayerProfile::new("dave", &rules());
    profile.coins = 5;
    let err = purchase(&mut profile, &catalog, "mana_potion", 1).unwrap_err();
    assert!(matches!(err, QuizError::InsufficientFunds { needed: 10, available: 5 }));
    assert!(equip(&mut profile, &catalog, HotbarSlot::C, "seer_lens").is_err());
}
