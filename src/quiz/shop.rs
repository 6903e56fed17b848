//! Item shop and hotbar equipping.
//!
//! These operate on an in-memory [`PlayerProfile`]; callers persist the
//! result with [`crate::quiz::storage::ProfileStore::write`].

use crate::quiz::catalog::ItemCatalog;
use crate::quiz::errors::QuizError;
use crate::quiz::types::{HotbarSlot, PlayerProfile};

/// Maximum copies of one item a player may hold.
pub const MAX_ITEM_QUANTITY: u32 = 99;

/// Buy `quantity` of `item_id`. Returns the coins spent.
pub fn purchase(
    profile: &mut PlayerProfile,
    catalog: &ItemCatalog,
    item_id: &str,
    quantity: u32,
) -> Result<u32, QuizError> {
    let item = catalog
        .get(item_id)
        .ok_or_else(|| QuizError::UnknownItem(item_id.to_string()))?;
    if quantity == 0 {
        return Ok(0);
    }

    let owned = profile.item_count(item.id);
    let quantity = quantity.min(MAX_ITEM_QUANTITY.saturating_sub(owned));
    if quantity == 0 {
        return Err(QuizError::InvalidState(format!(
            "already carrying the maximum of {} {}",
            MAX_ITEM_QUANTITY, item.name
        )));
    }

    let cost = item.price.saturating_mul(quantity);
    if cost > profile.coins {
        return Err(QuizError::InsufficientFunds {
            needed: cost,
            available: profile.coins,
        });
    }

    profile.coins -= cost;
    *profile.inventory.entry(item.id.to_string()).or_insert(0) += quantity;
    profile.touch();
    Ok(cost)
}

/// Bind an owned item to a hotbar slot, replacing whatever was there.
pub fn equip(
    profile: &mut PlayerProfile,
    catalog: &ItemCatalog,
    slot: HotbarSlot,
    item_id: &str,
) -> Result<Option<String>, QuizError> {
    let item = catalog
        .get(item_id)
        .ok_or_else(|| QuizError::UnknownItem(item_id.to_string()))?;
    if profile.item_count(item.id) == 0 {
        return Err(QuizError::NotFound(format!("{} in inventory", item.name)));
    }
    let previous = profile.hotbar.insert(slot, item.id.to_string());
    profile.touch();
    Ok(previous)
}

/// Clear a hotbar slot. Returns the item that was bound, if any.
pub fn unequip(profile: &mut PlayerProfile, slot: HotbarSlot) -> Option<String> {
    let previous = profile.hotbar.remove(&slot);
    if previous.is_some() {
        profile.touch();
    }
    previous
}

/// Format the shop listing
pub fn format_shop_listing(catalog: &ItemCatalog, coins: u32) -> String {
    let mut output = format!("=== ITEM SHOP ===  (you have {} coins)\n", coins);
    for item in catalog.iter() {
        let affordable = if item.price <= coins { ' ' } else { '*' };
        output.push_str(&format!(
            "{}{:<14} {:>4}c  {}\n",
            affordable, item.id, item.price, item.description
        ));
    }
    output.push_str("* = not enough coins\n");
    output
}

/// Format the hotbar, one slot per line, empty slots skipped.
pub fn format_hotbar(profile: &PlayerProfile, catalog: &ItemCatalog) -> String {
    let mut output = String::new();
    for slot in HotbarSlot::ALL {
        if let Some(item_id) = profile.binding(slot) {
            let name = catalog.get(item_id).map(|item| item.name).unwrap_or(item_id);
            output.push_str(&format!(
                "[{}] {} x{}\n",
                slot,
                name,
                profile.item_count(item_id)
            ));
        }
    }
    if output.is_empty() {
        output.push_str("(hotbar empty)\n");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::types::{EncounterRules, STARTING_COINS};

    fn profile() -> PlayerProfile {
        PlayerProfile::new("alice", &EncounterRules::default())
    }

    #[test]
    fn purchase_deducts_coins_and_adds_inventory() {
        let mut profile = profile();
        let catalog = ItemCatalog::standard();
        let spent = purchase(&mut profile, &catalog, "haste", 1).expect("buy");
        assert_eq!(spent, 30);
        assert_eq!(profile.coins, STARTING_COINS - 30);
        assert_eq!(profile.item_count("haste"), 1);
    }

    #[test]
    fn purchase_without_funds_changes_nothing() {
        let mut profile = profile();
        let catalog = ItemCatalog::standard();
        let err = purchase(&mut profile, &catalog, "seer_lens", 1).unwrap_err();
        assert!(matches!(
            err,
            QuizError::InsufficientFunds {
                needed: 60,
                available: STARTING_COINS
            }
        ));
        assert_eq!(profile.coins, STARTING_COINS);
        assert_eq!(profile.item_count("seer_lens"), 0);
    }

    #[test]
    fn unknown_items_are_refused() {
        let mut profile = profile();
        let catalog = ItemCatalog::standard();
        assert!(matches!(
            purchase(&mut profile, &catalog, "laser", 1),
            Err(QuizError::UnknownItem(_))
        ));
        assert!(matches!(
            equip(&mut profile, &catalog, HotbarSlot::A, "laser"),
            Err(QuizError::UnknownItem(_))
        ));
    }

    #[test]
    fn equip_requires_owned_item_and_replaces_binding() {
        let mut profile = profile();
        let catalog = ItemCatalog::standard();
        assert!(equip(&mut profile, &catalog, HotbarSlot::One, "haste").is_err());

        purchase(&mut profile, &catalog, "haste", 1).expect("buy");
        let previous = equip(&mut profile, &catalog, HotbarSlot::One, "haste").expect("equip");
        assert_eq!(previous.as_deref(), Some("health_potion"));
        assert_eq!(profile.binding(HotbarSlot::One), Some("haste"));

        assert_eq!(unequip(&mut profile, HotbarSlot::One).as_deref(), Some("haste"));
        assert_eq!(unequip(&mut profile, HotbarSlot::One), None);
    }

    #[test]
    fn listing_marks_unaffordable_items() {
        let listing = format_shop_listing(&ItemCatalog::standard(), 20);
        assert!(listing.contains(" health_potion"));
        assert!(listing.contains("*iron_sword"));
    }

    #[test]
    fn hotbar_lists_bound_slots() {
        let text = format_hotbar(&profile(), &ItemCatalog::standard());
        assert_eq!(text, "[1] Health Potion x1\n[2] Mana Potion x1\n");
    }
}
