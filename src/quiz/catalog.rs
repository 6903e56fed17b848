//! Static item table used to validate hotbar actions, price shop items and
//! render tooltips.

use serde::Serialize;

use crate::quiz::types::EffectFlag;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Consumable,
    Weapon,
    Skill,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    RestoreLives(u32),
    RestoreMana(u32),
    Grant(EffectFlag),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: ItemCategory,
    pub mana_cost: u32,
    /// Shop price in coins.
    pub price: u32,
    pub effect: ItemEffect,
    pub description: &'static str,
}

impl ItemDef {
    /// Abilities that interrupt the encounter to show the question's example.
    pub fn shows_example(&self) -> bool {
        matches!(
            self.effect,
            ItemEffect::Grant(EffectFlag::Reveal) | ItemEffect::Grant(EffectFlag::RemoveWrong)
        )
    }

    pub fn granted_effect(&self) -> Option<EffectFlag> {
        match self.effect {
            ItemEffect::Grant(flag) => Some(flag),
            _ => None,
        }
    }
}

const STANDARD_ITEMS: &[ItemDef] = &[
    ItemDef {
        id: "health_potion",
        name: "Health Potion",
        category: ItemCategory::Consumable,
        mana_cost: 0,
        price: 15,
        effect: ItemEffect::RestoreLives(1),
        description: "Restores one life.",
    },
    ItemDef {
        id: "mana_potion",
        name: "Mana Potion",
        category: ItemCategory::Consumable,
        mana_cost: 0,
        price: 10,
        effect: ItemEffect::RestoreMana(3),
        description: "Restores three mana.",
    },
    ItemDef {
        id: "iron_sword",
        name: "Iron Sword",
        category: ItemCategory::Weapon,
        mana_cost: 2,
        price: 40,
        effect: ItemEffect::Grant(EffectFlag::PowerStrike),
        description: "Strikes the question down. The next correct answer pays reduced XP.",
    },
    ItemDef {
        id: "seer_lens",
        name: "Seer's Lens",
        category: ItemCategory::Weapon,
        mana_cost: 3,
        price: 60,
        effect: ItemEffect::Grant(EffectFlag::Reveal),
        description: "Reveals a worked example for the current question.",
    },
    ItemDef {
        id: "banish",
        name: "Banish",
        category: ItemCategory::Skill,
        mana_cost: 2,
        price: 50,
        effect: ItemEffect::Grant(EffectFlag::RemoveWrong),
        description: "Banishes one wrong option and shows the example.",
    },
    ItemDef {
        id: "haste",
        name: "Haste",
        category: ItemCategory::Skill,
        mana_cost: 1,
        price: 30,
        effect: ItemEffect::Grant(EffectFlag::ExtraTime),
        description: "Grants extra time to answer.",
    },
];

/// Read-only view over the item table.
#[derive(Debug, Clone, Copy)]
pub struct ItemCatalog {
    items: &'static [ItemDef],
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ItemCatalog {
    pub fn standard() -> Self {
        Self {
            items: STANDARD_ITEMS,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'static ItemDef> {
        self.items.iter().find(|item| item.id.eq_ignore_ascii_case(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ItemDef> {
        self.items.iter()
    }

    /// One-line tooltip, e.g. `Iron Sword [weapon, 2 mana] Strikes ...`.
    pub fn tooltip(&self, id: &str) -> Option<String> {
        let item = self.get(id)?;
        let category = match item.category {
            ItemCategory::Consumable => "consumable",
            ItemCategory::Weapon => "weapon",
            ItemCategory::Skill => "skill",
        };
        Some(if item.mana_cost > 0 {
            format!(
                "{} [{}, {} mana] {}",
                item.name, category, item.mana_cost, item.description
            )
        } else {
            format!("{} [{}] {}", item.name, category, item.description)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ability_grants_a_distinct_flag() {
        let catalog = ItemCatalog::standard();
        let mut flags: Vec<EffectFlag> = catalog
            .iter()
            .filter(|item| item.category != ItemCategory::Consumable)
            .filter_map(ItemDef::granted_effect)
            .collect();
        let total = flags.len();
        flags.sort();
        flags.dedup();
        assert_eq!(flags.len(), total);
        assert_eq!(total, 4);
    }

    #[test]
    fn consumables_grant_no_effect() {
        let catalog = ItemCatalog::standard();
        for item in catalog.iter().filter(|i| i.category == ItemCategory::Consumable) {
            assert!(item.granted_effect().is_none(), "{} grants an effect", item.id);
            assert_eq!(item.mana_cost, 0);
        }
    }

    #[test]
    fn only_reveal_and_banish_show_examples() {
        let catalog = ItemCatalog::standard();
        let showing: Vec<&str> = catalog
            .iter()
            .filter(|item| item.shows_example())
            .map(|item| item.id)
            .collect();
        assert_eq!(showing, vec!["seer_lens", "banish"]);
    }

    #[test]
    fn tooltip_mentions_mana_cost_for_abilities() {
        let catalog = ItemCatalog::standard();
        let tip = catalog.tooltip("iron_sword").expect("tooltip");
        assert!(tip.starts_with("Iron Sword [weapon, 2 mana]"));
        let tip = catalog.tooltip("health_potion").expect("tooltip");
        assert!(tip.starts_with("Health Potion [consumable]"));
        assert!(catalog.tooltip("nope").is_none());
    }
}
