//! Item consumption triggered by player actions.
//!
//! An action uses an item when it mentions both the item's name and one of the
//! locale's "use" keywords ("drink potion", "I eat the bread"). Only the first
//! matching inventory entry is consumed.

use crate::game_data::{render, KeywordCategory, KeywordTable, Phrasebook};
use crate::items::{EffectDelta, ItemCatalog};
use crate::text::{normalize_whitespace, strip_markup};
use serde::{Deserialize, Serialize};

fn one() -> u32 {
    1
}

/// A stack of items in the hero's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// An inventory entry as sent by clients: a bare item name or a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryEntry {
    Named(String),
    Stacked(InventoryItem),
}

impl InventoryEntry {
    pub fn name(&self) -> &str {
        match self {
            InventoryEntry::Named(name) => name,
            InventoryEntry::Stacked(item) => &item.name,
        }
    }

    /// Bare names count as a single item.
    pub fn normalize(&self) -> InventoryItem {
        match self {
            InventoryEntry::Named(name) => InventoryItem::new(name.clone(), 1),
            InventoryEntry::Stacked(item) => item.clone(),
        }
    }
}

impl From<InventoryItem> for InventoryEntry {
    fn from(item: InventoryItem) -> Self {
        InventoryEntry::Stacked(item)
    }
}

impl From<&str> for InventoryEntry {
    fn from(name: &str) -> Self {
        InventoryEntry::Named(name.to_string())
    }
}

/// Non-fatal problems met while resolving an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum InventoryWarning {
    /// The item is in the inventory but none are left.
    InsufficientQuantity { item: String },
}

impl InventoryWarning {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            InventoryWarning::InsufficientQuantity { .. } => "insufficient_quantity",
        }
    }

    /// Player-facing text.
    pub fn describe(&self, phrases: &Phrasebook) -> String {
        match self {
            InventoryWarning::InsufficientQuantity { item } => {
                render(&phrases.insufficient_quantity, &[("item", item)])
            }
        }
    }
}

/// The result of resolving an action against the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOutcome {
    pub consumed_items: Vec<InventoryItem>,
    /// The inventory after this action.
    pub persistent_items: Vec<InventoryItem>,
    pub effects: EffectDelta,
    pub warnings: Vec<InventoryWarning>,
    /// Narration of the item use, empty if nothing was used.
    pub reply: String,
    /// The sanitized hero name.
    pub hero: String,
}

impl InventoryOutcome {
    pub fn used_item(&self) -> bool {
        !self.consumed_items.is_empty()
    }
}

/// Resolves item use for one locale.
#[derive(Debug, Clone, Copy)]
pub struct InventoryResolver<'a> {
    keywords: &'a KeywordTable,
    catalog: &'a ItemCatalog,
    phrases: &'a Phrasebook,
}

impl<'a> InventoryResolver<'a> {
    pub fn new(keywords: &'a KeywordTable, catalog: &'a ItemCatalog, phrases: &'a Phrasebook) -> Self {
        Self {
            keywords,
            catalog,
            phrases,
        }
    }

    /// Resolve `action` against `inventory`.
    ///
    /// The first entry (in inventory order) whose name occurs in the action
    /// is used, provided the action also contains a use keyword. The input is
    /// never modified; the updated inventory is in `persistent_items`.
    pub fn resolve(
        &self,
        action: &str,
        inventory: &[InventoryEntry],
        hero_name: &str,
    ) -> InventoryOutcome {
        let hero = sanitize_hero_name(hero_name, &self.phrases.unknown_hero);
        let mut items: Vec<InventoryItem> = inventory.iter().map(InventoryEntry::normalize).collect();

        let action_lower = action.to_lowercase();
        let unchanged = |items: Vec<InventoryItem>, hero: String| InventoryOutcome {
            persistent_items: items,
            hero,
            ..InventoryOutcome::default()
        };

        if !self.keywords.matches(KeywordCategory::UseItem, &action_lower) {
            return unchanged(items, hero);
        }

        let Some(index) = items.iter().position(|item| {
            let name = item.name.trim().to_lowercase();
            !name.is_empty() && action_lower.contains(&name)
        }) else {
            return unchanged(items, hero);
        };

        let item_name = items[index].name.clone();

        if items[index].quantity < 1 {
            tracing::debug!(item = %item_name, "Item use blocked, none left");
            return InventoryOutcome {
                warnings: vec![InventoryWarning::InsufficientQuantity { item: item_name }],
                ..unchanged(items, hero)
            };
        }

        items[index].quantity -= 1;
        if items[index].quantity == 0 {
            items.remove(index);
        }

        let effects = self.catalog.effects_for(&item_name);
        let reply = render(
            &self.phrases.item_used,
            &[("hero", &hero), ("item", &item_name)],
        );
        tracing::debug!(item = %item_name, ?effects, "Item used");

        InventoryOutcome {
            consumed_items: vec![InventoryItem::new(item_name, 1)],
            persistent_items: items,
            effects,
            warnings: Vec::new(),
            reply,
            hero,
        }
    }
}

/// Clean a player-supplied hero name.
///
/// Markup is removed first. What remains may only hold letters, spaces,
/// hyphens and apostrophes; anything else yields `placeholder`.
pub fn sanitize_hero_name(raw: &str, placeholder: &str) -> String {
    let name = normalize_whitespace(&strip_markup(raw));
    let allowed = |c: char| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'' || c == '’';

    if name.is_empty() || !name.chars().all(allowed) {
        placeholder.to_string()
    } else {
        name
    }
}
