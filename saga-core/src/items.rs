//! Item catalog: stat effects of consumable items.
//!
//! Effects are looked up by name, case-insensitively. Items that are not in the
//! catalog still exist in the game; using them simply has no effect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An attribute an item can modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Hp,
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Hp,
        Attribute::Strength,
        Attribute::Dexterity,
        Attribute::Constitution,
        Attribute::Intelligence,
        Attribute::Wisdom,
        Attribute::Charisma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Hp => "hp",
            Attribute::Strength => "strength",
            Attribute::Dexterity => "dexterity",
            Attribute::Constitution => "constitution",
            Attribute::Intelligence => "intelligence",
            Attribute::Wisdom => "wisdom",
            Attribute::Charisma => "charisma",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Signed changes to the hero's attributes. All zero by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDelta {
    pub hp: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl EffectDelta {
    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Hp => self.hp,
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: i32) {
        let slot = match attribute {
            Attribute::Hp => &mut self.hp,
            Attribute::Strength => &mut self.strength,
            Attribute::Dexterity => &mut self.dexterity,
            Attribute::Constitution => &mut self.constitution,
            Attribute::Intelligence => &mut self.intelligence,
            Attribute::Wisdom => &mut self.wisdom,
            Attribute::Charisma => &mut self.charisma,
        };
        *slot = value;
    }

    /// Builder-style setter.
    pub fn with(mut self, attribute: Attribute, value: i32) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn is_zero(&self) -> bool {
        Attribute::ALL.iter().all(|&a| self.get(a) == 0)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    pub effects: EffectDelta,
    pub description: Option<String>,
}

impl CatalogItem {
    pub fn new(effects: EffectDelta) -> Self {
        Self {
            effects,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Item effects keyed by lower-cased item name.
///
/// Serialized as a plain JSON object: `{"potion": {"effects": {"hp": 10}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog {
    items: HashMap<String, CatalogItem>,
}

impl ItemCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog.
    pub fn standard() -> Self {
        STANDARD_ITEMS.clone()
    }

    /// Add or replace an item.
    pub fn with_item(mut self, name: &str, item: CatalogItem) -> Self {
        self.insert(name, item);
        self
    }

    pub fn insert(&mut self, name: &str, item: CatalogItem) {
        self.items.insert(name.trim().to_lowercase(), item);
    }

    /// Look up an item by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&CatalogItem> {
        let name_lower = name.trim().to_lowercase();
        self.items.get(&name_lower).or_else(|| {
            // Catalogs loaded from JSON may carry mixed-case keys.
            self.items
                .iter()
                .find(|(key, _)| key.to_lowercase() == name_lower)
                .map(|(_, item)| item)
        })
    }

    /// Effects of using an item. Unknown items have no effect.
    pub fn effects_for(&self, name: &str) -> EffectDelta {
        self.get(name).map(|item| item.effects).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Standard items
// ============================================================================

fn heal(hp: i32) -> CatalogItem {
    CatalogItem::new(EffectDelta::default().with(Attribute::Hp, hp))
}

lazy_static::lazy_static! {
    static ref STANDARD_ITEMS: ItemCatalog = ItemCatalog::new()
        // English
        .with_item("potion", heal(10).with_description("A small vial of red liquid."))
        .with_item("healing potion", heal(15))
        .with_item("greater healing potion", heal(25))
        .with_item("bread", heal(3))
        .with_item("apple", heal(2))
        .with_item("ration", heal(5))
        .with_item("antidote", heal(5))
        .with_item(
            "elixir of strength",
            CatalogItem::new(EffectDelta::default().with(Attribute::Strength, 2)),
        )
        .with_item(
            "elixir of wisdom",
            CatalogItem::new(EffectDelta::default().with(Attribute::Wisdom, 2)),
        )
        .with_item(
            "wine",
            CatalogItem::new(
                EffectDelta::default()
                    .with(Attribute::Charisma, 1)
                    .with(Attribute::Dexterity, -1),
            ),
        )
        // Ukrainian
        .with_item("зілля", heal(10).with_description("Невеликий флакон червоної рідини."))
        .with_item("зілля лікування", heal(15))
        .with_item("хліб", heal(3))
        .with_item("яблуко", heal(2))
        .with_item("протиотрута", heal(5))
        .with_item(
            "еліксир сили",
            CatalogItem::new(EffectDelta::default().with(Attribute::Strength, 2)),
        )
        .with_item(
            "вино",
            CatalogItem::new(
                EffectDelta::default()
                    .with(Attribute::Charisma, 1)
                    .with(Attribute::Dexterity, -1),
            ),
        );
}
