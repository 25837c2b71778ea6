//! Localized game data: keyword tables, phrasebooks and the item catalog.
//!
//! Every keyword-driven decision in the engine (using items, attacking,
//! talking, moving, classifying NPCs, situational bonuses) is a lookup against
//! a [`KeywordTable`]. Player-facing text comes from a [`Phrasebook`]. Both are
//! per [`Locale`] and can be loaded from JSON to replace the built-in tables.
//!
//! ```json
//! {
//!   "en": { "keywords": { "use_item": ["drink", "eat"] }, "phrases": { ... } },
//!   "uk": { ... },
//!   "items": { "potion": { "effects": { "hp": 10 } } }
//! }
//! ```

use crate::items::ItemCatalog;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading game data.
#[derive(Debug, Error)]
pub enum GameDataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid game data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Supported player languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Uk,
}

impl Locale {
    /// Resolve a language code such as `en` or `uk-UA`. Unsupported codes fall
    /// back to the default locale.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        match code.get(..2) {
            Some("en") => Locale::En,
            Some("uk") => Locale::Uk,
            _ => Locale::default(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Uk => "uk",
        }
    }

    /// Language name as written into prompts.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Uk => "Ukrainian",
        }
    }
}

/// Keyword groups used for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    UseItem,
    AttackAction,
    DialogAction,
    Movement,
    Location,
    Dragon,
    Goblin,
    Wolf,
    Stealth,
    Poison,
    Spell,
}

/// Per-locale keyword sets, one list per [`KeywordCategory`].
///
/// Matching is by case-insensitive substring. List order matters where a
/// first match is taken (locations).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub use_item: Vec<String>,
    pub attack_action: Vec<String>,
    pub dialog_action: Vec<String>,
    pub movement: Vec<String>,
    pub location: Vec<String>,
    pub dragon: Vec<String>,
    pub goblin: Vec<String>,
    pub wolf: Vec<String>,
    pub stealth: Vec<String>,
    pub poison: Vec<String>,
    pub spell: Vec<String>,
}

impl KeywordTable {
    pub fn get(&self, category: KeywordCategory) -> &[String] {
        match category {
            KeywordCategory::UseItem => &self.use_item,
            KeywordCategory::AttackAction => &self.attack_action,
            KeywordCategory::DialogAction => &self.dialog_action,
            KeywordCategory::Movement => &self.movement,
            KeywordCategory::Location => &self.location,
            KeywordCategory::Dragon => &self.dragon,
            KeywordCategory::Goblin => &self.goblin,
            KeywordCategory::Wolf => &self.wolf,
            KeywordCategory::Stealth => &self.stealth,
            KeywordCategory::Poison => &self.poison,
            KeywordCategory::Spell => &self.spell,
        }
    }

    /// Whether any keyword of the category occurs in `text`.
    pub fn matches(&self, category: KeywordCategory, text: &str) -> bool {
        self.first_in(category, text).is_some()
    }

    /// The first keyword of the category, in table order, that occurs in `text`.
    pub fn first_in(&self, category: KeywordCategory, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.get(category)
            .iter()
            .map(|k| k.as_str())
            .find(|k| !k.trim().is_empty() && text.contains(&k.to_lowercase()))
    }

    pub fn english() -> Self {
        Self {
            use_item: words(&["use", "drink", "eat", "quaff", "apply", "consume"]),
            attack_action: words(&[
                "attack", "strike", "hit", "stab", "slash", "shoot", "fight", "swing",
            ]),
            dialog_action: words(&["talk", "speak", "ask", "say", "tell", "greet", "chat"]),
            // Bare "go" would fire inside "goblin".
            movement: words(&[
                "go to", "walk", "run", "move", "enter", "head to", "climb", "flee",
            ]),
            location: words(&[
                "forest", "cave", "village", "tavern", "castle", "dungeon", "tower", "river",
                "mountain", "crypt",
            ]),
            dragon: words(&["dragon", "wyrm", "drake"]),
            goblin: words(&["goblin", "hobgoblin", "kobold"]),
            wolf: words(&["wolf", "warg", "hound"]),
            stealth: words(&["stealth", "sneak", "hidden"]),
            poison: words(&["poison", "venom", "toxic"]),
            spell: words(&["spell", "magic", "fireball", "incantation"]),
        }
    }

    pub fn ukrainian() -> Self {
        Self {
            use_item: words(&["використ", "випи", "з'їсти", "їсти", "застосу"]),
            attack_action: words(&[
                "атак", "вдар", "удар", "б'ю", "бити", "рубан", "стріля", "напада",
            ]),
            dialog_action: words(&["говор", "розмов", "запита", "скажи", "каж", "привіт"]),
            movement: words(&["йти", "іду", "піти", "бігти", "рухат", "увійти", "зайти", "піднят"]),
            location: words(&[
                "ліс", "печер", "село", "таверн", "замок", "підземелл", "вежа", "річк", "гори",
                "склеп",
            ]),
            dragon: words(&["дракон", "змій"]),
            goblin: words(&["гоблін", "кобольд"]),
            wolf: words(&["вовк", "варг"]),
            stealth: words(&["скрит", "крадькома", "непоміт"]),
            poison: words(&["отрут", "отрута"]),
            spell: words(&["заклинання", "магі", "чари"]),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Player-facing text templates. Placeholders are written `{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phrasebook {
    pub unknown_hero: String,
    pub default_goal: String,
    pub no_history: String,
    pub npc_default_message: String,

    // Inventory
    pub item_used: String,
    pub insufficient_quantity: String,

    // Player attack
    pub bout_start: String,
    pub attack_roll: String,
    pub attack_hit: String,
    pub attack_miss: String,
    pub attack_fumble: String,
    pub damage_dealt: String,
    pub critical_suffix: String,
    pub effects_used: String,
    pub npc_defeated: String,

    // Counterattack
    pub counter_roll: String,
    pub npc_hit: String,
    pub npc_miss: String,
    pub npc_fumble: String,
    pub player_down: String,

    // Situational bonuses: flavor text and effect label
    pub sneak_bonus: String,
    pub sneak_label: String,
    pub poison_bonus: String,
    pub poison_label: String,
    pub spell_bonus: String,
    pub spell_label: String,
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self::english()
    }
}

impl Phrasebook {
    pub fn english() -> Self {
        Self {
            unknown_hero: "Unknown hero".into(),
            default_goal: "Survive and find your own path.".into(),
            no_history: "The adventure has just begun.".into(),
            npc_default_message: "The stranger eyes you warily and says nothing.".into(),
            item_used: "{hero} uses {item}.".into(),
            insufficient_quantity: "You have no {item} left.".into(),
            bout_start: "---\nYou enter combat with {npc}!".into(),
            attack_roll:
                "You swing your {weapon} and roll d20: {roll} + bonus ({bonus}) = {total} (enemy armor: {ac})"
                    .into(),
            attack_hit: "Your attack breaks through the enemy's armor!".into(),
            attack_miss: "Your {weapon} fails to get past {npc}'s guard with {total}. {npc} dodges."
                .into(),
            attack_fumble: "Critical failure! Your {weapon} swings wide and {npc} steps aside."
                .into(),
            damage_dealt:
                "Damage roll: {dice} = {rolled} + bonuses ({bonus}){critical} = {damage}.{effects}\nYou deal {damage} damage."
                    .into(),
            critical_suffix: " x2 (critical hit)".into(),
            effects_used: " You use: {effects}.".into(),
            npc_defeated: "{npc} collapses and does not rise again. You are victorious!".into(),
            counter_roll:
                "---\nNow {npc} strikes back! Rolls d20: {roll} + bonus ({bonus}) = {total} (your armor: {ac})"
                    .into(),
            npc_hit:
                "{npc} hits you. Damage roll: {dice} = {rolled}{critical} = {damage}.\nYou take {damage} damage, {hp} hp left."
                    .into(),
            npc_miss: "{npc} attacks with {total} and misses!".into(),
            npc_fumble: "Critical failure! {npc} stumbles and misses completely.".into(),
            player_down: "Your strength gives out and you fall.".into(),
            sneak_bonus: " You strike from the shadows.".into(),
            sneak_label: "sneak attack".into(),
            poison_bonus: " Poison burns in the wound.".into(),
            poison_label: "poison".into(),
            spell_bonus: " Arcane power surges through the blow.".into(),
            spell_label: "magic".into(),
        }
    }

    pub fn ukrainian() -> Self {
        Self {
            unknown_hero: "Невідомий герой".into(),
            default_goal: "Вижити та знайти свій шлях.".into(),
            no_history: "Пригода тільки починається.".into(),
            npc_default_message: "Незнайомець насторожено дивиться на тебе й мовчить.".into(),
            item_used: "{hero} використовує {item}.".into(),
            insufficient_quantity: "У тебе більше немає: {item}.".into(),
            bout_start: "---\nТи вступаєш у бій з {npc}!".into(),
            attack_roll:
                "Ти замахуєшся {weapon} і кидаєш d20: {roll} + бонус ({bonus}) = {total} (броня ворога: {ac})"
                    .into(),
            attack_hit: "Твоя атака пробиває броню ворога!".into(),
            attack_miss: "Твоя атака ({total}) не пробила броню ворога. {npc} ухиляється.".into(),
            attack_fumble: "Критична невдача! {weapon} пролітає повз, {npc} ухиляється.".into(),
            damage_dealt:
                "Кидаєш кубик на урон: {dice} = {rolled} + бонуси ({bonus}){critical} = {damage}.{effects}\nТи наносиш {damage} урону ворогу."
                    .into(),
            critical_suffix: " ×2 (критичний удар)".into(),
            effects_used: " Ти використовуєш: {effects}.".into(),
            npc_defeated: "{npc} падає бездиханним. Ти переміг ворога!".into(),
            counter_roll:
                "---\nТепер {npc} атакує у відповідь! Кидає d20: {roll} + бонус ({bonus}) = {total} (твоя броня: {ac})"
                    .into(),
            npc_hit:
                "{npc} влучає. Кидає кубик на урон: {dice} = {rolled}{critical} = {damage}.\nТи отримуєш {damage} урону, залишилось {hp} hp."
                    .into(),
            npc_miss: "{npc} атакує з результатом {total} і промахується!".into(),
            npc_fumble: "Критична невдача! {npc} спотикається і промахується.".into(),
            player_down: "Сили полишають тебе, і ти падаєш.".into(),
            sneak_bonus: " Ти б'єш із тіні.".into(),
            sneak_label: "скритна атака".into(),
            poison_bonus: " Отрута пече рану.".into(),
            poison_label: "отрута".into(),
            spell_bonus: " Магія підсилює удар.".into(),
            spell_label: "магія".into(),
        }
    }
}

/// Fill `{key}` placeholders in a template. Unknown placeholders are kept.
///
/// The template is scanned once, so placeholder-like text inside a value is
/// never expanded.
pub fn render(template: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let filled = after.find('}').and_then(|close| {
            let key = &after[..close];
            args.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, value))
        });

        match filled {
            Some((close, value)) => {
                out.push_str(&value.to_string());
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Keywords and phrases of one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleData {
    pub keywords: KeywordTable,
    pub phrases: Phrasebook,
}

impl LocaleData {
    pub fn english() -> Self {
        Self {
            keywords: KeywordTable::english(),
            phrases: Phrasebook::english(),
        }
    }

    pub fn ukrainian() -> Self {
        Self {
            keywords: KeywordTable::ukrainian(),
            phrases: Phrasebook::ukrainian(),
        }
    }
}

/// Overlay `overrides` onto `base`. Objects merge key by key; anything else,
/// lists included, replaces what it lands on. `null` leaves `base` alone.
fn merge_json(base: &mut Value, overrides: Value) {
    match overrides {
        Value::Null => {}
        Value::Object(overrides) if base.is_object() => {
            if let Value::Object(base) = base {
                for (key, value) in overrides {
                    merge_json(base.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        value => *base = value,
    }
}

/// Read a locale section as changes to that locale's built-in data.
fn locale_over<'de, D: Deserializer<'de>>(
    builtin: LocaleData,
    deserializer: D,
) -> Result<LocaleData, D::Error> {
    let overrides = Value::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(builtin).map_err(de::Error::custom)?;
    merge_json(&mut merged, overrides);
    serde_json::from_value(merged).map_err(de::Error::custom)
}

fn english_over<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LocaleData, D::Error> {
    locale_over(LocaleData::english(), deserializer)
}

fn ukrainian_over<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LocaleData, D::Error> {
    locale_over(LocaleData::ukrainian(), deserializer)
}

/// All game data, shared read-only by the engine.
///
/// When deserialized, a locale section only needs the keyword lists and
/// phrases it changes; everything else keeps that locale's built-in value.
/// The `items` section, when present, replaces the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default = "LocaleData::english", deserialize_with = "english_over")]
    pub en: LocaleData,
    #[serde(default = "LocaleData::ukrainian", deserialize_with = "ukrainian_over")]
    pub uk: LocaleData,
    #[serde(default = "ItemCatalog::standard")]
    pub items: ItemCatalog,
}

lazy_static::lazy_static! {
    static ref BUILTIN: GameData = GameData {
        en: LocaleData::english(),
        uk: LocaleData::ukrainian(),
        items: ItemCatalog::standard(),
    };
}

impl Default for GameData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GameData {
    /// The built-in tables.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse game data from JSON. Anything left out keeps its built-in value.
    pub fn from_json_str(json: &str) -> Result<Self, GameDataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load game data from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GameDataError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let data = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), items = data.items.len(), "Loaded game data");
        Ok(data)
    }

    pub fn locale(&self, locale: Locale) -> &LocaleData {
        match locale {
            Locale::En => &self.en,
            Locale::Uk => &self.uk,
        }
    }

    pub fn keywords(&self, locale: Locale) -> &KeywordTable {
        &self.locale(locale).keywords
    }

    pub fn phrases(&self, locale: Locale) -> &Phrasebook {
        &self.locale(locale).phrases
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }
}
