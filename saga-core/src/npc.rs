//! NPC records and the caller-held NPC directory.
//!
//! NPCs are created on first reference. The generation service drafts their
//! stat block; when it cannot, a fallback block is picked by classifying the
//! name (dragons hit harder than goblins). Every created record gets clamped
//! stats and a fresh id before it is stored.

use crate::config::GameConfig;
use crate::directive::NpcSpawn;
use crate::game_data::{KeywordCategory, KeywordTable, Phrasebook};
use crate::generator::NarrativeGenerator;
use crate::prompts;
use crate::text::{normalize_whitespace, strip_markup, truncate_chars};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub const MIN_HP: i32 = 10;
pub const MAX_HP: i32 = 100;
pub const MIN_AC: i32 = 10;
pub const MAX_AC: i32 = 20;

/// Unique identifier for NPCs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcId(pub Uuid);

impl NpcId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NpcId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_damage_dice() -> String {
    "d6".to_string()
}

/// A non-player character and its combat stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcRecord {
    #[serde(default)]
    pub id: NpcId,
    pub name: String,
    pub hp: i32,
    pub ac: i32,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default = "default_damage_dice")]
    pub damage_dice: String,
    #[serde(default)]
    pub character_traits: Vec<String>,
    #[serde(default)]
    pub initial_message: String,
}

impl NpcRecord {
    /// A new record with a fresh id. hp and ac are clamped into range.
    pub fn new(
        name: impl Into<String>,
        hp: i32,
        ac: i32,
        attack_bonus: i32,
        damage_dice: impl Into<String>,
    ) -> Self {
        Self {
            id: NpcId::new(),
            name: name.into(),
            hp: hp.clamp(MIN_HP, MAX_HP),
            ac: ac.clamp(MIN_AC, MAX_AC),
            attack_bonus,
            damage_dice: damage_dice.into(),
            character_traits: Vec::new(),
            initial_message: String::new(),
        }
    }

    /// A record for an NPC announced in narration.
    pub fn from_spawn(spawn: &NpcSpawn, damage_dice: &str) -> Self {
        Self::new(
            spawn.name.clone(),
            spawn.hp,
            spawn.ac,
            spawn.attack_bonus,
            damage_dice,
        )
    }

    pub fn with_traits(mut self, traits: Vec<String>) -> Self {
        self.character_traits = traits;
        self
    }

    pub fn with_initial_message(mut self, message: impl Into<String>) -> Self {
        self.initial_message = message.into();
        self
    }

    /// The first trait, used to color dialog.
    pub fn leading_trait(&self) -> &str {
        self.character_traits
            .first()
            .map(String::as_str)
            .unwrap_or("neutral")
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }
}

/// Broad NPC kinds with their own fallback stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    Dragon,
    Goblin,
    Wolf,
    Generic,
}

/// Fallback stats of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesProfile {
    pub hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage_dice: &'static str,
}

impl Species {
    /// Classify a name. Checked in order: dragon, goblin, wolf.
    pub fn classify(keywords: &KeywordTable, name: &str) -> Self {
        if keywords.matches(KeywordCategory::Dragon, name) {
            Species::Dragon
        } else if keywords.matches(KeywordCategory::Goblin, name) {
            Species::Goblin
        } else if keywords.matches(KeywordCategory::Wolf, name) {
            Species::Wolf
        } else {
            Species::Generic
        }
    }

    pub fn profile(&self) -> SpeciesProfile {
        match self {
            Species::Dragon => SpeciesProfile {
                hp: 100,
                ac: 18,
                attack_bonus: 8,
                damage_dice: "d10",
            },
            Species::Goblin => SpeciesProfile {
                hp: 15,
                ac: 12,
                attack_bonus: 2,
                damage_dice: "d6",
            },
            Species::Wolf => SpeciesProfile {
                hp: 20,
                ac: 12,
                attack_bonus: 4,
                damage_dice: "d6",
            },
            Species::Generic => SpeciesProfile {
                hp: 20,
                ac: 12,
                attack_bonus: 0,
                damage_dice: "d6",
            },
        }
    }
}

/// Known NPCs, keyed by id. Owned by the caller and passed in each turn.
///
/// Serialized as a plain JSON object (`stored_npcs`). Lookups accept either a
/// key or an NPC name, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcDirectory {
    npcs: BTreeMap<String, NpcRecord>,
}

impl NpcDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by key, then by name.
    pub fn get(&self, key_or_name: &str) -> Option<&NpcRecord> {
        self.npcs
            .get(key_or_name)
            .or_else(|| self.find_by_name(key_or_name))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&NpcRecord> {
        let name = name.trim().to_lowercase();
        self.npcs
            .values()
            .find(|npc| npc.name.trim().to_lowercase() == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Store a record under its id. A record of the same name is replaced.
    pub fn insert(&mut self, record: NpcRecord) {
        let name = record.name.trim().to_lowercase();
        self.npcs
            .retain(|_, npc| npc.name.trim().to_lowercase() != name);
        self.npcs.insert(record.id.to_string(), record);
    }

    /// Write combat damage back to the named NPC. Returns false if unknown.
    pub fn record_combat(&mut self, name: &str, hp: i32) -> bool {
        let name = name.trim().to_lowercase();
        match self
            .npcs
            .values_mut()
            .find(|npc| npc.name.trim().to_lowercase() == name)
        {
            Some(npc) => {
                npc.hp = hp.max(0);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NpcRecord)> {
        self.npcs.iter().map(|(key, npc)| (key.as_str(), npc))
    }

    pub fn names(&self) -> Vec<&str> {
        self.npcs.values().map(|npc| npc.name.as_str()).collect()
    }
}

/// Scene details used when drafting an NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcContext {
    pub scene: String,
    pub hero_name: String,
    pub race: String,
    pub character_class: String,
}

impl NpcContext {
    pub fn new(scene: impl Into<String>, hero_name: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            hero_name: hero_name.into(),
            race: "human".to_string(),
            character_class: "none".to_string(),
        }
    }

    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.race = race.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.character_class = class.into();
        self
    }
}

/// Creates NPC records for one locale.
#[derive(Debug, Clone, Copy)]
pub struct NpcCreator<'a> {
    keywords: &'a KeywordTable,
    phrases: &'a Phrasebook,
    config: &'a GameConfig,
}

impl<'a> NpcCreator<'a> {
    pub fn new(keywords: &'a KeywordTable, phrases: &'a Phrasebook, config: &'a GameConfig) -> Self {
        Self {
            keywords,
            phrases,
            config,
        }
    }

    /// Fetch the named NPC, or create and store a new one.
    ///
    /// Without a name, one is invented. Creation never fails: if the draft
    /// cannot be used a fallback record takes its place.
    pub fn get_or_create<G: NarrativeGenerator + ?Sized>(
        &self,
        name: Option<&str>,
        context: &NpcContext,
        store: &mut NpcDirectory,
        generator: &mut G,
    ) -> NpcRecord {
        let requested = name
            .map(|n| normalize_whitespace(&strip_markup(n)))
            .filter(|n| !n.is_empty());

        if let Some(existing) = requested.as_deref().and_then(|n| store.find_by_name(n)) {
            return existing.clone();
        }

        let name = match requested {
            Some(name) => name,
            None => self.unique_name(store, generator),
        };

        let prompt = prompts::npc_draft_prompt(self.config.locale, &name, context);
        let record = match generator.generate_text(&prompt) {
            Ok(text) => match NpcDraft::parse(&text) {
                Some(draft) => self.from_draft(&name, draft),
                None => {
                    tracing::warn!(npc = %name, "Unusable NPC draft, using fallback");
                    self.fallback(&name)
                }
            },
            Err(e) => {
                tracing::warn!(npc = %name, error = %e, "NPC draft failed, using fallback");
                self.fallback(&name)
            }
        };

        tracing::debug!(npc = %record.name, id = %record.id, hp = record.hp, ac = record.ac, "NPC created");
        store.insert(record.clone());
        record
    }

    /// A fallback record for `name`, chosen by classifying the name.
    pub fn fallback(&self, name: &str) -> NpcRecord {
        let profile = Species::classify(self.keywords, name).profile();
        NpcRecord::new(
            name,
            profile.hp,
            profile.ac,
            profile.attack_bonus,
            profile.damage_dice,
        )
        .with_initial_message(truncate_chars(
            &self.phrases.npc_default_message,
            self.config.initial_message_limit,
        ))
    }

    /// A record for a `[NEW_NPC]` announced in narration.
    pub fn from_spawn(&self, spawn: &NpcSpawn) -> NpcRecord {
        NpcRecord::from_spawn(spawn, &self.config.npc_damage_dice)
    }

    fn from_draft(&self, name: &str, draft: NpcDraft) -> NpcRecord {
        let damage_dice = draft
            .damage_dice
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.config.npc_damage_dice.clone());

        NpcRecord::new(name, draft.hp, draft.ac, draft.attack_bonus, damage_dice)
            .with_traits(draft.character_traits)
            .with_initial_message(truncate_chars(
                draft.initial_message.trim(),
                self.config.initial_message_limit,
            ))
    }

    /// Ask for names until one is unused, then fall back to `NPC_<hex>`.
    fn unique_name<G: NarrativeGenerator + ?Sized>(
        &self,
        store: &NpcDirectory,
        generator: &mut G,
    ) -> String {
        let prompt = prompts::npc_name_prompt(self.config.locale, &store.names());

        for attempt in 1..=self.config.name_attempts {
            let candidate = match generator.generate_text(&prompt) {
                Ok(text) => clean_name(&text),
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "NPC name generation failed");
                    continue;
                }
            };
            if candidate.is_empty() || store.contains_name(&candidate) {
                tracing::debug!(attempt, name = %candidate, "NPC name rejected");
                continue;
            }
            return candidate;
        }

        loop {
            let hex = Uuid::new_v4().simple().to_string();
            let name = format!("NPC_{}", &hex[..8]);
            if !store.contains_name(&name) {
                tracing::warn!(name = %name, "No usable NPC name generated, using placeholder");
                return name;
            }
        }
    }
}

/// First line of a generated name, without markup or quoting.
fn clean_name(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let line = strip_markup(line);
    normalize_whitespace(line.trim_matches(|c: char| c == '"' || c == '*' || c == '.' || c.is_whitespace()))
}

/// An NPC stat block as drafted by the generation service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NpcDraft {
    /// Required, though the record keeps the name it was asked for.
    #[allow(dead_code)]
    name: String,
    #[serde(deserialize_with = "lenient_int")]
    hp: i32,
    #[serde(deserialize_with = "lenient_int")]
    ac: i32,
    #[serde(deserialize_with = "lenient_int")]
    attack_bonus: i32,
    #[serde(default)]
    damage_dice: Option<String>,
    #[serde(default, deserialize_with = "lenient_traits")]
    character_traits: Vec<String>,
    initial_message: String,
}

impl NpcDraft {
    /// Parse a draft, tolerating markdown fences and text around the object.
    fn parse(text: &str) -> Option<Self> {
        let text = text.replace("```json", "").replace("```", "");
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }

        match serde_json::from_str(&text[start..=end]) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::debug!(error = %e, "NPC draft is not valid JSON");
                None
            }
        }
    }
}

/// Accept `12`, `12.0` or `"12"`.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| de::Error::custom(format!("expected an integer, got {value}")))
}

/// Accept a list of traits or a single comma-separated string.
fn lenient_traits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Traits {
        List(Vec<String>),
        Text(String),
        Missing(Option<()>),
    }

    let traits = match Traits::deserialize(deserializer)? {
        Traits::List(list) => list,
        Traits::Text(text) => text.split(',').map(str::to_string).collect(),
        Traits::Missing(_) => Vec::new(),
    };
    Ok(traits
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
