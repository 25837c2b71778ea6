//! Engine settings.

use crate::game_data::Locale;
use serde::{Deserialize, Serialize};

/// Tunable settings and request defaults for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Language for keywords, narration and prompts.
    pub locale: Locale,

    /// How many times to ask the generator for an unused NPC name.
    pub name_attempts: usize,

    /// Maximum length, in characters, of an NPC's opening line.
    pub initial_message_limit: usize,

    /// How many history entries go into a turn prompt.
    pub history_limit: usize,

    /// Weapon used when a combat request names none.
    pub default_weapon: String,

    /// Player damage dice when a combat request gives none.
    pub default_damage_dice: String,

    /// Where adventures start.
    pub default_location: String,

    /// Damage dice for NPCs that do not declare their own.
    pub npc_damage_dice: String,

    /// Player hp when a combat request gives none.
    pub default_player_hp: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            name_attempts: 10,
            initial_message_limit: 200,
            history_limit: 100,
            default_weapon: "Sword".to_string(),
            default_damage_dice: "d4".to_string(),
            default_location: "tower_room".to_string(),
            npc_damage_dice: "d6".to_string(),
            default_player_hp: 30,
        }
    }
}

impl GameConfig {
    /// Default settings for a locale.
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    pub fn with_name_attempts(mut self, attempts: usize) -> Self {
        self.name_attempts = attempts;
        self
    }

    pub fn with_initial_message_limit(mut self, limit: usize) -> Self {
        self.initial_message_limit = limit;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_default_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.default_weapon = weapon.into();
        self
    }

    pub fn with_default_damage_dice(mut self, dice: impl Into<String>) -> Self {
        self.default_damage_dice = dice.into();
        self
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    pub fn with_npc_damage_dice(mut self, dice: impl Into<String>) -> Self {
        self.npc_damage_dice = dice.into();
        self
    }

    pub fn with_default_player_hp(mut self, hp: i32) -> Self {
        self.default_player_hp = hp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = GameConfig::new(Locale::En)
            .with_name_attempts(3)
            .with_default_weapon("Axe");
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.name_attempts, 3);
        assert_eq!(config.default_weapon, "Axe");
        assert_eq!(config.initial_message_limit, 200);
    }

    #[test]
    fn test_partial_json() {
        let config: GameConfig =
            serde_json::from_str(r#"{"locale": "en", "history_limit": 20}"#).unwrap();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.default_location, "tower_room");
    }
}
