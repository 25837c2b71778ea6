//! TurnCoordinator - the primary public API for playing the game.
//!
//! The coordinator holds no game state. Every call takes the caller's state
//! (inventory, known NPCs, hit points) and returns the updated state for the
//! caller to keep until the next turn.
//!
//! A narrative turn makes exactly one generation call. When that call fails,
//! the turn fails as a whole and none of its staged changes are returned.

use crate::combat::{CombatEngine, CombatError, CombatOutcome, CombatRequest};
use crate::config::GameConfig;
use crate::dice::DiceRoller;
use crate::directive::{parse_intro, parse_turn};
use crate::game_data::{GameData, KeywordCategory, Locale, Phrasebook};
use crate::generator::{GenerationError, NarrativeGenerator};
use crate::inventory::{sanitize_hero_name, InventoryEntry, InventoryItem, InventoryResolver};
use crate::items::EffectDelta;
use crate::npc::{NpcContext, NpcCreator, NpcDirectory, NpcRecord};
use crate::prompts::{self, TurnPrompt};
use crate::text::{normalize_whitespace, strip_markup};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("Narrative generation failed: {0}")]
    Generation(#[from] GenerationError),
}

fn default_race() -> String {
    "human".to_string()
}

fn default_class() -> String {
    "none".to_string()
}

/// Request to open a new adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureRequest {
    #[serde(default, rename = "heroname")]
    pub hero_name: String,
    #[serde(default = "default_race")]
    pub race: String,
    #[serde(default = "default_class", rename = "characterClass")]
    pub character_class: String,
}

impl AdventureRequest {
    pub fn new(hero_name: impl Into<String>) -> Self {
        Self {
            hero_name: hero_name.into(),
            race: default_race(),
            character_class: default_class(),
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

/// The opening of an adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureIntro {
    pub intro: String,
    pub goal: String,
}

impl AdventureIntro {
    pub fn goal_state(&self) -> GoalState {
        GoalState::new(self.goal.clone())
    }
}

/// Request to meet (or create) an NPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcRequest {
    #[serde(rename = "npcName")]
    pub npc_name: Option<String>,
    pub context: String,
    #[serde(rename = "heroname")]
    pub hero_name: String,
    pub race: Option<String>,
    #[serde(rename = "characterClass")]
    pub character_class: Option<String>,
    pub stored_npcs: NpcDirectory,
}

/// An NPC met by the hero, and the directory that now includes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcMeeting {
    pub npc: NpcRecord,
    pub stored_npcs: NpcDirectory,
}

/// One entry of the turn history kept by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub reply: String,
    pub text: String,
}

impl HistoryEntry {
    /// A player action and the narration it got.
    pub fn reply(action: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            kind: "reply".to_string(),
            action: action.into(),
            reply: reply.into(),
            text: String::new(),
        }
    }

    fn context_line(&self) -> String {
        if self.kind == "reply" {
            format!("{}\n{}", self.action, self.reply)
        } else {
            self.text.clone()
        }
    }
}

/// A player action with the state it acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnRequest {
    pub action: String,
    pub dice_result: i32,
    pub difficulty: i32,
    #[serde(rename = "heroname")]
    pub hero_name: String,
    pub race: String,
    #[serde(rename = "characterClass")]
    pub character_class: String,
    pub intro: String,
    pub goal: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub weapon: Option<String>,
    pub inventory: Vec<InventoryEntry>,
    pub stored_npcs: NpcDirectory,
    /// The NPC the hero is dealing with, by key or name.
    #[serde(rename = "NPCName")]
    pub npc_name: Option<String>,
}

impl Default for TurnRequest {
    fn default() -> Self {
        Self {
            action: String::new(),
            dice_result: 0,
            difficulty: 10,
            hero_name: String::new(),
            race: default_race(),
            character_class: default_class(),
            intro: String::new(),
            goal: None,
            history: Vec::new(),
            weapon: None,
            inventory: Vec::new(),
            stored_npcs: NpcDirectory::new(),
            npc_name: None,
        }
    }
}

impl TurnRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_hero(mut self, name: impl Into<String>) -> Self {
        self.hero_name = name.into();
        self
    }

    pub fn with_roll(mut self, dice_result: i32, difficulty: i32) -> Self {
        self.dice_result = dice_result;
        self.difficulty = difficulty;
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventoryEntry>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_npcs(mut self, npcs: NpcDirectory) -> Self {
        self.stored_npcs = npcs;
        self
    }

    pub fn with_active_npc(mut self, name: impl Into<String>) -> Self {
        self.npc_name = Some(name.into());
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

/// The adventure goal and whether it has been reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalState {
    pub goal: String,
    pub achieved: bool,
    /// Ending text; empty until the goal is achieved.
    pub final_description: String,
}

impl GoalState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            achieved: false,
            final_description: String::new(),
        }
    }

    /// Fold in the outcome of a turn. Once achieved, a goal stays achieved.
    pub fn update(&mut self, result: &TurnResult) {
        if result.is_goal_achieved && !self.achieved {
            self.achieved = true;
            self.final_description = result.final_description.clone();
        }
    }
}

/// The outcome of a narrative turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub reply: String,
    pub is_goal_achieved: bool,
    pub final_description: String,
    /// Items found this turn. Not yet part of `inventory`.
    pub new_items: Vec<InventoryItem>,
    pub removed_items: Vec<String>,
    /// The inventory after any item use.
    pub inventory: Vec<InventoryItem>,
    pub effects: EffectDelta,
    pub warnings: Vec<String>,
    /// A newly announced NPC, or else the NPC the hero is dealing with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npc: Option<NpcRecord>,
    #[serde(rename = "stored_npcs")]
    pub stored_npcs: NpcDirectory,
}

impl TurnResult {
    /// The inventory with this turn's finds added.
    pub fn next_inventory(&self) -> Vec<InventoryEntry> {
        self.inventory
            .iter()
            .chain(&self.new_items)
            .cloned()
            .map(InventoryEntry::from)
            .collect()
    }
}

/// Runs turns against shared, read-only game data.
#[derive(Debug, Clone)]
pub struct TurnCoordinator {
    data: Arc<GameData>,
    config: GameConfig,
}

impl TurnCoordinator {
    pub fn new(data: Arc<GameData>, config: GameConfig) -> Self {
        Self { data, config }
    }

    /// A coordinator over the built-in game data.
    pub fn with_builtin_data(config: GameConfig) -> Self {
        Self::new(Arc::new(GameData::builtin()), config)
    }

    /// Built-in data and default settings for a locale.
    pub fn for_locale(locale: Locale) -> Self {
        Self::with_builtin_data(GameConfig::new(locale))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    fn phrases(&self) -> &Phrasebook {
        self.data.phrases(self.config.locale)
    }

    pub fn inventory(&self) -> InventoryResolver<'_> {
        InventoryResolver::new(
            self.data.keywords(self.config.locale),
            self.data.items(),
            self.phrases(),
        )
    }

    pub fn combat(&self) -> CombatEngine<'_> {
        CombatEngine::new(
            self.data.keywords(self.config.locale),
            self.phrases(),
            &self.config,
        )
    }

    pub fn npcs(&self) -> NpcCreator<'_> {
        NpcCreator::new(
            self.data.keywords(self.config.locale),
            self.phrases(),
            &self.config,
        )
    }

    /// Open an adventure: an intro scene and the goal to pursue.
    pub fn start_adventure<G: NarrativeGenerator + ?Sized>(
        &self,
        request: &AdventureRequest,
        generator: &mut G,
    ) -> Result<AdventureIntro, TurnError> {
        let phrases = self.phrases();
        let hero = sanitize_hero_name(&request.hero_name, &phrases.unknown_hero);
        let prompt = prompts::intro_prompt(
            self.config.locale,
            &hero,
            &request.race,
            &request.character_class,
        );

        let text = generator.generate_text(&prompt).map_err(|e| {
            tracing::warn!(error = %e, "Adventure intro generation failed");
            e
        })?;
        let parsed = parse_intro(&strip_markup(&text));

        let goal = parsed.goal.unwrap_or_else(|| {
            tracing::debug!("Intro carried no goal, using default");
            phrases.default_goal.clone()
        });
        tracing::info!(hero = %hero, goal = %goal, "Adventure started");

        Ok(AdventureIntro {
            intro: parsed.intro,
            goal,
        })
    }

    /// Fetch or create an NPC. Never fails; see [`NpcCreator::get_or_create`].
    pub fn meet_npc<G: NarrativeGenerator + ?Sized>(
        &self,
        request: &NpcRequest,
        generator: &mut G,
    ) -> NpcMeeting {
        let hero = sanitize_hero_name(&request.hero_name, &self.phrases().unknown_hero);
        let mut context = NpcContext::new(request.context.clone(), hero);
        if let Some(race) = &request.race {
            context = context.with_race(race.clone());
        }
        if let Some(class) = &request.character_class {
            context = context.with_class(class.clone());
        }

        let mut stored_npcs = request.stored_npcs.clone();
        let npc = self.npcs().get_or_create(
            request.npc_name.as_deref(),
            &context,
            &mut stored_npcs,
            generator,
        );

        NpcMeeting { npc, stored_npcs }
    }

    /// Play one narrative turn.
    pub fn play_turn<G: NarrativeGenerator + ?Sized>(
        &self,
        request: &TurnRequest,
        generator: &mut G,
    ) -> Result<TurnResult, TurnError> {
        let locale = self.config.locale;
        let keywords = self.data.keywords(locale);
        let phrases = self.phrases();

        // Staged: only returned if generation succeeds.
        let inventory = self
            .inventory()
            .resolve(&request.action, &request.inventory, &request.hero_name);
        let mut stored_npcs = request.stored_npcs.clone();

        let active_npc = request
            .npc_name
            .as_deref()
            .map(|name| normalize_whitespace(&strip_markup(name)))
            .filter(|name| !name.is_empty())
            .map(|name| match stored_npcs.get(&name) {
                Some(npc) => npc.clone(),
                None => {
                    let npc = self.npcs().fallback(&name);
                    tracing::debug!(npc = %npc.name, "Active NPC unknown, registering fallback");
                    stored_npcs.insert(npc.clone());
                    npc
                }
            });

        let goal = request
            .goal
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(&phrases.default_goal);
        let weapon = request
            .weapon
            .as_deref()
            .unwrap_or(&self.config.default_weapon);

        let prompt = TurnPrompt {
            locale,
            hero: &inventory.hero,
            race: &request.race,
            class: &request.character_class,
            weapon,
            inventory: inventory
                .persistent_items
                .iter()
                .map(|item| item.name.as_str())
                .collect(),
            goal,
            intro: &request.intro,
            history: self.history_context(&request.history),
            action: &request.action,
            npc: active_npc
                .as_ref()
                .map(|npc| (npc.name.as_str(), npc.leading_trait())),
            roll: request.dice_result,
            difficulty: request.difficulty,
            dialog: keywords.matches(KeywordCategory::DialogAction, &request.action),
        }
        .render();

        let text = generator.generate_text(&prompt).map_err(|e| {
            tracing::warn!(error = %e, action = %request.action, "Turn aborted, generation failed");
            e
        })?;

        let parsed = parse_turn(
            &strip_markup(&text),
            active_npc.as_ref().map(|npc| npc.hp),
        );

        let spawned = parsed.new_npc.as_ref().map(|spawn| {
            let npc = self.npcs().from_spawn(spawn);
            tracing::debug!(npc = %npc.name, hp = npc.hp, "NPC entered the story");
            stored_npcs.insert(npc.clone());
            npc
        });

        let reply = if inventory.used_item() {
            normalize_whitespace(&format!("{} {}", inventory.reply, parsed.reply))
        } else {
            parsed.reply
        };

        tracing::debug!(
            goal_achieved = parsed.goal_achieved,
            new_items = parsed.new_items.len(),
            used_item = inventory.used_item(),
            "Turn played"
        );

        Ok(TurnResult {
            reply,
            is_goal_achieved: parsed.goal_achieved,
            final_description: parsed.final_description.unwrap_or_default(),
            new_items: parsed
                .new_items
                .into_iter()
                .map(|name| InventoryItem::new(name, 1))
                .collect(),
            removed_items: inventory
                .consumed_items
                .iter()
                .map(|item| item.name.clone())
                .collect(),
            warnings: inventory
                .warnings
                .iter()
                .map(|w| w.describe(phrases))
                .collect(),
            inventory: inventory.persistent_items,
            effects: inventory.effects,
            npc: spawned.or(active_npc),
            stored_npcs,
        })
    }

    /// Resolve a combat round and write the NPC's new hp into `npcs`.
    pub fn resolve_combat<D: DiceRoller + ?Sized>(
        &self,
        request: &CombatRequest,
        npcs: &mut NpcDirectory,
        dice: &mut D,
    ) -> Result<CombatOutcome, CombatError> {
        let outcome = self.combat().resolve_round(request, dice)?;

        if let Some(name) = request.npc.as_ref().and_then(|npc| npc.name.as_deref()) {
            if !npcs.record_combat(name, outcome.npc_hp) {
                tracing::debug!(npc = name, "Combat target not in directory");
            }
        }

        Ok(outcome)
    }

    /// The most recent history, as prompt context.
    fn history_context(&self, history: &[HistoryEntry]) -> String {
        let skip = history.len().saturating_sub(self.config.history_limit);
        let lines: Vec<String> = history[skip..]
            .iter()
            .map(HistoryEntry::context_line)
            .filter(|line| !line.trim().is_empty())
            .collect();

        if lines.is_empty() {
            self.phrases().no_history.clone()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LoadedDice, ScriptedGenerator};

    fn coordinator() -> TurnCoordinator {
        TurnCoordinator::for_locale(Locale::En)
    }

    #[test]
    fn test_coordinator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TurnCoordinator>();
    }

    #[test]
    fn test_start_adventure_extracts_goal() {
        let mut generator = ScriptedGenerator::new()
            .queue_text("<p>Rain lashes the tower.</p>\n[GOAL:Reach the summit]");
        let intro = coordinator()
            .start_adventure(&AdventureRequest::new("Mira"), &mut generator)
            .unwrap();
        assert_eq!(intro.intro, "Rain lashes the tower.");
        assert_eq!(intro.goal, "Reach the summit");
        assert!(generator.prompts()[0].contains("Mira"));
    }

    #[test]
    fn test_start_adventure_default_goal() {
        let mut generator = ScriptedGenerator::new().queue_text("A quiet morning.");
        let intro = coordinator()
            .start_adventure(&AdventureRequest::new("Mira"), &mut generator)
            .unwrap();
        assert_eq!(intro.goal, Phrasebook::english().default_goal);
    }

    #[test]
    fn test_turn_with_item_and_finds() {
        let mut generator = ScriptedGenerator::new()
            .queue_text("Warmth spreads through you. [NEW_ITEM:Silver Key] [SUCCESS]");
        let request = TurnRequest::new("drink potion")
            .with_hero("Mira")
            .with_inventory(vec![InventoryItem::new("potion", 1).into(), "rope".into()]);

        let result = coordinator().play_turn(&request, &mut generator).unwrap();
        assert_eq!(result.reply, "Mira uses potion. Warmth spreads through you.");
        assert_eq!(result.removed_items, vec!["potion".to_string()]);
        assert_eq!(result.inventory, vec![InventoryItem::new("rope", 1)]);
        assert_eq!(result.new_items, vec![InventoryItem::new("Silver Key", 1)]);
        assert_eq!(result.effects.hp, 10);
        assert!(!result.is_goal_achieved);
        assert_eq!(result.final_description, "");
        assert_eq!(result.next_inventory().len(), 2);
    }

    #[test]
    fn test_generation_failure_aborts_turn() {
        let mut generator =
            ScriptedGenerator::new().queue_failure(GenerationError::Service("boom".to_string()));
        let request = TurnRequest::new("drink potion").with_inventory(vec!["potion".into()]);

        let result = coordinator().play_turn(&request, &mut generator);
        assert_eq!(
            result,
            Err(TurnError::Generation(GenerationError::Service("boom".to_string())))
        );
        assert_eq!(request.inventory, vec![InventoryEntry::from("potion")]);
    }

    #[test]
    fn test_unknown_active_npc_gets_fallback() {
        let mut generator = ScriptedGenerator::new().queue_text("The beast circles you.");
        let request = TurnRequest::new("look at the dragon").with_active_npc("Ash Dragon");

        let result = coordinator().play_turn(&request, &mut generator).unwrap();
        let npc = result.npc.unwrap();
        assert_eq!((npc.hp, npc.ac, npc.attack_bonus), (100, 18, 8));
        assert_eq!(result.stored_npcs.get("Ash Dragon"), Some(&npc));
    }

    #[test]
    fn test_new_npc_registered() {
        let mut generator = ScriptedGenerator::new()
            .queue_text("Bushes rustle. [NEW_NPC:Bandit, hp=12, ac=11, attackBonus=1]");
        let result = coordinator()
            .play_turn(&TurnRequest::new("listen"), &mut generator)
            .unwrap();

        let npc = result.npc.unwrap();
        assert_eq!(npc.name, "Bandit");
        assert_eq!(npc.damage_dice, "d6");
        assert_eq!(result.stored_npcs.len(), 1);
        assert_eq!(result.reply, "Bushes rustle.");
    }

    #[test]
    fn test_history_is_capped() {
        let config = GameConfig::new(Locale::En).with_history_limit(2);
        let coordinator = TurnCoordinator::with_builtin_data(config);
        let history = vec![
            HistoryEntry::reply("first", "one"),
            HistoryEntry::reply("second", "two"),
            HistoryEntry {
                text: "third".to_string(),
                ..HistoryEntry::default()
            },
        ];

        let context = coordinator.history_context(&history);
        assert_eq!(context, "second\ntwo\nthird");
        assert_eq!(
            coordinator.history_context(&[]),
            Phrasebook::english().no_history
        );
    }

    #[test]
    fn test_resolve_combat_writes_back_hp() {
        let coordinator = coordinator();
        let mut npcs = NpcDirectory::new();
        let goblin = NpcRecord::new("Goblin", 15, 12, 2, "d6");
        npcs.insert(goblin.clone());

        let request = CombatRequest::new("attack goblin", &goblin)
            .with_attack_bonus(5)
            .with_damage_dice("d6");
        let outcome = coordinator
            .resolve_combat(&request, &mut npcs, &mut LoadedDice::new([15, 4, 1]))
            .unwrap();

        assert_eq!(outcome.npc_hp, 6);
        assert_eq!(npcs.get("Goblin").map(|n| n.hp), Some(6));
    }

    #[test]
    fn test_goal_state_update() {
        let mut state = GoalState::new("Escape");
        let mut generator = ScriptedGenerator::new()
            .queue_text("Free! [META_ACHIEVED] [FINAL_DESCRIPTION] You ride into the dawn.");
        let result = coordinator()
            .play_turn(&TurnRequest::new("open the gate"), &mut generator)
            .unwrap();

        state.update(&result);
        assert!(state.achieved);
        assert_eq!(state.final_description, "You ride into the dawn.");
        assert_eq!(result.reply, "Free!");
    }

    #[test]
    fn test_turn_result_json_field_names() {
        let mut generator = ScriptedGenerator::new().queue_text("Nothing happens.");
        let result = coordinator()
            .play_turn(&TurnRequest::new("wait"), &mut generator)
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        for field in [
            "reply",
            "isGoalAchieved",
            "finalDescription",
            "newItems",
            "removedItems",
            "effects",
            "warnings",
            "stored_npcs",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json.get("npc").is_none());
    }

    #[test]
    fn test_turn_request_from_json() {
        let request: TurnRequest = serde_json::from_str(
            r#"{
                "action": "talk to Elra",
                "dice_result": 14,
                "heroname": "Mira",
                "characterClass": "bard",
                "inventory": ["lute", {"name": "coin", "quantity": 3}],
                "NPCName": "Elra",
                "history": [{"type": "reply", "action": "wave", "reply": "She waves back."}]
            }"#,
        )
        .unwrap();
        assert_eq!(request.difficulty, 10);
        assert_eq!(request.race, "human");
        assert_eq!(request.character_class, "bard");
        assert_eq!(request.npc_name.as_deref(), Some("Elra"));
        assert_eq!(request.inventory.len(), 2);
    }
}
