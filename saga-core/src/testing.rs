//! Testing utilities for the game engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedGenerator` for deterministic narration without a live service
//! - `LoadedDice` for fixed roll sequences
//! - `TestHarness` for scripted multi-turn scenarios
//! - Assertion helpers for verifying game state

use crate::combat::{CombatError, CombatOutcome, CombatRequest, CombatTarget};
use crate::dice::DiceRoller;
use crate::game_data::Locale;
use crate::generator::{GenerationError, NarrativeGenerator};
use crate::inventory::{InventoryEntry, InventoryItem};
use crate::npc::{NpcDirectory, NpcRecord};
use crate::turn::{
    AdventureIntro, AdventureRequest, GoalState, HistoryEntry, TurnCoordinator, TurnError,
    TurnRequest, TurnResult,
};
use std::collections::VecDeque;

/// Narration returned once the script runs out.
pub const UNSCRIPTED_NARRATIVE: &str = "Nothing more happens for now.";

/// A generator that returns scripted responses in order.
///
/// Every prompt it receives is recorded for later inspection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    responses: VecDeque<Result<String, GenerationError>>,
    prompts: Vec<String>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn queue_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Queue a failed call.
    pub fn queue_failure(mut self, error: GenerationError) -> Self {
        self.push_failure(error);
        self
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.responses.push_back(Ok(text.into()));
    }

    pub fn push_failure(&mut self, error: GenerationError) {
        self.responses.push_back(Err(error));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl NarrativeGenerator for ScriptedGenerator {
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.push(prompt.to_string());
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(UNSCRIPTED_NARRATIVE.to_string()))
    }
}

/// Dice that roll a fixed sequence.
///
/// Each value is clamped to the die being rolled. Once the sequence is used
/// up every die shows 1.
#[derive(Debug, Clone, Default)]
pub struct LoadedDice {
    rolls: VecDeque<u32>,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    pub fn push(&mut self, roll: u32) {
        self.rolls.push_back(roll);
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl DiceRoller for LoadedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rolls.pop_front().unwrap_or(1).clamp(1, sides)
    }
}

/// Test harness for running game scenarios.
///
/// Plays the caller's role: it keeps the state the engine hands back and
/// passes it into the next call.
pub struct TestHarness {
    pub coordinator: TurnCoordinator,
    pub generator: ScriptedGenerator,
    pub dice: LoadedDice,
    pub hero: String,
    pub inventory: Vec<InventoryEntry>,
    pub npcs: NpcDirectory,
    pub player_hp: i32,
    pub active_npc: Option<String>,
    pub goal: GoalState,
    pub history: Vec<HistoryEntry>,
    /// Roll and difficulty used for narrative turns.
    pub roll: (i32, i32),
}

impl TestHarness {
    /// A harness with English game data.
    pub fn new() -> Self {
        Self::with_locale(Locale::En)
    }

    pub fn with_locale(locale: Locale) -> Self {
        let coordinator = TurnCoordinator::for_locale(locale);
        let player_hp = coordinator.config().default_player_hp;

        Self {
            coordinator,
            generator: ScriptedGenerator::new(),
            dice: LoadedDice::default(),
            hero: "Test Hero".to_string(),
            inventory: Vec::new(),
            npcs: NpcDirectory::new(),
            player_hp,
            active_npc: None,
            goal: GoalState::default(),
            history: Vec::new(),
            roll: (10, 10),
        }
    }

    /// Queue a narrative response.
    pub fn expect_narrative(&mut self, text: impl Into<String>) -> &mut Self {
        self.generator.push_text(text);
        self
    }

    /// Queue a failed generation call.
    pub fn expect_failure(&mut self, error: GenerationError) -> &mut Self {
        self.generator.push_failure(error);
        self
    }

    /// Queue die results.
    pub fn load_dice(&mut self, rolls: impl IntoIterator<Item = u32>) -> &mut Self {
        for roll in rolls {
            self.dice.push(roll);
        }
        self
    }

    pub fn give_item(&mut self, name: &str, quantity: u32) -> &mut Self {
        self.inventory
            .push(InventoryItem::new(name, quantity).into());
        self
    }

    pub fn add_npc(&mut self, npc: NpcRecord) -> &mut Self {
        self.npcs.insert(npc);
        self
    }

    /// Make `name` the NPC the hero is dealing with.
    pub fn engage(&mut self, name: &str) -> &mut Self {
        self.active_npc = Some(name.to_string());
        self
    }

    /// Start the adventure and adopt its goal.
    pub fn start(&mut self) -> Result<AdventureIntro, TurnError> {
        let request = AdventureRequest::new(self.hero.clone());
        let intro = self
            .coordinator
            .start_adventure(&request, &mut self.generator)?;
        self.goal = intro.goal_state();
        Ok(intro)
    }

    /// Play a narrative turn, keeping the returned state on success.
    pub fn act(&mut self, action: &str) -> Result<TurnResult, TurnError> {
        let mut request = TurnRequest::new(action)
            .with_hero(self.hero.clone())
            .with_roll(self.roll.0, self.roll.1)
            .with_goal(self.goal.goal.clone())
            .with_inventory(self.inventory.clone())
            .with_npcs(self.npcs.clone())
            .with_history(self.history.clone());
        request.npc_name = self.active_npc.clone();

        let result = self.coordinator.play_turn(&request, &mut self.generator)?;

        self.inventory = result.next_inventory();
        self.npcs = result.stored_npcs.clone();
        self.active_npc = result.npc.as_ref().map(|npc| npc.name.clone());
        self.player_hp = (self.player_hp + result.effects.hp).max(0);
        self.goal.update(&result);
        self.history.push(HistoryEntry::reply(action, result.reply.clone()));

        Ok(result)
    }

    /// Fight the engaged NPC for one round.
    pub fn attack(&mut self, action: &str) -> Result<CombatOutcome, CombatError> {
        let target = self
            .active_npc
            .as_deref()
            .and_then(|name| self.npcs.get(name))
            .map(CombatTarget::from)
            .ok_or(CombatError::MissingEnemy)?;

        let request = CombatRequest::new(action, target).with_player_hp(self.player_hp);
        let outcome = self
            .coordinator
            .resolve_combat(&request, &mut self.npcs, &mut self.dice)?;

        self.player_hp = outcome.player_hp;
        for entry in outcome.history.iter() {
            self.history.push(HistoryEntry {
                kind: "combat".to_string(),
                text: entry.text.clone(),
                ..HistoryEntry::default()
            });
        }

        Ok(outcome)
    }

    /// Quantity of an item held, matched ignoring case.
    pub fn item_count(&self, name: &str) -> u32 {
        let name = name.to_lowercase();
        self.inventory
            .iter()
            .map(InventoryEntry::normalize)
            .filter(|item| item.name.to_lowercase() == name)
            .map(|item| item.quantity)
            .sum()
    }

    pub fn npc_hp(&self, name: &str) -> Option<i32> {
        self.npcs.get(name).map(|npc| npc.hp)
    }

    /// Last prompt sent to the generator.
    pub fn last_prompt(&self) -> Option<&str> {
        self.generator.prompts().last().map(String::as_str)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the hero holds exactly `quantity` of an item.
#[track_caller]
pub fn assert_item_count(harness: &TestHarness, name: &str, quantity: u32) {
    let actual = harness.item_count(name);
    assert_eq!(
        actual, quantity,
        "Expected {quantity} of '{name}' in inventory, found {actual}"
    );
}

/// Assert the hero holds none of an item.
#[track_caller]
pub fn assert_no_item(harness: &TestHarness, name: &str) {
    assert_item_count(harness, name, 0);
}

/// Assert an NPC is known with the given hp.
#[track_caller]
pub fn assert_npc_hp(harness: &TestHarness, name: &str, hp: i32) {
    assert_eq!(
        harness.npc_hp(name),
        Some(hp),
        "Expected NPC '{name}' to have {hp} hp"
    );
}

/// Assert player hp.
#[track_caller]
pub fn assert_player_hp(harness: &TestHarness, hp: i32) {
    assert_eq!(
        harness.player_hp, hp,
        "Expected player hp {hp}, got {}",
        harness.player_hp
    );
}

/// Assert the adventure goal has been achieved.
#[track_caller]
pub fn assert_goal_achieved(harness: &TestHarness) {
    assert!(
        harness.goal.achieved,
        "Expected goal '{}' to be achieved",
        harness.goal.goal
    );
}
