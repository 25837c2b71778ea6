//! Turn engine for text adventures narrated by a language model.
//!
//! This crate provides:
//! - Directive parsing for narration (`[GOAL:...]`, `[NEW_ITEM:...]`, `[NEW_NPC:...]`)
//! - Keyword-driven item use with stat effects
//! - NPC creation with generated names, stats and traits
//! - d20 combat rounds
//! - English and Ukrainian game data, overridable from JSON
//!
//! The engine never talks to a model service itself. Callers supply a
//! [`NarrativeGenerator`] and own all game state between calls.
//!
//! # Quick Start
//!
//! ```ignore
//! use saga_core::{GenerationError, Locale, TurnCoordinator, TurnRequest};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = TurnCoordinator::for_locale(Locale::En);
//!     let mut generator = |prompt: &str| -> Result<String, GenerationError> {
//!         my_model_call(prompt).map_err(|e| GenerationError::Service(e.to_string()))
//!     };
//!
//!     let request = TurnRequest::new("drink potion")
//!         .with_hero("Mira")
//!         .with_inventory(vec!["potion".into()]);
//!     let result = coordinator.play_turn(&request, &mut generator)?;
//!     println!("{}", result.reply);
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod config;
pub mod dice;
pub mod directive;
pub mod game_data;
pub mod generator;
pub mod inventory;
pub mod items;
pub mod npc;
pub mod prompts;
pub mod testing;
pub mod text;
pub mod turn;

// Primary public API
pub use combat::{CombatEngine, CombatError, CombatOutcome, CombatRequest, CombatTarget, TurnLog};
pub use config::GameConfig;
pub use dice::{DiceRoller, RngRoller};
pub use game_data::{GameData, GameDataError, Locale};
pub use generator::{GenerationError, NarrativeGenerator};
pub use inventory::{InventoryEntry, InventoryItem, InventoryResolver};
pub use items::{EffectDelta, ItemCatalog};
pub use npc::{NpcDirectory, NpcRecord};
pub use testing::{LoadedDice, ScriptedGenerator, TestHarness};
pub use turn::{
    AdventureIntro, AdventureRequest, GoalState, HistoryEntry, NpcMeeting, NpcRequest,
    TurnCoordinator, TurnError, TurnRequest, TurnResult,
};
