//! Prompts sent to the generation service.

use crate::game_data::{render, Locale};
use crate::npc::NpcContext;

const INTRO: &str = include_str!("prompts/intro.txt");
const ACTION: &str = include_str!("prompts/action.txt");
const ACTION_DIALOG: &str = include_str!("prompts/action_dialog.txt");
const NPC_DRAFT: &str = include_str!("prompts/npc_draft.txt");
const NPC_NAME: &str = include_str!("prompts/npc_name.txt");

/// Opening scene of a new adventure.
pub fn intro_prompt(locale: Locale, hero: &str, race: &str, class: &str) -> String {
    render(
        INTRO,
        &[
            ("language", &locale.language_name()),
            ("hero", &hero),
            ("race", &race),
            ("class", &class),
        ],
    )
}

/// A fresh NPC name. Names already in play are listed so they are avoided.
pub fn npc_name_prompt(locale: Locale, taken: &[&str]) -> String {
    let taken = if taken.is_empty() {
        String::new()
    } else {
        format!("Do not use any of these names: {}.", taken.join(", "))
    };
    render(
        NPC_NAME,
        &[("language", &locale.language_name()), ("taken", &taken)],
    )
}

/// A JSON stat block for a named NPC.
pub fn npc_draft_prompt(locale: Locale, name: &str, context: &NpcContext) -> String {
    render(
        NPC_DRAFT,
        &[
            ("language", &locale.language_name()),
            ("npc", &name),
            ("scene", &context.scene),
            ("hero", &context.hero_name),
            ("race", &context.race),
            ("class", &context.character_class),
        ],
    )
}

/// Everything a turn prompt is built from.
#[derive(Debug, Clone)]
pub struct TurnPrompt<'a> {
    pub locale: Locale,
    pub hero: &'a str,
    pub race: &'a str,
    pub class: &'a str,
    pub weapon: &'a str,
    pub inventory: Vec<&'a str>,
    pub goal: &'a str,
    pub intro: &'a str,
    pub history: String,
    pub action: &'a str,
    /// Name and leading trait of the NPC the hero is dealing with.
    pub npc: Option<(&'a str, &'a str)>,
    pub roll: i32,
    pub difficulty: i32,
    /// Talking rather than acting.
    pub dialog: bool,
}

impl TurnPrompt<'_> {
    pub fn succeeded(&self) -> bool {
        self.roll >= self.difficulty
    }

    pub fn render(&self) -> String {
        let template = if self.dialog && self.npc.is_some() {
            ACTION_DIALOG
        } else {
            ACTION
        };

        let (npc, npc_trait) = self.npc.unwrap_or(("", ""));
        let npc_line = if npc.is_empty() {
            String::new()
        } else {
            format!("The hero is facing {npc} ({npc_trait}).\n")
        };
        let inventory = if self.inventory.is_empty() {
            "nothing".to_string()
        } else {
            self.inventory.join(", ")
        };
        let status = if self.succeeded() { "success" } else { "failure" };

        render(
            template,
            &[
                ("language", &self.locale.language_name()),
                ("hero", &self.hero),
                ("race", &self.race),
                ("class", &self.class),
                ("weapon", &self.weapon),
                ("inventory", &inventory),
                ("goal", &self.goal),
                ("intro", &self.intro),
                ("history", &self.history),
                ("npc_line", &npc_line),
                ("npc", &npc),
                ("npc_trait", &npc_trait),
                ("action", &self.action),
                ("roll", &self.roll),
                ("difficulty", &self.difficulty),
                ("status", &status),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(dialog: bool, npc: Option<(&'static str, &'static str)>) -> TurnPrompt<'static> {
        TurnPrompt {
            locale: Locale::En,
            hero: "Mira",
            race: "elf",
            class: "ranger",
            weapon: "Bow",
            inventory: vec!["rope", "potion"],
            goal: "Find the lost crown",
            intro: "You stand at the gates.",
            history: "The adventure has just begun.".to_string(),
            action: "talk to the guard",
            npc,
            roll: 12,
            difficulty: 10,
            dialog,
        }
    }

    #[test]
    fn test_intro_prompt_fills_hero() {
        let prompt = intro_prompt(Locale::Uk, "Taras", "human", "bard");
        assert!(prompt.contains("Taras"));
        assert!(prompt.contains("Ukrainian"));
        assert!(prompt.contains("[GOAL:"));
        assert!(!prompt.contains("{hero}"));
    }

    #[test]
    fn test_turn_prompt_status() {
        let prompt = turn(false, None).render();
        assert!(prompt.contains("12 against difficulty 10"));
        assert!(prompt.contains("success"));
        assert!(prompt.contains("rope, potion"));

        let mut failed = turn(false, None);
        failed.roll = 3;
        assert!(failed.render().contains("failure"));
    }

    #[test]
    fn test_dialog_prompt_needs_npc() {
        let with_npc = turn(true, Some(("Guard", "stern"))).render();
        assert!(with_npc.contains("in the voice of Guard"));

        let without_npc = turn(true, None).render();
        assert!(!without_npc.contains("in the voice of"));
    }

    #[test]
    fn test_npc_prompts() {
        let context = NpcContext::new("A misty bridge", "Mira");
        let draft = npc_draft_prompt(Locale::En, "Grask", &context);
        assert!(draft.contains("\"name\": \"Grask\""));
        assert!(draft.contains("A misty bridge"));

        let name = npc_name_prompt(Locale::En, &["Grask", "Ulma"]);
        assert!(name.contains("Grask, Ulma"));
    }
}
