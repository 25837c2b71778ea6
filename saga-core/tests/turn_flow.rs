//! Multi-turn adventures played against a scripted generator.
//!
//! Run with: `cargo test -p saga-core --test turn_flow`

use saga_core::testing::{
    assert_goal_achieved, assert_item_count, assert_no_item, assert_npc_hp, assert_player_hp,
    TestHarness,
};
use saga_core::{
    AdventureRequest, GenerationError, Locale, NpcDirectory, NpcRecord, NpcRequest,
    ScriptedGenerator, TurnCoordinator, TurnError, TurnRequest,
};

// =============================================================================
// A full adventure
// =============================================================================

#[test]
fn test_adventure_from_intro_to_goal() {
    let mut harness = TestHarness::new();
    harness
        .give_item("potion", 1)
        .expect_narrative("The tower bell hangs silent.\n[GOAL:Ring the bell]");

    let intro = harness.start().unwrap();
    assert_eq!(intro.intro, "The tower bell hangs silent.");
    assert_eq!(harness.goal.goal, "Ring the bell");

    // A goblin shows up.
    harness.expect_narrative("A goblin drops from the rafters! [NEW_NPC:Goblin, hp=15, ac=12, attackBonus=2]");
    let result = harness.act("climb the stairs").unwrap();
    assert_eq!(result.reply, "A goblin drops from the rafters!");
    assert_eq!(harness.active_npc.as_deref(), Some("Goblin"));
    assert_npc_hp(&harness, "Goblin", 15);

    // One round of combat.
    harness.load_dice([15, 4, 12, 5]);
    harness.attack("attack goblin").unwrap();
    assert_npc_hp(&harness, "Goblin", 11);
    assert_player_hp(&harness, 25);

    // While the goblin stands, a second arrival is ignored.
    harness.expect_narrative("A wolf howls outside. [NEW_NPC:Wolf, hp=20, ac=12, attackBonus=4]");
    let result = harness.act("listen").unwrap();
    assert_eq!(result.npc.as_ref().map(|npc| npc.name.as_str()), Some("Goblin"));
    assert_eq!(harness.npcs.len(), 1);
    assert_eq!(result.reply, "A wolf howls outside.");

    // Drinking the potion.
    harness.expect_narrative("You feel stronger.");
    let result = harness.act("drink potion").unwrap();
    assert_eq!(result.reply, "Test Hero uses potion. You feel stronger.");
    assert_no_item(&harness, "potion");
    assert_player_hp(&harness, 35);

    // The goal.
    harness.expect_narrative("The bell rings out across the valley. [META_ACHIEVED]");
    let result = harness.act("ring the bell").unwrap();
    assert_goal_achieved(&harness);
    assert_eq!(result.final_description, result.reply);
    assert_eq!(harness.goal.final_description, "The bell rings out across the valley.");

    // Five narrative prompts, one per generation call.
    assert_eq!(harness.generator.prompts().len(), 5);
    assert!(harness
        .last_prompt()
        .is_some_and(|prompt| prompt.contains("You feel stronger.")));
}

#[test]
fn test_found_items_carry_over() {
    let mut harness = TestHarness::new();
    harness
        .expect_narrative("Under the floorboards: [NEW_ITEM:bread] and [NEW_ITEM:Rusty Key] [NEW_ITEM:x]")
        .expect_narrative("Delicious.");

    let result = harness.act("search the room").unwrap();
    assert_eq!(result.new_items.len(), 2);
    assert!(!result.reply.contains("NEW_ITEM"));
    assert_item_count(&harness, "rusty key", 1);

    harness.act("eat bread").unwrap();
    assert_no_item(&harness, "bread");
    assert_item_count(&harness, "Rusty Key", 1);
    assert_player_hp(&harness, 33);
}

#[test]
fn test_final_description_after_marker() {
    let mut harness = TestHarness::new();
    harness.expect_narrative(
        "The gate opens. [META_ACHIEVED] [FINAL_DESCRIPTION] You walk out free. [NEW_ITEM:Crown]",
    );

    let result = harness.act("open the gate").unwrap();
    assert_eq!(result.reply, "The gate opens.");
    assert_eq!(result.final_description, "You walk out free.");
    assert_eq!(result.new_items.len(), 1);
    assert_goal_achieved(&harness);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_generation_leaves_state_alone() {
    let mut harness = TestHarness::new();
    harness
        .give_item("potion", 1)
        .expect_failure(GenerationError::Service("timeout".to_string()));

    let result = harness.act("drink potion");
    assert!(matches!(result, Err(TurnError::Generation(_))));
    assert_item_count(&harness, "potion", 1);
    assert_player_hp(&harness, 30);
    assert!(harness.history.is_empty());
}

#[test]
fn test_empty_narration_is_a_failure() {
    let coordinator = TurnCoordinator::for_locale(Locale::En);
    let mut generator = ScriptedGenerator::new().queue_text("   \n ");

    let result = coordinator.play_turn(&TurnRequest::new("wait"), &mut generator);
    assert_eq!(result, Err(TurnError::Generation(GenerationError::Empty)));
}

#[test]
fn test_no_potion_left_warns() {
    let mut harness = TestHarness::new();
    harness.give_item("potion", 0).expect_narrative("Nothing happens.");

    let result = harness.act("drink potion").unwrap();
    assert_eq!(result.warnings, vec!["You have no potion left.".to_string()]);
    assert!(result.removed_items.is_empty());
    assert_eq!(result.reply, "Nothing happens.");
    assert_player_hp(&harness, 30);
}

// =============================================================================
// Meeting NPCs
// =============================================================================

#[test]
fn test_meet_named_npc_then_fetch_again() {
    let coordinator = TurnCoordinator::for_locale(Locale::En);
    let mut generator = ScriptedGenerator::new().queue_text(
        r#"```json
        {"name": "Elra", "hp": 25, "ac": 13, "attackBonus": 1, "damageDice": "d4",
         "characterTraits": ["curious", "kind"], "initialMessage": "Lost, traveler?"}
        ```"#,
    );

    let request = NpcRequest {
        npc_name: Some("Elra".to_string()),
        context: "A mossy well".to_string(),
        hero_name: "Mira".to_string(),
        ..NpcRequest::default()
    };
    let meeting = coordinator.meet_npc(&request, &mut generator);
    assert_eq!(meeting.npc.hp, 25);
    assert_eq!(meeting.npc.leading_trait(), "curious");
    assert_eq!(meeting.npc.initial_message, "Lost, traveler?");
    assert_eq!(meeting.stored_npcs.len(), 1);

    let again = coordinator.meet_npc(
        &NpcRequest {
            stored_npcs: meeting.stored_npcs.clone(),
            ..request
        },
        &mut generator,
    );
    assert_eq!(again.npc, meeting.npc);
    assert_eq!(generator.prompts().len(), 1);
}

#[test]
fn test_meet_unnamed_npc_with_bad_draft_falls_back() {
    let coordinator = TurnCoordinator::for_locale(Locale::En);
    let mut generator = ScriptedGenerator::new()
        .queue_text("Grey Wolf")
        .queue_failure(GenerationError::Service("overloaded".to_string()));

    let meeting = coordinator.meet_npc(&NpcRequest::default(), &mut generator);
    assert_eq!(meeting.npc.name, "Grey Wolf");
    assert_eq!(
        (meeting.npc.hp, meeting.npc.ac, meeting.npc.attack_bonus),
        (20, 12, 4)
    );
    assert!(meeting.stored_npcs.contains_name("Grey Wolf"));
}

#[test]
fn test_talking_to_npc_uses_dialog_prompt() {
    let coordinator = TurnCoordinator::for_locale(Locale::En);
    let mut npcs = NpcDirectory::new();
    npcs.insert(NpcRecord::new("Elra", 25, 13, 1, "d4").with_traits(vec!["curious".to_string()]));
    let mut generator = ScriptedGenerator::new().queue_text("\"Welcome,\" Elra says.");

    let request = TurnRequest::new("talk to Elra")
        .with_hero("Mira")
        .with_npcs(npcs)
        .with_active_npc("Elra");
    let result = coordinator.play_turn(&request, &mut generator).unwrap();

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Elra"));
    assert!(prompt.contains("curious"));
    assert_eq!(result.npc.map(|npc| npc.name), Some("Elra".to_string()));
}

// =============================================================================
// Ukrainian
// =============================================================================

#[test]
fn test_ukrainian_item_use() {
    let mut harness = TestHarness::with_locale(Locale::Uk);
    harness.hero = "Олеся".to_string();
    harness
        .give_item("зілля", 2)
        .expect_narrative("Тепло розливається тілом.");

    let result = harness.act("випити зілля").unwrap();
    assert_eq!(result.reply, "Олеся використовує зілля. Тепло розливається тілом.");
    assert_eq!(result.effects.hp, 10);
    assert_item_count(&harness, "зілля", 1);
}

#[test]
fn test_ukrainian_adventure_defaults() {
    let coordinator = TurnCoordinator::for_locale(Locale::Uk);
    let mut generator = ScriptedGenerator::new().queue_text("Туман над селом.");

    let intro = coordinator
        .start_adventure(&AdventureRequest::new(""), &mut generator)
        .unwrap();
    assert_eq!(intro.intro, "Туман над селом.");
    assert_eq!(intro.goal, coordinator.data().phrases(Locale::Uk).default_goal);
    assert!(generator.prompts()[0].contains("Невідомий герой"));
}
