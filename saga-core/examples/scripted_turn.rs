//! Plays a short adventure with a canned narrator and real dice.
//!
//! Run with: `cargo run -p saga-core --example scripted_turn`

use saga_core::{
    AdventureRequest, CombatRequest, GenerationError, InventoryEntry, Locale, NpcDirectory,
    RngRoller, TurnCoordinator, TurnRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = TurnCoordinator::for_locale(Locale::En);

    let mut lines = vec![
        "Wind howls around the old tower.\n[GOAL:Reach the top of the tower]",
        "A goblin blocks the stairs. [NEW_NPC:Goblin, hp=15, ac=12, attackBonus=2]",
        "The goblin snarls, wounded.",
    ]
    .into_iter();
    let mut narrator = |prompt: &str| -> Result<String, GenerationError> {
        println!("--- prompt ({} chars)", prompt.chars().count());
        lines
            .next()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Service("narrator has nothing more to say".to_string()))
    };

    let intro = coordinator.start_adventure(
        &AdventureRequest::new("Mira").with_class("ranger"),
        &mut narrator,
    )?;
    println!("{}\nGoal: {}\n", intro.intro, intro.goal);

    let mut inventory: Vec<InventoryEntry> = vec!["potion".into(), "rope".into()];
    let mut npcs = NpcDirectory::new();

    let request = TurnRequest::new("climb the stairs")
        .with_hero("Mira")
        .with_goal(intro.goal.clone())
        .with_inventory(inventory.clone())
        .with_npcs(npcs.clone());
    let turn = coordinator.play_turn(&request, &mut narrator)?;
    println!("{}\n", turn.reply);
    inventory = turn.next_inventory();
    npcs = turn.stored_npcs.clone();

    let Some(goblin) = turn.npc else {
        return Ok(());
    };

    let mut dice = RngRoller::thread();
    let round = coordinator.resolve_combat(
        &CombatRequest::new("attack the goblin", &goblin).with_attack_bonus(3),
        &mut npcs,
        &mut dice,
    )?;
    for entry in round.history.iter() {
        println!("{}", entry.text);
    }
    println!("\nYou: {} hp, {}: {} hp\n", round.player_hp, goblin.name, round.npc_hp);

    let request = TurnRequest::new("drink potion")
        .with_hero("Mira")
        .with_goal(intro.goal)
        .with_inventory(inventory)
        .with_npcs(npcs)
        .with_active_npc(goblin.name.clone());
    let turn = coordinator.play_turn(&request, &mut narrator)?;
    println!("{}", turn.reply);
    println!("Effects: {:?}", turn.effects);

    Ok(())
}
