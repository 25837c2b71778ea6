//! Single-round combat resolution.
//!
//! A round is resolved from its inputs alone: the caller passes in the current
//! hit points and gets the new ones back, together with a narrated log. A round
//! runs as follows:
//!
//! 1. Movement toward a known place updates the location.
//! 2. If the action is an attack, the player rolls d20 + attack bonus against
//!    the NPC's armor class. Stealth, poison and magic each add +2 damage.
//! 3. If the NPC is still standing, it strikes back against the player's armor.
//!
//! A natural 1 always misses and a natural 20 always hits for double damage.

use crate::config::GameConfig;
use crate::dice::{roll_d20, roll_damage, DiceRoller};
use crate::game_data::{render, KeywordCategory, KeywordTable, Phrasebook};
use crate::npc::NpcRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bonus damage per matched situational category.
pub const SITUATIONAL_BONUS: i32 = 2;

/// Player armor class when none is given.
pub const DEFAULT_PLAYER_AC: i32 = 10;

/// Errors from combat resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("No enemy to fight: the NPC needs a name, hp and ac")]
    MissingEnemy,
}

/// The NPC side of a combat request, as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CombatTarget {
    pub name: Option<String>,
    pub hp: Option<i32>,
    pub ac: Option<i32>,
    pub attack_bonus: Option<i32>,
    pub damage_dice: Option<String>,
}

impl From<&NpcRecord> for CombatTarget {
    fn from(npc: &NpcRecord) -> Self {
        Self {
            name: Some(npc.name.clone()),
            hp: Some(npc.hp),
            ac: Some(npc.ac),
            attack_bonus: Some(npc.attack_bonus),
            damage_dice: Some(npc.damage_dice.clone()),
        }
    }
}

impl From<NpcRecord> for CombatTarget {
    fn from(npc: NpcRecord) -> Self {
        Self::from(&npc)
    }
}

/// The player's stat block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerStats {
    pub hp: Option<i32>,
    pub ac: Option<i32>,
    pub weapon: Option<String>,
    pub damage_dice: Option<String>,
    pub attack_bonus: Option<i32>,
}

/// Input of one combat round.
///
/// Top-level fields win over the matching `player_stats` fields; anything left
/// out falls back to [`GameConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRequest {
    pub action: String,
    pub npc: Option<CombatTarget>,
    pub player_stats: PlayerStats,
    pub player_hp: Option<i32>,
    /// Current NPC hp. Defaults to the NPC's own hp.
    pub npc_hp: Option<i32>,
    pub weapon: Option<String>,
    pub damage_dice: Option<String>,
    pub attack_bonus: Option<i32>,
    pub location: Option<String>,
}

impl CombatRequest {
    pub fn new(action: impl Into<String>, npc: impl Into<CombatTarget>) -> Self {
        Self {
            action: action.into(),
            npc: Some(npc.into()),
            ..Self::default()
        }
    }

    pub fn with_player_hp(mut self, hp: i32) -> Self {
        self.player_hp = Some(hp);
        self
    }

    pub fn with_npc_hp(mut self, hp: i32) -> Self {
        self.npc_hp = Some(hp);
        self
    }

    pub fn with_player_ac(mut self, ac: i32) -> Self {
        self.player_stats.ac = Some(ac);
        self
    }

    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.weapon = Some(weapon.into());
        self
    }

    pub fn with_damage_dice(mut self, dice: impl Into<String>) -> Self {
        self.damage_dice = Some(dice.into());
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i32) -> Self {
        self.attack_bonus = Some(bonus);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// What a log entry narrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    BoutStart,
    AttackRoll,
    Hit,
    Miss,
    Damage,
    NpcDefeated,
    CounterRoll,
    PlayerDown,
}

/// One line of combat narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub text: String,
}

/// The ordered narration of a round. Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnLog(Vec<LogEntry>);

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LogKind, text: impl Into<String>) {
        self.0.push(LogEntry {
            kind,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn kinds(&self) -> Vec<LogKind> {
        self.0.iter().map(|e| e.kind).collect()
    }

    pub fn contains(&self, kind: LogKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.0.iter()
    }
}

/// Result of one combat round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub history: TurnLog,
    pub player_hp: i32,
    pub npc_hp: i32,
    /// The player is down.
    pub is_defeated: bool,
    /// The NPC is down.
    pub is_victory: bool,
    /// Set when the player's blow this round took the NPC down.
    pub npc_defeated_name: Option<String>,
    pub location: String,
}

/// A validated opponent.
struct Enemy<'r> {
    name: &'r str,
    hp: i32,
    ac: i32,
    attack_bonus: i32,
    damage_dice: &'r str,
}

/// Resolves combat rounds for one locale.
#[derive(Debug, Clone, Copy)]
pub struct CombatEngine<'a> {
    keywords: &'a KeywordTable,
    phrases: &'a Phrasebook,
    config: &'a GameConfig,
}

impl<'a> CombatEngine<'a> {
    pub fn new(keywords: &'a KeywordTable, phrases: &'a Phrasebook, config: &'a GameConfig) -> Self {
        Self {
            keywords,
            phrases,
            config,
        }
    }

    /// The place an action moves to: the first known location mentioned
    /// alongside a movement word.
    pub fn infer_location(&self, action: &str) -> Option<&'a str> {
        if !self.keywords.matches(KeywordCategory::Movement, action) {
            return None;
        }
        self.keywords.first_in(KeywordCategory::Location, action)
    }

    /// Resolve one round.
    pub fn resolve_round<D: DiceRoller + ?Sized>(
        &self,
        request: &CombatRequest,
        dice: &mut D,
    ) -> Result<CombatOutcome, CombatError> {
        let location = match self.infer_location(&request.action) {
            Some(place) => place.to_string(),
            None => request
                .location
                .clone()
                .unwrap_or_else(|| self.config.default_location.clone()),
        };

        let enemy = self.enemy(request)?;
        let stats = &request.player_stats;
        let action = request.action.as_str();

        let weapon = request
            .weapon
            .as_deref()
            .or(stats.weapon.as_deref())
            .unwrap_or(&self.config.default_weapon);
        let damage_dice = request
            .damage_dice
            .as_deref()
            .or(stats.damage_dice.as_deref())
            .unwrap_or(&self.config.default_damage_dice);
        let attack_bonus = request.attack_bonus.or(stats.attack_bonus).unwrap_or(0);
        let player_ac = stats.ac.unwrap_or(DEFAULT_PLAYER_AC);

        let mut player_hp = request
            .player_hp
            .or(stats.hp)
            .unwrap_or(self.config.default_player_hp)
            .max(0);
        let mut npc_hp = request.npc_hp.unwrap_or(enemy.hp).max(0);
        let mut npc_defeated_name = None;
        let mut log = TurnLog::new();
        let p = self.phrases;

        if self.keywords.matches(KeywordCategory::AttackAction, action) {
            let situational = self.situational_bonus(action);

            log.push(LogKind::BoutStart, render(&p.bout_start, &[("npc", &enemy.name)]));

            let roll = roll_d20(dice, attack_bonus);
            log.push(
                LogKind::AttackRoll,
                render(
                    &p.attack_roll,
                    &[
                        ("weapon", &weapon),
                        ("roll", &roll.natural),
                        ("bonus", &attack_bonus),
                        ("total", &roll.total),
                        ("ac", &enemy.ac),
                    ],
                ),
            );

            if roll.is_fumble() {
                log.push(
                    LogKind::Miss,
                    render(&p.attack_fumble, &[("weapon", &weapon), ("npc", &enemy.name)]),
                );
            } else if roll.hits(enemy.ac) {
                log.push(LogKind::Hit, p.attack_hit.clone());

                let rolled = roll_damage(damage_dice, dice);
                let bonus = attack_bonus.saturating_add(situational.bonus);
                let damage = rolled
                    .saturating_add(bonus)
                    .saturating_mul(roll.damage_multiplier())
                    .max(0);
                npc_hp = npc_hp.saturating_sub(damage).max(0);

                let critical = if roll.is_critical() {
                    p.critical_suffix.as_str()
                } else {
                    ""
                };
                let effects = situational.describe(p);
                log.push(
                    LogKind::Damage,
                    render(
                        &p.damage_dealt,
                        &[
                            ("dice", &damage_dice),
                            ("rolled", &rolled),
                            ("bonus", &bonus),
                            ("critical", &critical),
                            ("damage", &damage),
                            ("effects", &effects),
                        ],
                    ),
                );

                if npc_hp == 0 {
                    npc_defeated_name = Some(enemy.name.to_string());
                    log.push(LogKind::NpcDefeated, render(&p.npc_defeated, &[("npc", &enemy.name)]));
                }
            } else {
                log.push(
                    LogKind::Miss,
                    render(
                        &p.attack_miss,
                        &[("weapon", &weapon), ("npc", &enemy.name), ("total", &roll.total)],
                    ),
                );
            }
        }

        if npc_hp > 0 {
            let roll = roll_d20(dice, enemy.attack_bonus);
            log.push(
                LogKind::CounterRoll,
                render(
                    &p.counter_roll,
                    &[
                        ("npc", &enemy.name),
                        ("roll", &roll.natural),
                        ("bonus", &enemy.attack_bonus),
                        ("total", &roll.total),
                        ("ac", &player_ac),
                    ],
                ),
            );

            if roll.is_fumble() {
                log.push(LogKind::Miss, render(&p.npc_fumble, &[("npc", &enemy.name)]));
            } else if roll.hits(player_ac) {
                let rolled = roll_damage(enemy.damage_dice, dice);
                let damage = rolled.saturating_mul(roll.damage_multiplier()).max(0);
                player_hp = player_hp.saturating_sub(damage).max(0);

                let critical = if roll.is_critical() {
                    p.critical_suffix.as_str()
                } else {
                    ""
                };
                log.push(
                    LogKind::Damage,
                    render(
                        &p.npc_hit,
                        &[
                            ("npc", &enemy.name),
                            ("dice", &enemy.damage_dice),
                            ("rolled", &rolled),
                            ("critical", &critical),
                            ("damage", &damage),
                            ("hp", &player_hp),
                        ],
                    ),
                );

                if player_hp == 0 {
                    log.push(LogKind::PlayerDown, p.player_down.clone());
                }
            } else {
                log.push(
                    LogKind::Miss,
                    render(&p.npc_miss, &[("npc", &enemy.name), ("total", &roll.total)]),
                );
            }
        }

        tracing::debug!(
            npc = enemy.name,
            player_hp,
            npc_hp,
            entries = log.len(),
            location = %location,
            "Combat round resolved"
        );

        Ok(CombatOutcome {
            history: log,
            player_hp,
            npc_hp,
            is_defeated: player_hp == 0,
            is_victory: npc_hp == 0,
            npc_defeated_name,
            location,
        })
    }

    fn enemy<'r>(&'r self, request: &'r CombatRequest) -> Result<Enemy<'r>, CombatError> {
        let target = request.npc.as_ref().ok_or(CombatError::MissingEnemy)?;
        let name = target
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(CombatError::MissingEnemy)?;
        let (Some(hp), Some(ac)) = (target.hp, target.ac) else {
            return Err(CombatError::MissingEnemy);
        };

        Ok(Enemy {
            name,
            hp,
            ac,
            attack_bonus: target.attack_bonus.unwrap_or(0),
            damage_dice: target
                .damage_dice
                .as_deref()
                .unwrap_or(self.config.npc_damage_dice.as_str()),
        })
    }

    fn situational_bonus(&self, action: &str) -> Situational {
        let p = self.phrases;
        let mut situational = Situational::default();

        for (category, flavor, label) in [
            (KeywordCategory::Stealth, &p.sneak_bonus, &p.sneak_label),
            (KeywordCategory::Poison, &p.poison_bonus, &p.poison_label),
            (KeywordCategory::Spell, &p.spell_bonus, &p.spell_label),
        ] {
            if self.keywords.matches(category, action) {
                situational.bonus += SITUATIONAL_BONUS;
                situational.flavor.push_str(flavor);
                situational.labels.push(label.clone());
            }
        }

        situational
    }
}

/// Situational damage bonus and its narration.
#[derive(Debug, Default)]
struct Situational {
    bonus: i32,
    flavor: String,
    labels: Vec<String>,
}

impl Situational {
    fn describe(&self, phrases: &Phrasebook) -> String {
        if self.labels.is_empty() {
            return String::new();
        }
        let labels = self.labels.join(", ");
        format!(
            "{}{}",
            self.flavor,
            render(&phrases.effects_used, &[("effects", &labels)])
        )
    }
}
