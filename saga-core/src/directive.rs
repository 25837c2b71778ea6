//! Extraction of game directives embedded in generated narrative.
//!
//! The generation service marks game events with bracketed tags inside its
//! prose:
//!
//! ```text
//! [GOAL:<text>]
//! [META_ACHIEVED] ... [FINAL_DESCRIPTION] ...
//! [NEW_ITEM:<name>]
//! [NEW_NPC:<name>, hp=<int>, ac=<int>, attackBonus=<int>]
//! ```
//!
//! Text is scanned left to right into a stream of [`Piece`]s. Parsing is total:
//! unknown or malformed tags are dropped from the prose and never surface as
//! errors.
//!
//! # Example
//!
//! ```
//! use saga_core::directive::parse_turn;
//!
//! let parsed = parse_turn("You find a key. [NEW_ITEM:Iron Key] [SUCCESS]", None);
//! assert_eq!(parsed.reply, "You find a key.");
//! assert_eq!(parsed.new_items, vec!["Iron Key".to_string()]);
//! ```

use crate::text::normalize_whitespace;
use serde::{Deserialize, Serialize};

/// A scanned piece of narrative: plain text or a bracketed tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Tag(Directive<'a>),
}

/// A bracketed tag, classified by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `[GOAL:<text>]`
    Goal(&'a str),
    /// `[META_ACHIEVED]`
    MetaAchieved,
    /// `[FINAL_DESCRIPTION]`, the marker splitting reply from ending.
    FinalDescription,
    /// `[NEW_ITEM:<name>]`
    NewItem(&'a str),
    /// `[NEW_NPC:<fields>]`, fields not yet validated.
    NewNpc(&'a str),
    /// Any other bracketed token (`[SUCCESS]`, `[DAMAGE:3]`, ...).
    Noise(&'a str),
}

impl<'a> Directive<'a> {
    fn classify(body: &'a str) -> Self {
        let (name, payload) = match body.split_once(':') {
            Some((name, payload)) => (name, Some(payload)),
            None => (body, None),
        };

        match (name, payload) {
            ("GOAL", Some(goal)) => Directive::Goal(goal),
            ("META_ACHIEVED", None) => Directive::MetaAchieved,
            ("FINAL_DESCRIPTION", None) => Directive::FinalDescription,
            ("NEW_ITEM", Some(item)) => Directive::NewItem(item),
            ("NEW_NPC", Some(fields)) => Directive::NewNpc(fields),
            _ => Directive::Noise(body),
        }
    }
}

/// Scan narrative into text and tags.
///
/// A tag runs from `[` to the next `]`. A `[` followed by another `[` before any
/// `]` is plain text, so tag bodies never contain `[`.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// Iterator returned by [`tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let open = match self.rest.find('[') {
            Some(0) => 0,
            Some(open) => {
                let (text, rest) = self.rest.split_at(open);
                self.rest = rest;
                return Some(Piece::Text(text));
            }
            None => {
                let text = self.rest;
                self.rest = "";
                return Some(Piece::Text(text));
            }
        };

        let after = &self.rest[open + 1..];
        match after.find(['[', ']']) {
            Some(close) if after[close..].starts_with(']') => {
                self.rest = &after[close + 1..];
                Some(Piece::Tag(Directive::classify(&after[..close])))
            }
            Some(next_open) => {
                let (text, rest) = self.rest.split_at(next_open + 1);
                self.rest = rest;
                Some(Piece::Text(text))
            }
            None => {
                let text = self.rest;
                self.rest = "";
                Some(Piece::Text(text))
            }
        }
    }
}

/// Stats announced by a `[NEW_NPC:...]` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcSpawn {
    pub name: String,
    pub hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
}

impl NpcSpawn {
    /// Parse `<name>, hp=<int>, ac=<int>, attackBonus=<int>`.
    ///
    /// Exactly these four fields in this order; the numbers are unsigned.
    pub fn parse(fields: &str) -> Option<Self> {
        let mut parts = fields.split(',');
        let name = parts.next()?.trim();
        let hp = numeric_field(parts.next()?, "hp=")?;
        let ac = numeric_field(parts.next()?, "ac=")?;
        let attack_bonus = numeric_field(parts.next()?, "attackBonus=")?;

        if name.is_empty() || parts.next().is_some() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            hp,
            ac,
            attack_bonus,
        })
    }
}

fn numeric_field(raw: &str, key: &str) -> Option<i32> {
    let value = raw.trim().strip_prefix(key)?;
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Directives read from an adventure introduction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntroDirectives {
    /// The intro with all tags removed.
    pub intro: String,
    /// The first non-empty `[GOAL:...]` payload.
    pub goal: Option<String>,
}

/// Directives read from the narration of one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnDirectives {
    /// Cleaned narration shown to the player.
    pub reply: String,
    pub goal_achieved: bool,
    /// Ending text, present once the goal is achieved.
    pub final_description: Option<String>,
    /// Items found this turn, reply first then final description.
    pub new_items: Vec<String>,
    pub new_npc: Option<NpcSpawn>,
}

/// Parse an adventure introduction, pulling out its goal.
pub fn parse_intro(text: &str) -> IntroDirectives {
    let mut intro = String::with_capacity(text.len());
    let mut goal = None;

    for piece in tokenize(text) {
        match piece {
            Piece::Text(t) => intro.push_str(t),
            Piece::Tag(Directive::Goal(payload)) => {
                let payload = payload.trim();
                if goal.is_none() && !payload.is_empty() {
                    goal = Some(payload.to_string());
                }
                intro.push(' ');
            }
            Piece::Tag(other) => {
                tracing::debug!(directive = ?other, "Dropped directive from intro");
                intro.push(' ');
            }
        }
    }

    IntroDirectives {
        intro: normalize_whitespace(&intro),
        goal,
    }
}

/// Parse the narration of a turn.
///
/// With `[META_ACHIEVED]` present, the first `[FINAL_DESCRIPTION]` splits the
/// reply from the ending. Any later markers are dropped and their text stays
/// in the ending.
///
/// `active_npc_hp` is the hp of the NPC currently engaged, if any. A
/// `[NEW_NPC]` directive is only taken while nobody is engaged or the engaged
/// NPC is down.
pub fn parse_turn(text: &str, active_npc_hp: Option<i32>) -> TurnDirectives {
    let pieces: Vec<Piece<'_>> = tokenize(text).collect();

    let goal_achieved = pieces
        .iter()
        .any(|p| matches!(p, Piece::Tag(Directive::MetaAchieved)));

    let marker = if goal_achieved {
        pieces
            .iter()
            .position(|p| matches!(p, Piece::Tag(Directive::FinalDescription)))
    } else {
        None
    };
    let (reply_pieces, ending_pieces) = match marker {
        Some(at) => (&pieces[..at], Some(&pieces[at + 1..])),
        None => (&pieces[..], None),
    };

    let mut extraction = Extraction {
        npc_slot_open: active_npc_hp.map_or(true, |hp| hp <= 0),
        items: Vec::new(),
        npc: None,
    };

    let reply = extraction.consume(reply_pieces);
    let final_description = match ending_pieces {
        Some(ending) => Some(extraction.consume(ending)),
        None if goal_achieved => Some(reply.clone()),
        None => None,
    };

    TurnDirectives {
        reply,
        goal_achieved,
        final_description,
        new_items: extraction.items,
        new_npc: extraction.npc,
    }
}

/// Events gathered across the segments of one turn.
struct Extraction {
    npc_slot_open: bool,
    items: Vec<String>,
    npc: Option<NpcSpawn>,
}

impl Extraction {
    /// Collect the events of one segment and return its cleaned text.
    fn consume(&mut self, pieces: &[Piece<'_>]) -> String {
        let mut text = String::new();

        for piece in pieces {
            match *piece {
                Piece::Text(t) => {
                    text.push_str(t);
                    continue;
                }
                Piece::Tag(Directive::NewItem(name)) => {
                    let name = name.trim();
                    // Single characters are noise, not items.
                    if name.chars().count() > 1 {
                        self.items.push(name.to_string());
                    }
                }
                Piece::Tag(Directive::NewNpc(fields)) => self.offer_npc(fields),
                Piece::Tag(other) => {
                    tracing::debug!(directive = ?other, "Dropped directive from narration");
                }
            }
            text.push(' ');
        }

        normalize_whitespace(&text)
    }

    fn offer_npc(&mut self, fields: &str) {
        let Some(spawn) = NpcSpawn::parse(fields) else {
            tracing::debug!(fields, "Malformed NEW_NPC directive dropped");
            return;
        };

        if self.npc.is_some() {
            tracing::debug!(name = %spawn.name, "Extra NEW_NPC directive ignored");
        } else if !self.npc_slot_open {
            tracing::debug!(name = %spawn.name, "NEW_NPC ignored, encounter still in progress");
        } else {
            self.npc = Some(spawn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_pieces() {
        let pieces: Vec<_> = tokenize("a [SUCCESS] b [NEW_ITEM:rope]").collect();
        assert_eq!(
            pieces,
            vec![
                Piece::Text("a "),
                Piece::Tag(Directive::Noise("SUCCESS")),
                Piece::Text(" b "),
                Piece::Tag(Directive::NewItem("rope")),
            ]
        );
    }

    #[test]
    fn test_tokenize_unclosed_and_nested_brackets() {
        let pieces: Vec<_> = tokenize("odd [ bracket [NEW_ITEM:map] and [open").collect();
        assert_eq!(
            pieces,
            vec![
                Piece::Text("odd "),
                Piece::Text("[ bracket "),
                Piece::Tag(Directive::NewItem("map")),
                Piece::Text(" and "),
                Piece::Text("[open"),
            ]
        );
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let parsed = parse_turn("Found [new_item:sword] here.", None);
        assert!(parsed.new_items.is_empty());
        assert_eq!(parsed.reply, "Found here.");
    }

    #[test]
    fn test_untagged_text_is_only_normalized() {
        let parsed = parse_turn("  The door\n creaks   open. ", Some(12));
        assert_eq!(parsed.reply, "The door creaks open.");
        assert!(!parsed.goal_achieved);
        assert_eq!(parsed.final_description, None);
        assert!(parsed.new_items.is_empty());
        assert_eq!(parsed.new_npc, None);
    }

    #[test]
    fn test_intro_goal() {
        let parsed = parse_intro("You wake in a tower.\n[GOAL: Escape the tower ]\n");
        assert_eq!(parsed.intro, "You wake in a tower.");
        assert_eq!(parsed.goal.as_deref(), Some("Escape the tower"));
    }

    #[test]
    fn test_intro_without_goal() {
        let parsed = parse_intro("Mist covers the valley. [GOAL:   ]");
        assert_eq!(parsed.intro, "Mist covers the valley.");
        assert_eq!(parsed.goal, None);
    }

    #[test]
    fn test_goal_tag_is_noise_in_turns() {
        let parsed = parse_turn("Onward. [GOAL:something else]", None);
        assert_eq!(parsed.reply, "Onward.");
    }

    #[test]
    fn test_meta_achieved_without_marker() {
        let parsed = parse_turn("The curse lifts. [META_ACHIEVED] [NEW_ITEM:Crown]", None);
        assert!(parsed.goal_achieved);
        assert_eq!(parsed.reply, "The curse lifts.");
        assert_eq!(parsed.final_description.as_deref(), Some("The curse lifts."));
        assert_eq!(parsed.new_items, vec!["Crown".to_string()]);
    }

    #[test]
    fn test_meta_achieved_with_final_description() {
        let text = "[META_ACHIEVED] The dragon falls. [NEW_ITEM:Scale] \
                    [FINAL_DESCRIPTION] Songs are sung of you. [NEW_ITEM:Laurel]";
        let parsed = parse_turn(text, None);
        assert!(parsed.goal_achieved);
        assert_eq!(parsed.reply, "The dragon falls.");
        assert_eq!(
            parsed.final_description.as_deref(),
            Some("Songs are sung of you.")
        );
        assert_eq!(
            parsed.new_items,
            vec!["Scale".to_string(), "Laurel".to_string()]
        );
    }

    #[test]
    fn test_repeated_final_marker_splits_on_first() {
        let text = "The door opens. [META_ACHIEVED] [FINAL_DESCRIPTION] You step out. \
                    [FINAL_DESCRIPTION] The sun rises.";
        let parsed = parse_turn(text, None);
        assert_eq!(parsed.reply, "The door opens.");
        assert_eq!(
            parsed.final_description.as_deref(),
            Some("You step out. The sun rises.")
        );
    }

    #[test]
    fn test_final_marker_without_achievement_is_noise() {
        let parsed = parse_turn("Not yet. [FINAL_DESCRIPTION] Later.", None);
        assert!(!parsed.goal_achieved);
        assert_eq!(parsed.reply, "Not yet. Later.");
        assert_eq!(parsed.final_description, None);
    }

    #[test]
    fn test_new_items_in_order_with_noise_filter() {
        let text = "[NEW_ITEM: Rope ] You loot. [NEW_ITEM:x] [NEW_ITEM:  ] [NEW_ITEM:Torch]";
        let parsed = parse_turn(text, None);
        assert_eq!(parsed.new_items, vec!["Rope".to_string(), "Torch".to_string()]);
        assert_eq!(parsed.reply, "You loot.");
        assert!(!parsed.reply.contains("NEW_ITEM"));
    }

    #[test]
    fn test_noise_tags_stripped() {
        let parsed = parse_turn("[ACTION] You swing. [DAMAGE:4] [FAILURE] Miss!", None);
        assert_eq!(parsed.reply, "You swing. Miss!");
    }

    #[test]
    fn test_new_npc_accepted_without_active_npc() {
        let parsed = parse_turn(
            "A shape looms. [NEW_NPC:Cave Troll, hp=40, ac=14, attackBonus=5]",
            None,
        );
        assert_eq!(
            parsed.new_npc,
            Some(NpcSpawn {
                name: "Cave Troll".to_string(),
                hp: 40,
                ac: 14,
                attack_bonus: 5,
            })
        );
        assert_eq!(parsed.reply, "A shape looms.");
    }

    #[test]
    fn test_new_npc_respects_live_encounter() {
        let text = "Another foe! [NEW_NPC:Bandit, hp=12, ac=11, attackBonus=1]";

        let alive = parse_turn(text, Some(5));
        assert_eq!(alive.new_npc, None);
        assert_eq!(alive.reply, "Another foe!");

        let down = parse_turn(text, Some(0));
        assert_eq!(down.new_npc.map(|n| n.name), Some("Bandit".to_string()));
    }

    #[test]
    fn test_new_npc_requires_exact_fields() {
        assert!(NpcSpawn::parse("Orc, hp=10, ac=12").is_none());
        assert!(NpcSpawn::parse("Orc, ac=12, hp=10, attackBonus=1").is_none());
        assert!(NpcSpawn::parse("Orc, hp=-3, ac=12, attackBonus=1").is_none());
        assert!(NpcSpawn::parse(", hp=3, ac=12, attackBonus=1").is_none());
        assert!(NpcSpawn::parse("Orc, hp=3, ac=12, attackBonus=1, x=2").is_none());
        assert!(NpcSpawn::parse("Orc, hp=3, ac=12, attackBonus=1").is_some());

        let parsed = parse_turn("Hm. [NEW_NPC:Orc, hp=ten, ac=12, attackBonus=1]", None);
        assert_eq!(parsed.new_npc, None);
        assert_eq!(parsed.reply, "Hm.");
    }

    #[test]
    fn test_first_new_npc_wins() {
        let parsed = parse_turn(
            "[NEW_NPC:Imp, hp=10, ac=10, attackBonus=0] [NEW_NPC:Ogre, hp=50, ac=13, attackBonus=4]",
            None,
        );
        assert_eq!(parsed.new_npc.map(|n| n.name), Some("Imp".to_string()));
    }
}
