//! Dice rolling for combat resolution.
//!
//! Damage dice use the short `[count]d<sides>` notation (`d6`, `2d8`). Only the
//! leading `[count]d<sides>` part of a spec is read, so `2d6+3` rolls `2d6`.
//! Anything that does not start that way deals no damage instead of failing.
//! Oversized counts and sides are read as the largest value that fits.
//!
//! All randomness is drawn through [`DiceRoller`], so tests can load the dice.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Most dice rolled for a single damage spec. Larger counts roll this many.
pub const MAX_DICE: u32 = 100;

/// Error type for damage dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice spec: {0:?}")]
    InvalidSpec(String),
}

/// A source of die results.
pub trait DiceRoller {
    /// Roll a single die, returning a value in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;

    /// Roll a d20.
    fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }
}

/// A [`DiceRoller`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R>(pub R);

impl RngRoller<rand::rngs::ThreadRng> {
    /// Roll with the thread-local generator.
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

impl<R: Rng> DiceRoller for RngRoller<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.0.gen_range(1..=sides)
    }
}

/// A parsed damage dice spec such as `2d6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageDice {
    pub count: u32,
    pub sides: u32,
}

impl DamageDice {
    pub fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Parse the leading `[count]d<sides>` of a spec. The count defaults to 1.
    pub fn parse(spec: &str) -> Result<Self, DiceError> {
        let spec = spec.trim().to_lowercase();
        let invalid = || DiceError::InvalidSpec(spec.clone());

        let d_pos = spec.find('d').ok_or_else(invalid)?;
        let count_str = &spec[..d_pos];
        if !count_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        // Digits only, so parsing can only fail on overflow.
        let count = if count_str.is_empty() {
            1
        } else {
            count_str.parse().unwrap_or(u32::MAX)
        };

        let rest = &spec[d_pos + 1..];
        let sides_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let sides_str = &rest[..sides_end];
        if sides_str.is_empty() {
            return Err(invalid());
        }
        let sides = sides_str.parse().unwrap_or(u32::MAX);
        if sides == 0 {
            return Err(invalid());
        }

        Ok(Self { count, sides })
    }

    /// Roll the dice in the spec, at most [`MAX_DICE`] of them.
    ///
    /// The total saturates at `i32::MAX`.
    pub fn roll<D: DiceRoller + ?Sized>(&self, dice: &mut D) -> DamageRoll {
        let rolls: Vec<u32> = (0..self.count.min(MAX_DICE))
            .map(|_| dice.roll_die(self.sides))
            .collect();
        let sum: u64 = rolls.iter().map(|&r| u64::from(r)).sum();
        let total = i32::try_from(sum).unwrap_or(i32::MAX);
        DamageRoll { rolls, total }
    }
}

impl FromStr for DamageDice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DamageDice::parse(s)
    }
}

impl fmt::Display for DamageDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "d{}", self.sides)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// The dice rolled for one damage spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub rolls: Vec<u32>,
    pub total: i32,
}

/// Roll damage from a spec string. An unreadable spec deals 0 damage.
pub fn roll_damage<D: DiceRoller + ?Sized>(spec: &str, dice: &mut D) -> i32 {
    match DamageDice::parse(spec) {
        Ok(parsed) => parsed.roll(dice).total,
        Err(e) => {
            tracing::debug!(spec, error = %e, "Unreadable damage dice, dealing no damage");
            0
        }
    }
}

/// A d20 attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// The face shown on the die.
    pub natural: u32,
    pub modifier: i32,
    pub total: i32,
}

impl D20Roll {
    /// Natural 20.
    pub fn is_critical(&self) -> bool {
        self.natural == 20
    }

    /// Natural 1.
    pub fn is_fumble(&self) -> bool {
        self.natural == 1
    }

    /// Whether the roll lands against the given armor class.
    ///
    /// A natural 1 always misses and a natural 20 always hits.
    pub fn hits(&self, armor_class: i32) -> bool {
        !self.is_fumble() && (self.is_critical() || self.total >= armor_class)
    }

    /// Damage multiplier for this roll (criticals double damage).
    pub fn damage_multiplier(&self) -> i32 {
        if self.is_critical() {
            2
        } else {
            1
        }
    }
}

/// Roll a d20 and add a modifier. The total saturates instead of overflowing.
pub fn roll_d20<D: DiceRoller + ?Sized>(dice: &mut D, modifier: i32) -> D20Roll {
    let natural = dice.d20();
    D20Roll {
        natural,
        modifier,
        total: i32::try_from(natural)
            .unwrap_or(i32::MAX)
            .saturating_add(modifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LoadedDice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        assert_eq!(DamageDice::parse("2d6").unwrap(), DamageDice::new(2, 6));
        assert_eq!(DamageDice::parse("d10").unwrap(), DamageDice::new(1, 10));
        assert_eq!(DamageDice::parse(" D8 ").unwrap(), DamageDice::new(1, 8));
    }

    #[test]
    fn test_parse_reads_leading_spec_only() {
        assert_eq!(DamageDice::parse("2d6+3").unwrap(), DamageDice::new(2, 6));
        assert_eq!(DamageDice::parse("1d4 fire").unwrap(), DamageDice::new(1, 4));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DamageDice::parse("").is_err());
        assert!(DamageDice::parse("sword").is_err());
        assert!(DamageDice::parse("d").is_err());
        assert!(DamageDice::parse("d0").is_err());
        assert!(DamageDice::parse("x2d6").is_err());
        assert!(DamageDice::parse("6").is_err());
        assert!(DamageDice::parse("2d").is_err());
    }

    #[test]
    fn test_large_counts_are_valid() {
        assert_eq!(DamageDice::parse("101d6").unwrap(), DamageDice::new(101, 6));
        assert_eq!(
            DamageDice::parse("99999999999d6").unwrap(),
            DamageDice::new(u32::MAX, 6)
        );

        let mut dice = RngRoller(StdRng::seed_from_u64(3));
        let roll = DamageDice::parse("101d6").unwrap().roll(&mut dice);
        assert_eq!(roll.rolls.len(), MAX_DICE as usize);
        assert!(roll.total >= MAX_DICE as i32);
        assert!(roll_damage("101d6", &mut dice) > 0);
    }

    #[test]
    fn test_huge_sides_saturate() {
        let mut dice = RngRoller(StdRng::seed_from_u64(11));
        for _ in 0..10 {
            assert!(roll_damage("100d2147483647", &mut dice) > 0);
        }

        let mut loaded = LoadedDice::new([3_000_000_000]);
        assert_eq!(roll_damage("d4000000000", &mut loaded), i32::MAX);

        let sides = DamageDice::parse("d99999999999").unwrap().sides;
        assert_eq!(sides, u32::MAX);
    }

    #[test]
    fn test_d20_total_saturates() {
        let mut dice = LoadedDice::new([20, 1]);
        assert_eq!(roll_d20(&mut dice, i32::MAX).total, i32::MAX);
        assert_eq!(roll_d20(&mut dice, i32::MIN).total, i32::MIN + 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(DamageDice::new(1, 6).to_string(), "d6");
        assert_eq!(DamageDice::new(3, 8).to_string(), "3d8");
    }

    #[test]
    fn test_roll_range() {
        let mut dice = RngRoller(StdRng::seed_from_u64(7));
        for _ in 0..100 {
            let total = roll_damage("2d6", &mut dice);
            assert!((2..=12).contains(&total));
        }
    }

    #[test]
    fn test_invalid_spec_deals_no_damage() {
        let mut dice = RngRoller(StdRng::seed_from_u64(7));
        assert_eq!(roll_damage("a lot", &mut dice), 0);
        assert_eq!(roll_damage("d0", &mut dice), 0);
    }

    #[test]
    fn test_d20_range() {
        let mut dice = RngRoller(StdRng::seed_from_u64(42));
        for _ in 0..100 {
            let roll = roll_d20(&mut dice, 3);
            assert!((1..=20).contains(&roll.natural));
            assert_eq!(roll.total, roll.natural as i32 + 3);
        }
    }

    #[test]
    fn test_natural_rolls_override_armor() {
        let fumble = D20Roll { natural: 1, modifier: 50, total: 51 };
        assert!(!fumble.hits(10));

        let crit = D20Roll { natural: 20, modifier: -30, total: -10 };
        assert!(crit.hits(25));
        assert_eq!(crit.damage_multiplier(), 2);

        let plain = D20Roll { natural: 12, modifier: 2, total: 14 };
        assert!(plain.hits(14));
        assert!(!plain.hits(15));
        assert_eq!(plain.damage_multiplier(), 1);
    }
}
