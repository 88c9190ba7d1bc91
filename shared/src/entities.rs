//! Shared entity definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value every attribute falls back to when an entity never set it
pub const DEFAULT_ATTRIBUTE_VALUE: i32 = 10;

/// Character attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Constitution,
    Agility,
    Speed,
    Intelligence,
    Perception,
    Charisma,
    Wisdom,
    Luck,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Strength,
        Attribute::Constitution,
        Attribute::Agility,
        Attribute::Speed,
        Attribute::Intelligence,
        Attribute::Perception,
        Attribute::Charisma,
        Attribute::Wisdom,
        Attribute::Luck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Strength => "Strength",
            Self::Constitution => "Constitution",
            Self::Agility => "Agility",
            Self::Speed => "Speed",
            Self::Intelligence => "Intelligence",
            Self::Perception => "Perception",
            Self::Charisma => "Charisma",
            Self::Wisdom => "Wisdom",
            Self::Luck => "Luck",
        }
    }
}

/// Attribute set. Every attribute has a value; unset ones read as the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    values: BTreeMap<Attribute, i32>,
}

impl Attributes {
    /// All attributes at the default value
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attribute set to `value`
    pub fn uniform(value: i32) -> Self {
        let mut attrs = Self::new();
        for attr in Attribute::ALL {
            attrs.set(attr, value);
        }
        attrs
    }

    pub fn get(&self, attr: Attribute) -> i32 {
        self.values.get(&attr).copied().unwrap_or(DEFAULT_ATTRIBUTE_VALUE)
    }

    pub fn set(&mut self, attr: Attribute, value: i32) {
        self.values.insert(attr, value);
    }

    /// Builder-style setter
    pub fn with(mut self, attr: Attribute, value: i32) -> Self {
        self.set(attr, value);
        self
    }

    /// Add `delta` to an attribute (starting from its current value)
    pub fn adjust(&mut self, attr: Attribute, delta: i32) {
        let current = self.get(attr);
        self.set(attr, current + delta);
    }
}

/// Player race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Draconian,
    Synth,
}

impl Race {
    pub const ALL: [Race; 3] = [Race::Human, Race::Draconian, Race::Synth];

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Race> {
        Self::ALL.into_iter().find(|race| race.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Draconian => "Draconian",
            Self::Synth => "Synth",
        }
    }

    /// Apply racial modifiers on top of the base attributes
    pub fn apply_bonuses(&self, attrs: &mut Attributes) {
        match self {
            // +1 to everything
            Self::Human => {
                for attr in Attribute::ALL {
                    attrs.adjust(attr, 1);
                }
            }
            Self::Draconian => {
                attrs.adjust(Attribute::Strength, 2);
                attrs.adjust(Attribute::Constitution, 2);
                attrs.adjust(Attribute::Agility, -1);
            }
            Self::Synth => {
                attrs.adjust(Attribute::Intelligence, 2);
                attrs.adjust(Attribute::Speed, 2);
                attrs.adjust(Attribute::Charisma, -1);
            }
        }
    }
}

/// Character class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterClass {
    Soldier,
    Hacker,
    Medic,
    Smuggler,
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 4] = [
        CharacterClass::Soldier,
        CharacterClass::Hacker,
        CharacterClass::Medic,
        CharacterClass::Smuggler,
    ];

    pub fn from_name(name: &str) -> Option<CharacterClass> {
        Self::ALL.into_iter().find(|class| class.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Soldier => "Soldier",
            Self::Hacker => "Hacker",
            Self::Medic => "Medic",
            Self::Smuggler => "Smuggler",
        }
    }

    /// Apply class modifiers on top of the base attributes
    pub fn apply_bonuses(&self, attrs: &mut Attributes) {
        match self {
            Self::Soldier => {
                attrs.adjust(Attribute::Strength, 2);
                attrs.adjust(Attribute::Constitution, 2);
            }
            Self::Hacker => {
                attrs.adjust(Attribute::Intelligence, 2);
                attrs.adjust(Attribute::Perception, 2);
            }
            // No bonuses yet
            Self::Medic | Self::Smuggler => {}
        }
    }
}

/// Exit direction between rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub fn opposite(&self) -> Direction {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    pub fn short_command(&self) -> &'static str {
        match self {
            Self::North => "n",
            Self::South => "s",
            Self::East => "e",
            Self::West => "w",
            Self::Up => "u",
            Self::Down => "d",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Parse either the short command ("n") or the full name ("north")
    pub fn from_command(command: &str) -> Option<Direction> {
        Self::ALL.into_iter().find(|dir| {
            dir.short_command().eq_ignore_ascii_case(command) || dir.name().eq_ignore_ascii_case(command)
        })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_attributes_default() {
        let attrs = Attributes::new().with(Attribute::Strength, 20);
        assert_eq!(attrs.get(Attribute::Strength), 20);
        assert_eq!(attrs.get(Attribute::Luck), DEFAULT_ATTRIBUTE_VALUE);
    }

    #[test]
    fn test_racial_and_class_bonuses() {
        let mut attrs = Attributes::uniform(10);
        Race::Draconian.apply_bonuses(&mut attrs);
        CharacterClass::Soldier.apply_bonuses(&mut attrs);
        assert_eq!(attrs.get(Attribute::Strength), 14);
        assert_eq!(attrs.get(Attribute::Constitution), 14);
        assert_eq!(attrs.get(Attribute::Agility), 9);
        assert_eq!(attrs.get(Attribute::Speed), 10);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_command("n"), Some(Direction::North));
        assert_eq!(Direction::from_command("WEST"), Some(Direction::West));
        assert_eq!(Direction::from_command("sideways"), None);
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn test_race_and_class_names() {
        assert_eq!(Race::from_name("synth"), Some(Race::Synth));
        assert_eq!(CharacterClass::from_name("SMUGGLER"), Some(CharacterClass::Smuggler));
        assert_eq!(CharacterClass::from_name("wizard"), None);
    }
}
