//! Board layout: cells, color groups and cyclic movement.
//!
//! This module contains:
//! - Player, position and property identifiers
//! - Color groups used for monopoly checks
//! - Cell kinds and the immutable board
//! - `BoardConfig`, the serializable layout the board is built from

use crate::ledger::Money;
use crate::property::{Property, PropertyRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Player identifier (index into the session roster)
pub type PlayerId = u8;

/// Index of a cell on the board
pub type Position = usize;

/// Index of a property in the registry
pub type PropertyId = usize;

/// Color group a property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
    /// Ownable, never buildable
    Railroad,
    /// Ownable, never buildable
    Utility,
}

impl ColorGroup {
    /// All color groups
    pub const ALL: [ColorGroup; 10] = [
        ColorGroup::Brown,
        ColorGroup::LightBlue,
        ColorGroup::Pink,
        ColorGroup::Orange,
        ColorGroup::Red,
        ColorGroup::Yellow,
        ColorGroup::Green,
        ColorGroup::DarkBlue,
        ColorGroup::Railroad,
        ColorGroup::Utility,
    ];

    /// Whether houses and hotels may be placed on this group
    pub fn is_buildable(&self) -> bool {
        !matches!(self, ColorGroup::Railroad | ColorGroup::Utility)
    }
}

/// What happens when a player lands on a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// Start cell; passing it pays salary
    Start,
    /// No effect (free parking, card cells)
    Ordinary,
    /// Ownable property
    Property(PropertyId),
    /// Flat payment to the bank
    Tax { amount: Money },
    /// Jail, or just visiting
    Jail,
    /// Sends the player to jail
    GoToJail,
}

/// A single cell on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub kind: CellKind,
}

/// Layout entry for a purchasable property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub price: Money,
    pub group: ColorGroup,
    /// Rent indexed by build level (0 = bare, 5 = hotel)
    pub rent: [Money; 6],
    pub house_cost: Money,
}

impl PropertySpec {
    pub fn new(
        name: impl Into<String>,
        price: Money,
        group: ColorGroup,
        rent: [Money; 6],
        house_cost: Money,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            group,
            rent,
            house_cost,
        }
    }

    /// A property whose rent never changes (railroads, utilities)
    pub fn flat(name: impl Into<String>, price: Money, group: ColorGroup, rent: Money) -> Self {
        Self::new(name, price, group, [rent; 6], 0)
    }
}

/// Layout entry for a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellSpec {
    Start { name: String },
    Ordinary { name: String },
    Property(PropertySpec),
    Tax { name: String, amount: Money },
    Jail { name: String },
    GoToJail { name: String },
}

impl CellSpec {
    pub fn start() -> Self {
        CellSpec::Start { name: "Go".into() }
    }

    pub fn ordinary(name: impl Into<String>) -> Self {
        CellSpec::Ordinary { name: name.into() }
    }

    pub fn tax(name: impl Into<String>, amount: Money) -> Self {
        CellSpec::Tax {
            name: name.into(),
            amount,
        }
    }

    pub fn jail() -> Self {
        CellSpec::Jail { name: "Jail".into() }
    }

    pub fn go_to_jail() -> Self {
        CellSpec::GoToJail {
            name: "Go To Jail".into(),
        }
    }
}

/// Errors detected while building a board from its layout
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("Board has no cells")]
    Empty,

    #[error("First cell must be the start cell")]
    StartNotFirst,

    #[error("Board must have exactly one start cell, found {0}")]
    StartCount(usize),

    #[error("Board must have exactly one jail cell, found {0}")]
    JailCount(usize),

    #[error("Rent schedule of {0} decreases with build level")]
    DecreasingRent(String),

    #[error("Invalid board layout: {0}")]
    Parse(String),
}

/// Serializable board layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub cells: Vec<CellSpec>,
}

impl BoardConfig {
    pub fn new(cells: Vec<CellSpec>) -> Self {
        Self { cells }
    }

    /// Parse a layout from JSON
    pub fn from_json(json: &str) -> Result<Self, BoardError> {
        serde_json::from_str(json).map_err(|e| BoardError::Parse(e.to_string()))
    }

    /// Validate the layout and build the board together with its property registry
    pub fn build(&self) -> Result<(Board, PropertyRegistry), BoardError> {
        if self.cells.is_empty() {
            return Err(BoardError::Empty);
        }
        if !matches!(self.cells[0], CellSpec::Start { .. }) {
            return Err(BoardError::StartNotFirst);
        }

        let starts = self
            .cells
            .iter()
            .filter(|c| matches!(c, CellSpec::Start { .. }))
            .count();
        if starts != 1 {
            return Err(BoardError::StartCount(starts));
        }

        let jails: Vec<Position> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, CellSpec::Jail { .. }))
            .map(|(i, _)| i)
            .collect();
        if jails.len() != 1 {
            return Err(BoardError::JailCount(jails.len()));
        }

        let mut cells = Vec::with_capacity(self.cells.len());
        let mut properties = Vec::new();
        let mut groups: HashMap<ColorGroup, Vec<PropertyId>> = HashMap::new();

        for (position, spec) in self.cells.iter().enumerate() {
            let cell = match spec {
                CellSpec::Start { name } => Cell {
                    name: name.clone(),
                    kind: CellKind::Start,
                },
                CellSpec::Ordinary { name } => Cell {
                    name: name.clone(),
                    kind: CellKind::Ordinary,
                },
                CellSpec::Tax { name, amount } => Cell {
                    name: name.clone(),
                    kind: CellKind::Tax { amount: *amount },
                },
                CellSpec::Jail { name } => Cell {
                    name: name.clone(),
                    kind: CellKind::Jail,
                },
                CellSpec::GoToJail { name } => Cell {
                    name: name.clone(),
                    kind: CellKind::GoToJail,
                },
                CellSpec::Property(prop) => {
                    if prop.rent.windows(2).any(|w| w[0] > w[1]) {
                        return Err(BoardError::DecreasingRent(prop.name.clone()));
                    }
                    let id = properties.len();
                    properties.push(Property::from_spec(id, position, prop));
                    groups.entry(prop.group).or_default().push(id);
                    Cell {
                        name: prop.name.clone(),
                        kind: CellKind::Property(id),
                    }
                }
            };
            cells.push(cell);
        }

        let board = Board {
            cells,
            jail_position: jails[0],
            groups,
        };
        Ok((board, PropertyRegistry::new(properties)))
    }

    /// The classic 40-cell layout
    pub fn standard() -> Self {
        use ColorGroup::*;

        let street = |name: &str, price, group, rent, house| {
            CellSpec::Property(PropertySpec::new(name, price, group, rent, house))
        };
        let railroad =
            |name: &str| CellSpec::Property(PropertySpec::flat(name, 200, Railroad, 25));
        let utility = |name: &str| CellSpec::Property(PropertySpec::flat(name, 150, Utility, 20));

        Self::new(vec![
            CellSpec::start(),
            street("Mediterranean Avenue", 60, Brown, [2, 10, 30, 90, 160, 250], 50),
            CellSpec::ordinary("Community Chest"),
            street("Baltic Avenue", 60, Brown, [4, 20, 60, 180, 320, 450], 50),
            CellSpec::tax("Income Tax", 200),
            railroad("Reading Railroad"),
            street("Oriental Avenue", 100, LightBlue, [6, 30, 90, 270, 400, 550], 50),
            CellSpec::ordinary("Chance"),
            street("Vermont Avenue", 100, LightBlue, [6, 30, 90, 270, 400, 550], 50),
            street("Connecticut Avenue", 120, LightBlue, [8, 40, 100, 300, 450, 600], 50),
            CellSpec::jail(),
            street("St. Charles Place", 140, Pink, [10, 50, 150, 450, 625, 750], 100),
            utility("Electric Company"),
            street("States Avenue", 140, Pink, [10, 50, 150, 450, 625, 750], 100),
            street("Virginia Avenue", 160, Pink, [12, 60, 180, 500, 700, 900], 100),
            railroad("Pennsylvania Railroad"),
            street("St. James Place", 180, Orange, [14, 70, 200, 550, 750, 950], 100),
            CellSpec::ordinary("Community Chest"),
            street("Tennessee Avenue", 180, Orange, [14, 70, 200, 550, 750, 950], 100),
            street("New York Avenue", 200, Orange, [16, 80, 220, 600, 800, 1000], 100),
            CellSpec::ordinary("Free Parking"),
            street("Kentucky Avenue", 220, Red, [18, 90, 250, 700, 875, 1050], 150),
            CellSpec::ordinary("Chance"),
            street("Indiana Avenue", 220, Red, [18, 90, 250, 700, 875, 1050], 150),
            street("Illinois Avenue", 240, Red, [20, 100, 300, 750, 925, 1100], 150),
            railroad("B&O Railroad"),
            street("Atlantic Avenue", 260, Yellow, [22, 110, 330, 800, 975, 1150], 150),
            street("Ventnor Avenue", 260, Yellow, [22, 110, 330, 800, 975, 1150], 150),
            utility("Water Works"),
            street("Marvin Gardens", 280, Yellow, [24, 120, 360, 850, 1025, 1200], 150),
            CellSpec::go_to_jail(),
            street("Pacific Avenue", 300, Green, [26, 130, 390, 900, 1100, 1275], 200),
            street("North Carolina Avenue", 300, Green, [26, 130, 390, 900, 1100, 1275], 200),
            CellSpec::ordinary("Community Chest"),
            street("Pennsylvania Avenue", 320, Green, [28, 150, 450, 1000, 1200, 1400], 200),
            railroad("Short Line"),
            CellSpec::ordinary("Chance"),
            street("Park Place", 350, DarkBlue, [35, 175, 500, 1100, 1300, 1500], 200),
            CellSpec::tax("Luxury Tax", 100),
            street("Boardwalk", 400, DarkBlue, [50, 200, 600, 1400, 1700, 2000], 200),
        ])
    }
}

/// The immutable, cyclic game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Cell>,
    jail_position: Position,
    groups: HashMap<ColorGroup, Vec<PropertyId>>,
}

impl Board {
    /// Number of cells
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// All cells in board order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at a position (wraps around)
    pub fn cell_at(&self, position: Position) -> &Cell {
        &self.cells[position % self.cells.len()]
    }

    /// Position reached after moving `steps` cells forward
    pub fn advance(&self, current: Position, steps: usize) -> Position {
        (current + steps) % self.cells.len()
    }

    /// Whether moving `steps` from `current` reaches or passes the start cell
    pub fn passes_start(&self, current: Position, steps: usize) -> bool {
        current + steps >= self.cells.len()
    }

    /// Where jailed players are kept
    pub fn jail_position(&self) -> Position {
        self.jail_position
    }

    /// Properties belonging to a color group (empty if the group is not on the board)
    pub fn group_members(&self, group: ColorGroup) -> &[PropertyId] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of the cell holding a property
    pub fn position_of(&self, property: PropertyId) -> Option<Position> {
        self.cells
            .iter()
            .position(|c| c.kind == CellKind::Property(property))
    }
}
