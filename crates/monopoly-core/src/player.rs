//! Player state.
//!
//! Balances are held by the [`Ledger`](crate::ledger::Ledger) and ownership by
//! the [`PropertyRegistry`](crate::property::PropertyRegistry); a player only
//! tracks where it stands and whether it is jailed or out of the game.

use crate::board::{PlayerId, Position};
use serde::{Deserialize, Serialize};

/// A participant in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub in_jail: bool,
    pub jail_turns_remaining: u8,
    /// Terminal; never cleared once set
    bankrupt: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            position: 0,
            in_jail: false,
            jail_turns_remaining: 0,
            bankrupt: false,
        }
    }

    pub fn is_bankrupt(&self) -> bool {
        self.bankrupt
    }

    /// Still in the turn rotation
    pub fn is_active(&self) -> bool {
        !self.bankrupt
    }

    /// Relocate to the jail cell for `turns` turns
    pub fn send_to_jail(&mut self, jail: Position, turns: u8) {
        self.position = jail;
        self.in_jail = true;
        self.jail_turns_remaining = turns;
    }

    /// Count down one jailed turn. Returns true if the player was released.
    pub fn serve_jail_turn(&mut self) -> bool {
        self.jail_turns_remaining = self.jail_turns_remaining.saturating_sub(1);
        if self.jail_turns_remaining == 0 {
            self.in_jail = false;
            true
        } else {
            false
        }
    }

    /// Leave the game for good
    pub(crate) fn declare_bankrupt(&mut self) {
        self.bankrupt = true;
        self.in_jail = false;
        self.jail_turns_remaining = 0;
    }
}
