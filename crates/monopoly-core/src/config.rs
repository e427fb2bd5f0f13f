//! Rule constants for a game session.

use crate::ledger::{Money, DEFAULT_BANK_RESERVE};
use crate::property::DEFAULT_REDEEM_INTEREST;
use serde::{Deserialize, Serialize};

/// Tunable game rules. Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Money each player starts with
    pub starting_balance: Money,
    /// Paid when passing or landing on the start cell
    pub salary: Money,
    /// Turns spent in jail before automatic release
    pub jail_turns: u8,
    /// Consecutive doubles that send a player to jail
    pub doubles_limit: u8,
    /// Percent added to the mortgage value when redeeming
    pub redeem_interest: u32,
    /// Auction declined purchases
    pub auctions_enabled: bool,
    /// Let the player who declined a purchase bid in its auction
    pub auction_includes_decliner: bool,
    /// Initial bank reserve
    pub bank_reserve: u64,
    /// Counter-offers exchanged before a negotiation is dropped
    pub max_trade_rounds: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1500,
            salary: 200,
            jail_turns: 3,
            doubles_limit: 3,
            redeem_interest: DEFAULT_REDEEM_INTEREST,
            auctions_enabled: true,
            auction_includes_decliner: false,
            bank_reserve: DEFAULT_BANK_RESERVE,
            max_trade_rounds: 3,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON; absent fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
