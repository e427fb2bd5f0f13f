//! Money movement between players and the bank.
//!
//! The ledger owns every player balance; nothing else in the crate can change
//! one. Each successful operation appends an entry to an append-only log.
//!
//! Either endpoint of a transfer may be [`Account::Bank`]. The bank creates
//! money for salaries and mortgages and absorbs it for purchases, taxes and
//! building costs, so total player money is not conserved across the game.

use crate::board::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Amount of money
pub type Money = u32;

/// Initial bank reserve
pub const DEFAULT_BANK_RESERVE: u64 = 1_000_000;

/// One side of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Account {
    Bank,
    Player(PlayerId),
}

/// Errors from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("Player {player} needs {needed} but has {available}")]
    InsufficientFunds {
        player: PlayerId,
        needed: Money,
        available: Money,
    },

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {player} cannot hold {amount} more")]
    Overflow { player: PlayerId, amount: Money },
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Account,
    pub to: Account,
    pub amount: Money,
    pub reason: String,
}

/// The bank and all player accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    balances: Vec<Money>,
    reserve: u64,
    log: Vec<Transaction>,
}

impl Ledger {
    /// Open one account per player, each funded with `starting_balance`
    pub fn new(player_count: usize, starting_balance: Money, reserve: u64) -> Self {
        Self {
            balances: vec![starting_balance; player_count],
            reserve,
            log: Vec::new(),
        }
    }

    /// Current balance of a player (0 for unknown players)
    pub fn balance(&self, player: PlayerId) -> Money {
        self.balances.get(player as usize).copied().unwrap_or(0)
    }

    /// Whether a player holds at least `amount`
    pub fn can_afford(&self, player: PlayerId, amount: Money) -> bool {
        self.balance(player) >= amount
    }

    /// Remaining bank reserve (saturates at zero; the bank never refuses to pay)
    pub fn reserve(&self) -> u64 {
        self.reserve
    }

    /// Total money held by players
    pub fn total_player_money(&self) -> u64 {
        self.balances.iter().map(|&b| b as u64).sum()
    }

    /// The append-only transaction log
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Take money from a player and give it to the bank
    pub fn debit(
        &mut self,
        player: PlayerId,
        amount: Money,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        self.transfer(Account::Player(player), Account::Bank, amount, reason)
    }

    /// Give a player money from the bank
    pub fn credit(
        &mut self,
        player: PlayerId,
        amount: Money,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        self.transfer(Account::Bank, Account::Player(player), amount, reason)
    }

    /// Move money between two accounts; no partial effect on failure
    pub fn transfer(
        &mut self,
        from: Account,
        to: Account,
        amount: Money,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        // Validate both endpoints before touching anything
        if let Account::Player(p) = to {
            let held = *self.slot(p)?;
            if from != to && held.checked_add(amount).is_none() {
                return Err(LedgerError::Overflow { player: p, amount });
            }
        }
        if let Account::Player(p) = from {
            let available = *self.slot(p)?;
            if available < amount {
                return Err(LedgerError::InsufficientFunds {
                    player: p,
                    needed: amount,
                    available,
                });
            }
        }

        match from {
            Account::Player(p) => *self.slot(p)? -= amount,
            Account::Bank => self.reserve = self.reserve.saturating_sub(amount as u64),
        }
        match to {
            Account::Player(p) => *self.slot(p)? += amount,
            Account::Bank => self.reserve = self.reserve.saturating_add(amount as u64),
        }

        let entry = Transaction {
            from,
            to,
            amount,
            reason: reason.to_string(),
        };
        debug!(?from, ?to, amount, reason, "ledger transfer");
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Move a player's entire balance to the bank
    pub fn liquidate(&mut self, player: PlayerId, reason: &str) -> Result<Transaction, LedgerError> {
        let amount = self.balance(player);
        self.debit(player, amount, reason)
    }

    fn slot(&mut self, player: PlayerId) -> Result<&mut Money, LedgerError> {
        self.balances
            .get_mut(player as usize)
            .ok_or(LedgerError::UnknownPlayer(player))
    }
}
