//! Event observers: a log renderer and per-player statistics.

use monopoly_core::{EventSink, GameEvent, PlayerId};
use serde::Serialize;
use tracing::{debug, info};

/// Writes every game event to the log.
///
/// Routine steps go out at debug level; ownership changes, bankruptcies and
/// the end of the game at info.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    /// Game number, for telling interleaved games apart
    pub game: u32,
}

impl TracingSink {
    pub fn new(game: u32) -> Self {
        Self { game }
    }
}

impl EventSink for TracingSink {
    fn on_event(&mut self, event: &GameEvent) {
        let game = self.game;
        match event {
            GameEvent::TurnStarted { player, turn } => {
                debug!("[game {}] turn {} for player {}", game, turn, player)
            }
            GameEvent::DiceRolled { player, roll } => {
                debug!("[game {}] player {} rolled {}+{}", game, player, roll.0, roll.1)
            }
            GameEvent::PlayerMoved { player, from, to, .. } => {
                debug!("[game {}] player {} moved {} -> {}", game, player, from, to)
            }
            GameEvent::PropertyPurchased {
                player,
                property,
                price,
            } => info!(
                "[game {}] player {} bought property {} for {}",
                game, player, property, price
            ),
            GameEvent::AuctionWon {
                player,
                property,
                amount,
            } => info!(
                "[game {}] player {} won property {} at auction for {}",
                game, player, property, amount
            ),
            GameEvent::RentPaid {
                payer,
                owner,
                amount,
                ..
            } => debug!("[game {}] player {} paid {} rent to {}", game, payer, amount, owner),
            GameEvent::PlayerJailed { player, reason } => {
                debug!("[game {}] player {} jailed ({:?})", game, player, reason)
            }
            GameEvent::TradeCompleted { id, offer } => info!(
                "[game {}] trade {} completed between {} and {}",
                game, id, offer.from, offer.to
            ),
            GameEvent::PlayerBankrupt { player, owed, .. } => {
                info!("[game {}] player {} bankrupt owing {}", game, player, owed)
            }
            GameEvent::GameWon { player } => info!("[game {}] player {} wins", game, player),
            other => debug!("[game {}] {:?}", game, other),
        }
    }
}

/// What one seat did over one or more games
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub purchases: u32,
    pub auctions_won: u32,
    pub money_spent_on_property: u64,
    pub rent_paid: u64,
    pub rent_received: u64,
    pub taxes_paid: u64,
    pub jail_visits: u32,
    pub buildings_built: u32,
    pub mortgages: u32,
    pub trades: u32,
    pub bankruptcies: u32,
    pub wins: u32,
}

impl PlayerStats {
    fn merge(&mut self, other: &PlayerStats) {
        self.purchases += other.purchases;
        self.auctions_won += other.auctions_won;
        self.money_spent_on_property += other.money_spent_on_property;
        self.rent_paid += other.rent_paid;
        self.rent_received += other.rent_received;
        self.taxes_paid += other.taxes_paid;
        self.jail_visits += other.jail_visits;
        self.buildings_built += other.buildings_built;
        self.mortgages += other.mortgages;
        self.trades += other.trades;
        self.bankruptcies += other.bankruptcies;
        self.wins += other.wins;
    }
}

/// Per-seat statistics folded from game events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub players: Vec<PlayerStats>,
    pub turns: u64,
}

impl Statistics {
    pub fn new(player_count: usize) -> Self {
        Self {
            players: vec![PlayerStats::default(); player_count],
            turns: 0,
        }
    }

    /// Stats for a seat, growing the table if needed
    fn seat(&mut self, player: PlayerId) -> &mut PlayerStats {
        let idx = player as usize;
        if idx >= self.players.len() {
            self.players.resize(idx + 1, PlayerStats::default());
        }
        &mut self.players[idx]
    }

    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::TurnStarted { .. } => self.turns += 1,
            GameEvent::PropertyPurchased { player, price, .. } => {
                let stats = self.seat(*player);
                stats.purchases += 1;
                stats.money_spent_on_property += u64::from(*price);
            }
            GameEvent::AuctionWon { player, amount, .. } => {
                let stats = self.seat(*player);
                stats.auctions_won += 1;
                stats.money_spent_on_property += u64::from(*amount);
            }
            GameEvent::RentPaid {
                payer,
                owner,
                amount,
                ..
            } => {
                self.seat(*payer).rent_paid += u64::from(*amount);
                self.seat(*owner).rent_received += u64::from(*amount);
            }
            GameEvent::TaxPaid { player, amount } => {
                self.seat(*player).taxes_paid += u64::from(*amount)
            }
            GameEvent::PlayerJailed { player, .. } => self.seat(*player).jail_visits += 1,
            GameEvent::BuildingBuilt { player, .. } => self.seat(*player).buildings_built += 1,
            GameEvent::PropertyMortgaged { player, .. } => self.seat(*player).mortgages += 1,
            GameEvent::TradeCompleted { offer, .. } => {
                self.seat(offer.from).trades += 1;
                self.seat(offer.to).trades += 1;
            }
            GameEvent::PlayerBankrupt { player, .. } => self.seat(*player).bankruptcies += 1,
            GameEvent::GameWon { player } => self.seat(*player).wins += 1,
            _ => {}
        }
    }

    /// Add another set of statistics into this one
    pub fn merge(&mut self, other: &Statistics) {
        self.turns += other.turns;
        for (seat, stats) in other.players.iter().enumerate() {
            self.seat(seat as PlayerId).merge(stats);
        }
    }
}
