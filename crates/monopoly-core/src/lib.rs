//! Rules engine for a turn-based property-trading board game
//!
//! This crate provides the core game logic, including:
//! - A cyclic board of start, property, tax, jail and go-to-jail cells
//! - A ledger that owns every balance and logs every transfer
//! - Property ownership, rent, mortgages and even building
//! - Atomic trades, auctions and bankruptcy
//! - A turn state machine driven by pluggable decision providers
//!
//! # Architecture
//!
//! [`GameSession`] owns all state. Whoever controls a player, person or bot,
//! answers through [`DecisionProvider`]; observers receive [`GameEvent`]s
//! through [`EventSink`] and never touch game state.
//!
//! # Modules
//!
//! - [`board`]: Board layout, cells and color groups
//! - [`ledger`]: Balances and the transaction log
//! - [`property`]: Property registry, rent and building rules
//! - [`player`]: Player position, jail and bankruptcy state
//! - [`trade`]: Trade offers and settlement
//! - [`auction`]: Bidding on declined properties
//! - [`game`]: The turn engine
//! - [`bot`]: AI decision providers

pub mod actions;
pub mod auction;
pub mod board;
pub mod bot;
pub mod config;
pub mod decision;
pub mod dice;
pub mod game;
pub mod ledger;
pub mod player;
pub mod property;
pub mod trade;

// Re-export commonly used types
pub use actions::{EventSink, GameAction, GameEvent, JailReason};
pub use auction::{Auction, AuctionError, Bid};
pub use board::{Board, BoardConfig, BoardError, CellKind, CellSpec, ColorGroup, PlayerId, PropertyId, PropertySpec};
pub use bot::{Bot, BotStrategy};
pub use config::GameConfig;
pub use decision::{DecisionContext, DecisionProvider};
pub use dice::{Dice, Roll};
pub use game::{GameError, GameSession, GameSnapshot, PlayerSeat, TurnPhase};
pub use ledger::{Account, Ledger, LedgerError, Money};
pub use player::Player;
pub use property::{Property, PropertyError, PropertyRegistry};
pub use trade::{OfferId, TradeAdjustments, TradeDecision, TradeDesk, TradeError, TradeOffer};
