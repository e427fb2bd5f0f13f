//! Game actions that players can take.
//!
//! This module defines the optional actions a player may take outside the
//! mandatory turn sequence, the events that the engine publishes, and the
//! sink interface observers implement to receive them.

use crate::board::{PlayerId, Position, PropertyId};
use crate::dice::Roll;
use crate::ledger::Money;
use crate::trade::{OfferId, TradeAdjustments, TradeOffer};
use serde::{Deserialize, Serialize};

/// Optional actions, applied through `GameSession::apply_action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Development ====================
    /// Add one house (or the hotel) to a property
    Build(PropertyId),
    /// Remove one building level for half its cost
    SellBuilding(PropertyId),

    // ==================== Mortgages ====================
    /// Mortgage a property for half its price
    Mortgage(PropertyId),
    /// Lift a mortgage
    RedeemMortgage(PropertyId),

    // ==================== Trading ====================
    /// Propose a trade to another player
    ProposeTrade(TradeOffer),
    /// Accept an offer addressed to you
    AcceptTrade(OfferId),
    /// Decline an offer addressed to you
    DeclineTrade(OfferId),
    /// Replace an offer addressed to you with a counter-offer
    CounterTrade {
        offer: OfferId,
        adjustments: TradeAdjustments,
    },
}

/// Why a player went to jail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JailReason {
    /// Landed on the go-to-jail cell
    GoToJailCell,
    /// Rolled too many doubles in a row
    TripleDoubles,
}

/// Events that occur as a result of turns and actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A turn began
    TurnStarted { player: PlayerId, turn: u32 },

    /// Dice were rolled
    DiceRolled { player: PlayerId, roll: Roll },

    /// A player moved along the board
    PlayerMoved {
        player: PlayerId,
        from: Position,
        to: Position,
        passed_start: bool,
    },

    /// Salary paid for passing start
    SalaryCollected { player: PlayerId, amount: Money },

    /// Any change to a player's balance
    BalanceChanged {
        player: PlayerId,
        old: Money,
        new: Money,
        reason: String,
    },

    /// A property was bought at list price
    PropertyPurchased {
        player: PlayerId,
        property: PropertyId,
        price: Money,
    },

    /// A player passed on buying a property
    PurchaseDeclined { player: PlayerId, property: PropertyId },

    /// Bidding opened
    AuctionStarted {
        property: PropertyId,
        participants: Vec<PlayerId>,
    },

    /// A bid was accepted
    BidPlaced {
        player: PlayerId,
        property: PropertyId,
        amount: Money,
    },

    /// The auction ended with a sale
    AuctionWon {
        player: PlayerId,
        property: PropertyId,
        amount: Money,
    },

    /// The auction ended without bids
    AuctionUnsold { property: PropertyId },

    /// Rent was paid
    RentPaid {
        payer: PlayerId,
        owner: PlayerId,
        property: PropertyId,
        amount: Money,
    },

    /// Tax was paid
    TaxPaid { player: PlayerId, amount: Money },

    /// A player was sent to jail
    PlayerJailed { player: PlayerId, reason: JailReason },

    /// A jailed player sat out a turn
    JailTurnServed { player: PlayerId, turns_remaining: u8 },

    /// A player left jail
    ReleasedFromJail { player: PlayerId },

    /// A building level was added
    BuildingBuilt {
        player: PlayerId,
        property: PropertyId,
        level: u8,
    },

    /// A building level was sold
    BuildingSold {
        player: PlayerId,
        property: PropertyId,
        level: u8,
    },

    /// A property was mortgaged
    PropertyMortgaged {
        player: PlayerId,
        property: PropertyId,
        amount: Money,
    },

    /// A mortgage was lifted
    MortgageRedeemed {
        player: PlayerId,
        property: PropertyId,
        cost: Money,
    },

    /// A trade was proposed
    TradeProposed { id: OfferId, offer: TradeOffer },

    /// A counter-offer replaced a pending offer
    TradeCountered { replaced: OfferId, id: OfferId, offer: TradeOffer },

    /// A trade was declined or withdrawn
    TradeDeclined { id: OfferId },

    /// A trade was completed
    TradeCompleted { id: OfferId, offer: TradeOffer },

    /// A player could not pay and left the game
    PlayerBankrupt {
        player: PlayerId,
        owed: Money,
        released: Vec<PropertyId>,
    },

    /// Doubles earned another roll
    ExtraTurn { player: PlayerId },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// A player won the game
    GameWon { player: PlayerId },
}

/// Receives every event the engine publishes.
///
/// Sinks only ever see events, never the session, so they cannot change game state.
pub trait EventSink {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> EventSink for F {
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}
