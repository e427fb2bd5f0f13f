//! Decision interface between the engine and whoever controls a player.
//!
//! The engine never knows whether a provider is a person or a bot; it asks
//! questions through [`DecisionProvider`] and acts on the answers. Providers
//! get a read-only [`DecisionContext`] and cannot change game state.

use crate::board::{Board, PlayerId, PropertyId};
use crate::ledger::{Ledger, Money};
use crate::player::Player;
use crate::property::{Property, PropertyRegistry};
use crate::trade::{TradeDecision, TradeOffer};

/// Read-only view of the game offered to a decision provider
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// The player being asked
    pub me: &'a Player,
    pub players: &'a [Player],
    pub board: &'a Board,
    pub registry: &'a PropertyRegistry,
    pub ledger: &'a Ledger,
}

impl<'a> DecisionContext<'a> {
    pub fn new(
        me: &'a Player,
        players: &'a [Player],
        board: &'a Board,
        registry: &'a PropertyRegistry,
        ledger: &'a Ledger,
    ) -> Self {
        Self {
            me,
            players,
            board,
            registry,
            ledger,
        }
    }

    /// The asking player's balance
    pub fn balance(&self) -> Money {
        self.ledger.balance(self.me.id)
    }

    pub fn balance_of(&self, player: PlayerId) -> Money {
        self.ledger.balance(player)
    }

    /// Properties the asking player owns
    pub fn my_properties(&self) -> Vec<&'a Property> {
        let registry = self.registry;
        registry
            .owned_by(self.me.id)
            .into_iter()
            .filter_map(|id| registry.get(id))
            .collect()
    }

    pub fn property(&self, id: PropertyId) -> Option<&'a Property> {
        self.registry.get(id)
    }
}

/// Answers the engine's questions on behalf of one player
pub trait DecisionProvider {
    /// Buy an unowned property at list price?
    fn decide_purchase(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool;

    /// Add a building level to a property? Only asked when building is allowed.
    fn decide_build(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool;

    /// Respond to a trade offer addressed to this player
    fn decide_trade(&mut self, ctx: &DecisionContext<'_>, offer: &TradeOffer) -> TradeDecision;

    /// Mortgage a property? Only asked when mortgaging is allowed.
    fn decide_mortgage(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool;

    /// Bid in an auction. `highest` is the bid to beat; `None` passes.
    fn decide_bid(
        &mut self,
        _ctx: &DecisionContext<'_>,
        _property: &Property,
        _highest: Option<Money>,
    ) -> Option<Money> {
        None
    }

    /// Lift the mortgage on a property? Only asked for mortgaged properties.
    fn decide_redeem(&mut self, _ctx: &DecisionContext<'_>, _property: &Property) -> bool {
        false
    }

    /// Offer a trade to another player during the optional-actions phase
    fn propose_trade(&mut self, _ctx: &DecisionContext<'_>) -> Option<TradeOffer> {
        None
    }

    /// Called before each of this player's turns
    fn on_turn_start(&mut self, _ctx: &DecisionContext<'_>) {}
}
