//! Bilateral trades of money and properties.
//!
//! Offers are validated on submit and again on acceptance, because balances
//! and ownership may change while an offer is pending. Acceptance moves every
//! line item or none of them.

use crate::board::{PlayerId, PropertyId};
use crate::ledger::{Account, Ledger, LedgerError, Money};
use crate::player::Player;
use crate::property::PropertyRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Handle for a pending offer
pub type OfferId = u32;

/// A trade offer between two players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player making the offer
    pub from: PlayerId,
    /// Player receiving the offer
    pub to: PlayerId,
    /// Money paid by `from` to `to`
    pub money_from: Money,
    /// Money paid by `to` to `from`
    pub money_to: Money,
    /// Properties handed from `from` to `to`
    pub properties_from: BTreeSet<PropertyId>,
    /// Properties handed from `to` to `from`
    pub properties_to: BTreeSet<PropertyId>,
}

impl TradeOffer {
    /// Create an empty offer
    pub fn new(from: PlayerId, to: PlayerId) -> Self {
        Self {
            from,
            to,
            money_from: 0,
            money_to: 0,
            properties_from: BTreeSet::new(),
            properties_to: BTreeSet::new(),
        }
    }

    pub fn offering_money(mut self, amount: Money) -> Self {
        self.money_from = amount;
        self
    }

    pub fn requesting_money(mut self, amount: Money) -> Self {
        self.money_to = amount;
        self
    }

    pub fn offering(mut self, properties: impl IntoIterator<Item = PropertyId>) -> Self {
        self.properties_from.extend(properties);
        self
    }

    pub fn requesting(mut self, properties: impl IntoIterator<Item = PropertyId>) -> Self {
        self.properties_to.extend(properties);
        self
    }

    /// Whether the offer moves nothing at all
    pub fn is_empty(&self) -> bool {
        self.money_from == 0
            && self.money_to == 0
            && self.properties_from.is_empty()
            && self.properties_to.is_empty()
    }

    /// Build the reply to this offer: parties swapped, terms taken from
    /// `adjustments` where given and mirrored from this offer otherwise
    pub fn counter(&self, adjustments: TradeAdjustments) -> TradeOffer {
        TradeOffer {
            from: self.to,
            to: self.from,
            money_from: adjustments.money_from.unwrap_or(self.money_to),
            money_to: adjustments.money_to.unwrap_or(self.money_from),
            properties_from: adjustments
                .properties_from
                .unwrap_or_else(|| self.properties_to.clone()),
            properties_to: adjustments
                .properties_to
                .unwrap_or_else(|| self.properties_from.clone()),
        }
    }
}

/// Changed terms for a counter-offer, from the countering player's side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAdjustments {
    pub money_from: Option<Money>,
    pub money_to: Option<Money>,
    pub properties_from: Option<BTreeSet<PropertyId>>,
    pub properties_to: Option<BTreeSet<PropertyId>>,
}

/// Response to an offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDecision {
    Accept,
    Decline,
    Counter(TradeAdjustments),
}

/// Reasons an offer is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TradeError {
    #[error("Offer moves nothing")]
    EmptyOffer,

    #[error("Cannot trade with yourself")]
    SelfTrade,

    #[error("Player {0} is bankrupt")]
    PlayerBankrupt(PlayerId),

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {player} offers {needed} but has {available}")]
    InsufficientFunds {
        player: PlayerId,
        needed: Money,
        available: Money,
    },

    #[error("Property {property} is not owned by player {player}")]
    NotOwned { property: PropertyId, player: PlayerId },

    #[error("Property {0} has buildings")]
    HasBuildings(PropertyId),

    #[error("No pending offer {0}")]
    UnknownOffer(OfferId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Pending offers awaiting a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeDesk {
    pending: BTreeMap<OfferId, TradeOffer>,
    next_id: OfferId,
}

impl TradeDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check an offer against current balances and ownership
    pub fn validate(
        offer: &TradeOffer,
        players: &[Player],
        ledger: &Ledger,
        registry: &PropertyRegistry,
    ) -> Result<(), TradeError> {
        if offer.is_empty() {
            return Err(TradeError::EmptyOffer);
        }
        if offer.from == offer.to {
            return Err(TradeError::SelfTrade);
        }

        for (party, money, properties) in [
            (offer.from, offer.money_from, &offer.properties_from),
            (offer.to, offer.money_to, &offer.properties_to),
        ] {
            let player = players
                .get(party as usize)
                .ok_or(TradeError::UnknownPlayer(party))?;
            if player.is_bankrupt() {
                return Err(TradeError::PlayerBankrupt(party));
            }

            let available = ledger.balance(party);
            if available < money {
                return Err(TradeError::InsufficientFunds {
                    player: party,
                    needed: money,
                    available,
                });
            }

            for &id in properties {
                let prop = registry.get(id).ok_or(TradeError::NotOwned {
                    property: id,
                    player: party,
                })?;
                if prop.owner != Some(party) {
                    return Err(TradeError::NotOwned {
                        property: id,
                        player: party,
                    });
                }
                if prop.build_level > 0 {
                    return Err(TradeError::HasBuildings(id));
                }
            }
        }

        Ok(())
    }

    /// Validate and queue an offer
    pub fn submit(
        &mut self,
        offer: TradeOffer,
        players: &[Player],
        ledger: &Ledger,
        registry: &PropertyRegistry,
    ) -> Result<OfferId, TradeError> {
        Self::validate(&offer, players, ledger, registry)?;
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, offer);
        Ok(id)
    }

    pub fn get(&self, id: OfferId) -> Option<&TradeOffer> {
        self.pending.get(&id)
    }

    pub fn pending(&self) -> impl Iterator<Item = (OfferId, &TradeOffer)> {
        self.pending.iter().map(|(&id, offer)| (id, offer))
    }

    /// Settle a pending offer. The offer leaves the queue either way; on
    /// error nothing has moved.
    pub fn accept(
        &mut self,
        id: OfferId,
        players: &[Player],
        ledger: &mut Ledger,
        registry: &mut PropertyRegistry,
    ) -> Result<TradeOffer, TradeError> {
        let offer = self.pending.remove(&id).ok_or(TradeError::UnknownOffer(id))?;
        Self::validate(&offer, players, ledger, registry)?;

        let (a, b) = (Account::Player(offer.from), Account::Player(offer.to));
        if offer.money_from > 0 {
            ledger.transfer(a, b, offer.money_from, "Trade")?;
        }
        if offer.money_to > 0 {
            if let Err(e) = ledger.transfer(b, a, offer.money_to, "Trade") {
                // Second leg can still overflow the proposer's balance; undo the first
                if offer.money_from > 0 {
                    ledger.transfer(b, a, offer.money_from, "Trade reversal")?;
                }
                return Err(e.into());
            }
        }

        for &prop in &offer.properties_from {
            registry
                .reassign(prop, offer.to)
                .map_err(|_| TradeError::NotOwned {
                    property: prop,
                    player: offer.from,
                })?;
        }
        for &prop in &offer.properties_to {
            registry
                .reassign(prop, offer.from)
                .map_err(|_| TradeError::NotOwned {
                    property: prop,
                    player: offer.to,
                })?;
        }

        debug!(offer = id, from = offer.from, to = offer.to, "trade settled");
        Ok(offer)
    }

    /// Discard a pending offer
    pub fn decline(&mut self, id: OfferId) -> Result<TradeOffer, TradeError> {
        self.pending.remove(&id).ok_or(TradeError::UnknownOffer(id))
    }

    /// Drop every pending offer involving a player
    pub fn withdraw_all(&mut self, player: PlayerId) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, offer| offer.from != player && offer.to != player);
        before - self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardConfig, CellSpec, ColorGroup, PropertySpec};
    use crate::ledger::DEFAULT_BANK_RESERVE;
    use pretty_assertions::assert_eq;

    struct Fixture {
        players: Vec<Player>,
        ledger: Ledger,
        registry: PropertyRegistry,
        desk: TradeDesk,
    }

    /// Player 0 owns property 0, player 1 owns property 1
    fn fixture() -> Fixture {
        let street = |name: &str| {
            CellSpec::Property(PropertySpec::new(
                name,
                100,
                ColorGroup::LightBlue,
                [6, 30, 90, 270, 400, 550],
                50,
            ))
        };
        let (_, mut registry) = BoardConfig::new(vec![
            CellSpec::start(),
            street("Oriental"),
            street("Vermont"),
            CellSpec::jail(),
        ])
        .build()
        .unwrap();
        registry.assign(0, 0).unwrap();
        registry.assign(1, 1).unwrap();

        Fixture {
            players: vec![Player::new(0, "A".into()), Player::new(1, "B".into())],
            ledger: Ledger::new(2, 500, DEFAULT_BANK_RESERVE),
            registry,
            desk: TradeDesk::new(),
        }
    }

    impl Fixture {
        fn submit(&mut self, offer: TradeOffer) -> Result<OfferId, TradeError> {
            self.desk
                .submit(offer, &self.players, &self.ledger, &self.registry)
        }

        fn accept(&mut self, id: OfferId) -> Result<TradeOffer, TradeError> {
            self.desk
                .accept(id, &self.players, &mut self.ledger, &mut self.registry)
        }
    }

    #[test]
    fn test_swap_with_cash() {
        let mut f = fixture();
        let offer = TradeOffer::new(0, 1).offering([0]).offering_money(50).requesting([1]);
        let id = f.submit(offer).unwrap();

        f.accept(id).unwrap();

        assert_eq!(f.registry.owner_of(0), Some(1));
        assert_eq!(f.registry.owner_of(1), Some(0));
        assert_eq!(f.ledger.balance(0), 450);
        assert_eq!(f.ledger.balance(1), 550);
        assert!(f.desk.get(id).is_none());
    }

    #[test]
    fn test_rejects_empty_and_self_trades() {
        let mut f = fixture();
        assert_eq!(f.submit(TradeOffer::new(0, 1)), Err(TradeError::EmptyOffer));
        assert_eq!(
            f.submit(TradeOffer::new(0, 0).offering_money(5)),
            Err(TradeError::SelfTrade)
        );
    }

    #[test]
    fn test_rejects_unowned_property() {
        let mut f = fixture();
        let offer = TradeOffer::new(0, 1).offering([1]);
        assert_eq!(
            f.submit(offer),
            Err(TradeError::NotOwned {
                property: 1,
                player: 0
            })
        );
    }

    #[test]
    fn test_rejects_built_property() {
        let mut f = fixture();
        f.registry.reassign(1, 0).unwrap();
        f.registry.build(0, &mut f.ledger).unwrap();

        let offer = TradeOffer::new(0, 1).offering([0]).requesting_money(100);
        assert_eq!(f.submit(offer), Err(TradeError::HasBuildings(0)));
    }

    #[test]
    fn test_rejects_unfunded_offer() {
        let mut f = fixture();
        let offer = TradeOffer::new(0, 1).offering_money(501);
        assert_eq!(
            f.submit(offer),
            Err(TradeError::InsufficientFunds {
                player: 0,
                needed: 501,
                available: 500
            })
        );
    }

    #[test]
    fn test_acceptance_is_all_or_nothing() {
        let mut f = fixture();
        let offer = TradeOffer::new(0, 1)
            .offering([0])
            .offering_money(100)
            .requesting([1])
            .requesting_money(400);
        let id = f.submit(offer).unwrap();

        // Second money leg becomes impossible before acceptance
        f.ledger.debit(1, 200, "Tax").unwrap();

        let err = f.accept(id).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientFunds {
                player: 1,
                needed: 400,
                available: 300
            }
        );
        assert_eq!(f.ledger.balance(0), 500);
        assert_eq!(f.ledger.balance(1), 300);
        assert_eq!(f.registry.owner_of(0), Some(0));
        assert_eq!(f.registry.owner_of(1), Some(1));
    }

    #[test]
    fn test_ownership_change_after_submit_aborts() {
        let mut f = fixture();
        let id = f
            .submit(TradeOffer::new(0, 1).offering([0]).requesting_money(50))
            .unwrap();
        f.registry.release_all(0);

        assert!(matches!(f.accept(id), Err(TradeError::NotOwned { .. })));
        assert_eq!(f.ledger.balance(1), 500);
    }

    #[test]
    fn test_counter_swaps_parties() {
        let offer = TradeOffer::new(0, 1).offering([0]).requesting([1]).requesting_money(30);

        let mirrored = offer.counter(TradeAdjustments::default());
        assert_eq!(mirrored.from, 1);
        assert_eq!(mirrored.to, 0);
        assert_eq!(mirrored.money_from, 30);
        assert_eq!(mirrored.properties_from, BTreeSet::from([1]));
        assert_eq!(mirrored.properties_to, BTreeSet::from([0]));

        let adjusted = offer.counter(TradeAdjustments {
            money_from: Some(0),
            money_to: Some(20),
            ..Default::default()
        });
        assert_eq!(adjusted.money_from, 0);
        assert_eq!(adjusted.money_to, 20);
    }

    #[test]
    fn test_decline_and_withdraw() {
        let mut f = fixture();
        let a = f.submit(TradeOffer::new(0, 1).offering_money(10)).unwrap();
        let b = f.submit(TradeOffer::new(1, 0).offering_money(10)).unwrap();

        assert!(f.desk.decline(a).is_ok());
        assert_eq!(f.desk.decline(a), Err(TradeError::UnknownOffer(a)));
        assert_eq!(f.desk.withdraw_all(0), 1);
        assert!(f.desk.get(b).is_none());
    }

    #[test]
    fn test_bankrupt_party_cannot_trade() {
        let mut f = fixture();
        f.players[1].declare_bankrupt();
        assert_eq!(
            f.submit(TradeOffer::new(0, 1).offering_money(10)),
            Err(TradeError::PlayerBankrupt(1))
        );
    }
}
