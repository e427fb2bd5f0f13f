//! AI players.
//!
//! This module provides three play styles:
//! - Conservative: buys cheap properties only, keeps a large cash reserve
//! - Aggressive: buys almost everything, builds and trades for monopolies
//! - Balanced: mid-range purchases, accepts fair trades
//!
//! An adaptive bot switches between conservative and aggressive play as its
//! balance falls or grows.

use crate::board::{ColorGroup, PropertyId};
use crate::decision::{DecisionContext, DecisionProvider};
use crate::ledger::Money;
use crate::property::Property;
use crate::trade::{TradeAdjustments, TradeDecision, TradeOffer};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Balance under which an adaptive aggressive bot turns conservative
const ADAPT_DOWN_BELOW: Money = 500;

/// Balance over which an adaptive conservative bot turns aggressive
const ADAPT_UP_ABOVE: Money = 2000;

/// Bot play style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStrategy {
    Conservative,
    Aggressive,
    Balanced,
}

impl BotStrategy {
    /// Default style for a seat, cycling through all three
    pub fn for_seat(seat: usize) -> Self {
        match seat % 3 {
            0 => BotStrategy::Balanced,
            1 => BotStrategy::Conservative,
            _ => BotStrategy::Aggressive,
        }
    }

    fn profile(&self) -> Profile {
        match self {
            BotStrategy::Conservative => Profile {
                min_reserve: 500,
                max_purchase_price: Some(200),
                build_reserve: 1000,
                mortgage_below: 100,
                redeem_reserve: 1000,
                bid_ceiling_percent: 100,
                trade_premium_percent: None,
            },
            BotStrategy::Aggressive => Profile {
                min_reserve: 50,
                max_purchase_price: None,
                build_reserve: 50,
                mortgage_below: 200,
                redeem_reserve: 300,
                bid_ceiling_percent: 150,
                trade_premium_percent: Some(150),
            },
            BotStrategy::Balanced => Profile {
                min_reserve: 300,
                max_purchase_price: Some(350),
                build_reserve: 300,
                mortgage_below: 300,
                redeem_reserve: 600,
                bid_ceiling_percent: 100,
                trade_premium_percent: Some(100),
            },
        }
    }
}

/// Thresholds that define a play style
#[derive(Debug, Clone, Copy)]
struct Profile {
    /// Cash kept after any purchase or bid
    min_reserve: Money,
    max_purchase_price: Option<Money>,
    /// Cash kept after paying for a building
    build_reserve: Money,
    /// Mortgage while the balance is below this
    mortgage_below: Money,
    /// Cash kept after redeeming a mortgage
    redeem_reserve: Money,
    /// Highest bid as a percentage of list price
    bid_ceiling_percent: u32,
    /// Cash offered for a monopoly-completing property, as a percentage of
    /// its price; `None` never proposes trades
    trade_premium_percent: Option<u32>,
}

/// A bot player that answers the engine's questions
pub struct Bot {
    pub strategy: BotStrategy,
    pub adaptive: bool,
    rng: StdRng,
}

impl Bot {
    pub fn new(strategy: BotStrategy) -> Self {
        Self {
            strategy,
            adaptive: false,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(strategy: BotStrategy, seed: u64) -> Self {
        Self {
            strategy,
            adaptive: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Switch strategy with the balance at the start of each turn
    pub fn adaptive(mut self) -> Self {
        self.adaptive = true;
        self
    }

    fn profile(&self) -> Profile {
        self.strategy.profile()
    }

    /// Trade value of a property: mortgaged ones are worth half
    fn value(property: &Property) -> u64 {
        let price = u64::from(property.price);
        if property.mortgaged {
            price / 2
        } else {
            price
        }
    }

    /// What this player receives and gives up under an offer addressed to it
    fn offer_values(ctx: &DecisionContext<'_>, offer: &TradeOffer) -> (u64, u64) {
        let worth = |ids: &BTreeSet<PropertyId>| -> u64 {
            ids.iter()
                .filter_map(|&id| ctx.property(id))
                .map(Self::value)
                .sum()
        };
        let incoming = worth(&offer.properties_from) + u64::from(offer.money_from);
        let outgoing = worth(&offer.properties_to) + u64::from(offer.money_to);
        (incoming, outgoing)
    }
}

impl DecisionProvider for Bot {
    fn decide_purchase(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool {
        let profile = self.profile();
        if let Some(max) = profile.max_purchase_price {
            if property.price > max {
                return false;
            }
        }
        let balance = ctx.balance();
        balance >= property.price && balance - property.price >= profile.min_reserve
    }

    fn decide_build(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool {
        let balance = ctx.balance();
        balance >= property.house_cost
            && balance - property.house_cost >= self.profile().build_reserve
    }

    fn decide_trade(&mut self, ctx: &DecisionContext<'_>, offer: &TradeOffer) -> TradeDecision {
        let (incoming, outgoing) = Self::offer_values(ctx, offer);

        let accept = match self.strategy {
            // Demand a 50% premium
            BotStrategy::Conservative => incoming * 2 >= outgoing * 3,
            // More properties, or at most a 20% loss
            BotStrategy::Aggressive => {
                offer.properties_from.len() > offer.properties_to.len()
                    || incoming * 5 >= outgoing * 4
            }
            // Within 10% of fair
            BotStrategy::Balanced => incoming * 10 >= outgoing * 9,
        };

        if accept {
            TradeDecision::Accept
        } else if self.strategy == BotStrategy::Balanced {
            // Ask for the difference in cash
            let gap = outgoing.saturating_sub(incoming);
            TradeDecision::Counter(TradeAdjustments {
                money_to: Some(saturate(u64::from(offer.money_from) + gap)),
                ..Default::default()
            })
        } else {
            TradeDecision::Decline
        }
    }

    fn decide_mortgage(&mut self, ctx: &DecisionContext<'_>, _property: &Property) -> bool {
        ctx.balance() < self.profile().mortgage_below
    }

    fn decide_bid(
        &mut self,
        ctx: &DecisionContext<'_>,
        property: &Property,
        highest: Option<Money>,
    ) -> Option<Money> {
        let profile = self.profile();
        let ceiling = percent_of(property.price, profile.bid_ceiling_percent)
            .min(ctx.balance().saturating_sub(profile.min_reserve));

        let bid = match highest {
            Some(h) => h.saturating_add(self.rng.gen_range(1..=3) * 10),
            None => (property.price / 2).max(10),
        };
        (bid <= ceiling).then_some(bid)
    }

    fn decide_redeem(&mut self, ctx: &DecisionContext<'_>, property: &Property) -> bool {
        match ctx.registry.redeem_cost(property.id) {
            Some(cost) => ctx
                .balance()
                .checked_sub(cost)
                .is_some_and(|left| left >= self.profile().redeem_reserve),
            None => false,
        }
    }

    fn propose_trade(&mut self, ctx: &DecisionContext<'_>) -> Option<TradeOffer> {
        let premium = self.profile().trade_premium_percent?;
        if !self.rng.gen_bool(0.25) {
            return None;
        }

        // Look for a group missing exactly one property held by an active opponent
        let me = ctx.me.id;
        for group in ColorGroup::ALL {
            let members = ctx.board.group_members(group);
            let missing: Vec<&Property> = members
                .iter()
                .filter_map(|&id| ctx.property(id))
                .filter(|p| p.owner != Some(me))
                .collect();
            if members.len() < 2 || missing.len() != 1 {
                continue;
            }

            let target = missing[0];
            let Some(owner) = target.owner else { continue };
            let owner_active = ctx
                .players
                .get(owner as usize)
                .is_some_and(|p| p.is_active());
            if !owner_active || target.build_level > 0 {
                continue;
            }

            let cash = percent_of(target.price, premium);
            if ctx.balance().saturating_sub(cash) < self.profile().min_reserve {
                continue;
            }

            debug!(player = me, property = target.id, cash, "bot proposes trade");
            return Some(
                TradeOffer::new(me, owner)
                    .offering_money(cash)
                    .requesting([target.id]),
            );
        }
        None
    }

    fn on_turn_start(&mut self, ctx: &DecisionContext<'_>) {
        if !self.adaptive {
            return;
        }
        let balance = ctx.balance();
        let next = match self.strategy {
            BotStrategy::Aggressive if balance < ADAPT_DOWN_BELOW => BotStrategy::Conservative,
            BotStrategy::Conservative if balance > ADAPT_UP_ABOVE => BotStrategy::Aggressive,
            current => current,
        };
        if next != self.strategy {
            debug!(player = ctx.me.id, from = ?self.strategy, to = ?next, "bot switches strategy");
            self.strategy = next;
        }
    }
}

fn percent_of(amount: Money, percent: u32) -> Money {
    saturate(u64::from(amount) * u64::from(percent) / 100)
}

fn saturate(amount: u64) -> Money {
    Money::try_from(amount).unwrap_or(Money::MAX)
}
