//! Auctions for properties whose purchase was declined.

use crate::board::{PlayerId, PropertyId};
use crate::ledger::{Ledger, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from bidding
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AuctionError {
    #[error("Auction is not active")]
    Inactive,

    #[error("Player {0} is not bidding in this auction")]
    NotParticipant(PlayerId),

    #[error("Bid {bid} does not beat {highest}")]
    TooLow { bid: Money, highest: Money },

    #[error("Player {player} cannot cover a bid of {bid}")]
    CannotAfford { player: PlayerId, bid: Money },

    #[error("Bids must be positive")]
    ZeroBid,
}

/// A single bid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub player: PlayerId,
    pub amount: Money,
}

/// Bidding session for one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub property: PropertyId,
    participants: Vec<PlayerId>,
    bids: Vec<Bid>,
    active: bool,
}

impl Auction {
    /// Open bidding on a property
    pub fn start(property: PropertyId, participants: Vec<PlayerId>) -> Self {
        Self {
            property,
            participants,
            bids: Vec::new(),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    /// Bids in the order they were placed (strictly increasing)
    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn highest_bid(&self) -> Option<Bid> {
        self.bids.last().copied()
    }

    /// Place a bid; it must beat the current highest and be covered by the bidder's balance
    pub fn place_bid(
        &mut self,
        ledger: &Ledger,
        player: PlayerId,
        amount: Money,
    ) -> Result<(), AuctionError> {
        if !self.active {
            return Err(AuctionError::Inactive);
        }
        if !self.participants.contains(&player) {
            return Err(AuctionError::NotParticipant(player));
        }
        if amount == 0 {
            return Err(AuctionError::ZeroBid);
        }
        if let Some(highest) = self.highest_bid() {
            if amount <= highest.amount {
                return Err(AuctionError::TooLow {
                    bid: amount,
                    highest: highest.amount,
                });
            }
        }
        if !ledger.can_afford(player, amount) {
            return Err(AuctionError::CannotAfford { player, bid: amount });
        }

        self.bids.push(Bid { player, amount });
        Ok(())
    }

    /// End bidding and return the winning bid, if any
    pub fn close(&mut self) -> Option<Bid> {
        self.active = false;
        self.highest_bid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DEFAULT_BANK_RESERVE;

    const A: PlayerId = 0;
    const B: PlayerId = 1;
    const C: PlayerId = 2;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new(3, 1500, DEFAULT_BANK_RESERVE);
        ledger.debit(C, 1450, "spent").unwrap();
        ledger
    }

    #[test]
    fn test_highest_bidder_wins() {
        let ledger = ledger();
        let mut auction = Auction::start(3, vec![A, B, C]);

        auction.place_bid(&ledger, A, 100).unwrap();
        auction.place_bid(&ledger, B, 120).unwrap();

        assert_eq!(
            auction.place_bid(&ledger, A, 120),
            Err(AuctionError::TooLow {
                bid: 120,
                highest: 120
            })
        );
        assert_eq!(
            auction.place_bid(&ledger, A, 110),
            Err(AuctionError::TooLow {
                bid: 110,
                highest: 120
            })
        );

        assert_eq!(auction.close(), Some(Bid { player: B, amount: 120 }));
        assert!(!auction.is_active());
    }

    #[test]
    fn test_bid_needs_funds() {
        let ledger = ledger();
        let mut auction = Auction::start(3, vec![A, B, C]);
        assert_eq!(
            auction.place_bid(&ledger, C, 60),
            Err(AuctionError::CannotAfford { player: C, bid: 60 })
        );
        auction.place_bid(&ledger, C, 50).unwrap();
    }

    #[test]
    fn test_first_bid_must_be_positive() {
        let ledger = ledger();
        let mut auction = Auction::start(3, vec![A, B]);
        assert_eq!(auction.place_bid(&ledger, A, 0), Err(AuctionError::ZeroBid));
        auction.place_bid(&ledger, A, 1).unwrap();
        assert_eq!(auction.close(), Some(Bid { player: A, amount: 1 }));
    }

    #[test]
    fn test_only_participants_bid() {
        let ledger = ledger();
        let mut auction = Auction::start(3, vec![B, C]);
        assert_eq!(
            auction.place_bid(&ledger, A, 10),
            Err(AuctionError::NotParticipant(A))
        );
    }

    #[test]
    fn test_no_bids_leaves_property_unsold() {
        let mut auction = Auction::start(3, vec![A, B]);
        assert_eq!(auction.close(), None);
    }

    #[test]
    fn test_closed_auction_rejects_bids() {
        let ledger = ledger();
        let mut auction = Auction::start(3, vec![A, B]);
        auction.close();
        assert_eq!(auction.place_bid(&ledger, A, 10), Err(AuctionError::Inactive));
    }
}
