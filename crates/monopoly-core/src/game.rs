//! Core game state machine.
//!
//! [`GameSession`] owns every piece of game state and drives one player's
//! turn at a time: roll, move, resolve the landing cell, offer optional
//! actions, then hand over to the next player still in the game.

use crate::actions::{EventSink, GameAction, GameEvent, JailReason};
use crate::auction::{Auction, AuctionError};
use crate::board::{Board, BoardConfig, BoardError, CellKind, PlayerId, PropertyId};
use crate::config::GameConfig;
use crate::decision::{DecisionContext, DecisionProvider};
use crate::dice::Dice;
use crate::ledger::{Account, Ledger, LedgerError, Money};
use crate::player::Player;
use crate::property::{Property, PropertyError, PropertyRegistry, MAX_BUILD_LEVEL};
use crate::trade::{OfferId, TradeAdjustments, TradeDecision, TradeDesk, TradeError, TradeOffer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Minimum number of players
const MIN_PLAYERS: usize = 2;

/// Maximum number of players
const MAX_PLAYERS: usize = 8;

/// Where the current turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Waiting for the dice
    AwaitingRoll,
    /// Moving the token
    Moving,
    /// Applying the landing cell's effect
    ResolvingCell,
    /// Player may build, mortgage or trade
    OfferingOptionalActions,
    /// Turn is over, rotation about to advance
    TurnComplete,
    /// Sitting out a jailed turn
    InJail,
    /// Game is over
    Finished { winner: Option<PlayerId> },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Need 2 to 8 players, got {0}")]
    PlayerCount(usize),

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {0} is bankrupt")]
    PlayerBankrupt(PlayerId),

    #[error("Offer {offer} is not addressed to player {player}")]
    NotAddressee { offer: OfferId, player: PlayerId },

    #[error("Player {player} cannot propose an offer from player {from}")]
    NotOfferer { player: PlayerId, from: PlayerId },

    #[error("Game is over")]
    GameOver,

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Auction(#[from] AuctionError),
}

/// A player joining a session, with whoever makes its decisions
pub struct PlayerSeat {
    pub name: String,
    pub decider: Box<dyn DecisionProvider>,
}

impl PlayerSeat {
    pub fn new(name: impl Into<String>, decider: impl DecisionProvider + 'static) -> Self {
        Self {
            name: name.into(),
            decider: Box::new(decider),
        }
    }
}

/// A player as seen in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player: Player,
    pub balance: Money,
    pub properties: Vec<PropertyId>,
}

/// Serializable view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub turn: u32,
    pub current_player: PlayerId,
    pub phase: TurnPhase,
    pub players: Vec<PlayerSnapshot>,
    pub properties: Vec<Property>,
    pub pending_trades: Vec<(OfferId, TradeOffer)>,
    pub bank_reserve: u64,
}

/// The complete game
pub struct GameSession {
    config: GameConfig,
    board: Board,
    registry: PropertyRegistry,
    ledger: Ledger,
    players: Vec<Player>,
    deciders: Vec<Box<dyn DecisionProvider>>,
    trades: TradeDesk,
    dice: Dice,
    sinks: Vec<Box<dyn EventSink>>,
    current_player: PlayerId,
    phase: TurnPhase,
    /// Turns played so far
    turn: u32,
    /// Consecutive doubles in the current turn
    doubles: u8,
    /// Events published during the current call
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Start a session: build the board, open accounts and seat the players
    pub fn new(
        config: GameConfig,
        seats: Vec<PlayerSeat>,
        board_config: &BoardConfig,
    ) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&seats.len()) {
            return Err(GameError::PlayerCount(seats.len()));
        }

        let (board, registry) = board_config.build()?;
        let registry = registry.with_redeem_interest(config.redeem_interest);
        let ledger = Ledger::new(seats.len(), config.starting_balance, config.bank_reserve);

        let (players, deciders): (Vec<Player>, Vec<Box<dyn DecisionProvider>>) = seats
            .into_iter()
            .enumerate()
            .map(|(i, seat)| (Player::new(i as PlayerId, seat.name), seat.decider))
            .unzip();

        Ok(Self {
            config,
            board,
            registry,
            ledger,
            players,
            deciders,
            trades: TradeDesk::new(),
            dice: Dice::from_entropy(),
            sinks: Vec::new(),
            current_player: 0,
            phase: TurnPhase::AwaitingRoll,
            turn: 0,
            doubles: 0,
            events: Vec::new(),
        })
    }

    /// Replace the dice (seeded or loaded dice for replays and tests)
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    /// Register an observer for every published event
    pub fn add_sink(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn trades(&self) -> &TradeDesk {
        &self.trades
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Turns played so far
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Player whose turn is next (or in progress)
    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn balance(&self, player: PlayerId) -> Money {
        self.ledger.balance(player)
    }

    /// Properties a player owns, derived from the registry
    pub fn properties_of(&self, player: PlayerId) -> Vec<PropertyId> {
        self.registry.owned_by(player)
    }

    /// Check if the game is finished
    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, TurnPhase::Finished { .. })
    }

    /// Get the winner if the game is finished
    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            TurnPhase::Finished { winner } => winner,
            _ => None,
        }
    }

    /// Players still in the rotation
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            turn: self.turn,
            current_player: self.current_player,
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    player: p.clone(),
                    balance: self.ledger.balance(p.id),
                    properties: self.registry.owned_by(p.id),
                })
                .collect(),
            properties: self.registry.iter().cloned().collect(),
            pending_trades: self
                .trades
                .pending()
                .map(|(id, offer)| (id, offer.clone()))
                .collect(),
            bank_reserve: self.ledger.reserve(),
        }
    }

    /// Get all currently valid optional actions for a player.
    ///
    /// Trade proposals and counter-offers can't be enumerated and are never listed.
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        if self.is_game_over() || !self.get_player(player).is_some_and(Player::is_active) {
            return actions;
        }

        // Anyone may answer offers addressed to them
        for (id, offer) in self.trades.pending() {
            if offer.to == player {
                actions.push(GameAction::AcceptTrade(id));
                actions.push(GameAction::DeclineTrade(id));
            }
        }

        if player != self.current_player {
            return actions;
        }

        let balance = self.ledger.balance(player);
        for id in self.registry.owned_by(player) {
            let Some(prop) = self.registry.get(id) else {
                continue;
            };
            if self.registry.can_build(id) && balance >= prop.house_cost {
                actions.push(GameAction::Build(id));
            }
            if self.registry.can_sell_building(id) {
                actions.push(GameAction::SellBuilding(id));
            }
            if self.registry.check_mortgage(id).is_ok() {
                actions.push(GameAction::Mortgage(id));
            }
            if prop.mortgaged
                && self
                    .registry
                    .redeem_cost(id)
                    .is_some_and(|cost| balance >= cost)
            {
                actions.push(GameAction::RedeemMortgage(id));
            }
        }

        actions
    }

    // ==================== Turn engine ====================

    /// Play the current player's whole turn, including extra rolls for doubles
    pub fn play_one_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        self.events.clear();

        if !self.is_active(self.current_player) {
            match self.next_active(self.current_player) {
                Some(next) => self.current_player = next,
                None => {
                    self.check_game_over();
                    return Ok(std::mem::take(&mut self.events));
                }
            }
        }

        let player = self.current_player;
        self.turn += 1;
        self.doubles = 0;
        self.publish(GameEvent::TurnStarted {
            player,
            turn: self.turn,
        });
        self.ask(player, |d, ctx| d.on_turn_start(ctx));

        if self.players[player as usize].in_jail {
            self.phase = TurnPhase::InJail;
            self.serve_jail_turn(player);
            if self.is_active(player) {
                self.phase = TurnPhase::OfferingOptionalActions;
                self.offer_optional_actions(player);
            }
        } else {
            self.take_rolls(player)?;
        }

        self.phase = TurnPhase::TurnComplete;
        self.end_turn(player);
        Ok(std::mem::take(&mut self.events))
    }

    /// Roll, move and resolve until the player stops rolling doubles
    fn take_rolls(&mut self, player: PlayerId) -> Result<(), GameError> {
        loop {
            self.phase = TurnPhase::AwaitingRoll;
            let roll = self.dice.roll();
            self.publish(GameEvent::DiceRolled { player, roll });

            if roll.is_double() {
                self.doubles += 1;
                if self.doubles >= self.config.doubles_limit {
                    self.send_to_jail(player, JailReason::TripleDoubles);
                    return Ok(());
                }
            } else {
                self.doubles = 0;
            }

            self.phase = TurnPhase::Moving;
            self.move_player(player, roll.total() as usize)?;

            self.phase = TurnPhase::ResolvingCell;
            self.resolve_cell(player)?;

            if !self.is_active(player) {
                return Ok(());
            }

            self.phase = TurnPhase::OfferingOptionalActions;
            self.offer_optional_actions(player);

            if !roll.is_double() || self.players[player as usize].in_jail {
                return Ok(());
            }
            self.publish(GameEvent::ExtraTurn { player });
        }
    }

    fn serve_jail_turn(&mut self, player: PlayerId) {
        let jailed = &mut self.players[player as usize];
        let released = jailed.serve_jail_turn();
        let turns_remaining = jailed.jail_turns_remaining;

        self.publish(GameEvent::JailTurnServed {
            player,
            turns_remaining,
        });
        if released {
            debug!(player, "released from jail");
            self.publish(GameEvent::ReleasedFromJail { player });
        }
    }

    fn move_player(&mut self, player: PlayerId, steps: usize) -> Result<(), GameError> {
        let from = self.players[player as usize].position;
        let passed_start = self.board.passes_start(from, steps);
        let to = self.board.advance(from, steps);
        self.players[player as usize].position = to;

        debug!(player, from, to, passed_start, "player moved");
        self.publish(GameEvent::PlayerMoved {
            player,
            from,
            to,
            passed_start,
        });

        if passed_start {
            let salary = self.config.salary;
            match self.credit(player, salary, "Salary") {
                Ok(()) => self.publish(GameEvent::SalaryCollected {
                    player,
                    amount: salary,
                }),
                Err(GameError::Ledger(LedgerError::Overflow { .. })) => {
                    warn!(player, salary, "salary forfeited, balance at its limit")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn resolve_cell(&mut self, player: PlayerId) -> Result<(), GameError> {
        let position = self.players[player as usize].position;
        match self.board.cell_at(position).kind {
            CellKind::Property(id) => match self.registry.owner_of(id) {
                None => self.offer_purchase(player, id),
                Some(owner) if owner == player => Ok(()),
                Some(owner) => self.collect_rent(player, owner, id),
            },
            CellKind::Tax { amount } => self.charge_tax(player, amount),
            CellKind::GoToJail => {
                self.send_to_jail(player, JailReason::GoToJailCell);
                Ok(())
            }
            CellKind::Start | CellKind::Ordinary | CellKind::Jail => Ok(()),
        }
    }

    fn offer_purchase(&mut self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        let prop = self
            .registry
            .get(id)
            .ok_or(PropertyError::UnknownProperty(id))?;
        let (price, reason) = (prop.price, format!("Buy {}", prop.name));

        let wants = self.ask(player, |d, ctx| {
            ctx.property(id).is_some_and(|p| d.decide_purchase(ctx, p))
        });

        if wants && self.ledger.can_afford(player, price) {
            self.debit(player, price, &reason)?;
            self.registry.assign(id, player)?;
            info!(player, property = id, price, "property purchased");
            self.publish(GameEvent::PropertyPurchased {
                player,
                property: id,
                price,
            });
            return Ok(());
        }

        self.publish(GameEvent::PurchaseDeclined {
            player,
            property: id,
        });
        if self.config.auctions_enabled {
            self.run_auction(id, player)?;
        }
        Ok(())
    }

    /// Auction a declined property. Bidders are asked in seat order, round
    /// after round, until a full round passes without a new bid. A bidder
    /// that passes is out of the auction.
    fn run_auction(&mut self, id: PropertyId, decliner: PlayerId) -> Result<(), GameError> {
        let participants: Vec<PlayerId> = self
            .active_players()
            .map(|p| p.id)
            .filter(|&p| p != decliner || self.config.auction_includes_decliner)
            .collect();

        let mut auction = Auction::start(id, participants.clone());
        self.publish(GameEvent::AuctionStarted {
            property: id,
            participants: participants.clone(),
        });

        let mut still_in = participants.clone();
        loop {
            let mut raised = false;
            let mut passed = Vec::new();
            for &bidder in &still_in {
                let highest = auction.highest_bid();
                if highest.is_some_and(|b| b.player == bidder) {
                    continue;
                }

                let to_beat = highest.map(|b| b.amount);
                let offer = self.ask(bidder, |d, ctx| {
                    ctx.property(id).and_then(|p| d.decide_bid(ctx, p, to_beat))
                });
                let Some(amount) = offer else {
                    passed.push(bidder);
                    continue;
                };

                match auction.place_bid(&self.ledger, bidder, amount) {
                    Ok(()) => {
                        raised = true;
                        self.publish(GameEvent::BidPlaced {
                            player: bidder,
                            property: id,
                            amount,
                        });
                    }
                    Err(e) => debug!(player = bidder, amount, error = %e, "bid rejected"),
                }
            }
            still_in.retain(|p| !passed.contains(p));
            if !raised {
                break;
            }
        }

        match auction.close() {
            Some(bid) => {
                let reason = self
                    .registry
                    .get(id)
                    .map(|p| format!("Auction {}", p.name))
                    .unwrap_or_else(|| "Auction".to_string());
                self.debit(bid.player, bid.amount, &reason)?;
                self.registry.assign(id, bid.player)?;
                info!(player = bid.player, property = id, amount = bid.amount, "auction won");
                self.publish(GameEvent::AuctionWon {
                    player: bid.player,
                    property: id,
                    amount: bid.amount,
                });
            }
            None => self.publish(GameEvent::AuctionUnsold { property: id }),
        }
        Ok(())
    }

    fn collect_rent(
        &mut self,
        payer: PlayerId,
        owner: PlayerId,
        id: PropertyId,
    ) -> Result<(), GameError> {
        let rent = self.registry.calculate_rent(id);
        if rent == 0 {
            return Ok(());
        }
        if !self.ledger.can_afford(payer, rent) {
            return self.declare_bankruptcy(payer, rent);
        }

        let (payer_old, owner_old) = (self.ledger.balance(payer), self.ledger.balance(owner));
        match self.ledger.transfer(
            Account::Player(payer),
            Account::Player(owner),
            rent,
            "Rent",
        ) {
            Ok(_) => {}
            Err(LedgerError::Overflow { .. }) => {
                warn!(payer, owner, rent, "rent waived, owner balance at its limit");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        self.balance_changed(payer, payer_old, "Rent");
        self.balance_changed(owner, owner_old, "Rent");
        self.publish(GameEvent::RentPaid {
            payer,
            owner,
            property: id,
            amount: rent,
        });
        Ok(())
    }

    fn charge_tax(&mut self, player: PlayerId, amount: Money) -> Result<(), GameError> {
        if !self.ledger.can_afford(player, amount) {
            return self.declare_bankruptcy(player, amount);
        }
        self.debit(player, amount, "Tax")?;
        self.publish(GameEvent::TaxPaid { player, amount });
        Ok(())
    }

    fn send_to_jail(&mut self, player: PlayerId, reason: JailReason) {
        let jail = self.board.jail_position();
        self.players[player as usize].send_to_jail(jail, self.config.jail_turns);
        self.doubles = 0;
        debug!(player, ?reason, "sent to jail");
        self.publish(GameEvent::PlayerJailed { player, reason });
    }

    /// Forfeit everything: balance to the bank, properties back to the market,
    /// pending offers withdrawn, out of the rotation for good
    fn declare_bankruptcy(&mut self, player: PlayerId, owed: Money) -> Result<(), GameError> {
        let old = self.ledger.balance(player);
        self.ledger.liquidate(player, "Bankruptcy")?;
        self.balance_changed(player, old, "Bankruptcy");

        let released = self.registry.release_all(player);
        self.players[player as usize].declare_bankrupt();
        let withdrawn = self.trades.withdraw_all(player);

        info!(player, owed, released = released.len(), withdrawn, "player bankrupt");
        self.publish(GameEvent::PlayerBankrupt {
            player,
            owed,
            released,
        });
        Ok(())
    }

    /// Ask the player's decider about every optional action it could take.
    /// A refused action is logged and skipped; it never ends the turn.
    fn offer_optional_actions(&mut self, player: PlayerId) {
        for id in self.registry.owned_by(player) {
            let affordable = self
                .registry
                .get(id)
                .filter(|p| p.mortgaged)
                .and_then(|_| self.registry.redeem_cost(id))
                .is_some_and(|cost| self.ledger.can_afford(player, cost));
            if affordable
                && self.ask(player, |d, ctx| {
                    ctx.property(id).is_some_and(|p| d.decide_redeem(ctx, p))
                })
            {
                let result = self.redeem(player, id);
                log_refusal(player, result);
            }
        }

        // Even building needs several passes to raise a whole group
        for _ in 0..MAX_BUILD_LEVEL {
            let mut built = false;
            for id in self.registry.owned_by(player) {
                let affordable = self
                    .registry
                    .get(id)
                    .is_some_and(|p| self.ledger.can_afford(player, p.house_cost));
                if affordable
                    && self.registry.can_build(id)
                    && self.ask(player, |d, ctx| {
                        ctx.property(id).is_some_and(|p| d.decide_build(ctx, p))
                    })
                {
                    let result = self.build(player, id);
                    built |= result.is_ok();
                    log_refusal(player, result);
                }
            }
            if !built {
                break;
            }
        }

        for id in self.registry.owned_by(player) {
            if self.registry.check_mortgage(id).is_ok()
                && self.ask(player, |d, ctx| {
                    ctx.property(id).is_some_and(|p| d.decide_mortgage(ctx, p))
                })
            {
                let result = self.mortgage(player, id);
                log_refusal(player, result);
            }
        }

        if let Some(offer) = self.ask(player, |d, ctx| d.propose_trade(ctx)) {
            if offer.from == player {
                let result = self.negotiate(offer);
                log_refusal(player, result);
            }
        }
    }

    /// Run a proposed trade through answers and counter-offers until it is
    /// settled, declined, or runs out of rounds
    fn negotiate(&mut self, offer: TradeOffer) -> Result<(), GameError> {
        let mut id = self.propose_trade(offer)?;
        let mut rounds = 0;

        loop {
            let Some(offer) = self.trades.get(id).cloned() else {
                return Ok(());
            };
            let decision = self.ask(offer.to, |d, ctx| d.decide_trade(ctx, &offer));

            match decision {
                TradeDecision::Accept => return self.settle_trade(id),
                TradeDecision::Counter(adjustments) if rounds < self.config.max_trade_rounds => {
                    rounds += 1;
                    id = self.counter_trade(id, adjustments)?;
                }
                TradeDecision::Counter(_) | TradeDecision::Decline => {
                    self.trades.decline(id)?;
                    self.publish(GameEvent::TradeDeclined { id });
                    return Ok(());
                }
            }
        }
    }

    fn end_turn(&mut self, player: PlayerId) {
        if self.check_game_over() {
            return;
        }
        if let Some(next) = self.next_active(player) {
            self.publish(GameEvent::TurnEnded {
                player,
                next_player: next,
            });
            self.current_player = next;
            self.phase = TurnPhase::AwaitingRoll;
        }
    }

    /// Finish the game once at most one player is left
    fn check_game_over(&mut self) -> bool {
        let active: Vec<PlayerId> = self.active_players().map(|p| p.id).collect();
        if active.len() > 1 {
            return false;
        }
        let first = active.first().copied();

        self.phase = TurnPhase::Finished { winner: first };
        if let Some(winner) = first {
            info!(winner, turns = self.turn, "game won");
            self.publish(GameEvent::GameWon { player: winner });
        }
        true
    }

    /// Next player after `from` still in the game, wrapping around
    fn next_active(&self, from: PlayerId) -> Option<PlayerId> {
        let count = self.players.len();
        (1..=count)
            .map(|offset| ((from as usize + offset) % count) as PlayerId)
            .find(|&id| self.is_active(id))
    }

    fn is_active(&self, player: PlayerId) -> bool {
        self.get_player(player).is_some_and(Player::is_active)
    }

    // ==================== Optional actions ====================

    /// Apply an optional action on behalf of a player
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        let actor = self
            .get_player(player)
            .ok_or(GameError::UnknownPlayer(player))?;
        if actor.is_bankrupt() {
            return Err(GameError::PlayerBankrupt(player));
        }
        self.events.clear();

        match action {
            GameAction::Build(id) => {
                self.require_turn(player)?;
                self.build(player, id)?;
            }
            GameAction::SellBuilding(id) => {
                self.require_turn(player)?;
                self.sell_building(player, id)?;
            }
            GameAction::Mortgage(id) => {
                self.require_turn(player)?;
                self.mortgage(player, id)?;
            }
            GameAction::RedeemMortgage(id) => {
                self.require_turn(player)?;
                self.redeem(player, id)?;
            }
            GameAction::ProposeTrade(offer) => {
                self.require_turn(player)?;
                if offer.from != player {
                    return Err(GameError::NotOfferer {
                        player,
                        from: offer.from,
                    });
                }
                self.propose_trade(offer)?;
            }
            GameAction::AcceptTrade(id) => {
                self.require_addressee(player, id)?;
                self.settle_trade(id)?;
            }
            GameAction::DeclineTrade(id) => {
                self.require_addressee(player, id)?;
                self.trades.decline(id)?;
                self.publish(GameEvent::TradeDeclined { id });
            }
            GameAction::CounterTrade { offer, adjustments } => {
                self.require_addressee(player, offer)?;
                self.counter_trade(offer, adjustments)?;
            }
        }

        Ok(std::mem::take(&mut self.events))
    }

    fn require_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn require_addressee(&self, player: PlayerId, offer: OfferId) -> Result<(), GameError> {
        let pending = self
            .trades
            .get(offer)
            .ok_or(TradeError::UnknownOffer(offer))?;
        if pending.to != player {
            return Err(GameError::NotAddressee { offer, player });
        }
        Ok(())
    }

    fn require_owner(&self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        let prop = self
            .registry
            .get(id)
            .ok_or(PropertyError::UnknownProperty(id))?;
        if prop.owner != Some(player) {
            return Err(PropertyError::NotOwner(player).into());
        }
        Ok(())
    }

    fn build(&mut self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        self.require_owner(player, id)?;
        let old = self.ledger.balance(player);
        let level = self.registry.build(id, &mut self.ledger)?;
        self.balance_changed(player, old, "Build");
        self.publish(GameEvent::BuildingBuilt {
            player,
            property: id,
            level,
        });
        Ok(())
    }

    fn sell_building(&mut self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        self.require_owner(player, id)?;
        let old = self.ledger.balance(player);
        let level = self.registry.sell_building(id, &mut self.ledger)?;
        self.balance_changed(player, old, "Sell building");
        self.publish(GameEvent::BuildingSold {
            player,
            property: id,
            level,
        });
        Ok(())
    }

    fn mortgage(&mut self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        self.require_owner(player, id)?;
        let old = self.ledger.balance(player);
        let amount = self.registry.mortgage(id, &mut self.ledger)?;
        self.balance_changed(player, old, "Mortgage");
        self.publish(GameEvent::PropertyMortgaged {
            player,
            property: id,
            amount,
        });
        Ok(())
    }

    fn redeem(&mut self, player: PlayerId, id: PropertyId) -> Result<(), GameError> {
        self.require_owner(player, id)?;
        let old = self.ledger.balance(player);
        let cost = self.registry.redeem_mortgage(id, &mut self.ledger)?;
        self.balance_changed(player, old, "Redeem mortgage");
        self.publish(GameEvent::MortgageRedeemed {
            player,
            property: id,
            cost,
        });
        Ok(())
    }

    fn propose_trade(&mut self, offer: TradeOffer) -> Result<OfferId, GameError> {
        let id = self
            .trades
            .submit(offer.clone(), &self.players, &self.ledger, &self.registry)?;
        debug!(offer = id, from = offer.from, to = offer.to, "trade proposed");
        self.publish(GameEvent::TradeProposed { id, offer });
        Ok(id)
    }

    /// Replace a pending offer with its counter-offer. An invalid counter
    /// leaves the original declined.
    fn counter_trade(
        &mut self,
        id: OfferId,
        adjustments: TradeAdjustments,
    ) -> Result<OfferId, GameError> {
        let original = self.trades.decline(id)?;
        let counter = original.counter(adjustments);

        match self
            .trades
            .submit(counter.clone(), &self.players, &self.ledger, &self.registry)
        {
            Ok(new_id) => {
                self.publish(GameEvent::TradeCountered {
                    replaced: id,
                    id: new_id,
                    offer: counter,
                });
                Ok(new_id)
            }
            Err(e) => {
                self.publish(GameEvent::TradeDeclined { id });
                Err(e.into())
            }
        }
    }

    fn settle_trade(&mut self, id: OfferId) -> Result<(), GameError> {
        let parties = self.trades.get(id).map(|o| (o.from, o.to));
        let before = parties.map(|(a, b)| (self.ledger.balance(a), self.ledger.balance(b)));

        match self
            .trades
            .accept(id, &self.players, &mut self.ledger, &mut self.registry)
        {
            Ok(offer) => {
                if let (Some((a, b)), Some((a_old, b_old))) = (parties, before) {
                    self.balance_changed(a, a_old, "Trade");
                    self.balance_changed(b, b_old, "Trade");
                }
                info!(offer = id, from = offer.from, to = offer.to, "trade completed");
                self.publish(GameEvent::TradeCompleted { id, offer });
                Ok(())
            }
            Err(TradeError::UnknownOffer(missing)) => Err(TradeError::UnknownOffer(missing).into()),
            Err(e) => {
                // The offer has left the queue
                self.publish(GameEvent::TradeDeclined { id });
                Err(e.into())
            }
        }
    }

    // ==================== Plumbing ====================

    /// Put a question to a player's decider with a read-only view of the game
    fn ask<R>(
        &mut self,
        player: PlayerId,
        question: impl FnOnce(&mut dyn DecisionProvider, &DecisionContext<'_>) -> R,
    ) -> R {
        let idx = player as usize;
        let ctx = DecisionContext::new(
            &self.players[idx],
            &self.players,
            &self.board,
            &self.registry,
            &self.ledger,
        );
        question(self.deciders[idx].as_mut(), &ctx)
    }

    /// Send an event to every sink and record it for the caller
    fn publish(&mut self, event: GameEvent) {
        for sink in &mut self.sinks {
            sink.on_event(&event);
        }
        self.events.push(event);
    }

    fn credit(&mut self, player: PlayerId, amount: Money, reason: &str) -> Result<(), GameError> {
        let old = self.ledger.balance(player);
        self.ledger.credit(player, amount, reason)?;
        self.balance_changed(player, old, reason);
        Ok(())
    }

    fn debit(&mut self, player: PlayerId, amount: Money, reason: &str) -> Result<(), GameError> {
        let old = self.ledger.balance(player);
        self.ledger.debit(player, amount, reason)?;
        self.balance_changed(player, old, reason);
        Ok(())
    }

    fn balance_changed(&mut self, player: PlayerId, old: Money, reason: &str) {
        let new = self.ledger.balance(player);
        if new != old {
            self.publish(GameEvent::BalanceChanged {
                player,
                old,
                new,
                reason: reason.to_string(),
            });
        }
    }
}

fn log_refusal(player: PlayerId, result: Result<(), GameError>) {
    if let Err(e) = result {
        debug!(player, error = %e, "optional action refused");
    }
}
