//! Integration tests for the property-trading game engine.
//!
//! These tests drive whole turns through the public API, from the opening
//! purchase to a player's bankruptcy and a finished bot game.

use monopoly_core::*;
use pretty_assertions::assert_eq;

/// Buys whatever it can afford; never builds, bids, mortgages or trades
struct Buyer;

impl DecisionProvider for Buyer {
    fn decide_purchase(&mut self, _: &DecisionContext<'_>, _: &Property) -> bool {
        true
    }

    fn decide_build(&mut self, _: &DecisionContext<'_>, _: &Property) -> bool {
        false
    }

    fn decide_trade(&mut self, _: &DecisionContext<'_>, _: &TradeOffer) -> TradeDecision {
        TradeDecision::Decline
    }

    fn decide_mortgage(&mut self, _: &DecisionContext<'_>, _: &Property) -> bool {
        false
    }
}

/// 12 cells with two cheap browns whose bare rent is 8
fn small_board() -> BoardConfig {
    BoardConfig::new(vec![
        CellSpec::start(),
        CellSpec::ordinary("Chance"),
        CellSpec::ordinary("Community Chest"),
        CellSpec::Property(PropertySpec::new(
            "Old Kent Road",
            60,
            ColorGroup::Brown,
            [8, 10, 30, 90, 160, 250],
            50,
        )),
        CellSpec::tax("Income Tax", 100),
        CellSpec::Property(PropertySpec::new(
            "Whitechapel Road",
            60,
            ColorGroup::Brown,
            [8, 20, 60, 180, 320, 450],
            50,
        )),
        CellSpec::jail(),
        CellSpec::ordinary("Free Parking"),
        CellSpec::Property(PropertySpec::flat(
            "Kings Cross",
            200,
            ColorGroup::Railroad,
            25,
        )),
        CellSpec::go_to_jail(),
        CellSpec::ordinary("Chance"),
        CellSpec::ordinary("Super Tax"),
    ])
}

fn buyers(count: usize) -> Vec<PlayerSeat> {
    (0..count)
        .map(|i| PlayerSeat::new(format!("Player {}", i + 1), Buyer))
        .collect()
}

fn started_players(events: &[GameEvent]) -> Vec<PlayerId> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TurnStarted { player, .. } => Some(*player),
            _ => None,
        })
        .collect()
}

#[test]
fn test_purchase_updates_balance_and_registry() {
    let mut game = GameSession::new(GameConfig::default(), buyers(2), &small_board())
        .unwrap()
        .with_dice(Dice::loaded(vec![Roll(1, 2)]));

    game.play_one_turn().unwrap();

    assert_eq!(game.balance(0), 1440);
    assert_eq!(game.registry().owner_of(0), Some(0));
    assert_eq!(game.properties_of(0), vec![0]);
    assert_eq!(game.ledger().transactions().len(), 1);
}

#[test]
fn test_unpaid_rent_bankrupts_and_removes_from_rotation() {
    let config = GameConfig {
        starting_balance: 65,
        ..Default::default()
    };
    let rolls = vec![Roll(1, 2), Roll(2, 3), Roll(3, 4), Roll(1, 1)];
    let mut game = GameSession::new(config, buyers(3), &small_board())
        .unwrap()
        .with_dice(Dice::loaded(rolls));

    // Player 1 buys at 3, player 2 buys at 5, player 3 lands on parking
    for _ in 0..3 {
        game.play_one_turn().unwrap();
    }
    assert_eq!(game.balance(0), 5);
    assert_eq!(game.registry().owner_of(1), Some(1));

    // Player 1 lands on player 2's property owing 8 with only 5
    let events = game.play_one_turn().unwrap();
    assert!(events.contains(&GameEvent::PlayerBankrupt {
        player: 0,
        owed: 8,
        released: vec![0],
    }));
    assert!(game.players()[0].is_bankrupt());
    assert_eq!(game.balance(0), 0);
    assert!(game.properties_of(0).is_empty());
    assert_eq!(game.registry().owner_of(0), None);
    assert_eq!(game.balance(1), 5);
    assert!(!game.is_game_over());

    let mut started = Vec::new();
    for _ in 0..6 {
        let events = game.play_one_turn().unwrap();
        started.extend(started_players(&events));
    }
    assert_eq!(started, vec![1, 2, 1, 2, 1, 2]);
    assert!(game.valid_actions(0).is_empty());
    assert_eq!(
        game.apply_action(0, GameAction::Mortgage(0)),
        Err(GameError::PlayerBankrupt(0))
    );
}

#[test]
fn test_three_doubles_send_player_to_jail() {
    let config = GameConfig {
        auctions_enabled: false,
        ..Default::default()
    };
    let rolls = vec![Roll(1, 1), Roll(3, 3), Roll(2, 2), Roll(1, 2)];
    let mut game = GameSession::new(config, buyers(2), &small_board())
        .unwrap()
        .with_dice(Dice::loaded(rolls));

    let events = game.play_one_turn().unwrap();

    let jail = game.board().jail_position();
    assert_eq!(game.players()[0].position, jail);
    assert!(game.players()[0].in_jail);
    assert!(events.contains(&GameEvent::PlayerJailed {
        player: 0,
        reason: JailReason::TripleDoubles,
    }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::ExtraTurn { .. }))
            .count(),
        2
    );
    assert_eq!(game.current_player(), 1);
}

#[test]
fn test_trade_with_impossible_leg_moves_nothing() {
    let (_board, mut registry) = small_board().build().unwrap();
    let players: Vec<Player> = (0..2).map(|i| Player::new(i, format!("P{i}"))).collect();
    let mut ledger = Ledger::new(2, 1500, 1_000_000);
    registry.assign(0, 0).unwrap();
    registry.assign(1, 1).unwrap();

    let mut desk = TradeDesk::new();
    let offer = TradeOffer::new(0, 1)
        .offering([0])
        .offering_money(100)
        .requesting([1])
        .requesting_money(300);
    let id = desk.submit(offer, &players, &ledger, &registry).unwrap();

    // Player 2 spends the money before accepting
    ledger.debit(1, 1300, "Spent").unwrap();
    let before = ledger.transactions().len();

    let err = desk.accept(id, &players, &mut ledger, &mut registry).unwrap_err();
    assert_eq!(
        err,
        TradeError::InsufficientFunds {
            player: 1,
            needed: 300,
            available: 200,
        }
    );
    assert_eq!(ledger.balance(0), 1500);
    assert_eq!(ledger.balance(1), 200);
    assert_eq!(registry.owner_of(0), Some(0));
    assert_eq!(registry.owner_of(1), Some(1));
    assert_eq!(ledger.transactions().len(), before);
    assert!(desk.get(id).is_none());
}

#[test]
fn test_auction_highest_bid_wins() {
    let mut ledger = Ledger::new(3, 1500, 1_000_000);
    ledger.debit(2, 1450, "Spent").unwrap();

    let mut auction = Auction::start(0, vec![0, 1, 2]);
    auction.place_bid(&ledger, 0, 100).unwrap();
    auction.place_bid(&ledger, 1, 120).unwrap();

    assert!(auction.place_bid(&ledger, 0, 120).is_err());
    assert!(auction.place_bid(&ledger, 0, 90).is_err());
    assert_eq!(
        auction.place_bid(&ledger, 2, 130),
        Err(AuctionError::CannotAfford { player: 2, bid: 130 })
    );

    assert_eq!(auction.close(), Some(Bid { player: 1, amount: 120 }));
}

#[test]
fn test_bot_game_keeps_invariants() {
    let seats = (0..4)
        .map(|i| {
            PlayerSeat::new(
                format!("Bot {}", i + 1),
                Bot::with_seed(BotStrategy::for_seat(i), i as u64).adaptive(),
            )
        })
        .collect();
    let mut game = GameSession::new(GameConfig::default(), seats, &BoardConfig::standard())
        .unwrap()
        .with_dice(Dice::seeded(42));

    let mut turns = 0;
    while !game.is_game_over() && turns < 2000 {
        game.play_one_turn().unwrap();
        turns += 1;

        for prop in game.registry().iter() {
            if let Some(owner) = prop.owner {
                assert!(game.players()[owner as usize].is_active());
            }
            assert!(prop.build_level <= 5);
            assert!(!(prop.mortgaged && prop.build_level > 0));
        }
        for player in game.players().iter().filter(|p| p.is_bankrupt()) {
            assert_eq!(game.balance(player.id), 0);
        }
        if !game.is_game_over() {
            assert!(game.players()[game.current_player() as usize].is_active());
        }
    }

    if game.is_game_over() {
        let winner = game.winner().unwrap();
        assert!(game.players()[winner as usize].is_active());
        assert_eq!(game.active_players().count(), 1);
    }
}

#[test]
fn test_game_config_from_json() {
    let config = GameConfig::from_json(r#"{"starting_balance": 2000}"#).unwrap();
    let game = GameSession::new(config, buyers(2), &BoardConfig::standard()).unwrap();
    assert_eq!(game.balance(0), 2000);
    assert_eq!(game.board().size(), 40);
    assert_eq!(game.registry().len(), 28);
}
