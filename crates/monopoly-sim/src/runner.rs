//! Bot-only games and their results.

use crate::settings::SimSettings;
use crate::sinks::{Statistics, TracingSink};
use monopoly_core::{
    BoardConfig, Bot, BotStrategy, Dice, GameConfig, GameError, GameSession, Money, PlayerId,
    PlayerSeat,
};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a single game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameReport {
    pub game: u32,
    pub turns: u32,
    pub winner: Option<PlayerId>,
    /// False if the turn limit ran out first
    pub finished: bool,
    pub final_balances: Vec<Money>,
    pub stats: Statistics,
}

/// Results over every game of a run
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub games: u32,
    pub finished: u32,
    pub abandoned: u32,
    pub average_turns: f64,
    pub seats: Vec<String>,
    pub stats: Statistics,
}

/// Plays a batch of games between bots
pub struct Simulation {
    settings: SimSettings,
    config: GameConfig,
    board: BoardConfig,
}

impl Simulation {
    pub fn new(settings: SimSettings, config: GameConfig, board: BoardConfig) -> Self {
        Self {
            settings,
            config,
            board,
        }
    }

    /// Seat labels, in seat order
    pub fn seat_names(&self) -> Vec<String> {
        (0..self.settings.players)
            .map(|seat| {
                let (strategy, adaptive) = seat_strategy(seat);
                if adaptive {
                    format!("Adaptive {}", seat + 1)
                } else {
                    format!("{:?} {}", strategy, seat + 1)
                }
            })
            .collect()
    }

    fn seats(&self, game: u32) -> Vec<PlayerSeat> {
        self.seat_names()
            .into_iter()
            .enumerate()
            .map(|(seat, name)| {
                let (strategy, adaptive) = seat_strategy(seat);
                let bot = match self.settings.seed {
                    Some(seed) => Bot::with_seed(strategy, mix(seed, game, seat as u64 + 1)),
                    None => Bot::new(strategy),
                };
                let bot = if adaptive { bot.adaptive() } else { bot };
                PlayerSeat::new(name, bot)
            })
            .collect()
    }

    /// Play one game to the end or to the turn limit
    pub fn run_game(&self, game: u32) -> Result<GameReport, GameError> {
        let dice = match self.settings.seed {
            Some(seed) => Dice::seeded(mix(seed, game, 0)),
            None => Dice::from_entropy(),
        };
        let mut session =
            GameSession::new(self.config.clone(), self.seats(game), &self.board)?.with_dice(dice);
        session.add_sink(TracingSink::new(game));

        let mut stats = Statistics::new(self.settings.players);
        while !session.is_game_over() && session.turn() < self.settings.max_turns {
            for event in session.play_one_turn()? {
                stats.record(&event);
            }
        }

        let finished = session.is_game_over();
        if finished {
            info!(
                "[game {}] finished in {} turns, winner {:?}",
                game,
                session.turn(),
                session.winner()
            );
        } else {
            warn!("[game {}] abandoned after {} turns", game, session.turn());
        }

        Ok(GameReport {
            game,
            turns: session.turn(),
            winner: session.winner(),
            finished,
            final_balances: session.players().iter().map(|p| session.balance(p.id)).collect(),
            stats,
        })
    }

    /// Play every game and fold the results
    pub fn run(&self) -> Result<Summary, GameError> {
        let mut summary = Summary {
            games: 0,
            finished: 0,
            abandoned: 0,
            average_turns: 0.0,
            seats: self.seat_names(),
            stats: Statistics::new(self.settings.players),
        };

        let mut total_turns = 0u64;
        for game in 1..=self.settings.games {
            let report = self.run_game(game)?;
            summary.games += 1;
            if report.finished {
                summary.finished += 1;
            } else {
                summary.abandoned += 1;
            }
            total_turns += u64::from(report.turns);
            summary.stats.merge(&report.stats);
        }

        if summary.games > 0 {
            summary.average_turns = total_turns as f64 / f64::from(summary.games);
        }
        Ok(summary)
    }
}

/// Every fourth seat plays adaptively, the rest cycle through the fixed styles
fn seat_strategy(seat: usize) -> (BotStrategy, bool) {
    if seat % 4 == 3 {
        (BotStrategy::Aggressive, true)
    } else {
        (BotStrategy::for_seat(seat), false)
    }
}

/// Derive a distinct seed per game and stream
fn mix(seed: u64, game: u32, stream: u64) -> u64 {
    seed ^ (u64::from(game) << 32) ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
