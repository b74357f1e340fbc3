// codebreaker_analytics — round statistics aggregation.
//
// The session engine reports three lifecycle events per round — start,
// validated guess, end — and this crate turns them into the operator-facing
// report served on the admin channel. The aggregator is an explicitly owned
// handle (`Arc<Analytics>`) injected into each session's lifecycle at
// construction; there is no global state.
//
// Interior locking uses a single `RwLock`: event recording takes the write
// lock for O(1) bookkeeping, report generation takes the read lock. Sessions
// running concurrently interleave safely because every event call names its
// round via the `RoundToken` returned by `round_start`.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use codebreaker_protocol::types::{Code, PlayerId};

/// Opaque handle naming one round inside the aggregator.
#[derive(Clone, Copy, Debug)]
pub struct RoundToken(usize);

/// The injected statistics aggregator.
pub struct Analytics {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    rounds: Vec<RoundRecord>,
    rounds_won: u32,
    guess_counts: HashMap<u16, u32>,
    players: HashMap<u32, PlayerRecord>,
}

struct RoundRecord {
    code: Code,
    guesses: u32,
    won: bool,
    started: Instant,
    ended: Option<Instant>,
    player_count: usize,
    per_player: HashMap<u32, u32>,
}

#[derive(Default)]
struct PlayerRecord {
    rounds_played: u32,
    rounds_won: u32,
    total_guesses: u32,
    /// Fewest guesses in a won round; 0 means never won.
    best_win: u32,
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Begin tracking a round. Called exactly once per round start.
    pub fn round_start(&self, code: Code, player_count: usize) -> RoundToken {
        let mut inner = self.write();
        inner.rounds.push(RoundRecord {
            code,
            guesses: 0,
            won: false,
            started: Instant::now(),
            ended: None,
            player_count,
            per_player: HashMap::new(),
        });
        RoundToken(inner.rounds.len() - 1)
    }

    /// Record one validated guess.
    pub fn record_guess(&self, token: RoundToken, player: PlayerId, guess: Code) {
        let mut inner = self.write();
        *inner.guess_counts.entry(guess.0).or_default() += 1;
        inner.players.entry(player.0).or_default().total_guesses += 1;
        if let Some(round) = inner.rounds.get_mut(token.0) {
            round.guesses += 1;
            *round.per_player.entry(player.0).or_default() += 1;
        }
    }

    /// Finish a round. `winner` is `None` for an abandoned round.
    pub fn round_end(&self, token: RoundToken, winner: Option<PlayerId>) {
        let mut inner = self.write();
        let Some(round) = inner.rounds.get_mut(token.0) else {
            return;
        };
        round.ended = Some(Instant::now());
        round.won = winner.is_some();
        let participants: Vec<(u32, u32)> =
            round.per_player.iter().map(|(&id, &n)| (id, n)).collect();

        if let Some(winner) = winner {
            inner.rounds_won += 1;
            let win_guesses = participants
                .iter()
                .find(|&&(id, _)| id == winner.0)
                .map_or(0, |&(_, n)| n);
            let record = inner.players.entry(winner.0).or_default();
            record.rounds_won += 1;
            if record.best_win == 0 || (win_guesses > 0 && win_guesses < record.best_win) {
                record.best_win = win_guesses;
            }
        }
        for (id, _) in participants {
            inner.players.entry(id).or_default().rounds_played += 1;
        }
    }

    /// Aggregate totals and averages across all rounds.
    pub fn overall(&self) -> OverallStats {
        let inner = self.read();
        let rounds_played = inner.rounds.len() as u32;

        let mut total_guesses = 0u32;
        let mut win_guesses = 0u32;
        let mut total_players = 0usize;
        let mut total_duration = Duration::ZERO;
        let mut seen = HashSet::new();

        for round in &inner.rounds {
            total_guesses += round.guesses;
            if round.won {
                win_guesses += round.guesses;
            }
            total_players += round.player_count;
            seen.extend(round.per_player.keys().copied());
            if let Some(ended) = round.ended {
                total_duration += ended.duration_since(round.started);
            }
        }

        let per = |sum: f64, n: u32| if n > 0 { sum / f64::from(n) } else { 0.0 };
        OverallStats {
            rounds_played,
            rounds_won: inner.rounds_won,
            avg_guesses_per_round: per(f64::from(total_guesses), rounds_played),
            avg_guesses_per_win: per(f64::from(win_guesses), inner.rounds_won),
            unique_players: seen.len(),
            avg_players_per_round: per(total_players as f64, rounds_played),
            avg_round_secs: per(total_duration.as_secs_f64(), rounds_played),
        }
    }

    /// The `n` codes that took the most guesses on average across won rounds.
    pub fn hardest_codes(&self, n: usize) -> Vec<CodeDifficulty> {
        let inner = self.read();
        let mut per_code: HashMap<u16, (u32, u32)> = HashMap::new();
        for round in &inner.rounds {
            if round.won {
                let entry = per_code.entry(round.code.0).or_default();
                entry.0 += round.guesses;
                entry.1 += 1;
            }
        }
        let mut stats: Vec<CodeDifficulty> = per_code
            .into_iter()
            .map(|(code, (guesses, rounds))| CodeDifficulty {
                code: Code(code),
                avg_guesses: f64::from(guesses) / f64::from(rounds),
                rounds,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.avg_guesses
                .total_cmp(&a.avg_guesses)
                .then(a.code.cmp(&b.code))
        });
        stats.truncate(n);
        stats
    }

    /// The `n` most frequently guessed values.
    pub fn common_guesses(&self, n: usize) -> Vec<GuessFrequency> {
        let inner = self.read();
        let mut guesses: Vec<GuessFrequency> = inner
            .guess_counts
            .iter()
            .map(|(&guess, &count)| GuessFrequency {
                guess: Code(guess),
                count,
            })
            .collect();
        guesses.sort_by(|a, b| b.count.cmp(&a.count).then(a.guess.cmp(&b.guess)));
        guesses.truncate(n);
        guesses
    }

    /// The `n` players with the best win rate (ties broken by total wins).
    pub fn top_players(&self, n: usize) -> Vec<PlayerRanking> {
        let inner = self.read();
        let mut rankings: Vec<PlayerRanking> = inner
            .players
            .iter()
            .filter(|(_, r)| r.rounds_played > 0)
            .map(|(&id, r)| PlayerRanking {
                player: PlayerId(id),
                win_rate: f64::from(r.rounds_won) / f64::from(r.rounds_played),
                rounds_won: r.rounds_won,
                total_guesses: r.total_guesses,
                best_win: r.best_win,
            })
            .collect();
        rankings.sort_by(|a, b| {
            b.win_rate
                .total_cmp(&a.win_rate)
                .then(b.rounds_won.cmp(&a.rounds_won))
                .then(a.player.cmp(&b.player))
        });
        rankings.truncate(n);
        rankings
    }

    /// The operator-facing plain-text report served on the admin channel.
    pub fn report(&self) -> String {
        let overall = self.overall();
        let hardest = self.hardest_codes(5);
        let common = self.common_guesses(5);
        let top = self.top_players(5);

        let win_pct = if overall.rounds_played > 0 {
            f64::from(overall.rounds_won) / f64::from(overall.rounds_played) * 100.0
        } else {
            0.0
        };

        let mut report = String::from("=== CODE BREAKER GAME ANALYTICS ===\n\n");
        report.push_str("OVERALL STATISTICS:\n");
        report.push_str(&format!("Games Played: {}\n", overall.rounds_played));
        report.push_str(&format!(
            "Games Won: {} ({win_pct:.1}%)\n",
            overall.rounds_won
        ));
        report.push_str(&format!(
            "Average Guesses Per Game: {:.2}\n",
            overall.avg_guesses_per_round
        ));
        report.push_str(&format!(
            "Average Guesses Per Win: {:.2}\n",
            overall.avg_guesses_per_win
        ));
        report.push_str(&format!(
            "Total Unique Players: {}\n",
            overall.unique_players
        ));
        report.push_str(&format!(
            "Average Players Per Game: {:.2}\n",
            overall.avg_players_per_round
        ));
        report.push_str(&format!(
            "Average Game Duration: {:.0}s\n\n",
            overall.avg_round_secs
        ));

        report.push_str("TOP 5 HARDEST NUMBERS TO GUESS:\n");
        if hardest.is_empty() {
            report.push_str("No data available yet\n");
        } else {
            for (i, entry) in hardest.iter().enumerate() {
                report.push_str(&format!(
                    "{}. Number {} - {:.2} guesses on average (appeared {} times)\n",
                    i + 1,
                    entry.code,
                    entry.avg_guesses,
                    entry.rounds
                ));
            }
        }
        report.push('\n');

        report.push_str("TOP 5 MOST COMMON GUESSES:\n");
        if common.is_empty() {
            report.push_str("No data available yet\n");
        } else {
            for (i, entry) in common.iter().enumerate() {
                report.push_str(&format!(
                    "{}. {} - guessed {} times\n",
                    i + 1,
                    entry.guess,
                    entry.count
                ));
            }
        }
        report.push('\n');

        report.push_str("TOP 5 PLAYERS BY WIN RATE:\n");
        if top.is_empty() {
            report.push_str("No data available yet\n");
        } else {
            for (i, entry) in top.iter().enumerate() {
                report.push_str(&format!(
                    "{}. Player {} - {:.1}% win rate ({} wins)\n",
                    i + 1,
                    entry.player,
                    entry.win_rate * 100.0,
                    entry.rounds_won
                ));
            }
        }

        report
    }

    /// The same summary as `report`, serialized as JSON.
    pub fn report_json(&self) -> String {
        let summary = Summary {
            overall: self.overall(),
            hardest_codes: self.hardest_codes(5),
            common_guesses: self.common_guesses(5),
            top_players: self.top_players(5),
        };
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".into())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate totals across all rounds.
#[derive(Clone, Debug, Serialize)]
pub struct OverallStats {
    pub rounds_played: u32,
    pub rounds_won: u32,
    pub avg_guesses_per_round: f64,
    pub avg_guesses_per_win: f64,
    pub unique_players: usize,
    pub avg_players_per_round: f64,
    pub avg_round_secs: f64,
}

/// How hard one code value proved to guess.
#[derive(Clone, Debug, Serialize)]
pub struct CodeDifficulty {
    pub code: Code,
    pub avg_guesses: f64,
    pub rounds: u32,
}

/// How often one value was guessed.
#[derive(Clone, Debug, Serialize)]
pub struct GuessFrequency {
    pub guess: Code,
    pub count: u32,
}

/// One player's standing in the win-rate ranking.
#[derive(Clone, Debug, Serialize)]
pub struct PlayerRanking {
    pub player: PlayerId,
    pub win_rate: f64,
    pub rounds_won: u32,
    pub total_guesses: u32,
    /// Fewest guesses in a won round; 0 means never won.
    pub best_win: u32,
}

#[derive(Serialize)]
struct Summary {
    overall: OverallStats,
    hardest_codes: Vec<CodeDifficulty>,
    common_guesses: Vec<GuessFrequency>,
    top_players: Vec<PlayerRanking>,
}
