// Session state for one table of players.
//
// `Session` is shared between the connection gate (which seats new players
// while the session is forming) and the session's lifecycle thread (which
// drives rounds and negotiation), so it lives behind an `Arc<Mutex<_>>`.
// The lock is only ever held for O(1) bookkeeping and buffered writes —
// never across a channel read — so neither side can stall the other.
//
// Writing to player streams: `Session` holds the buffered write half of
// each socket. Write errors on one player are logged and swallowed — that
// player's reader thread detects the broken pipe and reports them gone.

use std::net::TcpStream;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use codebreaker_protocol::text;
use codebreaker_protocol::types::PlayerId;

use crate::player::{Connection, Player};

/// Where a session is in its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Accepting players until full or the forming deadline.
    Forming,
    /// A round is in progress.
    Active,
    /// A round just finished; results announced.
    Ended,
    /// Asking players whether to play another round.
    Negotiating,
    /// Done. The gate reaps terminated sessions on the next accept.
    Terminated,
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Lock the session, recovering the guard if a holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What `add_player` tells the gate about a successful seat.
pub struct JoinInfo {
    pub id: PlayerId,
    /// True exactly once, on the join that reached capacity.
    pub now_full: bool,
}

pub struct Session {
    pub phase: Phase,
    players: Vec<Player>,
    next_player_id: u32,
    capacity: usize,
    filled_signalled: bool,
}

impl Session {
    pub fn new(capacity: usize) -> Self {
        Self {
            phase: Phase::Forming,
            players: Vec::new(),
            next_player_id: 1,
            capacity,
            filled_signalled: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A one-seat session plays against the computer with hints.
    pub fn is_single(&self) -> bool {
        self.capacity == 1
    }

    /// Fewest players a round can start or continue with.
    pub fn min_players(&self) -> usize {
        if self.is_single() { 1 } else { 2 }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn can_accept(&self) -> bool {
        self.phase == Phase::Forming && self.players.len() < self.capacity
    }

    /// Seat a new player: assign the next ordinal, greet them, and announce
    /// the join to everyone already seated.
    ///
    /// The caller must hold the lock across `can_accept` and this call, and
    /// must forward the returned `JoinInfo` to the lifecycle thread under
    /// the same hold so the join event cannot be lost.
    pub fn add_player(&mut self, stream: TcpStream) -> std::io::Result<JoinInfo> {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let name = format!("Player {id}");
        let mut conn = Connection::new(stream)?;

        let joined = self.players.len() + 1;
        if self.is_single() {
            conn.send_line(&text::welcome_single(&name));
        } else {
            conn.send_line(&text::welcome_multi(&name, joined, self.capacity));
            let announce = text::player_joined(&name, joined, self.capacity);
            self.broadcast(&announce);
        }

        self.players.push(Player {
            id,
            name,
            continuing: true,
            conn,
        });

        let now_full = self.players.len() == self.capacity && !self.filled_signalled;
        if now_full {
            self.filled_signalled = true;
        }
        Ok(JoinInfo { id, now_full })
    }

    /// Drop a player from the roster, closing their socket. Returns the
    /// roster index they occupied so the turn order can be adjusted.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<usize> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        let mut player = self.players.remove(idx);
        player.conn.close();
        Some(idx)
    }

    /// Roster snapshot in turn order.
    pub fn roster(&self) -> Vec<(PlayerId, String)> {
        self.players
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect()
    }

    pub fn player_name(&self, id: PlayerId) -> Option<String> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
    }

    pub fn set_continuing(&mut self, id: PlayerId, continuing: bool) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.continuing = continuing;
        }
    }

    /// Dismiss every player who chose not to continue: say goodbye, close
    /// their socket, and return their IDs so inboxes can be dropped too.
    pub fn dismiss_not_continuing(&mut self) -> Vec<PlayerId> {
        let mut dismissed = Vec::new();
        self.players.retain_mut(|p| {
            if p.continuing {
                return true;
            }
            p.conn.send_line(&text::goodbye());
            p.conn.close();
            dismissed.push(p.id);
            false
        });
        dismissed
    }

    /// Round-start announcements: mode banner, rules, roster, and the
    /// per-guess time limit.
    pub fn begin_round(&mut self, turn_secs: u64) {
        if self.is_single() {
            self.broadcast(&text::starting_single());
            self.broadcast(&text::rules());
        } else {
            self.broadcast(&text::starting_multi(self.players.len()));
            self.broadcast(&text::rules_turns());
            self.broadcast(&text::player_list_header());
            let names: Vec<String> = self.players.iter().map(|p| p.name.clone()).collect();
            for name in names {
                self.broadcast(&text::player_list_entry(&name));
            }
        }
        self.broadcast(&text::turn_seconds(turn_secs));
    }

    /// Prompt the current player and tell everyone else who they are
    /// waiting on, in one atomic pass over the roster.
    pub fn announce_turn(&mut self, current: PlayerId) {
        let waiting = self
            .player_name(current)
            .map(|name| text::waiting_for(&name));
        for player in &mut self.players {
            if player.id == current {
                player.conn.send_line(&text::your_turn());
            } else if let Some(line) = &waiting {
                player.conn.send_line(line);
            }
        }
    }

    pub fn send_to(&mut self, id: PlayerId, line: &str) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.conn.send_line(line);
        }
    }

    pub fn broadcast(&mut self, line: &str) {
        for player in &mut self.players {
            player.conn.send_line(line);
        }
    }

    /// Close every socket and mark the session terminated.
    pub fn shutdown(&mut self) {
        for player in &mut self.players {
            player.conn.close();
        }
        self.players.clear();
        self.phase = Phase::Terminated;
    }
}
