// Session lifecycle: forming, rounds, and restart negotiation.
//
// One thread per session runs `run_session`. The connection gate seats
// players directly into the shared `Session` and forwards a `JoinEvent`
// (carrying the player's inbox) over an `mpsc` channel; seating and the
// event send happen under one lock hold, so a join can never be observed by
// the roster but missed by this thread.
//
// Phases move strictly forward except for the restart loop:
//
//   Forming -> Active -> Ended -> Negotiating -> Active | Terminated
//
// Forming ends when the session fills or the forming deadline expires; an
// under-populated session at the deadline is turned away. After each round
// every player is asked to stay, leavers are dismissed, and a fresh round
// starts if enough players remain.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use codebreaker_analytics::Analytics;
use codebreaker_codegen::{CodeRng, next_code};
use codebreaker_protocol::text;
use codebreaker_protocol::types::PlayerId;

use crate::negotiate::negotiate;
use crate::player::PlayerInbox;
use crate::session::{Phase, SharedSession, lock_session};
use crate::turn::{RoundOutcome, run_round};

/// Sent by the gate when it seats a player into this session.
pub struct JoinEvent {
    pub player_id: PlayerId,
    pub inbox: PlayerInbox,
    pub now_full: bool,
}

#[derive(Clone)]
pub struct LifecycleConfig {
    pub turn_timeout: Duration,
    pub forming_timeout: Duration,
    pub decision_timeout: Duration,
    pub code_seed: Option<u64>,
}

/// Drive one session from forming to termination.
pub fn run_session(
    session: SharedSession,
    joins: Receiver<JoinEvent>,
    config: LifecycleConfig,
    analytics: Arc<Analytics>,
) {
    let mut inboxes: HashMap<u32, PlayerInbox> = HashMap::new();
    let min_players = lock_session(&session).min_players();

    if !form(&session, &joins, &config, &mut inboxes, min_players) {
        let mut s = lock_session(&session);
        s.broadcast(&text::not_enough_to_start());
        s.shutdown();
        info!("session terminated before starting");
        return;
    }

    {
        let mut s = lock_session(&session);
        s.phase = Phase::Active;
    }
    // Joins seated between our last recv and the phase flip are still in
    // the channel; collect their inboxes before play starts.
    while let Ok(event) = joins.try_recv() {
        inboxes.insert(event.player_id.0, event.inbox);
    }

    let mut rng = match config.code_seed {
        Some(seed) => CodeRng::new(seed),
        None => CodeRng::from_entropy(),
    };

    loop {
        let secret = next_code(&mut rng);
        let player_count = {
            let mut s = lock_session(&session);
            s.phase = Phase::Active;
            s.begin_round(config.turn_timeout.as_secs());
            s.player_count()
        };
        debug!(%secret, player_count, "round starting");

        let token = analytics.round_start(secret, player_count);
        let outcome = run_round(
            &session,
            &mut inboxes,
            secret,
            config.turn_timeout,
            &analytics,
            token,
        );

        match outcome {
            RoundOutcome::Won { winner, .. } => {
                analytics.round_end(token, Some(winner));
                let mut s = lock_session(&session);
                s.phase = Phase::Ended;
            }
            RoundOutcome::Abandoned => {
                analytics.round_end(token, None);
                let mut s = lock_session(&session);
                s.broadcast(&text::secret_was(secret));
                s.broadcast(&text::game_over());
                s.shutdown();
                info!("session terminated after abandoned round");
                return;
            }
        }

        {
            let mut s = lock_session(&session);
            s.phase = Phase::Negotiating;
        }
        let staying = negotiate(&session, &mut inboxes, config.decision_timeout);

        if staying.len() >= min_players {
            let mut s = lock_session(&session);
            for id in s.dismiss_not_continuing() {
                inboxes.remove(&id.0);
            }
            if s.is_single() {
                s.broadcast(&text::restarting_single());
            } else {
                s.broadcast(&text::restarting(staying.len()));
            }
        } else {
            let mut s = lock_session(&session);
            s.broadcast(&text::not_enough_to_continue());
            s.broadcast(&text::goodbye());
            s.shutdown();
            info!("session terminated after negotiation");
            return;
        }
    }
}

/// Wait out the forming phase. Returns true if the session should start.
fn form(
    session: &SharedSession,
    joins: &Receiver<JoinEvent>,
    config: &LifecycleConfig,
    inboxes: &mut HashMap<u32, PlayerInbox>,
    min_players: usize,
) -> bool {
    let deadline = Instant::now() + config.forming_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match joins.recv_timeout(remaining) {
            Ok(event) => {
                inboxes.insert(event.player_id.0, event.inbox);
                if event.now_full {
                    return true;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                return lock_session(session).player_count() >= min_players;
            }
            // Gate shut down while we were still forming.
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}
