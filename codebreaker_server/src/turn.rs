// Round-robin turn coordination for one round.
//
// `run_round` owns the guessing loop: it announces whose turn it is, waits
// on that player's inbox against an absolute per-turn deadline, and applies
// the outcome. The session lock is taken once per announcement or result,
// never across a read, so disconnect handling and broadcasts stay
// responsive while a player thinks.
//
// Deadline rules:
// - Invalid input re-prompts the same player against the SAME deadline.
// - A timeout forfeits the turn in multiplayer (no guess recorded) and
//   re-prompts in single-player.
// - Input that arrives after the deadline expired is stale and discarded
//   (the inbox's generation tag handles this).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use codebreaker_analytics::{Analytics, RoundToken};
use codebreaker_codegen::hint;
use codebreaker_protocol::guess::parse_guess;
use codebreaker_protocol::text;
use codebreaker_protocol::types::{Code, PlayerId};

use crate::player::{PlayerInbox, Received};
use crate::session::{SharedSession, lock_session};

/// How one round finished.
#[derive(Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Won {
        winner: PlayerId,
        code: Code,
        total_guesses: u32,
    },
    /// Disconnects dropped the roster below the minimum.
    Abandoned,
}

/// What one turn window produced.
enum Turn {
    Correct,
    Incorrect(Code),
    TimedOut,
    Gone,
}

/// Drive one round to completion.
pub fn run_round(
    session: &SharedSession,
    inboxes: &mut HashMap<u32, PlayerInbox>,
    secret: Code,
    turn_timeout: Duration,
    analytics: &Analytics,
    token: RoundToken,
) -> RoundOutcome {
    let mut tally: u32 = 0;
    let mut current = 0usize;

    loop {
        let (turn_id, turn_name, single) = {
            let mut s = lock_session(session);
            let roster = s.roster();
            if roster.len() < s.min_players() {
                return RoundOutcome::Abandoned;
            }
            current %= roster.len();
            let (id, name) = roster[current].clone();
            s.announce_turn(id);
            (id, name, s.is_single())
        };

        let outcome = match inboxes.get(&turn_id.0) {
            Some(inbox) => await_guess(session, inbox, turn_id, secret, turn_timeout),
            None => Turn::Gone,
        };

        match outcome {
            Turn::Correct => {
                tally += 1;
                analytics.record_guess(token, turn_id, secret);
                info!(winner = %turn_id, guesses = tally, "round won");

                let mut s = lock_session(session);
                s.send_to(turn_id, &text::congratulations());
                s.send_to(turn_id, &text::you_won(secret));
                let announce = text::player_won(&turn_name, secret);
                for (id, _) in s.roster() {
                    if id != turn_id {
                        s.send_to(id, &announce);
                    }
                }
                s.broadcast(&text::total_guesses(tally));
                return RoundOutcome::Won {
                    winner: turn_id,
                    code: secret,
                    total_guesses: tally,
                };
            }
            Turn::Incorrect(guess) => {
                tally += 1;
                analytics.record_guess(token, turn_id, guess);

                let mut s = lock_session(session);
                if single {
                    s.send_to(turn_id, &text::incorrect_single(guess, tally));
                    let h = hint(guess, secret);
                    s.send_to(turn_id, &text::hint(h.in_place, h.misplaced));
                    s.send_to(turn_id, &text::incorrect());
                    // Same player goes again with a fresh window.
                } else {
                    s.broadcast(&text::incorrect_multi(&turn_name, guess, tally));
                    current += 1;
                }
            }
            Turn::TimedOut => {
                let mut s = lock_session(session);
                if single {
                    s.send_to(turn_id, &text::timed_out_retry(turn_timeout.as_secs()));
                } else {
                    debug!(player = %turn_id, "turn forfeited on timeout");
                    s.send_to(turn_id, &text::timed_out_forfeit(turn_timeout.as_secs()));
                    let announce = text::forfeited(&turn_name);
                    for (id, _) in s.roster() {
                        if id != turn_id {
                            s.send_to(id, &announce);
                        }
                    }
                    current += 1;
                }
            }
            Turn::Gone => {
                inboxes.remove(&turn_id.0);
                let mut s = lock_session(session);
                if let Some(idx) = s.remove_player(turn_id) {
                    if idx < current {
                        current -= 1;
                    }
                }
                let remaining = s.player_count();
                info!(player = %turn_id, remaining, "player disconnected mid-round");
                if remaining < s.min_players() {
                    if remaining > 0 {
                        s.broadcast(&text::disconnected_not_enough(&turn_name));
                    }
                    return RoundOutcome::Abandoned;
                }
                s.broadcast(&text::disconnected_continue(&turn_name, remaining));
                // `current` now points at the next player in order.
            }
        }
    }
}

/// Wait out one turn window for `turn_id`. Invalid lines re-prompt against
/// the same deadline; only a well-formed guess, a timeout, or a disconnect
/// ends the window.
fn await_guess(
    session: &SharedSession,
    inbox: &PlayerInbox,
    turn_id: PlayerId,
    secret: Code,
    turn_timeout: Duration,
) -> Turn {
    let deadline = Instant::now() + turn_timeout;
    loop {
        match inbox.recv_until(deadline) {
            Received::Line(line) => match parse_guess(&line) {
                Ok(guess) if guess == secret => return Turn::Correct,
                Ok(guess) => return Turn::Incorrect(guess),
                Err(e) => {
                    let mut s = lock_session(session);
                    s.send_to(turn_id, &e.to_string());
                    s.send_to(turn_id, &text::try_again_prompt());
                }
            },
            Received::TimedOut => return Turn::TimedOut,
            Received::Gone => return Turn::Gone,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, BufWriter, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};

    use codebreaker_protocol::framing::read_trimmed_line;

    use crate::player::spawn_reader;
    use crate::session::Session;

    use super::*;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    /// Seat `n` players, returning client-side streams and the inbox map.
    fn seated(n: usize) -> (SharedSession, Vec<TcpStream>, HashMap<u32, PlayerInbox>) {
        let mut session = Session::new(n);
        let mut clients = Vec::new();
        let mut inboxes = HashMap::new();
        for _ in 0..n {
            let (client, server) = tcp_pair();
            let inbox = spawn_reader(server.try_clone().unwrap());
            let info = session.add_player(server).unwrap();
            inboxes.insert(info.id.0, inbox);
            clients.push(client);
        }
        (Arc::new(Mutex::new(session)), clients, inboxes)
    }

    fn send(client: &TcpStream, line: &str) {
        let mut writer = BufWriter::new(client.try_clone().unwrap());
        writeln!(writer, "{line}").unwrap();
        writer.flush().unwrap();
    }

    fn lines_until(reader: &mut BufReader<TcpStream>, needle: &str) -> String {
        loop {
            let line = read_trimmed_line(reader).unwrap().expect("stream closed");
            if line.contains(needle) {
                return line;
            }
        }
    }

    fn run(
        session: &SharedSession,
        inboxes: &mut HashMap<u32, PlayerInbox>,
        secret: Code,
        timeout: Duration,
    ) -> RoundOutcome {
        let analytics = Analytics::new();
        let token = analytics.round_start(secret, lock_session(session).player_count());
        run_round(session, inboxes, secret, timeout, &analytics, token)
    }

    #[test]
    fn single_player_wrong_then_right_counts_both_guesses() {
        let (session, clients, mut inboxes) = seated(1);
        send(&clients[0], "1111");
        send(&clients[0], "4321");

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_secs(5));
        assert_eq!(
            outcome,
            RoundOutcome::Won {
                winner: PlayerId(1),
                code: Code(4321),
                total_guesses: 2,
            }
        );

        let mut reader = BufReader::new(clients[0].try_clone().unwrap());
        lines_until(&mut reader, "You guessed 1111 (incorrect). Total guesses: 1");
        lines_until(&mut reader, "Hint:");
        lines_until(&mut reader, "Congratulations!");
        lines_until(&mut reader, "Total guesses: 2");
    }

    #[test]
    fn turns_rotate_in_join_order() {
        let (session, clients, mut inboxes) = seated(3);
        send(&clients[0], "1111");
        send(&clients[1], "2222");
        send(&clients[2], "3333");
        send(&clients[0], "4321");

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_secs(5));
        assert_eq!(
            outcome,
            RoundOutcome::Won {
                winner: PlayerId(1),
                code: Code(4321),
                total_guesses: 4,
            }
        );

        let mut reader = BufReader::new(clients[1].try_clone().unwrap());
        lines_until(&mut reader, "Player 1 guessed 1111");
        lines_until(&mut reader, "Player 2 guessed 2222");
        lines_until(&mut reader, "Player 3 guessed 3333");
        lines_until(&mut reader, "Player 1 guessed the correct code (4321)");
    }

    #[test]
    fn invalid_input_keeps_the_turn() {
        let (session, clients, mut inboxes) = seated(2);
        send(&clients[0], "12ab");
        send(&clients[0], "4321");

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_secs(5));
        assert_eq!(
            outcome,
            RoundOutcome::Won {
                winner: PlayerId(1),
                code: Code(4321),
                total_guesses: 1,
            }
        );

        let mut reader = BufReader::new(clients[0].try_clone().unwrap());
        lines_until(&mut reader, "invalid input");
        lines_until(&mut reader, "Try again:");
    }

    #[test]
    fn timeout_forfeits_without_counting_a_guess() {
        let (session, clients, mut inboxes) = seated(2);
        // Player 1 stays silent; player 2 has the answer queued.
        send(&clients[1], "4321");

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_millis(150));
        assert_eq!(
            outcome,
            RoundOutcome::Won {
                winner: PlayerId(2),
                code: Code(4321),
                total_guesses: 1,
            }
        );

        let mut reader = BufReader::new(clients[0].try_clone().unwrap());
        lines_until(&mut reader, "Your turn is forfeited");
        lines_until(&mut reader, "Player 2 guessed the correct code");
    }

    #[test]
    fn disconnect_below_minimum_abandons_the_round() {
        let (session, clients, mut inboxes) = seated(2);
        drop(clients.into_iter().next().unwrap());

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_secs(5));
        assert_eq!(outcome, RoundOutcome::Abandoned);
        assert_eq!(lock_session(&session).player_count(), 1);
    }

    #[test]
    fn disconnect_above_minimum_continues_with_rest() {
        let (session, clients, mut inboxes) = seated(3);
        // Player 1 vanishes; play continues with 2 and 3.
        send(&clients[1], "4321");
        clients[0].shutdown(std::net::Shutdown::Both).unwrap();

        let outcome = run(&session, &mut inboxes, Code(4321), Duration::from_secs(5));
        assert_eq!(
            outcome,
            RoundOutcome::Won {
                winner: PlayerId(2),
                code: Code(4321),
                total_guesses: 1,
            }
        );

        let mut reader = BufReader::new(clients[2].try_clone().unwrap());
        lines_until(&mut reader, "Player 1 has disconnected. Continuing with 2 players.");
    }
}
