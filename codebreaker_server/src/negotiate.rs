// Restart negotiation after a finished round.
//
// Everyone is asked at once and shares one absolute decision deadline.
// Players type their answers whenever they like — reader threads queue them
// — and the scan below collects each answer in roster order, so a slow
// first player cannot eat a fast second player's time beyond the shared
// deadline. Only an exact "yes" counts as staying; any other line, a
// timeout, or a disconnect counts as leaving.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

use codebreaker_protocol::text;
use codebreaker_protocol::types::PlayerId;

use crate::player::{PlayerInbox, Received};
use crate::session::{SharedSession, lock_session};

/// Ask every seated player whether to play again. Marks each player's
/// `continuing` flag and returns the IDs of those staying, in roster order.
pub fn negotiate(
    session: &SharedSession,
    inboxes: &mut HashMap<u32, PlayerInbox>,
    decision_timeout: Duration,
) -> Vec<PlayerId> {
    let roster = {
        let mut s = lock_session(session);
        s.broadcast(&text::play_again_prompt());
        s.roster()
    };

    let deadline = Instant::now() + decision_timeout;
    let mut staying = Vec::new();

    for (id, _name) in roster {
        let answer = match inboxes.get(&id.0) {
            Some(inbox) => inbox.recv_until(deadline),
            None => Received::Gone,
        };
        let continuing = matches!(&answer, Received::Line(line) if line == "yes");

        let mut s = lock_session(session);
        s.set_continuing(id, continuing);
        match answer {
            Received::Line(_) if continuing => s.send_to(id, &text::chose_continue()),
            Received::Line(_) => s.send_to(id, &text::chose_stop()),
            Received::TimedOut => s.send_to(id, &text::no_response()),
            Received::Gone => {}
        }
        if continuing {
            staying.push(id);
        }
    }

    info!(staying = staying.len(), "restart negotiation settled");
    staying
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

    #[test]
    fn only_exact_yes_counts() {
        let (session, clients, mut inboxes) = seated(3);
        send(&clients[0], "yes");
        send(&clients[1], "no");
        send(&clients[2], "YES");

        let staying = negotiate(&session, &mut inboxes, Duration::from_secs(5));
        assert_eq!(staying, vec![PlayerId(1)]);
    }

    #[test]
    fn silence_counts_as_leaving() {
        let (session, clients, mut inboxes) = seated(2);
        send(&clients[0], "yes");

        let staying = negotiate(&session, &mut inboxes, Duration::from_millis(150));
        assert_eq!(staying, vec![PlayerId(1)]);

        let mut reader = BufReader::new(clients[1].try_clone().unwrap());
        loop {
            let line = read_trimmed_line(&mut reader).unwrap().unwrap();
            if line.contains("No response received in time") {
                break;
            }
        }
    }

    #[test]
    fn disconnected_player_counts_as_leaving() {
        let (session, clients, mut inboxes) = seated(2);
        send(&clients[1], "yes");
        clients[0].shutdown(std::net::Shutdown::Both).unwrap();

        let staying = negotiate(&session, &mut inboxes, Duration::from_secs(5));
        assert_eq!(staying, vec![PlayerId(2)]);
    }

    #[test]
    fn answers_queued_before_the_scan_are_honored() {
        let (session, clients, mut inboxes) = seated(2);
        // Player 2 answers immediately, before the scan reaches them.
        send(&clients[1], "yes");
        send(&clients[0], "yes");

        let staying = negotiate(&session, &mut inboxes, Duration::from_secs(5));
        assert_eq!(staying, vec![PlayerId(1), PlayerId(2)]);
    }
}
