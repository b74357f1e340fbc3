// Per-player connection plumbing.
//
// Each accepted socket gets a dedicated reader thread that reads trimmed
// lines and publishes them into an `mpsc` channel. Every published line is
// tagged with the read generation in effect at publish time; when a turn
// deadline expires the generation is bumped, so input that raced the
// deadline carries a stale tag and is discarded by the next read. Input
// typed early within the current window keeps its tag and stays valid.
//
// Writes go through `Connection`, a buffered write half over a cloned
// stream. Write errors are logged and swallowed — the reader thread detects
// the broken pipe and reports the player gone.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use tracing::debug;

use codebreaker_protocol::framing::{read_trimmed_line, write_line};
use codebreaker_protocol::types::PlayerId;

/// One item published by a reader thread.
enum Inbound {
    Line { generation: u64, text: String },
    Gone,
}

/// What a coordinator read produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    Line(String),
    Gone,
    TimedOut,
}

/// Receiving end of one player's reader thread.
pub struct PlayerInbox {
    rx: Receiver<Inbound>,
    generation: Arc<AtomicU64>,
}

impl PlayerInbox {
    /// Wait for the next current-generation line until `deadline`.
    ///
    /// Stale lines (published before an earlier deadline expired) are
    /// silently dropped. On expiry the generation is bumped so any line
    /// still in flight arrives stale.
    pub fn recv_until(&self, deadline: Instant) -> Received {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(Inbound::Line { generation, text }) => {
                    if generation == self.generation.load(Ordering::SeqCst) {
                        return Received::Line(text);
                    }
                    debug!(line = %text, "discarding stale input");
                }
                Ok(Inbound::Gone) => return Received::Gone,
                Err(RecvTimeoutError::Timeout) => {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    return Received::TimedOut;
                }
                Err(RecvTimeoutError::Disconnected) => return Received::Gone,
            }
        }
    }
}

/// Spawn the reader thread for an accepted socket and return its inbox.
pub fn spawn_reader(stream: TcpStream) -> PlayerInbox {
    let (tx, rx) = mpsc::channel();
    let generation = Arc::new(AtomicU64::new(0));
    let generation_reader = generation.clone();
    thread::spawn(move || {
        reader_loop(stream, tx, generation_reader);
    });
    PlayerInbox { rx, generation }
}

/// Reader loop for a single player. Runs until EOF or a read error, then
/// publishes `Gone` and exits.
fn reader_loop(stream: TcpStream, tx: Sender<Inbound>, generation: Arc<AtomicU64>) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_trimmed_line(&mut reader) {
            Ok(Some(text)) => {
                let tagged = Inbound::Line {
                    generation: generation.load(Ordering::SeqCst),
                    text,
                };
                if tx.send(tagged).is_err() {
                    break;
                }
            }
            Ok(None) | Err(_) => {
                let _ = tx.send(Inbound::Gone);
                break;
            }
        }
    }
}

/// Buffered write half of one player's socket with idempotent close.
pub struct Connection {
    writer: BufWriter<TcpStream>,
    stream: TcpStream,
    closed: bool,
}

impl Connection {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        let writer = BufWriter::new(stream.try_clone()?);
        Ok(Self {
            writer,
            stream,
            closed: false,
        })
    }

    /// Write one line. Errors are logged and swallowed — the reader thread
    /// reports the broken pipe.
    pub fn send_line(&mut self, line: &str) {
        if self.closed {
            return;
        }
        if let Err(e) = write_line(&mut self.writer, line) {
            debug!(error = %e, "dropping write to disconnected player");
        }
    }

    /// Shut the socket down. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}

/// One seated player as the session tracks them.
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub continuing: bool,
    pub conn: Connection,
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use super::*;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn reader_publishes_trimmed_lines() {
        let (client, server) = tcp_pair();
        let inbox = spawn_reader(server);

        write_line(&mut BufWriter::new(client.try_clone().unwrap()), "  1234  ").unwrap();
        assert_eq!(inbox.recv_until(soon()), Received::Line("1234".into()));
    }

    #[test]
    fn reader_reports_gone_on_close() {
        let (client, server) = tcp_pair();
        let inbox = spawn_reader(server);

        drop(client);
        assert_eq!(inbox.recv_until(soon()), Received::Gone);
    }

    #[test]
    fn expired_deadline_times_out() {
        let (_client, server) = tcp_pair();
        let inbox = spawn_reader(server);

        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(inbox.recv_until(deadline), Received::TimedOut);
    }

    #[test]
    fn stale_generation_lines_are_discarded() {
        let (tx, rx) = mpsc::channel();
        let inbox = PlayerInbox {
            rx,
            generation: Arc::new(AtomicU64::new(1)),
        };

        // Published under generation 0, read under generation 1.
        tx.send(Inbound::Line {
            generation: 0,
            text: "late".into(),
        })
        .unwrap();
        tx.send(Inbound::Line {
            generation: 1,
            text: "fresh".into(),
        })
        .unwrap();

        assert_eq!(inbox.recv_until(soon()), Received::Line("fresh".into()));
    }

    #[test]
    fn timeout_bumps_generation() {
        let (tx, rx) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));
        let inbox = PlayerInbox {
            rx,
            generation: generation.clone(),
        };

        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(inbox.recv_until(deadline), Received::TimedOut);
        assert_eq!(generation.load(Ordering::SeqCst), 1);

        // A line that raced the deadline now carries a stale tag.
        tx.send(Inbound::Line {
            generation: 0,
            text: "too late".into(),
        })
        .unwrap();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(inbox.recv_until(deadline), Received::TimedOut);
    }

    #[test]
    fn connection_send_and_close_are_safe_after_peer_drop() {
        let (client, server) = tcp_pair();
        let mut conn = Connection::new(server).unwrap();
        drop(client);

        conn.send_line("into the void");
        conn.close();
        conn.close();
        conn.send_line("after close");
    }
}
