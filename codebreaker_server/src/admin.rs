// Admin channel: one command per connection.
//
// Operators connect (netcat is fine), send a single command line, and get
// the response before the socket closes. The channel is deliberately
// separate from the game port so monitoring never competes with players
// for seats.
//
// Commands:
//   stats       plain-text analytics report
//   stats-json  the same summary as JSON

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use codebreaker_analytics::Analytics;
use codebreaker_protocol::framing::read_trimmed_line;

/// Admin accept loop. Runs until `keep_running` is set to false.
pub fn run_admin(listener: TcpListener, keep_running: Arc<AtomicBool>, analytics: Arc<Analytics>) {
    listener.set_nonblocking(true).ok();

    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _peer)) => {
                stream.set_nonblocking(false).ok();
                let analytics = analytics.clone();
                thread::spawn(move || {
                    if let Err(e) = serve_command(stream, &analytics) {
                        debug!(error = %e, "admin connection failed");
                    }
                });
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "admin listener failed");
                break;
            }
        }
    }
}

/// Read one command line, answer it, close.
fn serve_command(stream: TcpStream, analytics: &Analytics) -> std::io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream.try_clone()?);

    let command = match read_trimmed_line(&mut reader)? {
        Some(line) => line,
        None => return Ok(()),
    };
    debug!(%command, "admin command");

    let response = match command.as_str() {
        "stats" => analytics.report(),
        "stats-json" => analytics.report_json(),
        other => format!("unknown command: {other}\n"),
    };
    writer.write_all(response.as_bytes())?;
    if !response.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    stream.shutdown(Shutdown::Both)
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use codebreaker_protocol::types::{Code, PlayerId};

    use super::*;

    fn query(analytics: &Analytics, command: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        writeln!(&mut client, "{command}").unwrap();
        serve_command(server, analytics).unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn stats_returns_report() {
        let analytics = Analytics::new();
        let token = analytics.round_start(Code(4321), 1);
        analytics.record_guess(token, PlayerId(1), Code(4321));
        analytics.round_end(token, Some(PlayerId(1)));

        let response = query(&analytics, "stats");
        assert!(response.contains("=== CODE BREAKER GAME ANALYTICS ==="));
        assert!(response.contains("Games Played: 1"));
    }

    #[test]
    fn stats_json_parses() {
        let analytics = Analytics::new();
        let response = query(&analytics, "stats-json");
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["overall"]["rounds_played"], 0);
    }

    #[test]
    fn unknown_command_is_reported() {
        let analytics = Analytics::new();
        let response = query(&analytics, "reboot");
        assert_eq!(response, "unknown command: reboot\n");
    }
}
