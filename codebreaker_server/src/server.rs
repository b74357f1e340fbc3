// TCP listener and connection gate.
//
// Architecture: one gate thread owns the listener and routes every accepted
// socket; each session gets its own lifecycle thread, and each player gets
// a reader thread (see `player.rs`). The listener is non-blocking so the
// gate can poll the shutdown flag between accepts, the same 50ms cadence as
// the accept loop's idle sleep.
//
// Routing: a connection goes to the first forming session with a free seat.
// If none has one and the session cap allows it, a fresh session is spun
// up. Otherwise the socket gets a one-line rejection and is dropped.
// Terminated sessions are reaped at the head of every routing pass.
//
// Seating and the `JoinEvent` send to the lifecycle thread happen under one
// session lock hold — the lifecycle thread flips the phase under that same
// lock, so a seat can never slip past the forming phase unnoticed.

use std::io::BufWriter;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use codebreaker_analytics::Analytics;
use codebreaker_protocol::framing::write_line;
use codebreaker_protocol::text;

use crate::admin::run_admin;
use crate::lifecycle::{JoinEvent, LifecycleConfig, run_session};
use crate::player::spawn_reader;
use crate::session::{Phase, Session, SharedSession, lock_session};

/// Configuration for starting a game server.
pub struct ServerConfig {
    pub port: u16,
    /// Admin channel port; `None` disables the admin listener.
    pub admin_port: Option<u16>,
    /// Players per session. 1 selects single-player mode with hints.
    pub capacity: usize,
    /// Most sessions alive at once; connections beyond this are rejected.
    pub max_sessions: usize,
    pub turn_timeout: Duration,
    pub forming_timeout: Duration,
    pub decision_timeout: Duration,
    /// Fixed seed for code draws. `None` seeds from the clock.
    pub code_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_port: Some(8081),
            capacity: 2,
            max_sessions: 16,
            turn_timeout: Duration::from_secs(30),
            forming_timeout: Duration::from_secs(180),
            decision_timeout: Duration::from_secs(30),
            code_seed: None,
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    admin_addr: Option<SocketAddr>,
}

impl ServerHandle {
    /// Bound address of the admin listener, if one was started.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Signal the gate to stop and wait for it to shut down. Sessions
    /// already playing run to their own termination.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Start the game server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used to
/// let the OS pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let analytics = Arc::new(Analytics::new());

    let admin_addr = match config.admin_port {
        Some(port) => {
            let admin_listener = TcpListener::bind(format!("127.0.0.1:{port}"))?;
            let admin_addr = admin_listener.local_addr()?;
            let keep_running_admin = keep_running.clone();
            let analytics_admin = analytics.clone();
            thread::spawn(move || {
                run_admin(admin_listener, keep_running_admin, analytics_admin);
            });
            Some(admin_addr)
        }
        None => None,
    };

    let keep_running_gate = keep_running.clone();
    let thread = thread::spawn(move || {
        run_gate(listener, config, keep_running_gate, analytics);
    });

    info!(%addr, ?admin_addr, "server listening");
    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
            admin_addr,
        },
        addr,
    ))
}

/// One live session as the gate tracks it.
struct Slot {
    session: SharedSession,
    joins: Sender<JoinEvent>,
}

/// Gate loop. Runs until `keep_running` is set to false.
fn run_gate(
    listener: TcpListener,
    config: ServerConfig,
    keep_running: Arc<AtomicBool>,
    analytics: Arc<Analytics>,
) {
    listener.set_nonblocking(true).ok();
    let lifecycle_config = LifecycleConfig {
        turn_timeout: config.turn_timeout,
        forming_timeout: config.forming_timeout,
        decision_timeout: config.decision_timeout,
        code_seed: config.code_seed,
    };
    let mut slots: Vec<Slot> = Vec::new();

    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false).ok();
                if let Err(e) = route(
                    stream,
                    &mut slots,
                    &config,
                    &lifecycle_config,
                    &analytics,
                ) {
                    warn!(%peer, error = %e, "dropping connection");
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "listener failed");
                break;
            }
        }
    }
}

/// Route one accepted socket to a session, creating a session if needed,
/// or reject it.
fn route(
    stream: TcpStream,
    slots: &mut Vec<Slot>,
    config: &ServerConfig,
    lifecycle_config: &LifecycleConfig,
    analytics: &Arc<Analytics>,
) -> std::io::Result<()> {
    slots.retain(|slot| lock_session(&slot.session).phase != Phase::Terminated);

    let inbox = spawn_reader(stream.try_clone()?);

    for slot in slots.iter() {
        let mut s = lock_session(&slot.session);
        if s.can_accept() {
            let info = s.add_player(stream)?;
            let _ = slot.joins.send(JoinEvent {
                player_id: info.id,
                inbox,
                now_full: info.now_full,
            });
            return Ok(());
        }
    }

    if slots.len() < config.max_sessions {
        let session: SharedSession = Arc::new(std::sync::Mutex::new(Session::new(config.capacity)));
        let (tx, rx) = mpsc::channel();

        let session_thread = session.clone();
        let lifecycle = lifecycle_config.clone();
        let analytics_thread = analytics.clone();
        thread::spawn(move || {
            run_session(session_thread, rx, lifecycle, analytics_thread);
        });
        info!(sessions = slots.len() + 1, "new session formed");

        let mut s = lock_session(&session);
        let info = s.add_player(stream)?;
        let _ = tx.send(JoinEvent {
            player_id: info.id,
            inbox,
            now_full: info.now_full,
        });
        drop(s);

        slots.push(Slot { session, joins: tx });
        return Ok(());
    }

    // No seat anywhere. One line of courtesy, then hang up.
    info!("rejecting connection, all sessions full");
    let mut writer = BufWriter::new(stream.try_clone()?);
    let _ = write_line(&mut writer, &text::rejected());
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}
