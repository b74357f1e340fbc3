// codebreaker_server — multi-session TCP server for the Code Breaker game.
//
// The server hosts independent tables ("sessions") of a turn-based guessing
// game: each round hides a derived 4-digit code, seated players guess in
// strict join order under a per-turn time limit, and the round ends when
// someone names the code or disconnects drop the table below its minimum.
// After each round the table negotiates whether to play again.
//
// Module overview:
// - `player.rs`:    Per-connection plumbing — reader thread, generation-
//                   tagged inbox, buffered write half with idempotent close.
// - `session.rs`:   Roster state and player-facing writes behind a mutex
//                   shared by the gate and the lifecycle thread.
// - `turn.rs`:      The round-robin guessing loop with per-turn deadlines.
// - `negotiate.rs`: Post-round "play again?" scan with a shared deadline.
// - `lifecycle.rs`: Forming -> rounds -> negotiation, one thread per session.
// - `server.rs`:    TCP listener and the connection gate that routes
//                   sockets to sessions, spins up new ones, or rejects.
// - `admin.rs`:     Side channel serving analytics reports to operators.
// - `client.rs`:    Terminal clients for the game and admin channels.
//
// Concurrency: std threads only — a gate thread, one lifecycle thread per
// session, one reader thread per player. Readers publish lines into `mpsc`
// channels tagged with a read generation; coordinators wait with
// `recv_timeout` against absolute deadlines and bump the generation on
// expiry, so input that lost the race arrives recognizably stale.
//
// The server can run standalone (`main.rs`) or be embedded in tests via
// `start_server`.

pub mod admin;
pub mod client;
pub mod lifecycle;
pub mod negotiate;
pub mod player;
pub mod server;
pub mod session;
pub mod turn;

pub use server::{ServerConfig, ServerHandle, start_server};
