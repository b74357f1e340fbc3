// codebreaker_protocol — wire protocol for the Code Breaker game server.
//
// This crate defines everything the server and clients agree on over TCP.
// It is deliberately independent of the session engine: the core treats
// payloads as opaque strings and calls in here at narrow seams.
//
// Module overview:
// - `types.rs`:   Shared newtypes — `PlayerId` (session-scoped ordinal) and
//                 `Code` (4-digit value, zero-padded display).
// - `framing.rs`: Line-oriented framing over any `Read`/`Write` stream with
//                 a max-line guard.
// - `guess.rs`:   Syntactic validation of guess lines (`parse_guess`).
// - `text.rs`:    Constructors for every user-visible message line,
//                 including the timestamped win prefix.
//
// Design decisions:
// - **Plain text lines.** One message per newline-terminated line; human
//   players connect with nothing fancier than netcat.
// - **No async runtime.** Framing uses `std::io::Read`/`Write`, compatible
//   with blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod guess;
pub mod text;
pub mod types;

pub use framing::{MAX_LINE_BYTES, read_trimmed_line, write_line};
pub use guess::{GuessError, parse_guess};
pub use types::{Code, PlayerId};
