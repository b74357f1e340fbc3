// Message text sent to players.
//
// The session core never formats prose inline; every user-visible line comes
// from a constructor here so wording stays in one place and integration
// tests can match on stable fragments. All constructors return a single
// line — `framing::write_line` frames one message per line.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Code;

/// Prefix for the winning congratulation line: `TIME: <unix-seconds> `.
pub fn timestamp_prefix() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("TIME: {secs} ")
}

// --- Forming / joining ---

pub fn welcome_single(name: &str) -> String {
    format!("Welcome {name}! You are playing in single-player mode against the computer.")
}

pub fn welcome_multi(name: &str, joined: usize, capacity: usize) -> String {
    format!("Welcome {name}! Waiting for other players... ({joined}/{capacity} connected)")
}

pub fn turn_seconds(secs: u64) -> String {
    format!("You have {secs} seconds to make each guess!")
}

pub fn player_joined(name: &str, joined: usize, capacity: usize) -> String {
    format!("{name} has joined the game. ({joined}/{capacity} players connected)")
}

pub fn rejected() -> String {
    "Sorry, this game has already started or is full. Please try again later.".into()
}

pub fn not_enough_to_start() -> String {
    "Not enough players to start the game. Please try again later.".into()
}

// --- Round start ---

pub fn starting_single() -> String {
    "Game is starting in single-player mode!".into()
}

pub fn starting_multi(players: usize) -> String {
    format!("Game is starting with {players} players!")
}

pub fn rules() -> String {
    "Try to guess the 4-digit code.".into()
}

pub fn rules_turns() -> String {
    "Try to guess the 4-digit code. Players will take turns in order.".into()
}

pub fn player_list_header() -> String {
    "Players in this game:".into()
}

pub fn player_list_entry(name: &str) -> String {
    format!("- {name}")
}

// --- Turns ---

pub fn your_turn() -> String {
    "It's your turn. Enter your guess:".into()
}

pub fn waiting_for(name: &str) -> String {
    format!("Waiting for {name} to make a guess...")
}

pub fn try_again_prompt() -> String {
    "Try again:".into()
}

pub fn incorrect() -> String {
    "Try again!".into()
}

pub fn incorrect_single(guess: Code, tally: u32) -> String {
    format!("You guessed {guess} (incorrect). Total guesses: {tally}")
}

pub fn incorrect_multi(name: &str, guess: Code, tally: u32) -> String {
    format!("{name} guessed {guess} (incorrect). Total guesses: {tally}")
}

pub fn hint(in_place: u8, misplaced: u8) -> String {
    format!("Hint: {in_place} correct position, {misplaced} correct digit but wrong position")
}

pub fn timed_out_retry(secs: u64) -> String {
    format!("Time's up! You took longer than {secs} seconds. Try again:")
}

pub fn timed_out_forfeit(secs: u64) -> String {
    format!("Time's up! You took longer than {secs} seconds. Your turn is forfeited.")
}

pub fn forfeited(name: &str) -> String {
    format!("{name} ran out of time and forfeited their turn!")
}

// --- Round end ---

pub fn congratulations() -> String {
    format!("{}Congratulations! You guessed the correct number!", timestamp_prefix())
}

pub fn you_won(code: Code) -> String {
    format!("You guessed the correct code ({code})!")
}

pub fn player_won(name: &str, code: Code) -> String {
    format!("{name} guessed the correct code ({code}) and won the game!")
}

pub fn secret_was(code: Code) -> String {
    format!("Secret code was: {code}")
}

pub fn total_guesses(tally: u32) -> String {
    format!("Total guesses: {tally}")
}

// --- Disconnects ---

pub fn disconnected_continue(name: &str, remaining: usize) -> String {
    format!("{name} has disconnected. Continuing with {remaining} players.")
}

pub fn disconnected_not_enough(name: &str) -> String {
    format!("{name} has disconnected. Not enough players to continue.")
}

pub fn game_over() -> String {
    "Game over. Thank you for playing!".into()
}

// --- Restart negotiation ---

pub fn play_again_prompt() -> String {
    "Would you like to play again? (yes/no)".into()
}

pub fn chose_continue() -> String {
    "You chose to continue. Waiting for other players' responses...".into()
}

pub fn chose_stop() -> String {
    "You chose not to continue. Waiting for other players...".into()
}

pub fn no_response() -> String {
    "No response received in time. You'll be disconnected when the game restarts.".into()
}

pub fn restarting(players: usize) -> String {
    format!("{players} players want to continue. Starting a new game!")
}

pub fn restarting_single() -> String {
    "Starting a new game!".into()
}

pub fn not_enough_to_continue() -> String {
    "Not enough players want to continue. Game ended.".into()
}

pub fn goodbye() -> String {
    "Thank you for playing! Goodbye.".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn timestamp_prefix_is_recent_unix_seconds() {
        let prefix = timestamp_prefix();
        assert!(prefix.starts_with("TIME: "));
        assert!(prefix.ends_with(' '));

        let digits = prefix
            .strip_prefix("TIME: ")
            .unwrap()
            .trim_end()
            .parse::<u64>()
            .unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(now.abs_diff(digits) < 60, "timestamp should be recent");
    }

    #[test]
    fn congratulations_carries_timestamp() {
        let line = congratulations();
        assert!(line.starts_with("TIME: "));
        assert!(line.ends_with(" Congratulations! You guessed the correct number!"));
    }

    #[test]
    fn codes_render_padded_in_messages() {
        assert_eq!(secret_was(Code(42)), "Secret code was: 0042");
    }

    #[test]
    fn messages_are_single_lines() {
        for line in [
            welcome_multi("Player 2", 2, 3),
            player_won("Player 1", Code(4321)),
            timed_out_forfeit(30),
            hint(2, 1),
        ] {
            assert!(!line.contains('\n'));
        }
    }
}
