// Syntactic validation of guess lines.
//
// The core treats inbound payloads as opaque text and hands them here once
// per received guess. A guess is exactly four ASCII digits after trimming;
// anything else is a `GuessError`, whose `Display` text is sent back to the
// player verbatim as the retry explanation.

use thiserror::Error;

use crate::types::Code;

/// Why a guess line failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GuessError {
    #[error("invalid input: must contain exactly 4 digits")]
    WrongLength,
    #[error("invalid input: must contain only digits")]
    NonDigit,
}

/// Parse one guess line into a `Code`.
pub fn parse_guess(input: &str) -> Result<Code, GuessError> {
    let trimmed = input.trim();
    if trimmed.len() != 4 {
        return Err(GuessError::WrongLength);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GuessError::NonDigit);
    }
    // Four ASCII digits always fit in u16.
    let value = trimmed.parse::<u16>().map_err(|_| GuessError::NonDigit)?;
    Ok(Code(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_guesses() {
        assert_eq!(parse_guess("1234"), Ok(Code(1234)));
        assert_eq!(parse_guess(" 4321 "), Ok(Code(4321)));
        assert_eq!(parse_guess("0000"), Ok(Code(0)));
    }

    #[test]
    fn wrong_length_rejected() {
        for input in [" ", "1", "123456", "12 34"] {
            assert_eq!(parse_guess(input), Err(GuessError::WrongLength));
        }
    }

    #[test]
    fn non_digits_rejected() {
        for input in ["abcd", "12.3", "!@#$", "-123"] {
            assert_eq!(parse_guess(input), Err(GuessError::NonDigit));
        }
    }

    #[test]
    fn six_char_symbol_string_is_length_error() {
        assert_eq!(parse_guess("abc123"), Err(GuessError::WrongLength));
    }
}
