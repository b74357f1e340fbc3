// Core ID and value types for the Code Breaker wire protocol.
//
// Lightweight newtypes shared by the server's session management and the
// analytics aggregator. `PlayerId` is a session-scoped ordinal, not any kind
// of account identity — the gate assigns compact 1-based integers in join
// order and never reuses one within a session's lifetime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session-scoped player ordinal (1-based, assigned in join order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 4-digit code value in `0..=9999`.
///
/// Codes are drawn in `1000..=9999` but derivation can produce leading
/// zeros (reversing 1000 gives 0001), so display always pads to 4 digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Code(pub u16);

impl Code {
    /// The four decimal digits, most significant first.
    pub fn digits(self) -> [u8; 4] {
        let n = self.0;
        [
            (n / 1000 % 10) as u8,
            (n / 100 % 10) as u8,
            (n / 10 % 10) as u8,
            (n % 10) as u8,
        ]
    }

    /// Rebuild a code from four decimal digits, most significant first.
    pub fn from_digits(digits: [u8; 4]) -> Self {
        let n = digits.iter().fold(0u16, |acc, &d| acc * 10 + u16::from(d));
        Code(n)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_displays_with_leading_zeros() {
        assert_eq!(Code(1).to_string(), "0001");
        assert_eq!(Code(4321).to_string(), "4321");
    }

    #[test]
    fn digit_roundtrip() {
        for n in [0u16, 1, 999, 1000, 4321, 9999] {
            let code = Code(n);
            assert_eq!(Code::from_digits(code.digits()), code);
        }
    }

    #[test]
    fn serde_roundtrip() {
        let id = PlayerId(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<PlayerId>(&json).unwrap(), id);
    }
}
