// codebreaker_codegen — the target-generation collaborator.
//
// Two responsibilities, both pure enough to test without a server:
// - `CodeRng` + `next_code`: draw a fresh secret code for a round.
// - `hint`: per-guess digit feedback for single-player mode.
//
// `CodeRng` is xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64
// seeding, hand-rolled with zero external dependencies. Seeding is explicit:
// the server seeds from the clock in production and from a fixed
// `code_seed` in tests, which is how integration tests know the secret
// without peeking into a session.
//
// The derivation rule itself (`derive_code`) is split out as a pure
// function of the raw draw so the branch table is unit-testable.

use std::time::{SystemTime, UNIX_EPOCH};

use codebreaker_protocol::types::Code;

/// Xoshiro256++ generator used for code draws.
pub struct CodeRng {
    s: [u64; 4],
}

impl CodeRng {
    /// Create a generator from an explicit seed. Two generators built from
    /// the same seed produce identical draw sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a generator seeded from the system clock.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::new(nanos)
    }

    /// Next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw the secret code for a new round: a raw 4-digit number in
/// `1000..=9999`, passed through `derive_code`.
pub fn next_code(rng: &mut CodeRng) -> Code {
    let raw = 1000 + (rng.next_u64() % 9000) as u16;
    derive_code(raw)
}

/// The derivation rule applied to a raw draw:
/// - even digit sum: reverse the digits (leading zeros preserved),
/// - odd digit sum: increment each digit, wrapping 9 to 0,
/// - and if the result is a palindrome, replace every digit with 7.
pub fn derive_code(raw: u16) -> Code {
    let digits = Code(raw).digits();
    let sum: u16 = digits.iter().map(|&d| u16::from(d)).sum();

    let mut derived = if sum % 2 == 0 {
        let mut reversed = digits;
        reversed.reverse();
        reversed
    } else {
        digits.map(|d| (d + 1) % 10)
    };

    let palindrome = derived[0] == derived[3] && derived[1] == derived[2];
    if palindrome {
        derived = [7; 4];
    }

    Code::from_digits(derived)
}

/// Digit feedback for a single-player guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hint {
    /// Digits correct and in the correct position.
    pub in_place: u8,
    /// Digits present in the secret but in a different position.
    pub misplaced: u8,
}

/// Compare a guess against the secret, Mastermind-style. Each secret digit
/// is matched at most once: exact matches are claimed first, then leftover
/// guess digits scan the remaining secret digits.
pub fn hint(guess: Code, secret: Code) -> Hint {
    let guess = guess.digits();
    let secret = secret.digits();

    let mut used_secret = [false; 4];
    let mut used_guess = [false; 4];
    let mut in_place = 0u8;
    let mut misplaced = 0u8;

    for i in 0..4 {
        if guess[i] == secret[i] {
            in_place += 1;
            used_secret[i] = true;
            used_guess[i] = true;
        }
    }
    for i in 0..4 {
        if used_guess[i] {
            continue;
        }
        for j in 0..4 {
            if !used_secret[j] && guess[i] == secret[j] {
                misplaced += 1;
                used_secret[j] = true;
                break;
            }
        }
    }

    Hint { in_place, misplaced }
}
