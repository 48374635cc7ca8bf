//! License key generation from a seed string.
//!
//! The mixing function below is an obfuscation, not a MAC. Its arithmetic,
//! alphabets, and layout are frozen: changing any constant changes every key
//! ever issued, and terminals compare keys byte for byte.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Modulus for all mixing arithmetic (2^24 - 1).
pub const MIX_MODULUS: u64 = 16_777_215;

/// Total key length in characters.
pub const KEY_LEN: usize = 32;

/// Number of generated base characters (key minus the two specials).
pub const BASE_LEN: usize = 30;

/// Positions of the two special characters in the assembled key.
pub const SPECIAL_POSITIONS: [usize; 2] = [10, 21];

/// Uppercase letters without `I` and `O`.
pub const UPPERCASE_CHARS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Lowercase letters without `l`.
pub const LOWERCASE_CHARS: &str = "abcdefghijkmnopqrstuvwxyz";

/// Digits without `0` and `1`.
pub const NUMBER_CHARS: &str = "23456789";

/// Special characters placed at [`SPECIAL_POSITIONS`].
pub const SPECIAL_CHARS: &str = "@#$%&*!?";

/// `(offset, multiplier)` pairs for the two checksum runs.
const CHECKSUM_RUNS: [(u64, u64); 2] = [(11, 3), (19, 7)];

/// A generated license key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Run the mixing function over `seed`.
    pub fn from_seed(seed: &str) -> Self {
        let mut state = initial_state(seed);

        let charsets = [
            UPPERCASE_CHARS.as_bytes(),
            LOWERCASE_CHARS.as_bytes(),
            NUMBER_CHARS.as_bytes(),
        ];

        let mut base = Vec::with_capacity(BASE_LEN);
        for index in 0..BASE_LEN as u64 {
            state = (state * 73 + 19 + index * 131) % MIX_MODULUS;
            let charset = charsets[(index % 3) as usize];
            base.push(charset[(state % charset.len() as u64) as usize]);
        }

        let specials = SPECIAL_CHARS.as_bytes();
        state = (state * 73 + 17) % MIX_MODULUS;
        let special_a = specials[(state % specials.len() as u64) as usize];
        state = (state * 73 + 29) % MIX_MODULUS;
        let special_b = specials[(state % specials.len() as u64) as usize];

        let mut key = String::with_capacity(KEY_LEN);
        key.extend(base[..10].iter().map(|&b| b as char));
        key.push(special_a as char);
        key.extend(base[10..20].iter().map(|&b| b as char));
        key.push(special_b as char);
        key.extend(base[20..].iter().map(|&b| b as char));

        Self(key)
    }

    /// Wrap an existing key string without checking it.
    ///
    /// Records read back from storage may hold keys issued by older tooling,
    /// so this is deliberately unchecked; see [`LicenseKey::has_valid_shape`].
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Structural sanity check: length, special positions, and alphabets.
    ///
    /// This does not prove the key was derived for any particular machine.
    pub fn has_valid_shape(key: &str) -> bool {
        let chars: Vec<char> = key.chars().collect();
        if chars.len() != KEY_LEN {
            return false;
        }
        chars.iter().enumerate().all(|(i, c)| {
            if SPECIAL_POSITIONS.contains(&i) {
                SPECIAL_CHARS.contains(*c)
            } else {
                UPPERCASE_CHARS.contains(*c)
                    || LOWERCASE_CHARS.contains(*c)
                    || NUMBER_CHARS.contains(*c)
            }
        })
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the key text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LicenseKey({})", self.0)
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicenseKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One checksum run: `sum((ord(c) + offset) * (i + multiplier))` over
/// 1-based positions, reduced mod [`MIX_MODULUS`] at every step.
fn checksum(seed: &str, offset: u64, multiplier: u64) -> u64 {
    seed.chars()
        .zip(1u64..)
        .fold(0, |total, (c, i)| {
            (total + (c as u64 + offset) * (i + multiplier)) % MIX_MODULUS
        })
}

fn initial_state(seed: &str) -> u64 {
    let runs: u64 = CHECKSUM_RUNS
        .iter()
        .map(|&(offset, multiplier)| checksum(seed, offset, multiplier))
        .sum();
    let len = seed.chars().count() as u64;
    (runs + len * 97) % MIX_MODULUS
}
