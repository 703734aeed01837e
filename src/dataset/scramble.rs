//! Random scramble generation for recording sessions.

use rand::seq::IndexedRandom;
use rand::Rng;

use super::manifest::SampleRecord;

const MOVES: [&str; 18] = [
    "x", "y", "z", "E", "M", "S", "R", "U", "F", "B", "D", "L", "r", "u", "f", "b", "d", "l",
];
const SUFFIXES: [&str; 4] = ["", "'", "2", "2'"];

/// Longest generated scramble, in moves.
pub const MAX_SCRAMBLE_LEN: usize = 30;

/// A random algorithm of 1 to [`MAX_SCRAMBLE_LEN`] moves.
pub fn random_scramble<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.random_range(1..=MAX_SCRAMBLE_LEN);
    (0..len)
        .map(|_| {
            let base = MOVES.choose(rng).copied().unwrap_or("R");
            let suffix = SUFFIXES.choose(rng).copied().unwrap_or("");
            format!("{base}{suffix}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 16 random bytes, hex encoded.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `count` unrecorded samples with random scrambles.
pub fn generate_samples<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<SampleRecord> {
    (0..count)
        .map(|_| SampleRecord {
            id: random_id(rng),
            label: random_scramble(rng),
            file: String::new(),
        })
        .collect()
}
