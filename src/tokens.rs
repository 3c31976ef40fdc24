//! Short token generation
//!
//! Tokens are drawn uniformly from a 62 symbol alphabet. Drawing is not a hash of the URL, so
//! uniqueness is only guaranteed by the store rejecting a duplicate insert. The chance that a
//! fresh candidate hits an existing token is `n / 62^L` for `n` stored links, and the chance that
//! any two of `n` tokens collide is bounded by the birthday approximation `n² / (2 · 62^L)`. At
//! `L = 6` the first one stays below 0.002% up to a million links, which keeps retries rare. The
//! bound is logged at startup, grow `SHORT_URL_LENGTH` when retries show up in the logs.

/// All symbols a short token can consist of
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// First path segments of other routes, a link under one of these could never be reached
pub const RESERVED_TOKENS: &[&str] = &["admin", "report", "shorten"];

/// Source of candidate tokens
pub trait TokenGenerator: Send + Sync + 'static {
    /// Draw a candidate token of exactly `length` symbols from [`ALPHABET`]
    fn generate(&self, length: usize) -> String;
}

/// Uniformly random tokens from the thread local generator
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn generate(&self, length: usize) -> String {
        std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(length)
            .collect()
    }
}

/// Could this be a token we issued?
///
/// Only the symbols are checked, not the length: tokens issued before the length was raised
/// must keep working.
pub fn is_well_formed(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| ALPHABET.contains(&byte))
}

/// Is the token taken by a route?
pub fn is_reserved(token: &str) -> bool {
    RESERVED_TOKENS.contains(&token)
}

/// Size of the token space for a given length
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn token_space(length: usize) -> f64 {
    (ALPHABET.len() as f64).powi(length as i32)
}

/// Birthday bound on the chance that `stored` tokens of `length` symbols contain a collision
#[allow(clippy::cast_precision_loss)]
pub fn collision_probability(stored: u64, length: usize) -> f64 {
    let stored = stored as f64;

    (stored * stored / (2.0 * token_space(length))).min(1.0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_random_tokens_shape() {
        for length in [1, 6, 12] {
            let token = RandomTokens.generate(length);

            assert_eq!(length, token.len());
            assert!(is_well_formed(&token), "{token} uses unknown symbols");
        }
    }

    #[test]
    fn test_random_tokens_vary() {
        let tokens = (0..100)
            .map(|_| RandomTokens.generate(6))
            .collect::<HashSet<_>>();

        // 100 draws out of 62^6 should practically never repeat
        assert!(tokens.len() > 95);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abc123"));
        assert!(is_well_formed("Z"));
        assert!(is_well_formed("abcdefghij"));

        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc-12"));
        assert!(!is_well_formed("abc 12"));
        assert!(!is_well_formed("äbc123"));
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("report"));
        assert!(is_reserved("admin"));
        assert!(!is_reserved("Report"));
        assert!(!is_reserved("abc123"));
    }

    #[test]
    fn test_collision_probability() {
        assert!((token_space(6) - 56_800_235_584.0).abs() < 1.0);

        assert!(collision_probability(0, 6).abs() < f64::EPSILON);
        assert!(collision_probability(1_000, 6) < 0.0001);
        assert!(collision_probability(1_000_000, 6) > 0.001);
        assert!((collision_probability(1_000, 1) - 1.0).abs() < f64::EPSILON);
    }
}
