//! Password quality rules.
//!
//! These checks are pure; the reuse check needs stored hashes and is done
//! by the credential validator between [`PasswordValidator::check_quality`]
//! and [`PasswordValidator::check_username`].

use thiserror::Error;

use crate::policy::PasswordRules;

/// Why a new password was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Shorter than `min-characters`.
    #[error("Password must have at least {0} characters")]
    TooShort(i64),
    /// Fewer letters than `min-letters`.
    #[error("Password must contain at least {0} letter(s)")]
    TooFewLetters(i64),
    /// Fewer capitals than `min-capitals`.
    #[error("Password must contain at least {0} capital letter(s)")]
    TooFewCapitals(i64),
    /// Fewer digits than `min-digits`.
    #[error("Password must contain at least {0} digit(s)")]
    TooFewDigits(i64),
    /// Fewer symbols than `min-non-alpha-numerics`.
    #[error("Password must contain at least {0} non alpha-numeric character(s)")]
    TooFewNonAlphaNumerics(i64),
    /// Contains an immediately repeated group of characters.
    #[error("Password must not contain repetitive groups of characters")]
    RepeatingCharacters,
    /// Matches one of the last N stored passwords.
    #[error("Password already used. Can't use the last {0} passwords")]
    RecentlyUsed(i64),
    /// Contains the username.
    #[error("Password must not contain the username")]
    ContainsUsername,
}

/// Character class counts of a password.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Composition {
    letters: i64,
    capitals: i64,
    digits: i64,
    others: i64,
}

fn composition(password: &str) -> Composition {
    password.chars().fold(Composition::default(), |mut acc, c| {
        if c.is_alphabetic() {
            acc.letters += 1;
            if c.is_uppercase() {
                acc.capitals += 1;
            }
        } else if c.is_numeric() {
            acc.digits += 1;
        } else {
            acc.others += 1;
        }
        acc
    })
}

/// Whether some group of characters is immediately followed by itself
/// (`"aa"`, `"abab"`, `"x123123"`).
pub fn contains_repeating_groups(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    let n = chars.len();

    (0..n).any(|start| {
        (1..=(n - start) / 2)
            .any(|len| chars[start..start + len] == chars[start + len..start + 2 * len])
    })
}

/// Applies the stateless password rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordValidator;

impl PasswordValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Length, composition, then repetition.
    pub fn check_quality(
        &self,
        password: &str,
        rules: &PasswordRules,
    ) -> Result<(), PolicyViolation> {
        let length = password.chars().count() as i64;
        if rules.min_characters > 0 && length < rules.min_characters {
            return Err(PolicyViolation::TooShort(rules.min_characters));
        }

        let counts = composition(password);
        if rules.min_letters > 0 && counts.letters < rules.min_letters {
            return Err(PolicyViolation::TooFewLetters(rules.min_letters));
        }
        if rules.min_capitals > 0 && counts.capitals < rules.min_capitals {
            return Err(PolicyViolation::TooFewCapitals(rules.min_capitals));
        }
        if rules.min_digits > 0 && counts.digits < rules.min_digits {
            return Err(PolicyViolation::TooFewDigits(rules.min_digits));
        }
        if rules.min_non_alpha_numerics > 0 && counts.others < rules.min_non_alpha_numerics {
            return Err(PolicyViolation::TooFewNonAlphaNumerics(
                rules.min_non_alpha_numerics,
            ));
        }

        if !rules.allow_repetitive_characters && contains_repeating_groups(password) {
            return Err(PolicyViolation::RepeatingCharacters);
        }

        Ok(())
    }

    /// Case-insensitive username containment.
    pub fn check_username(
        &self,
        password: &str,
        username: &str,
        rules: &PasswordRules,
    ) -> Result<(), PolicyViolation> {
        if rules.can_contain_username || username.is_empty() {
            return Ok(());
        }
        if password.to_lowercase().contains(&username.to_lowercase()) {
            return Err(PolicyViolation::ContainsUsername);
        }
        Ok(())
    }
}
