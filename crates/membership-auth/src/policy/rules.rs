//! Typed view over the `password-rules` parameter group.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use membership_entity::policy::keys;

/// Coerce a parameter to an integer.
///
/// Missing or malformed values read as `0`, which disables the rule they
/// control.
pub fn get_int(params: &HashMap<String, String>, key: &str) -> i64 {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// The eleven password rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRules {
    /// Days a new password stays valid; `0` never expires.
    pub change_interval_days: i64,
    /// Minutes of the rolling failure window.
    pub fail_interval_minutes: i64,
    /// Failures within the window that lock the account; `0` disables locking.
    pub max_failed_attempts: i64,
    /// Previous passwords that may not be reused; `0` disables.
    pub not_repeat_last: i64,
    /// Minimum length in characters.
    pub min_characters: i64,
    /// Minimum letters.
    pub min_letters: i64,
    /// Minimum capital letters.
    pub min_capitals: i64,
    /// Minimum digits.
    pub min_digits: i64,
    /// Minimum non-alphanumeric characters.
    pub min_non_alpha_numerics: i64,
    /// Whether repeated character groups are allowed.
    pub allow_repetitive_characters: bool,
    /// Whether the password may contain the username.
    pub can_contain_username: bool,
}

impl PasswordRules {
    /// Read the rules from a loaded parameter group.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            change_interval_days: get_int(params, keys::CHANGE_INTERVAL),
            fail_interval_minutes: get_int(params, keys::PASSWORD_FAIL_INTERVAL),
            max_failed_attempts: get_int(params, keys::MAX_ALLOWED_FAILED_ATTEMPTS),
            not_repeat_last: get_int(params, keys::NOT_REPEAT_LAST_X_PASSWORDS),
            min_characters: get_int(params, keys::MIN_CHARACTERS),
            min_letters: get_int(params, keys::MIN_LETTERS),
            min_capitals: get_int(params, keys::MIN_CAPITALS),
            min_digits: get_int(params, keys::MIN_DIGITS),
            min_non_alpha_numerics: get_int(params, keys::MIN_NON_ALPHA_NUMERICS),
            allow_repetitive_characters: get_int(params, keys::ALLOW_REPETITIVE_CHARACTERS) > 0,
            can_contain_username: get_int(params, keys::CAN_CONTAIN_USERNAME) > 0,
        }
    }

    /// Whether failed logins can ever lock an account.
    pub fn lockout_enabled(&self) -> bool {
        self.max_failed_attempts > 0
    }
}
