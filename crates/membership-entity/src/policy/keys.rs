//! Well-known parameter groups and keys.

/// Group holding the password rules.
pub const PASSWORD_RULES: &str = "password-rules";

/// Days a new password stays valid; `0` never expires.
pub const CHANGE_INTERVAL: &str = "change-interval";
/// Minutes of the rolling failure window.
pub const PASSWORD_FAIL_INTERVAL: &str = "password-fail-interval";
/// Failures within the window that lock the account; `0` disables locking.
pub const MAX_ALLOWED_FAILED_ATTEMPTS: &str = "max-allowed-failed-atmpts";
/// Number of previous passwords that may not be reused; `0` disables.
pub const NOT_REPEAT_LAST_X_PASSWORDS: &str = "not-repeat-last-x-passwords";
/// Minimum password length.
pub const MIN_CHARACTERS: &str = "min-characters";
/// Minimum number of letters.
pub const MIN_LETTERS: &str = "min-letters";
/// Minimum number of capital letters.
pub const MIN_CAPITALS: &str = "min-capitals";
/// Minimum number of digits.
pub const MIN_DIGITS: &str = "min-digits";
/// Minimum number of non-alphanumeric characters.
pub const MIN_NON_ALPHA_NUMERICS: &str = "min-non-alpha-numerics";
/// Non-zero allows immediately repeated character groups.
pub const ALLOW_REPETITIVE_CHARACTERS: &str = "allow-repetitive-characters";
/// Non-zero allows the password to contain the username.
pub const CAN_CONTAIN_USERNAME: &str = "can-contain-username";

/// Values seeded into [`PASSWORD_RULES`] on initialization.
pub const PASSWORD_RULE_DEFAULTS: [(&str, &str); 11] = [
    (CHANGE_INTERVAL, "30"),
    (PASSWORD_FAIL_INTERVAL, "10"),
    (MAX_ALLOWED_FAILED_ATTEMPTS, "3"),
    (NOT_REPEAT_LAST_X_PASSWORDS, "5"),
    (MIN_CHARACTERS, "8"),
    (MIN_LETTERS, "2"),
    (MIN_CAPITALS, "1"),
    (MIN_DIGITS, "1"),
    (MIN_NON_ALPHA_NUMERICS, "1"),
    (ALLOW_REPETITIVE_CHARACTERS, "0"),
    (CAN_CONTAIN_USERNAME, "0"),
];

/// Roles seeded on initialization.
pub const DEFAULT_ROLES: [&str; 3] = ["Administrator", "Member", "All"];
