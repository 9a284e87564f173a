pub mod env;

pub use env::{Env, EnvGuard, set_env_guarded};

// DNS-1123 safe numeric suffix for unique resource names in tests.
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}
