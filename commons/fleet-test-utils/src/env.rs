//! Environment variable test helpers.
//!
//! Config records are read from the process environment, so tests that
//! exercise them need scoped mutation with restore-on-drop.

/// RAII guard that restores (or unsets) the original value when dropped.
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

impl EnvGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            if let Some(ref v) = self.prev {
                std::env::set_var(&self.key, v);
            } else {
                std::env::remove_var(&self.key);
            }
        }
    }
}

/// Set an environment variable returning a guard that restores the
/// previous value when dropped.
pub fn set_env_guarded(key: &str, val: &str) -> EnvGuard {
    let prev = std::env::var(key).ok();
    unsafe {
        std::env::set_var(key, val);
    }
    EnvGuard {
        key: key.to_string(),
        prev,
    }
}

/// Builder-style collection of environment guards. Dropping restores all
/// keys.
pub struct Env {
    guards: Vec<EnvGuard>,
}

impl Env {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Set a key -> val, capturing previous value; chainable.
    pub fn set(mut self, key: &str, val: &str) -> Self {
        self.guards.push(set_env_guarded(key, val));
        self
    }

    /// Mutable variant for iterative construction.
    pub fn insert(&mut self, key: &str, val: &str) {
        self.guards.push(set_env_guarded(key, val));
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_value() {
        let key = "FLEET_TEST_UTILS_ENV_GUARD";
        unsafe { std::env::set_var(key, "before") };
        {
            let _g = set_env_guarded(key, "during");
            assert_eq!(std::env::var(key).unwrap(), "during");
        }
        assert_eq!(std::env::var(key).unwrap(), "before");
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn guard_unsets_when_previously_absent() {
        let key = "FLEET_TEST_UTILS_ENV_ABSENT";
        unsafe { std::env::remove_var(key) };
        {
            let _g = set_env_guarded(key, "during");
            assert_eq!(std::env::var(key).unwrap(), "during");
        }
        assert!(std::env::var(key).is_err());
    }
}
