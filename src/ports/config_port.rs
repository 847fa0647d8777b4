//! Configuration access port trait.

use crate::domain::error::StockError;

/// Typed access to `[section] key` values. The integer and boolean getters
/// return `default` when the key is absent or does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-blank value, or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, StockError> {
        self.get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StockError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
