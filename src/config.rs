//! Engine configuration.
//!
//! Defaults mirror the deployed form: a 300 ms save debounce, 50 photos per
//! location and the `dae_inspection_*` storage namespaces.

use std::time::Duration;

/// Default quiet period before a field flush.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default photo capacity per (project, location).
pub const DEFAULT_MAX_PHOTOS: usize = 50;

pub const DEFAULT_FIELD_KEY_PREFIX: &str = "dae_inspection_data";
pub const DEFAULT_PHOTO_KEY_PREFIX: &str = "dae_inspection_photos";

/// Environment override for the debounce delay, in milliseconds.
pub const ENV_DEBOUNCE_MS: &str = "INSPECTION_DEBOUNCE_MS";

/// Environment override for the per-location photo capacity.
pub const ENV_MAX_PHOTOS: &str = "INSPECTION_MAX_PHOTOS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    pub debounce_delay: Duration,
    pub max_photos_per_location: usize,
    pub field_key_prefix: String,
    pub photo_key_prefix: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            max_photos_per_location: DEFAULT_MAX_PHOTOS,
            field_key_prefix: DEFAULT_FIELD_KEY_PREFIX.to_string(),
            photo_key_prefix: DEFAULT_PHOTO_KEY_PREFIX.to_string(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with overrides from `INSPECTION_DEBOUNCE_MS` / `INSPECTION_MAX_PHOTOS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.debounce_delay = Duration::from_millis(ms),
                Err(e) => log::warn!("CONFIG_IGNORED var={} value={:?} error={}", ENV_DEBOUNCE_MS, raw, e),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_PHOTOS) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.max_photos_per_location = max,
                Ok(_) => log::warn!("CONFIG_IGNORED var={} value={:?} error=zero", ENV_MAX_PHOTOS, raw),
                Err(e) => log::warn!("CONFIG_IGNORED var={} value={:?} error={}", ENV_MAX_PHOTOS, raw, e),
            }
        }

        config
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_max_photos(mut self, max: usize) -> Self {
        self.max_photos_per_location = max;
        self
    }

    pub fn with_field_key_prefix(mut self, prefix: &str) -> Self {
        self.field_key_prefix = prefix.to_string();
        self
    }

    pub fn with_photo_key_prefix(mut self, prefix: &str) -> Self {
        self.photo_key_prefix = prefix.to_string();
        self
    }
}
