//! Layered settings for one instance.
//!
//! An instance sees two layers of settings: the immutable `base` layer from
//! the simulation description, fetched from the manager at connect time, and
//! the `overlay` layer installed afresh at each reuse iteration. Lookups
//! walk the overlay before the base, and within each layer try the most
//! instance-specific key first.

use mcf_coupling_model::{Reference, SettingValue, Settings, SettingsError};

/// Holds the base and overlay settings layers for one instance.
#[derive(Debug, Default)]
pub struct SettingsManager {
    /// Simulation-wide settings, fixed at connect time.
    pub base: Settings,
    /// Per-iteration settings, shadowing the base layer.
    pub overlay: Settings,
}

impl SettingsManager {
    /// Create a settings manager with both layers empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a setting value for the given instance.
    ///
    /// A setting may be bound globally (`dt`) or scoped to an instance or a
    /// group of instances (`macro.dt`, `macro[3].dt`). The most specific
    /// binding wins; the overlay layer shadows the base layer at every
    /// specificity.
    pub fn get_setting(
        &self,
        instance: &Reference,
        name: &Reference,
    ) -> Result<SettingValue, SettingsError> {
        for layer in [&self.overlay, &self.base] {
            for prefix_len in (0..=instance.len()).rev() {
                let key = if prefix_len > 0 {
                    instance.truncated(prefix_len).join(name)
                } else {
                    name.clone()
                };
                if let Some(value) = layer.get(&key) {
                    return Ok(value.clone());
                }
            }
        }
        Err(SettingsError::NotSet(name.to_string()))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
