//! Persisted bottle configuration.
//!
//! [`BarConfig`] is the structured record the configuration surface edits:
//! twelve slot assignments, the pantry, the substitution map, the safe-mode
//! flag, the shot size, and the GPIO pin map. It owns configuration truth
//! only — physical axis truth lives in the dispense controller and the two
//! are never merged.
//!
//! Ingredient names are case-insensitive and trimmed; normalization runs
//! on every load so the resolver can compare names directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigWarning};
use crate::pins::PinMap;

/// Number of bottle positions on the turret.
pub const SLOT_COUNT: usize = 12;

/// Lowercase and trim an ingredient name; empty input becomes `None`.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// BarConfig
// ---------------------------------------------------------------------------

/// The persisted configuration record.
///
/// Field set is exactly what the configuration surface round-trips:
/// `slots`, `pantry`, `substitutions`, `safe_mode`, `shot_size`, `pins`.
/// Motion tuning lives in [`MotionParams`](crate::turret::MotionParams)
/// and is not part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Slot index → loaded ingredient, `None` for an empty position.
    pub slots: [Option<String>; SLOT_COUNT],
    /// Ingredients on hand but not loaded in any slot (manual add).
    pub pantry: Vec<String>,
    /// Required-name → stand-in-name. Single hop, never chained.
    pub substitutions: BTreeMap<String, String>,
    /// When set, sequencing runs but no output pin is ever asserted.
    pub safe_mode: bool,
    /// Ounces per dispense unit. Pour volume = `shot_size` × quantity.
    pub shot_size: f64,
    /// GPIO assignments for the four output signals.
    pub pins: PinMap,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            slots: Default::default(),
            pantry: Vec::new(),
            substitutions: BTreeMap::new(),
            safe_mode: true,
            shot_size: 1.5,
            pins: PinMap::default(),
        }
    }
}

impl BarConfig {
    /// Normalize every ingredient name in place.
    ///
    /// Slots: trimmed and case-folded, blanks become empty positions.
    /// Pantry: normalized and deduplicated, first occurrence kept.
    /// Substitutions: keys and values normalized; entries whose key or
    /// value normalizes to nothing are dropped.
    pub fn normalize(&mut self) {
        for slot in &mut self.slots {
            *slot = slot.as_deref().and_then(normalize_name);
        }

        let mut pantry = Vec::with_capacity(self.pantry.len());
        for item in self.pantry.drain(..) {
            if let Some(name) = normalize_name(&item) {
                if !pantry.contains(&name) {
                    pantry.push(name);
                }
            }
        }
        self.pantry = pantry;

        let subs = std::mem::take(&mut self.substitutions);
        for (key, value) in subs {
            if let (Some(k), Some(v)) = (normalize_name(&key), normalize_name(&value)) {
                self.substitutions.insert(k, v);
            }
        }
    }

    /// Validate the record. Hard errors reject the config outright;
    /// duplicate slot ingredients come back as warnings because both
    /// slots remain independently addressable.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.pins.validate()?;

        if !self.shot_size.is_finite() || self.shot_size <= 0.0 {
            return Err(ConfigError::InvalidShotSize(self.shot_size));
        }

        let mut warnings = Vec::new();
        for (i, ingredient) in self.slots.iter().enumerate() {
            let Some(name) = ingredient else { continue };
            if let Some(kept) = self.slots[..i]
                .iter()
                .position(|s| s.as_deref() == Some(name))
            {
                warnings.push(ConfigWarning::DuplicateSlotIngredient {
                    ingredient: name.clone(),
                    kept,
                    duplicate: i,
                });
            }
        }
        Ok(warnings)
    }

    /// Parse, normalize, and validate a JSON record.
    pub fn from_json(json: &str) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.normalize();
        let warnings = config.validate()?;
        Ok((config, warnings))
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
