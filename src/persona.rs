/*
 * @file persona.rs
 * @brief Agent identity and self-concept management
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! The agent's identity: a name, a base self concept, and an optional
//! preset layered above the base.
//!
//! At most one preset is active at a time; setting a new one replaces the
//! old, never merges. Resetting restores whatever baseline the neocortex
//! last saved, not a hardcoded default, so a reset before any save lands
//! back on the bootstrap values only because nothing newer exists on disk.

use crate::error::PersonaError;
use crate::neocortex::Restored;

/// Name the agent bootstraps with before any restore.
pub const DEFAULT_NAME: &str = "Aibot";

/// Disposition the agent bootstraps with before any restore.
pub const DEFAULT_SELF_CONCEPT: &str = "I am a friendly conversational assistant. \
I listen carefully, keep my replies short and spoken-word natural, and stay \
helpful with a hint of dry humor.";

/// The agent's identity record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    name: String,
    base_self_concept: String,
    preset: Option<String>,
}

impl Persona {
    /// Builds the default persona used until a restore supplies saved state.
    pub fn bootstrap() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            base_self_concept: DEFAULT_SELF_CONCEPT.to_string(),
            preset: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_self_concept(&self) -> &str {
        &self.base_self_concept
    }

    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    /// The self concept currently in force: the preset when one is active,
    /// the base otherwise.
    pub fn effective_self_concept(&self) -> &str {
        self.preset.as_deref().unwrap_or(&self.base_self_concept)
    }

    /// Replaces any active preset with `text`.
    ///
    /// # Errors
    /// [`PersonaError::InvalidPreset`] when `text` trims to nothing; the
    /// current preset stays in place.
    pub fn set_preset(&mut self, text: &str) -> Result<(), PersonaError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PersonaError::InvalidPreset);
        }
        self.preset = Some(trimmed.to_string());
        Ok(())
    }

    /// Drops the active preset, leaving the base concept in force.
    pub fn clear_preset(&mut self) {
        self.preset = None;
    }

    /// Renames the agent.
    ///
    /// # Errors
    /// [`PersonaError::InvalidName`] when `text` trims to nothing.
    pub fn change_name(&mut self, text: &str) -> Result<(), PersonaError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PersonaError::InvalidName);
        }
        self.name = trimmed.to_string();
        Ok(())
    }

    /// Adopts everything a restore recovered, including a persisted preset.
    /// Missing slots keep their current values.
    pub fn apply_restored(&mut self, restored: &Restored) {
        if let Some(name) = &restored.name {
            self.name = name.clone();
        }
        if let Some(base) = &restored.base_concept {
            self.base_self_concept = base.clone();
        }
        self.preset = restored.preset.clone();
    }

    /// Falls back to the saved base identity, discarding any in-memory
    /// preset. Used before renames and preset resets.
    pub fn restore_self(&mut self, restored: &Restored) {
        if let Some(name) = &restored.name {
            self.name = name.clone();
        }
        if let Some(base) = &restored.base_concept {
            self.base_self_concept = base.clone();
        }
        self.preset = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_concept_prefers_the_preset() {
        let mut persona = Persona::bootstrap();
        assert_eq!(persona.effective_self_concept(), DEFAULT_SELF_CONCEPT);

        persona.set_preset("a ship computer with opinions").expect("preset");
        assert_eq!(
            persona.effective_self_concept(),
            "a ship computer with opinions"
        );

        persona.clear_preset();
        assert_eq!(persona.effective_self_concept(), DEFAULT_SELF_CONCEPT);
    }

    #[test]
    fn a_new_preset_replaces_the_old_one() {
        let mut persona = Persona::bootstrap();
        persona.set_preset("first").expect("preset");
        persona.set_preset("second").expect("preset");
        assert_eq!(persona.preset(), Some("second"));
    }

    #[test]
    fn empty_preset_is_rejected_without_mutation() {
        let mut persona = Persona::bootstrap();
        persona.set_preset("keeper").expect("preset");
        assert_eq!(
            persona.set_preset("   "),
            Err(PersonaError::InvalidPreset)
        );
        assert_eq!(persona.preset(), Some("keeper"));
    }

    #[test]
    fn empty_name_is_rejected_without_mutation() {
        let mut persona = Persona::bootstrap();
        assert_eq!(persona.change_name("  \n"), Err(PersonaError::InvalidName));
        assert_eq!(persona.name(), DEFAULT_NAME);

        persona.change_name(" hal ").expect("name");
        assert_eq!(persona.name(), "hal");
    }

    #[test]
    fn restore_self_drops_the_preset_but_keeps_saved_identity() {
        let mut persona = Persona::bootstrap();
        persona.set_preset("temporary mood").expect("preset");

        let restored = Restored {
            name: Some("marvin".into()),
            base_concept: Some("a paranoid android".into()),
            ..Restored::default()
        };
        persona.restore_self(&restored);

        assert_eq!(persona.name(), "marvin");
        assert_eq!(persona.effective_self_concept(), "a paranoid android");
        assert_eq!(persona.preset(), None);
    }

    #[test]
    fn apply_restored_keeps_current_values_for_missing_slots() {
        let mut persona = Persona::bootstrap();
        persona.apply_restored(&Restored::default());
        assert_eq!(persona.name(), DEFAULT_NAME);
        assert_eq!(persona.base_self_concept(), DEFAULT_SELF_CONCEPT);

        let restored = Restored {
            preset: Some("persisted preset".into()),
            ..Restored::default()
        };
        persona.apply_restored(&restored);
        assert_eq!(persona.effective_self_concept(), "persisted preset");
    }
}
