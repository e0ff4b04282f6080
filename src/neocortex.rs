/*
 * @file neocortex.rs
 * @brief Persistent conversational memory store
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

//! The neocortex: an on-disk directory holding everything the agent
//! remembers between sessions.
//!
//! Layout:
//!
//! ```text
//! neocortex/
//!   conversation.json         conversation slot
//!   memory_<n>.txt            free-form numbered memory artifacts
//!   self_concept/
//!     name.txt                persona name
//!     base.txt                base self concept
//!     preset.txt              optional preset override
//! ```
//!
//! The directory does not exist until the first save. Restoring or
//! enumerating a store that was never created is a valid "nothing to
//! remember" state, never an error; only real filesystem failures surface
//! as [`StorageError`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::persona::Persona;
use crate::session::Exchange;

const CONVERSATION_FILE: &str = "conversation.json";
const SELF_CONCEPT_DIR: &str = "self_concept";
const NAME_FILE: &str = "name.txt";
const BASE_FILE: &str = "base.txt";
const PRESET_FILE: &str = "preset.txt";

/// One enumerated memory artifact: its file name and its text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    pub label: String,
    pub content: String,
}

/// Everything a restore could recover. Missing slots come back as `None`
/// (or an empty transcript) so callers can keep their current values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Restored {
    pub conversation: Vec<Exchange>,
    pub name: Option<String>,
    pub base_concept: Option<String>,
    pub preset: Option<String>,
}

/// Handle to the on-disk store. Creating the handle touches nothing; the
/// directory appears lazily on the first save.
#[derive(Clone, Debug)]
pub struct Neocortex {
    root: PathBuf,
}

impl Neocortex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the store has ever been saved.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Writes the conversation and self-concept slots, creating the store
    /// if needed. Idempotent: saving the same state twice leaves the same
    /// files behind.
    ///
    /// # Errors
    /// Any filesystem failure surfaces as [`StorageError`]; nothing is
    /// rolled back.
    pub fn save(&self, transcript: &[Exchange], persona: &Persona) -> Result<(), StorageError> {
        let concept_dir = self.root.join(SELF_CONCEPT_DIR);
        fs::create_dir_all(&concept_dir).map_err(|source| StorageError::Write {
            slot: concept_dir.clone(),
            source,
        })?;

        let conversation = self.root.join(CONVERSATION_FILE);
        let encoded = serde_json::to_string_pretty(transcript)
            .map_err(|source| StorageError::Corrupt {
                slot: conversation.clone(),
                source,
            })?;
        write_slot(&conversation, &encoded)?;

        write_slot(&concept_dir.join(NAME_FILE), persona.name())?;
        write_slot(&concept_dir.join(BASE_FILE), persona.base_self_concept())?;
        if let Some(preset) = persona.preset() {
            write_slot(&concept_dir.join(PRESET_FILE), preset)?;
        }
        Ok(())
    }

    /// Reads back whatever slots exist. A store that was never created
    /// yields an empty [`Restored`].
    ///
    /// # Errors
    /// Only real read failures; missing files are not errors.
    pub fn restore(&self) -> Result<Restored, StorageError> {
        let conversation_slot = self.root.join(CONVERSATION_FILE);
        let conversation = match read_slot(&conversation_slot)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                slot: conversation_slot,
                source,
            })?,
            None => Vec::new(),
        };

        let concept_dir = self.root.join(SELF_CONCEPT_DIR);
        Ok(Restored {
            conversation,
            name: read_slot(&concept_dir.join(NAME_FILE))?,
            base_concept: read_slot(&concept_dir.join(BASE_FILE))?,
            preset: read_slot(&concept_dir.join(PRESET_FILE))?,
        })
    }

    /// Lists the store's memory artifacts: every regular file directly
    /// under the root, in stable name order. An absent store yields an
    /// empty list.
    pub fn enumerate(&self) -> Result<Vec<Memory>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Read {
                    slot: self.root.clone(),
                    source,
                })
            }
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Read {
                slot: self.root.clone(),
                source,
            })?;
            if entry.path().is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut memories = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path).map_err(|source| StorageError::Read {
                slot: path.clone(),
                source,
            })?;
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            memories.push(Memory { label, content });
        }
        Ok(memories)
    }

    /// Writes the preset slot, creating the store if needed. A preset set
    /// by voice lands on disk immediately; the base and conversation slots
    /// stay untouched until an explicit save.
    pub fn write_preset(&self, text: &str) -> Result<(), StorageError> {
        let concept_dir = self.root.join(SELF_CONCEPT_DIR);
        fs::create_dir_all(&concept_dir).map_err(|source| StorageError::Write {
            slot: concept_dir.clone(),
            source,
        })?;
        write_slot(&concept_dir.join(PRESET_FILE), text)
    }

    pub fn preset_exists(&self) -> bool {
        self.root.join(SELF_CONCEPT_DIR).join(PRESET_FILE).is_file()
    }

    /// Removes only the preset slot. Deleting a preset that does not exist
    /// is a no-op.
    pub fn delete_preset(&self) -> Result<(), StorageError> {
        let slot = self.root.join(SELF_CONCEPT_DIR).join(PRESET_FILE);
        match fs::remove_file(&slot) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write { slot, source }),
        }
    }
}

fn write_slot(slot: &Path, content: &str) -> Result<(), StorageError> {
    fs::write(slot, content).map_err(|source| StorageError::Write {
        slot: slot.to_path_buf(),
        source,
    })
}

fn read_slot(slot: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(slot) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Read {
            slot: slot.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, Neocortex) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cortex = Neocortex::new(dir.path().join("neocortex"));
        (dir, cortex)
    }

    fn sample_transcript() -> Vec<Exchange> {
        vec![
            Exchange {
                human: "hello there".into(),
                agent: "hello yourself".into(),
            },
            Exchange {
                human: "how are you".into(),
                agent: "quite well".into(),
            },
        ]
    }

    #[test]
    fn store_is_absent_until_first_save() {
        let (_dir, cortex) = store();
        assert!(!cortex.exists());
        cortex
            .save(&sample_transcript(), &Persona::bootstrap())
            .expect("save");
        assert!(cortex.exists());
    }

    #[test]
    fn save_then_restore_round_trips() {
        let (_dir, cortex) = store();
        let mut persona = Persona::bootstrap();
        persona.change_name("marvin").expect("name");
        let transcript = sample_transcript();

        cortex.save(&transcript, &persona).expect("save");
        let restored = cortex.restore().expect("restore");

        assert_eq!(restored.conversation, transcript);
        assert_eq!(restored.name.as_deref(), Some("marvin"));
        assert_eq!(
            restored.base_concept.as_deref(),
            Some(persona.base_self_concept())
        );
        assert_eq!(restored.preset, None);
    }

    #[test]
    fn save_is_idempotent() {
        let (_dir, cortex) = store();
        let persona = Persona::bootstrap();
        let transcript = sample_transcript();
        cortex.save(&transcript, &persona).expect("first save");
        cortex.save(&transcript, &persona).expect("second save");
        assert_eq!(cortex.restore().expect("restore").conversation, transcript);
    }

    #[test]
    fn restore_of_absent_store_is_empty() {
        let (_dir, cortex) = store();
        let restored = cortex.restore().expect("restore");
        assert_eq!(restored, Restored::default());
    }

    #[test]
    fn enumerate_of_absent_store_is_empty() {
        let (_dir, cortex) = store();
        assert!(cortex.enumerate().expect("enumerate").is_empty());
    }

    #[test]
    fn enumerate_lists_top_level_files_in_stable_order() {
        let (_dir, cortex) = store();
        cortex
            .save(&sample_transcript(), &Persona::bootstrap())
            .expect("save");
        fs::write(cortex.root().join("memory_0.txt"), "first memory").expect("artifact");
        fs::write(cortex.root().join("memory_1.txt"), "second memory").expect("artifact");

        let memories = cortex.enumerate().expect("enumerate");
        let labels: Vec<&str> = memories.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["conversation.json", "memory_0.txt", "memory_1.txt"]);
        assert_eq!(memories[1].content, "first memory");
    }

    #[test]
    fn preset_slot_lifecycle() {
        let (_dir, cortex) = store();
        assert!(!cortex.preset_exists());
        cortex.delete_preset().expect("deleting nothing is fine");

        cortex.write_preset("a grumpy poet").expect("write");
        assert!(cortex.preset_exists());
        assert_eq!(
            cortex.restore().expect("restore").preset.as_deref(),
            Some("a grumpy poet")
        );

        cortex.delete_preset().expect("delete");
        assert!(!cortex.preset_exists());
    }
}
