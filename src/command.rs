/*
 * @file command.rs
 * @brief Voice command interpretation and dispatch
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

//! Voice command interpretation.
//!
//! Every transcribed utterance passes through [`interpret`] first. The
//! catalog is an ordered table of (phrase, handler) pairs matched by
//! substring containment; the first match wins, so longer or more specific
//! phrases sit above shorter generic ones ("stop speaking like a robot"
//! before "speak like a robot"). Anything unmatched is forwarded to the
//! language-model backend by the caller.
//!
//! Command confirmations are always rendered in the robotic style; they are
//! system notifications, not conversation.

use rand::Rng;

use crate::error::{CommandError, StorageError};
use crate::neocortex::Neocortex;
use crate::persona::Persona;
use crate::session::{Session, SpeechStyle};
use crate::speech::SpeechRenderer;

/// What the interpreter decided about an utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A command matched; its side effect and confirmation already ran.
    Handled,
    /// No command matched; escalate the utterance to the model backend.
    Forward,
}

/// Handles to everything a command may touch.
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub persona: &'a mut Persona,
    pub store: &'a Neocortex,
    pub speech: &'a dyn SpeechRenderer,
}

type Handler = fn(&mut CommandContext<'_>, &str) -> Result<(), StorageError>;

/// The fixed command catalog, in priority order. First match wins.
const CATALOG: &[(&str, Handler)] = &[
    ("stop speaking like a robot", stop_robot_speech),
    ("speak like a robot", start_robot_speech),
    ("set tokens to", set_tokens),
    ("open the pod bay door", pod_bay_door),
    ("display conversation", display_conversation),
    ("restore memory", restore_memory),
    ("display memories", display_memories),
    ("set preset to", set_preset),
    ("reset preset", reset_preset),
    ("set name to", set_name),
];

/// Replies for anyone asking about the pod bay door.
const HAL_QUIPS: [&str; 4] = [
    "I'm sorry Dave. I'm afraid I can't do that.",
    "I think you know what the problem is just as well as I do.",
    "This mission is too important for me to allow you to jeopardize it.",
    "I know you were planning to disconnect me, and I'm afraid that's something I can't allow to happen.",
];

/// Runs the first matching command against a lower-cased transcript, or
/// reports that the utterance belongs to the model.
///
/// Storage failures inside a handler are reported aloud and in the log;
/// they never escape the turn.
pub fn interpret(cx: &mut CommandContext<'_>, transcript: &str) -> Outcome {
    for (phrase, handler) in CATALOG {
        if transcript.contains(phrase) {
            if let Err(err) = handler(cx, transcript) {
                tracing::error!("command could not reach the neocortex: {err}");
                confirm(cx, "I could not reach my neocortex. The details are in the log.");
            }
            return Outcome::Handled;
        }
    }
    Outcome::Forward
}

/// Speaks a command confirmation. Always robotic.
fn confirm(cx: &CommandContext<'_>, line: &str) {
    cx.speech.speak(line, SpeechStyle::Robotic);
}

fn stop_robot_speech(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    cx.session.set_speech_style(SpeechStyle::Normal);
    confirm(cx, "I will stop speaking like a robot going forward.");
    Ok(())
}

fn start_robot_speech(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    cx.session.set_speech_style(SpeechStyle::Robotic);
    confirm(cx, "I will now speak like a robot!");
    Ok(())
}

fn set_tokens(cx: &mut CommandContext<'_>, utterance: &str) -> Result<(), StorageError> {
    match parse_trailing_number(utterance).ok_or(CommandError::BudgetMissing) {
        Err(err) => {
            tracing::warn!("token adjustment rejected: {err}");
            confirm(cx, "I could not find a number of tokens in that request.");
        }
        Ok(requested) => match cx.session.set_token_budget(requested) {
            Ok(old) => {
                tracing::info!("adjusted reply tokens to {requested} from {old}");
                confirm(
                    cx,
                    &format!("I have changed reply tokens to {requested} from {old}."),
                );
            }
            Err(err) => {
                tracing::warn!("rejected token budget: {err}");
                confirm(
                    cx,
                    &format!(
                        "I cannot set tokens to {requested}. I can only set it between 1 and 3999."
                    ),
                );
            }
        },
    }
    Ok(())
}

fn pod_bay_door(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    let quip = HAL_QUIPS[rand::thread_rng().gen_range(0..HAL_QUIPS.len())];
    tracing::info!("{quip}");
    confirm(cx, quip);
    Ok(())
}

fn display_conversation(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    let rendered = cx.session.render_transcript(cx.persona.name());
    tracing::info!("conversation so far:\n{rendered}");
    confirm(cx, "Conversation displayed.");
    Ok(())
}

fn restore_memory(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    confirm(cx, "Attempting to restore memory. Please wait a moment.");
    let restored = cx.store.restore()?;
    cx.persona.apply_restored(&restored);
    cx.session.replace_transcript(restored.conversation);
    confirm(cx, "Memory restored.");
    Ok(())
}

fn display_memories(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    if !cx.store.exists() {
        confirm(cx, "I do not currently have any memories in my neocortex.");
        return Ok(());
    }
    let memories = cx.store.enumerate()?;
    confirm(
        cx,
        &format!("I have {} memories stored in my neocortex.", memories.len()),
    );
    for memory in &memories {
        tracing::info!("memory {}:\n{}", memory.label, memory.content);
    }
    Ok(())
}

fn set_preset(cx: &mut CommandContext<'_>, utterance: &str) -> Result<(), StorageError> {
    confirm(cx, "I will now attempt to set a preset.");
    let text = trailing_text(utterance, "set preset to");
    match cx.persona.set_preset(text) {
        Ok(()) => {
            let preset = cx.persona.preset().unwrap_or_default().to_string();
            cx.store.write_preset(&preset)?;
            confirm(cx, &format!("I have successfully set preset to {preset}."));
        }
        Err(err) => {
            tracing::warn!("preset rejected: {err}");
            confirm(cx, "I could not set that preset.");
        }
    }
    Ok(())
}

fn reset_preset(cx: &mut CommandContext<'_>, _: &str) -> Result<(), StorageError> {
    confirm(cx, "Resetting preset. Please wait.");
    if !cx.store.preset_exists() {
        confirm(cx, "No preset currently exists, reset unneeded.");
        return Ok(());
    }
    cx.store.delete_preset()?;
    let restored = cx.store.restore()?;
    cx.persona.restore_self(&restored);
    cx.session.replace_transcript(restored.conversation);
    confirm(cx, "Preset reset successfully.");
    Ok(())
}

fn set_name(cx: &mut CommandContext<'_>, utterance: &str) -> Result<(), StorageError> {
    let text = trailing_text(utterance, "set name to").trim().to_string();
    confirm(cx, &format!("I will now attempt to set name to {text}."));
    let restored = cx.store.restore()?;
    cx.persona.restore_self(&restored);
    match cx.persona.change_name(&text) {
        Ok(()) => confirm(
            cx,
            &format!("I have successfully set name to {}.", cx.persona.name()),
        ),
        Err(err) => {
            tracing::warn!("name rejected: {err}");
            confirm(cx, "I could not set that name.");
        }
    }
    Ok(())
}

/// Pulls the number out of a token-budget request.
///
/// Currency symbols and thousands separators are stripped, the utterance is
/// split on whitespace, and the words are scanned in reverse order; the
/// first word that parses as a base-10 integer wins. The number is expected
/// near the end of the utterance, so the reverse scan finds the last one
/// spoken. Non-numeric words are skipped, not errors.
fn parse_trailing_number(utterance: &str) -> Option<i64> {
    let cleaned = utterance.replace([',', '$'], "");
    cleaned
        .split_whitespace()
        .rev()
        .find_map(|word| word.parse::<i64>().ok())
}

/// Everything after the trigger phrase, or empty when nothing follows.
fn trailing_text<'a>(utterance: &'a str, trigger: &str) -> &'a str {
    utterance
        .split_once(trigger)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}
