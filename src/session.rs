//! Session state for one running conversation.
//!
//! The [`Session`] value object owns everything a single conversation
//! mutates: the turn counter, the reply token budget, the speech style, the
//! cooperative cancel flag, and the transcript itself. Only the worker cycle
//! and the command interpreter touch it, and only one listen cycle is ever
//! in flight, so no locking is needed beyond the cross-thread [`Signals`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Smallest accepted reply token budget.
pub const MIN_TOKEN_BUDGET: i64 = 1;

/// Largest accepted reply token budget.
pub const MAX_TOKEN_BUDGET: i64 = 3999;

/// Budget used until the user adjusts it by voice.
pub const DEFAULT_TOKEN_BUDGET: u16 = 250;

/// How replies are rendered aloud.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeechStyle {
    #[default]
    Normal,
    Robotic,
}

/// Where the turn controller currently is in its cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Listening,
    Processing,
    Cancelled,
}

/// One completed exchange: what the human said and what the agent replied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub human: String,
    pub agent: String,
}

/// Mutable state of one running conversation.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    turn_count: u32,
    reply_token_budget: u16,
    speech_style: SpeechStyle,
    cancel_requested: bool,
    transcript: Vec<Exchange>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            turn_count: 0,
            reply_token_budget: DEFAULT_TOKEN_BUDGET,
            speech_style: SpeechStyle::Normal,
            cancel_requested: false,
            transcript: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn reply_token_budget(&self) -> u16 {
        self.reply_token_budget
    }

    pub fn speech_style(&self) -> SpeechStyle {
        self.speech_style
    }

    pub fn set_speech_style(&mut self, style: SpeechStyle) {
        self.speech_style = style;
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// Replaces the reply token budget, returning the previous value.
    ///
    /// # Errors
    /// Returns [`CommandError::BudgetOutOfRange`] for values outside 1-3999;
    /// the budget is left unchanged in that case.
    pub fn set_token_budget(&mut self, requested: i64) -> Result<u16, CommandError> {
        if !(MIN_TOKEN_BUDGET..=MAX_TOKEN_BUDGET).contains(&requested) {
            return Err(CommandError::BudgetOutOfRange { requested });
        }
        let old = self.reply_token_budget;
        self.reply_token_budget = requested as u16;
        Ok(old)
    }

    /// Enters the listening phase and clears any stale cancel request.
    pub fn begin_listening(&mut self) {
        self.cancel_requested = false;
        self.phase = Phase::Listening;
    }

    /// Enters the processing phase once a transcript is in hand.
    pub fn begin_processing(&mut self) {
        self.phase = Phase::Processing;
    }

    /// Records a user interrupt. Observed cooperatively by the worker cycle.
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// Consumes a pending cancel request, moving to [`Phase::Cancelled`]
    /// when one was set.
    pub fn observe_cancel(&mut self) -> bool {
        if self.cancel_requested {
            self.cancel_requested = false;
            self.phase = Phase::Cancelled;
            return true;
        }
        false
    }

    /// Returns the controller to idle after a completed or aborted turn.
    pub fn finish_turn(&mut self) {
        self.cancel_requested = false;
        self.phase = Phase::Idle;
    }

    /// Appends a completed model exchange and advances the turn counter.
    pub fn append_exchange(&mut self, human: impl Into<String>, agent: impl Into<String>) {
        self.transcript.push(Exchange {
            human: human.into(),
            agent: agent.into(),
        });
        self.turn_count += 1;
    }

    /// Swaps in a transcript reconstituted from the neocortex.
    pub fn replace_transcript(&mut self, transcript: Vec<Exchange>) {
        self.transcript = transcript;
    }

    /// Renders the transcript as readable text, one line per speaker.
    pub fn render_transcript(&self, agent_name: &str) -> String {
        let mut out = String::new();
        for exchange in &self.transcript {
            out.push_str("Human: ");
            out.push_str(&exchange.human);
            out.push('\n');
            out.push_str(agent_name);
            out.push_str(": ");
            out.push_str(&exchange.agent);
            out.push('\n');
        }
        out
    }
}

/// Cross-thread signal flags.
///
/// The input-event loop is the sole producer; the worker cycle is the sole
/// consumer. The `working` flag keeps listen requests from overlapping an
/// in-flight cycle.
#[derive(Clone, Default)]
pub struct Signals {
    inner: Arc<SignalFlags>,
}

#[derive(Default)]
struct SignalFlags {
    listen: AtomicBool,
    cancel: AtomicBool,
    quit: AtomicBool,
    save_on_quit: AtomicBool,
    working: AtomicBool,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_listen(&self) {
        self.inner.listen.store(true, Ordering::SeqCst);
    }

    /// Takes a pending listen request, clearing it.
    pub fn take_listen_request(&self) -> bool {
        self.inner.listen.swap(false, Ordering::SeqCst)
    }

    pub fn request_cancel(&self) {
        self.inner.cancel.store(true, Ordering::SeqCst);
    }

    pub fn cancel_requested(&self) -> bool {
        self.inner.cancel.load(Ordering::SeqCst)
    }

    pub fn clear_cancel(&self) {
        self.inner.cancel.store(false, Ordering::SeqCst);
    }

    /// Asks the worker to shut down, optionally saving memories first.
    pub fn request_quit(&self, save: bool) {
        self.inner.save_on_quit.store(save, Ordering::SeqCst);
        self.inner.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.inner.quit.load(Ordering::SeqCst)
    }

    pub fn save_requested(&self) -> bool {
        self.inner.save_on_quit.load(Ordering::SeqCst)
    }

    pub fn set_working(&self, working: bool) {
        self.inner.working.store(working, Ordering::SeqCst);
    }

    pub fn is_working(&self) -> bool {
        self.inner.working.load(Ordering::SeqCst)
    }
}
