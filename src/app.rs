/*
 * @file app.rs
 * @brief Session runtime, status display, and the listen-interpret-respond cycle
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

//! The session runtime.
//!
//! Two loops cooperate here. The input-event loop owns the keyboard and
//! the colored status line and is the sole producer of start-listen,
//! cancel, and quit signals. The worker loop owns every piece of mutable
//! conversation state and drives the listen, interpret, respond cycle one
//! turn at a time; the `working` flag keeps a second cycle from starting
//! while one is in flight. Cancellation is cooperative: it is checked
//! right after capture and again after recognition, and either check ends
//! the turn without touching the model or the transcript.
//!
//! Keys: space starts a listen, `p` cancels the in-flight turn, `q` saves
//! memories and exits, escape exits without saving.

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal;

use crate::command::{self, CommandContext, Outcome};
use crate::config::Config;
use crate::listen::{CaptureOutcome, ListenOutcome, MicSpeechEngine, SpeechEngine};
use crate::model::{ModelBackend, OpenAiChatBackend};
use crate::neocortex::Neocortex;
use crate::persona::Persona;
use crate::session::{Session, Signals, SpeechStyle};
use crate::speech::{SayRenderer, SpeechRenderer};

/// How often the worker checks its signal flags between cycles.
const SIGNAL_POLL: Duration = Duration::from_millis(50);

/// How long the event loop blocks waiting for a key press.
const EVENT_POLL: Duration = Duration::from_millis(100);

/// Discrete state shown on the colored status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Idle = 0,
    Calibrating = 1,
    Listening = 2,
    Processing = 3,
}

impl Status {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Status::Calibrating,
            2 => Status::Listening,
            3 => Status::Processing,
            _ => Status::Idle,
        }
    }

    fn color(self) -> Color {
        match self {
            Status::Idle => Color::Red,
            Status::Calibrating => Color::Yellow,
            Status::Listening => Color::Green,
            Status::Processing => Color::Blue,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Calibrating => "calibrating",
            Status::Listening => "listening",
            Status::Processing => "processing",
        }
    }
}

/// Shared cell the worker writes and the event loop renders.
#[derive(Clone)]
pub struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(Status::Idle as u8)))
    }

    fn set(&self, status: Status) {
        self.0.store(status as u8, Ordering::SeqCst);
    }

    fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Runtime container owning the conversation state and its collaborators.
struct App {
    session: Session,
    persona: Persona,
    store: Neocortex,
    engine: Box<dyn SpeechEngine>,
    backend: Box<dyn ModelBackend>,
    speech: Box<dyn SpeechRenderer>,
    signals: Signals,
    status: StatusCell,
}

/// Builds the runtime from configuration and runs it until the user exits.
pub async fn run(config: Config) -> Result<()> {
    let engine = MicSpeechEngine::new(
        &config.api_base,
        config.model_key.clone(),
        config.transcribe_model.clone(),
    );
    let backend = OpenAiChatBackend::new(
        &config.api_base,
        config.model_key.clone(),
        config.chat_model.clone(),
    );
    let mut app = App::new(
        &config,
        Box::new(engine),
        Box::new(backend),
        Box::new(SayRenderer),
    );

    app.startup_restore();
    app.engine.calibrate().await;
    tracing::info!("mic loaded and ready for input");
    tracing::info!("session created with {}", app.persona.name());

    let signals = app.signals.clone();
    let status = app.status.clone();
    let input = tokio::task::spawn_blocking(move || input_loop(signals, status));

    app.worker_loop().await;
    app.shutdown_save();

    match input.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!("input loop error: {err}"),
        Err(err) => tracing::warn!("input loop panicked: {err}"),
    }
    Ok(())
}

impl App {
    fn new(
        config: &Config,
        engine: Box<dyn SpeechEngine>,
        backend: Box<dyn ModelBackend>,
        speech: Box<dyn SpeechRenderer>,
    ) -> Self {
        Self {
            session: Session::new(),
            persona: Persona::bootstrap(),
            store: Neocortex::new(config.store_root.clone()),
            engine,
            backend,
            speech,
            signals: Signals::new(),
            status: StatusCell::new(),
        }
    }

    /// Adopts whatever the neocortex remembers from earlier sessions.
    /// Nothing saved yet is a clean start, not a failure.
    fn startup_restore(&mut self) {
        match self.store.restore() {
            Ok(restored) => {
                if !restored.conversation.is_empty() {
                    tracing::info!(
                        "restored {} exchanges from the neocortex",
                        restored.conversation.len()
                    );
                }
                self.persona.apply_restored(&restored);
                self.session.replace_transcript(restored.conversation);
            }
            Err(err) => tracing::warn!("could not restore memory at startup: {err}"),
        }
    }

    /// Runs until a quit signal arrives, starting one cycle per listen
    /// request.
    async fn worker_loop(&mut self) {
        loop {
            if self.signals.quit_requested() {
                break;
            }
            if self.signals.take_listen_request() {
                self.run_cycle().await;
            }
            tokio::time::sleep(SIGNAL_POLL).await;
        }
    }

    /// One listen, interpret-or-forward, respond turn. Every soft failure
    /// is converted to a log line or spoken notice here; nothing escapes.
    async fn run_cycle(&mut self) {
        self.signals.set_working(true);
        self.signals.clear_cancel();
        self.session.begin_listening();
        tracing::info!("-- message {} --", self.session.turn_count());

        self.status.set(Status::Calibrating);
        self.engine.calibrate().await;

        self.status.set(Status::Listening);
        tracing::info!("listening");
        let captured = self.engine.capture().await;
        tracing::info!("not listening");
        self.status.set(Status::Processing);

        match captured {
            CaptureOutcome::Failed(reason) => tracing::warn!("microphone error: {reason}"),
            CaptureOutcome::Silence => tracing::info!("heard nothing before the window closed"),
            CaptureOutcome::Audio(samples) => {
                if !self.cancelled() {
                    match self.engine.recognize(samples).await {
                        ListenOutcome::Timeout => tracing::info!("recognition produced no speech"),
                        ListenOutcome::Failure(reason) => {
                            tracing::warn!("recognition error: {reason}")
                        }
                        ListenOutcome::Transcript(text) => {
                            if !self.cancelled() {
                                self.dispatch(&text).await;
                            }
                        }
                    }
                }
            }
        }
        self.finish_cycle();
    }

    /// Observes a pending cancel signal. A cancelled turn is reported, not
    /// silently dropped.
    fn cancelled(&mut self) -> bool {
        if !self.signals.cancel_requested() {
            return false;
        }
        self.signals.clear_cancel();
        self.session.request_cancel();
        self.session.observe_cancel();
        tracing::info!("request successfully cancelled");
        self.speech.speak("Canceled request.", SpeechStyle::Robotic);
        true
    }

    /// Routes a transcript through the command interpreter, escalating to
    /// the model when no command matches.
    async fn dispatch(&mut self, raw: &str) {
        let transcript = raw.trim().to_lowercase();
        if transcript.is_empty() {
            return;
        }
        self.session.begin_processing();
        tracing::info!("human message: {transcript}");

        let outcome = {
            let mut cx = CommandContext {
                session: &mut self.session,
                persona: &mut self.persona,
                store: &self.store,
                speech: self.speech.as_ref(),
            };
            command::interpret(&mut cx, &transcript)
        };
        if outcome == Outcome::Forward {
            self.forward_to_model(&transcript).await;
        }
    }

    async fn forward_to_model(&mut self, transcript: &str) {
        let result = self
            .backend
            .complete(
                self.session.transcript(),
                transcript,
                self.session.reply_token_budget(),
                &self.persona,
            )
            .await;
        match result {
            Ok(reply) => {
                tracing::info!("{}: {reply}", self.persona.name());
                self.speech.speak(&reply, self.session.speech_style());
                self.session.append_exchange(transcript, reply);
            }
            Err(err) => {
                tracing::error!("model exchange failed: {err}");
                self.speech
                    .speak("I could not reach the language model just now.", SpeechStyle::Robotic);
            }
        }
    }

    fn finish_cycle(&mut self) {
        self.session.finish_turn();
        self.status.set(Status::Idle);
        self.signals.set_working(false);
    }

    /// Save-and-exit writes the conversation and persona back to the
    /// neocortex; exit-without-saving leaves the store as it was.
    fn shutdown_save(&mut self) {
        if !self.signals.save_requested() {
            tracing::info!("exiting without saving");
            return;
        }
        match self.store.save(self.session.transcript(), &self.persona) {
            Ok(()) => tracing::info!("memories saved to {}", self.store.root().display()),
            Err(err) => tracing::error!("could not save memories: {err}"),
        }
    }
}

/// Keyboard and status-line loop. Runs on its own blocking thread and is
/// the only producer of control signals.
fn input_loop(signals: Signals, status: StatusCell) -> Result<()> {
    terminal::enable_raw_mode()?;
    let result = pump_events(&signals, &status);
    terminal::disable_raw_mode()?;
    result
}

fn pump_events(signals: &Signals, status: &StatusCell) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut last_rendered = None;
    loop {
        if signals.quit_requested() {
            break;
        }
        let current = status.get();
        if last_rendered != Some(current) {
            render_status(&mut stdout, current)?;
            last_rendered = Some(current);
        }
        if event::poll(EVENT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(key.code, signals);
                }
            }
        }
    }
    Ok(())
}

/// Maps key presses to control signals. A listen request while a cycle is
/// working is ignored; cancel only applies while one is.
fn handle_key(code: KeyCode, signals: &Signals) {
    match code {
        KeyCode::Char(' ') => {
            if !signals.is_working() {
                signals.request_listen();
            }
        }
        KeyCode::Char('p') => {
            if signals.is_working() {
                signals.request_cancel();
            }
        }
        KeyCode::Char('q') => {
            if !signals.is_working() {
                signals.request_quit(true);
            }
        }
        KeyCode::Esc => signals.request_quit(false),
        _ => {}
    }
}

fn render_status(stdout: &mut impl Write, status: Status) -> Result<()> {
    execute!(
        stdout,
        Print("\r"),
        SetForegroundColor(status.color()),
        Print(format!("● {:<12}", status.label())),
        ResetColor
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::error::ApiError;
    use crate::session::Exchange;

    /// Engine whose capture step can flip the cancel signal, standing in
    /// for a user pressing cancel mid-recording.
    struct ScriptedEngine {
        transcript: String,
        cancel_during_capture: Option<Signals>,
    }

    #[async_trait::async_trait]
    impl SpeechEngine for ScriptedEngine {
        async fn calibrate(&mut self) {}

        async fn capture(&mut self) -> CaptureOutcome {
            if let Some(signals) = &self.cancel_during_capture {
                signals.request_cancel();
            }
            CaptureOutcome::Audio(vec![1000; 16])
        }

        async fn recognize(&mut self, _samples: Vec<i16>) -> ListenOutcome {
            ListenOutcome::Transcript(self.transcript.clone())
        }
    }

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ModelBackend for CountingBackend {
        async fn complete(
            &self,
            _transcript: &[Exchange],
            _utterance: &str,
            _token_budget: u16,
            _persona: &Persona,
        ) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("a reply".to_string())
        }
    }

    struct FailingBackend;

    #[async_trait::async_trait]
    impl ModelBackend for FailingBackend {
        async fn complete(
            &self,
            _transcript: &[Exchange],
            _utterance: &str,
            _token_budget: u16,
            _persona: &Persona,
        ) -> Result<String, ApiError> {
            Err(ApiError::EmptyReply)
        }
    }

    /// Renderer that records everything spoken so tests can observe it.
    struct RecordingRenderer {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechRenderer for RecordingRenderer {
        fn speak(&self, text: &str, _style: SpeechStyle) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    fn test_app(
        dir: &tempfile::TempDir,
        engine: ScriptedEngine,
        backend: Box<dyn ModelBackend>,
    ) -> (App, Arc<Mutex<Vec<String>>>) {
        let config = Config {
            model_key: "test-key".into(),
            tts_key: None,
            api_base: "http://localhost".into(),
            chat_model: "test-model".into(),
            transcribe_model: "test-whisper".into(),
            store_root: dir.path().join("neocortex"),
        };
        let lines = Arc::new(Mutex::new(Vec::new()));
        let app = App::new(
            &config,
            Box::new(engine),
            backend,
            Box::new(RecordingRenderer {
                lines: lines.clone(),
            }),
        );
        (app, lines)
    }

    #[tokio::test]
    async fn a_forwarded_turn_appends_the_exchange() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut app, spoken) = test_app(
            &dir,
            ScriptedEngine {
                transcript: "Tell me about the weather".into(),
                cancel_during_capture: None,
            },
            Box::new(CountingBackend {
                calls: calls.clone(),
            }),
        );

        app.run_cycle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(spoken.lock().unwrap().as_slice(), ["a reply"]);
        assert_eq!(app.session.turn_count(), 1);
        assert_eq!(
            app.session.transcript(),
            &[Exchange {
                human: "tell me about the weather".into(),
                agent: "a reply".into(),
            }]
        );
        assert!(!app.signals.is_working());
    }

    #[tokio::test]
    async fn cancellation_after_capture_discards_the_transcript() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut app, spoken) = test_app(
            &dir,
            ScriptedEngine {
                transcript: "should never be heard".into(),
                cancel_during_capture: None,
            },
            Box::new(CountingBackend {
                calls: calls.clone(),
            }),
        );
        app.engine = Box::new(ScriptedEngine {
            transcript: "should never be heard".into(),
            cancel_during_capture: Some(app.signals.clone()),
        });

        app.run_cycle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(app.session.transcript().is_empty());
        assert_eq!(app.session.turn_count(), 0);
        assert_eq!(spoken.lock().unwrap().as_slice(), ["Canceled request."]);
    }

    #[tokio::test]
    async fn a_failed_model_exchange_leaves_the_transcript_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut app, spoken) = test_app(
            &dir,
            ScriptedEngine {
                transcript: "unmatched utterance".into(),
                cancel_during_capture: None,
            },
            Box::new(FailingBackend),
        );

        app.run_cycle().await;

        assert!(app.session.transcript().is_empty());
        assert_eq!(app.session.turn_count(), 0);
        assert!(spoken
            .lock()
            .unwrap()
            .iter()
            .any(|line| line.contains("language model")));
    }

    #[tokio::test]
    async fn a_command_turn_never_calls_the_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut app, _spoken) = test_app(
            &dir,
            ScriptedEngine {
                transcript: "please speak like a robot".into(),
                cancel_during_capture: None,
            },
            Box::new(CountingBackend {
                calls: calls.clone(),
            }),
        );

        app.run_cycle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.session.speech_style(), SpeechStyle::Robotic);
        assert!(app.session.transcript().is_empty());
    }

    #[test]
    fn listen_requests_are_ignored_while_working() {
        let signals = Signals::new();
        signals.set_working(true);
        handle_key(KeyCode::Char(' '), &signals);
        assert!(!signals.take_listen_request());

        signals.set_working(false);
        handle_key(KeyCode::Char(' '), &signals);
        assert!(signals.take_listen_request());
    }

    #[test]
    fn cancel_only_applies_to_an_in_flight_cycle() {
        let signals = Signals::new();
        handle_key(KeyCode::Char('p'), &signals);
        assert!(!signals.cancel_requested());

        signals.set_working(true);
        handle_key(KeyCode::Char('p'), &signals);
        assert!(signals.cancel_requested());
    }

    #[test]
    fn the_two_exit_paths_are_distinct() {
        let signals = Signals::new();
        handle_key(KeyCode::Char('q'), &signals);
        assert!(signals.quit_requested());
        assert!(signals.save_requested());

        let signals = Signals::new();
        handle_key(KeyCode::Esc, &signals);
        assert!(signals.quit_requested());
        assert!(!signals.save_requested());
    }

    #[test]
    fn status_round_trips_through_the_cell() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), Status::Idle);
        cell.set(Status::Listening);
        assert_eq!(cell.get(), Status::Listening);
    }

    #[test]
    fn status_colors_match_the_indicator_contract() {
        assert_eq!(Status::Idle.color(), Color::Red);
        assert_eq!(Status::Calibrating.color(), Color::Yellow);
        assert_eq!(Status::Listening.color(), Color::Green);
        assert_eq!(Status::Processing.color(), Color::Blue);
    }
}
