//! Text-to-speech rendering.
//!
//! Spoken output is fire-and-forget: the core hands text to the renderer
//! and moves on. Failures are logged, never propagated.

use crate::session::SpeechStyle;

/// Voice used for the robotic rendering style.
const ROBOT_VOICE: &str = "Zarvox";

/// Renders text as audible speech.
pub trait SpeechRenderer: Send + Sync {
    /// Speaks `text` in the given style. Fire-and-forget.
    fn speak(&self, text: &str, style: SpeechStyle);
}

/// Renderer backed by the platform `say` command.
pub struct SayRenderer;

impl SpeechRenderer for SayRenderer {
    fn speak(&self, text: &str, style: SpeechStyle) {
        if !is_speakable(text) {
            return;
        }
        let mut command = std::process::Command::new("say");
        command
            .args(say_args(text, style))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        match command.spawn() {
            Ok(mut child) => {
                // Reap the process off-thread so playback never blocks a turn.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(err) => tracing::warn!("TTS error: {err}"),
        }
    }
}

fn is_speakable(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Builds the `say` argument list for a style.
fn say_args(text: &str, style: SpeechStyle) -> Vec<String> {
    match style {
        SpeechStyle::Robotic => vec!["-v".into(), ROBOT_VOICE.into(), text.into()],
        SpeechStyle::Normal => vec![text.into()],
    }
}
