/*
 * @file audio.rs
 * @brief Microphone capture and WAV helpers
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

//! Microphone capture and WAV file handling.
//!
//! Capture runs through CPAL against the default input device at 16 kHz
//! mono, the rate the transcription endpoint prefers. The RMS helpers let
//! the speech engine tell speech from silence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, StreamError};
use hound::{WavSpec, WavWriter};

/// Sample rate for audio recording (16 kHz).
const SAMPLE_RATE: u32 = 16000;

/// Mono input keeps bandwidth low and transcription-friendly.
const CHANNELS: u16 = 1;

/// Bits per sample for WAV encoding.
const BITS_PER_SAMPLE: u16 = 16;

/// Capture window for one conversational turn.
pub const TURN_CAPTURE: Duration = Duration::from_secs(5);

/// Short window used to sample the ambient noise floor.
pub const CALIBRATION_WINDOW: Duration = Duration::from_secs(1);

/// Name of the scratch WAV file handed to the transcription endpoint.
const TEMP_WAV_NAME: &str = "aibot_capture.wav";

/// Records one turn's worth of audio from the default input device.
///
/// # Errors
/// Fails when no input device exists or the stream cannot be built.
pub fn record_turn() -> Result<Vec<i16>> {
    record_for(TURN_CAPTURE)
}

/// Records from the default input device for `duration`.
pub fn record_for(duration: Duration) -> Result<Vec<i16>> {
    let device = default_input_device()?;
    let config = input_config();
    let samples = Arc::new(Mutex::new(Vec::new()));
    let stream = build_input_stream(&device, &config, samples.clone())?;
    stream.play()?;
    std::thread::sleep(duration);
    drop(stream);
    let captured = samples.lock().unwrap().clone();
    Ok(captured)
}

/// Root-mean-square amplitude of a PCM buffer; zero for empty input.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy = samples
        .iter()
        .map(|sample| (*sample as f32).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt()
}

/// Writes PCM samples to `path` as a 16-bit mono WAV.
///
/// # Errors
/// Fails when the file cannot be created or written.
pub fn save_wav(path: &Path, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Path of the scratch WAV used between capture and transcription.
pub fn temp_wav_path() -> PathBuf {
    std::env::temp_dir().join(TEMP_WAV_NAME)
}

/// RAII guard that removes the scratch WAV at scope exit, even on early
/// returns.
pub struct TempWavGuard;

impl TempWavGuard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TempWavGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempWavGuard {
    fn drop(&mut self) {
        std::fs::remove_file(temp_wav_path()).ok();
    }
}

fn default_input_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow::anyhow!("No input device"))
}

fn input_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &_| push_samples(&samples, data),
            log_stream_error,
            None,
        )
        .map_err(|err| anyhow::anyhow!(err))
}

/// Converts floating-point frames to 16-bit PCM and appends them.
fn push_samples(buffer: &Arc<Mutex<Vec<i16>>>, data: &[f32]) {
    let mut guard = buffer.lock().unwrap();
    for &sample in data {
        guard.push((sample * i16::MAX as f32) as i16);
    }
}

fn log_stream_error(error: StreamError) {
    tracing::warn!("audio stream error: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn input_config_matches_constants() {
        let config = input_config();
        assert_eq!(config.channels, CHANNELS);
        assert_eq!(config.sample_rate.0, SAMPLE_RATE);
    }

    #[test]
    fn push_samples_converts_floats() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        push_samples(&samples, &[0.0, 0.5, -1.0]);
        let guard = samples.lock().unwrap();
        assert_eq!(guard.len(), 3);
        assert_eq!(guard[0], 0);
        assert!(guard[1] > 0);
        assert!(guard[2] < 0);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0_i16; 1600]), 0.0);
    }

    #[test]
    fn rms_grows_with_amplitude() {
        let quiet = vec![100_i16; 1600];
        let loud = vec![i16::MAX / 2; 1600];
        assert!(rms(&loud) > rms(&quiet));
    }

    #[test]
    fn save_wav_writes_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("capture_test.wav");
        let samples = vec![0_i16, i16::MAX / 2, -i16::MAX / 2];
        save_wav(&path, &samples).expect("save wav");
        assert!(path.exists());
    }

    #[test]
    fn guard_drops_the_scratch_file() {
        File::create(temp_wav_path()).expect("create scratch file");
        {
            let _guard = TempWavGuard::new();
        }
        assert!(!temp_wav_path().exists());
    }
}
