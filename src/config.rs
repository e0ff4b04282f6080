//! Startup configuration and credentials.
//!
//! Keys come from, in priority order: command-line arguments, the
//! environment, and the `keys.txt` file. A missing key file is replaced
//! with a template so the user has something to fill in; a missing model
//! key is fatal before any listening begins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::ConfigError;

/// Key file consulted when no argument or environment key is present.
pub const KEY_FILE: &str = "keys.txt";

const MODEL_KEY_NAME: &str = "OpenAI_Key";
const TTS_KEY_NAME: &str = "ElevenLabs_Key";
const KEY_FILE_TEMPLATE: &str = "OpenAI_Key=\nElevenLabs_Key=";

const DEFAULT_API_BASE: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TRANSCRIBE_MODEL: &str = "whisper-1";
const DEFAULT_STORE_ROOT: &str = "neocortex";

/// Command-line arguments.
#[derive(Parser, Debug, Default)]
#[command(
    name = "aibot",
    about = "Hands-free voice chat agent with a persistent neocortex"
)]
pub struct Cli {
    /// Model API key; overrides keys.txt and the environment.
    pub model_key: Option<String>,

    /// Optional secondary TTS-provider key.
    pub tts_key: Option<String>,
}

/// Resolved runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub model_key: String,
    pub tts_key: Option<String>,
    pub api_base: String,
    pub chat_model: String,
    pub transcribe_model: String,
    pub store_root: PathBuf,
}

/// Resolves the full configuration, writing a key-file template when none
/// exists.
///
/// # Errors
/// [`ConfigError::MissingModelKey`] when no source supplies the model key;
/// [`ConfigError::UnreadableKeyFile`] when `keys.txt` exists but cannot be
/// read.
pub fn load(cli: Cli) -> Result<Config, ConfigError> {
    let file_keys = read_key_file(Path::new(KEY_FILE))?;
    let env_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.is_empty());

    let model_key = resolve_model_key(cli.model_key, env_key, file_keys.model)?;
    let tts_key = cli.tts_key.or(file_keys.tts);

    Ok(Config {
        model_key,
        tts_key,
        api_base: env_or("AIBOT_API_BASE", DEFAULT_API_BASE),
        chat_model: env_or("AIBOT_CHAT_MODEL", DEFAULT_CHAT_MODEL),
        transcribe_model: env_or("AIBOT_TRANSCRIBE_MODEL", DEFAULT_TRANSCRIBE_MODEL),
        store_root: PathBuf::from(env_or("AIBOT_NEOCORTEX", DEFAULT_STORE_ROOT)),
    })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Picks the model key by priority: argument, environment, key file.
fn resolve_model_key(
    arg: Option<String>,
    env: Option<String>,
    file: Option<String>,
) -> Result<String, ConfigError> {
    arg.or(env).or(file).ok_or(ConfigError::MissingModelKey {
        key_file: KEY_FILE.to_string(),
    })
}

#[derive(Debug, Default)]
struct FileKeys {
    model: Option<String>,
    tts: Option<String>,
}

/// Reads the key file, creating a fill-me-in template when it is absent.
fn read_key_file(path: &Path) -> Result<FileKeys, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if let Err(write_err) = fs::write(path, KEY_FILE_TEMPLATE) {
                tracing::warn!("could not write key file template: {write_err}");
            }
            return Ok(FileKeys::default());
        }
        Err(source) => {
            return Err(ConfigError::UnreadableKeyFile {
                path: path.display().to_string(),
                source,
            })
        }
    };
    Ok(parse_keys(&raw))
}

/// Parses `Name=value` lines. Unrecognized lines are ignored; embedded
/// spaces in values are dropped, matching how keys get pasted in.
fn parse_keys(raw: &str) -> FileKeys {
    let mut keys = FileKeys::default();
    for line in raw.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.replace(' ', "");
        if value.is_empty() {
            continue;
        }
        match name.trim() {
            MODEL_KEY_NAME => keys.model = Some(value),
            TTS_KEY_NAME => keys.tts = Some(value),
            _ => {}
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_keys_parse_from_the_file_format() {
        let keys = parse_keys("OpenAI_Key=sk-abc 123\nElevenLabs_Key=el-def");
        assert_eq!(keys.model.as_deref(), Some("sk-abc123"));
        assert_eq!(keys.tts.as_deref(), Some("el-def"));
    }

    #[test]
    fn blank_values_and_unknown_lines_are_ignored() {
        let keys = parse_keys("OpenAI_Key=\nSomething_Else=zzz\nnot a key line");
        assert!(keys.model.is_none());
        assert!(keys.tts.is_none());
    }

    #[test]
    fn a_missing_key_file_gets_a_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys.txt");
        let keys = read_key_file(&path).expect("read");
        assert!(keys.model.is_none());
        assert_eq!(
            fs::read_to_string(&path).expect("template"),
            KEY_FILE_TEMPLATE
        );
    }

    #[test]
    fn arguments_outrank_environment_and_file() {
        let resolved = resolve_model_key(
            Some("from-arg".into()),
            Some("from-env".into()),
            Some("from-file".into()),
        )
        .expect("resolve");
        assert_eq!(resolved, "from-arg");

        let resolved =
            resolve_model_key(None, Some("from-env".into()), Some("from-file".into()))
                .expect("resolve");
        assert_eq!(resolved, "from-env");
    }

    #[test]
    fn no_key_anywhere_is_a_fatal_config_error() {
        let err = resolve_model_key(None, None, None).expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingModelKey { .. }));
    }
}
