/*
 * @file lib.rs
 * @brief Aibot library root
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

//! Aibot - a voice-interactive AI agent with persistent memory.
//!
//! Aibot listens on a key press, transcribes the utterance, and either
//! executes a built-in voice command (speech style, token budget, persona
//! presets, memory inspection) or forwards the turn to an OpenAI-compatible
//! chat model. Conversation and persona survive across sessions in an
//! on-disk "neocortex" store.
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     let config = aibot::config::load(aibot::config::Cli::parse())?;
//!     aibot::app::run(config).await
//! }
//! ```

pub mod app;
pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod listen;
pub mod model;
pub mod neocortex;
pub mod persona;
pub mod session;
pub mod speech;
