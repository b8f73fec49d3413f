//! Subcommand implementations
//!
//! Each command takes the input message as text and returns its output as
//! text, so they can be exercised without a terminal.

pub mod key;
pub mod sort;
pub mod transcode;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use ocap_marshal::{CapData, ConfigDefaults, MarshalOptions};
use serde_json::Value as JsonValue;

/// Read a message from `file`, or from stdin when absent
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Load marshaller options from an optional file, then the environment
pub fn load_options(config: Option<&Path>) -> Result<MarshalOptions> {
    let mut options = match config {
        Some(path) => MarshalOptions::load_from_file(path)?,
        None => MarshalOptions::defaults(),
    };
    options.merge_with_env()?;
    tracing::debug!(?options, "loaded marshal options");
    Ok(options)
}

pub(crate) fn parse_message(text: &str) -> Result<CapData<JsonValue>> {
    CapData::from_json(text.trim()).context("input is not a {body, slots} message")
}

pub(crate) fn render_message(data: &CapData<JsonValue>) -> Result<String> {
    serde_json::to_string(data).context("failed to render message")
}
