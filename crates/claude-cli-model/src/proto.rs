//! Wire shapes of the CLI's `--output-format json` mode.

use serde::Deserialize;

/// The single JSON object the CLI prints on success.
///
/// Unknown fields (session id, cost, timing) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CliResponse {
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub usage: CliUsage,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CliUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}
