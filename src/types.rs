use serde::Deserialize;

/// Identifier the service assigns to each inbound message it dispatches.
pub type RequestId = u64;

/// Chat identifier as used by the chat platform.
pub type ChatId = i64;

/// Where the validated request value is written before the worker runs.
///
/// - `Shared`: every request overwrites the same fixed file, `data.txt` by
///   default, which is where the stock worker reads it. Concurrent requests
///   race on that file.
/// - `PerRequest`: every request gets its own file, removed after the run.
///   Concurrent requests never see each other's input; the worker must read
///   the path from its environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchMode {
    #[default]
    Shared,
    PerRequest,
}
