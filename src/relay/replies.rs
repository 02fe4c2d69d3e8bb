// src/relay/replies.rs

//! Formatting worker events as chat replies.

use std::time::Duration;

use crate::exec::ExitReport;

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Reply for a stdout chunk; `None` for whitespace-only chunks.
pub fn stdout_reply(chunk: &str, max_chars: usize) -> Option<String> {
    if chunk.trim().is_empty() {
        return None;
    }
    Some(truncate_chars(chunk, max_chars).to_string())
}

/// Reply for a stderr chunk; `None` for whitespace-only chunks.
///
/// The ellipsis is always appended: a chunk may be followed by more output.
pub fn stderr_reply(chunk: &str, max_chars: usize) -> Option<String> {
    if chunk.trim().is_empty() {
        return None;
    }
    Some(format!(
        "An error occurred:\n{}...",
        truncate_chars(chunk, max_chars)
    ))
}

pub fn exit_reply(report: ExitReport) -> String {
    match report {
        ExitReport::Code(code) => format!("Process finished with exit code {code}."),
        ExitReport::Signal(sig) => format!("Process was terminated by signal {sig}."),
    }
}

pub fn timeout_reply(timeout: Duration) -> String {
    format!(
        "Process terminated after {} due to timeout.",
        describe_duration(timeout)
    )
}

/// `180s` → "3 minutes", `1s` → "1 second", `1500ms` → "1500 milliseconds".
pub fn describe_duration(d: Duration) -> String {
    fn unit(n: u128, name: &str) -> String {
        if n == 1 {
            format!("1 {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let millis = d.as_millis();
    if millis % 1000 != 0 {
        return unit(millis, "millisecond");
    }
    let secs = millis / 1000;
    if secs != 0 && secs % 3600 == 0 {
        unit(secs / 3600, "hour")
    } else if secs != 0 && secs % 60 == 0 {
        unit(secs / 60, "minute")
    } else {
        unit(secs, "second")
    }
}
