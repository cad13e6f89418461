//! Shared parsing utilities for scheduler command output.
//!
//! This crate provides the low-level text handling used by the
//! jobscope-slurm source readers: delimited-record splitting, memory and
//! duration normalization, node-range expansion and TRES lists.

pub mod command;
pub mod memory;
pub mod nodelist;
pub mod time;
pub mod tres;

pub use command::{SourceError, capture_stdout_lenient, capture_stdout_raw};
pub use memory::{MemBasis, MemRequest, format_mem, parse_mem_bytes, parse_mem_request};
pub use nodelist::expand_nodelist;
pub use time::{format_duration_hms, parse_duration, parse_timestamp};
pub use tres::{parse_tres, tres_bytes, tres_count};

/// Field sentinel for accounting rows (U+2603, three bytes in UTF-8).
///
/// Job names and comments are free text and may contain `|` and other
/// ordinary delimiter characters, so accounting output is requested with a
/// delimiter that cannot occur accidentally.
pub const FIELD_SENTINEL_STR: &str = "\u{2603}";

/// The sentinel as its exact UTF-8 byte sequence, for splitting undecoded rows.
pub const FIELD_SENTINEL: &[u8] = FIELD_SENTINEL_STR.as_bytes();

/// Split one raw accounting row on the exact sentinel byte sequence and
/// decode each field on its own.
///
/// Decoding per field keeps a single undecodable byte from corrupting the
/// rest of the row.
pub fn split_sentinel(row: &[u8]) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = row;
    while let Some(pos) = find_subsequence(rest, FIELD_SENTINEL) {
        fields.push(String::from_utf8_lossy(&rest[..pos]).into_owned());
        rest = &rest[pos + FIELD_SENTINEL.len()..];
    }
    fields.push(String::from_utf8_lossy(rest).into_owned());
    fields
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" || trimmed == "Unknown" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
