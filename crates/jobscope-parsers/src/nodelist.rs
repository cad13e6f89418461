//! Expansion of compressed node-range syntax.
//!
//! The scheduler compresses node lists into range expressions such as
//! "node[001-003,007]" or "cpu[1-2],gpu-1". Hints and per-node lookups
//! need the explicit names.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[]*)\[([^\]]+)\](.*)$").expect("valid regex"));

/// Expand a compressed node list into an ordered, deduplicated list of
/// individual node names.
///
/// Overlapping or duplicated ranges collapse to a set before ordering.
/// Items that do not fit the range grammar pass through verbatim; an empty
/// or placeholder list expands to nothing.
pub fn expand_nodelist(list: &str) -> Vec<String> {
    let list = list.trim();
    if list.is_empty() || list == "None assigned" || list == "(null)" {
        return Vec::new();
    }

    let mut names = BTreeSet::new();
    for item in split_outside_brackets(list) {
        match RANGE_RE.captures(item) {
            Some(caps) => {
                let prefix = &caps[1];
                let suffix = &caps[3];
                for range in caps[2].split(',') {
                    expand_range(prefix, range, suffix, &mut names);
                }
            }
            None => {
                names.insert(item.to_string());
            }
        }
    }
    names.into_iter().collect()
}

/// Expand one `a` or `a-b` range, preserving the zero-padding width of the
/// lower bound.
fn expand_range(prefix: &str, range: &str, suffix: &str, out: &mut BTreeSet<String>) {
    let (lo_str, hi_str) = match range.split_once('-') {
        Some((lo, hi)) => (lo, hi),
        None => (range, range),
    };

    let width = lo_str.len();
    let (lo, hi) = match (lo_str.parse::<u64>(), hi_str.parse::<u64>()) {
        (Ok(lo), Ok(hi)) if lo <= hi => (lo, hi),
        _ => {
            // malformed range, keep the literal text rather than dropping it
            out.insert(format!("{}{}{}", prefix, range, suffix));
            return;
        }
    };

    for index in lo..=hi {
        out.insert(format!("{}{:0width$}{}", prefix, index, suffix));
    }
}

/// Split on commas that sit outside bracket groups.
fn split_outside_brackets(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                if start < i {
                    items.push(&list[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < list.len() {
        items.push(&list[start..]);
    }
    items
}
