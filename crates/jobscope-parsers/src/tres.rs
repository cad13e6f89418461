//! Trackable-resource (TRES) list parsing.
//!
//! Accounting output carries resource usage as comma-joined `name=value`
//! lists, e.g. "cpu=00:03:00,fs/disk=6442450944,mem=950M,gres/gpu=2".

use crate::memory::parse_mem_bytes;
use std::collections::BTreeMap;

/// Parse a TRES list into a name -> raw value map.
///
/// Entries without an `=` are skipped; an empty field yields an empty map.
pub fn parse_tres(s: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for entry in s.split(',') {
        if let Some((name, value)) = entry.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                map.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
    map
}

/// Numeric counter from a TRES map (e.g. "gres/gpu", "node").
pub fn tres_count(map: &BTreeMap<String, String>, name: &str) -> Option<u64> {
    map.get(name).and_then(|v| v.parse().ok())
}

/// Byte-valued entry from a TRES map (e.g. "fs/disk", "mem").
///
/// Values appear both as bare byte counts and with unit suffixes.
pub fn tres_bytes(map: &BTreeMap<String, String>, name: &str) -> Option<u64> {
    map.get(name).and_then(|v| parse_mem_bytes(v))
}
