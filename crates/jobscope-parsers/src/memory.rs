//! Memory quantity parsing for scheduler output.

/// Divisor basis recorded on a memory request.
///
/// sacct reports `ReqMem` with a trailing `n` (per allocated node) or `c`
/// (per task); peak figures such as `MaxRSS` carry no suffix and are
/// per-task observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemBasis {
    PerNode,
    PerTask,
}

/// A requested memory quantity together with the basis it is expressed on.
///
/// The basis is kept so later ratio computations pick the matching divisor
/// (node count vs task count) instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRequest {
    pub bytes: u64,
    pub basis: MemBasis,
}

/// Parse a plain memory quantity ("950M", "4G", "97620K", "1024") to bytes.
///
/// Units are powers of 1024; a bare number is taken as bytes. Returns None
/// for empty strings, placeholders and anything else that does not fit the
/// grammar.
pub fn parse_mem_bytes(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return None;
    }

    let last = s.chars().last()?;
    let (value_part, multiplier) = match last.to_ascii_uppercase() {
        'K' => (&s[..s.len() - 1], 1u64 << 10),
        'M' => (&s[..s.len() - 1], 1u64 << 20),
        'G' => (&s[..s.len() - 1], 1u64 << 30),
        'T' => (&s[..s.len() - 1], 1u64 << 40),
        _ if last.is_ascii_digit() => (s, 1),
        _ => return None,
    };

    // sacct prints fractional values like "1548.50M"
    let value: f64 = value_part.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64) as u64)
}

/// Parse a requested memory quantity ("1Gn", "4000Mc", "2G") with its basis.
pub fn parse_mem_request(s: &str) -> Option<MemRequest> {
    let s = s.trim();
    let (quantity, basis) = match s.chars().last() {
        Some('n') => (&s[..s.len() - 1], MemBasis::PerNode),
        Some('c') => (&s[..s.len() - 1], MemBasis::PerTask),
        _ => (s, MemBasis::PerTask),
    };

    parse_mem_bytes(quantity).map(|bytes| MemRequest { bytes, basis })
}

/// Format a byte count using the largest unit that keeps the value >= 1.
pub fn format_mem(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1 << 40, "T"),
        (1 << 30, "G"),
        (1 << 20, "M"),
        (1 << 10, "K"),
    ];

    for (scale, suffix) in UNITS {
        if bytes >= scale {
            return format!("{:.1}{}", bytes as f64 / scale as f64, suffix);
        }
    }
    format!("{}B", bytes)
}
