//! The like ledger table
//!
//! Plain text, one header row followed by `imageKey,count` rows:
//!
//! ```text
//! imageId,likes
//! images/preview/a.jpg,3
//! images/preview/b.jpg,0
//! ```
//!
//! Keys are written verbatim, so they can never contain the delimiter.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::error::LikeError;

pub const HEADER: &str = "imageId,likes";
pub const DELIMITER: char = ',';
/// Upper bound for any counter
pub const MAX_LIKES: u32 = 99_999;

/// Reject keys the table format cannot represent
pub fn validate_key(key: &str) -> Result<(), LikeError> {
    if key.is_empty() || key.contains([DELIMITER, '\n', '\r']) {
        return Err(LikeError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Read a stored count, clamped into `0..=max`.
///
/// Integers of any length count, so a huge value saturates at `max`
/// instead of losing its row.
fn parse_count(raw: &str, max: u32) -> Option<u32> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits.parse::<u32>().map_or(max, |count| count.min(max)))
}

/// In-memory copy of the table. Row order is kept; new keys go last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeLedger {
    rows: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl LikeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table, clamping every count into `0..=max`.
    ///
    /// The first line is always the header. Blank lines and rows without a
    /// numeric count are dropped; for repeated keys the first row wins.
    pub fn parse(text: &str, max: u32) -> Self {
        let mut ledger = Self::new();

        for (line_no, line) in text.lines().enumerate().skip(1) {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let Some((key, count)) = line.split_once(DELIMITER) else {
                warn!(line = line_no + 1, "like table row has no count, dropping");
                continue;
            };
            let Some(count) = parse_count(count, max) else {
                warn!(line = line_no + 1, key, count, "like table row has a bad count, dropping");
                continue;
            };

            if ledger.index.contains_key(key) {
                warn!(line = line_no + 1, key, "duplicate like table row, keeping the first");
                continue;
            }
            ledger.push(key, count);
        }

        ledger
    }

    /// Serialize back to the table format
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(HEADER.len() + 1 + self.rows.len() * 32);
        out.push_str(HEADER);
        out.push('\n');
        for (key, count) in &self.rows {
            out.push_str(key);
            out.push(DELIMITER);
            out.push_str(&count.to_string());
            out.push('\n');
        }
        out
    }

    fn push(&mut self, key: &str, count: u32) {
        self.index.insert(key.to_string(), self.rows.len());
        self.rows.push((key.to_string(), count));
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<u32> {
        self.index.get(key).map(|&i| self.rows[i].1)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add one like, creating the row if needed. Never exceeds `max`.
    pub fn increment(&mut self, key: &str, max: u32) -> u32 {
        match self.index.get(key) {
            Some(&i) => {
                let count = &mut self.rows[i].1;
                *count = count.saturating_add(1).min(max);
                *count
            }
            None => {
                let count = 1u32.min(max);
                self.push(key, count);
                count
            }
        }
    }

    /// Remove one like. `None` when the key has no row; rows are never
    /// created or removed here.
    pub fn decrement(&mut self, key: &str) -> Option<u32> {
        let &i = self.index.get(key)?;
        let count = &mut self.rows[i].1;
        *count = count.saturating_sub(1);
        Some(*count)
    }

    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.rows.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_per_key() {
        let mut ledger = LikeLedger::new();

        assert_eq!(ledger.decrement("x"), None);
        assert!(ledger.is_empty());

        assert_eq!(ledger.increment("x", MAX_LIKES), 1);
        assert_eq!(ledger.increment("x", MAX_LIKES), 2);
        assert_eq!(ledger.decrement("x"), Some(1));
        assert_eq!(ledger.decrement("x"), Some(0));
        assert_eq!(ledger.decrement("x"), Some(0));

        // a zero row stays a row
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("x"), Some(0));
    }

    #[test]
    fn test_increment_saturates_at_cap() {
        let mut ledger = LikeLedger::parse("imageId,likes\nx,99999\n", MAX_LIKES);
        assert_eq!(ledger.increment("x", MAX_LIKES), MAX_LIKES);
        assert_eq!(ledger.get("x"), Some(MAX_LIKES));
    }

    #[test]
    fn test_render_then_parse_reproduces_mapping() {
        let mut ledger = LikeLedger::new();
        ledger.increment("images/preview/b.jpg", MAX_LIKES);
        ledger.increment("images/preview/a.jpg", MAX_LIKES);
        ledger.increment("images/preview/a.jpg", MAX_LIKES);
        ledger.increment("images/preview/c d.jpg", MAX_LIKES);
        ledger.decrement("images/preview/c d.jpg");

        let text = ledger.render();
        assert!(text.starts_with("imageId,likes\nimages/preview/b.jpg,1\n"));

        let reloaded = LikeLedger::parse(&text, MAX_LIKES);
        assert_eq!(reloaded, ledger);
        assert_eq!(reloaded.to_map(), ledger.to_map());
    }

    #[test]
    fn test_parse_tolerates_damaged_rows() {
        let text = "imageId,likes\r\n\
                    a,3\r\n\
                    \n\
                    b,lots\n\
                    no-count\n\
                    a,9\n\
                    c,-4\n\
                    d,250000\n";
        let ledger = LikeLedger::parse(text, MAX_LIKES);

        let map = ledger.to_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map["a"], 3);
        assert_eq!(map["c"], 0);
        assert_eq!(map["d"], MAX_LIKES);
    }

    #[test]
    fn test_oversized_counts_saturate_instead_of_dropping() {
        let text = "imageId,likes\n\
                    big,123456789012345678901234\n\
                    other,1\n\
                    tiny,-99999999999999999999999\n\
                    plus,+7\n\
                    sign,-\n";
        let mut ledger = LikeLedger::parse(text, MAX_LIKES);

        assert_eq!(ledger.get("big"), Some(MAX_LIKES));
        assert_eq!(ledger.get("tiny"), Some(0));
        assert_eq!(ledger.get("plus"), Some(7));
        assert_eq!(ledger.get("sign"), None);

        // the row survives the next rewrite
        ledger.increment("other", MAX_LIKES);
        assert_eq!(ledger.increment("big", MAX_LIKES), MAX_LIKES);
        let reloaded = LikeLedger::parse(&ledger.render(), MAX_LIKES);
        assert_eq!(reloaded.get("big"), Some(MAX_LIKES));
        assert_eq!(reloaded.get("other"), Some(2));
    }

    #[test]
    fn test_header_only_table_is_empty() {
        assert!(LikeLedger::parse("imageId,likes\n", MAX_LIKES).is_empty());
        assert!(LikeLedger::parse("", MAX_LIKES).is_empty());
    }

    #[test]
    fn test_key_validation() {
        assert!(validate_key("images/preview/a.jpg").is_ok());
        assert!(validate_key("a,b").is_err());
        assert!(validate_key("a\nb").is_err());
        assert!(validate_key("").is_err());
    }
}
