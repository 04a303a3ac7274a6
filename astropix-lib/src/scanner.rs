//! Locating hit records inside a readout line.
use tracing::trace;

/// Default hex marker preceding each hit record.
pub const MARKER: &str = "20";
/// Default idle token; repeated runs of it mark a heartbeat record.
pub const HEARTBEAT: &str = "bc";

/// Hex text of a possible hit record, including its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Offset of the marker in the line.
    pub offset: usize,
    pub text: &'a [u8],
}

impl Candidate<'_> {
    /// Candidate text for display purposes.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(self.text).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|idx| idx + from)
}

/// Scans a line for fixed length records that start with a marker.
///
/// After a record is found scanning resumes directly after its marker, not after the
/// whole record, so a marker inside a record's data produces another, overlapping,
/// candidate.
///
/// The first marker that is too close to the end of the line to hold a full record
/// ends the scan of that line; later markers are never looked at. Check
/// [RecordScanner::truncated] once the iterator is exhausted to see if this happened.
pub struct RecordScanner<'a> {
    line: &'a [u8],
    marker: &'a [u8],
    // Number of hex characters following the marker
    data_length: usize,
    cursor: usize,
    done: bool,
    truncated: bool,
}

impl<'a> RecordScanner<'a> {
    /// Creates a new ``RecordScanner``.
    ///
    /// `data_length` is the number of characters in a record not counting the marker.
    pub fn new(line: &'a [u8], marker: &'a [u8], data_length: usize) -> Self {
        RecordScanner {
            line,
            marker,
            data_length,
            cursor: 0,
            done: false,
            truncated: false,
        }
    }

    /// True if scanning stopped because of a truncated record at the end of the line.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for RecordScanner<'a> {
    type Item = Candidate<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let line = self.line;
        let Some(pos) = find(line, self.marker, self.cursor) else {
            self.done = true;
            return None;
        };

        let start = pos + self.marker.len();
        let end = match start.checked_add(self.data_length) {
            Some(end) if end <= line.len() => end,
            _ => {
                trace!(offset = pos, len = line.len(), "truncated record");
                self.truncated = true;
                self.done = true;
                return None;
            }
        };

        self.cursor = start;
        Some(Candidate {
            offset: pos,
            text: &line[pos..end],
        })
    }
}

/// Rejects heartbeat records, i.e., records containing 2, 3, or 4 back-to-back copies
/// of the heartbeat token.
#[derive(Debug, Clone)]
pub struct HeartbeatFilter {
    signatures: Vec<Vec<u8>>,
}

impl HeartbeatFilter {
    pub fn new(token: &str) -> Self {
        HeartbeatFilter {
            signatures: (2..=4).map(|n| token.repeat(n).into_bytes()).collect(),
        }
    }

    #[must_use]
    pub fn is_heartbeat(&self, text: &[u8]) -> bool {
        self.signatures
            .iter()
            .any(|sig| find(text, sig, 0).is_some())
    }

    #[must_use]
    pub fn accept(&self, text: &[u8]) -> bool {
        !self.is_heartbeat(text)
    }
}

impl Default for HeartbeatFilter {
    fn default() -> Self {
        HeartbeatFilter::new(HEARTBEAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn scan(line: &str) -> (Vec<(usize, String)>, bool) {
        let mut scanner = RecordScanner::new(line.as_bytes(), MARKER.as_bytes(), 8);
        let found = scanner
            .by_ref()
            .map(|c| (c.offset, c.text_lossy()))
            .collect();
        (found, scanner.truncated())
    }

    #[test]
    fn single_record() {
        let (found, truncated) = scan("0120a1b2c3d4");
        assert_eq!(found, vec![(2, "20a1b2c3d4".to_string())]);
        assert!(!truncated);
    }

    #[test]
    fn no_marker() {
        let (found, truncated) = scan("a1b2c3d4e5");
        assert!(found.is_empty());
        assert!(!truncated);
    }

    #[test]
    fn marker_inside_record_is_rescanned() {
        let (found, truncated) = scan("20ab20cd112233");
        assert_eq!(
            found,
            vec![(0, "20ab20cd11".to_string()), (4, "20cd112233".to_string())]
        );
        assert!(!truncated);
    }

    #[test]
    fn record_ending_exactly_at_line_end() {
        let (found, _) = scan("20a1b2c3d4");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn truncated_record_stops_the_line() {
        // The nested marker at offset 4 is too close to the end to hold a record
        let (found, truncated) = scan("20ab20cd1133");
        assert_eq!(found, vec![(0, "20ab20cd11".to_string())]);
        assert!(truncated);
    }

    #[test]
    fn oversized_record_length_is_truncation() {
        let mut scanner = RecordScanner::new(b"20a1b2c3d4", MARKER.as_bytes(), usize::MAX);
        assert!(scanner.next().is_none());
        assert!(scanner.truncated());
    }

    #[test]
    fn marker_at_odd_offset() {
        let (found, _) = scan("a20a1b2c3d4");
        assert_eq!(found, vec![(1, "20a1b2c3d4".to_string())]);
    }

    #[test]
    fn scanner_is_fused() {
        let mut scanner = RecordScanner::new(b"20a1b2c3d4", MARKER.as_bytes(), 8);
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test_case("20bcbc0000"; "two repeats")]
    #[test_case("20bcbcbc00"; "three repeats")]
    #[test_case("20bcbcbcbc"; "four repeats")]
    #[test_case("2000bcbc00"; "in the middle")]
    fn heartbeat_rejected(text: &str) {
        assert!(HeartbeatFilter::default().is_heartbeat(text.as_bytes()));
    }

    #[test_case("2000000000"; "no token")]
    #[test_case("2000bc0000"; "one token")]
    #[test_case("20bc00bc00"; "tokens not adjacent")]
    #[test_case("20BCBC0000"; "case sensitive")]
    fn heartbeat_accepted(text: &str) {
        assert!(HeartbeatFilter::default().accept(text.as_bytes()));
    }

    #[test]
    fn custom_heartbeat_token() {
        let filter = HeartbeatFilter::new("ee");
        assert!(filter.is_heartbeat(b"20eeee0000"));
        assert!(filter.accept(b"20bcbc0000"));
    }
}
