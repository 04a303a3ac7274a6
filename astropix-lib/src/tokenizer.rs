//! Splitting a raw readout stream into readout lines.
//!
//! The DAQ writes each readout as hex text bounded by delimiter characters and padded
//! with filler characters. A closing delimiter immediately followed by another delimiter
//! is a single boundary: it ends the current line and opens the next one.
use tracing::trace;

/// Default filler character; never part of a line.
pub const FILLER: u8 = b'f';
/// Default line delimiter.
pub const DELIMITER: u8 = b'\'';

/// Characters used to frame readout lines in the raw stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Framing {
    pub filler: u8,
    pub delimiter: u8,
}

impl Default for Framing {
    fn default() -> Self {
        Framing {
            filler: FILLER,
            delimiter: DELIMITER,
        }
    }
}

/// State of the line framing state machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerState {
    /// No delimiter seen yet; everything is discarded.
    #[default]
    Idle,
    /// Inside a line, collecting content.
    Open,
    /// A delimiter was seen inside a line. Another delimiter ends the line, anything
    /// else means the delimiter was content.
    ClosePending,
}

/// What to do with the current line buffer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Discard,
    Push(u8),
    /// The pending delimiter turned out to be content; push it, then the byte.
    PushDelimiterAnd(u8),
    /// The current line is complete.
    Emit,
}

impl TokenizerState {
    /// Transition on a single non-filler byte.
    #[must_use]
    pub fn next(self, b: u8, delimiter: u8) -> (TokenizerState, Action) {
        use TokenizerState::{ClosePending, Idle, Open};

        let is_delimiter = b == delimiter;
        match (self, is_delimiter) {
            (Idle, true) => (Open, Action::Discard),
            (Idle, false) => (Idle, Action::Discard),
            (Open, true) => (ClosePending, Action::Discard),
            (Open, false) => (Open, Action::Push(b)),
            (ClosePending, true) => (Open, Action::Emit),
            (ClosePending, false) => (Open, Action::PushDelimiterAnd(b)),
        }
    }
}

/// One readout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Zero-based position of this line among all emitted lines.
    pub index: usize,
    pub data: Vec<u8>,
}

impl Line {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Iterator producing [Line]s from a raw stream, in stream order.
///
/// Content after the last boundary that is never closed is dropped. A stream that ends
/// right after a closing delimiter still produces its final line.
pub struct LineTokenizer<'a> {
    stream: &'a [u8],
    pos: usize,
    framing: Framing,
    state: TokenizerState,
    buf: Vec<u8>,
    emitted: usize,
}

impl<'a> LineTokenizer<'a> {
    pub fn new(stream: &'a [u8], framing: Framing) -> Self {
        LineTokenizer {
            stream,
            pos: 0,
            framing,
            state: TokenizerState::default(),
            buf: Vec::new(),
            emitted: 0,
        }
    }

    fn emit(&mut self) -> Line {
        let line = Line {
            index: self.emitted,
            data: std::mem::take(&mut self.buf),
        };
        self.emitted += 1;
        line
    }
}

impl Iterator for LineTokenizer<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.stream.len() {
            let b = self.stream[self.pos];
            self.pos += 1;
            if b == self.framing.filler {
                continue;
            }

            let (state, action) = self.state.next(b, self.framing.delimiter);
            self.state = state;
            match action {
                Action::Discard => (),
                Action::Push(b) => self.buf.push(b),
                Action::PushDelimiterAnd(b) => {
                    self.buf.push(self.framing.delimiter);
                    self.buf.push(b);
                }
                Action::Emit => return Some(self.emit()),
            }
        }

        // End of stream
        match self.state {
            TokenizerState::ClosePending => {
                self.state = TokenizerState::Idle;
                Some(self.emit())
            }
            TokenizerState::Open => {
                trace!(len = self.buf.len(), "dropping unterminated line");
                self.state = TokenizerState::Idle;
                self.buf.clear();
                None
            }
            TokenizerState::Idle => None,
        }
    }
}

/// Collect all lines in `stream`.
#[must_use]
pub fn tokenize(stream: &[u8], framing: Framing) -> Vec<Line> {
    LineTokenizer::new(stream, framing).collect()
}
