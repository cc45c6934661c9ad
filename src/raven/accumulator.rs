//! # Fragment Accumulator
//!
//! The dongle streams each XML element over several lines, e.g.
//!
//! ```text
//! <InstantaneousDemand>
//!   <DeviceMacId>0xd8d5b9000000xxxx</DeviceMacId>
//!   <TimeStamp>0x1c8f4a3b</TimeStamp>
//!   <Demand>0x0004f4</Demand>
//! </InstantaneousDemand>
//! ```
//!
//! Lines are buffered until one whose trimmed content starts with `</`
//! arrives; the buffer is then handed out as a complete document. Only the
//! start of the terminating line is inspected. A whole element on a single
//! line (`<A>1</A>`) does not complete a document.

use crate::constants::{CLOSING_TAG_PREFIX, LINE_TERMINATOR};

/// Buffers serial lines until a closing-tag line completes a document.
#[derive(Debug, Default, Clone)]
pub struct FragmentAccumulator {
    buffer: String,
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` plus a line terminator and returns the accumulated
    /// document if `line` terminates it.
    pub fn feed(&mut self, line: &str) -> Option<String> {
        self.buffer.push_str(line);
        self.buffer.push_str(LINE_TERMINATOR);

        if line.trim().starts_with(CLOSING_TAG_PREFIX) {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Text accumulated since the last flush.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops any partial fragment.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
