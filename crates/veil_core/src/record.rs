//! Mask decoration records.
//!
//! A [`MaskRecord`] tells the host to draw `mask` over the byte span
//! `value_start..value_end` of the buffer. Records borrow the input they
//! were generated from; [`CachedMask`] is the owned form kept in a
//! [`crate::cache::BufferCache`] between calls.

use std::sync::Arc;

use crate::parser::QuoteType;

/// One mask decoration over a value span.
///
/// Only emitted when the mask differs from the value, so the host never
/// draws a no-op overlay. `value` is retained as a reference into the input
/// for diagnostics; it is never copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRecord<'a> {
    /// 1-indexed line the value starts on.
    pub line_number: usize,
    /// 1-indexed line containing the last byte of the value.
    pub value_end_line: usize,
    /// Byte offset where the value content begins.
    pub value_start: usize,
    /// Byte offset one past the last value content byte.
    pub value_end: usize,
    /// The replacement string to draw over the span.
    pub mask: Arc<str>,
    /// Quoting style, carried through so the overlay layer can keep the
    /// quote bytes visible.
    pub quote_type: QuoteType,
    /// The value bytes the mask covers.
    pub value: &'a str,
}

impl MaskRecord<'_> {
    /// Converts this record to per-line overlay spans.
    ///
    /// `line_offsets` must be the offsets returned alongside this record.
    /// One span is produced for every line the value covers; columns are
    /// byte offsets relative to the line start. Spans never include the
    /// surrounding quote bytes because the record's span already excludes
    /// them, nor line terminators on intermediate lines.
    #[must_use]
    pub fn overlay_spans(&self, input: &str, line_offsets: &[usize]) -> Vec<OverlaySpan> {
        let mut spans = Vec::with_capacity(self.value_end_line - self.line_number + 1);

        for line in self.line_number..=self.value_end_line {
            let Some(&line_start) = line_offsets.get(line - 1) else {
                break;
            };
            let line_end = match line_offsets.get(line) {
                Some(&next_start) => trim_line_terminator(input, next_start),
                None => input.len(),
            };

            let start = self.value_start.max(line_start);
            let end = self.value_end.min(line_end);
            if start > end {
                continue;
            }

            spans.push(OverlaySpan {
                line,
                start_col: start - line_start,
                end_col: end - line_start,
            });
        }

        spans
    }
}

/// Strips the `\n` or `\r\n` terminator preceding `next_line_start`.
fn trim_line_terminator(input: &str, next_line_start: usize) -> usize {
    let bytes = input.as_bytes();
    let mut end = next_line_start;
    if end > 0 && bytes.get(end - 1) == Some(&b'\n') {
        end -= 1;
        if end > 0 && bytes.get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
    }
    end
}

/// A single overlay the host draws: at `line`, replace the displayed bytes
/// in `[start_col, end_col)` while leaving the buffer text unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySpan {
    /// 1-indexed line number.
    pub line: usize,
    /// Byte column where the overlay begins.
    pub start_col: usize,
    /// Byte column one past the overlay's end.
    pub end_col: usize,
}

/// Owned form of a [`MaskRecord`], held by buffer caches between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMask {
    /// 1-indexed line the value starts on.
    pub line_number: usize,
    /// 1-indexed line containing the last byte of the value.
    pub value_end_line: usize,
    /// Byte offset where the value content begins.
    pub value_start: usize,
    /// Byte offset one past the last value content byte.
    pub value_end: usize,
    /// The replacement string to draw over the span.
    pub mask: Arc<str>,
    /// Quoting style of the masked value.
    pub quote_type: QuoteType,
}

impl CachedMask {
    /// Rebinds this cached record to `input`.
    ///
    /// Returns `None` when the stored span no longer lies inside `input`
    /// on char boundaries - the record is stale and must be dropped rather
    /// than redrawn.
    #[must_use]
    pub fn rehydrate<'a>(&self, input: &'a str) -> Option<MaskRecord<'a>> {
        let value = input.get(self.value_start..self.value_end)?;
        Some(MaskRecord {
            line_number: self.line_number,
            value_end_line: self.value_end_line,
            value_start: self.value_start,
            value_end: self.value_end,
            mask: Arc::clone(&self.mask),
            quote_type: self.quote_type,
            value,
        })
    }
}

impl From<&MaskRecord<'_>> for CachedMask {
    fn from(record: &MaskRecord<'_>) -> Self {
        Self {
            line_number: record.line_number,
            value_end_line: record.value_end_line,
            value_start: record.value_start,
            value_end: record.value_end,
            mask: Arc::clone(&record.mask),
            quote_type: record.quote_type,
        }
    }
}
