//! Chunk-to-record decoding for newline-delimited JSON.

use std::borrow::Cow;

use crate::record::StreamRecord;

/// Incremental NDJSON decoder.
///
/// Feed it byte chunks exactly as the network delivered them. Records and
/// UTF-8 characters split across chunk boundaries are reassembled; the
/// decoder only ever emits lines that were terminated by `\n`.
///
/// ```
/// use graphlens_stream::{FrameDecoder, StreamRecord};
///
/// let mut decoder = FrameDecoder::new();
/// let first = decoder.feed(b"{\"end\":false,\"data\":\"a\"}\n{\"en");
/// assert_eq!(first.len(), 1);
/// let second = decoder.feed(b"d\":true}\n");
/// assert_eq!(second, vec![StreamRecord::End]);
/// assert!(decoder.finish().is_none());
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of a UTF-8 sequence cut off at the end of the last chunk.
    carry: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    buffer: String,
    salvage_tail: bool,
    max_line_bytes: Option<usize>,
    /// Set while skipping the remainder of an over-long line.
    discarding: bool,
}

impl FrameDecoder {
    /// A decoder with the protocol defaults: unterminated tails are
    /// discarded and lines may be arbitrarily long.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a non-empty unterminated tail in [`finish`](Self::finish)
    /// instead of discarding it.
    #[must_use]
    pub fn salvage_tail(mut self, salvage: bool) -> Self {
        self.salvage_tail = salvage;
        self
    }

    /// Drop any line that grows beyond `max` bytes without a newline.
    ///
    /// Decoding resumes after the next newline.
    #[must_use]
    pub fn max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = Some(max);
        self
    }

    /// Number of decoded bytes waiting for a newline.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Decode one chunk and return every record it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        // The buffer holds no newline before this chunk; only the new text
        // needs scanning.
        let scanned = self.buffer.len();
        self.decode_utf8(chunk);

        let Some(last_newline) = self.buffer[scanned..]
            .rfind('\n')
            .map(|i| scanned + i)
        else {
            self.enforce_line_limit();
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        let mut lines = complete.split('\n');
        if std::mem::take(&mut self.discarding) {
            lines.next();
        }
        let records = lines.filter_map(parse_line).collect();
        self.enforce_line_limit();
        records
    }

    /// Flush the decoder at end of stream.
    ///
    /// The protocol requires a newline after the final record, so by default
    /// an unterminated tail is incomplete and dropped. With
    /// [`salvage_tail`](Self::salvage_tail) it is parsed instead.
    pub fn finish(&mut self) -> Option<StreamRecord> {
        if !self.carry.is_empty() {
            self.carry.clear();
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }
        let tail = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) || tail.trim().is_empty() {
            return None;
        }
        if self.salvage_tail {
            parse_line(&tail)
        } else {
            tracing::debug!(bytes = tail.len(), "discarding unterminated NDJSON tail");
            None
        }
    }

    /// Append the chunk to the buffer as text, holding back an incomplete
    /// trailing UTF-8 sequence and replacing invalid bytes with U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        let input: Cow<'_, [u8]> = if self.carry.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut bytes: &[u8] = &input;
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = bytes.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees this prefix decodes.
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.buffer.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[len..];
                        }
                        None => {
                            self.carry.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn enforce_line_limit(&mut self) {
        let Some(max) = self.max_line_bytes else {
            return;
        };
        if self.buffer.len() > max {
            tracing::warn!(
                bytes = self.buffer.len(),
                max,
                "NDJSON line exceeds limit, skipping to next newline"
            );
            self.buffer.clear();
            self.discarding = true;
        }
    }
}

/// Parse one candidate line. Blank lines and malformed JSON yield nothing.
fn parse_line(line: &str) -> Option<StreamRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(StreamRecord::classify(value)),
        Err(e) => {
            tracing::warn!(error = %e, bytes = line.len(), "dropping malformed NDJSON line");
            None
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> StreamRecord {
        StreamRecord::Payload(value)
    }

    #[test]
    fn record_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let first = decoder.feed(br#"{"end":false,"data":"a"}
{"en"#);
        assert_eq!(first, vec![payload(json!({"end": false, "data": "a"}))]);
        assert_eq!(decoder.buffered_len(), 4);

        let second = decoder.feed(b"d\":true}\n");
        assert_eq!(second, vec![StreamRecord::End]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn several_records_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.feed(b"{\"text\":\"a\"}\n{\"text\":\"b\"}\n{\"end\":true}\n");
        assert_eq!(
            records,
            vec![
                payload(json!({"text": "a"})),
                payload(json!({"text": "b"})),
                StreamRecord::End,
            ]
        );
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let line = "{\"text\":\"知识图谱\"}\n".as_bytes();
        // Cut inside the first three-byte character.
        let cut = line.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&line[..cut]).is_empty());
        let records = decoder.feed(&line[cut..]);
        assert_eq!(records, vec![payload(json!({"text": "知识图谱"}))]);
    }

    #[test]
    fn multibyte_character_fed_one_byte_at_a_time() {
        let line = "{\"text\":\"🦀 crab\"}\n".as_bytes();
        let mut decoder = FrameDecoder::new();
        let mut records = Vec::new();
        for byte in line {
            records.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(records, vec![payload(json!({"text": "🦀 crab"}))]);
    }

    #[test]
    fn long_line_in_small_chunks_then_next_record() {
        let text = "x".repeat(64 * 1024);
        let mut input = format!("{{\"text\":\"{text}\"}}").into_bytes();
        let mut decoder = FrameDecoder::new();
        for chunk in input.chunks(7) {
            assert!(decoder.feed(chunk).is_empty());
        }
        assert_eq!(decoder.buffered_len(), input.len());

        input.clear();
        input.extend_from_slice(b"\n{\"end\":true}\n");
        let records = decoder.feed(&input);
        assert_eq!(records, vec![payload(json!({"text": text})), StreamRecord::End]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn malformed_line_is_dropped_and_decoding_continues() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.feed(b"{\"text\":\"a\"}\nnot-json\n{\"text\":\"b\"}\n");
        assert_eq!(
            records,
            vec![payload(json!({"text": "a"})), payload(json!({"text": "b"}))]
        );
    }

    #[test]
    fn blank_and_crlf_lines() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.feed(b"\n   \n{\"text\":\"a\"}\r\n\r\n");
        assert_eq!(records, vec![payload(json!({"text": "a"}))]);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.feed(b"{\"text\":\"a\xffb\"}\n{\"end\":true}\n");
        assert_eq!(
            records,
            vec![payload(json!({"text": "a\u{FFFD}b"})), StreamRecord::End]
        );
    }

    #[test]
    fn finish_discards_unterminated_tail() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"{\"text\":\"a\"}").is_empty());
        assert!(decoder.finish().is_none());
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn finish_salvages_tail_when_enabled() {
        let mut decoder = FrameDecoder::new().salvage_tail(true);
        assert!(decoder.feed(b"{\"end\":true}").is_empty());
        assert_eq!(decoder.finish(), Some(StreamRecord::End));
    }

    #[test]
    fn finish_on_empty_buffer_is_none() {
        let mut decoder = FrameDecoder::new().salvage_tail(true);
        decoder.feed(b"{\"text\":\"a\"}\n");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn over_long_line_is_skipped() {
        let mut decoder = FrameDecoder::new().max_line_bytes(16);
        assert!(decoder.feed(b"{\"text\":\"aaaaaaaaaaaaaaaa").is_empty());
        assert_eq!(decoder.buffered_len(), 0);
        let records = decoder.feed(b"aaaa\"}\n{\"end\":true}\n");
        assert_eq!(records, vec![StreamRecord::End]);
    }

    #[test]
    fn line_within_limit_is_kept() {
        let mut decoder = FrameDecoder::new().max_line_bytes(64);
        let records = decoder.feed(b"{\"text\":\"short\"}\n");
        assert_eq!(records, vec![payload(json!({"text": "short"}))]);
    }
}
