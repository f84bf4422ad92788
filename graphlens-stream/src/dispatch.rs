//! Routing decoded records to data, end, and error callbacks.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use graphlens_types::{StreamFailure, TransportError};
use serde_json::Value;

use crate::decoder::FrameDecoder;
use crate::record::StreamRecord;

/// Receiver of a stream's records.
///
/// Callbacks run synchronously, one record at a time, in arrival order.
pub trait StreamHandler {
    /// A payload record arrived.
    fn on_data(&mut self, payload: Value);

    /// The stream finished. Called at most once per stream.
    fn on_end(&mut self);

    /// The server reported an error in-band, or the transport failed.
    ///
    /// In-band errors ([`StreamFailure::Sentinel`]) do not end the stream;
    /// further records may follow.
    fn on_error(&mut self, failure: StreamFailure);
}

/// How a dispatched stream terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The end sentinel arrived.
    Ended,
    /// The transport closed without an end sentinel.
    Closed,
    /// The transport failed mid-stream.
    Failed,
}

/// Drives a [`StreamHandler`] one chunk at a time.
///
/// Owns the [`FrameDecoder`] of one stream. Use this directly when the
/// caller needs to interleave other work between chunks; otherwise
/// [`dispatch`] runs the whole loop.
#[derive(Debug, Default)]
pub struct RecordDispatcher {
    decoder: FrameDecoder,
    ended: bool,
    received: bool,
}

impl RecordDispatcher {
    /// A dispatcher with a default decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher around a configured decoder.
    #[must_use]
    pub fn with_decoder(decoder: FrameDecoder) -> Self {
        Self {
            decoder,
            ended: false,
            received: false,
        }
    }

    /// Whether `on_end` (or a transport failure) has already terminated the stream.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Decode a chunk and dispatch every record it completes.
    ///
    /// Returns `false` once the stream has ended; the caller should stop
    /// reading. Records after the end sentinel are ignored.
    pub fn dispatch_chunk<H>(&mut self, chunk: &[u8], handler: &mut H) -> bool
    where
        H: StreamHandler + ?Sized,
    {
        if self.ended {
            return false;
        }
        self.received |= !chunk.is_empty();
        for record in self.decoder.feed(chunk) {
            self.dispatch_record(record, handler);
            if self.ended {
                return false;
            }
        }
        true
    }

    /// The transport closed. Flushes the decoder and ends the stream if the
    /// end sentinel never arrived.
    ///
    /// A stream that closes before delivering a single byte had no body and
    /// fails with [`TransportError::MissingBody`].
    pub fn close<H>(&mut self, handler: &mut H) -> DispatchOutcome
    where
        H: StreamHandler + ?Sized,
    {
        if self.ended {
            return DispatchOutcome::Ended;
        }
        if !self.received {
            tracing::warn!("search stream closed without a body");
            return self.fail(TransportError::MissingBody, handler);
        }
        if let Some(record) = self.decoder.finish() {
            self.dispatch_record(record, handler);
            if self.ended {
                return DispatchOutcome::Ended;
            }
        }
        tracing::warn!("search stream closed without end sentinel");
        self.ended = true;
        handler.on_end();
        DispatchOutcome::Closed
    }

    /// The transport failed. Reports the failure and stops the stream.
    pub fn fail<H>(&mut self, err: TransportError, handler: &mut H) -> DispatchOutcome
    where
        H: StreamHandler + ?Sized,
    {
        self.ended = true;
        handler.on_error(StreamFailure::Transport(err));
        DispatchOutcome::Failed
    }

    /// Read `stream` to its end, dispatching every record.
    pub async fn run<S, H>(mut self, stream: S, handler: &mut H) -> DispatchOutcome
    where
        S: Stream<Item = Result<Bytes, TransportError>>,
        H: StreamHandler + ?Sized,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if !self.dispatch_chunk(&bytes, handler) {
                        return DispatchOutcome::Ended;
                    }
                }
                Err(e) => return self.fail(e, handler),
            }
        }
        self.close(handler)
    }

    fn dispatch_record<H>(&mut self, record: StreamRecord, handler: &mut H)
    where
        H: StreamHandler + ?Sized,
    {
        match record {
            StreamRecord::Payload(payload) => handler.on_data(payload),
            StreamRecord::Error(msg) => {
                tracing::warn!(error = %msg, "server reported error in stream");
                handler.on_error(StreamFailure::Sentinel(msg));
            }
            StreamRecord::End => {
                tracing::debug!("search stream reached end sentinel");
                self.ended = true;
                handler.on_end();
            }
        }
    }
}

/// Read a byte stream to its end, dispatching every record to `handler`.
pub async fn dispatch<S, H>(stream: S, handler: &mut H) -> DispatchOutcome
where
    S: Stream<Item = Result<Bytes, TransportError>>,
    H: StreamHandler + ?Sized,
{
    RecordDispatcher::new().run(stream, handler).await
}

/// Expose a byte stream as a stream of decoded records.
///
/// The record stream stops after the end sentinel or the first transport
/// error; it does not synthesize an end record when the transport closes.
pub fn record_stream<S>(
    byte_stream: S,
) -> impl Stream<Item = Result<StreamRecord, TransportError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut bytes_stream = std::pin::pin!(byte_stream);

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for record in decoder.feed(&chunk) {
                let is_end = record.is_end();
                yield Ok(record);
                if is_end {
                    return;
                }
            }
        }

        if let Some(record) = decoder.finish() {
            yield Ok(record);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        data: Vec<Value>,
        ends: usize,
        errors: Vec<String>,
    }

    impl StreamHandler for Recorder {
        fn on_data(&mut self, payload: Value) {
            self.data.push(payload);
        }

        fn on_end(&mut self) {
            self.ends += 1;
        }

        fn on_error(&mut self, failure: StreamFailure) {
            self.errors.push(failure.to_string());
        }
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, TransportError>> {
        let items: Vec<Result<Bytes, TransportError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        futures::stream::iter(items)
    }

    #[tokio::test]
    async fn split_end_sentinel_calls_on_data_then_on_end() {
        let mut rec = Recorder::default();
        let outcome = dispatch(
            chunks(&["{\"end\":false,\"data\":\"a\"}\n{\"en", "d\":true}\n"]),
            &mut rec,
        )
        .await;
        assert_eq!(outcome, DispatchOutcome::Ended);
        assert_eq!(rec.data, vec![json!({"end": false, "data": "a"})]);
        assert_eq!(rec.ends, 1);
        assert!(rec.errors.is_empty());
    }

    #[tokio::test]
    async fn error_sentinel_does_not_stop_reading() {
        let mut rec = Recorder::default();
        let outcome = dispatch(
            chunks(&[
                "{\"text\":\"a\"}\n",
                "{\"error\":\"llm timeout\"}\n{\"text\":\"b\"}\n",
                "{\"text\":\"c\"}\n{\"end\":true}\n",
            ]),
            &mut rec,
        )
        .await;
        assert_eq!(outcome, DispatchOutcome::Ended);
        assert_eq!(rec.errors, vec!["server error: llm timeout".to_string()]);
        assert_eq!(rec.data.len(), 3);
        assert_eq!(rec.ends, 1);
    }

    #[tokio::test]
    async fn malformed_line_between_payloads() {
        let mut rec = Recorder::default();
        dispatch(
            chunks(&["{\"text\":\"a\"}\nnot-json\n{\"text\":\"b\"}\n{\"end\":true}\n"]),
            &mut rec,
        )
        .await;
        assert_eq!(rec.data.len(), 2);
        assert!(rec.errors.is_empty());
    }

    #[tokio::test]
    async fn records_after_end_are_ignored() {
        let mut rec = Recorder::default();
        let outcome = dispatch(
            chunks(&[
                "{\"text\":\"a\"}\n{\"end\":true}\n{\"text\":\"late\"}\n",
                "{\"text\":\"later\"}\n{\"end\":true}\n",
            ]),
            &mut rec,
        )
        .await;
        assert_eq!(outcome, DispatchOutcome::Ended);
        assert_eq!(rec.data, vec![json!({"text": "a"})]);
        assert_eq!(rec.ends, 1);
    }

    #[tokio::test]
    async fn close_without_sentinel_still_ends_once() {
        let mut rec = Recorder::default();
        let outcome = dispatch(chunks(&["{\"text\":\"a\"}\n{\"text\":"]), &mut rec).await;
        assert_eq!(outcome, DispatchOutcome::Closed);
        assert_eq!(rec.data.len(), 1);
        assert_eq!(rec.ends, 1);
    }

    #[tokio::test]
    async fn close_before_any_bytes_is_missing_body() {
        let mut rec = Recorder::default();
        let outcome = dispatch(chunks(&["", ""]), &mut rec).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(rec.errors, vec!["transport failure: response has no body"]);
        assert_eq!(rec.ends, 0);
    }

    #[tokio::test]
    async fn transport_error_reports_and_stops() {
        let mut rec = Recorder::default();
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"text\":\"a\"}\n")),
            Err(TransportError::MissingBody),
            Ok(Bytes::from_static(b"{\"text\":\"b\"}\n")),
        ]);
        let outcome = dispatch(stream, &mut rec).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(rec.data.len(), 1);
        assert_eq!(rec.errors.len(), 1);
        assert_eq!(rec.ends, 0);
    }

    #[test]
    fn dispatch_chunk_after_end_is_refused() {
        let mut rec = Recorder::default();
        let mut dispatcher = RecordDispatcher::new();
        assert!(!dispatcher.dispatch_chunk(b"{\"end\":true}\n", &mut rec));
        assert!(dispatcher.is_ended());
        assert!(!dispatcher.dispatch_chunk(b"{\"text\":\"a\"}\n", &mut rec));
        assert_eq!(dispatcher.close(&mut rec), DispatchOutcome::Ended);
        assert!(rec.data.is_empty());
        assert_eq!(rec.ends, 1);
    }

    #[test]
    fn salvaged_tail_end_sentinel_counts_as_ended() {
        let mut rec = Recorder::default();
        let mut dispatcher =
            RecordDispatcher::with_decoder(FrameDecoder::new().salvage_tail(true));
        assert!(dispatcher.dispatch_chunk(b"{\"text\":\"a\"}\n{\"end\":true}", &mut rec));
        assert_eq!(dispatcher.close(&mut rec), DispatchOutcome::Ended);
        assert_eq!(rec.ends, 1);
    }

    #[tokio::test]
    async fn record_stream_stops_at_end() {
        let records: Vec<_> = record_stream(chunks(&[
            "{\"text\":\"a\"}\n{\"end\":true}\n{\"text\":\"b\"}\n",
        ]))
        .collect()
        .await;
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[1], Ok(StreamRecord::End)));
    }

    #[tokio::test]
    async fn record_stream_surfaces_transport_error() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"text\":\"a\"}\n")),
            Err(TransportError::MissingBody),
        ]);
        let records: Vec<_> = record_stream(stream).collect().await;
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[1], Err(TransportError::MissingBody)));
    }
}
