#![deny(missing_docs)]
//! Incremental NDJSON decoding and record dispatch.
//!
//! The search endpoint answers with one JSON object per line:
//! ```text
//! {"text":"Graphs are","mainNode":null,"entities":[]}
//! {"text":" made of nodes.","mainNode":null,"entities":[]}
//! {"end":true}
//! ```
//!
//! [`FrameDecoder`] turns arbitrarily split byte chunks into [`StreamRecord`]s;
//! [`dispatch`] drives a [`StreamHandler`] from a byte stream;
//! [`record_stream`] exposes the same records as a `Stream`.

mod decoder;
mod dispatch;
mod record;

pub use decoder::FrameDecoder;
pub use dispatch::{DispatchOutcome, RecordDispatcher, StreamHandler, dispatch, record_stream};
pub use record::StreamRecord;
