//! Batch translation through the completion client.
//!
//! A batch is serialized into one payload, sent with a system prompt that
//! pins the response shape, and the response is merged back field by field.
//! Anything the model leaves out keeps its source value.

pub mod batch;
pub mod language;
pub mod payload;
pub mod prompt;
pub mod response;

pub use batch::{BatchTranslator, TranslateError};
pub use payload::{BatchItem, CellShape, PayloadShape};
