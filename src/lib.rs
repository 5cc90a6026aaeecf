//! Streaming CSV ingestion for seller analytics tools.
//!
//! - Parser worker: tokenizes off the caller's task and reports
//!   `chunk`/`progress`/`error`/`complete` over a channel.
//! - Controller: owns one session's state, validates the header against a
//!   tool's [`RequiredSchema`] and normalizes each row into a [`TypedRow`].
//! - Sources: local files, gzip/zstd, non-UTF-8 charsets.
//!
//! Data shape:
//! - Raw rows: [`RawRow`] (header shared across a file, values as text)
//! - Typed rows: [`TypedRow`] (one slot per required column plus `extra`)
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
mod config;
mod controller;
mod export;
mod io;
pub mod metrics;
mod normalize;
mod row;
mod schema;
mod tools;
mod worker;

pub use crate::config::IngestConfig;
pub use crate::controller::{ingest, Dataset, IngestionController, IngestionState, Phase};
pub use crate::export::write_csv;
pub use crate::io::{accept_upload, build_csv_reader, CsvMeta, IngestSource};
pub use crate::normalize::{coerce_numeric, normalize};
pub use crate::row::{Cell, RawRow, TypedRow};
pub use crate::schema::{validate, RequiredSchema, ValidationResult};
pub use crate::tools::Tool;
pub use crate::worker::{spawn_parser, Envelope, SessionId, WorkerMessage};

use thiserror::Error;

/// Error type returned by this crate when not using `anyhow`.
///
/// Every variant carries text so a terminal error can be stored in the
/// session state and shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Required columns absent from the header, in required-schema order.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// Malformed rows reported by the tokenizer within one chunk.
    #[error("{0}")]
    Syntax(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Upload rejected: {0}")]
    Rejected(String),
    /// The session was never started or was cleared before it ended.
    #[error("Ingestion did not finish")]
    Unfinished,
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

impl From<csv_async::Error> for IngestError {
    fn from(err: csv_async::Error) -> Self {
        if matches!(err.kind(), csv_async::ErrorKind::Io(_)) {
            IngestError::Io(err.to_string())
        } else {
            IngestError::Syntax(err.to_string())
        }
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
