//! Streaming parser worker.
//!
//! Tokenizes one source on its own tokio task and reports back only through
//! [`Envelope`]s on an mpsc channel:
//!
//! `Header`, then `Chunk`, `Progress` (repeated) then exactly one of `Error`
//! or `Complete`.
//!
//! Progress is `min(100, round(cursor / total * 100))` where `cursor` is the
//! tokenizer's byte position after the chunk. It is an approximation, not an
//! exact byte count (buffering and line endings can make it under- or
//! over-report near the final chunk), which is why a final `Progress(100)`
//! always precedes `Complete`.
use std::fmt;
use std::sync::Arc;

use csv_async::{AsyncReaderBuilder, StringRecord, Trim};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::row::RawRow;
use crate::{IngestConfig, IngestError, IngestSource};

/// Identifies one ingestion session; messages from older sessions are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// Column names of the header line; empty when the input has none.
    Header(Arc<[String]>),
    /// Rows of this chunk only, in file order.
    Chunk(Vec<RawRow>),
    Progress(u8),
    Error(IngestError),
    /// No payload: every row already went out in a `Chunk`.
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub session: SessionId,
    pub message: WorkerMessage,
}

/// Spawns a worker parsing `source` for `session`. Must be called within a
/// tokio runtime. Aborting the returned handle stops the worker.
pub fn spawn_parser(
    session: SessionId,
    source: IngestSource,
    config: &IngestConfig,
    tx: mpsc::Sender<Envelope>,
) -> JoinHandle<()> {
    let config = config.clone();
    let span = info_span!("parser", session = %session, file = %source.name());
    tokio::spawn(
        async move {
            let outbox = Outbox { session, tx };
            if run(source, &config, &outbox).await.is_err() {
                debug!("controller went away, stopping");
            }
        }
        .instrument(span),
    )
}

/// The receiving side is gone.
struct Closed;

struct Outbox {
    session: SessionId,
    tx: mpsc::Sender<Envelope>,
}

impl Outbox {
    async fn send(&self, message: WorkerMessage) -> Result<(), Closed> {
        self.tx
            .send(Envelope {
                session: self.session,
                message,
            })
            .await
            .map_err(|_| Closed)
    }

    async fn fail(&self, err: IngestError) -> Result<(), Closed> {
        warn!(error = %err, "parsing failed");
        self.send(WorkerMessage::Error(err)).await
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Rows of the chunk being read plus the row errors seen in it.
struct PendingChunk {
    rows: Vec<RawRow>,
    errors: Vec<String>,
    seen: usize,
}

impl PendingChunk {
    fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            errors: Vec::new(),
            seen: 0,
        }
    }

    async fn flush(
        &mut self,
        out: &Outbox,
        cursor: u64,
        total: Option<u64>,
    ) -> Result<Flow, Closed> {
        if !self.errors.is_empty() {
            let msg = std::mem::take(&mut self.errors).join(", ");
            out.fail(IngestError::Syntax(msg)).await?;
            return Ok(Flow::Stop);
        }
        let cap = self.rows.capacity();
        let rows = std::mem::replace(&mut self.rows, Vec::with_capacity(cap));
        debug!(rows = rows.len(), cursor, "chunk parsed");
        self.seen = 0;
        out.send(WorkerMessage::Chunk(rows)).await?;
        if let Some(total) = total {
            out.send(WorkerMessage::Progress(progress_percent(cursor, total)))
                .await?;
        }
        Ok(Flow::Continue)
    }
}

async fn run(source: IngestSource, config: &IngestConfig, out: &Outbox) -> Result<(), Closed> {
    let IngestSource {
        reader,
        total_bytes,
        ..
    } = source;
    let mut rdr = AsyncReaderBuilder::new()
        .has_headers(true)
        // ragged rows are reported as syntax errors
        .flexible(false)
        .delimiter(config.delimiter)
        .trim(if config.trim_headers {
            Trim::Headers
        } else {
            Trim::None
        })
        .buffer_capacity(config.buffer_capacity)
        .create_reader(reader);

    let header: Arc<[String]> = match rdr.headers().await {
        Ok(h) => h.iter().map(str::to_owned).collect(),
        Err(e) => return out.fail(e.into()).await,
    };
    info!(columns = header.len(), total_bytes, "parsing started");
    let repeated = duplicate_columns(&header);
    if !repeated.is_empty() {
        debug!(columns = ?repeated, "header repeats column names, first occurrence wins");
    }
    out.send(WorkerMessage::Header(header.clone())).await?;

    let chunk_rows = config.chunk_rows.max(1);
    let mut pending = PendingChunk::new(chunk_rows);
    let mut record = StringRecord::new();
    let mut rows_total = 0u64;

    loop {
        match rdr.read_record(&mut record).await {
            Ok(true) => {
                pending.rows.push(RawRow::new(
                    header.clone(),
                    record.iter().map(str::to_owned).collect(),
                ));
                rows_total += 1;
            }
            Ok(false) => break,
            Err(e) => match IngestError::from(e) {
                err @ IngestError::Io(_) => return out.fail(err).await,
                err => pending.errors.push(err.to_string()),
            },
        }
        pending.seen += 1;
        if pending.seen >= chunk_rows {
            let cursor = rdr.position().byte();
            if let Flow::Stop = pending.flush(out, cursor, total_bytes).await? {
                return Ok(());
            }
        }
    }

    if pending.seen > 0 {
        let cursor = rdr.position().byte();
        if let Flow::Stop = pending.flush(out, cursor, total_bytes).await? {
            return Ok(());
        }
    }

    info!(rows = rows_total, "parsing complete");
    out.send(WorkerMessage::Progress(100)).await?;
    out.send(WorkerMessage::Complete).await
}

fn duplicate_columns(header: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut repeated = Vec::new();
    for name in header {
        if !seen.insert(name.as_str()) && !repeated.contains(&name.as_str()) {
            repeated.push(name.as_str());
        }
    }
    repeated
}

fn progress_percent(cursor: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (cursor as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_rounded_and_capped() {
        assert_eq!(progress_percent(0, 200), 0);
        assert_eq!(progress_percent(1, 200), 1); // 0.5 rounds up
        assert_eq!(progress_percent(199, 200), 100);
        assert_eq!(progress_percent(500, 200), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn finds_repeated_header_names() {
        let header: Vec<String> = ["asin", "price", "price", "asin", "price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(duplicate_columns(&header), vec!["price", "asin"]);
        assert!(duplicate_columns(&header[..2]).is_empty());
    }

    async fn collect(csv: &str, chunk_rows: usize) -> Vec<WorkerMessage> {
        let (tx, mut rx) = mpsc::channel(4);
        let cfg = IngestConfig::default().with_chunk_rows(chunk_rows);
        let handle = spawn_parser(
            SessionId(7),
            IngestSource::from_bytes("t.csv", csv.as_bytes().to_vec()),
            &cfg,
            tx,
        );
        let mut out = Vec::new();
        while let Some(env) = rx.recv().await {
            assert_eq!(env.session, SessionId(7));
            out.push(env.message);
        }
        handle.await.unwrap();
        out
    }

    #[tokio::test]
    async fn remainder_chunk_then_complete() {
        let msgs = collect("asin,price\nA,1\nB,2\nC,3\n", 2).await;
        let chunk_sizes: Vec<usize> = msgs
            .iter()
            .filter_map(|m| match m {
                WorkerMessage::Chunk(rows) => Some(rows.len()),
                _ => None,
            })
            .collect();
        assert_eq!(chunk_sizes, vec![2, 1]);
        assert_eq!(msgs.last(), Some(&WorkerMessage::Complete));
        assert_eq!(msgs[msgs.len() - 2], WorkerMessage::Progress(100));
    }

    #[tokio::test]
    async fn joins_all_row_errors_of_a_chunk() {
        let msgs = collect("asin,price\nA,1\nB\nC,3,x\nD,4\n", 10).await;
        assert_eq!(msgs.len(), 2);
        match &msgs[1] {
            WorkerMessage::Error(IngestError::Syntax(msg)) => {
                assert_eq!(msg.matches("found record with").count(), 2);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_completes_without_chunks() {
        let msgs = collect("", 10).await;
        assert_eq!(
            msgs,
            vec![
                WorkerMessage::Header(Arc::from(Vec::<String>::new())),
                WorkerMessage::Progress(100),
                WorkerMessage::Complete
            ]
        );
    }

    #[tokio::test]
    async fn header_goes_out_first() {
        let msgs = collect("asin,price\nA,1\n", 10).await;
        let expected: Arc<[String]> = Arc::from(vec!["asin".to_string(), "price".to_string()]);
        assert_eq!(msgs.first(), Some(&WorkerMessage::Header(expected)));
    }
}
