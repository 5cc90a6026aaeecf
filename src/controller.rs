//! Ingestion controller: the consuming side of the parser worker.
//!
//! One controller per calculator session. It owns the [`IngestionState`],
//! and is the only writer of the accumulated rows. Handlers run to
//! completion; the only await point is [`IngestionController::recv`].
use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::normalize::normalize;
use crate::row::{RawRow, TypedRow};
use crate::schema::{validate, RequiredSchema};
use crate::worker::{spawn_parser, Envelope, SessionId, WorkerMessage};
use crate::{IngestConfig, IngestError, IngestResult, IngestSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Parsing,
    Error,
    Complete,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionState {
    phase: Phase,
    progress: u8,
    rows: Vec<TypedRow>,
    error: Option<IngestError>,
    file_name: Option<String>,
    header: Option<Arc<[String]>>,
    header_checked: bool,
}

impl IngestionState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 0..=100, never decreasing within a session.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Only present in [`Phase::Error`].
    pub fn error(&self) -> Option<&IngestError> {
        self.error.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Normalized rows, exposed only once the session completed.
    pub fn rows(&self) -> Option<&[TypedRow]> {
        (self.phase == Phase::Complete).then_some(self.rows.as_slice())
    }

    /// Rows held so far, whatever the phase.
    pub fn rows_accumulated(&self) -> usize {
        self.rows.len()
    }
}

/// Rows of a completed session together with the schema they were typed by.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Arc<RequiredSchema>,
    rows: Vec<TypedRow>,
}

impl Dataset {
    pub fn new(schema: Arc<RequiredSchema>, rows: Vec<TypedRow>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &RequiredSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[TypedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Numeric values of `column`, skipping rows where it is absent or text.
    pub fn numbers<'a>(&'a self, column: &'a str) -> impl Iterator<Item = f64> + 'a {
        self.rows
            .iter()
            .filter_map(move |r| r.number(&self.schema, column))
    }
}

pub struct IngestionController {
    schema: Arc<RequiredSchema>,
    config: IngestConfig,
    state: IngestionState,
    session: SessionId,
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
    worker: Option<JoinHandle<()>>,
}

impl IngestionController {
    pub fn new(schema: Arc<RequiredSchema>, config: IngestConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            schema,
            config,
            state: IngestionState::default(),
            session: SessionId::default(),
            tx,
            rx,
            worker: None,
        }
    }

    pub fn state(&self) -> &IngestionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn progress(&self) -> u8 {
        self.state.progress
    }

    pub fn error(&self) -> Option<&IngestError> {
        self.state.error()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.state.file_name()
    }

    pub fn dataset(&self) -> Option<&[TypedRow]> {
        self.state.rows()
    }

    pub fn rows_accumulated(&self) -> usize {
        self.state.rows_accumulated()
    }

    pub fn schema(&self) -> &Arc<RequiredSchema> {
        &self.schema
    }

    /// Current session; envelopes tagged otherwise are dropped.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Resets state and hands `source` to a fresh worker. Any previous worker
    /// is aborted and its in-flight messages are ignored from now on.
    pub fn start(&mut self, source: IngestSource) -> SessionId {
        self.stop_worker();
        self.session = self.session.next();
        self.state = IngestionState {
            phase: Phase::Parsing,
            file_name: Some(source.name().to_string()),
            ..Default::default()
        };
        info!(session = %self.session, file = source.name(), "ingestion started");
        self.worker = Some(spawn_parser(
            self.session,
            source,
            &self.config,
            self.tx.clone(),
        ));
        self.session
    }

    /// Applies one worker message. Returns `false` when it was dropped as
    /// stale or arrived after the session ended.
    pub fn handle(&mut self, envelope: Envelope) -> bool {
        if envelope.session != self.session {
            debug!(from = %envelope.session, current = %self.session, "dropping stale message");
            return false;
        }
        if self.state.phase != Phase::Parsing {
            return false;
        }
        match envelope.message {
            WorkerMessage::Header(columns) => self.on_header(columns),
            WorkerMessage::Chunk(rows) => self.on_chunk(rows),
            WorkerMessage::Progress(p) => self.on_progress(p),
            WorkerMessage::Error(err) => self.on_error(err),
            WorkerMessage::Complete => self.on_complete(),
        }
        true
    }

    /// Remembers the file's header for files that turn out to have no rows.
    pub fn on_header(&mut self, columns: Arc<[String]>) {
        if self.state.phase != Phase::Parsing {
            return;
        }
        self.state.header = Some(columns);
    }

    pub fn on_chunk(&mut self, rows: Vec<RawRow>) {
        if self.state.phase != Phase::Parsing {
            return;
        }
        if !self.state.header_checked {
            self.state.header_checked = true;
            let header: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys()).collect();
            if let Err(err) = validate(header, &self.schema).into_result() {
                self.fail(err);
                return;
            }
        }
        let schema = &self.schema;
        self.state
            .rows
            .extend(rows.iter().map(|r| normalize(r, schema)));
    }

    /// Clamped to `[previous, 100]` so late messages never move it back.
    pub fn on_progress(&mut self, value: u8) {
        if self.state.phase != Phase::Parsing {
            return;
        }
        self.state.progress = value.clamp(self.state.progress, 100);
    }

    pub fn on_error(&mut self, err: IngestError) {
        if self.state.phase != Phase::Parsing {
            return;
        }
        self.fail(err);
    }

    pub fn on_complete(&mut self) {
        if self.state.phase != Phase::Parsing {
            return;
        }
        // no rows: check the header line itself, or nothing if there was none
        if !self.state.header_checked {
            self.state.header_checked = true;
            let header = self.state.header.as_deref().unwrap_or_default();
            if let Err(err) = validate(header, &self.schema).into_result() {
                self.fail(err);
                return;
            }
        }
        info!(
            session = %self.session,
            rows = self.state.rows.len(),
            "ingestion complete"
        );
        self.state.phase = Phase::Complete;
        self.worker = None;
    }

    /// Back to `Idle`, dropping rows and error. No-op when already idle.
    pub fn clear(&mut self) {
        self.stop_worker();
        self.state = IngestionState::default();
    }

    /// Waits for the next message of the running session and applies it.
    /// Returns `None` once the session is not parsing.
    pub async fn recv(&mut self) -> Option<Phase> {
        while self.state.phase == Phase::Parsing {
            let envelope = self.rx.recv().await?;
            if self.handle(envelope) {
                return Some(self.state.phase);
            }
        }
        None
    }

    /// Drives the session until it completes or fails. A stalled source keeps
    /// this pending; there is no timeout.
    pub async fn run_to_end(&mut self) -> &IngestionState {
        while self.recv().await.is_some() {}
        &self.state
    }

    /// Takes the outcome of a finished session, leaving the controller idle.
    pub fn finish(&mut self) -> IngestResult<Dataset> {
        let state = std::mem::take(&mut self.state);
        self.stop_worker();
        match state.phase {
            Phase::Complete => Ok(Dataset::new(self.schema.clone(), state.rows)),
            Phase::Error => Err(state.error.unwrap_or(IngestError::Unfinished)),
            Phase::Idle | Phase::Parsing => Err(IngestError::Unfinished),
        }
    }

    fn fail(&mut self, err: IngestError) {
        warn!(session = %self.session, error = %err, "ingestion failed");
        self.state.phase = Phase::Error;
        self.state.error = Some(err);
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.abort();
        }
    }
}

impl Drop for IngestionController {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// Runs one ingestion session for `source` to its end.
pub async fn ingest(
    source: IngestSource,
    schema: Arc<RequiredSchema>,
    config: IngestConfig,
) -> IngestResult<Dataset> {
    let mut controller = IngestionController::new(schema, config);
    controller.start(source);
    controller.run_to_end().await;
    controller.finish()
}
