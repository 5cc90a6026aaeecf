/// Tuning for one ingestion session.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Rows per `chunk` message.
    pub chunk_rows: usize,
    /// Bound of the worker -> controller channel.
    pub channel_capacity: usize,
    /// Internal tokenizer buffer (1 MiB reduces syscalls and allocator churn).
    pub buffer_capacity: usize,
    pub delimiter: u8,
    /// Trim whitespace around header names before validation.
    pub trim_headers: bool,
    /// Size ceiling enforced by [`crate::accept_upload`].
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_rows: 1000,
            channel_capacity: 32,
            buffer_capacity: 1 << 20,
            delimiter: b',',
            trim_headers: true,
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    pub fn with_chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = rows.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_trim_headers(mut self, trim: bool) -> Self {
        self.trim_headers = trim;
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }
}
