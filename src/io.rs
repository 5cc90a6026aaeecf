use crate::{IngestConfig, IngestError, IngestResult};
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::Transcoder;

#[derive(Debug, Clone)]
pub struct CsvMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// just the key/filename (used for extension fallback and display)
    pub name_hint: String,
    /// Which character encoding to expect (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for CsvMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl CsvMeta {
    pub fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    pub fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || ct == "application/zstd"
            || self.name_hint.ends_with(".zst")
    }

    pub fn is_compressed(&self) -> bool {
        self.is_gzip() || self.is_zstd()
    }
}

/// From a generic AsyncRead, wrap with optional decompression and UTF-8 transcoding.
/// Returns an AsyncRead suitable for csv_async plus the meta we used.
pub fn build_csv_reader<R>(raw: R, meta: CsvMeta) -> (impl AsyncRead + Unpin + Send, CsvMeta)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // Use a larger buffer for fewer syscalls (1 MiB)
    let buf = BufReader::with_capacity(1 << 20, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = if meta.is_gzip() {
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    };

    // transcode only when charset != UTF-8 to avoid extra copies
    let stream_reader: Box<dyn AsyncRead + Unpin + Send> = if meta.charset == encoding_rs::UTF_8 {
        Box::new(decompressed)
    } else {
        let framed = FramedRead::new(decompressed, Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    };

    (stream_reader, meta)
}

/// Lightweight meta from the file name and extension.
fn meta_from_path(path: &Path) -> CsvMeta {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut meta = CsvMeta {
        name_hint: name,
        ..Default::default()
    };

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match ext {
        "gz" => {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        }
        "zst" => {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        }
        _ => {
            meta.content_type = "text/csv".into();
        }
    }
    meta
}

/// A readable CSV handed to the parser worker.
pub struct IngestSource {
    pub(crate) reader: Box<dyn AsyncRead + Unpin + Send>,
    pub(crate) meta: CsvMeta,
    /// Bytes the tokenizer will see in total, when known.
    pub(crate) total_bytes: Option<u64>,
}

impl std::fmt::Debug for IngestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSource")
            .field("meta", &self.meta)
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

impl IngestSource {
    /// Opens a local file. Compressed files report no total: the tokenizer
    /// cursor counts decompressed bytes, so progress only lands at the end.
    pub async fn open(path: &Path) -> IngestResult<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        let meta = meta_from_path(path);
        let total = (!meta.is_compressed() && meta.charset == encoding_rs::UTF_8).then_some(len);
        Ok(Self::from_reader(file, meta, total))
    }

    pub fn from_reader<R>(raw: R, meta: CsvMeta, total_bytes: Option<u64>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (reader, meta) = build_csv_reader(raw, meta);
        Self {
            reader: Box::new(reader),
            meta,
            total_bytes,
        }
    }

    /// In-memory UTF-8 CSV.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let total = bytes.len() as u64;
        let meta = CsvMeta {
            content_type: "text/csv".into(),
            name_hint: name.into(),
            ..Default::default()
        };
        Self::from_reader(std::io::Cursor::new(bytes), meta, Some(total))
    }

    pub fn name(&self) -> &str {
        &self.meta.name_hint
    }

    pub fn meta(&self) -> &CsvMeta {
        &self.meta
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

/// Upload-surface checks: `.csv` only, at most `config.max_file_bytes`.
pub fn accept_upload(path: &Path, size: u64, config: &IngestConfig) -> IngestResult<()> {
    let is_csv = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(IngestError::Rejected(format!(
            "{} is not a .csv file",
            path.display()
        )));
    }
    if size > config.max_file_bytes {
        return Err(IngestError::Rejected(format!(
            "{} is {size} bytes, limit is {}",
            path.display(),
            config.max_file_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_compression_from_any_hint() {
        let by_name = CsvMeta {
            name_hint: "listings.csv.gz".into(),
            ..Default::default()
        };
        assert!(by_name.is_gzip());

        let by_encoding = CsvMeta {
            content_encoding: "br, ZSTD".into(),
            ..Default::default()
        };
        assert!(by_encoding.is_zstd());
        assert!(!CsvMeta::default().is_compressed());
    }

    #[test]
    fn upload_accepts_csv_under_limit() {
        let cfg = IngestConfig::default();
        assert!(accept_upload(Path::new("products.CSV"), 1024, &cfg).is_ok());
    }

    #[test]
    fn upload_rejects_other_types_and_large_files() {
        let cfg = IngestConfig::default().with_max_file_bytes(10);
        assert!(matches!(
            accept_upload(Path::new("products.xlsx"), 1, &cfg),
            Err(IngestError::Rejected(_))
        ));
        assert!(matches!(
            accept_upload(Path::new("products.csv"), 11, &cfg),
            Err(IngestError::Rejected(_))
        ));
    }
}
