use std::collections::BTreeSet;

use csv_async::AsyncWriterBuilder;
use tokio::io::AsyncWrite;

use crate::row::Cell;
use crate::{Dataset, IngestResult};

/// Writes `data` back out as CSV: required columns first, in schema order,
/// then every extra column seen in any row, sorted. Absent cells are empty.
pub async fn write_csv<W>(data: &Dataset, writer: W) -> IngestResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let schema = data.schema();
    let extra: BTreeSet<&str> = data
        .rows()
        .iter()
        .flat_map(|r| r.extra().keys().map(String::as_str))
        .collect();

    let mut wtr = AsyncWriterBuilder::new().create_writer(writer);
    let header: Vec<&str> = schema
        .columns()
        .iter()
        .map(String::as_str)
        .chain(extra.iter().copied())
        .collect();
    wtr.write_record(&header).await?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for row in data.rows() {
        record.clear();
        record.extend(
            row.required()
                .iter()
                .map(|c| c.as_ref().map(Cell::to_string).unwrap_or_default()),
        );
        record.extend(
            extra
                .iter()
                .map(|name| row.extra().get(*name).map(Cell::to_string).unwrap_or_default()),
        );
        wtr.write_record(&record).await?;
    }
    wtr.flush().await?;
    Ok(())
}
