use anyhow::{bail, Context};
use clap::{Arg, Command};
use seller_ingest::metrics::{acos, profitability, summarize};
use seller_ingest::{
    accept_upload, write_csv, Dataset, IngestConfig, IngestSource, IngestionController, Phase,
    Tool,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let matches = Command::new("ingest")
        .about("Validate and load a seller CSV export for a calculator tool")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("tool").long("tool").default_value("product-research").help("product-research, profit or acos"))
        .arg(Arg::new("chunk-rows").long("chunk-rows").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("max-bytes").long("max-bytes").help("Upload size ceiling (default 5 MiB)").value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("export").long("export").help("Write the normalized rows to this CSV").value_parser(clap::value_parser!(PathBuf)))
        .get_matches();

    let path = matches
        .get_one::<PathBuf>("path")
        .context("--path is required")?;
    let tool: Tool = matches
        .get_one::<String>("tool")
        .map(String::as_str)
        .unwrap_or("product-research")
        .parse()?;

    let mut config = IngestConfig::default();
    if let Some(rows) = matches.get_one::<usize>("chunk-rows") {
        config = config.with_chunk_rows(*rows);
    }
    if let Some(bytes) = matches.get_one::<u64>("max-bytes") {
        config = config.with_max_file_bytes(*bytes);
    }

    let size = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    accept_upload(path, size, &config)?;

    let start = Instant::now();
    let mut controller = IngestionController::new(Arc::new(tool.schema()?), config);
    controller.start(IngestSource::open(path).await?);

    let mut last = 0;
    while let Some(phase) = controller.recv().await {
        if phase == Phase::Parsing && controller.progress() >= last + 10 {
            last = controller.progress();
            info!(progress = last, rows = controller.rows_accumulated(), "parsing");
        }
    }

    let data = match controller.finish() {
        Ok(data) => data,
        Err(err) => bail!("{}: {err}", path.display()),
    };
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "source={} tool={} rows={}\nelapsed={:.2}s",
        path.display(),
        tool,
        data.len(),
        elapsed
    );
    report(tool, &data);

    if let Some(out) = matches.get_one::<PathBuf>("export") {
        let file = tokio::fs::File::create(out)
            .await
            .with_context(|| format!("cannot create {}", out.display()))?;
        write_csv(&data, file).await?;
        println!("exported={}", out.display());
    }
    Ok(())
}

fn report(tool: Tool, data: &Dataset) {
    match tool {
        Tool::ProductResearch => {
            for column in tool.numeric_columns() {
                if let Some(s) = summarize(data, column) {
                    println!(
                        "{column}: min={:.2} max={:.2} mean={:.2}",
                        s.min, s.max, s.mean
                    );
                }
            }
        }
        Tool::Profit => {
            let schema = data.schema();
            let margins: Vec<f64> = data
                .rows()
                .iter()
                .map(|r| {
                    let n = |c: &str| r.number(schema, c).unwrap_or_default();
                    profitability(n("price"), n("cost"), n("fees")).margin_pct
                })
                .collect();
            if !margins.is_empty() {
                let mean = margins.iter().sum::<f64>() / margins.len() as f64;
                println!("mean margin={mean:.2}%");
            }
        }
        Tool::Acos => {
            let spend: f64 = data.numbers("ad_spend").sum();
            let sales: f64 = data.numbers("ad_sales").sum();
            println!("spend={spend:.2} sales={sales:.2} acos={:.2}%", acos(spend, sales));
        }
    }
}
