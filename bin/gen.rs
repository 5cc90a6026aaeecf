use clap::{Arg, Command};
use seller_ingest::Tool;
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic CSV export for one of the calculator tools")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(Arg::new("tool").long("tool").default_value("product-research"))
        .arg(
            Arg::new("bad_every")
                .long("bad-every")
                .help("Write an unparseable numeric cell every N rows")
                .value_parser(clap::value_parser!(u64)),
        )
        .get_matches();

    let rows: u64 = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let tool: Tool = matches
        .get_one::<String>("tool")
        .map(String::as_str)
        .unwrap_or("product-research")
        .parse()?;
    let bad_every = matches.get_one::<u64>("bad_every").copied();

    let mut out = io::BufWriter::new(io::stdout().lock());
    writeln!(&mut out, "{}", tool.columns().join(","))?;

    for i in 0..rows {
        let bad = bad_every.is_some_and(|n| n > 0 && i % n == n - 1);
        write_row(&mut out, tool, i, bad)?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}

// Deterministic values derived from the row index.
fn write_row(out: &mut impl Write, tool: Tool, i: u64, bad: bool) -> io::Result<()> {
    let price = if bad {
        "n/a".to_string()
    } else {
        format!("${}.{:02}", 5 + i % 95, i % 100)
    };
    match tool {
        Tool::ProductResearch => writeln!(
            out,
            "B{:09},{},{},{:.1},{:.2}%,{:.2}%,Brand{},\"kw{} kw{}\",niche{}",
            i,
            price,
            (i * 37) % 5000,
            3.0 + (i % 20) as f64 / 10.0,
            (i % 300) as f64 / 10.0,
            (i % 90) as f64 / 10.0,
            i % 50,
            i,
            i + 1,
            i % 12
        ),
        Tool::Profit => writeln!(
            out,
            "B{:09},{},${}.00,${}.50",
            i,
            price,
            2 + i % 20,
            1 + i % 5
        ),
        Tool::Acos => writeln!(
            out,
            "campaign{},${}.00,${}.00",
            i,
            10 + i % 90,
            40 + (i * 7) % 400
        ),
    }
}
