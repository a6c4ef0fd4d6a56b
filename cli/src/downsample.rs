use clap::Args;
use eyre::Result;
use serde_json::json;
use simtrace::{downsample_series, Downsampled, Row, Schema};
use tokio::io::AsyncWriteExt;

use crate::io::{read_samples, Format, Output};
use crate::opts::SamplingOpts;

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub sampling: SamplingOpts,

    /// Index of the first sample not yet rendered
    #[clap(long, default_value_t = 0)]
    pub resume: usize,

    /// Output encoding (json, csv)
    #[clap(long, env = "SIMTRACE_TO", default_value = "json")]
    pub to: String,

    /// Output file [default: stdout]
    #[clap(long, env = "SIMTRACE_OUTPUT", default_value = "stdout")]
    pub output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn downsample(opts: &Opts) -> Result<()> {
    let format = Format::parse(&opts.to)?;
    let samples = read_samples(&opts.files).await?;
    let schema = Schema::of(&samples);
    let series = opts.sampling.series(&schema);
    let density = opts.sampling.density_for(samples.len());

    let result = downsample_series(&samples, density, opts.resume, &opts.sampling.x, &series)?;
    tracing::info!(
        samples = samples.len(),
        density,
        points = result.len(),
        placeholders = result.placeholders(),
        next_resume = result.next_resume,
        "downsampled"
    );

    let mut columns = vec![opts.sampling.x.clone()];
    columns.extend(series);
    let buf = render(format, &columns, &result, density)?;

    let mut output = Output::from_filename(&opts.output).await?;
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}

/// Encodes downsampled rows. JSON lists only written buckets by position;
/// CSV has a header of `columns` and one record per written row.
fn render(
    format: Format,
    columns: &[String],
    result: &Downsampled<Row>,
    density: f64,
) -> Result<Vec<u8>> {
    match format {
        Format::Json => {
            let rows: Vec<_> = result
                .buckets()
                .map(|(bucket, row)| json!({ "bucket": bucket, "values": row.values() }))
                .collect();
            let doc = json!({
                "columns": columns,
                "density": density,
                "size": result.len(),
                "next_resume": result.next_resume,
                "rows": rows,
            });
            let mut buf = serde_json::to_vec(&doc)?;
            buf.push(b'\n');
            Ok(buf)
        }
        Format::Csv => {
            let mut w = csv::Writer::from_writer(Vec::new());
            w.write_record(columns)?;
            for row in result.iter() {
                w.write_record(row.values().iter().map(f64::to_string))?;
            }
            Ok(w.into_inner().map_err(|e| e.into_error())?)
        }
    }
}
