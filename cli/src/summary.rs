use clap::Args;
use eyre::Result;
use simtrace::{PlotState, Schema, SimulationStatus, Summary};
use tokio::io::AsyncWriteExt;

use crate::io::{read_samples, Output};
use crate::opts::SamplingOpts;

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub sampling: SamplingOpts,

    /// Report type (text, json)
    #[clap(long = "type", default_value = "text")]
    pub report_type: String,

    /// Output file [default: stdout]
    #[clap(long, env = "SIMTRACE_OUTPUT", default_value = "stdout")]
    pub output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn summary(opts: &Opts) -> Result<()> {
    let samples = read_samples(&opts.files).await?;
    let series = opts.sampling.series(&Schema::of(&samples));
    let mut state = PlotState::derive(
        samples,
        &SimulationStatus::ready(),
        opts.sampling.width,
        opts.sampling.x.clone(),
        series,
    )?;
    if let Some(density) = opts.sampling.density {
        state.fix_density(density)?;
    }

    let summary = Summary::of(&state);
    let mut buf = Vec::new();
    match opts.report_type.as_str() {
        "text" => simtrace::report_text(&summary, &mut buf)?,
        "json" => simtrace::report_json(&summary, &mut buf)?,
        other => eyre::bail!("unknown report type: {}", other),
    }

    let mut output = Output::from_filename(&opts.output).await?;
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}
