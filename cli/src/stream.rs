use clap::Args;
use duration_string::DurationString;
use eyre::Result;
use simtrace::{report_text, PlotState, Row, Sample, Schema, Simulation, SimulationStatus, Summary};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::io::{sources, Input, Output};
use crate::opts::SamplingOpts;

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub sampling: SamplingOpts,

    /// Interval between incremental redraws (e.g. "100ms", "1s")
    #[clap(long, env = "SIMTRACE_EVERY", default_value = "300ms")]
    pub every: DurationString,

    /// Expected number of samples, used to report progress [default: unknown]
    #[clap(long, env = "SIMTRACE_TOTAL")]
    pub total: Option<usize>,

    /// Output file for new rows, one JSON array per line [default: stdout]
    #[clap(long, env = "SIMTRACE_OUTPUT", default_value = "stdout")]
    pub output: String,

    /// Print a summary to stderr once the input ends
    #[clap(long)]
    pub summary: bool,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

/// Progress for `len` received samples. Without a known total every redraw
/// treats the feed as complete so far.
fn status_for(len: usize, total: Option<usize>) -> SimulationStatus {
    match total {
        Some(total) if total > 0 && len < total => {
            SimulationStatus::progress(Simulation::Transient, 100.0 * len as f64 / total as f64)
        }
        _ => SimulationStatus::ready(),
    }
}

async fn emit(rows: &[Row], output: &mut Output) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut buf = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buf, &row.values())?;
        buf.push(b'\n');
    }
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}

async fn redraw(state: &mut PlotState, total: Option<usize>, output: &mut Output) -> Result<()> {
    let len = state.samples().len();
    let status = status_for(len, total);
    let fresh = state.update(&status)?;
    tracing::debug!(
        samples = len,
        new_rows = fresh.len(),
        completion = status.completion(),
        "redraw"
    );
    emit(fresh, output).await
}

/// Builds the plot state from the first sample. An explicit density is
/// pinned for the whole stream; otherwise it follows the reported progress.
fn start(sampling: &SamplingOpts, first: Sample, total: Option<usize>) -> Result<PlotState> {
    let series = sampling.series(&Schema::of(std::slice::from_ref(&first)));
    let mut state = PlotState::derive(
        vec![first],
        &status_for(1, total),
        sampling.width,
        sampling.x.clone(),
        series,
    )?;
    if let Some(density) = sampling.density {
        state.fix_density(density)?;
    }
    Ok(state)
}

/// Decodes every source in order and forwards samples until the receiver
/// goes away.
async fn read_into(files: Vec<String>, tx: mpsc::Sender<Sample>) -> Result<()> {
    for source in sources(&files) {
        let mut input = Input::from_filename(&source).await?;
        let Some(format) = input.detect_format().await? else {
            continue;
        };
        let mut codec = format.codec();
        while let Some(sample) = codec.decode(&mut input).await? {
            if tx.send(sample).await.is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

pub async fn stream(opts: &Opts) -> Result<()> {
    let interval_dur: std::time::Duration = opts.every.into();
    let mut ticker = tokio::time::interval(interval_dur);
    ticker.tick().await; // consume the immediate first tick

    let mut output = Output::from_filename(&opts.output).await?;
    let (tx, mut rx) = mpsc::channel(1024);
    let reader = tokio::spawn(read_into(opts.files.clone(), tx));
    let mut state: Option<PlotState> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(state) = state.as_mut() {
                    redraw(state, opts.total, &mut output).await?;
                }
            }
            received = rx.recv() => {
                let Some(sample) = received else {
                    break;
                };
                match state.as_mut() {
                    Some(state) => state.push([sample]),
                    None => {
                        state = Some(start(&opts.sampling, sample, opts.total)?);
                    }
                }
            }
        }
    }
    reader.await??;

    let Some(mut state) = state else {
        eyre::bail!("no samples received");
    };
    // Final redraw for samples that arrived after the last tick.
    let fresh = state.update(&SimulationStatus::ready())?;
    emit(fresh, &mut output).await?;

    if opts.summary {
        let mut buf = Vec::new();
        report_text(&Summary::of(&state), &mut buf)?;
        let mut stderr = tokio::io::stderr();
        stderr.write_all(&buf).await?;
        stderr.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Sample {
        Sample::from_pairs(i as i32, [("time", i as f64), ("V(1)", 1.0)])
    }

    fn sampling(density: Option<f64>) -> SamplingOpts {
        SamplingOpts {
            x: "time".into(),
            ys: Vec::new(),
            density,
            width: 100,
        }
    }

    #[test]
    fn explicit_density_is_kept_across_updates() {
        let mut state = start(&sampling(Some(4.0)), sample(0), None).unwrap();
        assert_eq!(state.density(), 4.0);
        assert_eq!(state.series_names(), &["V(1)".to_string()]);

        state.push((1..10).map(sample));
        let xs: Vec<f64> = state
            .update(&status_for(10, None))
            .unwrap()
            .iter()
            .map(|r| r.x)
            .collect();
        assert_eq!(xs, vec![0.0, 4.0]);
        assert_eq!(state.density(), 4.0);
    }

    #[test]
    fn density_is_estimated_without_flag() {
        let opts = SamplingOpts {
            width: 1,
            ..sampling(None)
        };
        let mut state = start(&opts, sample(0), Some(40)).unwrap();
        state.push((1..10).map(sample));
        state.update(&status_for(10, Some(40))).unwrap();
        // 10 samples at 25% -> 40 projected over 1px * 5
        assert_eq!(state.density(), 8.0);
    }

    #[test]
    fn unknown_total_is_ready() {
        assert_eq!(status_for(10, None).completion(), 100.0);
        assert_eq!(status_for(10, Some(0)).completion(), 100.0);
    }

    #[test]
    fn known_total_reports_progress() {
        assert_eq!(status_for(25, Some(100)).completion(), 25.0);
        assert!(status_for(25, Some(100)).is_in_progress());
        assert_eq!(status_for(150, Some(100)).completion(), 100.0);
    }
}
