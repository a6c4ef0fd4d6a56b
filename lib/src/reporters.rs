use std::io::Write;

use serde::Serialize;
use tabwriter::TabWriter;

use crate::accessor::Schema;
use crate::array;
use crate::downsample::Row;
use crate::viewer::PlotState;

/// Snapshot of a plot's progress, for logs and the `summary` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub fields: Vec<String>,
    pub x: String,
    pub series: Vec<String>,
    pub completion: f64,
    pub estimated_total: f64,
    pub density: f64,
    pub resume: usize,
    pub rows: usize,
    pub first_x: Option<f64>,
    pub last_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_y: Option<f64>,
}

impl Summary {
    pub fn of(state: &PlotState) -> Self {
        let (min_y, max_y) = y_range(state.rows()).unzip();
        Summary {
            samples: state.samples().len(),
            fields: Schema::of(state.samples()).names().to_vec(),
            x: state.x_name().to_string(),
            series: state.series_names().to_vec(),
            completion: state.completion(),
            estimated_total: state.estimated_total(),
            density: state.density(),
            resume: state.resume(),
            rows: state.rows().len(),
            first_x: state.rows().first().map(|r| r.x),
            last_x: state.rows().last().map(|r| r.x),
            min_y,
            max_y,
        }
    }

    /// Fraction of raw samples that made it into the plot.
    pub fn ratio(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.rows as f64 / self.samples as f64
        }
    }
}

/// Smallest and largest Y across every series of the rendered rows.
fn y_range(rows: &[Row]) -> Option<(f64, f64)> {
    array::fold_left(
        rows,
        |range, row, _| {
            row.ys.iter().fold(range, |range, &y| match range {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
        },
        None,
    )
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string())
}

pub fn report_text(s: &Summary, w: &mut dyn Write) -> eyre::Result<()> {
    let mut tw = TabWriter::new(w);

    write!(
        tw,
        "Samples\t[total, estimated]\t{}, {:.0}\n\
         Progress\t[completion]\t{:.2}%\n\
         Sampling\t[density, resume]\t{}, {}\n\
         Rows\t[total, ratio]\t{}, {:.4}\n\
         Range\t[first, last]\t{}, {}\n\
         Values\t[min, max]\t{}, {}\n\
         Axes\t[x: series]\t{}: {}\n\
         Fields\t\t{}\n",
        s.samples,
        s.estimated_total,
        s.completion,
        s.density,
        s.resume,
        s.rows,
        s.ratio(),
        fmt_opt(s.first_x),
        fmt_opt(s.last_x),
        fmt_opt(s.min_y),
        fmt_opt(s.max_y),
        s.x,
        s.series.join(", "),
        s.fields.join(", "),
    )?;

    tw.flush()?;
    Ok(())
}

pub fn report_json(s: &Summary, w: &mut dyn Write) -> eyre::Result<()> {
    serde_json::to_writer(&mut *w, s)?;
    w.write_all(b"\n")?;
    Ok(())
}
