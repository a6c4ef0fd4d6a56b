//! Caller-side state for a live trace plot.
//!
//! The downsampler itself is stateless; `PlotState` is the piece that owns
//! the growing sample buffer, the rendered rows and the resume index, and
//! advances them together.

use crate::accessor::{Accessor, Schema};
use crate::downsample::{check_density, downsample_series_with, Row};
use crate::error::Result;
use crate::sample::Sample;
use crate::status::{
    estimate_density, estimate_total_points, SimulationStatus, POINTS_PER_PIXEL,
};

#[derive(Debug, Clone)]
struct Resolved {
    x: Accessor,
    series: Vec<Accessor>,
}

#[derive(Debug, Clone)]
pub struct PlotState {
    samples: Vec<Sample>,
    x_name: String,
    series_names: Vec<String>,
    resolved: Option<Resolved>,
    width: u32,
    completion: f64,
    estimated_total: f64,
    density: f64,
    fixed_density: Option<f64>,
    resume: usize,
    rows: Vec<Row>,
}

impl PlotState {
    /// Builds the initial state and downsamples whatever is already buffered.
    pub fn derive(
        samples: Vec<Sample>,
        status: &SimulationStatus,
        width: u32,
        x: impl Into<String>,
        series: Vec<String>,
    ) -> Result<Self> {
        let completion = status.completion();
        let mut state = PlotState {
            estimated_total: estimate_total_points(samples.len(), completion),
            density: estimate_density(samples.len(), completion, width),
            samples,
            x_name: x.into(),
            series_names: series,
            resolved: None,
            width,
            completion,
            fixed_density: None,
            resume: 0,
            rows: Vec::new(),
        };
        state.redraw()?;
        Ok(state)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn resume(&self) -> usize {
        self.resume
    }

    pub fn completion(&self) -> f64 {
        self.completion
    }

    pub fn estimated_total(&self) -> f64 {
        self.estimated_total
    }

    pub fn x_name(&self) -> &str {
        &self.x_name
    }

    pub fn series_names(&self) -> &[String] {
        &self.series_names
    }

    /// Appends newly arrived samples to the buffer. Nothing is rendered
    /// until the next [`PlotState::update`].
    pub fn push(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.samples.extend(samples);
    }

    /// Pins the density instead of estimating it from completion, and
    /// redraws from the first sample.
    pub fn fix_density(&mut self, density: f64) -> Result<()> {
        check_density(density)?;
        self.fixed_density = Some(density);
        self.density = density;
        self.redraw()
    }

    /// Re-estimates density from `status` and downsamples only the samples
    /// past the resume index. Returns the rows appended by this call.
    ///
    /// On error the state is left as it was before the call.
    pub fn update(&mut self, status: &SimulationStatus) -> Result<&[Row]> {
        let len = self.samples.len();
        let completion = status.completion();
        let density = self
            .fixed_density
            .unwrap_or_else(|| estimate_density(len, completion, self.width));

        let before = self.rows.len();
        if self.resolve()? {
            self.downsample_pending(density)?;
        }
        self.completion = completion;
        self.estimated_total = estimate_total_points(len, completion);
        self.density = density;
        Ok(&self.rows[before..])
    }

    /// Switches accessors and redraws from the first sample at the current
    /// density.
    pub fn set_accessors(&mut self, x: impl Into<String>, series: Vec<String>) -> Result<()> {
        self.x_name = x.into();
        self.series_names = series;
        self.resolved = None;
        self.redraw()
    }

    /// Re-downsamples the raw samples with x in `[x1, x2]` at a density
    /// fitted to the plot width, and splices them over the rendered rows in
    /// that range. Returns `false` when the range is too sparse to need it.
    pub fn zoom(&mut self, x1: f64, x2: f64) -> Result<bool> {
        if !self.resolve()? {
            return Ok(false);
        }
        let Some(r) = &self.resolved else {
            return Ok(false);
        };

        let x_at = |i: usize| r.x.project(&self.samples[i]);
        let start = lower_bound(self.samples.len(), x1, x_at)?;
        let end = lower_bound(self.samples.len(), x2, x_at)?;
        let capacity = (self.width.max(1) * POINTS_PER_PIXEL) as f64;
        let density = (end.saturating_sub(start) as f64 / capacity).floor();
        if density <= 0.0 {
            return Ok(false);
        }

        let slice = &self.samples[start..(end + 1).min(self.samples.len())];
        let zoomed = downsample_series_with(slice, density, 0, &r.x, &r.series)?.into_points();

        let rows_start = self.rows.partition_point(|row| row.x < x1);
        let rows_end = self.rows.partition_point(|row| row.x <= x2).max(rows_start);
        tracing::debug!(
            x1,
            x2,
            start,
            end,
            density,
            replaced = rows_end - rows_start,
            inserted = zoomed.len(),
            "zoomed"
        );
        self.rows.splice(rows_start..rows_end, zoomed);
        Ok(true)
    }

    /// Resolves accessor names once a schema is available. Returns whether
    /// accessors are resolved.
    fn resolve(&mut self) -> Result<bool> {
        if self.resolved.is_some() {
            return Ok(true);
        }
        let schema = Schema::of(&self.samples);
        if schema.is_empty() {
            return Ok(false);
        }
        self.resolved = Some(Resolved {
            x: schema.resolve(&self.x_name)?,
            series: schema.resolve_all(&self.series_names)?,
        });
        Ok(true)
    }

    fn redraw(&mut self) -> Result<()> {
        self.rows.clear();
        self.resume = 0;
        if self.resolve()? {
            self.downsample_pending(self.density)?;
        }
        Ok(())
    }

    /// Appends rows for samples past the resume index. Nothing is mutated
    /// when downsampling fails.
    fn downsample_pending(&mut self, density: f64) -> Result<()> {
        if let Some(r) = &self.resolved {
            let fresh =
                downsample_series_with(&self.samples, density, self.resume, &r.x, &r.series)?;
            self.resume = fresh.next_resume;
            self.rows.extend(fresh.into_points());
        }
        Ok(())
    }
}

/// First index whose key is not less than `needle`. Keys must be
/// non-decreasing.
fn lower_bound(
    len: usize,
    needle: f64,
    key: impl Fn(usize) -> Result<f64>,
) -> Result<usize> {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key(mid)? < needle {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamplingError;
    use crate::status::Simulation;

    fn feed(range: std::ops::Range<usize>) -> Vec<Sample> {
        range
            .map(|i| Sample::from_pairs(i as i32, [("time", i as f64), ("V(1)", (i % 7) as f64)]))
            .collect()
    }

    fn progress(p: f64) -> SimulationStatus {
        SimulationStatus::progress(Simulation::Transient, p)
    }

    fn plot(samples: Vec<Sample>, status: &SimulationStatus, width: u32) -> Result<PlotState> {
        PlotState::derive(samples, status, width, "time", vec!["V(1)".into()])
    }

    #[test]
    fn derive_on_empty_feed_renders_nothing() {
        let state = plot(Vec::new(), &progress(0.0), 100).unwrap();
        assert!(state.rows().is_empty());
        assert_eq!(state.resume(), 0);
        assert_eq!(state.density(), 1.0);
    }

    #[test]
    fn derive_downsamples_buffered_samples() {
        // 2_000 samples at 50% -> 4_000 projected over 100px * 5 -> density 8
        let state = plot(feed(0..2_000), &progress(50.0), 100).unwrap();
        assert_eq!(state.density(), 8.0);
        assert_eq!(state.estimated_total(), 4_000.0);
        assert_eq!(state.rows().len(), 250);
        assert_eq!(state.rows()[1].x, 8.0);
        assert_eq!(state.resume(), 2_000);
    }

    #[test]
    fn update_appends_only_new_rows() {
        let mut state = plot(feed(0..10), &progress(100.0), 100).unwrap();
        assert_eq!(state.rows().len(), 10);

        // nothing new
        assert!(state.update(&progress(100.0)).unwrap().is_empty());

        state.push(feed(10..15));
        let fresh: Vec<f64> = state
            .update(&progress(100.0))
            .unwrap()
            .iter()
            .map(|r| r.x)
            .collect();
        assert_eq!(fresh, vec![10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(state.rows().len(), 15);
        assert_eq!(state.resume(), 15);
    }

    #[test]
    fn failed_update_leaves_state_untouched() {
        // 10 samples at 50% over 1px -> density 4, rows at 0 and 4, resume 8
        let mut state = plot(feed(0..10), &progress(50.0), 1).unwrap();
        assert_eq!(state.density(), 4.0);
        assert_eq!(state.resume(), 8);
        assert_eq!(state.rows().len(), 2);

        // at 100% density drops to 2 and sample 10 becomes a representative
        state.push([Sample::from_pairs(10, [("time", 10.0)])]);
        state.push(feed(11..12));
        let err = state.update(&progress(100.0)).unwrap_err();
        assert_eq!(err, SamplingError::UnknownAccessor("V(1)".into()));

        assert_eq!(state.density(), 4.0);
        assert_eq!(state.completion(), 50.0);
        assert_eq!(state.estimated_total(), 20.0);
        assert_eq!(state.resume(), 8);
        assert_eq!(state.rows().len(), 2);
    }

    #[test]
    fn fixed_density_overrides_estimate() {
        let mut state = plot(feed(0..2_000), &progress(50.0), 100).unwrap();
        assert_eq!(state.density(), 8.0);

        state.fix_density(100.0).unwrap();
        assert_eq!(state.density(), 100.0);
        assert_eq!(state.rows().len(), 20);

        state.push(feed(2_000..2_100));
        assert_eq!(state.update(&progress(100.0)).unwrap().len(), 1);
        assert_eq!(state.density(), 100.0);
        assert_eq!(state.completion(), 100.0);
        assert_eq!(state.resume(), 2_100);
    }

    #[test]
    fn fixed_density_must_be_positive() {
        let mut state = plot(feed(0..10), &progress(100.0), 100).unwrap();
        assert_eq!(state.fix_density(0.0), Err(SamplingError::InvalidDensity(0.0)));
        assert_eq!(state.density(), 1.0);
        assert_eq!(state.rows().len(), 10);
    }

    #[test]
    fn accessors_resolve_once_samples_arrive() {
        let mut state = plot(Vec::new(), &progress(0.0), 100).unwrap();
        state.push(feed(0..3));
        assert_eq!(state.update(&progress(10.0)).unwrap().len(), 3);
    }

    #[test]
    fn unknown_series_is_reported() {
        let err = PlotState::derive(feed(0..5), &progress(100.0), 100, "time", vec!["V(9)".into()])
            .unwrap_err();
        assert_eq!(err, SamplingError::UnknownAccessor("V(9)".into()));
    }

    #[test]
    fn set_accessors_redraws_from_start() {
        let mut state = plot(feed(0..6), &SimulationStatus::ready(), 100).unwrap();
        state.set_accessors("V(1)", vec!["time".into()]).unwrap();
        assert_eq!(state.x_name(), "V(1)");
        assert_eq!(state.rows().len(), 6);
        assert_eq!(state.rows()[3].values(), vec![3.0, 3.0]);
        assert_eq!(state.rows()[2].ys, vec![2.0]);
    }

    #[test]
    fn zoom_refines_rows_inside_range() {
        // 20_000 samples over 10px -> density 400 -> 50 rows, one every 400
        let mut state = plot(feed(0..20_000), &SimulationStatus::ready(), 10).unwrap();
        assert_eq!(state.rows().len(), 50);

        // 1_000 samples between 4_000 and 5_000 -> density 20 -> 50 zoomed rows
        assert!(state.zoom(4_000.0, 5_000.0).unwrap());
        let xs: Vec<f64> = state.rows().iter().map(|r| r.x).collect();
        assert_eq!(xs.len(), 10 + 50 + 37);
        assert_eq!(xs[9], 3_600.0);
        assert_eq!(xs[10], 4_000.0);
        assert_eq!(xs[11], 4_020.0);
        assert_eq!(xs[59], 4_980.0);
        assert_eq!(xs[60], 5_200.0);
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zoom_into_sparse_range_is_a_no_op() {
        let mut state = plot(feed(0..100), &SimulationStatus::ready(), 100).unwrap();
        let before = state.rows().to_vec();
        assert!(!state.zoom(10.0, 20.0).unwrap());
        assert_eq!(state.rows(), &before[..]);
    }
}
