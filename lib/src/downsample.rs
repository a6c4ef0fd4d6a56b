//! Stride-based decimation of an append-only sample feed.
//!
//! Each call looks only at the samples after the caller's resume index and
//! keeps one representative per bucket: the sample whose *global* index is a
//! multiple of the density. Because the phase is taken from the global index,
//! chunked calls with a correctly advanced resume index yield the same points
//! as one call over the whole feed.
//!
//! With a non-integral density some buckets never receive a representative.
//! Those slots stay `None`; no fallback sample is chosen for them.

use serde::Serialize;

use crate::accessor::{Accessor, Schema};
use crate::array;
use crate::error::{Result, SamplingError};
use crate::sample::{Record, Sample};

/// A single plotted point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One X value with any number of Y values sharing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub x: f64,
    pub ys: Vec<f64>,
}

impl Row {
    /// `[x, y1, .., yn]`
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.ys.len() + 1);
        values.push(self.x);
        values.extend_from_slice(&self.ys);
        values
    }
}

/// The outcome of one downsample call.
///
/// Logically `floor((len - resume) / density)` slots, stored sparsely: only
/// buckets a sample landed on are kept, so memory follows the new window
/// rather than the slot count.
#[derive(Debug, Clone, PartialEq)]
pub struct Downsampled<T> {
    len: usize,
    written: Vec<(usize, T)>,
    /// Resume index for the next call. Points at the start of the trailing
    /// partial bucket so it is revisited once more samples arrive.
    pub next_resume: usize,
}

impl<T> Downsampled<T> {
    fn nothing(resume: usize) -> Self {
        Downsampled {
            len: 0,
            written: Vec::new(),
            next_resume: resume,
        }
    }

    /// Slot count, placeholders included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots left at their placeholder.
    pub fn placeholders(&self) -> usize {
        self.len - self.written.len()
    }

    /// Value in slot `bucket`; `None` for placeholders and out-of-range slots.
    pub fn slot(&self, bucket: usize) -> Option<&T> {
        self.written
            .binary_search_by_key(&bucket, |(b, _)| *b)
            .ok()
            .map(|i| &self.written[i].1)
    }

    /// Written slots with their bucket index, in bucket order.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, &T)> {
        self.written.iter().map(|(b, v)| (*b, v))
    }

    /// Written slots, in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.written.iter().map(|(_, v)| v)
    }

    /// Drops placeholders and returns the written values.
    pub fn into_points(self) -> Vec<T> {
        self.written.into_iter().map(|(_, v)| v).collect()
    }
}

impl Downsampled<Point> {
    /// Shifts every point's x by `-origin`, e.g. to plot time since start.
    pub fn rebase(&mut self, origin: f64) {
        array::transform_in_place(&mut self.written, |&(bucket, p)| {
            (
                bucket,
                Point {
                    x: p.x - origin,
                    y: p.y,
                },
            )
        });
    }
}

pub(crate) fn check_density(density: f64) -> Result<f64> {
    if density.is_finite() && density > 0.0 {
        Ok(density)
    } else {
        Err(SamplingError::InvalidDensity(density))
    }
}

/// Number of output slots for a window of `pending` new samples.
fn output_size(pending: usize, density: f64) -> usize {
    (pending as f64 / density).floor() as usize
}

/// Core decimation loop shared by every public entry point.
pub fn decimate<R, T>(
    samples: &[R],
    density: f64,
    resume: usize,
    mut project: impl FnMut(&R) -> Result<T>,
) -> Result<Downsampled<T>> {
    let density = check_density(density)?;
    let len = samples.len();
    let fresh = array::window(samples, resume.min(len), len)?;

    let size = output_size(fresh.len(), density);
    if size == 0 {
        tracing::trace!(len, resume, density, "not enough new samples");
        return Ok(Downsampled::nothing(resume));
    }

    let written = array::try_fold_left(
        fresh,
        |mut written: Vec<(usize, T)>, sample, i| {
            let phase = (resume + i) as f64 % density;
            if phase != 0.0 {
                return Ok(written);
            }
            let bucket = (i as f64 / density).floor() as usize;
            if bucket < size {
                written.push((bucket, project(sample)?));
            }
            Ok(written)
        },
        Vec::new(),
    )?;

    // Truncation is intended: a fractional remainder belongs to the bucket
    // that is already partially consumed.
    let remainder = (fresh.len() as f64 % density) as usize;
    let next_resume = len - remainder;

    tracing::debug!(
        len,
        resume,
        density,
        size,
        next_resume,
        "downsampled new samples"
    );
    Ok(Downsampled {
        len: size,
        written,
        next_resume,
    })
}

/// Downsamples `samples[resume..]` to `(x, y)` points using pre-resolved
/// accessors.
pub fn downsample_with<R: Record>(
    samples: &[R],
    density: f64,
    resume: usize,
    x: &Accessor,
    y: &Accessor,
) -> Result<Downsampled<Point>> {
    decimate(samples, density, resume, |s| {
        Ok(Point {
            x: x.project(s)?,
            y: y.project(s)?,
        })
    })
}

/// Like [`downsample_with`] but projects one X and several Y accessors into
/// [`Row`]s.
pub fn downsample_series_with<R: Record>(
    samples: &[R],
    density: f64,
    resume: usize,
    x: &Accessor,
    ys: &[Accessor],
) -> Result<Downsampled<Row>> {
    decimate(samples, density, resume, |s| {
        Ok(Row {
            x: x.project(s)?,
            ys: array::transform(ys, |y| y.project(s))
                .into_iter()
                .collect::<Result<_>>()?,
        })
    })
}

/// Downsamples the samples after `resume`, resolving accessor names against
/// the feed's own schema.
///
/// An empty feed has no schema and yields nothing.
pub fn downsample(
    samples: &[Sample],
    density: f64,
    resume: usize,
    x: &str,
    y: &str,
) -> Result<Downsampled<Point>> {
    check_density(density)?;
    if samples.is_empty() {
        return Ok(Downsampled::nothing(resume));
    }
    let schema = Schema::of(samples);
    downsample_with(
        samples,
        density,
        resume,
        &schema.resolve(x)?,
        &schema.resolve(y)?,
    )
}

/// Multi-series counterpart of [`downsample`].
pub fn downsample_series<S: AsRef<str>>(
    samples: &[Sample],
    density: f64,
    resume: usize,
    x: &str,
    ys: &[S],
) -> Result<Downsampled<Row>> {
    check_density(density)?;
    if samples.is_empty() {
        return Ok(Downsampled::nothing(resume));
    }
    let schema = Schema::of(samples);
    downsample_series_with(
        samples,
        density,
        resume,
        &schema.resolve(x)?,
        &schema.resolve_all(ys)?,
    )
}
