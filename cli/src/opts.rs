use clap::Args;
use simtrace::{estimate_density, Schema};

#[derive(Args, Debug, Clone)]
pub struct SamplingOpts {
    /// Field plotted on the X axis
    #[clap(long, short = 'x', env = "SIMTRACE_X", default_value = "time")]
    pub x: String,

    /// Fields plotted on the Y axis, comma separated or repeated [default: every other field]
    #[clap(long = "y", short = 'y', env = "SIMTRACE_Y", value_delimiter = ',')]
    pub ys: Vec<String>,

    /// Samples collapsed into one point [default: estimated from --width]
    #[clap(long, env = "SIMTRACE_DENSITY")]
    pub density: Option<f64>,

    /// Plot width in pixels, used to estimate the density
    #[clap(long, env = "SIMTRACE_WIDTH", default_value_t = 800)]
    pub width: u32,
}

impl SamplingOpts {
    /// Y fields to plot: the explicit list, or every field but X.
    pub fn series(&self, schema: &Schema) -> Vec<String> {
        if !self.ys.is_empty() {
            return self.ys.clone();
        }
        schema
            .names()
            .iter()
            .filter(|n| **n != self.x)
            .cloned()
            .collect()
    }

    /// Density for a complete feed of `len` samples.
    pub fn density_for(&self, len: usize) -> f64 {
        self.density
            .unwrap_or_else(|| estimate_density(len, 100.0, self.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(ys: &[&str], density: Option<f64>) -> SamplingOpts {
        SamplingOpts {
            x: "time".to_string(),
            ys: ys.iter().map(|s| s.to_string()).collect(),
            density,
            width: 100,
        }
    }

    #[test]
    fn series_defaults_to_every_field_but_x() {
        let schema = Schema::new(["time", "V(1)", "I(V1)"]);
        assert_eq!(opts(&[], None).series(&schema), vec!["V(1)", "I(V1)"]);
        assert_eq!(opts(&["I(V1)"], None).series(&schema), vec!["I(V1)"]);
    }

    #[test]
    fn explicit_density_wins() {
        assert_eq!(opts(&[], Some(2.5)).density_for(1_000_000), 2.5);
        assert_eq!(opts(&[], None).density_for(5_000), 10.0);
    }
}
