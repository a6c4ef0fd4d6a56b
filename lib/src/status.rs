use serde::{Deserialize, Serialize};

/// Analysis kind reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Simulation {
    #[serde(rename = "tran")]
    Transient,
    #[serde(rename = "op")]
    OperatingPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Status {
    SourceDeck,
    Ready,
    Progress {
        simulation_name: Simulation,
        progress: f64,
    },
}

// SimulationStatus is the progress notification sent alongside sample batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    #[serde(default)]
    pub id: String,
    pub status: Status,
}

impl SimulationStatus {
    pub fn progress(simulation_name: Simulation, progress: f64) -> Self {
        SimulationStatus {
            id: String::new(),
            status: Status::Progress {
                simulation_name,
                progress,
            },
        }
    }

    pub fn ready() -> Self {
        SimulationStatus {
            id: String::new(),
            status: Status::Ready,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, Status::Progress { .. })
    }

    /// Completion percentage in `[0, 100]`.
    pub fn completion(&self) -> f64 {
        match self.status {
            Status::Progress { progress, .. } => progress.clamp(0.0, 100.0),
            Status::Ready => 100.0,
            Status::SourceDeck => 0.0,
        }
    }
}

/// Points drawn per horizontal pixel.
pub const POINTS_PER_PIXEL: u32 = 5;

/// Extrapolates the final feed length from what has arrived so far.
/// Returns 0 until any progress has been reported.
pub fn estimate_total_points(len: usize, completion: f64) -> f64 {
    if completion > 0.0 {
        100.0 * len as f64 / completion
    } else {
        0.0
    }
}

/// Samples per output point so the finished trace fits `width` pixels.
/// Never below 1.
pub fn estimate_density(len: usize, completion: f64, width: u32) -> f64 {
    let capacity = (width.max(1) * POINTS_PER_PIXEL) as f64;
    (estimate_total_points(len, completion) / capacity)
        .floor()
        .max(1.0)
}
