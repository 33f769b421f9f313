use crate::sweep::ParameterPoint;

/// One successful trial: the marker was found and the process exited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub cost: f64,
    pub latency_secs: f64,
}

/// Means over the successful trials of one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedRow {
    pub point: ParameterPoint,
    pub avg_cost: f64,
    pub avg_latency_secs: f64,
    pub trials: u32,
}

impl AggregatedRow {
    /// Render the value for a result column; `None` if this row has no such field.
    pub fn column(&self, name: &str) -> Option<String> {
        match (name, &self.point) {
            ("num_proc", ParameterPoint::Mult { num_processes }) => Some(num_processes.to_string()),
            ("num_jobs", ParameterPoint::Solo { num_jobs, .. }) => Some(num_jobs.to_string()),
            ("num_processors", ParameterPoint::Solo { num_processors, .. }) => {
                Some(num_processors.to_string())
            }
            ("cooling_method", ParameterPoint::Solo { cooling, .. }) => Some(cooling.to_string()),
            ("avg_final_cost" | "final_cost", _) => Some(self.avg_cost.to_string()),
            ("avg_exec_time" | "execution_time", _) => Some(self.avg_latency_secs.to_string()),
            _ => None,
        }
    }
}

/// Running sums for one point.
#[derive(Debug, Default)]
pub struct Aggregate {
    cost_sum: f64,
    latency_sum: f64,
    count: u32,
}

impl Aggregate {
    pub fn push(&mut self, sample: TrialResult) {
        self.cost_sum += sample.cost;
        self.latency_sum += sample.latency_secs;
        self.count += 1;
    }

    /// `None` when nothing succeeded; an empty set has no mean.
    pub fn finish(self, point: ParameterPoint) -> Option<AggregatedRow> {
        if self.count == 0 {
            return None;
        }
        let n = f64::from(self.count);
        Some(AggregatedRow {
            point,
            avg_cost: self.cost_sum / n,
            avg_latency_secs: self.latency_sum / n,
            trials: self.count,
        })
    }
}
