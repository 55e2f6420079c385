//! argmin observer that reports optimization progress through `tracing`.

use argmin::core::observers::Observe;
use argmin::core::{State, KV};

/// Emits one `info` event per iteration, and a column header every
/// `header_interval` iterations for readable terminal output.
pub struct TracingObserver {
    header_interval: u64,
    last_header_iter: u64,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::with_header_interval(100)
    }

    pub fn with_header_interval(header_interval: u64) -> Self {
        Self {
            header_interval: header_interval.max(1),
            last_header_iter: 0,
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Observe<I> for TracingObserver
where
    I: State,
    <I as State>::Float: std::fmt::LowerExp,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), argmin::core::Error> {
        let iter = state.get_iter();
        if iter == 0 || iter - self.last_header_iter >= self.header_interval {
            tracing::info!("iteration | time (s) | objective | best objective | evaluations");
            self.last_header_iter = iter;
        }

        let time = state.get_time().map(|d| d.as_secs_f64()).unwrap_or(0.0);
        let evaluations = state
            .get_func_counts()
            .get("cost_count")
            .copied()
            .unwrap_or(0);
        tracing::info!(
            iteration = iter,
            time,
            objective = %format!("{:.6e}", state.get_cost()),
            best = %format!("{:.6e}", state.get_best_cost()),
            evaluations,
            "calibration progress"
        );
        Ok(())
    }
}
