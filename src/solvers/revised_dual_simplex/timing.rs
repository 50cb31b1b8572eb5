use std::time::{Duration, Instant};

/// An accumulating clock. Starting returns a guard; the stop happens on drop,
/// so every start is matched on all exit paths.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    pub num_call: usize,
    pub total: Duration,
}

impl Clock {
    pub fn start(&mut self) -> ClockGuard<'_> {
        ClockGuard {
            clock: self,
            started: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }
}

pub struct ClockGuard<'a> {
    clock: &'a mut Clock,
    started: Instant,
}

impl Drop for ClockGuard<'_> {
    fn drop(&mut self) {
        self.clock.num_call += 1;
        self.clock.total += self.started.elapsed();
    }
}

/// The clocks of the simplex core, plus the wall-clock origin of the solve
/// used for the run-time budget.
#[derive(Clone, Debug)]
pub struct Clocks {
    pub solve_start: Instant,
    pub scale: Clock,
    pub invert: Clock,
    pub update_factor: Clock,
    pub update_pivots: Clock,
    pub update_matrix: Clock,
}

impl Default for Clocks {
    fn default() -> Clocks {
        Clocks {
            solve_start: Instant::now(),
            scale: Clock::default(),
            invert: Clock::default(),
            update_factor: Clock::default(),
            update_pivots: Clock::default(),
            update_matrix: Clock::default(),
        }
    }
}

impl Clocks {
    pub fn run_time(&self) -> f64 {
        self.solve_start.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_accumulates_on_drop() {
        let mut clock = Clock::default();
        {
            let _guard = clock.start();
        }
        {
            let _guard = clock.start();
        }
        assert_eq!(clock.num_call, 2);
    }
}
