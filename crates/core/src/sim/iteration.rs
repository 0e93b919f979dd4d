//! A full set of scenarios sharing one threshold realization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use tracing::debug;

use crate::sim::probability::ProbabilityMap;
use crate::sim::scenario::{RunOutcome, Scenario};

/// One scenario per weather stream, run together and summarised together.
pub struct Iteration {
    scenarios: Vec<Scenario>,
    final_sizes: Vec<f64>,
}

impl Iteration {
    #[must_use]
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Iteration {
            scenarios,
            final_sizes: Vec::new(),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn scenarios_mut(&mut self) -> &mut [Scenario] {
        &mut self.scenarios
    }

    /// Save times shared by every member scenario.
    #[must_use]
    pub fn save_points(&self) -> Vec<f64> {
        self.scenarios
            .first()
            .map(|s| s.save_points().to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.scenarios.first().map_or(0.0, Scenario::start_time)
    }

    /// Fresh thresholds for every scenario from the two RNG streams.
    pub fn reset(&mut self, rng_extinction: &mut StdRng, rng_spread: &mut StdRng) {
        self.final_sizes.clear();
        for scenario in &mut self.scenarios {
            scenario.reset(Some(rng_extinction), Some(rng_spread));
        }
    }

    /// Deterministic reset: no threshold randomness.
    pub fn reset_deterministic(&mut self) {
        self.final_sizes.clear();
        for scenario in &mut self.scenarios {
            scenario.reset(None, None);
        }
    }

    /// Point every scenario at a new start cell (surface mode).
    pub fn reset_with_new_start(&mut self, start_cell: crate::grid::CellHash) {
        self.final_sizes.clear();
        for scenario in &mut self.scenarios {
            scenario.reset_with_new_start(start_cell);
        }
    }

    /// Ask every scenario to stop at its next event.
    pub fn cancel(&self) {
        for scenario in &self.scenarios {
            scenario
                .cancel_handle()
                .store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    /// Run all scenarios, collecting final sizes.
    ///
    /// `parallel` runs each scenario on its own OS thread (bounded by the
    /// shared task limiter); `on_done` fires after each completion with
    /// (completed so far, total), which the controller uses for interim
    /// saves while a deadline looms.
    pub fn run(
        &mut self,
        probabilities: &[Arc<ProbabilityMap>],
        parallel: bool,
        on_done: &(dyn Fn(usize, usize) + Sync),
    ) -> Vec<RunOutcome> {
        let total = self.scenarios.len();
        let outcomes = if parallel {
            let done = AtomicUsize::new(0);
            let collected: Mutex<Vec<(usize, RunOutcome)>> = Mutex::new(Vec::with_capacity(total));
            std::thread::scope(|scope| {
                for (index, scenario) in self.scenarios.iter_mut().enumerate() {
                    let done = &done;
                    let collected = &collected;
                    scope.spawn(move || {
                        let outcome = scenario.run(probabilities);
                        let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
                        on_done(completed, total);
                        collected
                            .lock()
                            .expect("outcome vector poisoned")
                            .push((index, outcome));
                    });
                }
            });
            let mut with_index = collected.into_inner().expect("outcome vector poisoned");
            with_index.sort_by_key(|(index, _)| *index);
            with_index.into_iter().map(|(_, outcome)| outcome).collect()
        } else {
            let mut outcomes = Vec::with_capacity(total);
            for (index, scenario) in self.scenarios.iter_mut().enumerate() {
                outcomes.push(scenario.run(probabilities));
                on_done(index + 1, total);
            }
            outcomes
        };
        self.final_sizes = outcomes.iter().map(|o| o.final_size_ha).collect();
        debug!(
            scenarios = total,
            completed = outcomes.iter().filter(|o| !o.cancelled).count(),
            "iteration finished"
        );
        outcomes
    }

    /// Final sizes from the last run, one per scenario.
    #[must_use]
    pub fn final_sizes(&self) -> &[f64] {
        &self.final_sizes
    }
}
