//! The Monte-Carlo controller: iterations, stopping rules, deadlines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::SimulationError;
use crate::fuel::{self, FuelLookup};
use crate::grid::{BurnedData, BurnedDataPool, CellHash, Landscape};
use crate::settings::Settings;
use crate::sim::iteration::Iteration;
use crate::sim::probability::{ProbabilityMap, ProbabilitySnapshot};
use crate::sim::scenario::{Ignition, Scenario};
use crate::sim::statistics::Statistics;
use crate::start_point::StartPoint;
use crate::weather::WeatherStream;

/// Counted semaphore bounding how many scenarios run at once.
#[derive(Debug)]
pub struct TaskLimiter {
    permits: Mutex<usize>,
    available: Condvar,
    limit: usize,
}

impl TaskLimiter {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        TaskLimiter {
            permits: Mutex::new(limit),
            available: Condvar::new(),
            limit,
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Block until a slot frees up; the permit releases on drop.
    pub fn acquire(&self) -> TaskPermit<'_> {
        let mut permits = self.permits.lock().expect("task limiter poisoned");
        while *permits == 0 {
            permits = self.available.wait(permits).expect("task limiter poisoned");
        }
        *permits -= 1;
        TaskPermit { limiter: self }
    }
}

/// RAII slot in the task limiter.
pub struct TaskPermit<'a> {
    limiter: &'a TaskLimiter,
}

impl Drop for TaskPermit<'_> {
    fn drop(&mut self) {
        let mut permits = self
            .limiter
            .permits
            .lock()
            .expect("task limiter poisoned");
        *permits += 1;
        self.limiter.available.notify_one();
    }
}

/// Cooperative wall-clock budget, checked at event dispatch.
///
/// Replaces a watchdog thread: scenarios ask `should_cancel` as they pop
/// events. The first iteration is protected until any iteration has
/// completed, so a too-small budget still yields at least one result.
#[derive(Debug)]
pub struct DeadlineToken {
    started: Instant,
    limit: Duration,
    any_iteration_done: AtomicBool,
}

impl DeadlineToken {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        DeadlineToken {
            started: Instant::now(),
            limit,
            any_iteration_done: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn mark_iteration_done(&self) {
        self.any_iteration_done.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn should_cancel(&self, is_required: bool) -> bool {
        if !self.expired() {
            return false;
        }
        !is_required || self.any_iteration_done.load(Ordering::SeqCst)
    }
}

/// Everything a scenario reads but never writes, owned once per run.
pub struct SharedInputs {
    pub landscape: Arc<Landscape>,
    pub lookup: Arc<FuelLookup>,
    pub settings: Settings,
    pub start_point: StartPoint,
    pub pool: BurnedDataPool,
    /// Cells that can never burn, ORed into every scenario's buffer.
    pub non_fuel: BurnedData,
    pub deadline: DeadlineToken,
    pub limiter: TaskLimiter,
    nd_ref: i32,
}

impl SharedInputs {
    /// `min_parallelism` raises the task limiter to at least one slot per
    /// scenario in an iteration, so a full iteration can always run at
    /// once.
    #[must_use]
    pub fn new(
        landscape: Arc<Landscape>,
        lookup: Arc<FuelLookup>,
        settings: Settings,
        start_point: StartPoint,
        min_parallelism: usize,
    ) -> Self {
        let cells = landscape.extent().cells();
        let mut non_fuel = BurnedData::new(cells);
        for hash in 0..cells {
            if landscape.fuel_at(hash) == 0 {
                non_fuel.set(hash);
            }
        }
        let nd_ref = fuel::nd_reference(
            landscape.representative_elevation(),
            start_point.latitude(),
            start_point.longitude(),
        );
        let deadline = DeadlineToken::new(Duration::from_secs(settings.maximum_time_seconds));
        let hardware = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let limiter = TaskLimiter::new(hardware.max(min_parallelism));
        SharedInputs {
            pool: BurnedDataPool::new(cells),
            non_fuel,
            deadline,
            limiter,
            nd_ref,
            landscape,
            lookup,
            settings,
            start_point,
        }
    }

    /// Days from minimum foliar moisture content at a simulation time.
    #[must_use]
    pub fn nd_for_time(&self, time: f64) -> i32 {
        (time.trunc() as i32 - self.nd_ref).abs()
    }
}

/// What one full run produced.
#[derive(Debug)]
pub struct RunResult {
    /// Aggregated counts per save time, in save-time order.
    pub probabilities: Vec<ProbabilitySnapshot>,
    /// Every recorded final size (ha), sorted.
    pub all_sizes: Vec<f64>,
    pub iterations: usize,
    pub scenarios: usize,
    pub out_of_time: bool,
    pub interim_written: bool,
}

/// Ties the landscape, weather, and settings together and drives the
/// Monte-Carlo loop.
pub struct Model {
    inputs: Arc<SharedInputs>,
    streams: Vec<(Arc<WeatherStream>, Arc<WeatherStream>)>,
    ignition: Ignition,
    start_time: f64,
    start_day: u32,
    last_date: u32,
}

impl Model {
    /// Assemble a run.
    ///
    /// `streams` pairs each scenario's hourly stream with its
    /// daily-derived stream. The ignition has already been relocated to
    /// fuel by the caller.
    pub fn new(
        landscape: Arc<Landscape>,
        lookup: Arc<FuelLookup>,
        settings: Settings,
        start_point: StartPoint,
        streams: Vec<(Arc<WeatherStream>, Arc<WeatherStream>)>,
        ignition: Ignition,
        start_time: f64,
    ) -> Result<Self, SimulationError> {
        settings.validate()?;
        if streams.is_empty() {
            return Err(SimulationError::InvalidSettings(
                "at least one weather stream is required".into(),
            ));
        }
        let start_day = start_time.trunc() as u32;
        let last_date = start_day + settings.max_date_offset();
        for (hourly, _) in &streams {
            if hourly.at(start_time).is_none() {
                return Err(SimulationError::NoWeather(start_time));
            }
            if hourly.max_day() < last_date {
                return Err(SimulationError::NoWeather(f64::from(last_date)));
            }
        }
        let min_parallelism = streams.len();
        let inputs = Arc::new(SharedInputs::new(
            landscape,
            lookup,
            settings,
            start_point,
            min_parallelism,
        ));
        Ok(Model {
            inputs,
            streams,
            ignition,
            start_time,
            start_day,
            last_date,
        })
    }

    #[must_use]
    pub fn inputs(&self) -> &Arc<SharedInputs> {
        &self.inputs
    }

    fn read_scenarios(&self) -> Iteration {
        let scenarios = self
            .streams
            .iter()
            .enumerate()
            .map(|(id, (hourly, daily))| {
                Scenario::new(
                    Arc::clone(&self.inputs),
                    id,
                    Arc::clone(hourly),
                    Arc::clone(daily),
                    self.start_time,
                    self.ignition.clone(),
                    self.start_day,
                    self.last_date,
                )
            })
            .collect();
        Iteration::new(scenarios)
    }

    fn make_probability_maps(&self, save_points: &[f64]) -> Vec<Arc<ProbabilityMap>> {
        save_points
            .iter()
            .map(|&time| {
                Arc::new(ProbabilityMap::new(
                    *self.inputs.landscape.extent(),
                    time,
                    self.inputs.settings.intensity_max_low,
                    self.inputs.settings.intensity_max_moderate,
                ))
            })
            .collect()
    }

    /// Run iterations until a stopping rule fires.
    ///
    /// `interim` is called with the aggregate counts if the deadline trips
    /// while the first iteration is still finishing, so a budget-starved
    /// run still leaves output behind.
    pub fn run_iterations(
        &self,
        interim: Option<&(dyn Fn(&[ProbabilitySnapshot]) + Sync)>,
    ) -> Result<RunResult, SimulationError> {
        let settings = &self.inputs.settings;
        let (mut rng_extinction, mut rng_spread) = self.threshold_rngs();
        let mut iteration = self.read_scenarios();
        for scenario in iteration.scenarios_mut() {
            scenario.mark_required();
        }
        let save_points = iteration.save_points();
        let probabilities = self.make_probability_maps(&save_points);
        let iteration_probabilities = self.make_probability_maps(&save_points);
        let surface_starts: Vec<CellHash> = if settings.surface {
            self.inputs.landscape.combustible_cells()
        } else {
            Vec::new()
        };
        let mut all_sizes: Vec<f64> = Vec::new();
        let mut means: Vec<f64> = Vec::new();
        let mut pct: Vec<f64> = Vec::new();
        let mut iterations_done = 0usize;
        let mut scenarios_done = 0usize;
        let mut cur_start = 0usize;
        let mut interim_written = false;
        let mut runs_left = if settings.surface {
            surface_starts.len()
        } else {
            1
        };
        while runs_left > 0 {
            if settings.surface {
                iteration.reset_with_new_start(surface_starts[cur_start]);
                cur_start += 1;
            } else if settings.deterministic {
                iteration.reset_deterministic();
            } else {
                iteration.reset(&mut rng_extinction, &mut rng_spread);
            }
            let deadline = &self.inputs.deadline;
            let first_iteration = iterations_done == 0;
            let wrote_interim = AtomicBool::new(false);
            {
                let iteration_probabilities = &iteration_probabilities;
                let on_done = |completed: usize, total: usize| {
                    // deadline hit while the protected first iteration is
                    // still finishing: leave partial aggregates behind
                    if first_iteration
                        && deadline.expired()
                        && completed < total
                        && completed >= 1
                    {
                        if let Some(save) = interim {
                            info!(completed, total, "saving interim results");
                            let snapshots: Vec<ProbabilitySnapshot> = iteration_probabilities
                                .iter()
                                .map(|map| map.snapshot())
                                .collect();
                            save(&snapshots);
                            wrote_interim.store(true, Ordering::SeqCst);
                        }
                    }
                };
                iteration.run(iteration_probabilities, settings.run_async, &on_done);
            }
            interim_written |= wrote_interim.load(Ordering::SeqCst);
            iterations_done += 1;
            scenarios_done += iteration.size();
            self.inputs.deadline.mark_iteration_done();
            for (global, local) in probabilities.iter().zip(&iteration_probabilities) {
                global.add_probabilities(local);
                local.reset();
            }
            let final_sizes = iteration.final_sizes().to_vec();
            if final_sizes.is_empty() {
                return Err(SimulationError::InvalidSettings(
                    "no sizes at end of iteration".into(),
                ));
            }
            let keep_going = self.add_statistics(&mut all_sizes, &mut means, &mut pct, &final_sizes);
            if !keep_going {
                break;
            }
            runs_left = if settings.surface {
                surface_starts.len() - cur_start
            } else {
                self.runs_required(iterations_done, &all_sizes, &means, &pct)
            };
            if runs_left > 0 {
                debug!(runs_left, "scheduling more iterations");
            }
        }
        let out_of_time = self.inputs.deadline.expired();
        info!(
            iterations = iterations_done,
            scenarios = scenarios_done,
            sizes = all_sizes.len(),
            out_of_time,
            elapsed_s = self.inputs.deadline.elapsed().as_secs(),
            "simulation complete"
        );
        Ok(RunResult {
            probabilities: probabilities.iter().map(|map| map.snapshot()).collect(),
            all_sizes,
            iterations: iterations_done,
            scenarios: scenarios_done,
            out_of_time,
            interim_written,
        })
    }

    /// Independent seeds per threshold role so removing one does not shift
    /// the other; derived from the start day and coordinate bits so a
    /// given fire reproduces exactly.
    fn threshold_rngs(&self) -> (StdRng, StdRng) {
        let lat_bits = self.inputs.start_point.latitude().to_bits();
        let lon_bits = self.inputs.start_point.longitude().to_bits();
        let seed_for = |role: u64| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&role.to_le_bytes());
            seed[8..16].copy_from_slice(&u64::from(self.start_day).to_le_bytes());
            seed[16..24].copy_from_slice(&lat_bits.to_le_bytes());
            seed[24..32].copy_from_slice(&lon_bits.to_le_bytes());
            StdRng::from_seed(seed)
        };
        (seed_for(1), seed_for(0))
    }

    /// Fold an iteration's sizes into the running statistics; false means
    /// a hard limit tripped and the loop must stop.
    fn add_statistics(
        &self,
        all_sizes: &mut Vec<f64>,
        means: &mut Vec<f64>,
        pct: &mut Vec<f64>,
        final_sizes: &[f64],
    ) -> bool {
        let stats = Statistics::new(final_sizes.to_vec());
        insert_sorted(pct, stats.percentile(95));
        insert_sorted(means, stats.mean());
        for &size in final_sizes {
            insert_sorted(all_sizes, size);
        }
        let settings = &self.inputs.settings;
        if settings.surface {
            return true;
        }
        if all_sizes.len() >= settings.maximum_count_simulations {
            info!(
                simulations = all_sizes.len(),
                limit = settings.maximum_count_simulations,
                "stopping at simulation count limit"
            );
            return false;
        }
        if self.inputs.deadline.expired() {
            warn!(
                limit_s = settings.maximum_time_seconds,
                "stopping at time limit"
            );
            return false;
        }
        true
    }

    /// How many more iterations the three confidence tests ask for.
    fn runs_required(
        &self,
        iterations_done: usize,
        all_sizes: &[f64],
        means: &[f64],
        pct: &[f64],
    ) -> usize {
        let settings = &self.inputs.settings;
        if settings.deterministic {
            info!(iterations_done, "deterministic mode stops after one iteration");
            return 0;
        }
        if self.inputs.deadline.expired() {
            return 0;
        }
        let confidence = settings.confidence_level;
        let for_sizes = Statistics::new(all_sizes.to_vec());
        let for_means = Statistics::new(means.to_vec());
        let for_pct = Statistics::new(pct.to_vec());
        if for_sizes.is_confident(confidence)
            && for_means.is_confident(confidence)
            && for_pct.is_confident(confidence)
        {
            return 0;
        }
        let runs_for_sizes = for_sizes.runs_required(confidence);
        let runs_for_means = for_means.runs_required(confidence);
        let runs_for_pct = for_pct.runs_required(confidence);
        debug!(
            runs_for_means,
            runs_for_pct, runs_for_sizes, "runs required by criterion"
        );
        runs_for_means.max(runs_for_pct).max(runs_for_sizes).max(1)
    }
}

fn insert_sorted(values: &mut Vec<f64>, value: f64) {
    let pos = values.partition_point(|&v| v < value);
    values.insert(pos, value);
}

/// Build an ignition from a projected point and an optional size.
///
/// A zero size ignites the containing cell; otherwise a disc of roughly
/// `size_ha` hectares becomes a starting perimeter. Either way, a centre
/// that lands in non-fuel moves to the nearest combustible cell by
/// expanding rings.
pub fn ignition_for_point(
    landscape: &Landscape,
    x: f64,
    y: f64,
    size_ha: f64,
) -> Result<Ignition, SimulationError> {
    let centre = landscape.nearest_combustible(landscape.cell_for_xy(x, y)?)?;
    let extent = landscape.extent();
    if size_ha <= extent.cell_area_ha() {
        return Ok(Ignition::Cell(extent.hash(centre.row, centre.column)));
    }
    let radius = (size_ha / extent.cell_area_ha() / std::f64::consts::PI).sqrt();
    let reach = radius.ceil() as i32;
    let mut cells = Vec::new();
    for dr in -reach..=reach {
        for dc in -reach..=reach {
            let (row, column) = (centre.row + dr, centre.column + dc);
            if !extent.contains(row, column) {
                continue;
            }
            let distance = f64::from(dr * dr + dc * dc).sqrt();
            if distance <= radius && landscape.cell(row, column).is_fuel() {
                cells.push(extent.hash(row, column));
            }
        }
    }
    if cells.is_empty() {
        cells.push(extent.hash(centre.row, centre.column));
    }
    Ok(Ignition::Perimeter(cells))
}
