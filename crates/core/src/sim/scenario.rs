//! One fire growth simulation: the event loop.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::grid::{CellHash, SpreadKey};
use crate::settings::Settings;
use crate::sim::cell_points::{CellPointsMap, InnerPos};
use crate::sim::event::{Event, EventKind, EventQueue};
use crate::sim::intensity::IntensityMap;
use crate::sim::model::SharedInputs;
use crate::sim::probability::ProbabilityMap;
use crate::sim::spread::{ros_from_threshold, SpreadInfo};
use crate::util::{time_index, DAY_HOURS, DAY_MINUTES};
use crate::weather::WeatherStream;

const MAX_DAYS: usize = 366;

/// Where a scenario's fire begins.
#[derive(Debug, Clone)]
pub enum Ignition {
    /// A single start cell, lit by a NEW_FIRE event.
    Cell(CellHash),
    /// A perimeter already burning at the start time.
    Perimeter(Vec<CellHash>),
}

/// Lifecycle of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Created,
    Ready,
    Running,
    Done,
    Cancelled,
}

/// Result of running one scenario.
#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub final_size_ha: f64,
    pub cancelled: bool,
}

/// Gets told when cells burn; holds ids, not references, so scenarios can
/// move between threads.
pub trait ScenarioObserver: Send {
    fn cell_burned(&mut self, scenario_id: usize, cell: CellHash, time: f64, intensity: u32);
    fn reset(&mut self) {}
}

/// A single member of an iteration, bound to one weather stream and one
/// ignition.
pub struct Scenario {
    inputs: Arc<SharedInputs>,
    id: usize,
    simulation: i64,
    weather: Arc<WeatherStream>,
    weather_daily: Arc<WeatherStream>,
    ignition: Ignition,
    start_time: f64,
    start_day: u32,
    last_date: u32,
    state: ScenarioState,
    cancelled: Arc<AtomicBool>,
    /// Whether this scenario belongs to the guaranteed first iteration.
    is_required: bool,

    extinction_thresholds: Vec<f64>,
    spread_thresholds_by_ros: Vec<f64>,

    points: CellPointsMap,
    intensity: Option<IntensityMap>,
    arrival: BTreeMap<CellHash, f64>,
    queue: EventQueue,
    save_points: Vec<f64>,
    last_save: f64,
    spread_cache: HashMap<SpreadKey, SpreadInfo>,
    current_hour: Option<usize>,
    max_ros: f64,
    current_time: f64,
    step: u64,
    oob_spread: u64,
    final_size_ha: f64,
    observers: Vec<Box<dyn ScenarioObserver>>,
}

impl Scenario {
    #[must_use]
    pub fn new(
        inputs: Arc<SharedInputs>,
        id: usize,
        weather: Arc<WeatherStream>,
        weather_daily: Arc<WeatherStream>,
        start_time: f64,
        ignition: Ignition,
        start_day: u32,
        last_date: u32,
    ) -> Self {
        let mut scenario = Scenario {
            inputs,
            id,
            simulation: -1,
            weather,
            weather_daily,
            ignition,
            start_time,
            start_day,
            last_date,
            state: ScenarioState::Created,
            cancelled: Arc::new(AtomicBool::new(false)),
            is_required: false,
            extinction_thresholds: Vec::new(),
            spread_thresholds_by_ros: Vec::new(),
            points: CellPointsMap::default(),
            intensity: None,
            arrival: BTreeMap::new(),
            queue: EventQueue::default(),
            save_points: Vec::new(),
            last_save: start_time,
            spread_cache: HashMap::new(),
            current_hour: None,
            max_ros: 0.0,
            current_time: start_time,
            step: 0,
            oob_spread: 0,
            final_size_ha: 0.0,
            observers: Vec::new(),
        };
        for &offset in &scenario.inputs.settings.output_date_offsets.clone() {
            scenario.add_save_by_offset(offset);
        }
        scenario
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn simulation(&self) -> i64 {
        self.simulation
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    #[inline]
    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Samples that tried to leave the grid.
    #[inline]
    #[must_use]
    pub fn oob_spread(&self) -> u64 {
        self.oob_spread
    }

    /// Spread steps taken so far.
    #[inline]
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn save_points(&self) -> &[f64] {
        &self.save_points
    }

    /// Handle used by the controller to cancel this scenario.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn mark_required(&mut self) {
        self.is_required = true;
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn register_observer(&mut self, observer: Box<dyn ScenarioObserver>) {
        self.observers.push(observer);
    }

    fn add_save_by_offset(&mut self, offset: u32) {
        let time = f64::from(self.start_day + offset);
        self.last_save = self.last_save.max(time);
        self.save_points.push(time);
    }

    fn settings(&self) -> &Settings {
        &self.inputs.settings
    }

    fn hour_slot(&self, time: f64) -> usize {
        time_index(time) - time_index(f64::from(self.start_day))
    }

    fn extinction_threshold(&self, time: f64) -> f64 {
        self.extinction_thresholds
            .get(self.hour_slot(time))
            .copied()
            .unwrap_or(1.0)
    }

    fn spread_threshold_by_ros(&self, time: f64) -> f64 {
        self.spread_thresholds_by_ros
            .get(self.hour_slot(time))
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Put the scenario back to a runnable state with fresh thresholds.
    ///
    /// With RNGs absent (deterministic mode) both threshold vectors stay
    /// zero, which makes both gates pass unconditionally.
    pub fn reset(&mut self, rng_extinction: Option<&mut StdRng>, rng_spread: Option<&mut StdRng>) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.release_intensity();
        self.points.clear();
        self.arrival.clear();
        self.queue.clear();
        self.spread_cache.clear();
        self.current_hour = None;
        self.max_ros = 0.0;
        self.step = 0;
        self.oob_spread = 0;
        self.final_size_ha = 0.0;
        self.current_time = self.start_time;
        let hours = (self.last_date - self.start_day + 2) as usize * DAY_HOURS;
        self.extinction_thresholds = vec![0.0; hours];
        self.spread_thresholds_by_ros = vec![0.0; hours];
        if let Some(rng) = rng_extinction {
            let settings = self.settings().clone();
            make_threshold(
                &mut self.extinction_thresholds,
                rng,
                self.start_day,
                self.last_date,
                &settings,
                |v| v,
            );
        }
        if let Some(rng) = rng_spread {
            let settings = self.settings().clone();
            make_threshold(
                &mut self.spread_thresholds_by_ros,
                rng,
                self.start_day,
                self.last_date,
                &settings,
                ros_from_threshold,
            );
        }
        for observer in &mut self.observers {
            observer.reset();
        }
        self.simulation += 1;
        self.state = ScenarioState::Ready;
    }

    /// Swap in a new start cell (surface mode reuses one scenario per
    /// combustible cell).
    pub fn reset_with_new_start(&mut self, start_cell: CellHash) {
        self.ignition = Ignition::Cell(start_cell);
        self.reset(None, None);
    }

    fn release_intensity(&mut self) {
        if let Some(intensity) = self.intensity.take() {
            self.inputs.pool.release(intensity.into_unburnable());
        }
    }

    fn can_burn(&self, hash: CellHash) -> bool {
        self.intensity.as_ref().is_some_and(|i| i.can_burn(hash))
    }

    /// Whether fire survives in a cell until the next hour.
    ///
    /// Recoverable numeric trouble (weather missing at `time`) reads as
    /// non-survival rather than touching the controller.
    fn survives(&self, time: f64, fuel_code: u8, time_at_location: f64) -> bool {
        if self.settings().deterministic {
            return true;
        }
        let Some(wx) = self.weather.at(time) else {
            return false;
        };
        let mc = wx.mc_dmc_pct();
        if mc < 100.0
            || (mc <= 109.0 && time_at_location < 5.0)
            || (mc <= 119.0 && time_at_location < 4.0)
            || (mc <= 131.0 && time_at_location < 3.0)
            || (mc <= 145.0 && time_at_location < 2.0)
            || (mc <= 218.0 && time_at_location < 1.0)
        {
            return true;
        }
        self.extinction_threshold(time) < self.weather.survival_probability(time, fuel_code)
    }

    fn burn(&mut self, hash: CellHash, time: f64, intensity: u32) {
        for observer in &mut self.observers {
            observer.cell_burned(self.id, hash, time, intensity);
        }
        if let Some(map) = self.intensity.as_mut() {
            map.burn(hash, intensity);
        }
        // arrival is written once; later visits only raise intensity
        self.arrival.entry(hash).or_insert(time);
    }

    /// Run to completion (or cancellation), publishing snapshots into the
    /// iteration's probability maps.
    pub fn run(&mut self, probabilities: &[Arc<ProbabilityMap>]) -> RunOutcome {
        debug_assert_eq!(self.state, ScenarioState::Ready, "run() without reset()");
        let inputs = self.inputs.clone();
        let _permit = inputs.limiter.acquire();
        self.state = ScenarioState::Running;
        let extent = *self.inputs.landscape.extent();
        let mut unburnable = self.inputs.pool.acquire();
        unburnable.union_with(&self.inputs.non_fuel);
        self.intensity = Some(IntensityMap::new(extent, unburnable));
        for &time in &self.save_points.clone() {
            self.queue.push(Event::save(time));
        }
        match self.ignition.clone() {
            Ignition::Cell(cell) => {
                self.queue.push(Event::new_fire(self.start_time, cell));
            }
            Ignition::Perimeter(cells) => {
                for hash in cells {
                    if !self.can_burn(hash) {
                        continue;
                    }
                    let row = (hash / extent.columns) as f64;
                    let column = (hash % extent.columns) as f64;
                    self.points
                        .insert(&extent, InnerPos::new(column + 0.5, row + 0.5));
                    self.burn(hash, self.start_time, 1);
                }
                self.queue.push(Event::spread(self.start_time));
            }
        }
        // ties dispatch End before Save, so the end trails the last save
        // point by one simulated second to let the final snapshot publish
        self.queue.push(Event::end(self.last_save + 1.0 / 86_400.0));
        while !self.is_cancelled() && !self.queue.is_empty() {
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.evaluate(&event, probabilities);
        }
        self.final_size_ha = self
            .intensity
            .as_ref()
            .map_or(0.0, IntensityMap::fire_size_ha);
        let cancelled = self.is_cancelled();
        self.state = if cancelled {
            ScenarioState::Cancelled
        } else {
            ScenarioState::Done
        };
        debug!(
            scenario = self.id,
            simulation = self.simulation,
            size_ha = self.final_size_ha,
            steps = self.step,
            oob = self.oob_spread,
            cancelled,
            "scenario finished"
        );
        RunOutcome {
            final_size_ha: self.final_size_ha,
            cancelled,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.inputs.deadline.should_cancel(self.is_required)
    }

    /// Fire size of the finished (or cancelled) run, in hectares.
    #[must_use]
    pub fn final_size_ha(&self) -> f64 {
        self.final_size_ha
    }

    /// Burned state for inspection and snapshot publication.
    #[must_use]
    pub fn intensity(&self) -> Option<&IntensityMap> {
        self.intensity.as_ref()
    }

    fn evaluate(&mut self, event: &Event, probabilities: &[Arc<ProbabilityMap>]) {
        debug_assert!(
            event.time >= self.current_time,
            "time went backwards: {} -> {}",
            self.current_time,
            event.time
        );
        match event.kind {
            EventKind::Spread => {
                self.step += 1;
                self.schedule_fire_spread(event.time);
            }
            EventKind::Save => {
                self.current_time = event.time;
                if let Some(intensity) = self.intensity.as_ref() {
                    for map in probabilities {
                        if map.time() == event.time {
                            map.add_probability(intensity);
                        }
                    }
                }
            }
            EventKind::NewFire => {
                self.current_time = event.time;
                let cell = self.inputs.landscape.cell_by_hash(event.cell);
                assert!(cell.is_fuel(), "trying to start a fire in non-fuel");
                let extent = *self.inputs.landscape.extent();
                let pos = InnerPos::new(f64::from(cell.column) + 0.5, f64::from(cell.row) + 0.5);
                self.points.insert(&extent, pos);
                if !self.survives(event.time, cell.fuel_code, 0.0) {
                    debug!(
                        scenario = self.id,
                        fuel = self.inputs.lookup.safe_name(cell.fuel_code),
                        "did not survive ignition"
                    );
                }
                // the fire existed either way, so the origin burns
                self.burn(event.cell, event.time, 1);
                self.schedule_fire_spread(event.time);
            }
            EventKind::End => {
                trace!(scenario = self.id, time = event.time, "end of simulation");
                self.current_time = event.time;
                self.queue.clear();
            }
        }
    }

    fn schedule_fire_spread(&mut self, time: f64) {
        self.current_time = time;
        let this_hour = time_index(time);
        let next_time = (this_hour + 1) as f64 / DAY_HOURS as f64;
        let max_duration = (next_time - time) * DAY_MINUTES;
        let max_time = time + max_duration / DAY_MINUTES;
        let Some(wx) = self.weather.at(time).copied() else {
            warn!(scenario = self.id, time, "no weather for spread; ending");
            self.queue.clear();
            return;
        };
        let wx_daily = match self.weather_daily.at(time).copied() {
            Some(w) => w,
            None => wx,
        };
        let at_night = self.inputs.start_point.is_at_night(time);
        if wx_daily.ffmc < self.settings().minimum_ffmc_for(at_night) {
            trace!(scenario = self.id, time = max_time, "waiting out low FFMC");
            self.queue.push(Event::spread(max_time));
            return;
        }
        if self.current_hour != Some(this_hour) {
            self.current_hour = Some(this_hour);
            if !self.settings().surface {
                self.spread_cache.clear();
            }
            self.max_ros = 0.0;
        }
        let ros_min = if self.settings().deterministic {
            self.settings().minimum_ros
        } else {
            self.spread_threshold_by_ros(time)
                .max(self.settings().minimum_ros)
        };
        let nd = self.inputs.nd_for_time(time);
        let cell_size = self.inputs.landscape.cell_size();
        // pull out every cell whose conditions spread fast enough this hour
        let mut to_spread: BTreeMap<SpreadKey, Vec<(CellHash, crate::sim::cell_points::CellPoints)>> =
            BTreeMap::new();
        let mut max_ros = self.max_ros;
        {
            let hashes: Vec<CellHash> = self.points.map.keys().copied().collect();
            for hash in hashes {
                let cell = self.inputs.landscape.cell_by_hash(hash);
                let key = cell.spread_key();
                let info = match self.spread_cache.entry(key) {
                    std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                    std::collections::hash_map::Entry::Vacant(e) => {
                        // non-fuel short-circuits before any FBP math
                        let info = match self.inputs.lookup.by_code(key.fuel_code) {
                            Some(fuel) => SpreadInfo::calculate(
                                fuel, &key, nd, &wx, &wx_daily, cell_size, ros_min,
                            ),
                            None => SpreadInfo::not_spreading(),
                        };
                        e.insert(info)
                    }
                };
                let ros = info.head_ros();
                if !info.is_not_spreading() && ros >= ros_min {
                    max_ros = max_ros.max(ros);
                    let points = self.points.map.remove(&hash).expect("key just listed");
                    to_spread.entry(key).or_default().push((hash, points));
                }
            }
        }
        self.max_ros = max_ros;
        if to_spread.is_empty() {
            trace!(scenario = self.id, time = max_time, "nothing spreading");
            self.queue.push(Event::spread(max_time));
            return;
        }
        let duration = if self.max_ros > 0.0 {
            max_duration.min(self.settings().maximum_spread_distance * cell_size / self.max_ros)
        } else {
            max_duration
        };
        let new_time = time + duration / DAY_MINUTES;
        let extent = *self.inputs.landscape.extent();
        // advance every retained sample along every offset
        let mut cell_pts = CellPointsMap::default();
        let mut oob = 0u64;
        for (key, cells) in &to_spread {
            let offsets = self.spread_cache[key].offsets().to_vec();
            for (_, points) in cells {
                for pos in points.points() {
                    for offset in &offsets {
                        let moved = InnerPos::new(
                            pos.x + offset.dx * duration,
                            pos.y + offset.dy * duration,
                        );
                        if !extent.contains(moved.row(), moved.column()) {
                            oob += 1;
                            continue;
                        }
                        cell_pts.insert(&extent, moved);
                    }
                }
            }
        }
        self.oob_spread += oob;
        {
            let intensity = self.intensity.as_ref().expect("intensity set in run()");
            cell_pts.retain(|hash| !intensity.unburnable().get(*hash));
            let unburnable = intensity.unburnable();
            self.points.merge(unburnable, cell_pts);
        }
        // burn, extinguish, or keep every cell that still holds points
        let mut keep = CellPointsMap::default();
        let entries: Vec<(CellHash, crate::sim::cell_points::CellPoints)> =
            std::mem::take(&mut self.points.map).into_iter().collect();
        for (hash, points) in entries {
            let cell = self.inputs.landscape.cell_by_hash(hash);
            let key = cell.spread_key();
            let max_intensity = self
                .spread_cache
                .get(&key)
                .map_or(0.0, SpreadInfo::max_intensity);
            if self.can_burn(hash) && max_intensity > 0.0 {
                self.burn(hash, new_time, max_intensity.max(1.0) as u32);
            }
            let arrival = self.arrival.get(&hash).copied().unwrap_or(new_time);
            let survives = self.survives(new_time, cell.fuel_code, new_time - arrival);
            let intensity = self.intensity.as_mut().expect("intensity set in run()");
            let unburnable_now = intensity.unburnable().get(hash);
            if !unburnable_now && survives && !intensity.is_surrounded(hash) {
                keep.map.insert(hash, points);
            } else {
                // went out or boxed in: no more spread from here
                intensity.mark_unburnable(hash);
            }
        }
        self.points = keep;
        trace!(
            scenario = self.id,
            cells = self.points.len(),
            until = new_time,
            "spreading"
        );
        self.queue.push(Event::spread(new_time));
    }
}

impl Drop for Scenario {
    fn drop(&mut self) {
        self.release_intensity();
    }
}

/// Fill a threshold vector from weighted scenario/day/hour draws.
///
/// Draws are consumed for every day of the year so extending the simulated
/// window never changes earlier days' thresholds.
fn make_threshold(
    thresholds: &mut [f64],
    rng: &mut StdRng,
    start_day: u32,
    last_date: u32,
    settings: &Settings,
    convert: impl Fn(f64) -> f64,
) {
    let ws = settings.threshold_scenario_weight;
    let wd = settings.threshold_daily_weight;
    let wh = settings.threshold_hourly_weight;
    let total = ws + wd + wh;
    let general: f64 = rng.gen();
    for day in start_day..MAX_DAYS as u32 {
        let daily: f64 = rng.gen();
        for hour in 0..DAY_HOURS {
            let hourly: f64 = rng.gen();
            if day <= last_date + 1 {
                let mixed = (1.0 - (ws * general + wd * daily + wh * hourly) / total)
                    .clamp(0.0, 1.0);
                thresholds[(day - start_day) as usize * DAY_HOURS + hour] = convert(mixed);
            }
        }
    }
}
