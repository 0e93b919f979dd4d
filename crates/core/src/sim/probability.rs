//! Cross-scenario burn-count aggregation per save time.

use std::sync::Mutex;

use rayon::prelude::*;
use tracing::debug;

use crate::grid::{GridExtent, GridMap};
use crate::sim::intensity::IntensityMap;

/// Counts of scenarios that burned each cell, split by intensity class,
/// for one snapshot time. The single mutex covers the whole update; with
/// snapshots happening per save point (not per event) contention is noise.
#[derive(Debug)]
pub struct ProbabilityMap {
    time: f64,
    low_max: u32,
    moderate_max: u32,
    inner: Mutex<Counts>,
}

#[derive(Debug)]
struct Counts {
    total: GridMap<u64>,
    low: GridMap<u64>,
    moderate: GridMap<u64>,
    high: GridMap<u64>,
    sizes: Vec<f64>,
}

/// A read-only copy of the counts, for rendering and assertions.
#[derive(Debug, Clone)]
pub struct ProbabilitySnapshot {
    pub time: f64,
    pub total: GridMap<u64>,
    pub low: GridMap<u64>,
    pub moderate: GridMap<u64>,
    pub high: GridMap<u64>,
    pub sizes: Vec<f64>,
}

impl ProbabilitySnapshot {
    /// Number of scenario results folded in.
    #[must_use]
    pub fn num_sizes(&self) -> usize {
        self.sizes.len()
    }

    /// Burn probability per cell: count / number of sizes.
    #[must_use]
    pub fn probabilities(&self) -> GridMap<f64> {
        let mut out = GridMap::new(*self.total.extent());
        let n = self.num_sizes();
        if n == 0 {
            return out;
        }
        out.values_mut()
            .par_iter_mut()
            .zip(self.total.values().par_iter())
            .for_each(|(slot, &count)| *slot = count as f64 / n as f64);
        out
    }
}

impl ProbabilityMap {
    #[must_use]
    pub fn new(extent: GridExtent, time: f64, low_max: u32, moderate_max: u32) -> Self {
        ProbabilityMap {
            time,
            low_max,
            moderate_max,
            inner: Mutex::new(Counts {
                total: GridMap::new(extent),
                low: GridMap::new(extent),
                moderate: GridMap::new(extent),
                high: GridMap::new(extent),
                sizes: Vec::new(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Fold one scenario's burn state in.
    ///
    /// Every burned cell lands in exactly one of low/moderate/high and in
    /// total; zero-intensity cells were never burned and are absent from
    /// the map by construction.
    pub fn add_probability(&self, intensity: &IntensityMap) {
        let mut inner = self.inner.lock().expect("probability map poisoned");
        for (hash, value) in intensity.iter() {
            *inner.total.values_mut().get_mut(hash).expect("in extent") += 1;
            let class = if value <= self.low_max {
                &mut inner.low
            } else if value <= self.moderate_max {
                &mut inner.moderate
            } else {
                &mut inner.high
            };
            class.values_mut()[hash] += 1;
        }
        let size = intensity.fire_size_ha();
        let pos = inner
            .sizes
            .partition_point(|&s| s < size);
        inner.sizes.insert(pos, size);
        debug!(time = self.time, size, "snapshot folded into probability map");
    }

    /// Merge a finished iteration's per-iteration map into this one.
    pub fn add_probabilities(&self, other: &ProbabilityMap) {
        let theirs = other.snapshot();
        let mut inner = self.inner.lock().expect("probability map poisoned");
        let counts = &mut *inner;
        for (ours, theirs) in [
            (&mut counts.total, &theirs.total),
            (&mut counts.low, &theirs.low),
            (&mut counts.moderate, &theirs.moderate),
            (&mut counts.high, &theirs.high),
        ] {
            for (slot, &value) in ours.values_mut().iter_mut().zip(theirs.values()) {
                *slot += value;
            }
        }
        for size in theirs.sizes {
            let pos = counts.sizes.partition_point(|&s| s < size);
            counts.sizes.insert(pos, size);
        }
    }

    /// Clear counts so an iteration buffer can be reused.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("probability map poisoned");
        inner.total.fill(0);
        inner.low.fill(0);
        inner.moderate.fill(0);
        inner.high.fill(0);
        inner.sizes.clear();
    }

    /// Copy the current counts out.
    #[must_use]
    pub fn snapshot(&self) -> ProbabilitySnapshot {
        let inner = self.inner.lock().expect("probability map poisoned");
        ProbabilitySnapshot {
            time: self.time,
            total: inner.total.clone(),
            low: inner.low.clone(),
            moderate: inner.moderate.clone(),
            high: inner.high.clone(),
            sizes: inner.sizes.clone(),
        }
    }
}
