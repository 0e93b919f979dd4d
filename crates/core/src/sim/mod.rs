//! The scenario engine and Monte-Carlo controller.

mod cell_points;
mod event;
mod intensity;
mod iteration;
mod model;
mod probability;
mod scenario;
mod spread;
mod statistics;

pub use cell_points::{CellPoints, CellPointsMap, InnerPos, NUM_DIRECTIONS};
pub use event::{Event, EventKind, EventQueue};
pub use intensity::IntensityMap;
pub use iteration::Iteration;
pub use model::{
    ignition_for_point, DeadlineToken, Model, RunResult, SharedInputs, TaskLimiter, TaskPermit,
};
pub use probability::{ProbabilityMap, ProbabilitySnapshot};
pub use scenario::{Ignition, RunOutcome, Scenario, ScenarioObserver, ScenarioState};
pub use spread::{ros_from_threshold, SpreadInfo, SpreadOffset};
pub use statistics::Statistics;
