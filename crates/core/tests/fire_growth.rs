//! End-to-end behaviour of the scenario engine and controller on
//! synthetic landscapes with constant weather.

use std::collections::HashSet;
use std::sync::Arc;

use wildfire_core::fuel::{standard_catalog, FuelLookup};
use wildfire_core::grid::{CellHash, Landscape};
use wildfire_core::sim::{
    ignition_for_point, Ignition, Model, ProbabilitySnapshot, RunResult, Scenario,
    ScenarioObserver,
};
use wildfire_core::util::DAY_HOURS;
use wildfire_core::weather::{FwiWeather, WeatherStream, Wind};
use wildfire_core::{Settings, StartPoint};

const START_DAY: u32 = 200;
const ROWS: usize = 100;
const COLUMNS: usize = 100;

fn c2_code(lookup: &FuelLookup) -> u8 {
    lookup
        .used_fuels()
        .iter()
        .find(|(_, fuel)| fuel.name == "C-2")
        .map(|(code, _)| *code)
        .expect("C-2 in catalog")
}

fn constant_stream(
    lookup: &FuelLookup,
    deterministic: bool,
    wind_speed: f64,
) -> Arc<WeatherStream> {
    let wx = FwiWeather::from_indices(
        20.0,
        30.0,
        Wind::new(180.0, wind_speed),
        0.0,
        90.0,
        35.5,
        275.0,
    );
    let last_day = START_DAY + 4;
    let hours = (last_day - START_DAY + 2) as usize * DAY_HOURS;
    let fuels = lookup.used_fuels();
    Arc::new(WeatherStream::new(
        START_DAY,
        last_day,
        vec![Some(wx); hours],
        &fuels,
        deterministic,
    ))
}

struct Fixture {
    landscape: Arc<Landscape>,
    lookup: Arc<FuelLookup>,
    settings: Settings,
}

impl Fixture {
    fn new(settings: Settings) -> Self {
        let lookup = Arc::new(FuelLookup::identity(standard_catalog(
            settings.default_percent_conifer,
            settings.default_percent_dead_fir,
        )));
        let code = c2_code(&lookup);
        let landscape =
            Arc::new(Landscape::uniform(ROWS, COLUMNS, 100.0, code).expect("valid landscape"));
        Fixture {
            landscape,
            lookup,
            settings,
        }
    }

    fn model(&self, ignition: Ignition, streams: usize) -> Model {
        let stream_pairs = (0..streams)
            .map(|_| {
                let stream = constant_stream(&self.lookup, self.settings.deterministic, 20.0);
                (Arc::clone(&stream), stream)
            })
            .collect();
        Model::new(
            Arc::clone(&self.landscape),
            Arc::clone(&self.lookup),
            self.settings.clone(),
            StartPoint::new(52.0, -89.0, 0.0, 0.0),
            stream_pairs,
            ignition,
            f64::from(START_DAY) + 0.5,
        )
        .expect("model builds")
    }

    fn run(&self, ignition: Ignition) -> RunResult {
        self.model(ignition, 1)
            .run_iterations(None)
            .expect("run completes")
    }
}

fn deterministic_settings() -> Settings {
    Settings {
        deterministic: true,
        output_date_offsets: vec![1],
        run_async: false,
        ..Settings::default()
    }
}

fn centre_ignition(landscape: &Landscape) -> Ignition {
    Ignition::Cell(landscape.extent().hash(50, 50))
}

fn burned_cells(snapshot: &ProbabilitySnapshot) -> Vec<CellHash> {
    snapshot
        .total
        .values()
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(hash, _)| hash)
        .collect()
}

#[test]
fn deterministic_fire_grows_downwind() {
    let fixture = Fixture::new(deterministic_settings());
    let result = fixture.run(centre_ignition(&fixture.landscape));
    assert_eq!(result.iterations, 1, "deterministic stops after one");
    let snapshot = &result.probabilities[0];
    let burned = burned_cells(snapshot);
    assert!(
        burned.len() > 100,
        "expected substantial growth, got {} cells",
        burned.len()
    );
    assert!(burned.contains(&fixture.landscape.extent().hash(50, 50)));
    // wind from the south pushes the head north (towards lower rows)
    let north = burned.iter().filter(|&&h| h / COLUMNS < 50).count();
    let south = burned.iter().filter(|&&h| h / COLUMNS > 50).count();
    assert!(
        north > south,
        "expected downwind bias, north {north} vs south {south}"
    );
    // every burned cell must be classed exactly once
    for hash in 0..snapshot.total.extent().cells() {
        let parts =
            snapshot.low.get(hash) + snapshot.moderate.get(hash) + snapshot.high.get(hash);
        assert_eq!(snapshot.total.get(hash), parts, "cell {hash}");
    }
}

#[test]
fn burned_cells_are_reachable_from_ignition() {
    let fixture = Fixture::new(deterministic_settings());
    let result = fixture.run(centre_ignition(&fixture.landscape));
    let burned: HashSet<CellHash> = burned_cells(&result.probabilities[0]).into_iter().collect();
    // flood-fill over the burned set from the ignition
    let extent = *fixture.landscape.extent();
    let start = extent.hash(50, 50);
    let mut seen = HashSet::from([start]);
    let mut frontier = vec![start];
    while let Some(hash) = frontier.pop() {
        let row = (hash / COLUMNS) as i32;
        let column = (hash % COLUMNS) as i32;
        for dr in -1..=1i32 {
            for dc in -1..=1i32 {
                let (r, c) = (row + dr, column + dc);
                if (dr, dc) == (0, 0) || !extent.contains(r, c) {
                    continue;
                }
                let next = extent.hash(r, c);
                if burned.contains(&next) && seen.insert(next) {
                    frontier.push(next);
                }
            }
        }
    }
    assert_eq!(
        seen.len(),
        burned.len(),
        "burned set must be 8-connected to the ignition"
    );
}

#[test]
fn nonfuel_barrier_stops_spread() {
    let mut settings = deterministic_settings();
    // give the fire plenty of time to try to cross
    settings.output_date_offsets = vec![2];
    let lookup = Arc::new(FuelLookup::identity(standard_catalog(50, 50)));
    let code = c2_code(&lookup);
    let mut landscape = Landscape::uniform(ROWS, COLUMNS, 100.0, code).expect("valid landscape");
    for row in [60, 61] {
        for column in 0..COLUMNS as i32 {
            landscape.set_fuel(row, column, 0);
        }
    }
    let fixture = Fixture {
        landscape: Arc::new(landscape),
        lookup,
        settings,
    };
    let result = fixture.run(centre_ignition(&fixture.landscape));
    let burned = burned_cells(&result.probabilities[0]);
    let past_barrier: Vec<&CellHash> = burned.iter().filter(|&&h| h / COLUMNS >= 62).collect();
    assert!(
        past_barrier.is_empty(),
        "fire crossed the barrier into {past_barrier:?}"
    );
    assert!(!burned.is_empty());
}

#[test]
fn identical_runs_are_bit_identical() {
    let fixture = Fixture::new(deterministic_settings());
    let first = fixture.run(centre_ignition(&fixture.landscape));
    let second = fixture.run(centre_ignition(&fixture.landscape));
    assert_eq!(first.all_sizes, second.all_sizes);
    assert_eq!(
        first.probabilities[0].total.values(),
        second.probabilities[0].total.values()
    );
}

#[test]
fn seeded_stochastic_runs_reproduce() {
    let mut settings = deterministic_settings();
    settings.deterministic = false;
    settings.maximum_count_simulations = 4;
    let fixture = Fixture::new(settings);
    let first = fixture.run(centre_ignition(&fixture.landscape));
    let second = fixture.run(centre_ignition(&fixture.landscape));
    assert_eq!(first.all_sizes, second.all_sizes);
    assert_eq!(first.iterations, second.iterations);
}

#[test]
fn perimeter_ignition_burns_all_cells_at_start() {
    let settings = deterministic_settings();
    let fixture = Fixture::new(settings);
    let extent = *fixture.landscape.extent();
    let mut perimeter = Vec::new();
    for row in 48..=52 {
        for column in 48..=52 {
            perimeter.push(extent.hash(row, column));
        }
    }
    let model = fixture.model(Ignition::Perimeter(perimeter.clone()), 1);
    // drive one scenario directly so the burn state stays inspectable
    let mut scenario = Scenario::new(
        Arc::clone(model.inputs()),
        0,
        constant_stream(&fixture.lookup, true, 20.0),
        constant_stream(&fixture.lookup, true, 20.0),
        f64::from(START_DAY) + 0.5,
        Ignition::Perimeter(perimeter.clone()),
        START_DAY,
        START_DAY + 1,
    );
    scenario.reset(None, None);
    let outcome = scenario.run(&[]);
    assert!(!outcome.cancelled);
    let intensity = scenario.intensity().expect("scenario ran");
    for hash in perimeter {
        assert!(intensity.has_burned(hash), "perimeter cell {hash} unburned");
    }
    assert!(outcome.final_size_ha >= 25.0);
}

#[test]
fn out_of_time_still_produces_first_iteration() {
    let mut settings = deterministic_settings();
    settings.deterministic = false;
    settings.maximum_time_seconds = 0;
    let fixture = Fixture::new(settings);
    let result = fixture.run(centre_ignition(&fixture.landscape));
    assert!(result.out_of_time);
    assert_eq!(result.iterations, 1, "first iteration is protected");
    assert!(!result.all_sizes.is_empty());
    assert!(result.probabilities[0].num_sizes() >= 1);
}

#[test]
fn confidence_stop_bounds_iterations() {
    let mut settings = deterministic_settings();
    settings.deterministic = false;
    settings.confidence_level = 0.20;
    // backstop: with two scenarios per iteration this caps at 50 iterations
    settings.maximum_count_simulations = 100;
    let fixture = Fixture::new(settings);
    let model = fixture.model(centre_ignition(&fixture.landscape), 2);
    let result = model.run_iterations(None).expect("run completes");
    assert!(
        result.iterations <= 50,
        "expected convergence within 50 iterations, took {}",
        result.iterations
    );
    assert!(result.iterations >= 1);
}

#[test]
fn point_ignition_relocates_to_fuel() {
    let lookup = Arc::new(FuelLookup::identity(standard_catalog(50, 50)));
    let code = c2_code(&lookup);
    let mut landscape = Landscape::uniform(20, 20, 100.0, code).expect("valid landscape");
    for row in 9..=11 {
        for column in 9..=11 {
            landscape.set_fuel(row, column, 0);
        }
    }
    // the point lands in the carved-out pocket and must move off it
    let ignition = ignition_for_point(&landscape, 1050.0, 950.0, 0.0).expect("relocates");
    let Ignition::Cell(hash) = ignition else {
        panic!("zero size must give a single start cell");
    };
    assert!(landscape.cell_by_hash(hash).is_fuel());
    // a sized ignition covers multiple cells
    let sized = ignition_for_point(&landscape, 300.0, 300.0, 12.0).expect("builds perimeter");
    match sized {
        Ignition::Perimeter(cells) => assert!(cells.len() > 4),
        Ignition::Cell(_) => panic!("12 ha should be a perimeter"),
    }
}

#[test]
fn observers_hear_every_first_burn() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct SharedCounter(StdArc<AtomicUsize>);
    impl ScenarioObserver for SharedCounter {
        fn cell_burned(&mut self, _id: usize, _cell: CellHash, _time: f64, _intensity: u32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let fixture = Fixture::new(deterministic_settings());
    let model = fixture.model(centre_ignition(&fixture.landscape), 1);
    let burns = StdArc::new(AtomicUsize::new(0));
    let mut scenario = Scenario::new(
        Arc::clone(model.inputs()),
        0,
        constant_stream(&fixture.lookup, true, 20.0),
        constant_stream(&fixture.lookup, true, 20.0),
        f64::from(START_DAY) + 0.5,
        centre_ignition(&fixture.landscape),
        START_DAY,
        START_DAY + 1,
    );
    scenario.register_observer(Box::new(SharedCounter(StdArc::clone(&burns))));
    scenario.reset(None, None);
    scenario.run(&[]);
    let burned = scenario.intensity().expect("scenario ran").burned_count();
    // one notification per burn call; first burns dominate and every
    // burned cell produced at least one
    assert!(burns.load(Ordering::SeqCst) >= burned);
    assert!(burned > 0);
}

#[test]
fn surface_mode_runs_every_combustible_cell_once() {
    let mut settings = deterministic_settings();
    settings.surface = true;
    let lookup = Arc::new(FuelLookup::identity(standard_catalog(50, 50)));
    let code = c2_code(&lookup);
    // tiny grid: surface mode is one iteration per combustible cell
    let landscape = Arc::new(Landscape::uniform(4, 4, 100.0, code).expect("valid landscape"));
    let fixture = Fixture {
        landscape,
        lookup,
        settings,
    };
    let result = fixture.run(Ignition::Cell(0));
    assert_eq!(result.iterations, 16);
    assert_eq!(result.all_sizes.len(), 16);
}
