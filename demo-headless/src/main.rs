//! Headless demo: a deterministic fire on a uniform C-2 landscape.
//!
//! Builds a synthetic 100x100 grid, constant summer fire weather, ignites
//! the centre, and writes probability rasters into `./demo-output`.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use wildfire_core::fuel::{standard_catalog, FuelLookup};
use wildfire_core::grid::Landscape;
use wildfire_core::output::OutputWriter;
use wildfire_core::sim::{Ignition, Model};
use wildfire_core::util::DAY_HOURS;
use wildfire_core::weather::{FwiWeather, WeatherStream, Wind};
use wildfire_core::{Settings, StartPoint};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut settings = Settings::default();
    settings.deterministic = true;
    settings.output_date_offsets = vec![1];

    let catalog = standard_catalog(
        settings.default_percent_conifer,
        settings.default_percent_dead_fir,
    );
    let lookup = Arc::new(FuelLookup::identity(catalog));
    let c2 = lookup.by_name("C-2").expect("C-2 is in the catalog");
    let c2_code = lookup
        .used_fuels()
        .iter()
        .find(|(_, fuel)| *fuel == c2)
        .map(|(code, _)| *code)
        .expect("C-2 has a code");

    let landscape = Arc::new(Landscape::uniform(100, 100, 100.0, c2_code)?);
    info!(
        rows = landscape.rows(),
        columns = landscape.columns(),
        "synthetic landscape ready"
    );

    // constant moderate-severe fire weather for three days
    let start_day = 200u32;
    let last_day = start_day + 3;
    let wx = FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, 90.0, 35.5, 275.0);
    let hours = (last_day - start_day + 2) as usize * DAY_HOURS;
    let fuels = lookup.used_fuels();
    let stream = Arc::new(WeatherStream::new(
        start_day,
        last_day,
        vec![Some(wx); hours],
        &fuels,
        settings.deterministic,
    ));

    let start_point = StartPoint::new(52.0, -89.0, settings.offset_sunrise, settings.offset_sunset);
    let start_time = f64::from(start_day) + 0.5;
    let ignition = Ignition::Cell(landscape.extent().hash(50, 50));

    let model = Model::new(
        Arc::clone(&landscape),
        Arc::clone(&lookup),
        settings.clone(),
        start_point,
        vec![(Arc::clone(&stream), stream)],
        ignition,
        start_time,
    )?;
    let result = model.run_iterations(None)?;

    info!(
        iterations = result.iterations,
        scenarios = result.scenarios,
        largest_ha = result.all_sizes.last().copied().unwrap_or(0.0),
        "run complete"
    );

    let writer = OutputWriter::new("demo-output", 2023, settings)?;
    writer.save_all(&result.probabilities, false)?;
    writer.save_sizes(&result.all_sizes)?;
    info!(directory = %writer.directory().display(), "outputs written");
    Ok(())
}
