//! Reshape Ergast payloads into tables.
//!
//! Every Ergast response is wrapped in `MRData`. Numeric fields arrive as
//! strings and are converted here; optional fields become nulls.

use crate::agent::Table;
use crate::error::{F1Error, Result};
use serde_json::{json, Value};

pub const DRIVER_STANDINGS_COLUMNS: &[&str] =
    &["position", "first_name", "last_name", "constructor", "points", "wins"];
pub const CONSTRUCTOR_STANDINGS_COLUMNS: &[&str] =
    &["position", "constructor_name", "nationality", "points", "wins"];
pub const SEASON_COLUMNS: &[&str] =
    &["round_number", "race_name", "date", "circuit_name", "country"];
pub const DRIVER_COLUMNS: &[&str] =
    &["driver_id", "first_name", "last_name", "date_of_birth", "nationality"];
pub const RACE_RESULT_COLUMNS: &[&str] = &[
    "position",
    "grid_position",
    "first_name",
    "last_name",
    "constructor",
    "points",
    "status",
    "fastest_lap_number",
    "fastest_lap_time",
    "race_time",
];
pub const DRIVER_SEASON_COLUMNS: &[&str] =
    &["round", "race_name", "driver_name", "finishing_position", "starting_position"];
pub const QUALIFYING_COLUMNS: &[&str] = &[
    "position",
    "first_name",
    "last_name",
    "constructor",
    "q1_time",
    "q2_time",
    "q3_time",
];
pub const LAP_TIME_COLUMNS: &[&str] = &["lap_number", "lap_time"];

/// Driver standings after a round or at the end of a season.
pub fn driver_standings(payload: &Value) -> Result<Table> {
    let lists = "/MRData/StandingsTable/StandingsLists";
    let Some(standings) = first_of(payload, lists, "DriverStandings")? else {
        return Ok(Table::new(DRIVER_STANDINGS_COLUMNS.iter().copied()));
    };

    build(DRIVER_STANDINGS_COLUMNS, standings, |item| {
        Ok(vec![
            int(item, "/position")?,
            text(item, "/Driver/givenName"),
            text(item, "/Driver/familyName"),
            text(item, "/Constructors/0/name"),
            number(item, "/points")?,
            int(item, "/wins")?,
        ])
    })
}

/// Constructor standings after a round or at the end of a season.
pub fn constructor_standings(payload: &Value) -> Result<Table> {
    let Some(standings) =
        first_of(payload, "/MRData/StandingsTable/StandingsLists", "ConstructorStandings")?
    else {
        return Ok(Table::new(CONSTRUCTOR_STANDINGS_COLUMNS.iter().copied()));
    };

    build(CONSTRUCTOR_STANDINGS_COLUMNS, standings, |item| {
        Ok(vec![
            int(item, "/position")?,
            text(item, "/Constructor/name"),
            text(item, "/Constructor/nationality"),
            number(item, "/points")?,
            int(item, "/wins")?,
        ])
    })
}

/// Race calendar of a season.
pub fn season_schedule(payload: &Value) -> Result<Table> {
    let races = list(payload, "/MRData/RaceTable/Races")?;

    build(SEASON_COLUMNS, races, |race| {
        Ok(vec![
            int(race, "/round")?,
            text(race, "/raceName"),
            text(race, "/date"),
            text(race, "/Circuit/circuitName"),
            text(race, "/Circuit/Location/country"),
        ])
    })
}

/// Driver list for all of history, a season or a round.
pub fn drivers(payload: &Value) -> Result<Table> {
    let drivers = list(payload, "/MRData/DriverTable/Drivers")?;

    build(DRIVER_COLUMNS, drivers, |driver| {
        Ok(vec![
            text(driver, "/driverId"),
            text(driver, "/givenName"),
            text(driver, "/familyName"),
            text(driver, "/dateOfBirth"),
            text(driver, "/nationality"),
        ])
    })
}

/// Finishing order of one race.
pub fn race_result(payload: &Value) -> Result<Table> {
    let Some(results) = first_of(payload, "/MRData/RaceTable/Races", "Results")? else {
        return Ok(Table::new(RACE_RESULT_COLUMNS.iter().copied()));
    };

    build(RACE_RESULT_COLUMNS, results, |item| {
        Ok(vec![
            int(item, "/position")?,
            int(item, "/grid")?,
            text(item, "/Driver/givenName"),
            text(item, "/Driver/familyName"),
            text(item, "/Constructor/name"),
            number(item, "/points")?,
            text(item, "/status"),
            int(item, "/FastestLap/lap")?,
            text(item, "/FastestLap/Time/time"),
            text(item, "/Time/time"),
        ])
    })
}

/// One driver's results across a season, one row per race.
pub fn driver_season_results(payload: &Value) -> Result<Table> {
    let races = list(payload, "/MRData/RaceTable/Races")?;

    build(DRIVER_SEASON_COLUMNS, races, |race| {
        let name = match (
            race.pointer("/Results/0/Driver/givenName").and_then(Value::as_str),
            race.pointer("/Results/0/Driver/familyName").and_then(Value::as_str),
        ) {
            (Some(given), Some(family)) => json!(format!("{} {}", given, family)),
            _ => Value::Null,
        };
        Ok(vec![
            int(race, "/round")?,
            text(race, "/raceName"),
            name,
            int(race, "/Results/0/position")?,
            int(race, "/Results/0/grid")?,
        ])
    })
}

/// Qualifying order of one race. Q2 and Q3 are null for drivers knocked out earlier.
pub fn qualifying(payload: &Value) -> Result<Table> {
    let Some(results) = first_of(payload, "/MRData/RaceTable/Races", "QualifyingResults")? else {
        return Ok(Table::new(QUALIFYING_COLUMNS.iter().copied()));
    };

    build(QUALIFYING_COLUMNS, results, |item| {
        Ok(vec![
            int(item, "/position")?,
            text(item, "/Driver/givenName"),
            text(item, "/Driver/familyName"),
            text(item, "/Constructor/name"),
            text(item, "/Q1"),
            text(item, "/Q2"),
            text(item, "/Q3"),
        ])
    })
}

/// Lap-by-lap times of one driver in one race.
pub fn lap_times(payload: &Value) -> Result<Table> {
    let Some(laps) = first_of(payload, "/MRData/RaceTable/Races", "Laps")? else {
        return Ok(Table::new(LAP_TIME_COLUMNS.iter().copied()));
    };

    build(LAP_TIME_COLUMNS, laps, |lap| {
        Ok(vec![int(lap, "/number")?, text(lap, "/Timings/0/time")])
    })
}

fn build(
    columns: &[&str],
    items: &[Value],
    row: impl Fn(&Value) -> Result<Vec<Value>>,
) -> Result<Table> {
    let mut table = Table::new(columns.iter().copied());
    for item in items {
        table.push_row(row(item)?).map_err(F1Error::DataSource)?;
    }
    Ok(table)
}

/// Array at `pointer`; a missing array means the payload is malformed.
fn list<'a>(payload: &'a Value, pointer: &str) -> Result<&'a [Value]> {
    payload
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| F1Error::DataSource(format!("Unexpected payload: no array at {}", pointer)))
}

/// Array `field` of the first element of the list at `pointer`, or `None`
/// when that list is empty (no such race or standings yet).
fn first_of<'a>(payload: &'a Value, pointer: &str, field: &str) -> Result<Option<&'a [Value]>> {
    let Some(first) = list(payload, pointer)?.first() else {
        return Ok(None);
    };
    let items = first.get(field).and_then(Value::as_array).ok_or_else(|| {
        F1Error::DataSource(format!("Unexpected payload: no {} at {}/0", field, pointer))
    })?;
    Ok(Some(items.as_slice()))
}

fn text(item: &Value, pointer: &str) -> Value {
    match item.pointer(pointer) {
        Some(Value::String(s)) => Value::String(s.clone()),
        _ => Value::Null,
    }
}

/// Integer field sent as a string. Missing fields become null.
fn int(item: &Value, pointer: &str) -> Result<Value> {
    match item.pointer(pointer) {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::Number(n)) => Ok(Value::Number(n.clone())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|n| json!(n))
            .map_err(|_| {
                F1Error::DataSource(format!("Expected an integer at {}, got '{}'", pointer, s))
            }),
        Some(other) => Err(F1Error::DataSource(format!(
            "Expected an integer at {}, got {}",
            pointer, other
        ))),
    }
}

/// Decimal field sent as a string; whole values stay integers.
fn number(item: &Value, pointer: &str) -> Result<Value> {
    match item.pointer(pointer) {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::Number(n)) => Ok(Value::Number(n.clone())),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Ok(json!(n));
            }
            s.parse::<f64>().map(|n| json!(n)).map_err(|_| {
                F1Error::DataSource(format!("Expected a number at {}, got '{}'", pointer, s))
            })
        }
        Some(other) => Err(F1Error::DataSource(format!(
            "Expected a number at {}, got {}",
            pointer, other
        ))),
    }
}
