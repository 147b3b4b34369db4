//! The Ergast queries exposed to the model as data tools.

use super::client::ErgastClient;
use super::parse;
use crate::agent::{typed_arguments, DataTool, Handler, Table, ToolOutput, ToolSpec};
use crate::error::{F1Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// The closed set of Ergast queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErgastTool {
    DriverStandings,
    ConstructorStandings,
    SeasonInfo,
    DriverInformation,
    RaceResult,
    DriverSeasonResults,
    RaceQualifying,
    DriverLapTimes,
}

const SEASON_DOC: &str = "The 4 digit year of the season";
const ROUND_DOC: &str = "The race number within the season";
const OPTIONAL_ROUND_DOC: &str = "The race number within the season. 0 means not specified";

/// A resolved query: the resource path and the requested columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ErgastRequest {
    pub segments: Vec<String>,
    pub cols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StandingsArgs {
    season: i64,
    #[serde(default)]
    round: i64,
}

#[derive(Debug, Deserialize)]
struct SeasonArgs {
    season: i64,
    #[serde(default)]
    cols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DriverInfoArgs {
    #[serde(default)]
    cols: Vec<String>,
    #[serde(default)]
    season: i64,
    #[serde(default)]
    round: i64,
}

#[derive(Debug, Deserialize)]
struct RaceArgs {
    season: i64,
    round: i64,
}

#[derive(Debug, Deserialize)]
struct DriverSeasonArgs {
    season: i64,
    driver_id: String,
}

#[derive(Debug, Deserialize)]
struct LapTimeArgs {
    season: i64,
    round: i64,
    driver: String,
}

impl ErgastTool {
    pub const ALL: [ErgastTool; 8] = [
        ErgastTool::DriverStandings,
        ErgastTool::ConstructorStandings,
        ErgastTool::SeasonInfo,
        ErgastTool::DriverInformation,
        ErgastTool::RaceResult,
        ErgastTool::DriverSeasonResults,
        ErgastTool::RaceQualifying,
        ErgastTool::DriverLapTimes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErgastTool::DriverStandings => "get_driver_standings",
            ErgastTool::ConstructorStandings => "get_constructors_standings",
            ErgastTool::SeasonInfo => "get_season_info",
            ErgastTool::DriverInformation => "get_driver_information",
            ErgastTool::RaceResult => "get_race_result",
            ErgastTool::DriverSeasonResults => "driver_season_race_results",
            ErgastTool::RaceQualifying => "get_race_qualifying",
            ErgastTool::DriverLapTimes => "get_driver_lap_times",
        }
    }

    /// Columns of the table this query returns.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ErgastTool::DriverStandings => parse::DRIVER_STANDINGS_COLUMNS,
            ErgastTool::ConstructorStandings => parse::CONSTRUCTOR_STANDINGS_COLUMNS,
            ErgastTool::SeasonInfo => parse::SEASON_COLUMNS,
            ErgastTool::DriverInformation => parse::DRIVER_COLUMNS,
            ErgastTool::RaceResult => parse::RACE_RESULT_COLUMNS,
            ErgastTool::DriverSeasonResults => parse::DRIVER_SEASON_COLUMNS,
            ErgastTool::RaceQualifying => parse::QUALIFYING_COLUMNS,
            ErgastTool::DriverLapTimes => parse::LAP_TIME_COLUMNS,
        }
    }

    pub fn spec(self) -> ToolSpec {
        let spec = ToolSpec::new(self.name());
        match self {
            ErgastTool::DriverStandings => spec
                .doc(
                    "Get the driver standings at the end of a season or after a specific round. \
                     If round is not given the standings at the end of the season are returned; \
                     for a season still running these are the current standings.",
                )
                .param::<i64>("season", SEASON_DOC)
                .optional("round", OPTIONAL_ROUND_DOC, 0_i64),
            ErgastTool::ConstructorStandings => spec
                .doc(
                    "Get the constructor standings at the end of a season or after a specific \
                     round. If round is not given the standings at the end of the season are \
                     returned.",
                )
                .param::<i64>("season", SEASON_DOC)
                .optional("round", OPTIONAL_ROUND_DOC, 0_i64),
            ErgastTool::SeasonInfo => spec
                .doc(&format!(
                    "Get the races of a season with round number, race name, date, circuit name \
                     and country. Use it to find the round number of a race. \
                     Available columns: {}. Only ask for the columns you need.",
                    self.columns().join(", ")
                ))
                .param::<i64>("season", SEASON_DOC)
                .param::<Vec<String>>("cols", "Columns to return"),
            ErgastTool::DriverInformation => spec
                .doc(&format!(
                    "Get driver information for all of F1 history, for a season, or for one round \
                     of a season. Use it to find the driver_id of a driver. Available columns: {}. \
                     Only ask for the columns you need.",
                    self.columns().join(", ")
                ))
                .param::<Vec<String>>("cols", "Columns to return")
                .optional("season", "The 4 digit year of the season. 0 means all seasons", 0_i64)
                .optional("round", OPTIONAL_ROUND_DOC, 0_i64),
            ErgastTool::RaceResult => spec
                .doc(
                    "Get the finishing order of a race with position, grid position, first name, \
                     last name, constructor, points, status, fastest lap number, fastest lap time \
                     and race time.",
                )
                .param::<i64>("season", SEASON_DOC)
                .param::<i64>("round", ROUND_DOC),
            ErgastTool::DriverSeasonResults => spec
                .doc(
                    "Get one driver's race results across a season with round, race name, \
                     finishing position and starting position. Do not guess driver_id; call \
                     get_driver_information if unsure.",
                )
                .param::<i64>("season", SEASON_DOC)
                .param::<String>("driver_id", "Ergast driver id, such as max_verstappen"),
            ErgastTool::RaceQualifying => spec
                .doc(
                    "Get the qualifying order of a race with position, first name, last name, \
                     constructor and Q1, Q2 and Q3 times. Q2 and Q3 are empty for drivers \
                     eliminated earlier.",
                )
                .param::<i64>("season", SEASON_DOC)
                .param::<i64>("round", ROUND_DOC),
            ErgastTool::DriverLapTimes => spec
                .doc("Get the lap number and lap time of every lap one driver completed in a race.")
                .param::<i64>("season", SEASON_DOC)
                .param::<i64>("round", ROUND_DOC)
                .param::<String>("driver", "Ergast driver id, such as alonso"),
        }
    }

    /// Resolve completed arguments into a resource path and column selection.
    pub fn request(self, args: Map<String, Value>) -> Result<ErgastRequest> {
        let name = self.name();
        let (segments, cols) = match self {
            ErgastTool::DriverStandings | ErgastTool::ConstructorStandings => {
                let args: StandingsArgs = typed_arguments(name, args)?;
                let resource = if self == ErgastTool::DriverStandings {
                    "driverStandings"
                } else {
                    "constructorStandings"
                };
                let mut segments = vec![args.season.to_string()];
                if args.round > 0 {
                    segments.push(args.round.to_string());
                }
                segments.push(resource.to_string());
                (segments, Vec::new())
            }
            ErgastTool::SeasonInfo => {
                let args: SeasonArgs = typed_arguments(name, args)?;
                (vec![args.season.to_string()], args.cols)
            }
            ErgastTool::DriverInformation => {
                let args: DriverInfoArgs = typed_arguments(name, args)?;
                let mut segments = Vec::new();
                if args.season > 0 {
                    segments.push(args.season.to_string());
                    if args.round > 0 {
                        segments.push(args.round.to_string());
                    }
                }
                segments.push("drivers".to_string());
                (segments, args.cols)
            }
            ErgastTool::RaceResult | ErgastTool::RaceQualifying => {
                let args: RaceArgs = typed_arguments(name, args)?;
                let resource = if self == ErgastTool::RaceResult {
                    "results"
                } else {
                    "qualifying"
                };
                (
                    vec![args.season.to_string(), args.round.to_string(), resource.to_string()],
                    Vec::new(),
                )
            }
            ErgastTool::DriverSeasonResults => {
                let args: DriverSeasonArgs = typed_arguments(name, args)?;
                (
                    vec![
                        args.season.to_string(),
                        "drivers".to_string(),
                        self.identifier(&args.driver_id)?,
                        "results".to_string(),
                    ],
                    Vec::new(),
                )
            }
            ErgastTool::DriverLapTimes => {
                let args: LapTimeArgs = typed_arguments(name, args)?;
                (
                    vec![
                        args.season.to_string(),
                        args.round.to_string(),
                        "drivers".to_string(),
                        self.identifier(&args.driver)?,
                        "laps".to_string(),
                    ],
                    Vec::new(),
                )
            }
        };

        self.check_columns(&cols)?;
        Ok(ErgastRequest { segments, cols })
    }

    /// Reshape a payload into this query's table.
    pub fn parse(self, payload: &Value) -> Result<Table> {
        match self {
            ErgastTool::DriverStandings => parse::driver_standings(payload),
            ErgastTool::ConstructorStandings => parse::constructor_standings(payload),
            ErgastTool::SeasonInfo => parse::season_schedule(payload),
            ErgastTool::DriverInformation => parse::drivers(payload),
            ErgastTool::RaceResult => parse::race_result(payload),
            ErgastTool::DriverSeasonResults => parse::driver_season_results(payload),
            ErgastTool::RaceQualifying => parse::qualifying(payload),
            ErgastTool::DriverLapTimes => parse::lap_times(payload),
        }
    }

    fn identifier(self, id: &str) -> Result<String> {
        let id = id.trim();
        if id.is_empty() {
            return Err(self.invalid("driver id must not be empty".to_string()));
        }
        Ok(id.to_lowercase())
    }

    fn check_columns(self, cols: &[String]) -> Result<()> {
        let available = self.columns();
        match cols.iter().find(|c| !available.contains(&c.as_str())) {
            Some(unknown) => Err(self.invalid(format!(
                "unknown column '{}', available columns are: {}",
                unknown,
                available.join(", ")
            ))),
            None => Ok(()),
        }
    }

    fn invalid(self, message: String) -> F1Error {
        F1Error::InvalidArguments {
            tool: self.name().to_string(),
            message,
        }
    }
}

/// Binds one Ergast query to a shared client.
pub struct ErgastToolHandler {
    client: Arc<ErgastClient>,
    tool: ErgastTool,
}

impl ErgastToolHandler {
    pub fn new(client: Arc<ErgastClient>, tool: ErgastTool) -> Self {
        Self { client, tool }
    }
}

#[async_trait]
impl DataTool for ErgastToolHandler {
    fn spec(&self) -> ToolSpec {
        self.tool.spec()
    }

    async fn fetch(&self, args: Map<String, Value>) -> Result<ToolOutput> {
        let request = self.tool.request(args)?;
        let payload = self.client.get(&request.segments).await?;

        let table = self.tool.parse(&payload)?;
        let table = table
            .select(&request.cols)
            .map_err(|message| self.tool.invalid(message))?;

        let (rows, cols) = table.shape();
        info!("{} returned {} rows x {} columns", self.tool.name(), rows, cols);
        Ok(table.into())
    }
}

/// One fetch handler per Ergast query, in a stable order.
pub fn ergast_tools(client: Arc<ErgastClient>) -> Vec<Handler> {
    ErgastTool::ALL
        .iter()
        .map(|&tool| Handler::Fetch(Arc::new(ErgastToolHandler::new(client.clone(), tool))))
        .collect()
}
