use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use inquire::Text;
use std::sync::Arc;
use tracing::debug;

use weatherlog_core::{
    Config, DailyWeatherView, DayView, Geocoder, HourView, Location, OpenMeteoGateway, RangeView,
    RecordStore, TemporalCache, WeatherService, gateway_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weatherlog",
    version,
    about = "Local weather record with on-demand provider fill"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively edit media paths, provider endpoints and logging.
    Configure,

    /// Manage known locations.
    Location {
        #[command(subcommand)]
        action: LocationCommand,
    },

    /// Show several days, optionally with the samples nearest to given times.
    Range {
        /// Location name, as registered with `location add`.
        location: String,

        /// First day (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Number of consecutive days.
        #[arg(long, default_value_t = 1)]
        days: u32,

        /// Time of day (HH:MM) to show for every day; repeatable.
        #[arg(long = "at", value_parser = parse_time)]
        at: Vec<NaiveTime>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show one day with every recorded hourly sample.
    Day {
        location: String,

        /// Day (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },

    /// Inspect and link weather codes.
    Codes {
        #[command(subcommand)]
        action: CodesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum LocationCommand {
    /// Register a location; coordinates are looked up by name when omitted.
    Add {
        name: String,
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },
    /// List registered locations.
    List,
}

#[derive(Debug, Subcommand)]
pub enum CodesCommand {
    /// List codes and what each one is displayed as.
    List,
    /// Display code `value` as code `to`; omit `--to` to clear the link.
    Link {
        value: i32,
        #[arg(long)]
        to: Option<i32>,
    },
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Command::Configure => configure(config),
            Command::Location { action } => {
                let store = open_store(&config)?;
                run_location(&store, &config, action).await?;
                save_store(&store)
            }
            Command::Codes { action } => {
                let store = open_store(&config)?;
                run_codes(&store, action)?;
                save_store(&store)
            }
            Command::Range {
                location,
                from,
                days,
                at,
                json,
            } => {
                let store = Arc::new(open_store(&config)?);
                let location = find_location(&store, &location)?;
                let service = service(&config, store.clone())?;
                let now = Utc::now();
                let start = from.unwrap_or_else(|| now.date_naive());

                let view = service
                    .build_range_with_times_view(&location, start, days, &at, now)
                    .await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print_range(&location, &view);
                }
                save_store(&store)
            }
            Command::Day { location, date, json } => {
                let store = Arc::new(open_store(&config)?);
                let location = find_location(&store, &location)?;
                let service = service(&config, store.clone())?;
                let now = Utc::now();
                let date = date.unwrap_or_else(|| now.date_naive());

                let daily = service
                    .get_range(&location, date, 1, now)
                    .await
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        anyhow!("No weather data available for {} on {date}", location.name)
                    })?;
                let view = service.build_daily_weather_view(&daily);
                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print_daily(&view);
                }
                save_store(&store)
            }
        }
    }
}

fn open_store(config: &Config) -> Result<RecordStore> {
    let path = config.store_file_path()?;
    debug!(path = %path.display(), "opening record store");
    RecordStore::open(&path)
        .with_context(|| format!("Failed to open record store: {}", path.display()))
}

fn save_store(store: &RecordStore) -> Result<()> {
    store.save().context("Failed to save record store")
}

type Service = WeatherService<RecordStore, OpenMeteoGateway<RecordStore>>;

fn service(config: &Config, store: Arc<RecordStore>) -> Result<Service> {
    let gateway = gateway_from_config(config, store.clone())?;
    Ok(WeatherService::new(store, gateway, config.media_paths()))
}

fn configure(mut config: Config) -> Result<()> {
    config.media_path = Text::new("Media path (filesystem prefix for icons):")
        .with_default(&config.media_path)
        .prompt()?;
    config.media_url = Text::new("Media URL (prefix stored in icon references):")
        .with_default(&config.media_url)
        .prompt()?;
    config.forecast_url = Text::new("Forecast endpoint:")
        .with_default(&config.forecast_url)
        .prompt()?;
    config.past_url = Text::new("Historical endpoint:")
        .with_default(&config.past_url)
        .prompt()?;
    config.location_url = Text::new("Geocoding endpoint:")
        .with_default(&config.location_url)
        .prompt()?;
    config.log_level = Text::new("Log level:")
        .with_default(&config.log_level)
        .prompt()?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn run_location(store: &RecordStore, config: &Config, action: LocationCommand) -> Result<()> {
    match action {
        LocationCommand::Add { name, lat, lon } => {
            if store.find_location_by_name(&name).is_some() {
                bail!("Location '{name}' already exists.");
            }
            let (lat, lon) = match (lat, lon) {
                (Some(lat), Some(lon)) => (lat, lon),
                (None, None) => geocode(config, &name).await?,
                _ => bail!("Give both --lat and --lon, or neither to look the name up."),
            };
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("Coordinates out of range: {lat}, {lon}");
            }
            let location = store.add_location(&name, lat, lon);
            println!("Added location #{} {}", location.id, location.name);
        }
        LocationCommand::List => {
            for location in store.locations() {
                println!(
                    "#{:<3} {:<24} {:>9.4} {:>9.4}",
                    location.id, location.name, location.latitude, location.longitude
                );
            }
        }
    }
    Ok(())
}

async fn geocode(config: &Config, name: &str) -> Result<(f64, f64)> {
    let place = Geocoder::new(config.location_url.clone())?
        .lookup(name)
        .await?
        .ok_or_else(|| {
            anyhow!(
                "No place named '{name}' found.\n\
                 Hint: pass the coordinates with `--lat <LAT> --lon <LON>`."
            )
        })?;

    match &place.country {
        Some(country) => println!("Found {}, {country}", place.name),
        None => println!("Found {}", place.name),
    }
    Ok((place.latitude, place.longitude))
}

fn run_codes(store: &RecordStore, action: CodesCommand) -> Result<()> {
    match action {
        CodesCommand::List => {
            for code in store.codes() {
                let shown = match store.resolve_code(Some(code.id)) {
                    Ok(Some(target)) if target.id != code.id => format!(" -> {}", target.value),
                    Ok(_) => String::new(),
                    Err(e) => format!(" -> error: {e}"),
                };
                let marker = if code.is_default { "*" } else { " " };
                println!("{marker}{:>5}  {}{shown}", code.value, code.description);
            }
        }
        CodesCommand::Link { value, to } => {
            let from = store
                .find_code_by_value(value)
                .ok_or_else(|| anyhow!("Unknown code value {value}"))?;
            let to = to
                .map(|v| {
                    store
                        .find_code_by_value(v)
                        .ok_or_else(|| anyhow!("Unknown code value {v}"))
                })
                .transpose()?;
            store.link_code(from.id, to.as_ref().map(|c| c.id))?;
            match to {
                Some(target) => println!("Code {value} is now displayed as {}", target.value),
                None => println!("Code {value} is displayed as itself"),
            }
        }
    }
    Ok(())
}

fn find_location(store: &RecordStore, name: &str) -> Result<Location> {
    store.find_location_by_name(name).ok_or_else(|| {
        anyhow!(
            "Unknown location '{name}'.\n\
             Hint: run `weatherlog location add {name}` first."
        )
    })
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("'{value}' is not a time of day (expected HH:MM)"))
}

fn print_range(location: &Location, view: &RangeView) {
    if view.days.is_empty() {
        println!("No weather data available for {}.", location.name);
        return;
    }

    println!("{}", location.name);
    for entry in &view.days {
        print_day_line(&entry.day);
        for hour in entry.times.iter().flatten() {
            print_hour_line(hour);
        }
    }
}

fn print_daily(view: &DailyWeatherView) {
    if let Some(location) = &view.day.location {
        println!("{}", location.name);
    }
    print_day_line(&view.day);
    for hour in &view.hours {
        print_hour_line(hour);
    }
}

fn print_day_line(day: &DayView) {
    let condition = day.code.as_ref().map(|c| c.description.as_str()).unwrap_or("-");
    println!(
        "{}  {:>5.1} .. {:>5.1} °C  {condition}",
        day.date, day.min_temperature, day.max_temperature
    );
}

fn print_hour_line(hour: &HourView) {
    let condition = hour.code.as_ref().map(|c| c.description.as_str()).unwrap_or("-");
    println!(
        "    {}  {:>5.1} °C  {condition}",
        hour.time.format("%H:%M"),
        hour.temperature
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn range_accepts_repeated_times() {
        let cli = Cli::try_parse_from([
            "weatherlog",
            "range",
            "Paris",
            "--from",
            "2024-05-01",
            "--days",
            "3",
            "--at",
            "09:00",
            "--at",
            "15:30",
        ])
        .unwrap();

        match cli.command {
            Command::Range { location, from, days, at, json } => {
                assert_eq!(location, "Paris");
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 5, 1));
                assert_eq!(days, 3);
                assert_eq!(
                    at,
                    vec![
                        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                        NaiveTime::from_hms_opt(15, 30, 0).unwrap()
                    ]
                );
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_time_is_rejected() {
        let err =
            Cli::try_parse_from(["weatherlog", "range", "Paris", "--at", "noon"]).unwrap_err();
        assert!(err.to_string().contains("expected HH:MM"));
    }

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::try_parse_from([
            "weatherlog", "location", "add", "Lima", "--lat", "-12.05", "--lon", "-77.04",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Command::Location { action: LocationCommand::Add { lat, .. } } if lat == Some(-12.05)
        ));
    }

    #[test]
    fn coordinates_are_optional_but_paired() {
        let cli = Cli::try_parse_from(["weatherlog", "location", "add", "Lima"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Location { action: LocationCommand::Add { lat: None, lon: None, .. } }
        ));

        let err = Cli::try_parse_from(["weatherlog", "location", "add", "Lima", "--lat", "1"])
            .unwrap_err();
        assert!(err.to_string().contains("--lon"));
    }

    #[test]
    fn codes_link_round_trip_through_store() {
        let store = RecordStore::in_memory();
        store.add_code(116, "Partly cloudy", "media/weather/116.png", true);
        store.add_code(2, "Clouds", "media/weather/clouds.png", false);

        run_codes(&store, CodesCommand::Link { value: 116, to: Some(2) }).unwrap();
        assert_eq!(
            store.find_code_by_value(116).unwrap().associated_code,
            Some(weatherlog_core::CodeId(1))
        );

        run_codes(&store, CodesCommand::Link { value: 116, to: None }).unwrap();
        assert_eq!(store.find_code_by_value(116).unwrap().associated_code, None);
    }

    #[tokio::test]
    async fn duplicate_location_is_refused() {
        let store = RecordStore::in_memory();
        store.add_location("Paris", 48.85, 2.35);

        let action = LocationCommand::Add {
            name: "paris".into(),
            lat: Some(1.0),
            lon: Some(1.0),
        };
        let err = run_location(&store, &Config::default(), action).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn explicit_coordinates_skip_the_lookup() {
        let store = RecordStore::in_memory();
        let config = Config {
            location_url: "http://127.0.0.1:9/unreachable".into(),
            ..Config::default()
        };

        let action = LocationCommand::Add {
            name: "Lima".into(),
            lat: Some(-12.05),
            lon: Some(-77.04),
        };
        run_location(&store, &config, action).await.unwrap();

        let lima = store.find_location_by_name("Lima").unwrap();
        assert_eq!((lima.latitude, lima.longitude), (-12.05, -77.04));
    }

    #[test]
    fn unknown_location_hints_at_location_add() {
        let store = RecordStore::in_memory();
        let err = find_location(&store, "Oslo").unwrap_err();

        assert!(err.to_string().contains("weatherlog location add Oslo"));
    }

    #[test]
    fn parse_time_accepts_seconds() {
        assert_eq!(parse_time("06:15:30"), Ok(NaiveTime::from_hms_opt(6, 15, 30).unwrap()));
    }
}
