use chrono::{DurationRound, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use energy_forecast::{
    demo_consumption, evaluate_models, load_consumption_csv, merge_weather, prepare,
    records_frame, render_markdown, scores_frame, write_csv, EnergyError, Forecaster, HourlyWeather, PrepError, Profile, ProfileStore,
    SeasonalNaive, Settings, SqliteProfileStore, WeatherClient,
};
use log::info;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

#[derive(Parser)]
#[command(name = "energy-forecast")]
#[command(about = "Prepare household energy data and fetch cached weather")]
struct Cli {
    /// Settings YAML (defaults to config/settings.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write synthetic hourly consumption ending at the current hour
    DemoData {
        #[arg(long, default_value_t = 30)]
        days: u32,

        #[arg(long, default_value = "data/sample_consumption.csv")]
        output: PathBuf,

        /// Seed for reproducible noise
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Resample a consumption CSV and write model-ready artifacts
    Prepare {
        /// CSV with `timestamp` and `consumption` columns
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,

        /// Timezone, e.g. Europe/Budapest
        #[arg(long)]
        tz: Option<String>,

        /// Context window size
        #[arg(long)]
        window: Option<usize>,

        /// Forecast horizon in steps
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Geocode a location and download historical and forecast weather
    Weather {
        /// City or postcode
        #[arg(long)]
        location: String,

        /// Start date YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// End date YYYY-MM-DD
        #[arg(long)]
        end: String,

        /// Forecast days
        #[arg(long, default_value_t = 3)]
        days: u32,

        /// Output CSV for the historical series
        #[arg(long, default_value = "artifacts/weather.csv")]
        output: PathBuf,

        /// Consumption CSV to join the historical weather onto
        #[arg(long)]
        consumption: Option<PathBuf>,
    },
    /// Fit a seasonal naive forecaster and save it
    Train {
        #[arg(long)]
        data: PathBuf,

        #[arg(long, default_value_t = 24)]
        season: usize,

        #[arg(long, default_value = "artifacts/seasonal_naive.bin")]
        output: PathBuf,
    },
    /// Score forecasters on the tail of a split CSV
    Evaluate {
        /// CSV test split
        #[arg(long)]
        data: PathBuf,

        #[arg(long, default_value_t = 24)]
        horizon: usize,

        /// Season length used when no saved model is given
        #[arg(long, default_value_t = 24)]
        season: usize,

        /// Saved seasonal naive model
        #[arg(long)]
        model: Option<PathBuf>,

        #[arg(long, default_value = "artifacts/reports")]
        output: PathBuf,
    },
    /// Manage household profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create or update a profile, geocoding its location
    Set {
        #[arg(long)]
        user: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        location: String,

        #[arg(long)]
        area_m2: f64,

        #[arg(long)]
        occupants: u32,

        #[arg(long)]
        heating: Option<String>,
    },
    /// Print a stored profile
    Show {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), EnergyError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?
        .with_database_url(std::env::var("DATABASE_URL").ok());

    match cli.command {
        Commands::DemoData { days, output, seed } => {
            let now = Utc::now();
            let hour = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
            let records = demo_consumption(days, hour - TimeDelta::days(i64::from(days)), seed);
            write_csv(records_frame(&records)?, &output).await?;
            println!("Demo data saved to {}", output.display());
        }
        Commands::Prepare {
            input,
            output_dir,
            tz,
            window,
            horizon,
        } => {
            let timezone = match tz {
                Some(name) => Some(energy_forecast::parse_timezone(&name)?),
                None => settings.timezone()?,
            };
            let mut prep = settings.prep.clone();
            prep.window.window = window.unwrap_or(prep.window.window);
            prep.window.horizon = horizon.unwrap_or(prep.window.horizon);

            let records = load_consumption_csv(&input, timezone)?;
            let dataset = prepare(&records, &prep, timezone)?;
            let paths = dataset.write_artifacts(&output_dir, prep.split).await?;

            println!("Baseline features -> {}", paths.baseline.display());
            println!("Transformer windows -> {}", paths.windows.display());
            println!("Splits saved to {}", output_dir.display());
        }
        Commands::Weather {
            location,
            start,
            end,
            days,
            output,
            consumption,
        } => {
            let client = weather_client(&settings).await?;
            let place = client
                .geocode(&location)
                .await?
                .ok_or_else(|| EnergyError::LocationNotFound(location.clone()))?;
            info!(
                "Resolved '{}' to {} ({}, {})",
                location, place.name, place.latitude, place.longitude
            );

            let historical = client
                .historical()
                .latitude(place.latitude)
                .longitude(place.longitude)
                .start(start)
                .end(end)
                .call()
                .await?;
            let forecast = client
                .forecast()
                .latitude(place.latitude)
                .longitude(place.longitude)
                .days(days)
                .call()
                .await?;

            let weather = HourlyWeather::from_payload(&historical)?;
            let frame = weather.to_dataframe().map_err(PrepError::from)?;
            write_csv(frame, &output).await?;
            println!("Historical saved to {}", output.display());

            if let Some(path) = consumption {
                let records = load_consumption_csv(&path, settings.timezone()?)?;
                let merged = merge_weather(&records, &weather, TimeDelta::hours(1));
                let matched = merged
                    .iter()
                    .filter(|r| r.weather.values().any(Option::is_some))
                    .count();
                println!("Matched weather for {}/{} readings", matched, merged.len());
            }

            let keys: Vec<&str> = forecast
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            println!("Forecast sample keys: {:?}", keys);
        }
        Commands::Train {
            data,
            season,
            output,
        } => {
            let records = load_consumption_csv(&data, settings.timezone()?)?;
            let dataset = prepare(&records, &settings.prep, settings.timezone()?)?;
            let mut model = SeasonalNaive::new(season)?;
            model.fit(&dataset.baseline, dataset.baseline.targets())?;
            model.save(&output)?;
            println!("Model saved to {}", output.display());
        }
        Commands::Evaluate {
            data,
            horizon,
            season,
            model,
            output,
        } => {
            let model = match model {
                Some(path) => SeasonalNaive::load(&path)?,
                None => SeasonalNaive::new(season)?,
            };
            let records = load_consumption_csv(&data, settings.timezone()?)?;
            let series: Vec<f64> = records.iter().map(|r| r.consumption).collect();

            let models: [(&str, &dyn Forecaster); 1] = [("seasonal_naive", &model)];
            let scores = evaluate_models(&models, &series, horizon)?;

            write_csv(scores_frame(&scores)?, &output.join("metrics.csv")).await?;
            let report_path = output.join("metrics.md");
            tokio::fs::write(&report_path, render_markdown(&scores))
                .await
                .map_err(|e| PrepError::Io(report_path.clone(), e))?;
            println!("Reports saved to {}", output.display());
        }
        Commands::Profile { action } => {
            let store = SqliteProfileStore::open(&settings.db_url)?;
            match action {
                ProfileAction::Set {
                    user,
                    name,
                    location,
                    area_m2,
                    occupants,
                    heating,
                } => {
                    let client = weather_client(&settings).await?;
                    let place = client
                        .geocode(&location)
                        .await?
                        .ok_or_else(|| EnergyError::LocationNotFound(location.clone()))?;
                    store.upsert_user(&user, name.as_deref())?;
                    store.upsert(&Profile {
                        user_id: user.clone(),
                        location_text: location,
                        lat: place.latitude,
                        lon: place.longitude,
                        area_m2,
                        occupants,
                        heating_type: heating,
                    })?;
                    println!("Profile saved for {}", user);
                }
                ProfileAction::Show { user } => match store.get(&user)? {
                    Some(profile) => println!("{:#?}", profile),
                    None => println!("No profile for {}", user),
                },
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings, EnergyError> {
    let default_path = Path::new(DEFAULT_SETTINGS_PATH);
    let settings = match path {
        Some(path) => Settings::load(path)?,
        None if default_path.is_file() => Settings::load(default_path)?,
        None => Settings::default(),
    };
    Ok(settings)
}

async fn weather_client(settings: &Settings) -> Result<WeatherClient, EnergyError> {
    let client = WeatherClient::open(
        settings.open_meteo.clone(),
        settings.weather_cache.clone(),
        settings.retry.policy()?,
    )
    .await?;
    Ok(client)
}
