use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use whatweather_core::{
    Config, Coordinates, FetchRequest, Format, Nominatim, SourceId, WeatherSource,
    generate_tide_series, source::tide::{KartverketTide, tide_station_code}, source_from_config,
    synthetic::SEA_LEVEL_KEY,
};

use crate::{
    collect::{Collector, print_banner, save_and_print, slug},
    output::{OutputWriter, formats_for},
};

/// Upper bounds for the user-supplied window lengths.
const MAX_SAMPLE_HOURS: i64 = 24 * 366;
const MAX_TIDE_DAYS: i64 = 366;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "whatweather",
    version,
    about = "Collect Norwegian coastal weather data and save it as JSON, HTML, Excel, YAML or text"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every source and save the results.
    Collect {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch a single source.
    Fetch {
        /// Source name, e.g. "locationforecast" or "tide".
        source: String,

        #[command(flatten)]
        location: LocationArgs,

        /// Metres above sea level (locationforecast only).
        #[arg(long)]
        altitude: Option<i32>,

        /// Textforecast language: nb, nn or en.
        #[arg(long)]
        language: Option<String>,

        /// Tide prediction window in days.
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=MAX_TIDE_DAYS))]
        days: Option<u32>,

        /// Named tide station, e.g. "bergen" (tide only).
        #[arg(long)]
        station: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Look up places with Nominatim.
    Geocode {
        #[command(subcommand)]
        command: GeocodeCommand,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print synthetic tide heights without touching the network.
    TideSample {
        /// Number of hours after now to cover.
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(..=MAX_SAMPLE_HOURS))]
        hours: u32,
    },

    /// Interactively edit the configuration file.
    Configure,
}

#[derive(Debug, Subcommand)]
pub enum GeocodeCommand {
    /// Place name to coordinates.
    Search {
        query: String,

        #[arg(long, default_value_t = 5)]
        limit: u32,
    },

    /// Coordinates to place name.
    Reverse {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude; defaults to the configured location.
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude; defaults to the configured location.
    #[arg(long, allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> Coordinates {
        let fallback = config.default_location;
        Coordinates::new(self.lat.unwrap_or(fallback.lat), self.lon.unwrap_or(fallback.lon))
    }
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Extra formats to write (comma separated): json, html, xlsx, yaml, text.
    /// JSON is always written.
    #[arg(long, value_delimiter = ',', value_parser = parse_format)]
    formats: Vec<Format>,
}

fn parse_format(value: &str) -> Result<Format, String> {
    Format::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Collect { location, output } => {
                let location = location.resolve(&config);
                let summary = Collector::new(config, output.formats, location).run().await?;

                for (name, message) in &summary.failed {
                    tracing::warn!(source = %name, %message, "source returned an error");
                }
                tracing::info!(saved = summary.saved, failed = summary.failed.len(), "collection finished");
            }
            Command::Fetch {
                source,
                location,
                altitude,
                language,
                days,
                station,
                output,
            } => {
                let id = SourceId::try_from(source.as_str())?;

                let mut request = FetchRequest::from_config(&config).at(location.resolve(&config));
                request.altitude = altitude;
                if let Some(language) = language {
                    request.language = language;
                }
                if let Some(days) = days {
                    request.days_ahead = days;
                }

                let source = build_source(id, &config, station)?;
                println!("Fetching {}...", id.title());
                let resp = source.fetch(&request).await;

                let writer = OutputWriter::new(&config.output_dir);
                save_and_print(
                    &writer,
                    &resp,
                    id.as_str(),
                    id.title(),
                    &formats_for(&output.formats, id.is_timeseries()),
                )?;
                if let Some(error) = resp.error() {
                    println!("  ✗ {error}");
                }
            }
            Command::Geocode { command, output } => {
                let nominatim = Nominatim::new(&config)?;
                let writer = OutputWriter::new(&config.output_dir);
                let formats = formats_for(&output.formats, false);

                let (resp, name, title) = match command {
                    GeocodeCommand::Search { query, limit } => (
                        nominatim.search(&query, limit).await,
                        format!("nominatim_search_{}", slug(&query)),
                        format!("Nominatim Search: {query}"),
                    ),
                    GeocodeCommand::Reverse { lat, lon } => {
                        let coords = Coordinates::new(lat, lon);
                        (
                            nominatim.reverse(coords).await,
                            "nominatim_reverse".to_string(),
                            format!("Nominatim Reverse: {coords}"),
                        )
                    }
                };

                save_and_print(&writer, &resp, &name, &title, &formats)?;
                if let Some(error) = resp.error() {
                    println!("  ✗ {error}");
                }
            }
            Command::TideSample { hours } => print_tide_sample(hours)?,
            Command::Configure => configure(config)?,
        }

        Ok(())
    }
}

fn build_source(id: SourceId, config: &Config, station: Option<String>) -> Result<Box<dyn WeatherSource>> {
    match (id, station) {
        (SourceId::Tide, Some(station)) => {
            if tide_station_code(&station).is_none() {
                tracing::warn!(%station, "not a known tide station, keeping it as a label only");
            }
            Ok(Box::new(KartverketTide::new(config)?.with_station(station)))
        }
        (_, Some(_)) => anyhow::bail!("--station only applies to the tide source"),
        (id, None) => Ok(source_from_config(id, config)?),
    }
}

fn sample_window_end(from: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|span| from.checked_add_signed(span))
        .with_context(|| format!("A {hours}-hour sample window is out of range"))
}

fn print_tide_sample(hours: u32) -> Result<()> {
    let from = Utc::now();
    let to = sample_window_end(from, hours)?;

    print_banner("Sample Tide Predictions (synthetic)");
    println!("{:<28}{:>12}", "Time", "Height (cm)");
    println!("{}", "-".repeat(40));
    for entry in generate_tide_series(from, to) {
        let height = entry.detail(SEA_LEVEL_KEY).unwrap_or_default();
        println!("{:<28}{height:>12.1}", entry.time.unwrap_or_default());
    }
    Ok(())
}

fn configure(mut config: Config) -> Result<()> {
    let user_agent = inquire::Text::new("User agent sent to the APIs:")
        .with_default(&config.user_agent)
        .prompt()
        .context("Failed to read user agent")?;

    let lat = inquire::CustomType::<f64>::new("Default latitude:")
        .with_default(config.default_location.lat)
        .prompt()
        .context("Failed to read latitude")?;

    let lon = inquire::CustomType::<f64>::new("Default longitude:")
        .with_default(config.default_location.lon)
        .prompt()
        .context("Failed to read longitude")?;

    let api_key = inquire::Password::new("BarentsWatch API key (leave empty for none):")
        .without_confirmation()
        .prompt_skippable()
        .context("Failed to read API key")?;

    config.user_agent = user_agent;
    config.default_location = Coordinates::new(lat, lon);
    config.set_barentswatch_api_key(api_key);

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
