use anyhow::Result;
use whatweather_core::{
    Config, Coordinates, FetchRequest, Format, Nominatim, NormalizedResponse, SourceId,
    source_from_config,
};

use crate::output::{OutputWriter, format_label, formats_for};

const WIDTH: usize = 80;
const GEOCODE_QUERY: &str = "Bergen, Norway";
const GEOCODE_LIMIT: u32 = 3;

/// Outcome of a collection run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub saved: usize,
    /// `(name, message)` for every response that came back as an error.
    pub failed: Vec<(String, String)>,
}

impl Summary {
    fn record(&mut self, name: &str, resp: &NormalizedResponse) {
        match resp.error() {
            Some(message) => self.failed.push((name.to_string(), message.to_string())),
            None => self.saved += 1,
        }
    }
}

/// Fetches every source in turn and writes each response to disk.
#[derive(Debug)]
pub struct Collector {
    config: Config,
    writer: OutputWriter,
    formats: Vec<Format>,
    location: Coordinates,
}

impl Collector {
    pub fn new(config: Config, formats: Vec<Format>, location: Coordinates) -> Self {
        let writer = OutputWriter::new(config.output_dir.clone());
        Self {
            config,
            writer,
            formats,
            location,
        }
    }

    pub async fn run(&self) -> Result<Summary> {
        print_banner("Norwegian Coastal Weather Data Collector");

        let mut summary = Summary::default();
        let request = FetchRequest::from_config(&self.config).at(self.location);
        let mut step = 0;

        for id in SourceId::all() {
            step += 1;
            println!("{step}. Fetching {}...", id.title());

            let source = source_from_config(*id, &self.config)?;
            let resp = source.fetch(&request).await;
            self.save(&resp, id.as_str(), id.title(), id.is_timeseries())?;
            report(&resp, id.title());
            summary.record(id.as_str(), &resp);
        }

        step += 1;
        println!("{step}. Fetching Nominatim geocoding data...");
        let nominatim = Nominatim::new(&self.config)?;

        let name = format!("nominatim_search_{}", slug(GEOCODE_QUERY));
        let resp = nominatim.search(GEOCODE_QUERY, GEOCODE_LIMIT).await;
        self.save(&resp, &name, &format!("Nominatim Search: {GEOCODE_QUERY}"), false)?;
        summary.record(&name, &resp);

        let resp = nominatim.reverse(self.location).await;
        self.save(&resp, "nominatim_reverse", &format!("Nominatim Reverse: {}", self.location), false)?;
        summary.record("nominatim_reverse", &resp);
        report(&resp, "Nominatim");

        println!("{}", "=".repeat(WIDTH));
        println!("{:^WIDTH$}", "Data collection complete!");
        let root = std::path::absolute(self.writer.root()).unwrap_or_else(|_| self.writer.root().to_path_buf());
        println!("{:^WIDTH$}", format!("Outputs saved to: {}", root.display()));
        println!("{}\n", "=".repeat(WIDTH));

        Ok(summary)
    }

    pub fn save(&self, resp: &NormalizedResponse, name: &str, title: &str, timeseries: bool) -> Result<()> {
        save_and_print(&self.writer, resp, name, title, &formats_for(&self.formats, timeseries))
    }
}

pub fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(WIDTH));
    println!("{title:^WIDTH$}");
    println!("{}\n", "=".repeat(WIDTH));
}

/// Write `resp` in every format and print one line per file.
pub fn save_and_print(
    writer: &OutputWriter,
    resp: &NormalizedResponse,
    name: &str,
    title: &str,
    formats: &[Format],
) -> Result<()> {
    println!("  Saving {name} output...");
    for (format, path) in writer.save(resp, name, title, formats)? {
        println!("    ✓ {}: {}", format_label(format), path.display());
    }
    Ok(())
}

fn report(resp: &NormalizedResponse, label: &str) {
    match resp.error() {
        Some(message) => println!("  ✗ {label} returned an error: {message}\n"),
        None => println!("  ✓ {label} data collected\n"),
    }
}

/// File-name friendly form of a geocoding query: its first comma-separated
/// part, lowercased, with anything but letters and digits turned into `_`.
pub fn slug(query: &str) -> String {
    let head = query.split(',').next().unwrap_or_default().trim();
    let slug: String = head
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    if slug.is_empty() { "query".to_string() } else { slug }
}
