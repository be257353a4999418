use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};
use whatweather_core::{Format, NormalizedResponse, render};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes rendered responses under `<root>/<format subdir>/`.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, format: Format) -> PathBuf {
        self.root.join(format.subdir())
    }

    pub fn ensure_dirs(&self, formats: &[Format]) -> Result<()> {
        for format in formats {
            let dir = self.dir_for(*format);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// `<name>_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn file_name(name: &str, format: Format, at: DateTime<Local>) -> String {
        format!("{name}_{}.{}", at.format(STAMP_FORMAT), format.extension())
    }

    /// Render `resp` once per format and write each file. All files of one
    /// call share the same timestamp.
    pub fn save(
        &self,
        resp: &NormalizedResponse,
        name: &str,
        title: &str,
        formats: &[Format],
    ) -> Result<Vec<(Format, PathBuf)>> {
        self.save_at(resp, name, title, formats, Local::now())
    }

    pub fn save_at(
        &self,
        resp: &NormalizedResponse,
        name: &str,
        title: &str,
        formats: &[Format],
        at: DateTime<Local>,
    ) -> Result<Vec<(Format, PathBuf)>> {
        self.ensure_dirs(formats)?;

        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            let bytes = render(*format, resp, title)
                .with_context(|| format!("Failed to render {name} as {format}"))?;

            let path = self.dir_for(*format).join(Self::file_name(name, *format, at));
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;

            tracing::debug!(path = %path.display(), %format, "wrote output");
            written.push((*format, path));
        }

        Ok(written)
    }
}

/// Formats to write for one response: JSON always, the spreadsheet for
/// timeseries sources unless the caller picked formats explicitly.
pub fn formats_for(requested: &[Format], timeseries: bool) -> Vec<Format> {
    let mut formats = vec![Format::Json];

    if requested.is_empty() {
        if timeseries {
            formats.push(Format::Xlsx);
        }
        return formats;
    }

    for format in requested {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }
    formats
}

/// Label used in the progress lines.
pub fn format_label(format: Format) -> &'static str {
    match format {
        Format::Json => "JSON",
        Format::Html => "HTML",
        Format::Xlsx => "Excel",
        Format::Yaml => "YAML",
        Format::Text => "Text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 9, 5, 7).unwrap()
    }

    #[test]
    fn file_names_are_timestamped() {
        assert_eq!(
            OutputWriter::file_name("tide", Format::Xlsx, at()),
            "tide_20240601_090507.xlsx"
        );
        assert_eq!(
            OutputWriter::file_name("nowcast", Format::Text, at()),
            "nowcast_20240601_090507.txt"
        );
    }

    #[test]
    fn save_writes_into_format_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("outputs"));
        let resp = NormalizedResponse::from_payload(json!({ "place": "Tromsø" }));

        let written = writer
            .save_at(&resp, "search", "Search", &[Format::Json, Format::Yaml], at())
            .unwrap();

        assert_eq!(written.len(), 2);
        let json_path = dir.path().join("outputs/json/search_20240601_090507.json");
        assert_eq!(written[0], (Format::Json, json_path.clone()));

        // pretty printed, non-ASCII kept as-is
        let body = fs::read_to_string(&json_path).unwrap();
        assert!(body.contains("\n  \"place\": \"Tromsø\""));

        assert!(dir.path().join("outputs/yaml/search_20240601_090507.yaml").exists());
        assert!(!dir.path().join("outputs/excel").exists());
    }

    #[test]
    fn default_formats_depend_on_shape() {
        assert_eq!(formats_for(&[], true), vec![Format::Json, Format::Xlsx]);
        assert_eq!(formats_for(&[], false), vec![Format::Json]);
        assert_eq!(
            formats_for(&[Format::Html, Format::Json, Format::Html], false),
            vec![Format::Json, Format::Html]
        );
    }
}
