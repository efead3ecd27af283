//! Crop job files
//!
//! A job file is a TOML document naming the input, the output root, the
//! reference space and the boxes, plus optional run settings:
//!
//! ```toml
//! input = "slide.tiff"
//! output = "out"
//! dispatch = "parallel"
//! channels = "fit"
//! compression = "deflate"
//! bigtiff = false
//! resize = 1.2
//! segments = [[100, 100, 200, 200], "0,0,50,50"]
//!
//! [reference]
//! width = 1000
//! height = 1000
//! ```
//!
//! Every value can also come from the command line; command line values
//! win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::compression::CompressionFactory;
use crate::crop::DispatchMode;
use crate::errors::{CropError, CropResult};
use crate::output::{ChannelPolicy, TiffWriterOptions};
use crate::segmentation::{ImageSegmentation, Segment};

/// Settings of one crop run, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropJob {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Reference `(width, height)` the segments are defined in
    pub reference: Option<(u32, u32)>,
    pub segments: Vec<Segment>,
    pub dispatch: Option<DispatchMode>,
    pub channels: Option<ChannelPolicy>,
    /// Compression name for output containers
    pub compression: Option<String>,
    pub big_tiff: Option<bool>,
    /// Factor every box is resized by around its centre
    pub resize: Option<f64>,
}

/// A complete job, ready to run
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub segmentation: ImageSegmentation,
    pub dispatch: DispatchMode,
    pub channels: ChannelPolicy,
    pub writer_options: TiffWriterOptions,
}

impl CropJob {
    /// Read a job file
    pub fn load(path: &Path) -> CropResult<Self> {
        info!("Loading job file {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            CropError::ConfigError(msg) => CropError::ConfigError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse the TOML text of a job file
    pub fn parse(content: &str) -> CropResult<Self> {
        let value: toml::Value = content.parse()
            .map_err(|e: toml::de::Error| CropError::ConfigError(e.to_string()))?;
        let table = value.as_table()
            .ok_or_else(|| CropError::ConfigError("job file is not a table".to_string()))?;

        let mut job = CropJob {
            input: optional_str(table, "input")?.map(PathBuf::from),
            output: optional_str(table, "output")?.map(PathBuf::from),
            compression: optional_str(table, "compression")?.map(str::to_string),
            ..CropJob::default()
        };

        if let Some(dispatch) = optional_str(table, "dispatch")? {
            job.dispatch = Some(dispatch.parse()?);
        }
        if let Some(channels) = optional_str(table, "channels")? {
            job.channels = Some(channels.parse()?);
        }
        if let Some(big_tiff) = table.get("bigtiff") {
            job.big_tiff = Some(big_tiff.as_bool()
                .ok_or_else(|| CropError::ConfigError("bigtiff must be true or false".to_string()))?);
        }
        if let Some(resize) = table.get("resize") {
            job.resize = Some(as_number(resize)
                .ok_or_else(|| CropError::ConfigError("resize must be a number".to_string()))?);
        }

        if let Some(reference) = table.get("reference") {
            job.reference = Some(parse_reference(reference)?);
        }

        if let Some(segments) = table.get("segments") {
            let segments = segments.as_array()
                .ok_or_else(|| CropError::ConfigError("segments must be an array".to_string()))?;
            for (index, segment) in segments.iter().enumerate() {
                job.segments.push(parse_segment(segment).map_err(|e| {
                    CropError::ConfigError(format!("segment {}: {}", index, e))
                })?);
            }
        }

        debug!("Parsed job: {:?}", job);
        Ok(job)
    }

    /// Overlay `overrides` on this job; set values in `overrides` win
    ///
    /// Segments given in `overrides` replace the job's segments entirely.
    pub fn merge(self, overrides: CropJob) -> CropJob {
        CropJob {
            input: overrides.input.or(self.input),
            output: overrides.output.or(self.output),
            reference: overrides.reference.or(self.reference),
            segments: if overrides.segments.is_empty() { self.segments } else { overrides.segments },
            dispatch: overrides.dispatch.or(self.dispatch),
            channels: overrides.channels.or(self.channels),
            compression: overrides.compression.or(self.compression),
            big_tiff: overrides.big_tiff.or(self.big_tiff),
            resize: overrides.resize.or(self.resize),
        }
    }

    /// Check the job is complete and build its segmentation
    pub fn resolve(self) -> CropResult<ResolvedJob> {
        let input = self.input.ok_or_else(|| missing("input"))?;
        let output = self.output.ok_or_else(|| missing("output"))?;
        let (width, height) = self.reference.ok_or_else(|| missing("reference"))?;

        let mut segmentation = ImageSegmentation::new(width, height)?;
        for segment in self.segments {
            segmentation.push(segment)?;
        }
        if let Some(factor) = self.resize {
            segmentation = segmentation.resized(factor)?;
        }

        let compression = match &self.compression {
            Some(name) => CompressionFactory::get_handler_by_name(name)?.code(),
            None => TiffWriterOptions::default().compression,
        };

        Ok(ResolvedJob {
            input,
            output,
            segmentation,
            dispatch: self.dispatch.unwrap_or_default(),
            channels: self.channels.unwrap_or_default(),
            writer_options: TiffWriterOptions {
                big_tiff: self.big_tiff.unwrap_or(false),
                compression,
                ..TiffWriterOptions::default()
            },
        })
    }
}

fn missing(key: &str) -> CropError {
    CropError::ConfigError(format!("no {} given on the command line or in the job file", key))
}

fn optional_str<'a>(table: &'a toml::value::Table, key: &str) -> CropResult<Option<&'a str>> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value.as_str()
            .map(Some)
            .ok_or_else(|| CropError::ConfigError(format!("{} must be a string", key))),
    }
}

fn as_number(value: &toml::Value) -> Option<f64> {
    value.as_float().or_else(|| value.as_integer().map(|i| i as f64))
}

/// `[reference]` table with `width` and `height`, or a `"WxH"` string
fn parse_reference(value: &toml::Value) -> CropResult<(u32, u32)> {
    if let Some(text) = value.as_str() {
        return super::parse_dimensions(text);
    }

    let dimension = |key: &str| -> CropResult<u32> {
        value.get(key)
            .and_then(|v| v.as_integer())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| CropError::ConfigError(format!("reference.{} must be a non-negative integer", key)))
    };

    Ok((dimension("width")?, dimension("height")?))
}

/// `[x1, y1, x2, y2]` array or `"x1,y1,x2,y2"` string
fn parse_segment(value: &toml::Value) -> CropResult<Segment> {
    if let Some(text) = value.as_str() {
        return Segment::from_string(text);
    }

    let coordinates: Vec<f64> = value.as_array()
        .ok_or_else(|| CropError::ConfigError("expected an array of four numbers".to_string()))?
        .iter()
        .map(as_number)
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| CropError::ConfigError("coordinates must be numbers".to_string()))?;

    match coordinates.as_slice() {
        &[x1, y1, x2, y2] => Ok(Segment::new(x1, y1, x2, y2)),
        other => Err(CropError::ConfigError(format!("expected 4 coordinates, got {}", other.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::compression;

    const JOB: &str = r#"
input = "slide.tiff"
output = "out"
dispatch = "parallel"
channels = "fit"
compression = "zstd"
resize = 2
segments = [[100, 100, 200, 200], "0,0,50.5,50"]

[reference]
width = 1000
height = 800
"#;

    #[test]
    fn parses_a_full_job() {
        let job = CropJob::parse(JOB).unwrap();
        assert_eq!(job.input, Some(PathBuf::from("slide.tiff")));
        assert_eq!(job.reference, Some((1000, 800)));
        assert_eq!(job.dispatch, Some(DispatchMode::Parallel));
        assert_eq!(job.channels, Some(ChannelPolicy::Fit));
        assert_eq!(job.resize, Some(2.0));
        assert_eq!(job.segments, vec![
            Segment::new(100.0, 100.0, 200.0, 200.0),
            Segment::new(0.0, 0.0, 50.5, 50.0),
        ]);
    }

    #[test]
    fn command_line_values_win() {
        let job = CropJob::parse(JOB).unwrap();
        let overrides = CropJob {
            output: Some(PathBuf::from("elsewhere")),
            dispatch: Some(DispatchMode::Serialized),
            ..CropJob::default()
        };

        let merged = job.merge(overrides);
        assert_eq!(merged.output, Some(PathBuf::from("elsewhere")));
        assert_eq!(merged.dispatch, Some(DispatchMode::Serialized));
        assert_eq!(merged.input, Some(PathBuf::from("slide.tiff")));
        assert_eq!(merged.segments.len(), 2);
    }

    #[test]
    fn resolves_into_a_resized_segmentation() {
        let mut job = CropJob::parse(JOB).unwrap();
        job.segments.truncate(1);
        let resolved = job.resolve().unwrap();

        assert_eq!(resolved.segmentation.len(), 1);
        assert_eq!(resolved.segmentation.segments()[0], Segment::new(50.0, 50.0, 250.0, 250.0));
        assert_eq!(resolved.writer_options.compression, compression::ZSTD);
        assert_eq!(resolved.dispatch, DispatchMode::Parallel);
    }

    #[test]
    fn incomplete_jobs_are_rejected() {
        let job = CropJob { input: Some(PathBuf::from("a.tiff")), ..CropJob::default() };
        assert!(matches!(job.resolve(), Err(CropError::ConfigError(_))));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(CropJob::parse("dispatch = \"eager\""), Err(CropError::ConfigError(_))));
        assert!(matches!(CropJob::parse("segments = [[1, 2, 3]]"), Err(CropError::ConfigError(_))));
        assert!(matches!(CropJob::parse("bigtiff = 3"), Err(CropError::ConfigError(_))));
        assert!(CropJob::parse("input = ").is_err());
    }

    #[test]
    fn segments_outside_reference_fail_on_resolve() {
        let job = CropJob::parse(r#"
input = "a.tiff"
output = "out"
reference = "100x100"
segments = [[0, 0, 150, 50]]
"#).unwrap();
        assert!(matches!(job.resolve(), Err(CropError::InvalidSegment { .. })));
    }
}
