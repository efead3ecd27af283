//! Pyramid inspection command
//!
//! Shows the IFD chain of a TIFF and the resolution levels the crop
//! pipeline would read from it.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::compression::CompressionFactory;
use crate::errors::{CropError, CropResult};
use crate::source::{ImageSource, TiffImageSource};
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::tiff::tag_names::compression_name;
use crate::tiff::TiffReader;

/// Command listing the resolution levels of an image
pub struct InspectCommand {
    input_file: PathBuf,
    verbose: bool,
}

impl InspectCommand {
    /// Create a new inspect command
    ///
    /// # Arguments
    /// * `args` - Matches of the `inspect` subcommand
    pub fn new(args: &ArgMatches) -> CropResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| CropError::ConfigError("Missing input file".to_string()))?;

        Ok(InspectCommand {
            input_file: PathBuf::from(input_file),
            verbose: args.get_flag("verbose"),
        })
    }

    /// Display basic IFD information
    fn display_ifd_summary(&self, ifd: &IFD) {
        info!("IFD #{} (offset: {})", ifd.number, ifd.offset);

        match ifd.get_dimensions() {
            Some((width, height)) => info!("  Dimensions: {}x{}", width, height),
            None => info!("  Dimensions: Not available"),
        }
        info!("  Samples per pixel: {}", ifd.get_samples_per_pixel());
        info!("  Layout: {}", if ifd.is_tiled() { "tiled" } else { "stripped" });

        let code = ifd.compression();
        let supported = if CompressionFactory::create_handler(code).is_ok() { "supported" } else { "not supported" };
        info!("  Compression: {} ({}, {})", code, compression_name(code), supported);

        if let Some(subfile_type) = ifd.get_tag_value(tags::NEW_SUBFILE_TYPE) {
            info!("  NewSubfileType: {}{}", subfile_type,
                  if ifd.is_reduced_resolution() { " (reduced resolution)" } else { "" });
        }

        if self.verbose {
            for entry in &ifd.entries {
                info!("    {}", entry.description());
            }
        }
    }
}

impl Command for InspectCommand {
    fn execute(&self) -> CropResult<()> {
        let mut reader = TiffReader::new();
        let tiff = reader.load(&self.input_file)?;

        info!("{}", tiff);
        for ifd in &tiff.ifds {
            self.display_ifd_summary(ifd);
        }

        let source = TiffImageSource::open(&self.input_file)?;
        info!("Resolution levels of {}:", source.base_name());
        for level in 0..source.resolution_level_count() {
            info!("  Level {}: {}", level, source.axis_extents(level)?);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_cli;

    #[test]
    fn missing_file_is_an_error() {
        let matches = build_cli()
            .try_get_matches_from(["slidecrop", "inspect", "/nonexistent/slide.tiff"])
            .unwrap();
        let command = InspectCommand::new(matches.subcommand_matches("inspect").unwrap()).unwrap();
        assert!(command.execute().is_err());
    }
}
