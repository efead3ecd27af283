//! CLI command implementations
//!
//! This module contains implementations of the commands supported by
//! the CLI application using the Command pattern.

pub mod command_traits;
pub mod crop_command;
pub mod inspect_command;

pub use command_traits::{Command, CommandFactory};
pub use crop_command::CropCommand;
pub use inspect_command::InspectCommand;

use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};

use crate::errors::{CropError, CropResult};

/// Command line definition of the `slidecrop` binary
pub fn build_cli() -> ClapCommand {
    ClapCommand::new("slidecrop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Crop regions of interest out of multi-resolution microscopy images")
        .subcommand_required(true)
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write log records to this file")
                .value_name("FILE")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("crop")
                .about("Crop every box at every resolution level")
                .arg(
                    Arg::new("input")
                        .help("Input pyramid TIFF (may come from --job)")
                        .index(1),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Existing output root directory")
                        .value_name("DIR"),
                )
                .arg(
                    Arg::new("reference")
                        .short('r')
                        .long("reference")
                        .help("Reference space the boxes are given in")
                        .value_name("WxH"),
                )
                .arg(
                    Arg::new("segment")
                        .short('s')
                        .long("segment")
                        .help("Box as x1,y1,x2,y2; repeat for more boxes")
                        .value_name("X1,Y1,X2,Y2")
                        .allow_hyphen_values(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("resize")
                        .long("resize")
                        .help("Grow or shrink every box about its centre")
                        .value_name("FACTOR"),
                )
                .arg(
                    Arg::new("parallel")
                        .long("parallel")
                        .help("Start every box at once instead of one after another")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("channels")
                        .long("channels")
                        .help("How non-RGB windows become frames (strict, fit)")
                        .value_name("POLICY"),
                )
                .arg(
                    Arg::new("compression")
                        .long("compression")
                        .help("Compression of output frames (none, deflate, zstd)")
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("bigtiff")
                        .long("bigtiff")
                        .help("Write BigTIFF containers")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("job")
                        .short('j')
                        .long("job")
                        .help("TOML job file; command line values take precedence")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("no-progress")
                        .long("no-progress")
                        .help("Do not draw a progress bar")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("inspect")
                .about("List the IFDs and resolution levels of an image")
                .arg(
                    Arg::new("input")
                        .help("Input TIFF file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help("Also list every tag")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the subcommand and creates the appropriate
/// command instance for execution.
#[derive(Debug, Default)]
pub struct SlideCropCommandFactory;

impl SlideCropCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        SlideCropCommandFactory
    }
}

impl CommandFactory for SlideCropCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> CropResult<Box<dyn Command>> {
        match args.subcommand() {
            Some(("crop", sub_args)) => Ok(Box::new(CropCommand::new(sub_args)?)),
            Some(("inspect", sub_args)) => Ok(Box::new(InspectCommand::new(sub_args)?)),
            Some((other, _)) => Err(CropError::ConfigError(format!("Unknown command: {}", other))),
            None => Err(CropError::ConfigError("No command given".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn factory_dispatches_on_subcommand() {
        let factory = SlideCropCommandFactory::new();

        let inspect = build_cli().try_get_matches_from(["slidecrop", "inspect", "a.tiff"]).unwrap();
        assert!(factory.create_command(&inspect).is_ok());

        let crop = build_cli()
            .try_get_matches_from(["slidecrop", "crop", "a.tiff", "--output", "out"])
            .unwrap();
        assert!(matches!(factory.create_command(&crop), Err(CropError::ConfigError(_))));

        assert!(build_cli().try_get_matches_from(["slidecrop"]).is_err());
    }
}
