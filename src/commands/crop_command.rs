//! Box cropping command
//!
//! Collects the crop settings from the command line and an optional job
//! file, then runs the orchestrator over every box.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ArgMatches;
use log::{error, info};

use crate::commands::command_traits::Command;
use crate::config::{parse_dimensions, CropJob, ResolvedJob};
use crate::crop::{CropOptions, CropOrchestrator, DispatchMode};
use crate::errors::{CropError, CropResult};
use crate::output::TiffContainerFactory;
use crate::segmentation::Segment;
use crate::source::TiffSourceFactory;

/// Command cropping every box of a segmentation out of one image
pub struct CropCommand {
    job: ResolvedJob,
    show_progress: bool,
}

impl CropCommand {
    /// Create a new crop command
    ///
    /// # Arguments
    /// * `args` - Matches of the `crop` subcommand
    ///
    /// # Returns
    /// A new CropCommand instance or an error when the settings are
    /// incomplete or invalid
    pub fn new(args: &ArgMatches) -> CropResult<Self> {
        let overrides = Self::job_from_args(args)?;

        let job = match args.get_one::<String>("job") {
            Some(path) => CropJob::load(&PathBuf::from(path))?.merge(overrides),
            None => overrides,
        };

        Ok(CropCommand {
            job: job.resolve()?,
            show_progress: !args.get_flag("no-progress"),
        })
    }

    /// The settings this command will run with
    pub fn job(&self) -> &ResolvedJob {
        &self.job
    }

    fn job_from_args(args: &ArgMatches) -> CropResult<CropJob> {
        let segments = args.get_many::<String>("segment")
            .map(|values| values.map(|s| Segment::from_string(s)).collect::<CropResult<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        let reference = args.get_one::<String>("reference")
            .map(|s| parse_dimensions(s))
            .transpose()?;

        let resize = args.get_one::<String>("resize")
            .map(|s| s.parse::<f64>()
                .map_err(|_| CropError::ConfigError(format!("Invalid resize factor: {}", s))))
            .transpose()?;

        let channels = args.get_one::<String>("channels")
            .map(|s| s.parse())
            .transpose()?;

        Ok(CropJob {
            input: args.get_one::<String>("input").map(PathBuf::from),
            output: args.get_one::<String>("output").map(PathBuf::from),
            reference,
            segments,
            dispatch: args.get_flag("parallel").then_some(DispatchMode::Parallel),
            channels,
            compression: args.get_one::<String>("compression").cloned(),
            big_tiff: args.get_flag("bigtiff").then_some(true),
            resize,
        })
    }
}

impl Command for CropCommand {
    fn execute(&self) -> CropResult<()> {
        let job = &self.job;
        info!("Cropping {} with {} boxes ({} dispatch, {} channels)",
              job.input.display(), job.segmentation.len(), job.dispatch, job.channels);

        let orchestrator = CropOrchestrator::new(
            Arc::new(TiffSourceFactory),
            Arc::new(TiffContainerFactory::new(job.writer_options)),
            job.dispatch.scheduler(),
        ).with_options(CropOptions {
            channel_policy: job.channels,
            show_progress: self.show_progress,
        });

        let report = orchestrator.crop(&job.input, &job.segmentation, &job.output)?;

        for outcome in &report.outcomes {
            if outcome.is_success() {
                info!("{}", outcome);
            } else {
                error!("{}", outcome);
            }
        }

        if report.is_success() {
            info!("Wrote {} frames for {} boxes into {}",
                  report.frames_written(), report.outcomes.len(), report.image_dir.display());
            Ok(())
        } else {
            Err(CropError::GenericError(format!(
                "{} of {} boxes failed", report.failed(), report.outcomes.len()
            )))
        }
    }
}
