//! Crop runs over every box of a segmentation
//!
//! The orchestrator checks the output root, creates the image directory,
//! and hands one execution unit per box to its scheduler. Every unit opens
//! the image on its own and writes only below its own `ind<i>` directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use crate::errors::CropResult;
use crate::output::{ChannelPolicy, ContainerFactory};
use crate::segmentation::ImageSegmentation;
use crate::source::tiff_source::base_name_of;
use crate::source::ImageSourceFactory;
use crate::utils::progress::ProgressTracker;
use super::box_writer::{BoxCropWriter, BoxWriteSummary};
use super::layout::OutputLayout;
use super::scheduler::{DispatchMode, TaskScheduler, Unit, UnitOutcome};

/// How one box of a run ended
#[derive(Debug)]
pub enum BoxOutcome {
    /// The unit finished; some frames may still have failed
    Written(BoxWriteSummary),
    /// The unit returned an error
    Failed { box_index: usize, error: String },
    /// The unit panicked
    Panicked { box_index: usize, message: String },
}

impl BoxOutcome {
    pub fn box_index(&self) -> usize {
        match self {
            BoxOutcome::Written(summary) => summary.box_index,
            BoxOutcome::Failed { box_index, .. } | BoxOutcome::Panicked { box_index, .. } => *box_index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BoxOutcome::Written(summary) if summary.frames_failed == 0)
    }

    fn from_unit(box_index: usize, outcome: UnitOutcome) -> Self {
        match outcome {
            UnitOutcome::Completed(Ok(summary)) => BoxOutcome::Written(summary),
            UnitOutcome::Completed(Err(e)) => BoxOutcome::Failed { box_index, error: e.to_string() },
            UnitOutcome::Panicked(message) => BoxOutcome::Panicked { box_index, message },
        }
    }
}

impl fmt::Display for BoxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxOutcome::Written(summary) => write!(
                f, "box {}: {} frames written, {} failed -> {}",
                summary.box_index, summary.frames_written, summary.frames_failed,
                summary.container_path.display()
            ),
            BoxOutcome::Failed { box_index, error } => write!(f, "box {}: failed: {}", box_index, error),
            BoxOutcome::Panicked { box_index, message } => write!(f, "box {}: panicked: {}", box_index, message),
        }
    }
}

/// Summary of a crop run
#[derive(Debug)]
pub struct CropReport {
    /// `<output_root>/<image_name>`
    pub image_dir: PathBuf,
    pub dispatch: DispatchMode,
    /// One entry per box, in box order
    pub outcomes: Vec<BoxOutcome>,
}

impl CropReport {
    /// Boxes whose every frame was written
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Boxes with an error, a panic or a skipped frame
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Frames written across all boxes
    pub fn frames_written(&self) -> usize {
        self.outcomes.iter()
            .map(|o| match o {
                BoxOutcome::Written(summary) => summary.frames_written,
                _ => 0,
            })
            .sum()
    }
}

/// Per-run settings
#[derive(Debug, Clone, Copy, Default)]
pub struct CropOptions {
    pub channel_policy: ChannelPolicy,
    /// Draw a progress bar while boxes complete
    pub show_progress: bool,
}

/// Runs the per-box crop for every box of a segmentation
pub struct CropOrchestrator {
    sources: Arc<dyn ImageSourceFactory>,
    containers: Arc<dyn ContainerFactory>,
    scheduler: Box<dyn TaskScheduler>,
    options: CropOptions,
}

impl CropOrchestrator {
    /// Create an orchestrator
    ///
    /// # Arguments
    /// * `sources` - Opens the input image once per unit
    /// * `containers` - Creates the per-box containers
    /// * `scheduler` - Decides how units are dispatched
    pub fn new(
        sources: Arc<dyn ImageSourceFactory>,
        containers: Arc<dyn ContainerFactory>,
        scheduler: Box<dyn TaskScheduler>,
    ) -> Self {
        CropOrchestrator {
            sources,
            containers,
            scheduler,
            options: CropOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CropOptions) -> Self {
        self.options = options;
        self
    }

    /// Crop every box of `segmentation` out of `input` below `output_root`
    ///
    /// Fails before dispatching anything when the output root is not an
    /// existing directory or the image directory cannot be created. Errors
    /// inside units are reported per box in the returned `CropReport`.
    pub fn crop(&self, input: &Path, segmentation: &ImageSegmentation, output_root: &Path) -> CropResult<CropReport> {
        let layout = OutputLayout::new(output_root, self.image_name(input));
        layout.check_output_root()?;
        let image_dir = layout.create_image_dir()?;

        info!("Cropping {} boxes from {} into {} ({} dispatch)",
              segmentation.len(), input.display(), image_dir.display(), self.scheduler.mode());

        let units = self.build_units(input, segmentation, &layout);

        let progress = if self.options.show_progress {
            ProgressTracker::new(units.len() as u64, "Cropping boxes")
        } else {
            ProgressTracker::hidden(units.len() as u64)
        };

        let outcomes = self.scheduler.run(units, &mut |box_index, outcome| {
            progress.increment(1);
            match outcome {
                UnitOutcome::Completed(Ok(summary)) if summary.frames_failed > 0 => {
                    warn!("Box {} skipped {} frames", box_index, summary.frames_failed)
                }
                UnitOutcome::Completed(Err(e)) => error!("Box {} failed: {}", box_index, e),
                _ => {}
            }
        });
        progress.finish();

        let report = CropReport {
            image_dir,
            dispatch: self.scheduler.mode(),
            outcomes: outcomes.into_iter()
                .map(|(box_index, outcome)| BoxOutcome::from_unit(box_index, outcome))
                .collect(),
        };

        info!("Crop finished: {} of {} boxes succeeded, {} frames written",
              report.succeeded(), report.outcomes.len(), report.frames_written());

        Ok(report)
    }

    /// Name of the image directory, as reported by the source
    ///
    /// An input that cannot be opened here falls back to its file stem;
    /// each unit then reports the open error for its own box.
    fn image_name(&self, input: &Path) -> String {
        match self.sources.open(input) {
            Ok(source) => source.base_name(),
            Err(e) => {
                warn!("Could not open {} to name its output: {}", input.display(), e);
                base_name_of(input)
            }
        }
    }

    fn build_units(&self, input: &Path, segmentation: &ImageSegmentation, layout: &OutputLayout) -> Vec<Unit> {
        let segmentation = Arc::new(segmentation.clone());

        (0..segmentation.len())
            .map(|box_index| {
                let input = input.to_path_buf();
                let segmentation = Arc::clone(&segmentation);
                let layout = layout.clone();
                let sources = Arc::clone(&self.sources);
                let containers = Arc::clone(&self.containers);
                let channel_policy = self.options.channel_policy;

                Unit::new(box_index, move || {
                    let mut source = sources.open(&input)?;
                    BoxCropWriter::new(source.as_mut(), &segmentation, &layout, containers.as_ref())
                        .with_channel_policy(channel_policy)
                        .write_box(box_index)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CropError;
    use crate::output::TiffContainerFactory;
    use crate::source::{AxisExtents, ImageSource, TiffSourceFactory, Volume, WindowRequest};
    use crate::crop::scheduler::SerialScheduler;
    use tempfile::tempdir;

    fn orchestrator() -> CropOrchestrator {
        CropOrchestrator::new(
            Arc::new(TiffSourceFactory),
            Arc::new(TiffContainerFactory::default()),
            Box::new(SerialScheduler),
        )
    }

    #[test]
    fn missing_output_root_fails_before_dispatch() {
        let dir = tempdir().unwrap();
        let mut store = ImageSegmentation::new(10, 10).unwrap();
        store.add(0.0, 0.0, 5.0, 5.0).unwrap();
        let root = dir.path().join("nope");

        let result = orchestrator().crop(Path::new("slide.tiff"), &store, &root);

        assert!(matches!(result, Err(CropError::OutputRootMissing(_))));
        assert!(!root.exists());
    }

    #[test]
    fn empty_store_only_creates_image_dir() {
        let dir = tempdir().unwrap();
        let store = ImageSegmentation::new(10, 10).unwrap();

        let report = orchestrator().crop(Path::new("/data/slide.tiff"), &store, dir.path()).unwrap();

        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
        assert_eq!(report.image_dir, dir.path().join("slide"));
        assert!(report.image_dir.is_dir());
        assert_eq!(std::fs::read_dir(&report.image_dir).unwrap().count(), 0);
    }

    /// Source whose name has nothing to do with its path
    struct NamedSource;

    impl ImageSource for NamedSource {
        fn resolution_level_count(&self) -> usize {
            0
        }

        fn axis_extents(&self, _level: usize) -> CropResult<AxisExtents> {
            Err(CropError::WindowOutOfBounds("no levels".to_string()))
        }

        fn read_window(&mut self, _level: usize, _request: &WindowRequest) -> CropResult<Volume> {
            Err(CropError::WindowOutOfBounds("no levels".to_string()))
        }

        fn base_name(&self) -> String {
            "specimen-42".to_string()
        }
    }

    struct NamedSources;

    impl ImageSourceFactory for NamedSources {
        fn open(&self, _path: &Path) -> CropResult<Box<dyn ImageSource>> {
            Ok(Box::new(NamedSource))
        }
    }

    #[test]
    fn image_dir_is_named_by_the_source() {
        let dir = tempdir().unwrap();
        let mut store = ImageSegmentation::new(10, 10).unwrap();
        store.add(0.0, 0.0, 5.0, 5.0).unwrap();
        let orchestrator = CropOrchestrator::new(
            Arc::new(NamedSources),
            Arc::new(TiffContainerFactory::default()),
            Box::new(SerialScheduler),
        );

        let report = orchestrator.crop(Path::new("/data/slide.tiff"), &store, dir.path()).unwrap();

        assert_eq!(report.image_dir, dir.path().join("specimen-42"));
        assert!(!dir.path().join("slide").exists());
        match &report.outcomes[0] {
            BoxOutcome::Written(summary) => {
                assert_eq!(summary.container_path, dir.path().join("specimen-42/ind0/specimen-42_full.tiff"));
                assert_eq!(summary.frames_written, 0);
            }
            other => panic!("expected a written box, got {}", other),
        }
    }

    #[test]
    fn unreadable_input_fails_each_box() {
        let dir = tempdir().unwrap();
        let mut store = ImageSegmentation::new(10, 10).unwrap();
        store.add(0.0, 0.0, 5.0, 5.0).unwrap();
        store.add(5.0, 5.0, 10.0, 10.0).unwrap();

        let report = orchestrator().crop(&dir.path().join("absent.tiff"), &store, dir.path()).unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(report.outcomes[1], BoxOutcome::Failed { box_index: 1, .. }));
    }
}
