//! End-to-end crop runs over pyramid TIFFs written with the crate's own writer

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tempfile::{tempdir, TempDir};

use slidecrop::config::CropJob;
use slidecrop::crop::BoxOutcome;
use slidecrop::output::{OutputContainer, Page, PageLayout};
use slidecrop::source::ImageSource;
use slidecrop::tiff::constants::{compression, new_subfile_type};
use slidecrop::{
    ChannelPolicy, CropError, DispatchMode, ImageSegmentation, MultiPageTiffWriter, SlideCrop,
    TiffImageSource, TiffReader, TiffWriterOptions,
};

/// Pixel pattern of a level scaled down by `step` from a 400x300 base
fn level_image(step: u32) -> RgbImage {
    RgbImage::from_fn(400 / step, 300 / step, |x, y| {
        Rgb([((x * step) % 256) as u8, ((y * step) % 256) as u8, 7])
    })
}

/// Writes a three-level pyramid (400x300, 200x150, 100x75)
fn write_rgb_pyramid(path: &Path, options: TiffWriterOptions) {
    let mut writer = MultiPageTiffWriter::create(path, options).unwrap();
    for (level, step) in [1u32, 2, 4].into_iter().enumerate() {
        let image = level_image(step);
        let subfile_type = if level == 0 { 0 } else { new_subfile_type::REDUCED_RESOLUTION };
        writer.append_page(&Page::from_rgb(&image), subfile_type).unwrap();
    }
    Box::new(writer).finish().unwrap();
}

/// Writes a two-level single channel pyramid (400x300, 200x150)
fn write_grey_pyramid(path: &Path) {
    let mut writer = MultiPageTiffWriter::create(path, TiffWriterOptions::default()).unwrap();
    for (level, step) in [1usize, 2].into_iter().enumerate() {
        let (width, height) = (400 / step, 300 / step);
        let data: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
        let page = Page { width: width as u32, height: height as u32, samples_per_pixel: 1, data: &data };
        let subfile_type = if level == 0 { 0 } else { new_subfile_type::REDUCED_RESOLUTION };
        writer.append_page(&page, subfile_type).unwrap();
    }
    Box::new(writer).finish().unwrap();
}

/// Reference space 2.5 times the base level, three boxes
fn segmentation() -> ImageSegmentation {
    let mut store = ImageSegmentation::new(1000, 750).unwrap();
    store.add(250.0, 125.0, 500.0, 375.0).unwrap();
    store.add(0.0, 0.0, 100.0, 75.0).unwrap();
    store.add(500.0, 375.0, 1000.0, 750.0).unwrap();
    store
}

fn frame_dimensions(container: &Path) -> Vec<(u64, u64)> {
    let mut reader = TiffReader::new();
    let tiff = reader.load(container).unwrap();
    tiff.ifds.iter().map(|ifd| ifd.get_dimensions().unwrap()).collect()
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
}

impl Fixture {
    fn rgb(options: TiffWriterOptions) -> Self {
        let dir = tempdir().unwrap();
        let input = dir.path().join("slide.tiff");
        write_rgb_pyramid(&input, options);
        Fixture { dir, input }
    }

    fn output_root(&self, name: &str) -> PathBuf {
        let root = self.dir.path().join(name);
        fs::create_dir(&root).unwrap();
        root
    }
}

#[test]
fn serialized_crop_writes_one_container_per_box() {
    let fixture = Fixture::rgb(TiffWriterOptions {
        compression: compression::DEFLATE,
        predictor: true,
        layout: PageLayout::Strips { rows_per_strip: 16 },
        ..TiffWriterOptions::default()
    });
    let root = fixture.output_root("out");

    let report = SlideCrop::new().crop(&fixture.input, &segmentation(), &root).unwrap();

    assert!(report.is_success());
    assert_eq!(report.dispatch, DispatchMode::Serialized);
    assert_eq!(report.image_dir, root.join("slide"));
    assert_eq!(report.frames_written(), 9);
    assert_eq!(report.outcomes.len(), 3);

    let box0 = root.join("slide/ind0/slide_full.tiff");
    let box1 = root.join("slide/ind1/slide_full.tiff");
    assert_eq!(frame_dimensions(&box0), vec![(100, 100), (50, 50), (25, 26)]);
    let box2 = root.join("slide/ind2/slide_full.tiff");
    assert_eq!(frame_dimensions(&box1), vec![(40, 30), (20, 15), (10, 8)]);
    assert_eq!(frame_dimensions(&box2), vec![(200, 150), (100, 75), (50, 38)]);

    let mut dirs: Vec<String> = fs::read_dir(root.join("slide")).unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    dirs.sort();
    assert_eq!(dirs, vec!["ind0", "ind1", "ind2"]);
    for dir in &dirs {
        let files: Vec<_> = fs::read_dir(root.join("slide").join(dir)).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}

#[test]
fn cropped_pixels_come_from_the_box() {
    let fixture = Fixture::rgb(TiffWriterOptions::default());
    let root = fixture.output_root("out");

    SlideCrop::new().crop(&fixture.input, &segmentation(), &root).unwrap();

    // The first frame of a container is its only level when read back as a source
    let mut cropped = TiffImageSource::open(root.join("slide/ind0/slide_full.tiff")).unwrap();
    let extents = cropped.axis_extents(0).unwrap();
    assert_eq!((extents.width, extents.height, extents.channel_count), (100, 100, 3));

    let volume = cropped.read_window(0, &extents.full_request(0..100, 0..100)).unwrap();
    assert_eq!(volume.get(0, 0, 0, 0, 0), Some(100));
    assert_eq!(volume.get(0, 0, 0, 1, 0), Some(50));
    assert_eq!(volume.get(0, 0, 0, 2, 0), Some(7));
    assert_eq!(volume.get(99, 99, 0, 0, 0), Some(199));
    assert_eq!(volume.get(99, 99, 0, 1, 0), Some(149));
}

#[test]
fn parallel_dispatch_matches_serialized() {
    let fixture = Fixture::rgb(TiffWriterOptions {
        big_tiff: true,
        compression: compression::ZSTD,
        layout: PageLayout::Tiles { width: 64, height: 32 },
        ..TiffWriterOptions::default()
    });
    let serial_root = fixture.output_root("serial");
    let parallel_root = fixture.output_root("parallel");
    let store = segmentation();

    let serial = SlideCrop::new().crop(&fixture.input, &store, &serial_root).unwrap();
    let parallel = SlideCrop::new()
        .with_dispatch(DispatchMode::Parallel)
        .crop(&fixture.input, &store, &parallel_root)
        .unwrap();

    assert!(serial.is_success());
    assert!(parallel.is_success());
    assert_eq!(parallel.dispatch, DispatchMode::Parallel);

    for index in 0..store.len() {
        let relative = format!("slide/ind{}/slide_full.tiff", index);
        let serial_bytes = fs::read(serial_root.join(&relative)).unwrap();
        let parallel_bytes = fs::read(parallel_root.join(&relative)).unwrap();
        assert_eq!(serial_bytes, parallel_bytes, "container of box {} differs", index);
    }
}

#[test]
fn single_channel_input_needs_fit_policy() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("grey.tif");
    write_grey_pyramid(&input);
    let store = segmentation();

    let strict_root = dir.path().join("strict");
    fs::create_dir(&strict_root).unwrap();
    let strict = SlideCrop::new().crop(&input, &store, &strict_root).unwrap();
    assert!(!strict.is_success());
    assert_eq!(strict.frames_written(), 0);
    for outcome in &strict.outcomes {
        match outcome {
            BoxOutcome::Written(summary) => assert_eq!(summary.frames_failed, 2),
            other => panic!("expected skipped frames, got {}", other),
        }
    }

    let fit_root = dir.path().join("fit");
    fs::create_dir(&fit_root).unwrap();
    let fit = SlideCrop::new()
        .with_channel_policy(ChannelPolicy::Fit)
        .crop(&input, &store, &fit_root)
        .unwrap();
    assert!(fit.is_success());

    let container = fit_root.join("grey/ind0/grey_full.tiff");
    assert_eq!(frame_dimensions(&container), vec![(100, 100), (50, 50)]);

    let mut cropped = TiffImageSource::open(&container).unwrap();
    let extents = cropped.axis_extents(0).unwrap();
    let volume = cropped.read_window(0, &extents.full_request(3..4, 2..3)).unwrap();
    let grey = volume.get(0, 0, 0, 0, 0);
    assert_eq!(volume.get(0, 0, 0, 1, 0), grey);
    assert_eq!(volume.get(0, 0, 0, 2, 0), grey);
}

#[test]
fn missing_output_root_writes_nothing() {
    let fixture = Fixture::rgb(TiffWriterOptions::default());
    let root = fixture.dir.path().join("not-there");

    let result = SlideCrop::new().crop(&fixture.input, &segmentation(), &root);

    assert!(matches!(result, Err(CropError::OutputRootMissing(_))));
    assert!(!root.exists());
}

#[test]
fn job_file_runs_end_to_end() {
    let fixture = Fixture::rgb(TiffWriterOptions::default());
    let root = fixture.output_root("job-out");
    let job_path = fixture.dir.path().join("job.toml");
    fs::write(&job_path, format!(
        r#"
input = '{}'
output = '{}'
dispatch = "parallel"
compression = "deflate"
resize = 0.5
segments = [[200, 100, 600, 500]]

[reference]
width = 1000
height = 750
"#,
        fixture.input.display(),
        root.display()
    )).unwrap();

    let job = CropJob::load(&job_path).unwrap().resolve().unwrap();
    assert_eq!(job.dispatch, DispatchMode::Parallel);
    assert_eq!(job.writer_options.compression, compression::DEFLATE);

    let report = SlideCrop::new()
        .with_dispatch(job.dispatch)
        .with_channel_policy(job.channels)
        .with_writer_options(job.writer_options)
        .crop(&job.input, &job.segmentation, &job.output)
        .unwrap();

    assert!(report.is_success());
    // Halved about its centre: 300..500 x 200..400 in the reference space
    assert_eq!(
        frame_dimensions(&root.join("slide/ind0/slide_full.tiff")),
        vec![(80, 80), (40, 40), (20, 20)]
    );
}

#[test]
fn levels_are_described() {
    let fixture = Fixture::rgb(TiffWriterOptions::default());

    let description = SlideCrop::new().describe_levels(&fixture.input).unwrap();

    assert!(description.starts_with("slide: 3 resolution levels"));
    assert!(description.contains("Level 2: x=100 y=75 z=1 c=3 t=1"));
}
