use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use leaf_serve::{
    Catalog, Classifier, Error, ImageTensor, InferencePipeline, Result, Upload,
    FALLBACK_DESCRIPTION,
};

/// Stand-in for a trained model: green-dominant leaves score as healthy
/// tomato, red-dominant ones as tomato late blight, anything else as apple scab.
struct ColourClassifier;

impl Classifier for ColourClassifier {
    fn output_width(&self) -> Option<usize> {
        Some(38)
    }

    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        leaf_serve::gateway::check_input_shape(input)?;

        let mut sums = [0f32; 3];
        for pixel in input.data().chunks(3) {
            for (sum, v) in sums.iter_mut().zip(pixel) {
                *sum += v;
            }
        }

        let mut scores = vec![0.01; 38];
        if sums[1] > sums[0] && sums[1] > sums[2] {
            scores[37] = 0.9;
        } else if sums[0] > sums[1] && sums[0] > sums[2] {
            scores[30] = 0.9;
        } else {
            scores[0] = 0.9;
        }
        Ok(scores)
    }
}

fn pipeline() -> InferencePipeline {
    let catalog = Catalog::plant_village().unwrap();
    InferencePipeline::new(Arc::new(ColourClassifier), Arc::new(catalog)).unwrap()
}

fn encode(image: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

/// A leafy green image with a darker vein down the middle
fn healthy_leaf() -> DynamicImage {
    let image = RgbImage::from_fn(320, 240, |x, _| {
        if (155..165).contains(&x) {
            Rgb([40, 110, 30])
        } else {
            Rgb([70, 180, 60])
        }
    });
    DynamicImage::ImageRgb8(image)
}

/// Write a labelled fixture set: `<root>/<label>/<file>`
fn write_fixture(root: &Path, label: &str, file: &str, bytes: &[u8]) -> PathBuf {
    let dir = root.join(label);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, bytes).unwrap();
    path
}

fn upload_from(path: &Path) -> Upload {
    let name = path.file_name().unwrap().to_str().unwrap();
    Upload::new(name, fs::read(path).unwrap()).unwrap()
}

fn working_dir_entries() -> BTreeSet<PathBuf> {
    fs::read_dir(".")
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[test]
fn known_healthy_tomato_fixture() {
    let fixtures = tempfile::tempdir().unwrap();
    let jpeg = encode(&healthy_leaf(), ImageOutputFormat::Jpeg(90));
    let path = write_fixture(fixtures.path(), "Tomato___healthy", "leaf.jpg", &jpeg);

    let pipeline = pipeline();
    let prediction = pipeline.predict_upload(&upload_from(&path)).unwrap();

    let expected = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap();
    assert_eq!(prediction.label, expected);
    assert_eq!(
        prediction.description,
        pipeline.catalog().description("Tomato___healthy")
    );
    assert_ne!(prediction.description, FALLBACK_DESCRIPTION);
}

#[test]
fn png_and_greyscale_inputs_are_accepted() {
    let pipeline = pipeline();

    let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 80, Rgb([200, 30, 20])));
    let prediction = pipeline
        .predict_upload(&Upload::new("blight.PNG", encode(&red, ImageOutputFormat::Png)).unwrap())
        .unwrap();
    assert_eq!(prediction.label, "Tomato___Late_blight");

    let grey = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(10, 10, image::Luma([90])));
    let prediction = pipeline
        .predict(&encode(&grey, ImageOutputFormat::Png))
        .unwrap();
    assert_eq!(prediction.label, "Apple___Apple_scab");
}

#[test]
fn predict_is_deterministic() {
    let bytes = encode(&healthy_leaf(), ImageOutputFormat::Png);
    let pipeline = pipeline();

    let first = pipeline.predict(&bytes).unwrap();
    for _ in 0..5 {
        assert_eq!(pipeline.predict(&bytes).unwrap(), first);
    }
}

#[test]
fn single_pixel_image_is_classified() {
    let dot = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([0, 255, 0])));
    let prediction = pipeline()
        .predict(&encode(&dot, ImageOutputFormat::Png))
        .unwrap();
    assert_eq!(prediction.label, "Tomato___healthy");
}

#[test]
fn text_renamed_to_jpg_is_a_decode_error() {
    let fixtures = tempfile::tempdir().unwrap();
    let path = write_fixture(
        fixtures.path(),
        "not_an_image",
        "notes.jpg",
        b"these are my gardening notes, not a photo\n",
    );

    let err = pipeline().predict_upload(&upload_from(&path)).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(err.is_user_error());
}

#[test]
fn unsupported_extension_never_reaches_the_pipeline() {
    let bytes = encode(&healthy_leaf(), ImageOutputFormat::Png);
    let err = Upload::new("leaf.gif", bytes).unwrap_err();
    assert!(matches!(err, Error::UnsupportedUpload(_)));
}

#[test]
fn no_files_left_in_working_directory() {
    let pipeline = pipeline();
    let before = working_dir_entries();

    let good = encode(&healthy_leaf(), ImageOutputFormat::Jpeg(80));
    pipeline
        .predict_upload(&Upload::new("leaf.jpeg", good).unwrap())
        .unwrap();
    assert_eq!(working_dir_entries(), before);

    let bad = Upload::new("leaf.jpg", b"GIF89a nonsense".to_vec()).unwrap();
    assert!(pipeline.predict_upload(&bad).is_err());
    assert_eq!(working_dir_entries(), before);
}
