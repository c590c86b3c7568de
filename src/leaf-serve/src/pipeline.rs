use std::sync::Arc;

use image::imageops::FilterType;
use image::DynamicImage;
use log::{debug, info};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::gateway::{ImageTensor, ModelHandle, INPUT_HEIGHT, INPUT_SHAPE, INPUT_WIDTH};
use crate::timer::Timer;
use crate::upload::Upload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    /// Canonical class label of the image
    pub label: String,

    /// Human readable description of the class
    pub description: String,
}

/// Decode raw bytes into an image, sniffing the format from the content
pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    let mut t = Timer::new_start("Load image from memory");

    let image = image::load_from_memory(data).map_err(|e| Error::Decode(e.to_string()))?;

    t.stop();
    debug!("Decoded {}x{} image", image.width(), image.height());

    Ok(image)
}

/// Resize to the trained resolution, drop to RGB and scale to `[0, 1]`,
/// producing a `[1, H, W, 3]` tensor
pub fn preprocess(image: &DynamicImage) -> Result<ImageTensor> {
    let mut t = Timer::new_start("Resizing image");

    let rgb = image
        .resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::Nearest)
        .to_rgb8();

    let raw: Vec<f32> = rgb.into_raw().iter().map(|x| *x as f32 / 255f32).collect();

    t.stop();

    ImageTensor::new(INPUT_SHAPE, raw)
}

/// Index of the highest score. Ties go to the lowest index and NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, score) in scores.iter().copied().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }

    best.map(|(i, _)| i)
}

/// Decode, preprocess, classify and resolve one image at a time
pub struct InferencePipeline {
    model: ModelHandle,
    catalog: Arc<Catalog>,
}

impl InferencePipeline {
    /// Fails when the model declares an output width that differs from the
    /// number of labels in `catalog`.
    pub fn new(model: ModelHandle, catalog: Arc<Catalog>) -> Result<Self> {
        match model.output_width() {
            Some(width) if width != catalog.len() => {
                return Err(Error::shape(
                    format!("{} scores, one per catalog label", catalog.len()),
                    format!("{} model outputs", width),
                ));
            }
            Some(_) => {}
            None => info!(
                "Model does not declare its output width, checking per request against {} labels",
                catalog.len()
            ),
        }

        Ok(InferencePipeline { model, catalog })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn predict_upload(&self, upload: &Upload) -> Result<Prediction> {
        debug!(
            "Predicting {} ({:?}, {} bytes)",
            upload.name(),
            upload.kind(),
            upload.bytes().len()
        );
        self.predict(upload.bytes())
    }

    /// Full pipeline over encoded image bytes
    pub fn predict(&self, data: &[u8]) -> Result<Prediction> {
        let image = decode(data)?;
        self.predict_image(&image)
    }

    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let input = preprocess(image)?;
        let scores = self.model.classify(&input)?;
        self.resolve(&scores)
    }

    /// Map a score vector to its label and description
    pub fn resolve(&self, scores: &[f32]) -> Result<Prediction> {
        if scores.len() != self.catalog.len() {
            return Err(Error::shape(
                format!("{} scores", self.catalog.len()),
                format!("{} scores", scores.len()),
            ));
        }

        let index = argmax(scores)
            .ok_or_else(|| Error::Inference("model returned no comparable scores".into()))?;

        let label = self
            .catalog
            .label(index)
            .ok_or(Error::ClassIndexOutOfRange {
                index,
                len: self.catalog.len(),
            })?;

        info!("Predicted class {} ({})", index, label);

        Ok(Prediction {
            label: label.to_owned(),
            description: self.catalog.description(label).to_owned(),
        })
    }
}
