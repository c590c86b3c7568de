//! Model gateway: the boundary between the pipeline and a loaded classifier.

use std::sync::Arc;

use crate::error::{Error, Result};

#[cfg(feature = "tensorflow")]
mod saved_model;

#[cfg(feature = "tensorflow")]
pub use saved_model::{SavedModelClassifier, SavedModelConfig, DEFAULT_SIGNATURE, DEFAULT_TAG};

/// Height the classifier was trained on
pub const INPUT_HEIGHT: u32 = 225;

/// Width the classifier was trained on
pub const INPUT_WIDTH: u32 = 225;

pub const CHANNELS: usize = 3;

/// The only shape accepted by [`Classifier::classify`]: one NHWC image
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, CHANNELS];

/// Dense `f32` tensor in NHWC layout
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::shape(
                format!("{} values for {:?}", expected, shape),
                format!("{} values", data.len()),
            ));
        }

        Ok(ImageTensor { shape, data })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// A loaded, read-only image classifier.
///
/// Implementations must not mutate shared state in `classify`; a single
/// instance is shared by every request for the lifetime of the process.
pub trait Classifier: Send + Sync {
    /// Number of scores `classify` returns, when the artifact declares it
    fn output_width(&self) -> Option<usize>;

    /// Score one image. Fails with [`Error::Shape`] when `input` is not
    /// shaped as [`INPUT_SHAPE`].
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}

/// Shared handle to the process-wide classifier
pub type ModelHandle = Arc<dyn Classifier>;

/// Reject anything but a single image at the trained resolution
pub fn check_input_shape(input: &ImageTensor) -> Result<()> {
    if input.shape() != INPUT_SHAPE {
        return Err(Error::shape(
            format!("{:?}", INPUT_SHAPE),
            format!("{:?}", input.shape()),
        ));
    }
    Ok(())
}
