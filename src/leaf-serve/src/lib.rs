//! Plant leaf disease classification.
//!
//! An [`InferencePipeline`] owns a shared handle to a loaded [`Classifier`]
//! and the [`Catalog`] of labels and descriptions. Each call to
//! [`InferencePipeline::predict`] decodes an uploaded image, resizes it to the
//! trained resolution, runs the model and returns a single [`Prediction`].

pub mod catalog;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod timer;
pub mod upload;

pub use catalog::{Catalog, FALLBACK_DESCRIPTION};
pub use error::{Error, Result};
pub use gateway::{Classifier, ImageTensor, ModelHandle};
pub use pipeline::{InferencePipeline, Prediction};
pub use timer::Timer;
pub use upload::{Upload, UploadKind};

#[cfg(feature = "tensorflow")]
pub use gateway::{SavedModelClassifier, SavedModelConfig};

#[cfg(feature = "tensorflow")]
use std::path::Path;
#[cfg(feature = "tensorflow")]
use std::sync::Arc;

/// Load the SavedModel and catalog and wire them into a pipeline.
///
/// Uses the built-in PlantVillage tables unless `catalog` names a mapping
/// document. Any failure here must keep the process from serving.
#[cfg(feature = "tensorflow")]
pub fn load_pipeline(
    model: &SavedModelConfig,
    catalog: Option<&Path>,
) -> Result<InferencePipeline> {
    let catalog = match catalog {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::plant_village()?,
    };

    let classifier = SavedModelClassifier::load(model)?;

    InferencePipeline::new(Arc::new(classifier), Arc::new(catalog))
}
