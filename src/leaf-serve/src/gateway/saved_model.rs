use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tensorflow::{
    Graph, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Shape, Status, Tensor,
    TensorInfo,
};

use super::{check_input_shape, Classifier, ImageTensor, INPUT_SHAPE};
use crate::error::{Error, Result};
use crate::timer::Timer;

pub const DEFAULT_SIGNATURE: &str = "serving_default";
pub const DEFAULT_TAG: &str = "serve";

#[derive(Debug, Clone)]
pub struct SavedModelConfig {
    /// Export directory of the TensorFlow SavedModel
    pub export_dir: PathBuf,

    /// Tag set of the meta graph to load
    pub tags: Vec<String>,

    /// Signature whose single input and output are used
    pub signature: String,
}

impl SavedModelConfig {
    pub fn new(export_dir: &Path) -> Self {
        SavedModelConfig {
            export_dir: export_dir.to_path_buf(),
            tags: vec![DEFAULT_TAG.to_owned()],
            signature: DEFAULT_SIGNATURE.to_owned(),
        }
    }
}

/// Graph endpoint named by a signature
#[derive(Debug, Clone)]
struct Endpoint {
    op: String,
    index: i32,
}

impl Endpoint {
    fn from_info(info: &TensorInfo) -> Self {
        Endpoint {
            op: info.name().name.clone(),
            index: info.name().index,
        }
    }
}

pub struct SavedModelClassifier {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    input: Endpoint,
    output: Endpoint,

    output_width: Option<usize>,
}

fn load_error(status: Status) -> Error {
    Error::Load(status.to_string())
}

fn inference_error(status: Status) -> Error {
    Error::Inference(status.to_string())
}

/// Dimensions of a signature tensor; `None` entries are unknown
fn dims(shape: &Shape) -> Option<Vec<Option<i64>>> {
    let rank = shape.dims()?;
    Some((0..rank).map(|i| shape[i]).collect())
}

fn sole<'a, T>(tensors: &'a HashMap<String, T>, what: &str) -> Result<&'a T> {
    let mut iter = tensors.values();
    match (iter.next(), iter.next()) {
        (Some(info), None) => Ok(info),
        _ => Err(Error::Load(format!(
            "signature must have exactly one {}, found {}",
            what,
            tensors.len()
        ))),
    }
}

/// Last known, positive dimension of the output; `None` when the signature
/// leaves it open or the rank is unknown
fn signature_output_width(dims: Option<&[Option<i64>]>) -> Option<usize> {
    dims?
        .last()
        .copied()
        .flatten()
        .filter(|w| *w > 0)
        .map(|w| w as usize)
}

/// A single image must come back as one row of scores
fn check_output_dims(dims: &[u64]) -> Result<()> {
    if dims.len() != 2 || dims[0] != 1 {
        return Err(Error::shape("[1, classes]", format!("{:?}", dims)));
    }
    Ok(())
}

/// Known input dimensions must agree with the trained resolution; the batch
/// dimension may be left open.
fn check_signature_input(dims: &[Option<i64>]) -> Result<()> {
    if dims.len() != INPUT_SHAPE.len() {
        return Err(Error::Load(format!(
            "model input has rank {}, expected {:?}",
            dims.len(),
            INPUT_SHAPE
        )));
    }

    for (axis, (dim, want)) in dims.iter().zip(INPUT_SHAPE.iter()).enumerate() {
        if let Some(d) = dim {
            if *d >= 0 && *d as usize != *want {
                return Err(Error::Load(format!(
                    "model input dimension {} is {}, expected {:?}",
                    axis, d, INPUT_SHAPE
                )));
            }
        }
    }

    Ok(())
}

impl SavedModelClassifier {
    pub fn load(config: &SavedModelConfig) -> Result<Self> {
        let export_dir = &config.export_dir;
        if !export_dir.is_dir() {
            return Err(Error::Load(format!(
                "{} is not a directory",
                export_dir.display()
            )));
        }
        if !export_dir.join("saved_model.pb").is_file()
            && !export_dir.join("saved_model.pbtxt").is_file()
        {
            return Err(Error::Load(format!(
                "no saved_model.pb in {}",
                export_dir.display()
            )));
        }

        let mut t = Timer::new_start("Loading session");

        let mut graph = Graph::new();
        let bundle =
            SavedModelBundle::load(&SessionOptions::new(), &config.tags, &mut graph, export_dir)
                .map_err(load_error)?;

        let (input, output, output_width) = {
            let signature = bundle
                .meta_graph_def()
                .get_signature(&config.signature)
                .map_err(load_error)?;

            let input = sole(signature.inputs(), "input")?;
            let output = sole(signature.outputs(), "output")?;

            if let Some(input_dims) = dims(input.shape()) {
                check_signature_input(&input_dims)?;
            }

            let output_width = signature_output_width(dims(output.shape()).as_deref());

            (
                Endpoint::from_info(input),
                Endpoint::from_info(output),
                output_width,
            )
        };

        graph
            .operation_by_name_required(&input.op)
            .map_err(load_error)?;
        graph
            .operation_by_name_required(&output.op)
            .map_err(load_error)?;

        t.stop();

        info!(
            "Loaded {} ({} -> {}, {:?} classes)",
            export_dir.display(),
            input.op,
            output.op,
            output_width
        );

        Ok(SavedModelClassifier {
            graph,
            session: bundle.session,
            input,
            output,
            output_width,
        })
    }
}

impl Classifier for SavedModelClassifier {
    fn output_width(&self) -> Option<usize> {
        self.output_width
    }

    fn classify(&self, image: &ImageTensor) -> Result<Vec<f32>> {
        check_input_shape(image)?;

        let mut t = Timer::new_start("Running session");

        let shape: Vec<u64> = image.shape().iter().map(|d| *d as u64).collect();
        let input = Tensor::new(&shape)
            .with_values(image.data())
            .map_err(|e| Error::shape(format!("{:?}", INPUT_SHAPE), e))?;

        let input_op = self
            .graph
            .operation_by_name_required(&self.input.op)
            .map_err(inference_error)?;
        let output_op = self
            .graph
            .operation_by_name_required(&self.output.op)
            .map_err(inference_error)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_op, self.input.index, &input);
        let result = args.request_fetch(&output_op, self.output.index);

        self.session.run(&mut args).map_err(inference_error)?;
        let output: Tensor<f32> = args.fetch(result).map_err(inference_error)?;

        t.stop();

        debug!("Model output dims {:?}", output.dims());
        check_output_dims(output.dims())?;

        Ok(output.to_vec())
    }
}
