use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use leaf_serve::{load_pipeline, SavedModelConfig, Upload};
use log::{debug, error};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-classify",
    about = "CLI app to identify plant leaf diseases with TensorFlow"
)]
struct CmdArgs {
    #[structopt(
        long,
        env = "LEAF_MODEL_DIR",
        parse(from_os_str),
        help = "Export directory of TensorFlow SavedModel"
    )]
    model_dir: PathBuf,

    #[structopt(
        long,
        env = "LEAF_CATALOG",
        parse(from_os_str),
        help = "Label/description mapping document, defaults to the built-in PlantVillage tables"
    )]
    catalog: Option<PathBuf>,

    #[structopt(long, default_value = "serving_default", help = "SavedModel signature key")]
    signature: String,

    #[structopt(
        long,
        default_value = "serve",
        use_delimiter = true,
        help = "SavedModel tag set"
    )]
    tags: Vec<String>,

    #[structopt(long, help = "Print the prediction as a single JSON line")]
    json: bool,

    #[structopt(parse(from_os_str), help = "Leaf image to classify (jpg, jpeg or png)")]
    image: PathBuf,
}

impl CmdArgs {
    fn model_config(&self) -> SavedModelConfig {
        let mut config = SavedModelConfig::new(&self.model_dir);
        config.signature = self.signature.clone();
        config.tags = self.tags.clone();
        config
    }
}

fn read_upload(path: &Path) -> leaf_serve::Result<Upload> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    // Reject by extension before touching the file
    leaf_serve::UploadKind::from_filename(name)?;

    let bytes = fs::read(path)?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    Upload::new(name, bytes)
}

/// Problems with the input image exit with 2; anything else propagates
fn fail(path: &Path, err: leaf_serve::Error) -> Box<dyn Error> {
    if err.is_user_error() {
        error!("{}: {}", path.display(), err);
        eprintln!("{}", err);
        process::exit(2);
    }
    err.into()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let upload = read_upload(&args.image).map_err(|e| fail(&args.image, e))?;

    let pipeline = load_pipeline(&args.model_config(), args.catalog.as_deref())?;

    let prediction = pipeline
        .predict_upload(&upload)
        .map_err(|e| fail(&args.image, e))?;

    if args.json {
        println!("{}", serde_json::to_string(&prediction)?);
    } else {
        println!("Predicted Disease: {}", prediction.label);
        println!("Description: {}", prediction.description);
    }

    Ok(())
}
