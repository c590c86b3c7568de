use std::convert::Infallible;
use std::error::Error;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use leaf_serve::{load_pipeline, SavedModelConfig, UploadKind};
use log::{error, info, warn};
use structopt::StructOpt;

mod handler;
mod page;

use handler::{handle, AppState};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-web",
    about = "Single page web app that identifies plant leaf diseases"
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

    #[structopt(long, env = "LEAF_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    #[structopt(long, default_value = "209715200", help = "Largest accepted upload in bytes")]
    max_upload_bytes: usize,

    #[structopt(
        long,
        parse(from_os_str),
        help = "Page background image (jpg, jpeg or png)"
    )]
    background: Option<PathBuf>,
}

impl CmdArgs {
    fn model_config(&self) -> SavedModelConfig {
        let mut config = SavedModelConfig::new(&self.model_dir);
        config.signature = self.signature.clone();
        config.tags = self.tags.clone();
        config
    }
}

/// Background is cosmetic: a missing or unsupported file only loses the image
fn load_background(path: &Path) -> Option<(&'static str, Vec<u8>)> {
    let name = path.file_name()?.to_str()?;

    let content_type = match UploadKind::from_filename(name) {
        Ok(UploadKind::Jpeg) => "image/jpeg",
        Ok(UploadKind::Png) => "image/png",
        Err(err) => {
            warn!("Ignoring background: {}", err);
            return None;
        }
    };

    match fs::read(path) {
        Ok(bytes) => Some((content_type, bytes)),
        Err(err) => {
            warn!("Ignoring background {}: {}", path.display(), err);
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    // Nothing is served unless the model and catalog load
    let pipeline = load_pipeline(&args.model_config(), args.catalog.as_deref())?;

    info!("Loaded model in memory");

    let state = Arc::new(AppState {
        pipeline,
        max_upload_bytes: args.max_upload_bytes,
        background: args.background.as_deref().and_then(load_background),
    });

    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let state = Arc::clone(&state);
        let service = service_fn(move |req| handle(req, state.clone()));
        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::try_bind(&args.listen)?
        .serve(make_service)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Could not install signal handler: {}", e);
            }
        });

    info!("Listening on http://{}", args.listen);

    if let Err(e) = server.await {
        error!("server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = CmdArgs::from_iter_safe(&["leaf-web", "--model-dir", "/opt/leaf"]).unwrap();
        assert_eq!(args.listen, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(args.max_upload_bytes, 200 * 1024 * 1024);
        assert_eq!(args.background, None);
        assert_eq!(args.model_config().signature, "serving_default");
    }

    #[test]
    fn background_requires_an_image_extension() {
        assert!(load_background(Path::new("/tmp/background.gif")).is_none());
        assert!(load_background(Path::new("/definitely/missing/background.jpg")).is_none());
    }
}
