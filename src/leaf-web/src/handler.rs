use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use leaf_serve::{Error, InferencePipeline, Timer, Upload};
use log::{debug, info, warn};
use serde_json::json;
use url::form_urlencoded;

use crate::page::INDEX_HTML;

/// Everything a request needs; built once before the server binds
pub struct AppState {
    pub pipeline: InferencePipeline,

    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,

    /// Page background as (content type, bytes)
    pub background: Option<(&'static str, Vec<u8>)>,
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnsupportedUpload(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Error::Decode(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, json!({ "error": message }).to_string())
}

fn plain(status: StatusCode, content_type: &'static str, body: Body) -> Response<Body> {
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

/// Decoded value of the first `key` in a query string
fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Read the body, giving up as soon as it exceeds `limit`
async fn read_limited(req: Request<Body>, limit: usize) -> Result<Vec<u8>, Response<Body>> {
    let too_large = || {
        error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("Upload exceeds the {} byte limit", limit),
        )
    };

    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.map_or(false, |len| len > limit) {
        return Err(too_large());
    }

    let mut body = req.into_body();
    let mut buf = Vec::with_capacity(declared.unwrap_or(0));
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, &format!("Could not read upload: {}", e))
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}

async fn predict(req: Request<Body>, state: &AppState) -> Response<Body> {
    let filename = match query_param(req.uri().query(), "filename") {
        Some(name) if !name.is_empty() => name,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Missing 'filename' query parameter",
            )
        }
    };

    // Extension check happens before the body is read
    if let Err(err) = leaf_serve::UploadKind::from_filename(&filename) {
        return error_response(status_for(&err), &err.to_string());
    }

    let bytes = match read_limited(req, state.max_upload_bytes).await {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };

    let mut t = Timer::new_start("Handling request");

    let result = Upload::new(&filename, bytes).and_then(|u| state.pipeline.predict_upload(&u));

    t.stop();

    match result {
        Ok(prediction) => {
            info!("{} -> {} in {} msec", filename, prediction.label, t.millis());
            match serde_json::to_string(&prediction) {
                Ok(body) => json_response(StatusCode::OK, body),
                Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            }
        }
        Err(err) => {
            if err.is_user_error() {
                info!("Rejected {}: {}", filename, err);
            } else {
                warn!("Classification failure for {}: {}", filename, err);
            }
            error_response(
                status_for(&err),
                &format!("Classification failure: '{}'", err),
            )
        }
    }
}

pub async fn handle(
    req: Request<Body>,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    debug!("{} {}", req.method(), req.uri());

    let resp = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => plain(
            StatusCode::OK,
            "text/html; charset=utf-8",
            Body::from(INDEX_HTML),
        ),
        (&Method::GET, "/health") => plain(StatusCode::OK, "text/plain", Body::from("ok")),
        (&Method::GET, "/background") => match state.background {
            Some((content_type, ref bytes)) => {
                plain(StatusCode::OK, content_type, Body::from(bytes.clone()))
            }
            None => plain(StatusCode::NOT_FOUND, "text/plain", Body::from("not found")),
        },
        (&Method::POST, "/predict") => predict(req, &state).await,
        _ => plain(StatusCode::NOT_FOUND, "text/plain", Body::from("not found")),
    };

    Ok(resp)
}
