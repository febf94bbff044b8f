use std::io::{Cursor, Read};

use tiny_http::{Request, Response};

use inkdigit::{Error, Prediction, PredictionOutcome, Predictor, Result};

use crate::routes::json_response;
use crate::util::form::{form_get, parse_form};
use crate::util::multipart::{extract_boundary, extract_file_part};

// ---------------------------------------------------------------------------
// POST /api/predict: urlencoded form with an `image` data-URL field
// ---------------------------------------------------------------------------

pub fn handle_canvas(request: &mut Request, predictor: &Predictor) -> Response<Cursor<Vec<u8>>> {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);

    let pairs = parse_form(&body);
    let payload = form_get(&pairs, "image").unwrap_or("");
    if payload.trim().is_empty() {
        return failure_response(400, "No image data provided");
    }

    respond(predictor.predict_data_url(payload))
}

// ---------------------------------------------------------------------------
// POST /api/predict/file: multipart upload, first file part is the image
// ---------------------------------------------------------------------------

pub fn handle_file(request: &mut Request, predictor: &Predictor) -> Response<Cursor<Vec<u8>>> {
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default();

    let boundary = match extract_boundary(&content_type) {
        Some(b) => b,
        None => return failure_response(400, "Expected a multipart/form-data upload"),
    };

    let mut body: Vec<u8> = Vec::new();
    let _ = request.as_reader().read_to_end(&mut body);

    match extract_file_part(&body, &boundary) {
        Some(bytes) if !bytes.is_empty() => respond(predictor.predict_bytes(&bytes)),
        _ => failure_response(400, "No image file was uploaded"),
    }
}

// ---------------------------------------------------------------------------
// Result → HTTP mapping
// ---------------------------------------------------------------------------

/// Bad input is the client's fault (400); a model or invariant failure
/// mid-serving is ours (500) and is never masked as a success.
fn respond(result: Result<Prediction>) -> Response<Cursor<Vec<u8>>> {
    let status = match &result {
        Ok(_) => 200,
        Err(Error::InvalidImageData { .. }) => 400,
        Err(Error::ModelUnavailable { .. }) | Err(Error::InvalidInput { .. }) => 500,
    };

    let outcome = PredictionOutcome::from_result(&result);
    let mut body = serde_json::to_value(&outcome).expect("outcome serializes");
    body["confidence_percentage"] =
        serde_json::Value::String(format!("{:.1}%", outcome.confidence * 100.0));

    json_response(status, body.to_string())
}

fn failure_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({
        "success": false,
        "prediction": null,
        "confidence": 0.0,
        "confidence_percentage": "0.0%",
        "error": message,
    });
    json_response(status, body.to_string())
}
