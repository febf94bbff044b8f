use std::io::Cursor;

use tiny_http::Response;

use inkdigit::network::cnn::NUM_CLASSES;
use inkdigit::Predictor;

use crate::routes::json_response;

/// 1×1 PNG exercised through the full normalize → classify pipeline by the
/// health check. The content is irrelevant; what matters is that decode,
/// preprocessing, and the forward pass all complete.
const PROBE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub fn handle_health(predictor: &Predictor) -> Response<Cursor<Vec<u8>>> {
    match predictor.predict_data_url(PROBE_IMAGE) {
        Ok(_) => json_response(
            200,
            serde_json::json!({
                "status": "healthy",
                "message": "service is running and the model is loaded",
            })
            .to_string(),
        ),
        Err(e) => {
            log::error!("health probe failed: {e}");
            json_response(
                503,
                serde_json::json!({
                    "status": "unhealthy",
                    "message": e.to_string(),
                })
                .to_string(),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/model/info
// ---------------------------------------------------------------------------

pub fn handle_info(predictor: &Predictor) -> Response<Cursor<Vec<u8>>> {
    let meta = &predictor.model().metadata;
    let body = serde_json::json!({
        "model_type": "convolutional neural network",
        "architecture": "2 conv (1→32→64, 3x3) + 2 dense (3136→128→10)",
        "input_size": format!("{}x{}", meta.input_width, meta.input_height),
        "output_classes": NUM_CLASSES,
        "normalization": { "mean": meta.norm.mean, "std": meta.norm.std },
        "labels": &meta.output_labels,
        "description": &meta.description,
    });
    json_response(200, body.to_string())
}
