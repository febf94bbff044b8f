use std::io::Cursor;

use tiny_http::{Header, Method, Request, Response, StatusCode};

use inkdigit::Predictor;

use crate::handlers;
use crate::page;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn html_response(body: String) -> Response<Cursor<Vec<u8>>> {
    let bytes = body.into_bytes();
    let len = bytes.len();
    Response::new(
        StatusCode(200),
        vec![Header::from_bytes(b"Content-Type", b"text/html; charset=utf-8").unwrap()],
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

pub fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let bytes = body.into_bytes();
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        vec![Header::from_bytes(b"Content-Type", b"application/json").unwrap()],
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = b"404 Not Found".to_vec();
    let len = body.len();
    Response::new(
        StatusCode(404),
        vec![Header::from_bytes(b"Content-Type", b"text/plain").unwrap()],
        Cursor::new(body),
        Some(len),
        None,
    )
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Routes a request to its handler and sends the response.
///
/// Handlers receive `&mut Request` so the dispatcher keeps ownership and
/// can call `request.respond(response)` at the end.
pub fn dispatch(mut request: Request, predictor: &Predictor) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or(&url).to_owned();

    let response = match (method, path.as_str()) {
        (Method::Get, "/") => html_response(page::canvas_page()),

        (Method::Post, "/api/predict") => handlers::predict::handle_canvas(&mut request, predictor),
        (Method::Post, "/api/predict/file") => handlers::predict::handle_file(&mut request, predictor),

        (Method::Get, "/api/health") => handlers::meta::handle_health(predictor),
        (Method::Get, "/api/model/info") => handlers::meta::handle_info(predictor),

        _ => not_found(),
    };

    let _ = request.respond(response);
}
