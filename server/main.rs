/// inkdigit server
///
/// Serves the drawing canvas and the prediction API over a synchronous
/// tiny_http server. The classifier is constructed exactly once, before
/// the accept loop, and injected into every request thread; a failed
/// model load aborts startup so the process never accepts inference
/// traffic without a usable model.
///
/// Run with:
///   cargo run --bin server --release [model.json]
/// Then open http://127.0.0.1:8000
mod handlers;
mod logger;
mod page;
mod routes;
mod util;

use std::sync::Arc;

use tiny_http::Server;

use inkdigit::Predictor;

fn main() {
    if let Err(e) = logger::init() {
        eprintln!("logger init failed: {e}");
    }

    let model_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("INKDIGIT_MODEL").ok())
        .unwrap_or_else(|| "model/digit_cnn.json".to_owned());

    let predictor = match Predictor::load(&model_path) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            log::error!("startup aborted, refusing to serve: {e}");
            std::process::exit(1);
        }
    };

    let addr = "0.0.0.0:8000";
    let server = Server::http(addr).expect("Failed to bind HTTP server");
    log::info!("serving digit recognition on http://{addr} (model: {model_path})");

    // The forward pass is CPU-bound, so each request gets its own thread;
    // a slow classification never stalls other clients. The predictor is
    // read-only after load and needs no locking.
    for request in server.incoming_requests() {
        let predictor = Arc::clone(&predictor);
        std::thread::spawn(move || {
            routes::dispatch(request, &predictor);
        });
    }
}
