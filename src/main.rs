// Command-line classifier: reads an image file, runs it through the same
// normalize → classify pipeline the server uses, and prints the structured
// result as JSON. Exit codes: 0 prediction made, 1 model missing/corrupt,
// 2 bad usage or unreadable input.
use std::env;
use std::process::ExitCode;

use inkdigit::{Predictor, PredictionOutcome};

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let image_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("Usage: inkdigit <image-file> [model.json]");
            eprintln!("The model path defaults to $INKDIGIT_MODEL or model/digit_cnn.json.");
            return ExitCode::from(2);
        }
    };
    let model_path = args
        .next()
        .or_else(|| env::var("INKDIGIT_MODEL").ok())
        .unwrap_or_else(|| "model/digit_cnn.json".to_owned());

    let predictor = match Predictor::load(&model_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    let bytes = match std::fs::read(&image_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("cannot read '{image_path}': {e}");
            return ExitCode::from(2);
        }
    };

    let result = predictor.predict_bytes(&bytes);
    let outcome = PredictionOutcome::from_result(&result);
    println!("{}", serde_json::to_string_pretty(&outcome).expect("outcome serializes"));

    if outcome.success { ExitCode::SUCCESS } else { ExitCode::from(1) }
}
