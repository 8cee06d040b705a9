//! Lightpad headless card simulator
//!
//! Replays a scripted input session against a light card and prints the
//! resulting positions, selection and service calls as JSON.
//!
//! ```text
//! lightpad-sim <card.json> <script.json>
//! ```
//!
//! Set `RUST_LOG=debug` to follow gesture transitions and history commits.

mod script;

use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config_path, script_path] = args.as_slice() else {
        eprintln!("usage: lightpad-sim <card.json> <script.json>");
        return ExitCode::from(2);
    };

    let report = match script::simulate_files(Path::new(config_path), Path::new(script_path)) {
        Ok(report) => report,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Failed to write report: {}", err);
            ExitCode::FAILURE
        }
    }
}
