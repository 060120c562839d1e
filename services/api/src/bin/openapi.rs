//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the planner API.
//!
//! Usage: `openapi [PATH]`. `PATH` defaults to `openapi.json`; `-` prints to stdout.

use planner_lib::web::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let doc = ApiDoc::openapi();
    let json = doc.to_pretty_json()?;
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    if output == "-" {
        println!("{}", json);
        return Ok(());
    }

    std::fs::write(&output, json)?;
    eprintln!(
        "OpenAPI document with {} paths written to {}",
        doc.paths.paths.len(),
        output
    );
    Ok(())
}
