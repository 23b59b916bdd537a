// Map a JSON list of recognized spans onto deed fields.
//
//   echo '[{"text":"Alice","label":"PERSON"}]' | map_entities

use clap::Parser;
use deedscan::{models::RecognizedSpan, processing::map_fields, DeedError};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "map_entities", about = "Map recognized entity spans to deed fields")]
struct Args {
    /// JSON file with an array of spans; stdin when omitted
    input: Option<PathBuf>,
}

fn run(args: &Args) -> Result<String, DeedError> {
    let raw = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let spans: Vec<RecognizedSpan> = serde_json::from_str(&raw)?;
    let fields = map_fields(&spans);
    Ok(serde_json::to_string_pretty(&fields)?)
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
