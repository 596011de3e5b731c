//! Import a PDF and print the inferred markup.
//!
//! Usage:
//!   folio-import <file.pdf>
//!   folio-import <file.pdf> --config engine.json
//!   folio-import <file.pdf> --json
//!
//! Set `RUST_LOG=debug` to see reader warnings.

use folio_engine::config::EngineConfig;
use folio_engine::import::import_pdf_file;
use std::path::PathBuf;
use std::process::ExitCode;

struct ImportArgs {
    input: PathBuf,
    config: Option<PathBuf>,
    json: bool,
}

impl ImportArgs {
    fn from_args() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut input = None;
        let mut config = None;
        let mut json = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--json" => {
                    json = true;
                },
                other if input.is_none() && !other.starts_with("--") => {
                    input = Some(PathBuf::from(other));
                },
                other => {
                    eprintln!("Ignoring unknown argument: {}", other);
                },
            }
            i += 1;
        }

        Some(Self {
            input: input?,
            config,
            json,
        })
    }
}

fn run(args: &ImportArgs) -> folio_engine::Result<String> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let document = import_pdf_file(&args.input, &config)?;
    if args.json {
        Ok(serde_json::to_string_pretty(&document)?)
    } else {
        Ok(document.to_markup())
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match ImportArgs::from_args() {
        Some(args) => args,
        None => {
            eprintln!("Usage: folio-import <file.pdf> [--config engine.json] [--json]");
            return ExitCode::from(2);
        },
    };

    match run(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        },
        Err(e) => {
            if e.is_import_error() {
                eprintln!("{}", e.user_message());
                log::debug!("Import error: {:?}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        },
    }
}
