//! Run one replace pass over a markup file and print the result.
//!
//! Usage:
//!   folio-replace <markup-file> <pattern> <replacement> [--match-case] [--whole-words] [--reapply]
//!
//! With `--reapply` the style of the first styled occurrence is applied to
//! every replacement; otherwise each replacement keeps its surrounding
//! style.

use folio_engine::replace::{ReplaceMode, ReplaceOutcome, ReplaceRequest};
use folio_engine::search::SearchOptions;
use folio_engine::Editor;
use std::path::PathBuf;
use std::process::ExitCode;

struct ReplaceArgs {
    input: PathBuf,
    request: ReplaceRequest,
}

impl ReplaceArgs {
    fn from_args() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut positional = Vec::new();
        let mut options = SearchOptions::default();
        let mut mode = ReplaceMode::PreserveStyle;

        for arg in args.iter().skip(1) {
            match arg.as_str() {
                "--match-case" => options = options.with_match_case(true),
                "--whole-words" => options = options.with_whole_words(true),
                "--reapply" => mode = ReplaceMode::ReapplyStyle,
                other => positional.push(other.to_string()),
            }
        }

        if positional.len() != 3 {
            return None;
        }
        let replacement = positional.pop()?;
        let pattern = positional.pop()?;
        let input = PathBuf::from(positional.pop()?);

        Some(Self {
            input,
            request: ReplaceRequest::new(pattern, replacement)
                .with_options(options)
                .with_mode(mode),
        })
    }
}

fn run(args: &ReplaceArgs) -> folio_engine::Result<(ReplaceOutcome, String)> {
    let markup = std::fs::read_to_string(&args.input)?;
    let mut editor = Editor::from_markup(&markup)?;
    let outcome = editor.replace(&args.request)?;
    Ok((outcome, editor.to_markup()))
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match ReplaceArgs::from_args() {
        Some(args) => args,
        None => {
            eprintln!(
                "Usage: folio-replace <markup-file> <pattern> <replacement> \
                 [--match-case] [--whole-words] [--reapply]"
            );
            return ExitCode::from(2);
        },
    };

    match run(&args) {
        Ok((outcome, markup)) => {
            match outcome {
                ReplaceOutcome::Replaced(count) => eprintln!("Replaced {} occurrences", count),
                ReplaceOutcome::NoMatches => eprintln!("No matches found"),
            }
            println!("{}", markup);
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
