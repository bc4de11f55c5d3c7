use clap::Parser;
use gramcheck::{
    check_errors,
    components::{annotator::Annotator, replay::ReplayDocument},
    readability::Flesch,
    CheckOptions, Corrector, Grammar, Input, SharedGrammar,
};
use std::{collections::HashSet, io::BufReader, sync::Arc};

/// Checks recorded tokenizer and parser output for spelling and grammar errors.
#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON recording of the tokenizer, parser and lexicon output.
    recording: String,
    /// Text to check. Defaults to the recorded text.
    text: Option<String>,
    #[clap(long, short, default_value = "text")]
    format: String,
    /// Grammar as JSON or binary.
    #[clap(long, short)]
    grammar: Option<String>,
    /// Only report token-level errors.
    #[clap(long)]
    spelling_only: bool,
    #[clap(long, short)]
    annotations: bool,
    #[clap(long)]
    print_all: bool,
    /// Error codes to ignore.
    #[clap(long, short)]
    ignore: Vec<String>,
    #[clap(long)]
    suppress_suggestions: bool,
    #[clap(long)]
    spaced: bool,
    #[clap(long)]
    normalize: bool,
    /// Append the Flesch readability score.
    #[clap(long)]
    flesch: bool,
}

fn main() -> Result<(), gramcheck::Error> {
    env_logger::init();
    let opts = Opts::parse();

    let document = ReplayDocument::from_reader(BufReader::new(fs_err::File::open(&opts.recording)?))?;
    let input = match opts.text {
        Some(text) => Input::Text(text),
        None => Input::Lines(document.text()),
    };

    let grammar = match &opts.grammar {
        Some(path) => SharedGrammar::new(path).get()?,
        None => Arc::new(Grammar::default()),
    };

    let (speller, parser, lexicon) = document.into_parts();
    let mut corrector = Corrector::new(speller, parser, Annotator::new(grammar, lexicon));
    if opts.flesch {
        corrector = corrector.with_readability(Flesch);
    }

    let output = check_errors(
        &corrector,
        CheckOptions {
            input: Some(input),
            format: opts.format,
            all_errors: !opts.spelling_only,
            annotations: opts.annotations,
            print_all: opts.print_all,
            ignore_rules: opts.ignore.into_iter().collect::<HashSet<_>>(),
            suppress_suggestions: opts.suppress_suggestions,
            spaced: opts.spaced,
            normalize: opts.normalize,
        },
    )?;
    println!("{}", output);

    Ok(())
}
