use std::{
    collections::{HashMap, HashSet},
    io::BufReader,
    sync::Arc,
};

use gramcheck::{
    check_errors,
    components::{annotator::Annotator, replay::ReplayDocument},
    correct::CorrectionResult,
    format::{format_grammar, Format, FormatOptions},
    readability::Flesch,
    types::{Meaning, ParseOutcome, Sentence, Token, TokenError, TokenKind},
    Annotation, CheckOptions, Corrector, Error, Grammar, SharedGrammar,
};
use lazy_static::lazy_static;
use quickcheck_macros::quickcheck;

const RECORDING_PATH: &str = "tests/data/recording.json";
const GRAMMAR_PATH: &str = "tests/data/grammar.json";

lazy_static! {
    static ref RECORDING: ReplayDocument =
        ReplayDocument::from_reader(BufReader::new(std::fs::File::open(RECORDING_PATH).unwrap()))
            .unwrap();
    static ref GRAMMAR: Arc<Grammar> = SharedGrammar::new(GRAMMAR_PATH).get().unwrap();
}

fn corrector() -> Corrector {
    let (speller, parser, lexicon) = RECORDING.clone().into_parts();
    Corrector::new(speller, parser, Annotator::new(Arc::clone(&GRAMMAR), lexicon))
}

fn check(format: &str, all_errors: bool) -> String {
    check_errors(
        &corrector(),
        CheckOptions {
            input: Some(RECORDING.text().into()),
            format: format.to_string(),
            all_errors,
            ..CheckOptions::default()
        },
    )
    .unwrap()
}

fn codes(result: &CorrectionResult) -> Vec<Vec<(String, usize, usize)>> {
    result
        .sentences
        .iter()
        .map(|sentence| {
            sentence
                .annotations
                .iter()
                .flatten()
                .map(|x| (x.code.clone(), x.start, x.end))
                .collect()
        })
        .collect()
}

#[test]
fn annotates_recorded_document() {
    let _ = env_logger::builder().is_test(true).try_init();

    let result = corrector().correct(&RECORDING.text(), &HashSet::new(), false);

    assert_eq!(
        codes(&result),
        vec![
            vec![("E003".to_string(), 0, 0)],
            vec![("S004".to_string(), 2, 2)],
            vec![("E004".to_string(), 0, 6)],
            vec![("E001".to_string(), 0, 3)],
        ]
    );

    let unparsed = &result.sentences[3].annotations.as_ref().unwrap()[0];
    assert_eq!(
        unparsed.detail.as_deref(),
        Some("Þáttun brást í kring um 3. tóka ('kom ekki.')")
    );

    let stats = result.stats.unwrap();
    assert_eq!(stats.num_sentences, 4);
    assert_eq!(stats.num_parsed, 2);
    assert_eq!(stats.num_tokens, 20);
}

#[test]
fn renders_text() {
    assert_eq!(
        check("text", true),
        "Mér langar í hest.\nÉg sá hest.\nThe cat sat on the mat.\nHann kom ekki."
    );
}

#[test]
fn renders_m2() {
    assert_eq!(
        check("m2", true),
        [
            "S Mér langar í hest .",
            "A 0 1|||E003||||||REQUIRED|||-NONE-|||0",
            "",
            "S Ég sá hest .",
            "A 2 3|||S004|||hest|||REQUIRED|||-NONE-|||0",
            "",
            "S The cat sat on the mat .",
            "A 0 7|||E004||||||REQUIRED|||-NONE-|||0",
            "",
            "S Hann kom ekki .",
            "A 0 4|||E001||||||REQUIRED|||-NONE-|||0",
            "",
        ]
        .join("\n")
    );
}

#[test]
fn renders_json_with_document_offsets() {
    let json = check("json", true);
    let sentences: Vec<serde_json::Value> = json
        .lines()
        .map(|x| serde_json::from_str(x).unwrap())
        .collect();

    assert_eq!(sentences.len(), 4);
    assert_eq!(sentences[0]["original"], "Mér langar í hest.");
    assert_eq!(sentences[0]["annotations"][0]["start_char"], 0);
    assert_eq!(sentences[0]["annotations"][0]["end_char"], 2);

    let spelling = &sentences[1]["annotations"][0];
    assert_eq!(spelling["code"], "S004");
    assert_eq!(spelling["suggest"], "hest");
    assert_eq!(spelling["start_char"], 24);
    assert_eq!(spelling["end_char"], 29);
}

#[test]
fn renders_csv() {
    let csv = check("csv", true);
    let lines: Vec<_> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "S004,hestr,hest,2,2,hest|hesti");
}

#[test]
fn renders_spelling_only() {
    let output = check_errors(
        &corrector(),
        CheckOptions {
            input: Some(RECORDING.text().into()),
            format: "text".to_string(),
            all_errors: false,
            annotations: true,
            ..CheckOptions::default()
        },
    )
    .unwrap();

    assert_eq!(
        output,
        "Mér langar í hest. Ég sá hest. The cat sat on the mat. Hann kom ekki.\nS004: Orðið 'hestr' var leiðrétt í 'hest'"
    );

    let csv = check("csv", false);
    assert_eq!(csv.lines().filter(|x| *x == "0,\"\",\"\"").count(), 4);
}

#[test]
fn prefilter_skips_grammar() {
    let corrector = corrector().with_prefilter(|_: &str| false);
    let result = corrector.correct(&RECORDING.text(), &HashSet::new(), false);

    assert_eq!(result.sentences.len(), 1);
    assert!(result.stats.is_none());
    assert_eq!(
        format_grammar(&result, Format::Text, &FormatOptions::default()).unwrap(),
        "Mér langar í hest. Ég sá hest. The cat sat on the mat. Hann kom ekki."
    );
}

#[test]
fn appends_readability() {
    let output = check_errors(
        &corrector().with_readability(Flesch),
        CheckOptions {
            input: Some(RECORDING.text().into()),
            format: "text".to_string(),
            ..CheckOptions::default()
        },
    )
    .unwrap();

    let score_line = output.lines().last().unwrap();
    assert!(score_line.starts_with("Flesch score: "));
    assert!(score_line.ends_with(')'));
}

#[test]
fn configuration_errors() {
    assert!(matches!(
        check_errors(&corrector(), CheckOptions::default()),
        Err(Error::MissingInput)
    ));

    let result = check_errors(
        &corrector(),
        CheckOptions {
            input: Some("Hann kom ekki.".into()),
            format: "xml".to_string(),
            ..CheckOptions::default()
        },
    );
    assert_eq!(
        result.unwrap_err().to_string(),
        "tried to format with invalid format: xml"
    );
}

#[quickcheck]
fn ignored_rules_are_filtered(flags: (bool, bool, bool, bool)) -> bool {
    let (e001, e003, e004, s004) = flags;
    let ignore_rules: HashSet<String> = vec![("E001", e001), ("E003", e003), ("E004", e004), ("S004", s004)]
        .into_iter()
        .filter(|(_, ignored)| *ignored)
        .map(|(code, _)| code.to_string())
        .collect();

    let corrector = corrector();
    let full = corrector.correct(&RECORDING.text(), &HashSet::new(), false);
    let filtered = corrector.correct(&RECORDING.text(), &ignore_rules, false);

    full.sentences
        .iter()
        .zip(filtered.sentences.iter())
        .all(|(full, filtered)| {
            let expected: Vec<&Annotation> = full
                .annotations
                .iter()
                .flatten()
                .filter(|x| !ignore_rules.contains(&x.code))
                .collect();
            let actual: Vec<&Annotation> = filtered.annotations.iter().flatten().collect();

            expected == actual
        })
}

#[quickcheck]
fn annotations_stay_in_sentence(words: Vec<(bool, Option<u8>)>, error_index: u8) -> bool {
    let tokens: Vec<Token> = words
        .iter()
        .enumerate()
        .map(|(i, (recognized, span))| {
            let meanings = if *recognized {
                vec![Meaning::new("hestur", "kk", "NFET")]
            } else {
                Vec::new()
            };
            let token = Token::new(TokenKind::Word, format!("orð{}", i)).with_meanings(meanings);
            match span {
                Some(span) => token.with_error(TokenError::new("S001", "Villa").with_span(*span as usize % 4 + 1)),
                None => token,
            }
        })
        .collect();
    let n_tokens = tokens.len();

    let annotator = Annotator::new(Arc::clone(&GRAMMAR), HashMap::<String, Vec<Meaning>>::new());
    let annotations = annotator.annotate(&Sentence::new(
        tokens,
        ParseOutcome::Failed {
            error_index: error_index as usize,
        },
    ));

    annotations.iter().all(|x| x.start <= x.end && x.end < n_tokens)
        && annotations
            .windows(2)
            .all(|pair| (pair[0].start, std::cmp::Reverse(pair[0].end)) <= (pair[1].start, std::cmp::Reverse(pair[1].end)))
}
