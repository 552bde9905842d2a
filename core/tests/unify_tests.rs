mod common;

use common::{contract_text, letters, CONTRACT};
use doc_compare::{unify_texts, unify_with_threshold, Pass, PassKind, UnifyConfig};

#[test]
fn identical_texts_align_paragraph_by_paragraph() {
    let text = contract_text();
    let pair = unify_texts(&text, &text, &UnifyConfig::default()).expect("unify");

    let expected: String = CONTRACT.iter().map(|p| format!("{p}\n\n")).collect();
    assert!(pair.left.starts_with(&expected), "left was {:?}", pair.left);
    assert!(pair.right.starts_with(&expected), "right was {:?}", pair.right);
    assert_eq!(pair.chapters, CONTRACT.len() + 1);
}

#[test]
fn hard_wrapped_edition_keeps_all_text() {
    let left = contract_text();
    let right = [
        CONTRACT[0],
        "2. The supplier delivers goods within thirty",
        "calendar days after payment",
        CONTRACT[2],
        CONTRACT[3],
    ]
    .join("\n");

    let pair = unify_texts(&left, &right, &UnifyConfig::default()).expect("unify");
    assert!(pair.chapters >= 2);
    assert_eq!(letters(&pair.left), letters(&left));
    assert_eq!(letters(&pair.right), letters(&right));
}

#[test]
fn blank_lines_in_input_are_ignored() {
    let spaced = CONTRACT.join("\n\n  \n");
    let dense = contract_text();
    let from_spaced = unify_texts(&spaced, &dense, &UnifyConfig::default()).expect("unify");
    let from_dense = unify_texts(&dense, &dense, &UnifyConfig::default()).expect("unify");
    assert_eq!(from_spaced.left, from_dense.left);
}

#[test]
fn threshold_override_is_validated() {
    let text = contract_text();
    assert!(unify_with_threshold(&text, &text, -1.0, &UnifyConfig::default()).is_err());
    let pair = unify_with_threshold(&text, &text, 50.0, &UnifyConfig::default()).expect("unify");
    assert_eq!(pair.chapters, CONTRACT.len() + 1);
}

#[test]
fn best_border_start_pipeline_runs() {
    let config = UnifyConfig::builder()
        .passes(vec![
            Pass::new(PassKind::Paragraph, 1.0),
            Pass::new(PassKind::Token, 0.618),
            Pass::new(PassKind::BestBorderStart, 0.05),
        ])
        .build()
        .expect("config");
    let left = contract_text();
    let right = CONTRACT.join(" ");
    let pair = unify_texts(&left, &right, &config).expect("unify");
    assert_eq!(letters(&pair.left), letters(&left));
    assert_eq!(letters(&pair.right), letters(&right));
}

#[test]
fn dump_dir_receives_snapshots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = UnifyConfig::builder()
        .max_threshold(1.0)
        .dump_dir(dir.path())
        .build()
        .expect("config");
    let text = contract_text();
    unify_texts(&text, &text, &config).expect("unify");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dump dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("0_paragraph_left_")));
    assert!(names.iter().any(|n| n.starts_with("0_paragraph_right_")));
    let left_snapshot = std::fs::read_to_string(dir.path().join("0_paragraph_left_0.1.txt"))
        .expect("first snapshot");
    assert!(left_snapshot.starts_with("chapter: 0, born_rate: None\n"));
}

#[test]
fn merged_closing_clauses_keep_text_in_order() {
    let left = contract_text();
    let right = [
        CONTRACT[0].to_string(),
        CONTRACT[1].to_string(),
        format!("{} {}", CONTRACT[2], CONTRACT[3]),
    ]
    .join("\n");

    let pair = unify_texts(&left, &right, &UnifyConfig::default()).expect("unify");
    assert!(pair.chapters >= 2);
    assert_eq!(letters(&pair.left), letters(&left));
    assert_eq!(letters(&pair.right), letters(&right));
    assert!(pair.right.starts_with(&format!("{}\n\n", CONTRACT[0])));
}

#[test]
fn single_line_edition_with_one_start_window_stays_whole() {
    let config = UnifyConfig::builder()
        .passes(vec![Pass::new(PassKind::BestBorderStart, 1.0)])
        .build()
        .expect("config");
    let pair = unify_texts("alpha beta\ngamma", "alpha beta gamma", &config).expect("unify");
    assert_eq!(pair.chapters, 1);
    assert_eq!(pair.left, "alpha beta\ngamma\n\n\n");
    assert_eq!(pair.right, "alpha beta gamma\n\n\n");
}

#[test]
fn token_pass_on_single_line_edition_keeps_text_in_order() {
    let config = UnifyConfig::builder()
        .passes(vec![
            Pass::new(PassKind::Token, 1.0),
            Pass::new(PassKind::BestBorderStart, 1.0),
        ])
        .build()
        .expect("config");
    let left = contract_text();
    let right = CONTRACT.join(" ");
    let pair = unify_texts(&left, &right, &config).expect("unify");
    assert_eq!(letters(&pair.left), letters(&left));
    assert_eq!(letters(&pair.right), letters(&right));
}
