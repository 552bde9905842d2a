#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4_096 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let middle = text
        .char_indices()
        .nth(text.chars().count() / 2)
        .map_or(0, |(i, _)| i);
    let (left, right) = text.split_at(middle);

    let config = doc_compare::UnifyConfig::builder()
        .max_threshold(5.0)
        .build()
        .unwrap();
    if let Ok(pair) = doc_compare::unify_texts(left, right, &config) {
        let options = doc_compare::ReportOptions::default();
        let _ = doc_compare::build_report(&pair.left, &pair.right, &options);
    }
});
