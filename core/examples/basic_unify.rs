use doc_compare::{UnifyConfig, unify_texts};

fn usage() -> ! {
    eprintln!("Usage: basic_unify <LEFT.txt> <RIGHT.txt> [THRESHOLD]");
    eprintln!("  THRESHOLD: optional maximum border rate (default 200)");
    std::process::exit(2);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let left_path = args.next().unwrap_or_else(|| usage());
    let right_path = args.next().unwrap_or_else(|| usage());
    let threshold: Option<f64> = args.next().map(|s| s.parse()).transpose()?;

    let left = std::fs::read_to_string(&left_path)?;
    let right = std::fs::read_to_string(&right_path)?;

    let mut builder = UnifyConfig::builder();
    if let Some(threshold) = threshold {
        builder = builder.max_threshold(threshold);
    }
    let pair = unify_texts(&left, &right, &builder.build()?)?;

    println!("chapters: {}", pair.chapters);
    for (i, (l, r)) in pair.left.split("\n\n").zip(pair.right.split("\n\n")).enumerate() {
        println!("--- {i:>4} ---");
        println!("{l}");
        println!("{r}");
    }

    Ok(())
}
