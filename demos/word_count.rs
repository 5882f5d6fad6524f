//! Word frequency counter pipeline.
//!
//! Splits lines into words, folds the counts into one map, and prints the
//! most frequent words.
//!
//! Usage: cargo run --example word_count

use std::collections::HashMap;

use rivulet::{sinks, sources};

fn main() -> rivulet::Result<()> {
    let lines: Vec<String> = [
        "the quick brown fox jumps over the lazy dog",
        "the dog barks and the fox runs",
        "quick thinking beats quick talking",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let counts = sources::slice(lines)
        .map(|line: String| {
            line.split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<String>>()
        })
        .fold(
            HashMap::<String, usize>::new(),
            |mut counts: HashMap<String, usize>, words: Vec<String>| {
                for word in words {
                    *counts.entry(word).or_default() += 1;
                }
                counts
            },
        )
        .run_with(&sinks::collect::<HashMap<String, usize>>())
        .execute()?
        .single::<Vec<HashMap<String, usize>>>()
        .expect("collect emits one vector")
        .pop()
        .expect("fold emits one map");

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (word, count) in ranked.iter().take(5) {
        println!("{count:>3}  {word}");
    }
    Ok(())
}
