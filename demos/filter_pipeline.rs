//! Even-number filter over an endless counter.
//!
//! Usage: cargo run --example filter_pipeline

use rivulet::{sinks, sources};

fn main() -> rivulet::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let evens = sources::sequence(0u32)
        .filter(|x: &u32| x % 2 == 0)
        .take(10)
        .run_with(&sinks::collect::<u32>())
        .execute()?
        .single::<Vec<u32>>()
        .expect("collect emits one vector");

    println!("first ten even numbers: {evens:?}");
    Ok(())
}
