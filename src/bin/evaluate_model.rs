// Score a labeled CSV with a crop pipeline artifact and print a classification report.
//
// Usage: cargo run --bin evaluate_model -- <model.json> <samples.csv> [label_column]

use crop_advisor::evaluation::{evaluate, load_samples, DEFAULT_LABEL_COLUMN};
use crop_advisor::CropRecommender;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        anyhow::bail!("usage: evaluate_model <model.json> <samples.csv> [label_column]");
    }

    let model_path = PathBuf::from(&args[0]);
    let samples_path = PathBuf::from(&args[1]);
    let label_column = args.get(2).map(String::as_str).unwrap_or(DEFAULT_LABEL_COLUMN);

    let recommender = CropRecommender::load(&model_path)?;
    println!(
        "Model: {} ({} classes, {} trees)",
        model_path.display(),
        recommender.pipeline().classes().len(),
        recommender.pipeline().n_trees()
    );

    let samples = load_samples(&samples_path, label_column)?;
    println!("Samples: {} from {}", samples.len(), samples_path.display());

    let start = std::time::Instant::now();
    let report = evaluate(&recommender, &samples);
    let elapsed = start.elapsed();

    println!("\n=== Evaluation Results ===");
    print!("{}", report);
    println!("\nScored in {:?}", elapsed);

    Ok(())
}
