use staincount::{Analyzer, SlideLoader};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image.png> [out.json]", args[0]);
        std::process::exit(2);
    }

    let loader = SlideLoader::new();
    let image = loader.load(Path::new(&args[1]))?;

    let analyzer = Analyzer::new();
    let result = analyzer.analyze(&image);

    println!(
        "Counted {} valid of {} marker contours.",
        result.summary.valid, result.summary.total
    );

    if let Some(out_path) = args.get(2) {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
