use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use spotter_core::config;
use spotter_core::log::LogConfig;
use spotter_core::{ImageMatcher, MatchMethod, MatchResult};

/// Arguments for the `check` subcommand.
#[derive(Args)]
pub struct CheckArgs {
    /// Template image to look for
    #[arg(long)]
    template: PathBuf,
    /// Frame image to search in
    #[arg(long)]
    frame: PathBuf,
    /// Match method: template, feature or multi_scale (defaults to config)
    #[arg(long)]
    method: Option<MatchMethod>,
    /// Minimum confidence in [0, 1] (defaults to config)
    #[arg(long)]
    threshold: Option<f32>,
    /// Write the annotated frame to this path
    #[arg(long)]
    debug_out: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Matches a template against a saved frame using the configured
/// preprocessing and prints the result.
pub fn execute(args: &CheckArgs) {
    let config = config::load();
    let logging = LogConfig {
        level: "warn".into(),
        ..LogConfig::default()
    };
    spotter_core::log::init(&logging, false);

    let mut matcher = ImageMatcher::new();
    matcher.set_method(args.method.unwrap_or(config.matching.method));
    matcher.set_scale_range(config.matching.min_scale, config.matching.max_scale);
    matcher.set_preprocessing(config.preprocessing);

    if !matcher.load_template_file(&args.template) {
        eprintln!("Error: could not load template {}", args.template.display());
        std::process::exit(1);
    }

    let frame = match image::open(&args.frame) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            eprintln!("Error: could not load frame {}: {e}", args.frame.display());
            std::process::exit(1);
        }
    };

    let threshold = args
        .threshold
        .map_or(config.matching.threshold, |t| t.clamp(0.0, 1.0));
    let result = matcher.match_frame(&frame, threshold);
    let elapsed_ms = matcher.last_processing_time().as_secs_f64() * 1000.0;

    if let Some(path) = &args.debug_out
        && let Err(e) = matcher.save_debug_image(path)
    {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if args.json {
        let report = json!({
            "method": matcher.method().as_str(),
            "threshold": threshold,
            "result": result,
            "elapsed_ms": elapsed_ms,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_summary(matcher.method(), threshold, &result, elapsed_ms);
    }
}

fn print_summary(method: MatchMethod, threshold: f32, result: &MatchResult, elapsed_ms: f64) {
    let verdict = if result.found { "FOUND" } else { "not found" };
    println!(
        "{verdict} (method {}, confidence {:.3}, threshold {threshold:.3}, {elapsed_ms:.1} ms)",
        method.as_str(),
        result.confidence
    );
    if result.found {
        let b = result.bounding_box;
        println!(
            "  center ({:.1}, {:.1}), box ({}, {}) {}x{}, scale {:.2}",
            result.center.x, result.center.y, b.x, b.y, b.width, b.height, result.scale
        );
    }
}
