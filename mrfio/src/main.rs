use anyhow::{Context, Result};
use clap::Parser;
use mrfcore::algorithm::matching::LogProgress;
use mrfcore::config::{AnalysisConfig, OverlapPolicy};
use mrfcore::pipeline::analyze;
use mrfio::io::dictionary::load_dictionary;
use mrfio::io::images::{load_config, load_image_stack, load_roi_set};
use mrfio::io::results::{save_composite_json, save_results, save_results_json, save_statistics_json, statistics_records};

/// Match a CEST-MRF image stack against a simulation dictionary, ROI by ROI.
#[derive(Parser, Debug)]
#[command(name = "mrf-match", version, about)]
struct Args {
    /// Dictionary file (JSON field tree, legacy nested or flat)
    #[arg(long)]
    dictionary: String,

    /// Image stack file
    #[arg(long)]
    stack: String,

    /// ROI mask file
    #[arg(long)]
    masks: String,

    /// Analysis configuration; command line values override it
    #[arg(long)]
    config: Option<String>,

    /// Where to write per-ROI maps (bincode)
    #[arg(long)]
    results: Option<String>,

    /// Where to write per-ROI maps (JSON)
    #[arg(long)]
    results_json: Option<String>,

    /// Compress the results file with zstd
    #[arg(long, default_value_t = false)]
    compress: bool,

    /// Where to write composite maps (JSON)
    #[arg(long)]
    composite: Option<String>,

    /// Where to write the statistics table (JSON)
    #[arg(long)]
    stats: Option<String>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    /// Lower percentile for outlier trimming
    #[arg(long)]
    stat_min: Option<f64>,

    /// Upper percentile for outlier trimming
    #[arg(long)]
    stat_max: Option<f64>,

    /// Exchangeable protons per solute molecule; reports fs as concentration
    #[arg(long)]
    protons: Option<f64>,

    /// Refuse to composite overlapping ROIs
    #[arg(long, default_value_t = false)]
    reject_overlap: bool,
}

fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("Cannot read config: {}", path))?,
        None => AnalysisConfig::default(),
    };
    if let Some(n) = args.batch_size {
        config.matching.batch_size = n;
    }
    if let Some(n) = args.threads {
        config.matching.num_threads = n;
    }
    if let Some(p) = args.stat_min {
        config.stats.stat_min = p;
    }
    if let Some(p) = args.stat_max {
        config.stats.stat_max = p;
    }
    if args.protons.is_some() {
        config.stats.num_exchangeable_protons = args.protons;
    }
    if args.reject_overlap {
        config.overlap_policy = OverlapPolicy::Reject;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    let dictionary = load_dictionary(&args.dictionary)
        .with_context(|| format!("Cannot load dictionary: {}", args.dictionary))?;
    let stack = load_image_stack(&args.stack)
        .with_context(|| format!("Cannot load image stack: {}", args.stack))?;
    let rois = load_roi_set(&args.masks)
        .with_context(|| format!("Cannot load ROI masks: {}", args.masks))?;

    let analysis = analyze(&dictionary, &stack, &rois, &config, &mut LogProgress)?;

    for record in statistics_records(&analysis.statistics) {
        match (record.mean, record.std_dev) {
            (Some(mean), Some(sd)) => println!(
                "{}\t{}\t{:.4} ± {:.4} {}",
                record.roi, record.label, mean, sd, record.unit
            ),
            _ => println!("{}\t{}\tn/a", record.roi, record.label),
        }
    }

    if let Some(path) = &args.results {
        save_results(path, &analysis.results, args.compress)
            .with_context(|| format!("Cannot write results: {}", path))?;
        log::info!("wrote results to {}", path);
    }
    if let Some(path) = &args.results_json {
        save_results_json(path, &analysis.results)
            .with_context(|| format!("Cannot write results: {}", path))?;
        log::info!("wrote results to {}", path);
    }
    if let Some(path) = &args.composite {
        save_composite_json(path, &analysis.composite)
            .with_context(|| format!("Cannot write composite maps: {}", path))?;
        log::info!("wrote composite maps to {}", path);
    }
    if let Some(path) = &args.stats {
        save_statistics_json(path, &analysis.statistics)
            .with_context(|| format!("Cannot write statistics: {}", path))?;
        log::info!("wrote statistics to {}", path);
    }
    Ok(())
}
