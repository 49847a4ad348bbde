// scripts/price_report.rs
use jump_sde::config::PricingRequest;
use jump_sde::logging::init_tracing;
use jump_sde::mc::paths::collect_paths;
use jump_sde::mc::payoffs::PayoffEvaluator;
use jump_sde::output::{write_paths, write_summary, write_terminal_prices};
use jump_sde::{stream_terminal_prices, PricingMethod, PricingResult, SdeResult, SimulationConfig};
use std::env;
use std::fs::{self, File};
use std::path::Path;
use tracing::{error, info};

const DEFAULT_REQUEST: &str = "config/merton_call.toml";
const RESULTS_DIR: &str = "results";
const CONVERGENCE_PATHS: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];
const SAMPLE_PATHS: usize = 100;

fn main() {
    init_tracing("info");

    let request_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_REQUEST.to_string());

    if let Err(e) = run(Path::new(&request_path)) {
        error!(error = %e, request = %request_path, "price report failed");
        std::process::exit(1);
    }
}

fn run(request_path: &Path) -> SdeResult<()> {
    let request = PricingRequest::from_path(request_path)?;
    let params = request.into_parameter_set()?;
    info!(request = %request_path.display(), "loaded pricing request");

    println!("{:=<80}", "");
    println!("JUMP-DIFFUSION PRICE REPORT");
    println!("{:=<80}", "");
    println!("Request:       {}", request_path.display());
    println!("CPU cores:     {}", num_cpus::get());
    println!("Rayon threads: {}", rayon::current_num_threads());
    println!(
        "Market:        S={} r={} q={} σ={}",
        params.market().spot(),
        params.market().rate(),
        params.market().dividend_yield(),
        params.market().volatility()
    );
    println!(
        "Jumps:         λ={} μⱼ={} σⱼ={} (κ={:.6})",
        params.jumps().intensity(),
        params.jumps().mean(),
        params.jumps().volatility(),
        params.jumps().compensator()
    );
    println!(
        "Option:        {:?} K={} T={}",
        params.option().kind(),
        params.option().strike(),
        params.option().maturity()
    );
    println!(
        "Simulation:    {} paths × {} steps, {:?}",
        params.config().paths(),
        params.config().steps(),
        params.config().parallelism()
    );
    println!();

    let mut results: Vec<PricingResult> = Vec::new();
    for method in PricingMethod::ALL {
        let result = method.price(&params)?;
        println!("{}", result);
        results.push(result);
    }
    let series = results
        .iter()
        .find(|r| r.method == PricingMethod::MertonSeries.name())
        .map(|r| r.price);

    println!("\n{:=<80}", "");
    println!("CONVERGENCE");
    println!("{:=<80}", "");
    println!(
        "{:>10} {:>12} {:>12} {:>12} {:>10} {:>12}",
        "Paths", "Price", "Std Err", "|Δ series|", "Δ / SE", "Time (ms)"
    );
    println!("{:-<80}", "");
    for &paths in CONVERGENCE_PATHS.iter().filter(|&&n| n <= params.config().paths()) {
        let mut sized = request.clone();
        sized.simulation.paths = paths;
        let result = PricingMethod::MonteCarlo.price(&sized.into_parameter_set()?)?;
        let diff = series.map(|s| (result.price - s).abs());
        println!(
            "{:>10} {:>12.4} {:>12.4} {:>12} {:>10} {:>12.2}",
            paths,
            result.price,
            result.std_error,
            diff.map(|d| format!("{:.4}", d))
                .unwrap_or_else(|| "N/A".to_string()),
            diff.filter(|_| result.std_error > 0.0)
                .map(|d| format!("{:.2}", d / result.std_error))
                .unwrap_or_else(|| "N/A".to_string()),
            result.elapsed.as_secs_f64() * 1000.0
        );
        results.push(result);
    }
    println!("{:=<80}", "");

    fs::create_dir_all(RESULTS_DIR)?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    let summary_file = format!("{}/summary_{}.csv", RESULTS_DIR, timestamp);
    write_summary(File::create(&summary_file)?, &results)?;

    let paths_file = format!("{}/paths_{}.csv", RESULTS_DIR, timestamp);
    let sample = collect_paths(params.market(), params.jumps(), params.config(), SAMPLE_PATHS)?;
    write_paths(File::create(&paths_file)?, &sample, params.config().dt())?;

    let terminals_file = format!("{}/terminals_{}.csv", RESULTS_DIR, timestamp);
    let sample_config = request_with_paths(&request, SAMPLE_PATHS)?;
    let terminals = stream_terminal_prices(*params.market(), *params.jumps(), sample_config)?;
    let evaluator = PayoffEvaluator::for_option(params.option(), params.market());
    write_terminal_prices(File::create(&terminals_file)?, terminals, &evaluator)?;

    println!("\nSummary saved to:         {}", summary_file);
    println!("Sample paths saved to:    {}", paths_file);
    println!("Terminal prices saved to: {}", terminals_file);
    Ok(())
}

/// Simulation settings of `request` resized to at most `paths` paths.
fn request_with_paths(request: &PricingRequest, paths: usize) -> SdeResult<SimulationConfig> {
    let mut sized = request.clone();
    sized.simulation.paths = paths.min(request.simulation.paths);
    Ok(*sized.into_parameter_set()?.config())
}
