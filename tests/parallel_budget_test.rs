// tests/parallel_budget_test.rs
use jump_sde::{
    compute_price, Budget, JumpParameters, MarketParameters, OptionSpec, Parallelism, SdeError,
    SimulationConfig,
};
use std::time::Duration;

fn market() -> MarketParameters {
    MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap()
}

fn jumps() -> JumpParameters {
    JumpParameters::new(0.75, -0.6, 0.25).unwrap()
}

fn atm_call() -> OptionSpec {
    OptionSpec::call(100.0, 1.0).unwrap()
}

fn sharded(paths: usize, shards: usize, threads: usize) -> SimulationConfig {
    SimulationConfig::new(20, paths, 1.0)
        .unwrap()
        .with_seed(42)
        .with_parallelism(Parallelism::Sharded { shards, threads })
        .unwrap()
}

#[test]
fn test_sharded_result_independent_of_thread_count() {
    let one = compute_price(market(), jumps(), atm_call(), sharded(20_000, 8, 1)).unwrap();
    let four = compute_price(market(), jumps(), atm_call(), sharded(20_000, 8, 4)).unwrap();
    assert_eq!(one.price, four.price);
    assert_eq!(one.std_error, four.std_error);
    assert_eq!(one.paths, 20_000);
    assert_eq!(one.method, "monte-carlo-sharded");
}

#[test]
fn test_sharded_agrees_with_sequential() {
    let seq_config = SimulationConfig::new(20, 100_000, 1.0).unwrap().with_seed(42);
    let seq = compute_price(market(), jumps(), atm_call(), seq_config).unwrap();
    let par = compute_price(market(), jumps(), atm_call(), sharded(100_000, 6, 3)).unwrap();

    let combined_se = (seq.std_error.powi(2) + par.std_error.powi(2)).sqrt();
    println!("\nSequential: {} ± {}", seq.price, seq.std_error);
    println!("Sharded: {} ± {}", par.price, par.std_error);
    assert!((seq.price - par.price).abs() < 4.0 * combined_se);
}

#[test]
fn test_more_shards_than_paths() {
    let result = compute_price(market(), jumps(), atm_call(), sharded(3, 16, 2)).unwrap();
    assert_eq!(result.paths, 3);
}

#[test]
fn test_sharded_instability_is_reported() {
    let exploding = JumpParameters::new(0.75, -0.6, 50.0).unwrap();
    let err = compute_price(market(), exploding, atm_call(), sharded(10_000, 4, 4)).unwrap_err();
    assert!(err.is_numerical_instability(), "{:?}", err);
}

#[test]
fn test_zero_shards_rejected() {
    let err = SimulationConfig::new(10, 10, 1.0)
        .unwrap()
        .with_parallelism(Parallelism::Sharded { shards: 0, threads: 2 })
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_path_budget_aborts_with_partial_count() {
    let config = SimulationConfig::new(10, 1_000, 1.0)
        .unwrap()
        .with_seed(1)
        .with_budget(Budget::unlimited().with_max_paths(100));
    match compute_price(market(), jumps(), atm_call(), config).unwrap_err() {
        SdeError::BudgetExceeded {
            completed,
            requested,
            ..
        } => {
            assert_eq!(completed, 100);
            assert_eq!(requested, 1_000);
        }
        other => panic!("expected budget exceeded, got {:?}", other),
    }
}

#[test]
fn test_step_budget_counts_whole_paths() {
    let config = SimulationConfig::new(10, 1_000, 1.0)
        .unwrap()
        .with_seed(1)
        .with_budget(Budget::unlimited().with_max_steps(55));
    match compute_price(market(), jumps(), atm_call(), config).unwrap_err() {
        SdeError::BudgetExceeded { completed, .. } => assert_eq!(completed, 5),
        other => panic!("expected budget exceeded, got {:?}", other),
    }
}

#[test]
fn test_expired_time_limit_stops_before_first_path() {
    let config = SimulationConfig::new(10, 1_000, 1.0)
        .unwrap()
        .with_budget(Budget::unlimited().with_time_limit(Duration::ZERO));
    match compute_price(market(), jumps(), atm_call(), config).unwrap_err() {
        SdeError::BudgetExceeded { completed, .. } => assert_eq!(completed, 0),
        other => panic!("expected budget exceeded, got {:?}", other),
    }
}

#[test]
fn test_budget_covering_request_succeeds() {
    let config = SimulationConfig::new(10, 500, 1.0)
        .unwrap()
        .with_seed(1)
        .with_budget(Budget::unlimited().with_max_paths(500).with_max_steps(5_000));
    let result = compute_price(market(), jumps(), atm_call(), config).unwrap();
    assert_eq!(result.paths, 500);
}

#[test]
fn test_sharded_budget_never_overshoots() {
    let config = sharded(10_000, 8, 4)
        .with_budget(Budget::unlimited().with_max_paths(1_000));
    let err = compute_price(market(), jumps(), atm_call(), config).unwrap_err();
    match err {
        SdeError::BudgetExceeded {
            completed,
            requested,
            ..
        } => {
            assert!(completed <= 1_000);
            assert_eq!(requested, 10_000);
        }
        other => panic!("expected budget exceeded, got {:?}", other),
    }
}
