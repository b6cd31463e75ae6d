//! Invariants that hold for every participant and every run, converged or not.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use equilibrium::participants::{Consumer, Exchange, Factory, Trader};
use equilibrium::search::{AdaptiveConfig, ElasticConfig, LineSearchConfig, MomentumConfig};
use equilibrium::{FlowVolume, MIN_PRICE, Outcome, Participant, SolverConfig, Termination, solve, try_solve};

const SEED: u64 = 7;

fn zoo() -> Vec<Box<dyn Participant>> {
    vec![
        Box::new(Factory::new(vec![8.0, 1.0, 0.0, 0.0], 10.0)),
        Box::new(Factory::new(vec![0.0, -1.0, -2.0, 2.0], 20.0)),
        Box::new(Factory::placed(vec![-1.0, 3.0], 5.0, 2)),
        Box::new(Consumer::new(vec![3.0, 1.0, 0.0, 3.0], 10_000.0)),
        Box::new(Exchange::new(vec![1.0, 1.0, 2.0, 1.0], vec![4.0, 0.0, 1.0, 2.0])),
        Box::new(Trader::new(0, 3, 1, 0.8)),
    ]
}

fn village() -> Vec<Box<dyn Participant>> {
    vec![
        Box::new(Factory::new(vec![8.0, 1.0, 0.0, 0.0], 10.0)),
        Box::new(Factory::new(vec![0.0, -0.5, 1.5, 0.0], 10.0)),
        Box::new(Factory::new(vec![0.0, -1.0, -2.0, 2.0], 20.0)),
        Box::new(Consumer::new(vec![3.0, 1.0, 0.0, 3.0], 10_000.0)),
    ]
}

/// Demands ever more the further prices move from 5 in either direction.
struct Pathological;

impl Participant for Pathological {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        let flow = prices
            .iter()
            .map(|p| -(1.0 + 1000.0 * (p / 5.0).ln().abs()))
            .collect();
        FlowVolume::from_flow(flow)
    }
}

#[test]
fn test_participants_respect_flow_volume_bounds() {
    let mut rng = StdRng::seed_from_u64(SEED);
    for participant in zoo() {
        for _ in 0..200 {
            let prices: Vec<f64> = (0..4).map(|_| rng.random_range(0.01..1000.0)).collect();
            let bundle = participant.participate(&prices);
            assert_eq!(bundle.len(), 4);
            bundle.check_invariants();
            let sold = bundle.sold();
            let bought = bundle.bought();
            for i in 0..4 {
                assert!(sold[i] >= -1e-9 && bought[i] >= -1e-9, "negative side at {prices:?}");
            }
        }
    }
}

#[test]
fn test_prices_stay_positive() {
    let termination = Termination {
        epsilon: 1e-4,
        keep_history: true,
        ..Termination::default()
    };
    let start = [10.0, 1.0, 10.0, 10_000.0];
    for config in [
        SolverConfig::new(LineSearchConfig { t: 2.0, ..LineSearchConfig::default() }, termination.clone()),
        SolverConfig::new(ElasticConfig::default(), termination.clone()),
    ] {
        let solution = solve(&village(), &start, &config);
        assert!(!solution.history.is_empty());
        for iteration in &solution.history {
            assert!(
                iteration.prices.iter().all(|p| p.is_finite() && *p >= MIN_PRICE),
                "{} step {}: {:?}",
                config.strategy.name(),
                iteration.step,
                iteration.prices
            );
        }
    }
}

#[test]
fn test_pathological_market_gives_up() {
    let config = SolverConfig::new(LineSearchConfig::default(), Termination::with_epsilon(1e-3));
    let solution = solve(&[Pathological], &[5.0, 5.0], &config);

    assert_eq!(solution.outcome, Outcome::GaveUp);
    assert_eq!(solution.prices, vec![5.0, 5.0]);
    assert_eq!(solution.badness, 2.0);
    // ten steps of four trials each, plus the initial evaluation
    assert_eq!(solution.state.steps, 10);
    assert_eq!(solution.state.evaluations, 41);
}

#[test]
fn test_every_backtracking_strategy_gives_up_on_pathological_market() {
    let termination = Termination::with_epsilon(1e-3);
    for config in [
        SolverConfig::new(AdaptiveConfig::default(), termination.clone()),
        SolverConfig::new(ElasticConfig::default(), termination.clone()),
    ] {
        let name = config.strategy.name();
        let solution = try_solve(&[Pathological], &[5.0, 5.0], &config)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(solution.outcome, Outcome::GaveUp, "{name}");
        assert_eq!(solution.prices, vec![5.0, 5.0], "{name}");
        assert_eq!(solution.badness, 2.0, "{name}");
        assert_eq!(solution.state.steps, 10, "{name}");
    }
}

#[test]
fn test_adaptive_gives_up_before_trial_cap() {
    let config = SolverConfig::new(AdaptiveConfig::default(), Termination::with_epsilon(1e-3));
    let solution = solve(&[Pathological], &[5.0, 5.0], &config);
    let max_trials = AdaptiveConfig::default().backtracking.max_trials as u64;
    assert!(
        solution.state.evaluations < 1 + solution.state.steps * max_trials,
        "{} evaluations over {} steps",
        solution.state.evaluations,
        solution.state.steps
    );
}

#[test]
fn test_momentum_times_out() {
    let config = SolverConfig::new(
        MomentumConfig {
            max_iterations: 10,
            ..MomentumConfig::default()
        },
        Termination::with_epsilon(1e-4),
    );
    let solution = solve(&village(), &[10.0; 4], &config);
    assert_eq!(solution.outcome, Outcome::Timeout);
    assert_eq!(solution.state.evaluations, 10);
    assert!(solution.prices.iter().all(|p| *p >= MIN_PRICE));
}

#[test]
fn test_step_cap_times_out() {
    let termination = Termination {
        epsilon: 1e-4,
        max_steps: Some(5),
        ..Termination::default()
    };
    let solution = solve(&village(), &[10.0; 4], &SolverConfig::new(LineSearchConfig::default(), termination));
    assert_eq!(solution.outcome, Outcome::Timeout);
    assert_eq!(solution.state.steps, 5);
    assert!(solution.badness >= 1e-4);
}

#[test]
fn test_line_search_history_is_monotone() {
    let termination = Termination {
        epsilon: 1e-4,
        keep_history: true,
        ..Termination::default()
    };
    let solution = solve(
        &village(),
        &[10.0; 4],
        &SolverConfig::new(LineSearchConfig::default(), termination),
    );
    assert!(solution.converged());
    // every step was accepted
    assert_eq!(solution.history.len() as u64, solution.state.steps);
    for pair in solution.history.windows(2) {
        assert!(
            pair[1].badness <= pair[0].badness,
            "badness rose from {} to {} at step {}",
            pair[0].badness,
            pair[1].badness,
            pair[1].step
        );
    }
}

#[test]
fn test_invalid_inputs_are_errors() {
    let config = SolverConfig::default();
    assert!(try_solve(&village(), &[10.0, 0.0, 10.0, 10.0], &config).is_err());

    let config = SolverConfig::new(
        LineSearchConfig {
            numeraire: Some(equilibrium::Numeraire::listing(9, 1.0)),
            ..LineSearchConfig::default()
        },
        Termination::default(),
    );
    assert!(try_solve(&village(), &[10.0; 4], &config).is_err());
}

#[test]
#[should_panic(expected = "cannot start equilibrium search")]
fn test_solve_panics_on_invalid_prices() {
    solve(&village(), &[10.0, -1.0, 10.0, 10.0], &SolverConfig::default());
}
