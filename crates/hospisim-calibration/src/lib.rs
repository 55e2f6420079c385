pub mod calibration_problem;
pub mod error;
pub mod observer;
pub mod optimization;
pub mod types;

pub use calibration_problem::CalibrationProblem;
pub use error::CalibrationError;
pub use observer::TracingObserver;
pub use optimization::{
    optimize, NelderMeadConfig, OptimizationConfig, ParticleSwarmConfig, SimplexCoefficients,
    SwarmFactors,
};
pub use types::{
    read_observations, CalibrationParameter, CalibrationResult, LossConfig, ObservedDataPoint,
};

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::CostFunction;
    use chrono::NaiveDate;
    use hospisim_core::{HospitalConfig, Observable, SimulationEngine};
    use hospisim_daily::DailyGenerator;
    use std::sync::Arc;

    const TRUE_BASE_RATE: f64 = 520.0;

    fn engine() -> DailyGenerator {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        DailyGenerator::new(Arc::new(HospitalConfig::default()), 42, start, end).unwrap()
    }

    /// Weekly admissions produced by the same engine with a known base rate.
    fn observations() -> Vec<ObservedDataPoint> {
        let mut truth = engine();
        truth.set_parameter("base_rate", TRUE_BASE_RATE).unwrap();
        truth
            .run(84)
            .unwrap()
            .iter()
            .step_by(7)
            .map(|r| ObservedDataPoint::new(r.date, "admissions", r.observe("admissions").unwrap()))
            .collect()
    }

    #[test]
    fn test_cost_is_zero_at_the_generating_parameters() {
        let problem = CalibrationProblem::new(
            engine(),
            observations(),
            vec![CalibrationParameter::new("base_rate", 300.0, 700.0)],
            LossConfig::SumSquaredError,
        )
        .unwrap();
        assert_eq!(problem.cost(&vec![TRUE_BASE_RATE]).unwrap(), 0.0);
        assert!(problem.cost(&vec![400.0]).unwrap() > 0.0);
        assert!(problem.cost(&vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_loss_variants_agree_on_the_optimum() {
        for loss in [
            LossConfig::SumSquaredError,
            LossConfig::RootMeanSquaredError,
            LossConfig::MeanAbsoluteError,
            LossConfig::WeightedSSE,
        ] {
            let problem = CalibrationProblem::new(
                engine(),
                observations(),
                vec![CalibrationParameter::new("base_rate", 300.0, 700.0)],
                loss,
            )
            .unwrap();
            let at_truth = problem.cost(&vec![TRUE_BASE_RATE]).unwrap();
            let away = problem.cost(&vec![450.0]).unwrap();
            assert!(at_truth < away, "{}: {} vs {}", loss, at_truth, away);
        }
    }

    #[test]
    fn test_invalid_problems_are_rejected() {
        let obs = observations();
        let params = vec![CalibrationParameter::new("base_rate", 300.0, 700.0)];
        assert!(matches!(
            CalibrationProblem::new(engine(), Vec::new(), params.clone(), LossConfig::default()),
            Err(CalibrationError::NoObservations)
        ));
        assert!(matches!(
            CalibrationProblem::new(engine(), obs.clone(), Vec::new(), LossConfig::default()),
            Err(CalibrationError::NoParameters)
        ));
        assert!(matches!(
            CalibrationProblem::new(
                engine(),
                obs.clone(),
                vec![CalibrationParameter::new("beta", 0.0, 1.0)],
                LossConfig::default()
            ),
            Err(CalibrationError::UnknownParameter { .. })
        ));
        let mut bad_series = obs.clone();
        bad_series[0].series = "temperature".to_string();
        assert!(matches!(
            CalibrationProblem::new(engine(), bad_series, params.clone(), LossConfig::default()),
            Err(CalibrationError::UnknownSeries { .. })
        ));
        let mut early = obs;
        early[0].date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            CalibrationProblem::new(engine(), early, params, LossConfig::default()),
            Err(CalibrationError::ObservationBeforeStart { .. })
        ));
    }

    #[test]
    fn test_observation_after_engine_end_is_rejected() {
        let mut late = observations();
        late.push(ObservedDataPoint::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            "admissions",
            480.0,
        ));
        let err = CalibrationProblem::new(
            engine(),
            late,
            vec![CalibrationParameter::new("base_rate", 300.0, 700.0)],
            LossConfig::default(),
        )
        .err()
        .unwrap();
        match err {
            CalibrationError::ObservationAfterEnd { date, end } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut last_day = observations();
        last_day.push(ObservedDataPoint::new(
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            "admissions",
            480.0,
        ));
        let problem = CalibrationProblem::new(
            engine(),
            last_day,
            vec![CalibrationParameter::new("base_rate", 300.0, 700.0)],
            LossConfig::default(),
        )
        .unwrap();
        assert!(problem.cost(&vec![450.0]).is_ok());
    }

    #[test]
    fn test_bounds_outside_the_tunable_domain_are_rejected() {
        for (id, min, max) in [
            ("smoothing_alpha", 0.0, 2.0),
            ("base_rate", 0.0, 700.0),
            ("noise_sd", -0.1, 0.2),
            ("noise_sd", 0.0, f64::INFINITY),
            ("base_rate", 700.0, 300.0),
        ] {
            let result = CalibrationProblem::new(
                engine(),
                observations(),
                vec![CalibrationParameter::new(id, min, max)],
                LossConfig::default(),
            );
            assert!(
                matches!(result, Err(CalibrationError::InvalidBounds { .. })),
                "{} [{}, {}] was accepted",
                id,
                min,
                max
            );
        }

        let problem = CalibrationProblem::new(
            engine(),
            observations(),
            vec![CalibrationParameter::new("smoothing_alpha", 0.0, 1.0)],
            LossConfig::default(),
        )
        .unwrap();
        assert!(problem.cost(&vec![0.0]).is_ok());
        assert!(problem.cost(&vec![1.0]).is_ok());
    }

    #[test]
    fn test_accepted_problem_optimizes_without_error() {
        let problem = CalibrationProblem::new(
            engine(),
            observations(),
            vec![CalibrationParameter::new("smoothing_alpha", 0.0, 1.0)],
            LossConfig::SumSquaredError,
        )
        .unwrap();
        let result = optimize(
            problem,
            OptimizationConfig::NelderMead(NelderMeadConfig::new().with_max_iterations(10)),
        )
        .unwrap();
        let alpha = result.parameters_map()["smoothing_alpha"];
        assert!((0.0..=1.0).contains(&alpha));
    }

    #[test]
    fn test_nelder_mead_recovers_base_rate() {
        let problem = CalibrationProblem::new(
            engine(),
            observations(),
            vec![CalibrationParameter::with_initial_guess(
                "base_rate", 300.0, 700.0, 450.0,
            )],
            LossConfig::SumSquaredError,
        )
        .unwrap();
        let result = optimize(
            problem,
            OptimizationConfig::NelderMead(NelderMeadConfig::new().with_max_iterations(150)),
        )
        .unwrap();
        let fitted = result.parameters_map()["base_rate"];
        assert!(
            (fitted - TRUE_BASE_RATE).abs() < 25.0,
            "fitted {} after {} iterations",
            fitted,
            result.iterations
        );
    }

    #[test]
    fn test_particle_swarm_stays_within_bounds() {
        let problem = CalibrationProblem::new(
            engine(),
            observations(),
            vec![CalibrationParameter::new("base_rate", 400.0, 600.0)],
            LossConfig::RootMeanSquaredError,
        )
        .unwrap();
        let result = optimize(
            problem,
            OptimizationConfig::ParticleSwarm(
                ParticleSwarmConfig::new()
                    .with_num_particles(8)
                    .with_max_iterations(15),
            ),
        )
        .unwrap();
        let fitted = result.best_parameters[0];
        assert!((400.0..=600.0).contains(&fitted));
        assert!(result.final_loss.is_finite());
    }
}
