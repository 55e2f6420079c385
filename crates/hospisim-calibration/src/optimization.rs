//! Solver setup and execution.

use argmin::core::observers::ObserverMode;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::particleswarm::ParticleSwarm;
use serde::{Deserialize, Serialize};

use hospisim_core::SimulationEngine;

use crate::calibration_problem::CalibrationProblem;
use crate::error::CalibrationError;
use crate::observer::TracingObserver;
use crate::types::CalibrationResult;

/// Overrides of argmin's simplex coefficients; `None` keeps argmin's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexCoefficients {
    /// alpha, > 0
    pub reflection: Option<f64>,
    /// gamma, > 1
    pub expansion: Option<f64>,
    /// rho, in (0, 0.5]
    pub contraction: Option<f64>,
    /// sigma, in (0, 1]
    pub shrink: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    pub max_iterations: u64,
    /// Stop once the simplex cost spread falls below this
    pub sd_tolerance: f64,
    /// Relative size of the initial simplex around the starting point
    pub initial_step: f64,
    pub coefficients: SimplexCoefficients,
    pub verbose: bool,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            sd_tolerance: 1e-6,
            initial_step: 0.1,
            coefficients: SimplexCoefficients::default(),
            verbose: false,
        }
    }
}

impl NelderMeadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_coefficients(mut self, coefficients: SimplexCoefficients) -> Self {
        self.coefficients = coefficients;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Overrides of argmin's swarm factors; `None` keeps argmin's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmFactors {
    pub inertia: Option<f64>,
    /// Pull towards each particle's own best
    pub cognitive: Option<f64>,
    /// Pull towards the swarm's best
    pub social: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSwarmConfig {
    pub num_particles: usize,
    pub max_iterations: u64,
    pub target_cost: Option<f64>,
    pub factors: SwarmFactors,
    pub verbose: bool,
}

impl Default for ParticleSwarmConfig {
    fn default() -> Self {
        Self {
            num_particles: 20,
            max_iterations: 100,
            target_cost: None,
            factors: SwarmFactors::default(),
            verbose: false,
        }
    }
}

impl ParticleSwarmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_particles(mut self, num_particles: usize) -> Self {
        self.num_particles = num_particles;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_target_cost(mut self, target_cost: f64) -> Self {
        self.target_cost = Some(target_cost);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Solver choice with its settings.
///
/// Nelder-Mead suits a handful of tunables with a sensible starting point;
/// Particle Swarm searches the whole bounded box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum OptimizationConfig {
    NelderMead(NelderMeadConfig),
    ParticleSwarm(ParticleSwarmConfig),
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        OptimizationConfig::NelderMead(NelderMeadConfig::default())
    }
}

impl OptimizationConfig {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationConfig::NelderMead(_) => "nelder_mead",
            OptimizationConfig::ParticleSwarm(_) => "particle_swarm",
        }
    }
}

/// Run `config`'s solver on `problem`.
///
/// ```rust,ignore
/// let config = OptimizationConfig::NelderMead(NelderMeadConfig::new().with_max_iterations(300));
/// let result = optimize(problem, config)?;
/// println!("{:?} -> {}", result.parameters_map(), result.final_loss);
/// ```
pub fn optimize<E: SimulationEngine>(
    problem: CalibrationProblem<E>,
    config: OptimizationConfig,
) -> Result<CalibrationResult, CalibrationError> {
    tracing::info!(
        algorithm = config.name(),
        parameters = ?problem.parameter_names(),
        initial = ?problem.initial_parameters(),
        observations = problem.num_observations(),
        "starting calibration"
    );

    let result = match config {
        OptimizationConfig::NelderMead(c) => nelder_mead(problem, c),
        OptimizationConfig::ParticleSwarm(c) => particle_swarm(problem, c),
    }?;

    tracing::info!(
        best = ?result.parameters_map(),
        loss = result.final_loss,
        iterations = result.iterations,
        converged = result.converged,
        "calibration finished"
    );
    Ok(result)
}

fn solver_error(what: &str) -> impl Fn(argmin::core::Error) -> CalibrationError + '_ {
    move |e| CalibrationError::Solver(format!("{}: {}", what, e))
}

/// Applies an optional solver setting through one of argmin's checked setters.
fn apply<S>(
    solver: S,
    value: Option<f64>,
    setter: fn(S, f64) -> Result<S, argmin::core::Error>,
    what: &str,
) -> Result<S, CalibrationError> {
    match value {
        Some(v) => setter(solver, v).map_err(solver_error(what)),
        None => Ok(solver),
    }
}

/// Moves `value` by `step` of itself (or of the bound width when it is
/// zero), staying inside the bounds.
fn perturb(value: f64, (min, max): (f64, f64), step: f64) -> f64 {
    let delta = if value != 0.0 {
        value.abs() * step
    } else {
        (max - min) * step / 2.0
    };
    if value + delta <= max {
        value + delta
    } else {
        value - delta
    }
}

/// The starting point plus one vertex per parameter, each moved along its
/// own axis.
fn initial_simplex(start: &[f64], bounds: &[(f64, f64)], step: f64) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(start.to_vec());
    for (axis, bound) in bounds.iter().enumerate() {
        let mut vertex = start.to_vec();
        vertex[axis] = perturb(vertex[axis], *bound, step);
        simplex.push(vertex);
    }
    simplex
}

type Simplex = NelderMead<Vec<f64>, f64>;
type Swarm = ParticleSwarm<Vec<f64>, f64, rand::rngs::StdRng>;

fn nelder_mead<E: SimulationEngine>(
    problem: CalibrationProblem<E>,
    config: NelderMeadConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let start = problem.initial_parameters();
    let names = problem.parameter_names();
    let simplex = initial_simplex(&start, &problem.get_parameter_bounds(), config.initial_step);

    let c = config.coefficients;
    let solver = Simplex::new(simplex)
        .with_sd_tolerance(config.sd_tolerance)
        .map_err(solver_error("sd_tolerance"))?;
    let solver = apply(solver, c.reflection, Simplex::with_alpha, "reflection")?;
    let solver = apply(solver, c.expansion, Simplex::with_gamma, "expansion")?;
    let solver = apply(solver, c.contraction, Simplex::with_rho, "contraction")?;
    let solver = apply(solver, c.shrink, Simplex::with_sigma, "shrink")?;

    let mut executor =
        Executor::new(problem, solver).configure(|state| state.max_iters(config.max_iterations));
    if config.verbose {
        executor = executor.add_observer(TracingObserver::new(), ObserverMode::Always);
    }
    let result = executor.run().map_err(solver_error("nelder-mead"))?;

    let state = result.state();
    Ok(CalibrationResult {
        best_parameters: state.best_param.clone().unwrap_or(start),
        parameter_names: names,
        final_loss: state.best_cost,
        iterations: state.iter as usize,
        converged: state.termination_status.terminated(),
        termination_reason: format!("{:?}", state.termination_status),
    })
}

fn particle_swarm<E: SimulationEngine>(
    problem: CalibrationProblem<E>,
    config: ParticleSwarmConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let start = problem.initial_parameters();
    let names = problem.parameter_names();
    let (lower, upper): (Vec<f64>, Vec<f64>) = problem.get_parameter_bounds().into_iter().unzip();

    let f = config.factors;
    let solver: Swarm = ParticleSwarm::new((lower, upper), config.num_particles);
    let solver = apply(solver, f.inertia, Swarm::with_inertia_factor, "inertia")?;
    let solver = apply(solver, f.cognitive, Swarm::with_cognitive_factor, "cognitive")?;
    let solver = apply(solver, f.social, Swarm::with_social_factor, "social")?;

    let mut executor = Executor::new(problem, solver).configure(|state| {
        let state = state.max_iters(config.max_iterations);
        match config.target_cost {
            Some(target) => state.target_cost(target),
            None => state,
        }
    });
    if config.verbose {
        executor = executor.add_observer(TracingObserver::new(), ObserverMode::Always);
    }
    let result = executor.run().map_err(solver_error("particle swarm"))?;

    let state = result.state();
    let (best_parameters, final_loss) = match &state.best_individual {
        Some(particle) => (particle.position.clone(), particle.cost),
        None => (start, f64::INFINITY),
    };
    Ok(CalibrationResult {
        best_parameters,
        parameter_names: names,
        final_loss,
        iterations: state.iter as usize,
        converged: state.termination_status.terminated(),
        termination_reason: format!("{:?}", state.termination_status),
    })
}
