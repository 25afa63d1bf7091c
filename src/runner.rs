use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Command, FromArgMatches as _};

use crate::error::SimError;
use crate::log::{info, set_log_level, LevelFilter};
use crate::parameters::Parameters;
use crate::simulation::{Simulation, StartArgs};

/// Default cli arguments for the vectorborne runner
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Random seed for the run. -1 picks a random seed
    #[arg(short, long, default_value = "8675309", allow_negative_numbers = true)]
    pub random_seed: i64,

    /// Optional path for a JSON parameters file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional path for the daily time series CSV
    #[arg(short, long, default_value = "")]
    pub output: String,

    /// Days to simulate
    #[arg(short, long, default_value = "365")]
    pub days: u32,

    /// Initial number of hosts
    #[arg(short, long, default_value = "100")]
    pub population: usize,

    /// Most hosts alive at once
    #[arg(long, default_value = "200")]
    pub max_population: usize,

    /// Percent of hosts initially infested
    #[arg(long, default_value = "20")]
    pub pct_infested: f64,

    /// Percent of hosts initially infected
    #[arg(long, default_value = "10")]
    pub pct_infected: f64,

    /// Percent of initial lice carrying the infection
    #[arg(long, default_value = "10")]
    pub pct_vectors_infected: f64,

    /// Percent of infected hosts already under treatment
    #[arg(long, default_value = "0")]
    pub pct_treated: f64,

    /// Enable logging at this level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl Default for BaseArgs {
    fn default() -> Self {
        let start = StartArgs::default();
        BaseArgs {
            random_seed: start.seed,
            config: String::new(),
            output: String::new(),
            days: start.max_sim_days,
            population: start.initial_population,
            max_population: start.max_population,
            pct_infested: start.pct_infested,
            pct_infected: start.pct_infected,
            pct_vectors_infected: start.pct_vectors_infected,
            pct_treated: start.pct_treated,
            log_level: None,
        }
    }
}

impl BaseArgs {
    #[must_use]
    pub fn start_args(&self) -> StartArgs {
        StartArgs {
            max_sim_days: self.days,
            max_population: self.max_population,
            initial_population: self.population,
            pct_infested: self.pct_infested,
            pct_infected: self.pct_infected,
            pct_vectors_infected: self.pct_vectors_infected,
            pct_treated: self.pct_treated,
            seed: self.random_seed,
        }
    }
}

fn create_cli() -> Command {
    let cli = Command::new("vectorborne")
        .about("Next-event simulation of louse-borne infection among sheltered hosts");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with arguments parsed from the command line.
///
/// `setup_fn` runs after the population is built and before the loop starts.
///
/// # Errors
/// Returns an error if argument parsing, configuration, setup or the CSV export fails
#[allow(clippy::missing_errors_doc)]
pub fn run_with_args<F>(setup_fn: F) -> Result<Simulation, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Simulation, &BaseArgs) -> Result<(), SimError>,
{
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    run_with_parsed_args(&args, setup_fn)
}

/// Runs a simulation from already parsed arguments.
///
/// # Errors
/// Returns an error if configuration, setup or the CSV export fails
pub fn run_with_parsed_args<F>(
    args: &BaseArgs,
    setup_fn: F,
) -> Result<Simulation, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Simulation, &BaseArgs) -> Result<(), SimError>,
{
    if let Some(level) = &args.log_level {
        let level = LevelFilter::from_str(level)
            .map_err(|_| SimError::ConfigError(format!("unknown log level {level}")))?;
        set_log_level(level);
    }

    let parameters = if args.config.is_empty() {
        Parameters::default()
    } else {
        info!("loading parameters from {}", args.config);
        Parameters::load(Path::new(&args.config))?
    };

    let mut sim = Simulation::new(parameters)?;
    sim.start(&args.start_args())?;
    setup_fn(&mut sim, args)?;
    sim.run();

    if !args.output.is_empty() {
        let output = PathBuf::from(&args.output);
        sim.export_time_series(&output)?;
        info!("wrote time series to {}", output.display());
    }
    Ok(sim)
}
