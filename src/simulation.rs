//! The simulation: the world, the random variate service, the clock and the event loop.
//!
//! A run is a sequence of single events. Each step picks the live agent with the earliest
//! cached event time, advances the clock to it, records a row of host counts for every whole
//! day crossed on the way, and applies the matching transition rule.
//!
//! ```no_run
//! use vectorborne::{Parameters, Simulation, StartArgs};
//!
//! let mut sim = Simulation::new(Parameters::default()).unwrap();
//! sim.start(&StartArgs::default()).unwrap();
//! sim.run();
//! println!("{:?}", sim.counts());
//! ```

use std::path::Path;

use log::{error, info, warn};

use crate::agent::vector::{apply_overrides, new_vector, VectorOrigin, VectorOverrides};
use crate::agent::{host::new_host, Agent, AgentId};
use crate::control::{Controller, SimState};
use crate::error::SimError;
use crate::event::{EventRecord, EventType};
use crate::parameters::{InvariantMode, Parameters};
use crate::population::Population;
use crate::random::RandomVariates;
use crate::report::{DailyCounts, TimeSeries};
use crate::rules;
use crate::shelter::Shelter;
use crate::shelter_grid::ShelterGrid;
use crate::world::{HostCounts, World};

/// Per-run settings. Percentages are in `[0, 100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartArgs {
    pub max_sim_days: u32,
    pub max_population: usize,
    pub initial_population: usize,
    pub pct_infested: f64,
    pub pct_infected: f64,
    /// Share of the lice on an initially infested host that start infected.
    pub pct_vectors_infected: f64,
    /// Share of the initially infected hosts already under treatment.
    pub pct_treated: f64,
    /// `-1` requests a random seed.
    pub seed: i64,
}

impl Default for StartArgs {
    fn default() -> Self {
        StartArgs {
            max_sim_days: 365,
            max_population: 200,
            initial_population: 100,
            pct_infested: 20.0,
            pct_infected: 10.0,
            pct_vectors_infected: 10.0,
            pct_treated: 0.0,
            seed: 8_675_309,
        }
    }
}

impl StartArgs {
    /// # Errors
    /// Returns `SimError::ConfigError` for a percentage outside `[0, 100]` or an initial
    /// population larger than the maximum.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("pct_infested", self.pct_infested),
            ("pct_infected", self.pct_infected),
            ("pct_vectors_infected", self.pct_vectors_infected),
            ("pct_treated", self.pct_treated),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SimError::ConfigError(format!(
                    "{name} must be in [0, 100], got {value}"
                )));
            }
        }
        if self.initial_population > self.max_population {
            return Err(SimError::ConfigError(format!(
                "initial_population {} exceeds max_population {}",
                self.initial_population, self.max_population
            )));
        }
        Ok(())
    }
}

/// A vector to add by hand. Used by controlled drivers and tests.
#[derive(Debug, Clone, Copy)]
pub struct VectorSpec {
    /// Host to attach to, on its worn clothing set.
    pub host: Option<AgentId>,
    pub infected: bool,
    pub origin: VectorOrigin,
    pub overrides: VectorOverrides,
    /// Where an unhosted vector lies.
    pub shelter: Option<(usize, usize)>,
}

impl Default for VectorSpec {
    fn default() -> Self {
        VectorSpec {
            host: None,
            infected: false,
            origin: VectorOrigin::Initial,
            overrides: VectorOverrides::default(),
            shelter: None,
        }
    }
}

type DailyCallback = Box<dyn FnMut(&DailyCounts) + Send>;

pub struct Simulation {
    pub(crate) parameters: Parameters,
    pub(crate) rng: RandomVariates,
    pub(crate) world: World,
    pub(crate) current_time: f64,
    max_sim_time: f64,
    controller: Controller,
    series: TimeSeries,
    next_report_day: u32,
    subscribers: Vec<DailyCallback>,
    events_handled: usize,
    last_event: Option<EventRecord>,
}

impl Simulation {
    /// Builds a paused, empty simulation. The shelter grid is generated from
    /// `parameters.seed`.
    ///
    /// # Errors
    /// Returns `SimError::ConfigError` if the parameters fail validation.
    pub fn new(parameters: Parameters) -> Result<Self, SimError> {
        parameters.validate()?;
        let mut rng = RandomVariates::new(parameters.seed);
        let grid = ShelterGrid::generate(&parameters, &mut rng);
        Ok(Self::assemble(parameters, rng, grid))
    }

    /// Builds a paused, empty simulation over a hand-made grid.
    ///
    /// # Errors
    /// Returns `SimError::ConfigError` if the parameters fail validation.
    pub fn with_grid(parameters: Parameters, grid: ShelterGrid) -> Result<Self, SimError> {
        parameters.validate()?;
        let rng = RandomVariates::new(parameters.seed);
        Ok(Self::assemble(parameters, rng, grid))
    }

    fn assemble(parameters: Parameters, rng: RandomVariates, grid: ShelterGrid) -> Self {
        let population = Population::new(
            StartArgs::default().max_population,
            parameters.max_vectors,
        );
        Simulation {
            parameters,
            rng,
            world: World::new(grid, population),
            current_time: 0.0,
            max_sim_time: f64::INFINITY,
            controller: Controller::new(SimState::Paused),
            series: TimeSeries::new(),
            next_report_day: 1,
            subscribers: Vec::new(),
            events_handled: 0,
            last_event: None,
        }
    }

    /// Resets the world and builds a fresh population: each host is placed in a random shelter
    /// with room, then infested and infected by the given percentages. Records the day-0 row
    /// and leaves the simulation `Running`.
    ///
    /// # Errors
    /// Returns `SimError::ConfigError` for invalid arguments or a grid too small for the
    /// initial population, and `SimError::PopulationExhausted` if the lice do not fit under
    /// `max_vectors`.
    pub fn start(&mut self, args: &StartArgs) -> Result<(), SimError> {
        args.validate()?;
        let capacity = self.world.grid.total_capacity();
        if capacity < args.initial_population {
            return Err(SimError::ConfigError(format!(
                "shelter capacity {capacity} cannot hold {} hosts",
                args.initial_population
            )));
        }

        self.rng.reseed(args.seed);
        self.world.grid.reset();
        self.world
            .population
            .clear(args.max_population, self.parameters.max_vectors);
        self.current_time = 0.0;
        self.max_sim_time = f64::from(args.max_sim_days);
        self.series.clear();
        self.next_report_day = 1;
        self.events_handled = 0;
        self.last_event = None;
        info!(
            "starting run: {} hosts, {} days, seed {}",
            args.initial_population,
            args.max_sim_days,
            self.rng.seed()
        );

        for _ in 0..args.initial_population {
            let infected = self.rng.probability_met(args.pct_infected / 100.0);
            let infested = self.rng.probability_met(args.pct_infested / 100.0);
            let host = self.create_host(infected)?;
            self.place_at_random(host)?;
            if infested {
                self.infest(host, args.pct_vectors_infected / 100.0)?;
            }
            if infected && self.rng.probability_met(args.pct_treated / 100.0) {
                let length = self.rng.uniform_between(
                    self.parameters.treatment_length_min,
                    self.parameters.treatment_length_max,
                );
                if let Some(state) = self.world.host_mut(host) {
                    state.treated = true;
                    state.time_antibiotic_clears = length;
                }
                self.world.refresh(host);
            }
        }

        self.record_day(0);
        self.controller.restart(SimState::Running);
        Ok(())
    }

    fn place_at_random(&mut self, host: AgentId) -> Result<(), SimError> {
        let open: Vec<_> = self
            .world
            .grid
            .iter()
            .filter(|(_, shelter)| !shelter.is_full())
            .map(|(id, _)| id)
            .collect();
        let shelter = self
            .rng
            .choose(&open)
            .ok_or_else(|| SimError::SimError("no shelter has room".into()))?;
        self.world.admit_host(host, shelter, self.current_time);
        Ok(())
    }

    /// Seeds a host with `round(U(infestation_min, infestation_max))` lice on its worn set.
    fn infest(&mut self, host: AgentId, pct_vectors_infected: f64) -> Result<(), SimError> {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let count = self
            .rng
            .uniform_between(
                self.parameters.infestation_min as f64,
                self.parameters.infestation_max as f64,
            )
            .round() as usize;
        let clothes_set = self.world.host(host).map_or(0, |state| state.clothes_set);
        for _ in 0..count {
            let infected = self.rng.probability_met(pct_vectors_infected);
            self.create_vector(infected, VectorOrigin::Initial, Some(host), clothes_set)?;
        }
        Ok(())
    }

    pub(crate) fn create_host(&mut self, infected: bool) -> Result<AgentId, SimError> {
        let label = self.world.population.next_host_label()?;
        let agent = new_host(
            label,
            infected,
            &self.parameters,
            &mut self.rng,
            self.current_time,
        );
        Ok(self.world.population.insert(agent))
    }

    /// Adds a vector and, if `host` is given, attaches it to `clothes_set` on that host.
    pub(crate) fn create_vector(
        &mut self,
        infected: bool,
        origin: VectorOrigin,
        host: Option<AgentId>,
        clothes_set: usize,
    ) -> Result<AgentId, SimError> {
        let label = self.world.population.next_vector_label()?;
        let agent = new_vector(
            label,
            infected,
            origin,
            None,
            &self.parameters,
            &mut self.rng,
            self.current_time,
        );
        let id = self.world.population.insert(agent);
        if let Some(host) = host {
            self.world.attach_vector(id, host, clothes_set);
        }
        Ok(id)
    }

    /// Runs until halted. Blocks while paused; a [`Controller`] clone on another thread can
    /// resume, single-step or stop the run.
    pub fn run(&mut self) -> SimState {
        loop {
            match self.controller.state() {
                SimState::Halted => break,
                SimState::Paused => {
                    self.controller.wait_while_paused();
                }
                SimState::Running => {
                    self.step();
                }
                SimState::SingleStep => {
                    self.step();
                    self.controller.finish_single_step();
                }
            }
        }
        info!(
            "halted at t={:.3} after {} events",
            self.current_time, self.events_handled
        );
        SimState::Halted
    }

    /// Handles the next event, whatever the controller state short of `Halted`. Returns
    /// `None`, halting the run, once nothing is scheduled before the time limit.
    pub fn step(&mut self) -> Option<EventRecord> {
        if self.controller.state() == SimState::Halted {
            return None;
        }
        let Some(id) = self.world.population.earliest() else {
            info!("no events scheduled at t={:.3}", self.current_time);
            self.controller.stop();
            return None;
        };
        let agent = self.world.population.get(id)?;
        let time = agent.core.next_event_time;
        let event_type = agent.core.next_event_type;
        let label = agent.core.label.clone();

        if time >= self.max_sim_time {
            self.record_days_through(self.max_sim_time);
            info!("reached the time limit t={}", self.max_sim_time);
            self.controller.stop();
            return None;
        }
        if time < self.current_time {
            self.invariant_violation(&format!(
                "clock moved backwards from {} to {time} at {event_type} of {label}",
                self.current_time
            ));
        }

        self.record_days_through(time);
        self.current_time = time;
        if let Some(agent) = self.world.population.get_mut(id) {
            agent.core.time_of_last_event = time;
            agent.core.type_of_last_event = event_type;
        }
        self.dispatch(id, event_type);

        if self.parameters.invariant_mode != InvariantMode::Off {
            if let Err(msg) = self.world.check_ledger() {
                self.invariant_violation(&msg);
            }
            if let Some(agent) = self.world.population.get(id) {
                if agent.is_stale() {
                    let msg = format!("{label} has a stale schedule after {event_type}");
                    self.invariant_violation(&msg);
                }
            }
        }

        self.events_handled += 1;
        let record = EventRecord {
            time,
            agent: label,
            event_type,
        };
        self.last_event = Some(record.clone());
        Some(record)
    }

    fn dispatch(&mut self, id: AgentId, event_type: EventType) {
        match event_type {
            EventType::HostMove => rules::host::handle_move(self, id),
            EventType::HostInteract => rules::host::handle_interact(self, id),
            EventType::HostShower => rules::host::handle_shower(self, id),
            EventType::HostAntibioticApply => rules::host::handle_antibiotic_apply(self, id),
            EventType::HostAntibioticClear => rules::host::handle_antibiotic_clear(self, id),
            EventType::HostLaundry => rules::host::handle_laundry(self, id),
            EventType::HostClothesChange => rules::host::handle_clothes_change(self, id),
            EventType::HostInfectionCheck => rules::host::handle_infection_check(self, id),
            EventType::HostDeath => rules::host::handle_death(self, id),
            EventType::VectorHatch => rules::vector::handle_hatch(self, id),
            EventType::VectorMature => rules::vector::handle_mature(self, id),
            EventType::VectorMove => rules::vector::handle_move(self, id),
            EventType::VectorOviposition => rules::vector::handle_oviposition(self, id),
            EventType::VectorDeath => rules::vector::handle_death(self, id),
            EventType::NoEvent => {
                warn!("agent {id} selected with nothing scheduled");
                self.world.refresh(id);
            }
        }
    }

    fn invariant_violation(&self, msg: &str) {
        match self.parameters.invariant_mode {
            InvariantMode::Fatal => panic!("invariant violated at t={}: {msg}", self.current_time),
            InvariantMode::Log | InvariantMode::Off => {
                error!("invariant violated at t={}: {msg}", self.current_time);
            }
        }
    }

    fn record_days_through(&mut self, time: f64) {
        while f64::from(self.next_report_day) <= time {
            self.record_day(self.next_report_day);
            self.next_report_day += 1;
        }
    }

    fn record_day(&mut self, day: u32) {
        let row = DailyCounts::new(day, self.world.host_counts());
        for subscriber in &mut self.subscribers {
            subscriber(&row);
        }
        self.series.push(row);
    }

    /// A handle that can pause, resume, single-step or stop this run from any thread.
    #[must_use]
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    pub fn pause(&self) -> SimState {
        self.controller.pause()
    }

    pub fn resume(&self) -> SimState {
        self.controller.resume()
    }

    pub fn single_step(&self) -> SimState {
        self.controller.single_step()
    }

    pub fn stop(&self) -> SimState {
        self.controller.stop()
    }

    #[must_use]
    pub fn state(&self) -> SimState {
        self.controller.state()
    }

    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    #[must_use]
    pub fn counts(&self) -> HostCounts {
        self.world.host_counts()
    }

    #[must_use]
    pub fn time_series(&self) -> &TimeSeries {
        &self.series
    }

    /// Calls `callback` with each daily row as it is recorded.
    pub fn subscribe_to_daily_counts<F>(&mut self, callback: F)
    where
        F: FnMut(&DailyCounts) + Send + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// # Errors
    /// Returns a `SimError` for a non-CSV path or any I/O failure.
    pub fn export_time_series(&self, path: &Path) -> Result<(), SimError> {
        self.series.export(path)
    }

    #[must_use]
    pub fn agent_by_id(&self, label: &str) -> Option<&Agent> {
        self.world
            .population
            .id_of(label)
            .and_then(|id| self.world.population.get(id))
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.world.population.get(id)
    }

    #[must_use]
    pub fn shelter_at(&self, row: usize, col: usize) -> Option<&Shelter> {
        self.world.grid.shelter_at(row, col)
    }

    /// The hosts in a shelter, in arrival order. Empty for a cell outside the grid.
    #[must_use]
    pub fn occupants(&self, row: usize, col: usize) -> Vec<&Agent> {
        self.shelter_at(row, col)
            .map(|shelter| {
                shelter
                    .occupants()
                    .iter()
                    .filter_map(|&id| self.world.population.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn grid(&self) -> &ShelterGrid {
        &self.world.grid
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.world.population
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Replaces the parameters and resets the simulation: the grid is regenerated from
    /// `parameters.seed`, the population and time series are emptied and the state returns to
    /// `Paused`. Controller handles and daily subscribers carry over.
    ///
    /// # Errors
    /// Returns `SimError::SimError` once a run has started and has not yet halted, and
    /// `SimError::ConfigError` if the parameters fail validation.
    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SimError> {
        let untouched = self.events_handled == 0 && self.world.population.is_empty();
        if self.state() != SimState::Halted && !untouched {
            return Err(SimError::SimError(
                "parameters can only change before a run starts or after it halts".into(),
            ));
        }
        parameters.validate()?;
        let mut rng = RandomVariates::new(parameters.seed);
        let grid = ShelterGrid::generate(&parameters, &mut rng);
        let mut fresh = Self::assemble(parameters, rng, grid);
        fresh.controller = self.controller.clone();
        fresh.subscribers = std::mem::take(&mut self.subscribers);
        fresh.controller.restart(SimState::Paused);
        *self = fresh;
        info!("parameters replaced, simulation reset");
        Ok(())
    }

    /// Adds an unsheltered host with its regular schedule.
    ///
    /// # Errors
    /// `SimError::PopulationExhausted` at the host limit.
    pub fn spawn_host(&mut self, infected: bool) -> Result<AgentId, SimError> {
        self.create_host(infected)
    }

    /// Puts a host in the shelter at `(row, col)`, moving it if it is already sheltered.
    /// Returns false if the cell is outside the grid or the shelter is full.
    pub fn place_host(&mut self, host: AgentId, row: usize, col: usize) -> bool {
        if self.world.grid.shelter_at(row, col).is_none() {
            return false;
        }
        let shelter = self.world.grid.id_at(row, col);
        let now = self.current_time;
        match self.world.host(host).map(|state| state.shelter) {
            Some(Some(_)) => self.world.relocate_host(host, shelter, now),
            Some(None) => self.world.admit_host(host, shelter, now),
            None => false,
        }
    }

    /// Adds a vector as described by `spec`.
    ///
    /// # Errors
    /// `SimError::PopulationExhausted` at the vector limit.
    pub fn spawn_vector(&mut self, spec: VectorSpec) -> Result<AgentId, SimError> {
        let clothes_set = spec
            .host
            .and_then(|host| self.world.host(host))
            .map_or(0, |state| state.clothes_set);
        let id = self.create_vector(spec.infected, spec.origin, spec.host, clothes_set)?;
        let now = self.current_time;
        if let Some(agent) = self.world.population.get_mut(id) {
            apply_overrides(agent, spec.overrides, now);
        }
        if spec.host.is_none() {
            if let Some((row, col)) = spec.shelter {
                if self.world.grid.shelter_at(row, col).is_some() {
                    let shelter = self.world.grid.id_at(row, col);
                    if let Some(state) = self.world.vector_mut(id) {
                        state.shelter = Some(shelter);
                    }
                }
            }
        }
        Ok(id)
    }

    /// Sets a host's infection status through the shelter ledger.
    pub fn set_infected(&mut self, host: AgentId, infected: bool) {
        self.world
            .set_host_infected(host, infected, self.current_time);
        self.world.refresh(host);
    }

    pub fn clear_schedule(&mut self, id: AgentId) -> bool {
        match self.world.population.get_mut(id) {
            Some(agent) => {
                agent.clear_schedule();
                true
            }
            None => false,
        }
    }

    pub fn clear_all_schedules(&mut self) {
        let ids = self.world.population.order().to_vec();
        for id in ids {
            self.clear_schedule(id);
        }
    }

    /// Sets one event time by hand. Returns false for an unknown agent or an event its kind
    /// does not have.
    pub fn schedule(&mut self, id: AgentId, event_type: EventType, time: f64) -> bool {
        self.world
            .population
            .get_mut(id)
            .is_some_and(|agent| agent.schedule(event_type, time))
    }

    /// Sets the time at which `step` halts. `start` overrides it with `max_sim_days`.
    pub fn set_max_sim_time(&mut self, time: f64) {
        self.max_sim_time = time;
    }

    /// Runs the ledger and schedule-cache checks over the whole population.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency found.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.world.check_ledger()?;
        for (_, agent) in self.world.population.iter() {
            if agent.is_stale() {
                return Err(format!("{} has a stale schedule", agent.label()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn events_handled(&self) -> usize {
        self.events_handled
    }

    #[must_use]
    pub fn last_event(&self) -> Option<&EventRecord> {
        self.last_event.as_ref()
    }

    pub(crate) fn infect_vector(&mut self, vector: AgentId) {
        let now = self.current_time;
        if let Some(agent) = self.world.population.get_mut(vector) {
            agent.core.infected = true;
            agent.core.time_of_infection = now;
        }
    }

    pub(crate) fn check_infestation_cap(&mut self, host: AgentId) -> usize {
        self.world.enforce_infestation_cap(
            host,
            self.parameters.infestation_cap,
            self.current_time,
            &mut self.rng,
        )
    }
}
