//! A next-event simulation of louse-borne infection among hosts living in a grid of shelters.
//!
//! Hosts move between capacity-bounded shelters, share lice with the people they shelter
//! with, and may be infected by the lice they carry. Lice hatch, mature, lay eggs, change
//! hosts and die. Shelters may offer showers, laundry, medical care and intake delousing.
//!
//! The central object is the [`Simulation`]. It owns:
//! * the [`World`]: the shelter grid and the agent population, kept in agreement by a
//!   small set of ledger operations
//! * the random variate service, seeded per run so a run is reproducible
//! * the clock, the event loop and a [`Controller`] that pauses, resumes, single-steps or
//!   stops the loop from any thread
//! * the daily [`TimeSeries`] of host counts, exportable as CSV
//!
//! Every agent caches its next event. Each step of the loop handles the earliest one and
//! applies the matching rule.
pub mod agent;
pub mod control;
pub mod error;
pub mod event;
pub mod log;
pub mod parameters;
pub mod population;
pub mod random;
pub mod report;
mod rules;
pub mod runner;
pub mod shelter;
pub mod shelter_grid;
pub mod simulation;
pub mod world;

pub use agent::{Agent, AgentId, Gender, LifeStage, VectorOrigin};
pub use control::{Controller, SimState};
pub use error::SimError;
pub use event::{EventRecord, EventType};
pub use parameters::{InvariantMode, Parameters};
pub use report::{DailyCounts, TimeSeries};
pub use simulation::{Simulation, StartArgs, VectorSpec};
pub use world::{HostCounts, World};
