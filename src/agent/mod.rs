//! Hosts and vectors share an [`AgentCore`] (identity, infection status, death time and the
//! cached next event) and differ in an [`AgentKind`] payload.
//!
//! Each agent caches the minimum of its event-time fields in `next_event_time`. The cache is
//! only recomputed by [`Agent::refresh_next_event`], which every rule must call after mutating
//! a tracked field. [`Agent::is_stale`] detects a missed refresh.

pub mod host;
pub mod vector;

use std::fmt::{self, Display};

use crate::event::EventType;
pub use host::HostState;
pub use vector::{Gender, LifeStage, VectorOrigin, VectorState};

/// Stable handle to a live agent in the population arena. Handles of dead agents may be
/// reused by later agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct AgentCore {
    /// `H<n>` for hosts, `V<n>` for vectors.
    pub label: String,
    pub infected: bool,
    pub time_of_infection: f64,
    pub time_of_death: f64,
    pub next_event_time: f64,
    pub next_event_type: EventType,
    pub time_of_last_event: f64,
    pub type_of_last_event: EventType,
}

impl AgentCore {
    #[must_use]
    pub fn new(label: String, infected: bool, now: f64) -> Self {
        AgentCore {
            label,
            infected,
            time_of_infection: if infected { now } else { f64::INFINITY },
            time_of_death: f64::INFINITY,
            next_event_time: f64::INFINITY,
            next_event_type: EventType::NoEvent,
            time_of_last_event: f64::NEG_INFINITY,
            type_of_last_event: EventType::NoEvent,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AgentKind {
    Host(HostState),
    Vector(VectorState),
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub core: AgentCore,
    pub kind: AgentKind,
}

/// Scans `(time, event)` pairs in order and keeps the first strictly smaller time, so on a tie
/// the earlier entry wins.
fn earliest<const N: usize>(schedule: [(f64, EventType); N]) -> (f64, EventType) {
    let mut best = (f64::INFINITY, EventType::NoEvent);
    for (time, event_type) in schedule {
        if time < best.0 {
            best = (time, event_type);
        }
    }
    best
}

impl Agent {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self.kind, AgentKind::Host(_))
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        matches!(self.kind, AgentKind::Vector(_))
    }

    #[must_use]
    pub fn as_host(&self) -> Option<&HostState> {
        match &self.kind {
            AgentKind::Host(host) => Some(host),
            AgentKind::Vector(_) => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut HostState> {
        match &mut self.kind {
            AgentKind::Host(host) => Some(host),
            AgentKind::Vector(_) => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<&VectorState> {
        match &self.kind {
            AgentKind::Vector(vector) => Some(vector),
            AgentKind::Host(_) => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorState> {
        match &mut self.kind {
            AgentKind::Vector(vector) => Some(vector),
            AgentKind::Host(_) => None,
        }
    }

    /// The minimum over the live event-time fields, scanned in the fixed priority order.
    /// Death is scanned first, so it wins every tie.
    #[must_use]
    pub fn computed_next_event(&self) -> (f64, EventType) {
        let death = self.core.time_of_death;
        match &self.kind {
            AgentKind::Host(host) => earliest([
                (death, EventType::HostDeath),
                (host.time_next_move, EventType::HostMove),
                (host.time_next_interaction, EventType::HostInteract),
                (host.time_antibiotic_applied, EventType::HostAntibioticApply),
                (host.time_antibiotic_clears, EventType::HostAntibioticClear),
                (host.time_next_shower, EventType::HostShower),
                (host.time_next_clothes_change, EventType::HostClothesChange),
                (host.time_next_infection_check, EventType::HostInfectionCheck),
                (host.time_next_laundry, EventType::HostLaundry),
            ]),
            AgentKind::Vector(vector) => earliest([
                (death, EventType::VectorDeath),
                (vector.time_hatching, EventType::VectorHatch),
                (vector.time_maturing, EventType::VectorMature),
                (vector.time_next_oviposition, EventType::VectorOviposition),
                (vector.time_next_move, EventType::VectorMove),
            ]),
        }
    }

    pub fn refresh_next_event(&mut self) {
        let (time, event_type) = self.computed_next_event();
        self.core.next_event_time = time;
        self.core.next_event_type = event_type;
    }

    /// True if the cached next event disagrees with the event-time fields.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let (time, event_type) = self.computed_next_event();
        time.to_bits() != self.core.next_event_time.to_bits()
            || event_type != self.core.next_event_type
    }

    /// The event-time field that `event_type` reads, if this kind of agent has one.
    fn event_time_mut(&mut self, event_type: EventType) -> Option<&mut f64> {
        match (&mut self.kind, event_type) {
            (AgentKind::Host(_), EventType::HostDeath)
            | (AgentKind::Vector(_), EventType::VectorDeath) => Some(&mut self.core.time_of_death),
            (AgentKind::Host(host), _) => host.event_time_mut(event_type),
            (AgentKind::Vector(vector), _) => vector.event_time_mut(event_type),
        }
    }

    /// Sets every event-time field to `+inf`. Used by controlled drivers before scheduling a
    /// single event by hand.
    pub fn clear_schedule(&mut self) {
        self.core.time_of_death = f64::INFINITY;
        match &mut self.kind {
            AgentKind::Host(host) => host.clear_schedule(),
            AgentKind::Vector(vector) => vector.clear_schedule(),
        }
        self.refresh_next_event();
    }

    /// Sets the time of one event and refreshes the cache. Returns false if this kind of agent
    /// has no such event.
    pub fn schedule(&mut self, event_type: EventType, time: f64) -> bool {
        match self.event_time_mut(event_type) {
            Some(field) => {
                *field = time;
                self.refresh_next_event();
                true
            }
            None => false,
        }
    }
}
