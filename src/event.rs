//! The fixed set of events an agent can schedule.

use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    HostMove,
    HostInteract,
    HostShower,
    HostAntibioticApply,
    HostAntibioticClear,
    HostLaundry,
    HostClothesChange,
    HostInfectionCheck,
    HostDeath,
    VectorHatch,
    VectorMature,
    VectorMove,
    VectorOviposition,
    VectorDeath,
    /// Nothing scheduled. Only seen while every event time is `+inf`.
    NoEvent,
}

impl EventType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventType::HostMove => "HOST_MOVE",
            EventType::HostInteract => "HOST_INTERACT",
            EventType::HostShower => "HOST_SHOWER",
            EventType::HostAntibioticApply => "HOST_AB_APP",
            EventType::HostAntibioticClear => "HOST_AB_CLEAR",
            EventType::HostLaundry => "HOST_LAUNDRY",
            EventType::HostClothesChange => "HOST_CLOTHES_CH",
            EventType::HostInfectionCheck => "HOST_CHECK_INF",
            EventType::HostDeath => "HOST_DEATH",
            EventType::VectorHatch => "VECTOR_HATCH",
            EventType::VectorMature => "VECTOR_MATURE",
            EventType::VectorMove => "VECTOR_MOVE",
            EventType::VectorOviposition => "VECTOR_OVIPOS",
            EventType::VectorDeath => "VECTOR_DEATH",
            EventType::NoEvent => "NO_EVENT",
        }
    }

    #[must_use]
    pub fn is_host_event(self) -> bool {
        matches!(
            self,
            EventType::HostMove
                | EventType::HostInteract
                | EventType::HostShower
                | EventType::HostAntibioticApply
                | EventType::HostAntibioticClear
                | EventType::HostLaundry
                | EventType::HostClothesChange
                | EventType::HostInfectionCheck
                | EventType::HostDeath
        )
    }

    #[must_use]
    pub fn is_vector_event(self) -> bool {
        !self.is_host_event() && self != EventType::NoEvent
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One handled event, as returned by a single step of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub time: f64,
    pub agent: String,
    pub event_type: EventType,
}
