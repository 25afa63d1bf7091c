//! A capacity-bounded location holding hosts, with aggregate infection and infestation counts.
//!
//! The counts are only correct if every change to an occupant's infected or infested flag is
//! mirrored here. [`crate::world::World`] pairs the two; nothing else should call the
//! increment and decrement methods.

use std::fmt::{self, Display};

use crate::agent::AgentId;

/// Index of a shelter in its grid, `row * size + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShelterId(pub(crate) usize);

impl ShelterId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facilities {
    pub showers: bool,
    pub laundry: bool,
    pub medical_care: bool,
    pub intake_delousing: bool,
}

#[derive(Debug, Clone)]
pub struct Shelter {
    pub row: usize,
    pub col: usize,
    pub formal: bool,
    pub facilities: Facilities,
    capacity: usize,
    occupants: Vec<AgentId>,
    infected_count: usize,
    infested_count: usize,
    time_last_add: f64,
    time_last_remove: f64,
}

impl Shelter {
    #[must_use]
    pub fn new(row: usize, col: usize, formal: bool, facilities: Facilities, capacity: usize) -> Self {
        Shelter {
            row,
            col,
            formal,
            facilities,
            capacity,
            occupants: Vec::with_capacity(capacity),
            infected_count: 0,
            infested_count: 0,
            time_last_add: 0.0,
            time_last_remove: 0.0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.occupants.len()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    #[must_use]
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    #[must_use]
    pub fn contains(&self, host: AgentId) -> bool {
        self.occupants.contains(&host)
    }

    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.infected_count
    }

    #[must_use]
    pub fn infested_count(&self) -> usize {
        self.infested_count
    }

    #[must_use]
    pub fn time_last_add(&self) -> f64 {
        self.time_last_add
    }

    #[must_use]
    pub fn time_last_remove(&self) -> f64 {
        self.time_last_remove
    }

    /// Admits a host carrying the given flags. Returns false, changing nothing, if the
    /// shelter is full or the host is already here.
    pub(crate) fn add(&mut self, host: AgentId, infected: bool, infested: bool, now: f64) -> bool {
        if self.is_full() || self.contains(host) {
            return false;
        }
        self.occupants.push(host);
        self.infected_count += usize::from(infected);
        self.infested_count += usize::from(infested);
        self.time_last_add = now;
        true
    }

    /// Discharges a host carrying the given flags. Returns false if the host is not here.
    pub(crate) fn remove(&mut self, host: AgentId, infected: bool, infested: bool, now: f64) -> bool {
        let Some(position) = self.occupants.iter().position(|&id| id == host) else {
            return false;
        };
        self.occupants.remove(position);
        if infected {
            self.decrement_infected();
        }
        if infested {
            self.decrement_infested();
        }
        self.time_last_remove = now;
        true
    }

    pub(crate) fn increment_infected(&mut self) {
        self.infected_count += 1;
    }

    pub(crate) fn decrement_infected(&mut self) {
        self.infected_count = self.infected_count.saturating_sub(1);
    }

    pub(crate) fn increment_infested(&mut self) {
        self.infested_count += 1;
    }

    pub(crate) fn decrement_infested(&mut self) {
        self.infested_count = self.infested_count.saturating_sub(1);
    }

    /// Empties the shelter, keeping its shape and facilities.
    pub(crate) fn reset(&mut self) {
        self.occupants.clear();
        self.infected_count = 0;
        self.infested_count = 0;
        self.time_last_add = 0.0;
        self.time_last_remove = 0.0;
    }

    /// Compares the maintained counts against recounted flags of the occupants.
    ///
    /// # Errors
    /// Returns a description of the first mismatch.
    pub fn check_counts(&self, infected: usize, infested: usize) -> Result<(), String> {
        if self.occupancy() > self.capacity {
            return Err(format!(
                "{self}: occupancy {} exceeds capacity {}",
                self.occupancy(),
                self.capacity
            ));
        }
        if self.infected_count != infected {
            return Err(format!(
                "{self}: infected count {} but {infected} infected occupants",
                self.infected_count
            ));
        }
        if self.infested_count != infested {
            return Err(format!(
                "{self}: infested count {} but {infested} infested occupants",
                self.infested_count
            ));
        }
        Ok(())
    }
}

impl Display for Shelter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "shelter({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_respects_capacity() {
        let mut shelter = Shelter::new(0, 0, false, Facilities::default(), 2);
        assert!(shelter.add(AgentId(1), true, false, 0.5));
        assert!(shelter.add(AgentId(2), false, true, 0.6));
        assert!(shelter.is_full());
        assert!(!shelter.add(AgentId(3), true, true, 0.7));
        assert_eq!(shelter.occupancy(), 2);
        assert_eq!(shelter.infected_count(), 1);
        assert_eq!(shelter.infested_count(), 1);
        assert!((shelter.time_last_add() - 0.6).abs() < f64::EPSILON);
        assert!(shelter.check_counts(1, 1).is_ok());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut shelter = Shelter::new(0, 0, false, Facilities::default(), 5);
        assert!(shelter.add(AgentId(1), false, false, 0.0));
        assert!(!shelter.add(AgentId(1), false, false, 0.0));
        assert_eq!(shelter.occupancy(), 1);
    }

    #[test]
    fn remove_absent_host() {
        let mut shelter = Shelter::new(1, 2, true, Facilities::default(), 5);
        assert!(!shelter.remove(AgentId(9), true, true, 1.0));
        assert!(shelter.add(AgentId(9), true, true, 1.0));
        assert!(shelter.remove(AgentId(9), true, true, 2.0));
        assert_eq!(shelter.occupancy(), 0);
        assert!(shelter.check_counts(0, 0).is_ok());
    }

    #[test]
    fn mismatch_is_reported() {
        let mut shelter = Shelter::new(3, 4, false, Facilities::default(), 5);
        assert!(shelter.add(AgentId(1), false, false, 0.0));
        shelter.increment_infected();
        let err = shelter.check_counts(0, 0).unwrap_err();
        assert!(err.contains("shelter(3, 4)"));
        assert!(err.contains("infected count 1"));
    }
}
