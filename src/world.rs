//! The shelter grid and the population, with the operations that keep them in agreement.
//!
//! A host's infected and infested flags are mirrored by the counters of the shelter it
//! occupies. Every flag change goes through [`World::set_host_infected`] or
//! [`World::sync_host_infestation`], which update both sides together. Host and vector
//! attachments go through [`World::attach_vector`] and [`World::detach_vector`].

use log::{trace, warn};

use crate::agent::{Agent, AgentId, HostState, VectorState};
use crate::population::Population;
use crate::random::RandomVariates;
use crate::shelter::ShelterId;
use crate::shelter_grid::ShelterGrid;

/// Host totals at one instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostCounts {
    pub infected: usize,
    pub uninfected: usize,
    pub infested: usize,
    pub uninfested: usize,
    pub treated: usize,
}

#[derive(Debug, Clone)]
pub struct World {
    pub grid: ShelterGrid,
    pub population: Population,
}

impl World {
    #[must_use]
    pub fn new(grid: ShelterGrid, population: Population) -> Self {
        World { grid, population }
    }

    #[must_use]
    pub fn host(&self, id: AgentId) -> Option<&HostState> {
        self.population.get(id).and_then(Agent::as_host)
    }

    pub fn host_mut(&mut self, id: AgentId) -> Option<&mut HostState> {
        self.population.get_mut(id).and_then(Agent::as_host_mut)
    }

    #[must_use]
    pub fn vector(&self, id: AgentId) -> Option<&VectorState> {
        self.population.get(id).and_then(Agent::as_vector)
    }

    pub fn vector_mut(&mut self, id: AgentId) -> Option<&mut VectorState> {
        self.population.get_mut(id).and_then(Agent::as_vector_mut)
    }

    pub fn refresh(&mut self, id: AgentId) {
        if let Some(agent) = self.population.get_mut(id) {
            agent.refresh_next_event();
        }
    }

    #[must_use]
    pub fn is_infected(&self, id: AgentId) -> bool {
        self.population
            .get(id)
            .is_some_and(|agent| agent.core.infected)
    }

    /// A copy of the host's resident vector list.
    #[must_use]
    pub fn vectors_of(&self, host: AgentId) -> Vec<AgentId> {
        self.host(host)
            .map(|state| state.vectors.clone())
            .unwrap_or_default()
    }

    /// Resident vectors that have hatched and are not already condemned at `now`.
    #[must_use]
    pub fn active_lice(&self, host: AgentId, now: f64) -> Vec<AgentId> {
        self.vectors_of(host)
            .into_iter()
            .filter(|&id| {
                self.population.get(id).is_some_and(|agent| {
                    agent.core.time_of_death > now
                        && agent.as_vector().is_some_and(|v| !v.is_egg())
                })
            })
            .collect()
    }

    /// Resident vectors of any stage not already condemned at `now`.
    #[must_use]
    pub fn infestation_load(&self, host: AgentId, now: f64) -> usize {
        self.vectors_of(host)
            .into_iter()
            .filter(|&id| {
                self.population
                    .get(id)
                    .is_some_and(|agent| agent.core.time_of_death > now)
            })
            .count()
    }

    /// Places a host in a shelter. Returns false, changing nothing, if the shelter is full or
    /// the host is already sheltered. Intake delousing condemns every resident vector.
    pub fn admit_host(&mut self, host: AgentId, shelter: ShelterId, now: f64) -> bool {
        let Some(agent) = self.population.get(host) else {
            return false;
        };
        let Some(state) = agent.as_host() else {
            return false;
        };
        if state.shelter.is_some() {
            return false;
        }
        let infected = agent.core.infected;
        let infested = state.infested;
        let target = self.grid.get_mut(shelter);
        if !target.add(host, infected, infested, now) {
            return false;
        }
        let (row, col, delouse) = (target.row, target.col, target.facilities.intake_delousing);
        if let Some(state) = self.host_mut(host) {
            state.shelter = Some(shelter);
            state.row = row;
            state.col = col;
        }
        if delouse {
            for vector in self.vectors_of(host) {
                self.condemn_vector(vector, now);
            }
        }
        true
    }

    /// Takes a host out of its shelter. Returns false if it is not sheltered, or if the
    /// shelter it names does not list it, in which case the stale reference is dropped.
    pub fn discharge_host(&mut self, host: AgentId, now: f64) -> bool {
        let Some(agent) = self.population.get(host) else {
            return false;
        };
        let Some(shelter) = agent.as_host().and_then(|state| state.shelter) else {
            return false;
        };
        let infected = agent.core.infected;
        let infested = agent.as_host().is_some_and(|state| state.infested);
        let removed = self.grid.get_mut(shelter).remove(host, infected, infested, now);
        if !removed {
            warn!("host {host} names {shelter:?} but is not an occupant");
        }
        if let Some(state) = self.host_mut(host) {
            state.shelter = None;
        }
        removed
    }

    /// Moves a sheltered host to another shelter. On failure the host stays where it was.
    pub fn relocate_host(&mut self, host: AgentId, to: ShelterId, now: f64) -> bool {
        let Some(from) = self.host(host).and_then(|state| state.shelter) else {
            return false;
        };
        if from == to {
            return true;
        }
        if self.grid.get(to).is_full() {
            return false;
        }
        self.discharge_host(host, now);
        if self.admit_host(host, to, now) {
            true
        } else {
            self.admit_host(host, from, now);
            false
        }
    }

    /// Sets a host's infection flag, keeping its shelter's count in step.
    pub fn set_host_infected(&mut self, host: AgentId, infected: bool, now: f64) {
        let Some(agent) = self.population.get_mut(host) else {
            return;
        };
        if agent.core.infected == infected {
            return;
        }
        agent.core.infected = infected;
        agent.core.time_of_infection = if infected { now } else { f64::INFINITY };
        let Some(state) = agent.as_host_mut() else {
            return;
        };
        if infected {
            state.time_infected = now;
        }
        if let Some(shelter) = state.shelter {
            let shelter = self.grid.get_mut(shelter);
            if infected {
                shelter.increment_infected();
            } else {
                shelter.decrement_infected();
            }
        }
    }

    /// Recomputes a host's infested flag from its vector list, keeping its shelter's count
    /// in step.
    pub fn sync_host_infestation(&mut self, host: AgentId) {
        let Some(state) = self.host_mut(host) else {
            return;
        };
        let infested = !state.vectors.is_empty();
        if state.infested == infested {
            return;
        }
        state.infested = infested;
        let shelter = state.shelter;
        if let Some(shelter) = shelter {
            let shelter = self.grid.get_mut(shelter);
            if infested {
                shelter.increment_infested();
            } else {
                shelter.decrement_infested();
            }
        }
    }

    /// Puts a vector on a host's clothing set. A vector already on another host is detached
    /// first.
    pub fn attach_vector(&mut self, vector: AgentId, host: AgentId, clothes_set: usize) -> bool {
        if self.host(host).is_none() || self.vector(vector).is_none() {
            return false;
        }
        self.detach_vector(vector);
        if let Some(state) = self.vector_mut(vector) {
            state.host = Some(host);
            state.shelter = None;
            state.clothes_set = clothes_set;
        }
        if let Some(state) = self.host_mut(host) {
            state.vectors.push(vector);
        }
        self.sync_host_infestation(host);
        true
    }

    /// Takes a vector off its host and leaves it lying in the host's shelter. Returns false
    /// if it had no host.
    pub fn detach_vector(&mut self, vector: AgentId) -> bool {
        let Some(host) = self.vector(vector).and_then(|state| state.host) else {
            return false;
        };
        let shelter = self.host_mut(host).and_then(|state| {
            state.vectors.retain(|&id| id != vector);
            state.shelter
        });
        if let Some(state) = self.vector_mut(vector) {
            state.host = None;
            state.shelter = shelter;
        }
        self.sync_host_infestation(host);
        true
    }

    /// Schedules a vector's death at `now`.
    pub fn condemn_vector(&mut self, vector: AgentId, now: f64) {
        if let Some(agent) = self.population.get_mut(vector) {
            if agent.core.time_of_death > now {
                agent.core.time_of_death = now;
                agent.refresh_next_event();
            }
        }
    }

    /// Detaches and deletes a vector.
    pub fn remove_vector(&mut self, vector: AgentId) -> Option<Agent> {
        self.detach_vector(vector);
        self.population.remove(vector)
    }

    /// Drops the host's vectors where it stands, discharges it and deletes it.
    pub fn remove_host(&mut self, host: AgentId, now: f64) -> Option<Agent> {
        for vector in self.vectors_of(host) {
            self.detach_vector(vector);
        }
        self.discharge_host(host, now);
        self.population.remove(host)
    }

    /// Enforces the per-host vector limit. Surplus vectors are chosen at random among the
    /// hatched, uncondemned residents and condemned at `now`. Returns how many were condemned.
    pub fn enforce_infestation_cap(
        &mut self,
        host: AgentId,
        cap: usize,
        now: f64,
        rng: &mut RandomVariates,
    ) -> usize {
        let load = self.infestation_load(host, now);
        if load <= cap {
            return 0;
        }
        let candidates = self.active_lice(host, now);
        let surplus = load - cap;
        let doomed = rng.choose_multiple(&candidates, surplus);
        for &vector in &doomed {
            self.condemn_vector(vector, now);
        }
        trace!(
            "infestation cap: host {host} carried {load}, condemned {}",
            doomed.len()
        );
        doomed.len()
    }

    /// Vectors lying unhosted in a shelter.
    #[must_use]
    pub fn vectors_lying_in(&self, shelter: ShelterId) -> Vec<AgentId> {
        self.population
            .iter()
            .filter(|(_, agent)| {
                agent
                    .as_vector()
                    .is_some_and(|v| v.host.is_none() && v.shelter == Some(shelter))
            })
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn host_counts(&self) -> HostCounts {
        let mut counts = HostCounts::default();
        for (_, agent) in self.population.hosts() {
            let Some(state) = agent.as_host() else { continue };
            if agent.core.infected {
                counts.infected += 1;
            } else {
                counts.uninfected += 1;
            }
            if state.infested {
                counts.infested += 1;
            } else {
                counts.uninfested += 1;
            }
            counts.treated += usize::from(state.treated);
        }
        counts
    }

    /// Recounts every shelter from its occupants' flags and checks back-references in both
    /// directions.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency found.
    pub fn check_ledger(&self) -> Result<(), String> {
        for (shelter_id, shelter) in self.grid.iter() {
            let mut infected = 0;
            let mut infested = 0;
            for &occupant in shelter.occupants() {
                let Some(agent) = self.population.get(occupant) else {
                    return Err(format!("{shelter} holds dead agent {occupant}"));
                };
                let Some(state) = agent.as_host() else {
                    return Err(format!("{shelter} holds non-host {}", agent.label()));
                };
                if state.shelter != Some(shelter_id) {
                    return Err(format!(
                        "{} is in {shelter} but points at {:?}",
                        agent.label(),
                        state.shelter
                    ));
                }
                infected += usize::from(agent.core.infected);
                infested += usize::from(state.infested);
            }
            shelter.check_counts(infected, infested)?;
        }
        for (id, agent) in self.population.hosts() {
            let Some(state) = agent.as_host() else { continue };
            if state.infested == state.vectors.is_empty() {
                return Err(format!(
                    "{} infested={} with {} vectors",
                    agent.label(),
                    state.infested,
                    state.vectors.len()
                ));
            }
            if let Some(shelter) = state.shelter {
                if !self.grid.get(shelter).contains(id) {
                    return Err(format!(
                        "{} points at {} but is not an occupant",
                        agent.label(),
                        self.grid.get(shelter)
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::host::new_host;
    use crate::agent::vector::{new_vector, VectorOrigin};
    use crate::parameters::Parameters;
    use crate::shelter::{Facilities, Shelter};

    fn world(capacity: usize, facilities: Facilities) -> World {
        let grid = ShelterGrid::from_shelters(vec![
            Shelter::new(0, 0, true, facilities, capacity);
            4
        ])
        .unwrap();
        World::new(grid, Population::new(100, 1000))
    }

    fn spawn_host(world: &mut World, rng: &mut RandomVariates, infected: bool) -> AgentId {
        let label = world.population.next_host_label().unwrap();
        let agent = new_host(label, infected, &Parameters::default(), rng, 0.0);
        world.population.insert(agent)
    }

    fn spawn_louse(world: &mut World, rng: &mut RandomVariates, host: AgentId) -> AgentId {
        let label = world.population.next_vector_label().unwrap();
        let agent = new_vector(
            label,
            false,
            VectorOrigin::Initial,
            Some(host),
            &Parameters::default(),
            rng,
            0.0,
        );
        let id = world.population.insert(agent);
        assert!(world.attach_vector(id, host, 0));
        id
    }

    #[test]
    fn admit_and_flag_changes_keep_counts() {
        let mut rng = RandomVariates::new(1);
        let mut world = world(2, Facilities::default());
        let shelter = world.grid.id_at(0, 1);
        let h1 = spawn_host(&mut world, &mut rng, true);
        let h2 = spawn_host(&mut world, &mut rng, false);
        let h3 = spawn_host(&mut world, &mut rng, false);
        assert!(world.admit_host(h1, shelter, 0.0));
        assert!(world.admit_host(h2, shelter, 0.0));
        assert!(!world.admit_host(h3, shelter, 0.0));
        assert_eq!(world.grid.get(shelter).infected_count(), 1);

        world.set_host_infected(h2, true, 1.0);
        assert_eq!(world.grid.get(shelter).infected_count(), 2);
        spawn_louse(&mut world, &mut rng, h1);
        assert_eq!(world.grid.get(shelter).infested_count(), 1);
        world.set_host_infected(h1, false, 2.0);
        assert_eq!(world.grid.get(shelter).infected_count(), 1);
        assert!(world.check_ledger().is_ok());

        let counts = world.host_counts();
        assert_eq!(counts.infected, 1);
        assert_eq!(counts.uninfected, 2);
        assert_eq!(counts.infested, 1);
    }

    #[test]
    fn relocation_moves_counts() {
        let mut rng = RandomVariates::new(2);
        let mut world = world(1, Facilities::default());
        let a = world.grid.id_at(0, 0);
        let b = world.grid.id_at(1, 1);
        let h1 = spawn_host(&mut world, &mut rng, true);
        let h2 = spawn_host(&mut world, &mut rng, false);
        assert!(world.admit_host(h1, a, 0.0));
        assert!(world.admit_host(h2, b, 0.0));
        assert!(!world.relocate_host(h1, b, 1.0));
        assert_eq!(world.host(h1).unwrap().shelter, Some(a));
        assert!(world.relocate_host(h2, world.grid.id_at(1, 0), 1.0));
        assert!(world.relocate_host(h1, b, 1.0));
        assert_eq!(world.grid.get(a).infected_count(), 0);
        assert_eq!(world.grid.get(b).infected_count(), 1);
        assert_eq!((world.host(h1).unwrap().row, world.host(h1).unwrap().col), (1, 1));
        assert!(world.check_ledger().is_ok());
    }

    #[test]
    fn discharge_of_unlisted_host_fails() {
        let mut rng = RandomVariates::new(7);
        let mut world = world(2, Facilities::default());
        let host = spawn_host(&mut world, &mut rng, false);
        assert!(!world.discharge_host(host, 0.0));
        assert!(world.admit_host(host, world.grid.id_at(0, 0), 0.0));
        let elsewhere = world.grid.id_at(1, 1);
        world.host_mut(host).unwrap().shelter = Some(elsewhere);
        assert!(!world.discharge_host(host, 1.0));
        assert_eq!(world.host(host).unwrap().shelter, None);
        assert_eq!(world.grid.get(elsewhere).occupancy(), 0);
    }

    #[test]
    fn intake_delousing_condemns_vectors() {
        let mut rng = RandomVariates::new(3);
        let facilities = Facilities {
            intake_delousing: true,
            ..Facilities::default()
        };
        let mut world = world(5, facilities);
        let host = spawn_host(&mut world, &mut rng, false);
        let louse = spawn_louse(&mut world, &mut rng, host);
        world.population.get_mut(louse).unwrap().core.time_of_death = 100.0;
        assert!(world.admit_host(host, world.grid.id_at(0, 0), 4.0));
        let agent = world.population.get(louse).unwrap();
        assert!((agent.core.time_of_death - 4.0).abs() < f64::EPSILON);
        assert!(agent.core.next_event_time <= 4.0);
    }

    #[test]
    fn detach_and_remove_keep_infestation() {
        let mut rng = RandomVariates::new(4);
        let mut world = world(5, Facilities::default());
        let shelter = world.grid.id_at(0, 0);
        let host = spawn_host(&mut world, &mut rng, false);
        assert!(world.admit_host(host, shelter, 0.0));
        let a = spawn_louse(&mut world, &mut rng, host);
        let b = spawn_louse(&mut world, &mut rng, host);
        assert!(world.host(host).unwrap().infested);
        assert!(world.detach_vector(a));
        assert!(!world.detach_vector(a));
        assert_eq!(world.vector(a).unwrap().shelter, Some(shelter));
        assert_eq!(world.vectors_lying_in(shelter), vec![a]);
        assert!(world.remove_vector(b).is_some());
        assert!(!world.host(host).unwrap().infested);
        assert_eq!(world.grid.get(shelter).infested_count(), 0);
        assert!(world.check_ledger().is_ok());

        spawn_louse(&mut world, &mut rng, host);
        assert!(world.remove_host(host, 1.0).is_some());
        assert_eq!(world.grid.get(shelter).occupancy(), 0);
        assert_eq!(world.vectors_lying_in(shelter).len(), 2);
        assert!(world.check_ledger().is_ok());
    }

    #[test]
    fn cap_condemns_surplus_lice() {
        let mut rng = RandomVariates::new(5);
        let mut world = world(5, Facilities::default());
        let host = spawn_host(&mut world, &mut rng, false);
        for _ in 0..12 {
            spawn_louse(&mut world, &mut rng, host);
        }
        assert_eq!(world.enforce_infestation_cap(host, 12, 0.0, &mut rng), 0);
        assert_eq!(world.enforce_infestation_cap(host, 9, 0.0, &mut rng), 3);
        assert_eq!(world.infestation_load(host, 0.0), 9);
        // Condemned lice are not counted twice.
        assert_eq!(world.enforce_infestation_cap(host, 9, 0.0, &mut rng), 0);
    }

    #[test]
    fn broken_ledger_is_reported() {
        let mut rng = RandomVariates::new(6);
        let mut world = world(5, Facilities::default());
        let host = spawn_host(&mut world, &mut rng, false);
        assert!(world.admit_host(host, world.grid.id_at(0, 0), 0.0));
        world.population.get_mut(host).unwrap().core.infected = true;
        assert!(world.check_ledger().is_err());
    }
}
