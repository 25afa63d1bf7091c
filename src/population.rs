//! Flat storage for every live agent. Agents are addressed by [`AgentId`] slots; freed slots
//! are reused. A separate list keeps live agents in insertion order, which is the order the
//! event scan visits them in.

use log::trace;
use rustc_hash::FxHashMap;

use crate::agent::{Agent, AgentId};
use crate::error::SimError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulationStats {
    pub hosts_created: usize,
    pub hosts_removed: usize,
    pub vectors_created: usize,
    pub vectors_removed: usize,
}

#[derive(Debug, Clone)]
pub struct Population {
    slots: Vec<Option<Agent>>,
    free: Vec<usize>,
    order: Vec<AgentId>,
    by_label: FxHashMap<String, AgentId>,
    live_hosts: usize,
    live_vectors: usize,
    max_hosts: usize,
    max_vectors: usize,
    next_host_number: usize,
    next_vector_number: usize,
    stats: PopulationStats,
}

impl Population {
    #[must_use]
    pub fn new(max_hosts: usize, max_vectors: usize) -> Self {
        Population {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            by_label: FxHashMap::default(),
            live_hosts: 0,
            live_vectors: 0,
            max_hosts,
            max_vectors,
            next_host_number: 0,
            next_vector_number: 0,
            stats: PopulationStats::default(),
        }
    }

    /// Drops every agent and restarts the label counters.
    pub fn clear(&mut self, max_hosts: usize, max_vectors: usize) {
        *self = Population::new(max_hosts, max_vectors);
    }

    /// Reserves the next host label, failing if the host limit is reached.
    ///
    /// # Errors
    /// `SimError::PopulationExhausted` when `max_hosts` hosts are alive.
    pub fn next_host_label(&mut self) -> Result<String, SimError> {
        if self.live_hosts >= self.max_hosts {
            return Err(SimError::PopulationExhausted {
                kind: "host",
                limit: self.max_hosts,
            });
        }
        let label = format!("H{}", self.next_host_number);
        self.next_host_number += 1;
        Ok(label)
    }

    /// Reserves the next vector label, failing if the vector limit is reached.
    ///
    /// # Errors
    /// `SimError::PopulationExhausted` when `max_vectors` vectors are alive.
    pub fn next_vector_label(&mut self) -> Result<String, SimError> {
        if self.live_vectors >= self.max_vectors {
            return Err(SimError::PopulationExhausted {
                kind: "vector",
                limit: self.max_vectors,
            });
        }
        let label = format!("V{}", self.next_vector_number);
        self.next_vector_number += 1;
        Ok(label)
    }

    /// Stores an agent and appends it to the scan order.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        if agent.is_host() {
            self.live_hosts += 1;
            self.stats.hosts_created += 1;
        } else {
            self.live_vectors += 1;
            self.stats.vectors_created += 1;
        }
        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(agent);
                AgentId(index)
            }
            None => {
                self.slots.push(Some(agent));
                AgentId(self.slots.len() - 1)
            }
        };
        if let Some(agent) = &self.slots[id.0] {
            self.by_label.insert(agent.core.label.clone(), id);
        }
        self.order.push(id);
        id
    }

    /// Removes an agent. The caller is responsible for clearing references to it first.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.slots.get_mut(id.0)?.take()?;
        if agent.is_host() {
            self.live_hosts -= 1;
            self.stats.hosts_removed += 1;
        } else {
            self.live_vectors -= 1;
            self.stats.vectors_removed += 1;
        }
        self.by_label.remove(&agent.core.label);
        self.order.retain(|&other| other != id);
        self.free.push(id.0);
        trace!("removed {} from population", agent.core.label);
        Some(agent)
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn id_of(&self, label: &str) -> Option<AgentId> {
        self.by_label.get(label).copied()
    }

    /// Live agents in insertion order.
    #[must_use]
    pub fn order(&self) -> &[AgentId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.order
            .iter()
            .filter_map(|&id| self.get(id).map(|agent| (id, agent)))
    }

    pub fn hosts(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.iter().filter(|(_, agent)| agent.is_host())
    }

    #[must_use]
    pub fn live_hosts(&self) -> usize {
        self.live_hosts
    }

    #[must_use]
    pub fn live_vectors(&self) -> usize {
        self.live_vectors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> PopulationStats {
        self.stats
    }

    /// The live agent with the smallest cached next-event time. The first agent in insertion
    /// order wins a tie.
    #[must_use]
    pub fn earliest(&self) -> Option<AgentId> {
        let mut best: Option<(AgentId, f64)> = None;
        for &id in &self.order {
            let Some(agent) = self.get(id) else { continue };
            let time = agent.core.next_event_time;
            match best {
                Some((_, best_time)) if time >= best_time => {}
                _ if time.is_finite() => best = Some((id, time)),
                _ => {}
            }
        }
        best.map(|(id, _)| id)
    }
}
