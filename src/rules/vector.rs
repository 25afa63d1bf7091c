//! Vector events: the egg, larva, adult life cycle, egg laying, movement between hosts and
//! death.

use log::{trace, warn};

use crate::agent::vector::{LifeStage, VectorOrigin, MEAN_OVIPOSITION_INTERVAL};
use crate::agent::AgentId;
use crate::simulation::Simulation;

/// Added to a deferred oviposition so it lands strictly after the meal that deferred it.
pub const EVENT_EPSILON: f64 = 7e-4;

pub(crate) fn handle_hatch(sim: &mut Simulation, vector: AgentId) {
    let host = sim.world.vector_mut(vector).and_then(|state| {
        state.stage = LifeStage::Larva;
        state.time_hatching = f64::INFINITY;
        state.host
    });
    sim.world.refresh(vector);
    if let Some(host) = host {
        sim.check_infestation_cap(host);
    }
}

pub(crate) fn handle_mature(sim: &mut Simulation, vector: AgentId) {
    let now = sim.current_time;
    let interval = sim.rng.exponential(MEAN_OVIPOSITION_INTERVAL);
    if let Some(state) = sim.world.vector_mut(vector) {
        state.stage = LifeStage::Adult;
        state.time_maturing = f64::INFINITY;
        if state.is_female() && state.time_next_oviposition.is_infinite() {
            state.time_next_oviposition = now + interval;
        }
    }
    sim.world.refresh(vector);
}

/// A louse in clothes the host is not wearing leaves the host and drops to the shelter floor.
/// An unhosted louse tries each occupant of its shelter in turn and may starve if nobody
/// takes it.
pub(crate) fn handle_move(sim: &mut Simulation, vector: AgentId) {
    let now = sim.current_time;
    let Some(state) = sim.world.vector(vector) else {
        return;
    };
    let (host, clothes_set, lying_in) = (state.host, state.clothes_set, state.shelter);

    match host {
        Some(host) => {
            let worn = sim.world.host(host).map(|state| state.clothes_set);
            if worn.is_some_and(|worn| worn != clothes_set) {
                if sim.world.is_infected(host)
                    && !sim.world.is_infected(vector)
                    && sim
                        .rng
                        .probability_met(sim.parameters.probability_infected_by_feeding)
                {
                    sim.infect_vector(vector);
                }
                sim.world.detach_vector(vector);
                trace!("vector {vector} left host {host}");
            }
        }
        None => {
            let occupants: Vec<AgentId> = lying_in
                .map(|shelter| sim.world.grid.get(shelter).occupants().to_vec())
                .unwrap_or_default();
            let mut new_host = None;
            for occupant in occupants {
                if sim
                    .rng
                    .probability_met(sim.parameters.probability_louse_rehosts)
                {
                    new_host = Some(occupant);
                    break;
                }
            }
            match new_host {
                Some(host) => {
                    let worn = sim.world.host(host).map_or(0, |state| state.clothes_set);
                    sim.world.attach_vector(vector, host, worn);
                    trace!("vector {vector} rehosted on {host}");
                    sim.check_infestation_cap(host);
                }
                None => {
                    if sim
                        .rng
                        .probability_met(sim.parameters.probability_unhosted_starves)
                    {
                        trace!("vector {vector} starves at {now}");
                        sim.world.condemn_vector(vector, now);
                    }
                }
            }
        }
    }

    let delay = sim
        .rng
        .exponential(sim.parameters.mean_time_between_vector_moves);
    if let Some(state) = sim.world.vector_mut(vector) {
        state.time_next_move = now + delay;
    }
    sim.world.refresh(vector);
}

/// A feeding or unhosted female defers laying until the meal is over. Otherwise she lays a
/// clutch in the clothing set she occupies.
pub(crate) fn handle_oviposition(sim: &mut Simulation, vector: AgentId) {
    let now = sim.current_time;
    let Some(state) = sim.world.vector(vector) else {
        return;
    };
    if !state.is_female() || state.stage != LifeStage::Adult {
        warn!("oviposition for vector {vector} that is not an adult female at {now}");
        if let Some(state) = sim.world.vector_mut(vector) {
            state.time_next_oviposition = f64::INFINITY;
        }
        sim.world.refresh(vector);
        return;
    }
    let (host, clothes_set) = (state.host, state.clothes_set);

    let feeding = sim.rng.probability_met(sim.parameters.probability_feeding);
    let next = match host {
        Some(host) if !feeding => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let clutch = sim
                .rng
                .uniform_between(
                    sim.parameters.eggs_per_day_min,
                    sim.parameters.eggs_per_day_max,
                )
                .round() as usize;
            for _ in 0..clutch {
                if let Err(e) = sim.create_vector(false, VectorOrigin::Egg, Some(host), clothes_set) {
                    warn!("clutch of vector {vector} cut short: {e}");
                    break;
                }
            }
            trace!("vector {vector} laid {clutch} eggs on host {host}");
            sim.check_infestation_cap(host);
            now + sim.rng.exponential(MEAN_OVIPOSITION_INTERVAL)
        }
        _ => now + sim.rng.uniform_between(0.0, sim.parameters.meal_duration_max) + EVENT_EPSILON,
    };
    if let Some(state) = sim.world.vector_mut(vector) {
        state.time_next_oviposition = next;
    }
    sim.world.refresh(vector);
}

pub(crate) fn handle_death(sim: &mut Simulation, vector: AgentId) {
    trace!("vector {vector} died at {}", sim.current_time);
    sim.world.remove_vector(vector);
}
