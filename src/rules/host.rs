//! Host events: movement between shelters, interaction with co-occupants, antibiotic
//! treatment, hygiene and death.

use log::trace;

use crate::agent::host::HYGIENE_INTERVAL;
use crate::agent::AgentId;
use crate::simulation::Simulation;

/// Compass offsets `(d_row, d_col)`: N, S, E, W, NE, SE, NW, SW.
const DIRECTIONS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (1, 1),
    (-1, -1),
    (1, -1),
];

/// Retry delay when a facility is unavailable.
const RETRY_DELAY: f64 = 1.0;

/// Picks a random direction and distance up to the field of view and walks back toward the
/// origin until a shelter with room is found. Steps that wrap back onto the origin are
/// skipped. The host stays put if every cell is full.
fn move_host(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let Some(state) = sim.world.host(host) else {
        return;
    };
    let Some(from) = state.shelter else {
        return;
    };
    let (row, col) = (state.row, state.col);
    let (d_row, d_col) = DIRECTIONS[sim.rng.index(DIRECTIONS.len())];
    let mut distance = sim.rng.index(sim.parameters.field_of_view) + 1;

    while distance > 0 {
        #[allow(clippy::cast_possible_wrap)]
        let step = distance as isize;
        let (to_row, to_col) = sim.world.grid.wrap(row, col, d_row * step, d_col * step);
        let to = sim.world.grid.id_at(to_row, to_col);
        if to != from && !sim.world.grid.get(to).is_full() {
            sim.world.relocate_host(host, to, now);
            trace!("host {host} moved ({row}, {col}) -> ({to_row}, {to_col})");
            break;
        }
        distance -= 1;
    }
}

/// Schedules antibiotics for an infected, untreated host with probability
/// `probability_treatment`. Treatment begins once the infection could have become
/// transmissible, and never in the past.
pub(crate) fn check_for_treatment(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    if !sim.world.is_infected(host) {
        return;
    }
    let Some(state) = sim.world.host(host) else {
        return;
    };
    if state.treated || !sim.rng.probability_met(sim.parameters.probability_treatment) {
        return;
    }
    let delay = sim.rng.uniform_between(
        sim.parameters.time_to_transmissibility_min,
        sim.parameters.time_to_transmissibility_max,
    );
    let time_infected = state.time_infected;
    if let Some(state) = sim.world.host_mut(host) {
        state.time_antibiotic_applied = (time_infected + delay).max(now);
    }
}

/// Runs after a move or interaction of an infected host: feeding lice may pick up the
/// infection, treatment may be scheduled under continuous monitoring, and the host may die
/// of the infection.
pub(crate) fn check_infection_status(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    if !sim.world.is_infected(host) {
        return;
    }
    for louse in sim.world.active_lice(host, now) {
        if sim.world.is_infected(louse) {
            continue;
        }
        if sim.rng.probability_met(sim.parameters.probability_feeding)
            && sim
                .rng
                .probability_met(sim.parameters.probability_infected_by_feeding)
        {
            sim.infect_vector(louse);
        }
    }
    if sim.parameters.continuous_antibiotic_monitoring {
        check_for_treatment(sim, host);
    }
    if sim
        .rng
        .probability_met(sim.parameters.probability_infected_host_dies)
    {
        trace!("host {host} dies of infection at {now}");
        if let Some(agent) = sim.world.population.get_mut(host) {
            agent.core.time_of_death = now;
        }
    }
}

pub(crate) fn handle_move(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    move_host(sim, host);
    let delay = sim.rng.exponential(sim.parameters.mean_time_between_host_moves);
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_move = now + delay;
    }
    check_infection_status(sim, host);

    let needs_care = sim.world.is_infected(host)
        && sim.world.host(host).is_some_and(|state| {
            !state.treated
                && state
                    .shelter
                    .is_some_and(|shelter| sim.world.grid.get(shelter).facilities.medical_care)
        });
    if needs_care {
        if let Some(state) = sim.world.host_mut(host) {
            state.time_antibiotic_applied = now;
        }
    }
    sim.world.refresh(host);
}

/// Moves a random share of the hatched lice on `from` to the clothes `to` is wearing. Lice
/// leaving an infected host may pick up the infection on the way.
fn transfer_lice(sim: &mut Simulation, from: AgentId, to: AgentId) {
    let now = sim.current_time;
    let fraction = sim.rng.uniform_between(
        sim.parameters.transfer_fraction_min,
        sim.parameters.transfer_fraction_max,
    );
    let candidates = sim.world.active_lice(from, now);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let count = (candidates.len() as f64 * fraction) as usize;
    let moving = sim.rng.choose_multiple(&candidates, count);
    let from_infected = sim.world.is_infected(from);
    let Some(clothes_set) = sim.world.host(to).map(|state| state.clothes_set) else {
        return;
    };
    for louse in moving {
        if from_infected
            && !sim.world.is_infected(louse)
            && sim
                .rng
                .probability_met(sim.parameters.probability_infected_by_feeding)
        {
            sim.infect_vector(louse);
        }
        sim.world.attach_vector(louse, to, clothes_set);
    }
    trace!("transferred {count} lice from host {from} to host {to}");
}

pub(crate) fn handle_interact(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let shelter = sim.world.host(host).and_then(|state| state.shelter);
    if let Some(shelter) = shelter {
        let others: Vec<AgentId> = sim
            .world
            .grid
            .get(shelter)
            .occupants()
            .iter()
            .copied()
            .filter(|&other| other != host)
            .collect();
        if !others.is_empty()
            && sim
                .rng
                .probability_met(sim.parameters.probability_louse_transfer)
        {
            if let Some(other) = sim.rng.choose(&others) {
                transfer_lice(sim, host, other);
                sim.check_infestation_cap(host);
                sim.check_infestation_cap(other);
            }
        }
    }
    check_infection_status(sim, host);
    let delay = sim
        .rng
        .exponential(sim.parameters.mean_time_between_interactions);
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_interaction = now + delay;
    }
    sim.world.refresh(host);
}

pub(crate) fn handle_antibiotic_apply(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let infected = sim.world.is_infected(host);
    let length = sim.rng.uniform_between(
        sim.parameters.treatment_length_min,
        sim.parameters.treatment_length_max,
    );
    if let Some(state) = sim.world.host_mut(host) {
        state.time_antibiotic_applied = f64::INFINITY;
        if infected && !state.treated {
            state.treated = true;
            state.time_antibiotic_clears = now + length;
            trace!("host {host} treated until {}", now + length);
        }
    }
    sim.world.refresh(host);
}

/// Treatment clears the infection.
pub(crate) fn handle_antibiotic_clear(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    sim.world.set_host_infected(host, false, now);
    if let Some(state) = sim.world.host_mut(host) {
        state.treated = false;
        state.time_antibiotic_clears = f64::INFINITY;
        state.time_antibiotic_applied = f64::INFINITY;
    }
    sim.world.refresh(host);
}

/// Grooming removes hatched lice from the clothes being worn.
pub(crate) fn handle_shower(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let showers = sim
        .world
        .host(host)
        .and_then(|state| state.shelter)
        .is_some_and(|shelter| sim.world.grid.get(shelter).facilities.showers);

    let next = if showers {
        let worn = sim.world.host(host).map_or(0, |state| state.clothes_set);
        for louse in sim.world.active_lice(host, now) {
            let on_worn_set = sim
                .world
                .vector(louse)
                .is_some_and(|vector| vector.clothes_set == worn);
            if on_worn_set
                && sim
                    .rng
                    .probability_met(sim.parameters.probability_removed_by_grooming)
            {
                sim.world.condemn_vector(louse, now);
            }
        }
        now + HYGIENE_INTERVAL
    } else {
        now + RETRY_DELAY
    };
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_shower = next;
    }
    sim.world.refresh(host);
}

/// Switches to the next clothing set. Lice and eggs that were stored off the body longer than
/// they survive without a host die when the set is put back on.
fn change_clothes(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let Some(state) = sim.world.host(host) else {
        return;
    };
    if state.spare_clothes == 0 {
        return;
    }
    let stored_since = state.time_last_clothes_change;
    let next_set = state.next_clothes_set();
    if let Some(state) = sim.world.host_mut(host) {
        state.clothes_set = next_set;
        state.time_last_clothes_change = now;
    }

    let stored_for = now - stored_since;
    for vector in sim.world.vectors_of(host) {
        let Some(state) = sim.world.vector(vector) else {
            continue;
        };
        if state.clothes_set != next_set {
            continue;
        }
        let survival = if state.is_egg() {
            sim.rng.uniform_between(
                sim.parameters.nit_off_host_survival_min,
                sim.parameters.nit_off_host_survival_max,
            )
        } else {
            sim.rng.uniform_between(
                sim.parameters.louse_off_host_survival_min,
                sim.parameters.louse_off_host_survival_max,
            )
        };
        if stored_for > survival {
            sim.world.condemn_vector(vector, now);
        }
    }
}

pub(crate) fn handle_clothes_change(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let has_spares = sim
        .world
        .host(host)
        .is_some_and(|state| state.spare_clothes > 0);
    if has_spares {
        change_clothes(sim, host);
    }
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_clothes_change = if has_spares {
            now + HYGIENE_INTERVAL
        } else {
            f64::INFINITY
        };
    }
    sim.world.refresh(host);
}

/// Laundering kills every vector in the laundered set: the set just taken off when the host
/// has spares, otherwise the set being worn.
pub(crate) fn handle_laundry(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    let laundry = sim
        .world
        .host(host)
        .and_then(|state| state.shelter)
        .is_some_and(|shelter| sim.world.grid.get(shelter).facilities.laundry);

    let next = if laundry {
        let Some(state) = sim.world.host(host) else {
            return;
        };
        let laundered = state.clothes_set;
        let has_spares = state.spare_clothes > 0;
        if has_spares {
            change_clothes(sim, host);
            if let Some(state) = sim.world.host_mut(host) {
                state.time_next_clothes_change = now + HYGIENE_INTERVAL;
            }
        }
        for vector in sim.world.vectors_of(host) {
            if sim
                .world
                .vector(vector)
                .is_some_and(|state| state.clothes_set == laundered)
            {
                sim.world.condemn_vector(vector, now);
            }
        }
        now + HYGIENE_INTERVAL
    } else {
        now + RETRY_DELAY
    };
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_laundry = next;
    }
    sim.world.refresh(host);
}

/// Chance that at least one of `infected_lice` independent daily hazards `p` fires.
fn infection_probability(p: f64, infected_lice: usize) -> f64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let escape = (1.0 - p).powi(infected_lice as i32);
    1.0 - escape
}

/// Daily infection check. Each infected, hatched louse contributes an independent daily
/// chance of passing on the infection.
pub(crate) fn handle_infection_check(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    if !sim.world.is_infected(host) {
        let infected_lice = sim
            .world
            .active_lice(host, now)
            .into_iter()
            .filter(|&louse| sim.world.is_infected(louse))
            .count();
        if infected_lice > 0 {
            let p = infection_probability(
                sim.parameters.probability_infested_is_infected,
                infected_lice,
            );
            if sim.rng.probability_met(p) {
                sim.world.set_host_infected(host, true, now);
                trace!("host {host} infected by {infected_lice} lice at {now}");
                if !sim.parameters.continuous_antibiotic_monitoring {
                    check_for_treatment(sim, host);
                }
            }
        }
    }
    if let Some(state) = sim.world.host_mut(host) {
        state.time_next_infection_check = now + 1.0;
    }
    sim.world.refresh(host);
}

pub(crate) fn handle_death(sim: &mut Simulation, host: AgentId) {
    let now = sim.current_time;
    trace!("host {host} died at {now}");
    sim.world.remove_host(host, now);
}
