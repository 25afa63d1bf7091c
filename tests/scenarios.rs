use assert_approx_eq::assert_approx_eq;
use vectorborne::agent::vector::VectorOverrides;
use vectorborne::shelter::{Facilities, Shelter};
use vectorborne::shelter_grid::ShelterGrid;
use vectorborne::{
    AgentId, EventType, Gender, InvariantMode, LifeStage, Parameters, Simulation, VectorSpec,
};

fn one_shelter(parameters: Parameters, capacity: usize) -> Simulation {
    let grid = ShelterGrid::from_shelters(vec![Shelter::new(
        0,
        0,
        false,
        Facilities::default(),
        capacity,
    )])
    .unwrap();
    Simulation::with_grid(
        Parameters {
            invariant_mode: InvariantMode::Fatal,
            ..parameters
        },
        grid,
    )
    .unwrap()
}

fn sheltered_host(sim: &mut Simulation, infected: bool) -> AgentId {
    let host = sim.spawn_host(infected).unwrap();
    assert!(sim.place_host(host, 0, 0));
    host
}

fn adult(sim: &mut Simulation, host: AgentId, gender: Gender) -> AgentId {
    sim.spawn_vector(VectorSpec {
        host: Some(host),
        overrides: VectorOverrides {
            stage: Some(LifeStage::Adult),
            gender: Some(gender),
        },
        ..VectorSpec::default()
    })
    .unwrap()
}

fn vectors_on(sim: &Simulation, host: AgentId) -> usize {
    sim.agent(host).unwrap().as_host().unwrap().vectors.len()
}

fn infected_vectors_on(sim: &Simulation, host: AgentId) -> usize {
    sim.agent(host)
        .unwrap()
        .as_host()
        .unwrap()
        .vectors
        .iter()
        .filter(|&&id| sim.agent(id).unwrap().core.infected)
        .count()
}

#[test]
fn single_interaction_moves_half_the_lice() {
    let mut sim = one_shelter(
        Parameters {
            probability_louse_transfer: 1.0,
            transfer_fraction_min: 0.5,
            transfer_fraction_max: 0.5,
            probability_infected_by_feeding: 1.0,
            probability_feeding: 0.0,
            probability_infected_host_dies: 0.0,
            ..Parameters::default()
        },
        5,
    );
    let source = sheltered_host(&mut sim, true);
    let target = sheltered_host(&mut sim, false);
    for _ in 0..10 {
        adult(&mut sim, source, Gender::Male);
    }
    sim.clear_all_schedules();
    assert_eq!(sim.counts().infested, 1);

    assert!(sim.schedule(source, EventType::HostInteract, 1.0));
    let record = sim.step().unwrap();
    assert_eq!(record.event_type, EventType::HostInteract);
    assert_eq!(record.agent, "H0");

    assert_eq!(vectors_on(&sim, source), 5);
    assert_eq!(vectors_on(&sim, target), 5);
    assert_eq!(sim.counts().infested, 2);
    assert_eq!(sim.shelter_at(0, 0).unwrap().infested_count(), 2);
    // Lice leaving the infected host pick up the infection; those left behind did not feed.
    assert_eq!(infected_vectors_on(&sim, target), 5);
    assert_eq!(infected_vectors_on(&sim, source), 0);
    assert_eq!(sim.counts().infected, 1);
    assert!(sim.check_invariants().is_ok());
}

#[test]
fn antibiotic_cycle_clears_infection() {
    let mut sim = one_shelter(
        Parameters {
            treatment_length_min: 14.0,
            treatment_length_max: 14.0,
            ..Parameters::default()
        },
        5,
    );
    let host = sheltered_host(&mut sim, true);
    sim.clear_all_schedules();
    assert_eq!(sim.counts().infected, 1);

    assert!(sim.schedule(host, EventType::HostAntibioticApply, 5.0));
    let apply = sim.step().unwrap();
    assert_eq!(apply.event_type, EventType::HostAntibioticApply);
    assert_eq!(sim.counts().treated, 1);

    let clear = sim.step().unwrap();
    assert_eq!(clear.event_type, EventType::HostAntibioticClear);
    assert_approx_eq!(clear.time, 19.0);
    let counts = sim.counts();
    assert_eq!(counts.infected, 0);
    assert_eq!(counts.treated, 0);
    assert_eq!(sim.shelter_at(0, 0).unwrap().infected_count(), 0);
    assert!(sim.step().is_none());
}

#[test]
fn oviposition_respects_infestation_cap() {
    let mut sim = one_shelter(
        Parameters {
            infestation_cap: 30,
            eggs_per_day_min: 5.0,
            eggs_per_day_max: 5.0,
            probability_feeding: 0.0,
            ..Parameters::default()
        },
        5,
    );
    let host = sheltered_host(&mut sim, false);
    let mother = adult(&mut sim, host, Gender::Female);
    for _ in 0..29 {
        adult(&mut sim, host, Gender::Male);
    }
    sim.clear_all_schedules();
    assert_eq!(vectors_on(&sim, host), 30);

    assert!(sim.schedule(mother, EventType::VectorOviposition, 1.0));
    let record = sim.step().unwrap();
    assert_eq!(record.event_type, EventType::VectorOviposition);
    assert_eq!(vectors_on(&sim, host), 35);

    for _ in 0..5 {
        let record = sim.step().unwrap();
        assert_eq!(record.event_type, EventType::VectorDeath);
        assert_approx_eq!(record.time, 1.0);
    }
    assert_eq!(vectors_on(&sim, host), 30);
    assert_eq!(sim.population().live_vectors(), 30);
    let eggs = sim
        .population()
        .iter()
        .filter(|(_, agent)| agent.as_vector().is_some_and(|v| v.is_egg()))
        .count();
    assert_eq!(eggs, 5);
    assert!(sim.check_invariants().is_ok());
}

#[test]
fn unhosted_louse_starves() {
    let mut sim = one_shelter(
        Parameters {
            probability_louse_rehosts: 0.0,
            probability_unhosted_starves: 1.0,
            ..Parameters::default()
        },
        5,
    );
    sheltered_host(&mut sim, false);
    let louse = sim
        .spawn_vector(VectorSpec {
            shelter: Some((0, 0)),
            overrides: VectorOverrides {
                stage: Some(LifeStage::Adult),
                gender: Some(Gender::Male),
            },
            ..VectorSpec::default()
        })
        .unwrap();
    sim.clear_all_schedules();

    assert!(sim.schedule(louse, EventType::VectorMove, 2.0));
    assert_eq!(sim.step().unwrap().event_type, EventType::VectorMove);
    let death = sim.step().unwrap();
    assert_eq!(death.event_type, EventType::VectorDeath);
    assert_approx_eq!(death.time, 2.0);
    assert!(sim.agent(louse).is_none());
    assert_eq!(sim.population().live_vectors(), 0);
}

#[test]
fn unhosted_louse_rehosts() {
    let mut sim = one_shelter(
        Parameters {
            probability_louse_rehosts: 1.0,
            ..Parameters::default()
        },
        5,
    );
    let host = sheltered_host(&mut sim, false);
    let louse = sim
        .spawn_vector(VectorSpec {
            shelter: Some((0, 0)),
            ..VectorSpec::default()
        })
        .unwrap();
    sim.clear_all_schedules();
    assert_eq!(sim.counts().infested, 0);

    assert!(sim.schedule(louse, EventType::VectorMove, 1.0));
    sim.step().unwrap();
    assert_eq!(sim.agent(louse).unwrap().as_vector().unwrap().host, Some(host));
    assert_eq!(sim.counts().infested, 1);
}

#[test]
fn laundry_kills_the_worn_set() {
    let grid = ShelterGrid::from_shelters(vec![Shelter::new(
        0,
        0,
        true,
        Facilities {
            laundry: true,
            ..Facilities::default()
        },
        5,
    )])
    .unwrap();
    let mut sim = Simulation::with_grid(Parameters::default(), grid).unwrap();
    let host = sheltered_host(&mut sim, false);
    for _ in 0..4 {
        adult(&mut sim, host, Gender::Male);
    }
    sim.clear_all_schedules();

    assert!(sim.schedule(host, EventType::HostLaundry, 3.0));
    sim.step().unwrap();
    for _ in 0..4 {
        assert_eq!(sim.step().unwrap().event_type, EventType::VectorDeath);
    }
    assert_eq!(sim.counts().infested, 0);
    let next = sim.agent(host).unwrap().as_host().unwrap().time_next_laundry;
    assert_approx_eq!(next, 10.0);
}

#[test]
fn death_drops_lice_in_the_shelter() {
    let mut sim = one_shelter(Parameters::default(), 5);
    let host = sheltered_host(&mut sim, true);
    let louse = adult(&mut sim, host, Gender::Male);
    sim.clear_all_schedules();

    assert!(sim.schedule(host, EventType::HostDeath, 4.0));
    assert_eq!(sim.step().unwrap().event_type, EventType::HostDeath);
    assert!(sim.agent(host).is_none());
    assert_eq!(sim.occupants(0, 0).len(), 0);
    assert_eq!(sim.counts().infected, 0);
    let lying = sim.agent(louse).unwrap().as_vector().unwrap();
    assert!(lying.host.is_none());
    assert_eq!(lying.shelter, Some(sim.grid().id_at(0, 0)));
}
