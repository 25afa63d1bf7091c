use crate::agent::{Agent, AgentCore, AgentId, AgentKind};
use crate::event::EventType;
use crate::parameters::Parameters;
use crate::random::RandomVariates;
use crate::shelter::ShelterId;

/// Mean days between successive clutches of a mature female.
pub const MEAN_OVIPOSITION_INTERVAL: f64 = 1.0;

/// Stage transitions only go forward: egg, larva, adult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifeStage {
    Egg,
    Larva,
    Adult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

/// How a vector enters the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOrigin {
    /// Laid by a female. Hatches after the nit gestation period.
    Egg,
    /// Seeded at start with a random age; already hatched.
    Initial,
}

#[derive(Debug, Clone)]
pub struct VectorState {
    pub stage: LifeStage,
    pub gender: Gender,
    pub birth_time: f64,
    pub lifespan: f64,
    pub time_hatching: f64,
    pub time_maturing: f64,
    pub time_next_oviposition: f64,
    pub time_next_move: f64,
    pub host: Option<AgentId>,
    pub clothes_set: usize,
    /// Where an unhosted vector lies waiting for a host.
    pub shelter: Option<ShelterId>,
}

impl VectorState {
    pub(super) fn event_time_mut(&mut self, event_type: EventType) -> Option<&mut f64> {
        match event_type {
            EventType::VectorHatch => Some(&mut self.time_hatching),
            EventType::VectorMature => Some(&mut self.time_maturing),
            EventType::VectorOviposition => Some(&mut self.time_next_oviposition),
            EventType::VectorMove => Some(&mut self.time_next_move),
            _ => None,
        }
    }

    pub(super) fn clear_schedule(&mut self) {
        self.time_hatching = f64::INFINITY;
        self.time_maturing = f64::INFINITY;
        self.time_next_oviposition = f64::INFINITY;
        self.time_next_move = f64::INFINITY;
    }

    #[must_use]
    pub fn is_egg(&self) -> bool {
        self.stage == LifeStage::Egg
    }

    #[must_use]
    pub fn is_female(&self) -> bool {
        self.gender == Gender::Female
    }
}

/// Overrides applied to a freshly built vector. Used by controlled drivers to pin the stage
/// or gender that would otherwise be drawn at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorOverrides {
    pub stage: Option<LifeStage>,
    pub gender: Option<Gender>,
}

/// Builds a vector. Lifespan and time to adulthood are drawn from non-negative normals.
/// Initial vectors get a uniform age within their lifespan and start as adults or larvae
/// depending on whether that age has passed maturity.
pub fn new_vector(
    label: String,
    infected: bool,
    origin: VectorOrigin,
    host: Option<AgentId>,
    parameters: &Parameters,
    rng: &mut RandomVariates,
    now: f64,
) -> Agent {
    let mut core = AgentCore::new(label, infected, now);
    let gender = if rng.probability_met(parameters.percent_females) {
        Gender::Female
    } else {
        Gender::Male
    };
    let lifespan = rng.non_negative_normal(
        parameters.louse_longevity_mean,
        parameters.louse_longevity_std_dev,
    );
    let maturity =
        rng.non_negative_normal(parameters.mean_time_to_adult, parameters.std_dev_time_to_adult);

    let mut vector = VectorState {
        stage: LifeStage::Egg,
        gender,
        birth_time: now,
        lifespan,
        time_hatching: f64::INFINITY,
        time_maturing: f64::INFINITY,
        time_next_oviposition: f64::INFINITY,
        time_next_move: f64::INFINITY,
        host,
        clothes_set: 0,
        shelter: None,
    };

    match origin {
        VectorOrigin::Egg => {
            let hatch =
                now + rng.uniform_between(parameters.nit_gestation_min, parameters.nit_gestation_max);
            vector.time_hatching = hatch;
            vector.time_maturing = hatch + maturity;
            vector.time_next_move = hatch;
            core.time_of_death = hatch + lifespan;
            if vector.is_female() {
                vector.time_next_oviposition = vector.time_maturing
                    + 1.0
                    + rng.exponential(MEAN_OVIPOSITION_INTERVAL);
            }
        }
        VectorOrigin::Initial => {
            let age = rng.uniform_between(0.0, lifespan);
            vector.birth_time = now - age;
            core.time_of_death = now + lifespan - age;
            if age > maturity {
                vector.stage = LifeStage::Adult;
                if vector.is_female() {
                    vector.time_next_oviposition =
                        now + rng.exponential(MEAN_OVIPOSITION_INTERVAL);
                }
            } else {
                vector.stage = LifeStage::Larva;
                vector.time_maturing = now + maturity - age;
            }
            vector.time_next_move = now + rng.exponential(parameters.mean_time_between_vector_moves);
        }
    }

    let mut agent = Agent {
        core,
        kind: AgentKind::Vector(vector),
    };
    agent.refresh_next_event();
    agent
}

/// Applies [`VectorOverrides`] to a vector built by [`new_vector`], keeping its schedule
/// consistent with the new stage and gender.
pub fn apply_overrides(agent: &mut Agent, overrides: VectorOverrides, now: f64) {
    let Some(vector) = agent.as_vector_mut() else {
        return;
    };
    if let Some(gender) = overrides.gender {
        vector.gender = gender;
        if gender == Gender::Male {
            vector.time_next_oviposition = f64::INFINITY;
        }
    }
    if let Some(stage) = overrides.stage {
        vector.stage = stage;
        match stage {
            LifeStage::Egg => {}
            LifeStage::Larva => {
                vector.time_hatching = f64::INFINITY;
                vector.time_next_oviposition = f64::INFINITY;
            }
            LifeStage::Adult => {
                vector.time_hatching = f64::INFINITY;
                vector.time_maturing = f64::INFINITY;
                if vector.is_female() && vector.time_next_oviposition.is_infinite() {
                    vector.time_next_oviposition = now + MEAN_OVIPOSITION_INTERVAL;
                }
            }
        }
        if stage != LifeStage::Egg && vector.time_next_move.is_infinite() {
            vector.time_next_move = now;
        }
    }
    agent.refresh_next_event();
}
