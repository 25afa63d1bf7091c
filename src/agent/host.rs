use crate::agent::{Agent, AgentCore, AgentId, AgentKind};
use crate::event::EventType;
use crate::parameters::Parameters;
use crate::random::RandomVariates;
use crate::shelter::ShelterId;

/// Days between routine showers, laundry and clothes changes.
pub const HYGIENE_INTERVAL: f64 = 7.0;

#[derive(Debug, Clone)]
pub struct HostState {
    pub row: usize,
    pub col: usize,
    pub shelter: Option<ShelterId>,
    /// Resident vectors, all stages, in attachment order.
    pub vectors: Vec<AgentId>,
    pub infested: bool,
    pub treated: bool,
    /// Start of the current infection. Negative for hosts infected before the run began.
    pub time_infected: f64,

    pub time_next_move: f64,
    pub time_next_interaction: f64,
    pub time_antibiotic_applied: f64,
    pub time_antibiotic_clears: f64,
    pub time_next_shower: f64,
    pub time_next_laundry: f64,
    pub time_next_clothes_change: f64,
    pub time_next_infection_check: f64,
    pub time_last_clothes_change: f64,

    /// Index of the set being worn, in `0..=spare_clothes`.
    pub clothes_set: usize,
    pub spare_clothes: usize,
}

impl HostState {
    pub(super) fn event_time_mut(&mut self, event_type: EventType) -> Option<&mut f64> {
        match event_type {
            EventType::HostMove => Some(&mut self.time_next_move),
            EventType::HostInteract => Some(&mut self.time_next_interaction),
            EventType::HostAntibioticApply => Some(&mut self.time_antibiotic_applied),
            EventType::HostAntibioticClear => Some(&mut self.time_antibiotic_clears),
            EventType::HostShower => Some(&mut self.time_next_shower),
            EventType::HostLaundry => Some(&mut self.time_next_laundry),
            EventType::HostClothesChange => Some(&mut self.time_next_clothes_change),
            EventType::HostInfectionCheck => Some(&mut self.time_next_infection_check),
            _ => None,
        }
    }

    pub(super) fn clear_schedule(&mut self) {
        self.time_next_move = f64::INFINITY;
        self.time_next_interaction = f64::INFINITY;
        self.time_antibiotic_applied = f64::INFINITY;
        self.time_antibiotic_clears = f64::INFINITY;
        self.time_next_shower = f64::INFINITY;
        self.time_next_laundry = f64::INFINITY;
        self.time_next_clothes_change = f64::INFINITY;
        self.time_next_infection_check = f64::INFINITY;
    }

    /// Number of clothing sets the host owns, the worn one included.
    #[must_use]
    pub fn clothing_sets(&self) -> usize {
        self.spare_clothes + 1
    }

    /// The set that comes off at the next change.
    #[must_use]
    pub fn next_clothes_set(&self) -> usize {
        (self.clothes_set + 1) % self.clothing_sets()
    }
}

/// Builds a host with its initial schedule. Hygiene events are staggered over the first week
/// so the population does not shower, launder and change in lockstep.
pub fn new_host(
    label: String,
    infected: bool,
    parameters: &Parameters,
    rng: &mut RandomVariates,
    now: f64,
) -> Agent {
    let core = AgentCore::new(label, infected, now);
    let time_infected = if infected {
        now - rng.uniform_between(
            parameters.days_since_infected_min,
            parameters.days_since_infected_max,
        )
    } else {
        f64::INFINITY
    };

    let spare_clothes = usize::from(rng.probability_met(parameters.percent_hosts_with_clothes_change));
    let time_last_clothes_change = now - rng.uniform_between(0.0, HYGIENE_INTERVAL).round();
    let time_next_clothes_change = if spare_clothes > 0 {
        time_last_clothes_change + HYGIENE_INTERVAL
    } else {
        f64::INFINITY
    };

    let host = HostState {
        row: 0,
        col: 0,
        shelter: None,
        vectors: Vec::new(),
        infested: false,
        treated: false,
        time_infected,
        time_next_move: now + rng.exponential(parameters.mean_time_between_host_moves),
        time_next_interaction: now + rng.exponential(parameters.mean_time_between_interactions),
        time_antibiotic_applied: f64::INFINITY,
        time_antibiotic_clears: f64::INFINITY,
        time_next_shower: now + rng.uniform_between(0.0, HYGIENE_INTERVAL).round(),
        time_next_laundry: now + rng.uniform_between(0.0, HYGIENE_INTERVAL).round(),
        time_next_clothes_change,
        time_next_infection_check: now + 1.0,
        time_last_clothes_change,
        clothes_set: 0,
        spare_clothes,
    };
    let mut agent = Agent {
        core,
        kind: AgentKind::Host(host),
    };
    agent.refresh_next_event();
    agent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_schedule() {
        let parameters = Parameters::default();
        let mut rng = RandomVariates::new(8_675_309);
        for i in 0..50 {
            let agent = new_host(format!("H{i}"), i % 2 == 0, &parameters, &mut rng, 0.0);
            let host = agent.as_host().unwrap();
            assert!(host.time_next_move > 0.0);
            assert!(host.time_next_interaction > 0.0);
            assert!((0.0..=7.0).contains(&host.time_next_shower));
            assert!((0.0..=7.0).contains(&host.time_next_laundry));
            assert_eq!(host.time_next_shower.fract(), 0.0);
            assert!(host.time_antibiotic_applied.is_infinite());
            assert!((host.time_next_infection_check - 1.0).abs() < f64::EPSILON);
            // No spare clothes by default, so no clothes change ever.
            assert_eq!(host.spare_clothes, 0);
            assert!(host.time_next_clothes_change.is_infinite());
            if agent.core.infected {
                assert!((-20.0..=0.0).contains(&host.time_infected));
                assert!(agent.core.time_of_infection.abs() < f64::EPSILON);
            } else {
                assert!(agent.core.time_of_infection.is_infinite());
            }
            assert!(!agent.is_stale());
        }
    }

    #[test]
    fn spare_clothes_schedule_a_change_within_a_week() {
        let parameters = Parameters {
            percent_hosts_with_clothes_change: 1.0,
            ..Parameters::default()
        };
        let mut rng = RandomVariates::new(5);
        let agent = new_host("H1".to_string(), false, &parameters, &mut rng, 0.0);
        let host = agent.as_host().unwrap();
        assert_eq!(host.clothing_sets(), 2);
        assert_eq!(host.next_clothes_set(), 1);
        assert!((0.0..=7.0).contains(&host.time_next_clothes_change));
        assert!(
            (host.time_next_clothes_change - host.time_last_clothes_change - 7.0).abs()
                < f64::EPSILON
        );
    }
}
