use log::debug;

use crate::parameters::Parameters;
use crate::random::RandomVariates;
use crate::shelter::{Facilities, Shelter, ShelterId};

/// A square, torus-wrapped grid of shelters. The shape and facilities are drawn once; only
/// occupancy changes afterwards.
#[derive(Debug, Clone)]
pub struct ShelterGrid {
    size: usize,
    shelters: Vec<Shelter>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn rounded_capacity(rng: &mut RandomVariates, min: usize, max: usize) -> usize {
    rng.uniform_between(min as f64, max as f64).round() as usize
}

impl ShelterGrid {
    /// Generates a grid. Each cell is formal with `percent_formal_shelters`; only formal
    /// shelters can offer facilities.
    #[must_use]
    pub fn generate(parameters: &Parameters, rng: &mut RandomVariates) -> Self {
        let size = parameters.grid_size;
        let mut shelters = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let formal = rng.probability_met(parameters.percent_formal_shelters);
                let (facilities, capacity) = if formal {
                    let facilities = Facilities {
                        showers: rng.probability_met(parameters.percent_showers),
                        laundry: rng.probability_met(parameters.percent_laundry),
                        medical_care: rng.probability_met(parameters.percent_medical),
                        intake_delousing: rng.probability_met(parameters.percent_intake_delousing),
                    };
                    let capacity = rounded_capacity(
                        rng,
                        parameters.formal_capacity_min,
                        parameters.formal_capacity_max,
                    );
                    (facilities, capacity)
                } else {
                    let capacity = rounded_capacity(
                        rng,
                        parameters.informal_capacity_min,
                        parameters.informal_capacity_max,
                    );
                    (Facilities::default(), capacity)
                };
                shelters.push(Shelter::new(row, col, formal, facilities, capacity));
            }
        }
        let grid = ShelterGrid { size, shelters };
        debug!(
            "generated {size}x{size} shelter grid with total capacity {}",
            grid.total_capacity()
        );
        grid
    }

    /// Builds a grid from explicit shelters, laid out row by row. `shelters.len()` must be a
    /// perfect square.
    ///
    /// # Errors
    /// Returns a message if the shelters do not form a square.
    pub fn from_shelters(mut shelters: Vec<Shelter>) -> Result<Self, String> {
        let size = shelters.len().isqrt();
        if size == 0 || size * size != shelters.len() {
            return Err(format!(
                "{} shelters do not form a square grid",
                shelters.len()
            ));
        }
        for (index, shelter) in shelters.iter_mut().enumerate() {
            shelter.row = index / size;
            shelter.col = index % size;
        }
        Ok(ShelterGrid { size, shelters })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn id_at(&self, row: usize, col: usize) -> ShelterId {
        ShelterId(row * self.size + col)
    }

    #[must_use]
    pub fn get(&self, id: ShelterId) -> &Shelter {
        &self.shelters[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ShelterId) -> &mut Shelter {
        &mut self.shelters[id.0]
    }

    /// The shelter at `(row, col)`, or `None` outside the grid.
    #[must_use]
    pub fn shelter_at(&self, row: usize, col: usize) -> Option<&Shelter> {
        if row < self.size && col < self.size {
            Some(&self.shelters[row * self.size + col])
        } else {
            None
        }
    }

    /// Wraps a signed offset from `(row, col)` onto the torus.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn wrap(&self, row: usize, col: usize, d_row: isize, d_col: isize) -> (usize, usize) {
        let n = self.size as isize;
        let r = (row as isize + d_row).rem_euclid(n);
        let c = (col as isize + d_col).rem_euclid(n);
        (r as usize, c as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShelterId, &Shelter)> {
        self.shelters
            .iter()
            .enumerate()
            .map(|(index, shelter)| (ShelterId(index), shelter))
    }

    #[must_use]
    pub fn total_capacity(&self) -> usize {
        self.shelters.iter().map(Shelter::capacity).sum()
    }

    #[must_use]
    pub fn total_occupancy(&self) -> usize {
        self.shelters.iter().map(Shelter::occupancy).sum()
    }

    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.shelters.iter().map(Shelter::infected_count).sum()
    }

    #[must_use]
    pub fn infested_count(&self) -> usize {
        self.shelters.iter().map(Shelter::infested_count).sum()
    }

    /// Empties every shelter.
    pub(crate) fn reset(&mut self) {
        for shelter in &mut self.shelters {
            shelter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_capacities_in_range() {
        let parameters = Parameters {
            percent_formal_shelters: 0.5,
            percent_showers: 1.0,
            ..Parameters::default()
        };
        let mut rng = RandomVariates::new(99);
        let grid = ShelterGrid::generate(&parameters, &mut rng);
        assert_eq!(grid.size(), 8);
        assert_eq!(grid.iter().count(), 64);
        for (id, shelter) in grid.iter() {
            assert_eq!(grid.id_at(shelter.row, shelter.col), id);
            if shelter.formal {
                assert!((5..=20).contains(&shelter.capacity()));
                assert!(shelter.facilities.showers);
            } else {
                assert!((1..=10).contains(&shelter.capacity()));
                assert_eq!(shelter.facilities, Facilities::default());
            }
        }
    }

    #[test]
    fn same_seed_same_grid() {
        let parameters = Parameters::default();
        let a = ShelterGrid::generate(&parameters, &mut RandomVariates::new(4));
        let b = ShelterGrid::generate(&parameters, &mut RandomVariates::new(4));
        let caps_a: Vec<usize> = a.iter().map(|(_, s)| s.capacity()).collect();
        let caps_b: Vec<usize> = b.iter().map(|(_, s)| s.capacity()).collect();
        assert_eq!(caps_a, caps_b);
    }

    #[test]
    fn wrap_is_toroidal() {
        let parameters = Parameters {
            grid_size: 4,
            ..Parameters::default()
        };
        let grid = ShelterGrid::generate(&parameters, &mut RandomVariates::new(1));
        assert_eq!(grid.wrap(0, 0, -1, -1), (3, 3));
        assert_eq!(grid.wrap(3, 2, 1, 3), (0, 1));
        assert_eq!(grid.wrap(1, 1, -9, 0), (0, 1));
        assert!(grid.shelter_at(4, 0).is_none());
    }

    #[test]
    fn from_shelters_requires_square() {
        let shelter = Shelter::new(0, 0, true, Facilities::default(), 3);
        assert!(ShelterGrid::from_shelters(vec![shelter.clone(); 3]).is_err());
        let grid = ShelterGrid::from_shelters(vec![shelter; 4]).unwrap();
        assert_eq!(grid.size(), 2);
        assert_eq!(grid.shelter_at(1, 0).unwrap().row, 1);
        assert_eq!(grid.total_capacity(), 12);
    }
}
