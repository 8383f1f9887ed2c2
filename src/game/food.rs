use rand::rngs::StdRng;
use rand::Rng;

use crate::config::{FOOD_RADIUS, FOOD_VALUE, NUM_FOOD_COLORS};

#[derive(Debug, Clone, Copy)]
pub struct Food {
    pub x: f64,
    pub y: f64,
    pub color_idx: usize,
    pub radius: f64,
    pub value: f64,
}

impl Food {
    /// Standard pellet at a given position (world spawning, boost shedding).
    pub fn pellet(x: f64, y: f64, rng: &mut StdRng) -> Self {
        Food {
            x,
            y,
            color_idx: rng.gen_range(0..NUM_FOOD_COLORS),
            radius: FOOD_RADIUS,
            value: FOOD_VALUE,
        }
    }

    /// Richer pellet scattered along a corpse: radius 7-11, value 2-5.
    pub fn corpse_pellet(x: f64, y: f64, rng: &mut StdRng) -> Self {
        Food {
            x,
            y,
            color_idx: rng.gen_range(0..NUM_FOOD_COLORS),
            radius: 7.0 + rng.gen::<f64>() * 4.0,
            value: 2.0 + rng.gen::<f64>() * 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pellet_uses_standard_radius_and_value() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = Food::pellet(10.0, 20.0, &mut rng);
        assert_eq!(f.radius, FOOD_RADIUS);
        assert_eq!(f.value, FOOD_VALUE);
        assert!(f.color_idx < NUM_FOOD_COLORS);
    }

    #[test]
    fn corpse_pellet_ranges() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let f = Food::corpse_pellet(0.0, 0.0, &mut rng);
            assert!((7.0..11.0).contains(&f.radius));
            assert!((2.0..5.0).contains(&f.value));
        }
    }
}
