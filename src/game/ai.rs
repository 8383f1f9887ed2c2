use std::f64::consts::TAU;

use rand::Rng;

use crate::game::physics::dist;
use crate::game::world::World;

/// Name pool for AI snakes. Reused round-robin; collisions get an
/// index suffix.
pub const AI_NAMES: [&str; 25] = [
    "Viper",
    "Cobra",
    "Mamba",
    "Python",
    "Anaconda",
    "Rattler",
    "Boa",
    "Adder",
    "Asp",
    "Krait",
    "Taipan",
    "Coral",
    "Sidewinder",
    "Copperhead",
    "King",
    "Noodle",
    "Slinky",
    "Wiggles",
    "Scales",
    "Slithers",
    "Fangs",
    "Hissy",
    "Sssnake",
    "Danger",
    "Nope Rope",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Wander,
    Food,
    Hunt,
    Flee,
}

const WALL_PANIC_DIST: f64 = 300.0;
const FOOD_SCAN_DIST: f64 = 400.0;
const HUNT_SCAN_DIST: f64 = 500.0;
const AVOID_SEG_LIMIT: usize = 40;

/// Drive one AI snake for one frame. Steering happens by rewriting
/// `target_angle`/`is_boosting`; kinematics are applied later by the
/// physics step like any other snake.
pub fn update(world: &mut World, idx: usize) {
    let ws = world.cfg.world_size_f();
    let frame = world.frame;

    let World {
        snakes, foods, rng, ..
    } = world;

    // Timer, wall panic, and state transitions mutate the snake up front.
    {
        let s = &mut snakes[idx];
        if !s.alive || !s.is_ai {
            return;
        }
        s.ai_state_timer -= 1;

        let head = s.head();
        if head.x < WALL_PANIC_DIST
            || head.x > ws - WALL_PANIC_DIST
            || head.y < WALL_PANIC_DIST
            || head.y > ws - WALL_PANIC_DIST
        {
            s.ai_state = AiState::Flee;
            s.ai_state_timer = 30;
        }

        if s.ai_state_timer <= 0 {
            let r = rng.gen::<f64>();
            if r < 0.5 {
                s.ai_state = AiState::Food;
                s.ai_state_timer = 60 + rng.gen_range(0..120);
            } else if r < 0.8 {
                s.ai_state = AiState::Wander;
                s.ai_state_timer = 60 + rng.gen_range(0..90);
                s.ai_target_angle = rng.gen::<f64>() * TAU;
            } else {
                s.ai_state = AiState::Hunt;
                s.ai_state_timer = 90 + rng.gen_range(0..110);
            }
        }
    }

    // Behavior pass works on a read-only view and collects the decision.
    let (head, my_len, my_boost, my_head_radius) = {
        let s = &snakes[idx];
        (s.head(), s.segments.len(), s.boost, s.head_radius())
    };
    let mut state = snakes[idx].ai_state;
    let mut wander_angle = snakes[idx].ai_target_angle;
    let mut target = snakes[idx].target_angle;
    let mut boosting = snakes[idx].is_boosting;
    let mut timer_override: Option<i32> = None;

    match state {
        AiState::Flee => {
            target = (ws / 2.0 - head.y).atan2(ws / 2.0 - head.x) + rng.gen::<f64>() * 0.6 - 0.3;
            boosting = true;
        }

        AiState::Food => {
            let mut closest: Option<usize> = None;
            let mut closest_d = FOOD_SCAN_DIST;
            for (fi, f) in foods.iter().enumerate() {
                let d = dist(head.x, head.y, f.x, f.y);
                if d < closest_d {
                    closest_d = d;
                    closest = Some(fi);
                }
            }
            if let Some(fi) = closest {
                let f = &foods[fi];
                target = (f.y - head.y).atan2(f.x - head.x);
            } else {
                state = AiState::Wander;
                timer_override = Some(60 + rng.gen_range(0..60));
            }
            boosting = false;
        }

        AiState::Hunt => {
            let mut prey: Option<usize> = None;
            let mut prey_d = HUNT_SCAN_DIST;
            for (j, o) in snakes.iter().enumerate() {
                if j == idx || !o.alive {
                    continue;
                }
                if o.segments.len() > (my_len as f64 * 1.5) as usize {
                    continue;
                }
                let oh = o.head();
                let d = dist(head.x, head.y, oh.x, oh.y);
                if d < prey_d {
                    prey_d = d;
                    prey = Some(j);
                }
            }
            if let Some(j) = prey {
                let o = &snakes[j];
                let oh = o.head();
                // Lead the prey by 100 units along its current heading.
                let px = oh.x + o.angle.cos() * 100.0;
                let py = oh.y + o.angle.sin() * 100.0;
                target = (py - head.y).atan2(px - head.x);
                boosting = prey_d < 200.0 && my_boost > 30.0;
            } else {
                state = AiState::Wander;
            }
        }

        AiState::Wander => {
            if frame % 60 == 0 {
                wander_angle += rng.gen::<f64>() * 1.6 - 0.8;
            }
            target = wander_angle;
            boosting = false;
        }
    }

    // Collision avoidance overrides whatever the behavior chose.
    // First match wins.
    'avoid: for (j, o) in snakes.iter().enumerate() {
        if j == idx || !o.alive {
            continue;
        }
        let avoid_dist = o.body_radius() + my_head_radius + 30.0;
        for seg in o.segments.iter().take(AVOID_SEG_LIMIT).step_by(2) {
            let d = dist(head.x, head.y, seg.x, seg.y);
            if d < avoid_dist {
                target = (head.y - seg.y).atan2(head.x - seg.x);
                boosting = d < avoid_dist * 0.6 && my_boost > 20.0;
                break 'avoid;
            }
        }
    }

    let s = &mut snakes[idx];
    s.ai_state = state;
    s.ai_target_angle = wander_angle;
    s.target_angle = target;
    s.is_boosting = boosting;
    if let Some(t) = timer_override {
        s.ai_state_timer = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::physics::Vec2;

    fn test_world(ai_count: usize, food_count: usize) -> World {
        let cfg = GameConfig {
            ai_count,
            food_count,
            ..GameConfig::default()
        };
        World::seeded(cfg, 7)
    }

    #[test]
    fn near_wall_forces_flee() {
        let mut w = test_world(1, 0);
        let head = Vec2::new(100.0, 5000.0);
        w.snakes[0].segments[0] = head;
        update(&mut w, 0);
        assert_eq!(w.snakes[0].ai_state, AiState::Flee);
        assert!(w.snakes[0].is_boosting);
        // Flee steers roughly toward the arena centre (+x here), jitter <= 0.3 rad.
        let expected = (5000.0_f64 - head.y).atan2(5000.0 - head.x);
        let diff = crate::game::physics::angle_diff(expected, w.snakes[0].target_angle);
        assert!(diff.abs() <= 0.3 + 1e-9);
    }

    #[test]
    fn food_state_steers_at_nearest_pellet() {
        let mut w = test_world(1, 0);
        w.snakes[0].segments[0] = Vec2::new(5000.0, 5000.0);
        w.snakes[0].ai_state = AiState::Food;
        w.snakes[0].ai_state_timer = 100;
        let pellet = |x, y| crate::game::food::Food {
            x,
            y,
            color_idx: 0,
            radius: 6.0,
            value: 1.0,
        };
        w.foods.push(pellet(5390.0, 5000.0));
        w.foods.push(pellet(5200.0, 5000.0));
        update(&mut w, 0);
        assert_eq!(w.snakes[0].ai_state, AiState::Food);
        assert!(w.snakes[0].target_angle.abs() < 1e-9); // pellet is due +x
        assert!(!w.snakes[0].is_boosting);
    }

    #[test]
    fn food_state_degrades_to_wander_when_nothing_in_range() {
        let mut w = test_world(1, 0);
        w.snakes[0].segments[0] = Vec2::new(5000.0, 5000.0);
        w.snakes[0].ai_state = AiState::Food;
        w.snakes[0].ai_state_timer = 100;
        update(&mut w, 0);
        assert_eq!(w.snakes[0].ai_state, AiState::Wander);
        assert!(w.snakes[0].ai_state_timer >= 60 && w.snakes[0].ai_state_timer < 120);
    }

    #[test]
    fn hunt_ignores_snakes_over_size_ratio() {
        let mut w = test_world(2, 0);
        // Hunter: exactly 10 segments around the middle.
        w.snakes[0].segments.clear();
        for i in 0..10 {
            w.snakes[0]
                .segments
                .push_back(Vec2::new(5000.0 - 8.0 * i as f64, 5000.0));
        }
        // Other snake: head in hunt range, 20 segments trailing away so
        // the avoidance override never fires (closest point is 100 away).
        w.snakes[1].segments.clear();
        for i in 0..20 {
            w.snakes[1]
                .segments
                .push_back(Vec2::new(5100.0 + 8.0 * i as f64, 5000.0));
        }
        w.snakes[0].ai_state = AiState::Hunt;
        w.snakes[0].ai_state_timer = 100;
        update(&mut w, 0);
        // 20 > floor(10 * 1.5), so there is no eligible prey.
        assert_eq!(w.snakes[0].ai_state, AiState::Wander);

        // Shrink the other snake into range of the ratio and hunt sticks.
        w.snakes[1].segments.truncate(15);
        w.snakes[0].ai_state = AiState::Hunt;
        w.snakes[0].ai_state_timer = 100;
        update(&mut w, 0);
        assert_eq!(w.snakes[0].ai_state, AiState::Hunt);
    }

    #[test]
    fn states_stay_in_machine_over_many_frames() {
        let mut w = test_world(5, 50);
        for _ in 0..1000 {
            w.frame += 1;
            w.step();
            let ws = w.cfg.world_size_f();
            for s in &w.snakes {
                if !s.alive || !s.is_ai {
                    continue;
                }
                let h = s.head();
                let wall = h.x.min(h.y).min(ws - h.x).min(ws - h.y);
                // Anything this deep in the panic zone was inside it before
                // moving this frame, so the brain must have forced flee.
                if wall < WALL_PANIC_DIST - 6.0 {
                    assert_eq!(s.ai_state, AiState::Flee);
                }
            }
        }
    }
}
