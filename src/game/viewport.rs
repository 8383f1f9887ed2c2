use crate::config::{FOOD_VIEW_DIST, VIEW_DIST};
use crate::game::physics::Vec2;
use crate::game::world::World;

/// Centre of a session's view: its own snake's head, or the arena
/// centre when it has no snake.
pub fn view_center(world: &World, own: Option<usize>) -> Vec2 {
    match own {
        Some(i) if !world.snakes[i].segments.is_empty() => world.snakes[i].head(),
        _ => {
            let half = world.cfg.world_size_f() / 2.0;
            Vec2::new(half, half)
        }
    }
}

/// Indices of the snakes in a session's frame: the session's own snake
/// first (alive or dead), then every other alive snake whose head is
/// within Chebyshev distance `VIEW_DIST + 1000` of the view centre.
pub fn visible_snakes(world: &World, own: Option<usize>) -> Vec<usize> {
    let center = view_center(world, own);
    let range = VIEW_DIST + 1000.0;

    let mut out = Vec::new();
    if let Some(i) = own {
        out.push(i);
    }
    for (j, s) in world.snakes.iter().enumerate() {
        if Some(j) == own {
            continue;
        }
        if !s.alive || s.segments.is_empty() {
            continue;
        }
        let h = s.head();
        if (h.x - center.x).abs() < range && (h.y - center.y).abs() < range {
            out.push(j);
        }
    }
    out
}

/// Indices of pellets within Chebyshev distance `FOOD_VIEW_DIST` of the
/// view centre.
pub fn visible_food(world: &World, center: Vec2) -> Vec<usize> {
    world
        .foods
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            (f.x - center.x).abs() < FOOD_VIEW_DIST && (f.y - center.y).abs() < FOOD_VIEW_DIST
        })
        .map(|(i, _)| i)
        .collect()
}
