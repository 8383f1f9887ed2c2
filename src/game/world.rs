use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::{GameConfig, NUM_COLORS};
use crate::game::ai::{self, AI_NAMES};
use crate::game::food::Food;
use crate::game::physics::{angle_diff, clamp, dist_sq, Vec2};
use crate::game::snake::Snake;

/// All simulation state. Owned exclusively by the tick task; nothing
/// here is shared or locked. Randomness flows through the seeded RNG so
/// a fixed seed reproduces a run exactly.
pub struct World {
    pub cfg: GameConfig,
    pub snakes: Vec<Snake>,
    pub foods: Vec<Food>,
    pub frame: u64,
    pub rng: StdRng,
    ai_id_counter: i32,
}

impl World {
    pub fn new(cfg: GameConfig) -> Self {
        Self::seeded(cfg, rand::random())
    }

    pub fn seeded(cfg: GameConfig, seed: u64) -> Self {
        let mut world = World {
            cfg,
            snakes: Vec::new(),
            foods: Vec::new(),
            frame: 0,
            rng: StdRng::seed_from_u64(seed),
            ai_id_counter: 0,
        };

        let mut used: HashSet<String> = HashSet::new();
        for i in 0..world.cfg.ai_count {
            let mut name = AI_NAMES[i % AI_NAMES.len()].to_string();
            if used.contains(&name) {
                let pick = world.rng.gen_range(0..AI_NAMES.len());
                name = format!("{} {}", AI_NAMES[pick], i);
            }
            used.insert(name.clone());
            world.spawn_ai(name, i % NUM_COLORS);
        }

        world.foods.reserve(world.cfg.food_count);
        while world.foods.len() < world.cfg.food_count {
            let f = world.new_food();
            world.foods.push(f);
        }
        world
    }

    // ── spawning ──

    pub fn rand_world_pos(&mut self) -> Vec2 {
        let ws = self.cfg.world_size_f();
        Vec2::new(
            200.0 + self.rng.gen::<f64>() * (ws - 400.0),
            200.0 + self.rng.gen::<f64>() * (ws - 400.0),
        )
    }

    fn next_ai_id(&mut self) -> i32 {
        self.ai_id_counter -= 1;
        self.ai_id_counter
    }

    fn create_snake(
        &mut self,
        name: String,
        x: f64,
        y: f64,
        color_idx: usize,
        is_ai: bool,
        player_id: i32,
    ) -> Snake {
        let angle = self.rng.gen::<f64>() * std::f64::consts::TAU;
        Snake::spawn(&self.cfg, name, x, y, angle, color_idx, is_ai, player_id)
    }

    /// Add an AI snake with a small random starting length bonus.
    fn spawn_ai(&mut self, name: String, color_idx: usize) {
        let pos = self.rand_world_pos();
        let id = self.next_ai_id();
        let mut s = self.create_snake(name, pos.x, pos.y, color_idx, true, id);
        let extra = self.rng.gen_range(0..40);
        s.grow(extra);
        self.snakes.push(s);
    }

    /// Replacement AI added when a human leaves.
    pub fn spawn_replacement_ai(&mut self) {
        let pick = self.rng.gen_range(0..AI_NAMES.len());
        let color = self.rng.gen_range(0..NUM_COLORS);
        self.spawn_ai(AI_NAMES[pick].to_string(), color);
    }

    pub fn spawn_human(&mut self, name: String, player_id: i32) {
        let pos = self.rand_world_pos();
        let color = self.rng.gen_range(0..NUM_COLORS);
        let s = self.create_snake(name, pos.x, pos.y, color, false, player_id);
        self.snakes.push(s);
    }

    pub fn remove_first_alive_ai(&mut self) {
        if let Some(i) = self.snakes.iter().position(|s| s.is_ai && s.alive) {
            self.snakes.remove(i);
        }
    }

    pub fn remove_snake(&mut self, player_id: i32) -> bool {
        match self.snake_index(player_id) {
            Some(i) => {
                self.snakes.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn snake_index(&self, player_id: i32) -> Option<usize> {
        self.snakes.iter().position(|s| s.player_id == player_id)
    }

    fn new_food(&mut self) -> Food {
        let pos = self.rand_world_pos();
        Food::pellet(pos.x, pos.y, &mut self.rng)
    }

    // ── per-tick simulation ──

    /// Advance every snake, resolve collisions, top up food. The caller
    /// bumps `frame` and drains inbound messages first. Returns the
    /// number of snake-on-snake kills this tick.
    pub fn step(&mut self) -> u32 {
        for i in 0..self.snakes.len() {
            if !self.snakes[i].alive {
                if self.snakes[i].is_ai {
                    self.snakes[i].respawn_timer -= 1;
                    if self.snakes[i].respawn_timer <= 0 {
                        self.respawn_ai(i);
                    }
                }
                continue;
            }
            if self.snakes[i].is_ai {
                ai::update(self, i);
            }
            self.update_snake(i);
            self.check_food_collision(i);
        }

        let kills = self.check_snake_collisions();

        while self.foods.len() < self.cfg.food_count {
            let f = self.new_food();
            self.foods.push(f);
        }
        kills
    }

    fn update_snake(&mut self, i: usize) {
        let mut hit_boundary = false;
        {
            let World {
                snakes,
                foods,
                rng,
                cfg,
                frame,
                ..
            } = self;
            let s = &mut snakes[i];
            if !s.alive {
                return;
            }
            if s.inv_timer > 0 {
                s.inv_timer -= 1;
            }

            let diff = angle_diff(s.angle, s.target_angle);
            s.angle += clamp(diff, -cfg.turn_speed, cfg.turn_speed) * 1.8;

            if s.is_boosting && s.boost > 0.0 && s.segments.len() > 12 {
                s.speed = cfg.boost_speed;
                s.boost -= cfg.boost_drain;
                // Boosting burns length: shed a pellet near the tail.
                if *frame % 8 == 0 && s.target_len > cfg.base_snake_len {
                    s.target_len -= 1;
                    if let Some(&tail) = s.segments.back() {
                        foods.push(Food::pellet(
                            tail.x + rng.gen::<f64>() * 20.0 - 10.0,
                            tail.y + rng.gen::<f64>() * 20.0 - 10.0,
                            rng,
                        ));
                    }
                }
            } else {
                s.speed = cfg.base_speed;
                s.is_boosting = false;
                if s.boost < cfg.max_boost {
                    s.boost += cfg.boost_regen;
                }
            }

            let head = s.head();
            let new_x = head.x + s.angle.cos() * s.speed;
            let new_y = head.y + s.angle.sin() * s.speed;

            let ws = cfg.world_size as f64;
            let bm = cfg.boundary_margin;
            if new_x < bm || new_x > ws - bm || new_y < bm || new_y > ws - bm {
                if !s.is_ai {
                    info!(name = %s.name, score = s.score, "snake hit boundary");
                    hit_boundary = true;
                } else {
                    // AI pivots toward the centre and holds position this frame.
                    s.target_angle = (ws / 2.0 - head.y).atan2(ws / 2.0 - head.x);
                }
            } else {
                s.segments.push_front(Vec2::new(new_x, new_y));
                s.segments.truncate(s.target_len.max(1));
            }
        }
        if hit_boundary {
            self.kill_snake(i);
        }
    }

    fn check_food_collision(&mut self, i: usize) {
        let World { snakes, foods, .. } = self;
        let s = &mut snakes[i];
        if !s.alive {
            return;
        }
        let head = s.head();
        let hr = s.head_radius();

        let mut k = foods.len();
        while k > 0 {
            k -= 1;
            let f = foods[k];
            let reach = hr + f.radius;
            if dist_sq(head.x, head.y, f.x, f.y) < reach * reach {
                s.grow(f.value.round() as usize);
                foods.swap_remove(k);
            }
        }
    }

    /// Head-vs-body resolution after all snakes have moved. List order is
    /// the scan order; a snake killed earlier in the scan no longer kills
    /// later heads this tick.
    fn check_snake_collisions(&mut self) -> u32 {
        let mut kills = 0;
        for i in 0..self.snakes.len() {
            if !self.snakes[i].alive || self.snakes[i].inv_timer > 0 {
                continue;
            }
            let head = self.snakes[i].head();
            let hr = self.snakes[i].head_radius();

            let mut killer: Option<usize> = None;
            for (j, o) in self.snakes.iter().enumerate() {
                if j == i || !o.alive {
                    continue;
                }
                // Cheap reject against the other snake's head.
                let oh = o.head();
                let max_reach = o.segments.len() as f64 * 8.0 + hr + 50.0;
                if dist_sq(head.x, head.y, oh.x, oh.y) > max_reach * max_reach {
                    continue;
                }

                let threshold = hr + o.body_radius() - 4.0;
                let threshold_sq = threshold * threshold;
                for seg in o.segments.iter().skip(5) {
                    if dist_sq(head.x, head.y, seg.x, seg.y) < threshold_sq {
                        killer = Some(j);
                        break;
                    }
                }
                if killer.is_some() {
                    break;
                }
            }

            if let Some(j) = killer {
                kills += 1;
                let reward = (self.snakes[i].segments.len() as f64 * 0.3) as usize;
                info!(
                    victim = %self.snakes[i].name,
                    killer = %self.snakes[j].name,
                    score = self.snakes[i].score,
                    "snake killed",
                );
                self.kill_snake(i);
                self.snakes[j].grow(reward);
            }
        }
        kills
    }

    /// Mark dead and scatter pellets along the corpse. AI snakes arm
    /// their respawn timer.
    pub fn kill_snake(&mut self, i: usize) {
        let World {
            snakes,
            foods,
            rng,
            cfg,
            ..
        } = self;
        let s = &mut snakes[i];
        if !s.alive {
            return;
        }
        s.alive = false;

        let stride = (s.segments.len() / cfg.kill_food_count).max(1);
        let mut k = 0;
        while k < s.segments.len() {
            let seg = s.segments[k];
            foods.push(Food::corpse_pellet(
                seg.x + rng.gen::<f64>() * 30.0 - 15.0,
                seg.y + rng.gen::<f64>() * 30.0 - 15.0,
                rng,
            ));
            k += stride;
        }

        if s.is_ai {
            s.respawn_timer = cfg.ai_respawn_ticks;
        }
    }

    /// Rebirth into the same slot: same display name, fresh id, fresh
    /// position, new random length bonus.
    fn respawn_ai(&mut self, i: usize) {
        let name = self.snakes[i].name.clone();
        let pos = self.rand_world_pos();
        let color = self.rng.gen_range(0..NUM_COLORS);
        let id = self.next_ai_id();
        let mut s = self.create_snake(name, pos.x, pos.y, color, true, id);
        let extra = self.rng.gen_range(0..40);
        s.grow(extra);
        self.snakes[i] = s;
    }
}
