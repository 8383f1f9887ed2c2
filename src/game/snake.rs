use std::collections::VecDeque;

use crate::config::{GameConfig, BODY_RADIUS, HEAD_RADIUS};
use crate::game::ai::AiState;
use crate::game::physics::Vec2;

/// A single snake. Humans and AI share the structure; `is_ai` switches
/// the brain and the respawn path. Head is always `segments[0]`.
#[derive(Debug, Clone)]
pub struct Snake {
    pub name: String,
    pub segments: VecDeque<Vec2>,
    pub angle: f64,
    pub target_angle: f64,
    pub speed: f64,
    pub color_idx: usize,
    pub is_ai: bool,
    pub player_id: i32, // positive for humans, negative for AI
    pub score: u32,
    pub target_len: usize,
    pub boost: f64,
    pub is_boosting: bool,
    pub alive: bool,
    pub inv_timer: i32,
    pub respawn_timer: i32, // AI-only: frames until respawn

    pub ai_state: AiState,
    pub ai_state_timer: i32,
    pub ai_target_angle: f64,
}

impl Snake {
    /// Lay out a fresh snake at `(x, y)` heading `angle`, body extending
    /// backwards at 8-unit spacing.
    pub fn spawn(
        cfg: &GameConfig,
        name: String,
        x: f64,
        y: f64,
        angle: f64,
        color_idx: usize,
        is_ai: bool,
        player_id: i32,
    ) -> Self {
        let mut segments = VecDeque::with_capacity(cfg.base_snake_len * 2);
        for i in 0..cfg.base_snake_len {
            segments.push_back(Vec2::new(
                x - angle.cos() * 8.0 * i as f64,
                y - angle.sin() * 8.0 * i as f64,
            ));
        }
        Snake {
            name,
            segments,
            angle,
            target_angle: angle,
            speed: cfg.base_speed,
            color_idx,
            is_ai,
            player_id,
            score: 0,
            target_len: cfg.base_snake_len,
            boost: cfg.max_boost,
            is_boosting: false,
            alive: true,
            inv_timer: 120,
            respawn_timer: 0,
            ai_state: AiState::Wander,
            ai_state_timer: 0,
            ai_target_angle: angle,
        }
    }

    pub fn head(&self) -> Vec2 {
        self.segments[0]
    }

    pub fn head_radius(&self) -> f64 {
        HEAD_RADIUS + (self.segments.len() as f64 * 0.03).min(6.0)
    }

    pub fn body_radius(&self) -> f64 {
        BODY_RADIUS + (self.segments.len() as f64 * 0.025).min(5.0)
    }

    pub fn grow(&mut self, amount: usize) {
        self.target_len += amount;
        self.score += amount as u32;
    }
}
