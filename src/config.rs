use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

// Technical/network constants (not configurable)
pub const HEAD_RADIUS: f64 = 12.0;
pub const BODY_RADIUS: f64 = 10.0;
pub const FOOD_RADIUS: f64 = 6.0;
pub const FOOD_VALUE: f64 = 1.0;
pub const NET_TICK_RATE: u64 = 2; // broadcast every 2nd frame
pub const FOOD_SYNC_RATE: u64 = 9; // include food every 9th network tick
pub const VIEW_DIST: f64 = 2500.0;
pub const FOOD_VIEW_DIST: f64 = 1200.0;
pub const NUM_COLORS: usize = 12;
pub const NUM_FOOD_COLORS: usize = 12;

// Channel and frame bounds
pub const OUTBOUND_QUEUE: usize = 8; // frames per session, drop-on-full
pub const INPUT_QUEUE: usize = 2048;
pub const CONTROL_QUEUE: usize = 32; // join/leave/respawn
pub const STATS_QUEUE: usize = 4;
pub const MAX_FRAME_BYTES: usize = 512; // inbound per-message cap
pub const MAX_NAME_CHARS: usize = 15;

pub const DEFAULT_PORT: u16 = 8080;

/// Gameplay tunables. Built once at startup (defaults, then config file,
/// then CLI overrides) and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub world_size: u32,
    pub food_count: usize,
    pub ai_count: usize,
    pub base_speed: f64,
    pub boost_speed: f64,
    pub turn_speed: f64,
    pub max_boost: f64,
    pub boost_drain: f64,
    pub boost_regen: f64,
    pub base_snake_len: usize,
    pub kill_food_count: usize,
    pub boundary_margin: f64,
    pub ai_respawn_ticks: i32,
    pub tick_rate: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            world_size: 10000,
            food_count: 3000,
            ai_count: 30,
            base_speed: 3.2,
            boost_speed: 5.5,
            turn_speed: 0.08,
            max_boost: 100.0,
            boost_drain: 0.6,
            boost_regen: 0.15,
            base_snake_len: 10,
            kill_food_count: 8,
            boundary_margin: 50.0,
            ai_respawn_ticks: 180,
            tick_rate: 60,
        }
    }
}

impl GameConfig {
    pub fn from_file(path: &Path) -> Result<Self, ServerError> {
        let data = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&data).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn world_size_f(&self) -> f64 {
        self.world_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.world_size, 10000);
        assert_eq!(cfg.food_count, 3000);
        assert_eq!(cfg.ai_count, 30);
        assert_eq!(cfg.base_snake_len, 10);
        assert_eq!(cfg.tick_rate, 60);
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let cfg: GameConfig = serde_json::from_str(r#"{"worldSize":5000,"aiCount":5}"#).unwrap();
        assert_eq!(cfg.world_size, 5000);
        assert_eq!(cfg.ai_count, 5);
        assert_eq!(cfg.food_count, 3000);
        assert_eq!(cfg.base_speed, 3.2);
    }
}
