use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::game::world::World;

const TICK_RING: usize = 60;
const BANDWIDTH_RING: usize = 30; // seconds of outbound-bytes history
const LEADERBOARD_LEN: usize = 20;

/// Point-in-time stats view, served over `/stats` and through the
/// reply-channel protocol. Field names are part of the HTTP interface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub uptime: String,
    pub uptime_sec: i64,
    pub total_joins: i64,
    pub total_leaves: i64,
    pub total_kills: i64,
    pub peak_players: usize,
    pub current_players: usize,
    pub ai_count: usize,
    pub food_count: usize,
    pub avg_tick_ms: f64,
    pub max_tick_ms: f64,
    #[serde(rename = "bandwidthKBps")]
    pub bandwidth_kbps: f64,
    pub total_bytes_sent: i64,
    pub total_bytes_recv: i64,
    pub frame: u64,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    pub alive: bool,
}

/// Counters and rolling windows owned by the tick loop. Only
/// `bytes_recv` is shared (reader tasks add to it).
pub struct StatsTracker {
    start: Instant,
    pub total_joins: i64,
    pub total_leaves: i64,
    pub total_kills: i64,
    pub peak_players: usize,
    pub total_bytes_sent: i64,
    pub bytes_recv: Arc<AtomicI64>,

    tick_durations: [Duration; TICK_RING],
    tick_idx: usize,
    max_tick_ms: f64,

    bw_per_sec: [i64; BANDWIDTH_RING],
    bw_idx: usize,
    bw_accum: i64,
    bw_last_flush_frame: u64,
}

impl StatsTracker {
    pub fn new() -> Self {
        StatsTracker {
            start: Instant::now(),
            total_joins: 0,
            total_leaves: 0,
            total_kills: 0,
            peak_players: 0,
            total_bytes_sent: 0,
            bytes_recv: Arc::new(AtomicI64::new(0)),
            tick_durations: [Duration::ZERO; TICK_RING],
            tick_idx: 0,
            max_tick_ms: 0.0,
            bw_per_sec: [0; BANDWIDTH_RING],
            bw_idx: 0,
            bw_accum: 0,
            bw_last_flush_frame: 0,
        }
    }

    pub fn record_tick(&mut self, elapsed: Duration) {
        self.tick_durations[self.tick_idx % TICK_RING] = elapsed;
        self.tick_idx += 1;
        let ms = elapsed.as_secs_f64() * 1000.0;
        if ms > self.max_tick_ms {
            self.max_tick_ms = ms;
        }
    }

    /// Account an enqueued outbound frame.
    pub fn add_sent(&mut self, bytes: usize) {
        self.total_bytes_sent += bytes as i64;
        self.bw_accum += bytes as i64;
    }

    /// Roll the per-second accumulator into the ring once a second's
    /// worth of frames has elapsed.
    pub fn flush_bandwidth(&mut self, frame: u64, tick_rate: u64) {
        if frame - self.bw_last_flush_frame >= tick_rate {
            self.bw_per_sec[self.bw_idx % BANDWIDTH_RING] = self.bw_accum;
            self.bw_idx += 1;
            self.bw_accum = 0;
            self.bw_last_flush_frame = frame;
        }
    }

    fn avg_tick_ms(&self) -> f64 {
        let mut total = Duration::ZERO;
        let mut count = 0;
        for d in &self.tick_durations {
            if !d.is_zero() {
                total += *d;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        total.as_secs_f64() * 1000.0 / count as f64
    }

    fn bandwidth_kbps(&self) -> f64 {
        let mut total = 0i64;
        let mut count = 0;
        for &b in &self.bw_per_sec {
            if b > 0 {
                total += b;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        total as f64 / count as f64 / 1024.0
    }

    pub fn snapshot(&self, world: &World, current_players: usize) -> StatsSnapshot {
        let uptime = self.start.elapsed();

        let ai_count = world.snakes.iter().filter(|s| s.is_ai && s.alive).count();
        let mut leaderboard: Vec<LeaderboardEntry> = world
            .snakes
            .iter()
            .filter(|s| s.alive)
            .map(|s| LeaderboardEntry {
                name: s.name.clone(),
                score: s.score,
                is_ai: s.is_ai,
                alive: s.alive,
            })
            .collect();
        leaderboard.sort_by(|a, b| b.score.cmp(&a.score));
        leaderboard.truncate(LEADERBOARD_LEN);

        StatsSnapshot {
            uptime: format_duration(uptime),
            uptime_sec: uptime.as_secs() as i64,
            total_joins: self.total_joins,
            total_leaves: self.total_leaves,
            total_kills: self.total_kills,
            peak_players: self.peak_players,
            current_players,
            ai_count,
            food_count: world.foods.len(),
            avg_tick_ms: round2(self.avg_tick_ms()),
            max_tick_ms: round2(self.max_tick_ms),
            bandwidth_kbps: round2(self.bandwidth_kbps()),
            total_bytes_sent: self.total_bytes_sent,
            total_bytes_recv: self.bytes_recv.load(Ordering::Relaxed),
            frame: world.frame,
            leaderboard,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs / 60) % 60, secs % 60)
}
