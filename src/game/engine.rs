use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::config::{
    GameConfig, CONTROL_QUEUE, FOOD_SYNC_RATE, INPUT_QUEUE, NET_TICK_RATE, STATS_QUEUE,
};
use crate::game::stats::{StatsSnapshot, StatsTracker};
use crate::game::viewport;
use crate::game::world::World;
use crate::protocol::codec;

const STATS_LOG_INTERVAL: u64 = 1800; // frames, ~30s at 60 Hz

/// Steering update from a session's reader.
#[derive(Debug, Clone, Copy)]
pub struct InputMsg {
    pub player_id: i32,
    pub angle: f64,
    pub boost: bool,
}

/// A connection that finished its join handshake and wants a snake.
#[derive(Debug)]
pub struct JoinRequest {
    pub id: i32,
    pub name: String,
    pub tx: mpsc::Sender<Vec<u8>>,
}

/// Per-client state owned by the tick task: the outbound frame queue
/// plus the metadata-cache bookkeeping.
struct Session {
    name: String,
    tx: mpsc::Sender<Vec<u8>>,
    /// Snake ids this client has already received name/color for.
    known: HashSet<i32>,
}

/// Cloneable endpoint handed to sessions and HTTP handlers. All world
/// access funnels through these channels; the inbound byte counter is
/// the one shared atomic.
#[derive(Clone)]
pub struct GameHandle {
    pub input_tx: mpsc::Sender<InputMsg>,
    pub join_tx: mpsc::Sender<JoinRequest>,
    pub leave_tx: mpsc::Sender<i32>,
    pub respawn_tx: mpsc::Sender<i32>,
    stats_tx: mpsc::Sender<oneshot::Sender<StatsSnapshot>>,
    pub bytes_recv: Arc<AtomicI64>,
    pub world_size: u32,
}

impl GameHandle {
    /// Reply-channel stats read: the tick loop answers on its next
    /// drain. `None` once the loop has shut down.
    pub async fn stats(&self) -> Option<StatsSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.stats_tx.send(tx).await.ok()?;
        rx.await.ok()
    }
}

/// The tick task: sole owner and sole mutator of [`World`] and the
/// session table.
pub struct Game {
    world: World,
    sessions: HashMap<i32, Session>,
    net_tick: u64,
    stats: StatsTracker,

    input_rx: mpsc::Receiver<InputMsg>,
    join_rx: mpsc::Receiver<JoinRequest>,
    leave_rx: mpsc::Receiver<i32>,
    respawn_rx: mpsc::Receiver<i32>,
    stats_rx: mpsc::Receiver<oneshot::Sender<StatsSnapshot>>,
}

impl Game {
    pub fn new(cfg: GameConfig) -> (Game, GameHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
        let (join_tx, join_rx) = mpsc::channel(CONTROL_QUEUE);
        let (leave_tx, leave_rx) = mpsc::channel(CONTROL_QUEUE);
        let (respawn_tx, respawn_rx) = mpsc::channel(CONTROL_QUEUE);
        let (stats_tx, stats_rx) = mpsc::channel(STATS_QUEUE);

        let world = World::new(cfg);
        let stats = StatsTracker::new();
        let handle = GameHandle {
            input_tx,
            join_tx,
            leave_tx,
            respawn_tx,
            stats_tx,
            bytes_recv: stats.bytes_recv.clone(),
            world_size: world.cfg.world_size,
        };
        let game = Game {
            world,
            sessions: HashMap::new(),
            net_tick: 0,
            stats,
            input_rx,
            join_rx,
            leave_rx,
            respawn_rx,
            stats_rx,
        };
        (game, handle)
    }

    /// Wall-clock paced loop. Exits after finishing the current tick
    /// once shutdown is signalled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let tick_rate = self.world.cfg.tick_rate.max(1);
        let mut ticker = tokio::time::interval(Duration::from_secs(1) / tick_rate);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_rate, "game loop running");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => {
                    info!("game loop stopped");
                    return;
                }
            }
        }
    }

    fn tick(&mut self) {
        let start = Instant::now();

        self.world.frame += 1;
        self.drain_messages();

        let kills = self.world.step();
        self.stats.total_kills += kills as i64;

        if self.world.frame % NET_TICK_RATE == 0 {
            self.net_tick += 1;
            let include_food = self.net_tick % FOOD_SYNC_RATE == 0;
            let include_summary = self.net_tick % 2 == 0;
            self.broadcast(include_food, include_summary);
        }

        self.stats.record_tick(start.elapsed());
        self.stats
            .flush_bandwidth(self.world.frame, self.world.cfg.tick_rate as u64);

        if self.world.frame % STATS_LOG_INTERVAL == 0 {
            let snap = self.stats.snapshot(&self.world, self.sessions.len());
            info!(
                uptime = %snap.uptime,
                players = snap.current_players,
                peak = snap.peak_players,
                ai = snap.ai_count,
                kills = snap.total_kills,
                food = snap.food_count,
                avg_tick_ms = snap.avg_tick_ms,
                max_tick_ms = snap.max_tick_ms,
                bandwidth_kbps = snap.bandwidth_kbps,
                "stats",
            );
        }
    }

    /// Empty every inbound channel without blocking. Runs at the top of
    /// each tick; within one drain a session's messages apply in the
    /// order it sent them.
    fn drain_messages(&mut self) {
        while let Ok(msg) = self.input_rx.try_recv() {
            if let Some(i) = self.world.snake_index(msg.player_id) {
                let s = &mut self.world.snakes[i];
                if s.alive {
                    s.target_angle = msg.angle;
                    s.is_boosting = msg.boost;
                }
            }
        }
        while let Ok(req) = self.join_rx.try_recv() {
            self.handle_join(req);
        }
        while let Ok(id) = self.leave_rx.try_recv() {
            self.handle_leave(id);
        }
        while let Ok(id) = self.respawn_rx.try_recv() {
            self.handle_respawn(id);
        }
        while let Ok(reply) = self.stats_rx.try_recv() {
            let snap = self.stats.snapshot(&self.world, self.sessions.len());
            let _ = reply.send(snap);
        }
    }

    fn handle_join(&mut self, req: JoinRequest) {
        // Retire one AI to make room.
        self.world.remove_first_alive_ai();
        self.world.spawn_human(req.name.clone(), req.id);

        let mut session = Session {
            name: req.name,
            tx: req.tx,
            known: HashSet::new(),
        };
        self.stats.total_joins += 1;

        // Full initial state: food included, no summary. The queue is
        // fresh so this cannot realistically drop.
        let frame = build_frame(&self.world, req.id, &mut session, true);
        let _ = session.tx.try_send(frame);

        self.sessions.insert(req.id, session);
        let current = self.sessions.len();
        if current > self.stats.peak_players {
            self.stats.peak_players = current;
        }
        info!(
            player = req.id,
            players = current,
            peak = self.stats.peak_players,
            "player joined",
        );
    }

    fn handle_leave(&mut self, id: i32) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        self.stats.total_leaves += 1;
        info!(player = id, name = %session.name, players = self.sessions.len(), "player left");

        // Swap the abandoned snake for a fresh AI.
        if self.world.remove_snake(id) {
            self.world.spawn_replacement_ai();
        }
    }

    fn handle_respawn(&mut self, id: i32) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        let Some(i) = self.world.snake_index(id) else {
            return;
        };
        if self.world.snakes[i].alive {
            return;
        }

        let name = session.name.clone();
        self.world.snakes.remove(i);
        self.world.spawn_human(name, id);

        // Force every client to re-learn this id's name and color.
        for s in self.sessions.values_mut() {
            s.known.remove(&id);
        }
        info!(player = id, "player respawned");
    }

    fn broadcast(&mut self, include_food: bool, include_summary: bool) {
        let summary = if include_summary {
            let alive: Vec<_> = self
                .world
                .snakes
                .iter()
                .filter(|s| s.alive && !s.segments.is_empty())
                .collect();
            codec::encode_summary(&alive)
        } else {
            Vec::new()
        };

        for (&id, session) in self.sessions.iter_mut() {
            // Snapshot the cache; committed only if the enqueue succeeds.
            let old_known = session.known.clone();
            let mut data = build_frame(&self.world, id, session, include_food);
            if include_summary {
                data[1] |= codec::FLAG_HAS_SUMMARY;
                data.extend_from_slice(&summary);
            }

            let n = data.len();
            match session.tx.try_send(data) {
                Ok(()) => self.stats.add_sent(n),
                // Queue full (or writer gone): drop the frame and roll the
                // metadata cache back so the next delivered frame carries it.
                Err(_) => session.known = old_known,
            }
        }
    }
}

/// Compose one client's state frame: viewport filtering, metadata-cache
/// bits, then the binary encode. Replaces the session's known set with
/// the visible set.
fn build_frame(world: &World, session_id: i32, session: &mut Session, include_food: bool) -> Vec<u8> {
    let own = world.snake_index(session_id);
    let visible = viewport::visible_snakes(world, own);
    let center = viewport::view_center(world, own);

    let mut has_meta = Vec::with_capacity(visible.len());
    let mut new_known = HashSet::with_capacity(visible.len());
    for &i in &visible {
        let pid = world.snakes[i].player_id;
        has_meta.push(!session.known.contains(&pid));
        new_known.insert(pid);
    }
    session.known = new_known;

    let snakes: Vec<_> = visible.iter().map(|&i| &world.snakes[i]).collect();
    let food_indices = if include_food {
        viewport::visible_food(world, center)
    } else {
        Vec::new()
    };
    let foods: Vec<_> = food_indices.iter().map(|&i| &world.foods[i]).collect();

    codec::encode_state(&snakes, &has_meta, &foods, include_food)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OUTBOUND_QUEUE;
    use crate::game::physics::Vec2;
    use crate::game::snake::Snake;

    fn quiet_cfg(ai_count: usize, food_count: usize) -> GameConfig {
        GameConfig {
            ai_count,
            food_count,
            ..GameConfig::default()
        }
    }

    async fn join(
        game: &mut Game,
        handle: &GameHandle,
        id: i32,
        name: &str,
        queue: usize,
    ) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(queue);
        handle
            .join_tx
            .send(JoinRequest {
                id,
                name: name.into(),
                tx,
            })
            .await
            .unwrap();
        game.tick();
        rx
    }

    fn move_snake_to(game: &mut Game, id: i32, x: f64, y: f64) {
        let i = game.world.snake_index(id).unwrap();
        let s = &mut game.world.snakes[i];
        for seg in s.segments.iter_mut() {
            *seg = Vec2::new(x, y);
        }
    }

    fn latest_frame(rx: &mut mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
        let mut last = None;
        while let Ok(f) = rx.try_recv() {
            last = Some(f);
        }
        last.expect("no frame queued")
    }

    #[tokio::test]
    async fn join_swaps_an_ai_and_sends_initial_state() {
        let (mut game, handle) = Game::new(quiet_cfg(2, 20));
        let mut rx = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;

        // One AI retired, one human added.
        assert_eq!(game.world.snakes.len(), 2);
        assert!(game.world.snake_index(1).is_some());

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame[0], codec::FRAME_STATE);
        assert_eq!(frame[1], codec::FLAG_HAS_FOOD);
        let decoded = codec::decode_state(&frame).unwrap();
        // First sight of everything: metadata everywhere.
        assert!(decoded.snakes.iter().all(|s| s.has_meta));
        let own = decoded.snakes.iter().find(|s| s.player_id == 1).unwrap();
        assert_eq!(own.name.as_deref(), Some("Ann"));
        assert!(own.is_human && own.alive);
        assert!(decoded.food.is_some());
        assert!(decoded.summary.is_none());
    }

    #[tokio::test]
    async fn inputs_steer_the_owned_snake() {
        let (mut game, handle) = Game::new(quiet_cfg(0, 0));
        let _rx = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;

        handle
            .input_tx
            .send(InputMsg {
                player_id: 1,
                angle: 1.25,
                boost: true,
            })
            .await
            .unwrap();
        game.tick();
        let i = game.world.snake_index(1).unwrap();
        assert_eq!(game.world.snakes[i].target_angle, 1.25);
    }

    #[tokio::test]
    async fn leave_replaces_human_with_ai() {
        let (mut game, handle) = Game::new(quiet_cfg(0, 0));
        let _rx = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;

        handle.leave_tx.send(1).await.unwrap();
        game.tick();
        assert!(game.sessions.is_empty());
        assert!(game.world.snake_index(1).is_none());
        assert_eq!(game.world.snakes.len(), 1);
        assert!(game.world.snakes[0].is_ai);
    }

    #[tokio::test]
    async fn summary_and_food_follow_network_tick_schedule() {
        let (mut game, handle) = Game::new(quiet_cfg(0, 5));
        let mut rx = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;
        rx.try_recv().unwrap(); // initial frame

        // Frames 2..: broadcast every 2nd frame; summary every 2nd
        // network tick; food every 9th.
        let mut saw_summary = false;
        let mut saw_food = false;
        for _ in 0..36 {
            game.tick();
            while let Ok(frame) = rx.try_recv() {
                let decoded = codec::decode_state(&frame).unwrap();
                if decoded.summary.is_some() {
                    saw_summary = true;
                }
                if decoded.food.is_some() {
                    saw_food = true;
                }
            }
        }
        assert!(saw_summary);
        assert!(saw_food);
    }

    #[tokio::test]
    async fn respawn_invalidates_metadata_for_all_viewers() {
        let (mut game, handle) = Game::new(quiet_cfg(0, 0));
        let mut rx_a = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;
        let _rx_b = join(&mut game, &handle, 2, "Bob", OUTBOUND_QUEUE).await;

        // Put both snakes in each other's viewport and let a broadcast
        // commit Bob into Ann's metadata cache.
        move_snake_to(&mut game, 1, 5000.0, 5000.0);
        move_snake_to(&mut game, 2, 5100.0, 5100.0);
        game.tick(); // frame 3
        game.tick(); // frame 4: broadcast
        let frame = latest_frame(&mut rx_a);
        let decoded = codec::decode_state(&frame).unwrap();
        // Bob is now in Ann's viewport and committed to her cache.
        assert!(decoded.snakes.iter().any(|s| s.player_id == 2));

        // Kill Bob between broadcasts, then respawn under the same id.
        let i = game.world.snake_index(2).unwrap();
        game.world.snakes[i].alive = false;
        handle.respawn_tx.send(2).await.unwrap();
        game.tick(); // frame 5: respawn handled
        move_snake_to(&mut game, 2, 5100.0, 5100.0);
        game.tick(); // frame 6: broadcast

        let frame = latest_frame(&mut rx_a);
        let decoded = codec::decode_state(&frame).unwrap();
        let bob = decoded
            .snakes
            .iter()
            .find(|s| s.player_id == 2)
            .expect("respawned snake visible");
        assert!(bob.has_meta, "respawned id must be re-advertised");
        assert_eq!(bob.name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn dropped_frame_restores_metadata_cache() {
        let (mut game, handle) = Game::new(quiet_cfg(0, 0));
        // Queue depth 1: the initial frame fills it, so the next
        // broadcast must drop.
        let mut rx = join(&mut game, &handle, 1, "Ann", 1).await;

        // A new snake wanders into view while the queue is saturated.
        move_snake_to(&mut game, 1, 5000.0, 5000.0);
        let cfg = game.world.cfg.clone();
        let mut intruder = Snake::spawn(&cfg, "Eve".into(), 5200.0, 5000.0, 0.0, 2, false, 99);
        intruder.inv_timer = 0;
        game.world.snakes.push(intruder);

        game.tick(); // frame 2: broadcast dropped (queue full), cache rolled back
        let first = latest_frame(&mut rx); // initial join frame only
        let decoded = codec::decode_state(&first).unwrap();
        assert!(decoded.snakes.iter().all(|s| s.player_id != 99));

        game.tick(); // frame 3
        game.tick(); // frame 4: broadcast lands in the now-empty queue
        let frame = latest_frame(&mut rx);
        let decoded = codec::decode_state(&frame).unwrap();
        let eve = decoded
            .snakes
            .iter()
            .find(|s| s.player_id == 99)
            .expect("intruder visible");
        assert!(
            eve.has_meta,
            "metadata from the dropped frame must be re-sent"
        );
    }

    #[tokio::test]
    async fn stats_served_through_reply_channel() {
        let (mut game, handle) = Game::new(quiet_cfg(3, 10));
        let _rx = join(&mut game, &handle, 1, "Ann", OUTBOUND_QUEUE).await;

        let h = handle.clone();
        let pending = tokio::spawn(async move { h.stats().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        game.tick();

        let snap = pending.await.unwrap().expect("snapshot delivered");
        assert_eq!(snap.current_players, 1);
        assert_eq!(snap.total_joins, 1);
        assert!(snap.frame >= 2);
        assert_eq!(snap.food_count, 10);
    }
}
