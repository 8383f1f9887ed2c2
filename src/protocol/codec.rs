//! Binary wire codec. Big-endian throughout; the layout is shared with
//! the browser client and must not drift:
//!
//! State frame:
//!   type(1)=1, flags(1: bit0=hasFood bit1=hasSummary), snakeCount(u16)
//!   per snake:
//!     playerId(i16),
//!     flags(u8: bit0=alive bit1=boosting bit2=human bit3=hasMeta),
//!     [if hasMeta: nameLen(u8), name, colorIdx(u8)],
//!     score(u16), angle*10000(i16), boost(u8),
//!     targetLen(u16), invTimer(u8),
//!     segCount(u16), then every 3rd segment as x(u16) y(u16)
//!   if hasFood: foodCount(u16), per pellet x(u16) y(u16) colorIdx(u8)
//!               radius*10(u8) value*10(u8)
//!   if hasSummary: summaryCount(u16), per alive snake playerId(i16)
//!                  headX(u16) headY(u16) score(u16) colorIdx(u8)
//!                  nameLen(u8) name
//!
//! Input frame (client to server): type(1)=2, angle*10000(i16), boost(u8 bit0).

use crate::game::food::Food;
use crate::game::physics::wrap_to_pi;
use crate::game::snake::Snake;

pub const FRAME_STATE: u8 = 1;
pub const FRAME_INPUT: u8 = 2;

pub const FLAG_HAS_FOOD: u8 = 1;
pub const FLAG_HAS_SUMMARY: u8 = 2;

pub const SNAKE_ALIVE: u8 = 1;
pub const SNAKE_BOOSTING: u8 = 2;
pub const SNAKE_HUMAN: u8 = 4;
pub const SNAKE_HAS_META: u8 = 8;

/// Transmit every 3rd segment; the client interpolates the rest.
const SEGMENT_STRIDE: usize = 3;

// ── encoding ──

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn coord(v: f64) -> u16 {
    v.round().clamp(0.0, 65535.0) as u16
}

fn angle_i16(a: f64) -> i16 {
    (wrap_to_pi(a) * 10000.0).round() as i16
}

fn sent_segment_count(s: &Snake) -> usize {
    (s.segments.len() + SEGMENT_STRIDE - 1) / SEGMENT_STRIDE
}

/// Serialize one client's view. `has_meta[i]` says whether snake `i`
/// needs its name/color block this frame; the caller owns that
/// bookkeeping (and its restore-on-drop discipline).
pub fn encode_state(snakes: &[&Snake], has_meta: &[bool], foods: &[&Food], include_food: bool) -> Vec<u8> {
    let mut size = 4;
    for (s, &meta) in snakes.iter().zip(has_meta) {
        size += 13 + sent_segment_count(s) * 4;
        if meta {
            size += 2 + s.name.len();
        }
    }
    if include_food {
        size += 2 + foods.len() * 7;
    }

    let mut buf = Vec::with_capacity(size);
    buf.push(FRAME_STATE);
    buf.push(if include_food { FLAG_HAS_FOOD } else { 0 });
    put_u16(&mut buf, snakes.len() as u16);

    for (s, &meta) in snakes.iter().zip(has_meta) {
        put_i16(&mut buf, s.player_id as i16);

        let mut flags = 0u8;
        if s.alive {
            flags |= SNAKE_ALIVE;
        }
        if s.is_boosting {
            flags |= SNAKE_BOOSTING;
        }
        if !s.is_ai {
            flags |= SNAKE_HUMAN;
        }
        if meta {
            flags |= SNAKE_HAS_META;
        }
        buf.push(flags);

        if meta {
            let name = s.name.as_bytes();
            buf.push(name.len() as u8);
            buf.extend_from_slice(name);
            buf.push(s.color_idx as u8);
        }

        put_u16(&mut buf, s.score.min(65535) as u16);
        put_i16(&mut buf, angle_i16(s.angle));
        buf.push(s.boost.round().clamp(0.0, 255.0) as u8);
        put_u16(&mut buf, s.target_len.min(65535) as u16);
        buf.push(s.inv_timer.clamp(0, 255) as u8);

        put_u16(&mut buf, sent_segment_count(s) as u16);
        for seg in s.segments.iter().step_by(SEGMENT_STRIDE) {
            put_u16(&mut buf, coord(seg.x));
            put_u16(&mut buf, coord(seg.y));
        }
    }

    if include_food {
        put_u16(&mut buf, foods.len() as u16);
        for f in foods {
            put_u16(&mut buf, coord(f.x));
            put_u16(&mut buf, coord(f.y));
            buf.push(f.color_idx as u8);
            buf.push((f.radius * 10.0).round().clamp(0.0, 255.0) as u8);
            buf.push((f.value * 10.0).round().clamp(0.0, 255.0) as u8);
        }
    }

    buf
}

/// Global summary block (minimap + leaderboard): every alive snake,
/// not viewport-filtered. Appended to a state frame by the broadcaster,
/// which also sets `FLAG_HAS_SUMMARY`.
pub fn encode_summary(snakes: &[&Snake]) -> Vec<u8> {
    let mut size = 2;
    for s in snakes {
        size += 10 + s.name.len();
    }
    let mut buf = Vec::with_capacity(size);
    put_u16(&mut buf, snakes.len() as u16);

    for s in snakes {
        put_i16(&mut buf, s.player_id as i16);
        let head = s.head();
        put_u16(&mut buf, coord(head.x));
        put_u16(&mut buf, coord(head.y));
        put_u16(&mut buf, s.score.min(65535) as u16);
        buf.push(s.color_idx as u8);
        let name = s.name.as_bytes();
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
    }
    buf
}

pub fn encode_input(angle: f64, boost: bool) -> [u8; 4] {
    let [hi, lo] = angle_i16(angle).to_be_bytes();
    [FRAME_INPUT, hi, lo, u8::from(boost)]
}

// ── decoding ──

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputFrame {
    pub angle: f64,
    pub boost: bool,
}

/// Strict input decode: exactly 4 bytes with the input type byte.
/// Anything else is a malformed frame and yields `None`.
pub fn decode_input(data: &[u8]) -> Option<InputFrame> {
    if data.len() != 4 || data[0] != FRAME_INPUT {
        return None;
    }
    let raw = i16::from_be_bytes([data[1], data[2]]);
    Some(InputFrame {
        angle: raw as f64 / 10000.0,
        boost: data[3] & 1 != 0,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnakeFrame {
    pub player_id: i16,
    pub alive: bool,
    pub boosting: bool,
    pub is_human: bool,
    pub has_meta: bool,
    pub name: Option<String>,
    pub color_idx: Option<u8>,
    pub score: u16,
    pub angle: f64,
    pub boost: u8,
    pub target_len: u16,
    pub inv_timer: u8,
    pub segments: Vec<(u16, u16)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodFrame {
    pub x: u16,
    pub y: u16,
    pub color_idx: u8,
    pub radius: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub player_id: i16,
    pub head_x: u16,
    pub head_y: u16,
    pub score: u16,
    pub color_idx: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateFrame {
    pub snakes: Vec<SnakeFrame>,
    pub food: Option<Vec<FoodFrame>>,
    pub summary: Option<Vec<SummaryEntry>>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn u16(&mut self) -> Option<u16> {
        let b = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Option<i16> {
        self.u16().map(|v| v as i16)
    }

    fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let b = self.data.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(b)
    }
}

/// Decode a full state frame (with optional food and summary blocks).
/// Truncated or mistyped buffers yield `None`.
pub fn decode_state(data: &[u8]) -> Option<StateFrame> {
    let mut r = Reader { data, pos: 0 };
    if r.u8()? != FRAME_STATE {
        return None;
    }
    let flags = r.u8()?;
    let snake_count = r.u16()?;

    let mut snakes = Vec::with_capacity(snake_count as usize);
    for _ in 0..snake_count {
        let player_id = r.i16()?;
        let sflags = r.u8()?;
        let has_meta = sflags & SNAKE_HAS_META != 0;
        let (name, color_idx) = if has_meta {
            let name_len = r.u8()? as usize;
            let name = String::from_utf8(r.bytes(name_len)?.to_vec()).ok()?;
            (Some(name), Some(r.u8()?))
        } else {
            (None, None)
        };
        let score = r.u16()?;
        let angle = r.i16()? as f64 / 10000.0;
        let boost = r.u8()?;
        let target_len = r.u16()?;
        let inv_timer = r.u8()?;
        let seg_count = r.u16()?;
        let mut segments = Vec::with_capacity(seg_count as usize);
        for _ in 0..seg_count {
            let x = r.u16()?;
            let y = r.u16()?;
            segments.push((x, y));
        }
        snakes.push(SnakeFrame {
            player_id,
            alive: sflags & SNAKE_ALIVE != 0,
            boosting: sflags & SNAKE_BOOSTING != 0,
            is_human: sflags & SNAKE_HUMAN != 0,
            has_meta,
            name,
            color_idx,
            score,
            angle,
            boost,
            target_len,
            inv_timer,
            segments,
        });
    }

    let food = if flags & FLAG_HAS_FOOD != 0 {
        let count = r.u16()?;
        let mut pellets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let x = r.u16()?;
            let y = r.u16()?;
            let color_idx = r.u8()?;
            let radius = r.u8()? as f64 / 10.0;
            let value = r.u8()? as f64 / 10.0;
            pellets.push(FoodFrame {
                x,
                y,
                color_idx,
                radius,
                value,
            });
        }
        Some(pellets)
    } else {
        None
    };

    let summary = if flags & FLAG_HAS_SUMMARY != 0 {
        let count = r.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let player_id = r.i16()?;
            let head_x = r.u16()?;
            let head_y = r.u16()?;
            let score = r.u16()?;
            let color_idx = r.u8()?;
            let name_len = r.u8()? as usize;
            let name = String::from_utf8(r.bytes(name_len)?.to_vec()).ok()?;
            entries.push(SummaryEntry {
                player_id,
                head_x,
                head_y,
                score,
                color_idx,
                name,
            });
        }
        Some(entries)
    } else {
        None
    };

    Some(StateFrame {
        snakes,
        food,
        summary,
    })
}
