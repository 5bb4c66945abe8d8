use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::collision::Rect;
use crate::error::LevelError;
use crate::level::{LevelDef, ZoneOverride};
use crate::spikes::Spike;
use crate::zones::{GravityZone, ZoneConfig, ZoneKind};

/// Tile size in world pixels.
pub const TILE_SIZE: f32 = 60.0;
/// Spike height; spikes sit on the bottom of their cell.
pub const SPIKE_HEIGHT: f32 = 45.0;
/// Trigger offset (tiles) used when a spike has no override.
pub const DEFAULT_TRIGGER_OFFSET: f32 = -0.5;

/// Positioned geometry and hazards for one level instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelGeometry {
    pub platforms: Vec<Rect>,
    pub fake_blocks: Vec<Rect>,
    pub invisible_platforms: Vec<Rect>,
    pub spikes: Vec<Spike>,
    pub door: Option<Rect>,
    /// Cell containing the spawn marker.
    pub spawn: Option<Rect>,
    pub gravity_zones: Vec<GravityZone>,
    pub gravity_locked: bool,
    /// World size in pixels.
    pub width: f32,
    pub height: f32,
}

impl LevelGeometry {
    /// Every rectangle the actor collides with, platforms first.
    pub fn solids(&self) -> impl Iterator<Item = &Rect> {
        self.platforms.iter().chain(self.invisible_platforms.iter())
    }
}

/// What a glyph places in its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glyph {
    Solid,
    Fake,
    Invisible,
    Door,
    Spawn,
    /// Spike that slides `tiles` cells toward an actor approaching from the left.
    Spike { tiles: u8 },
    ZoneMarker { momentary: bool },
}

/// Glyph dispatch table. Characters not listed are empty space.
const GLYPHS: &[(char, Glyph)] = &[
    ('#', Glyph::Solid),
    ('F', Glyph::Fake),
    ('I', Glyph::Invisible),
    ('D', Glyph::Door),
    ('S', Glyph::Spawn),
    ('^', Glyph::Spike { tiles: 0 }),
    ('0', Glyph::Spike { tiles: 0 }),
    ('1', Glyph::Spike { tiles: 1 }),
    ('2', Glyph::Spike { tiles: 2 }),
    ('3', Glyph::Spike { tiles: 3 }),
    ('4', Glyph::Spike { tiles: 4 }),
    ('5', Glyph::Spike { tiles: 5 }),
    ('6', Glyph::Spike { tiles: 6 }),
    ('7', Glyph::Spike { tiles: 7 }),
    ('8', Glyph::Spike { tiles: 8 }),
    ('9', Glyph::Spike { tiles: 9 }),
    ('G', Glyph::ZoneMarker { momentary: false }),
    ('g', Glyph::ZoneMarker { momentary: true }),
];

impl Glyph {
    fn lookup(c: char) -> Option<Glyph> {
        GLYPHS
            .iter()
            .find(|(glyph, _)| *glyph == c)
            .map(|&(_, kind)| kind)
    }

    fn place(self, builder: &mut Builder<'_>, col: usize, row: usize) {
        let cell = cell_rect(col, row);
        match self {
            Glyph::Solid => builder.geometry.platforms.push(cell),
            Glyph::Fake => builder.geometry.fake_blocks.push(cell),
            Glyph::Invisible => builder.geometry.invisible_platforms.push(cell),
            Glyph::Door => builder.geometry.door = Some(cell),
            Glyph::Spawn => builder.geometry.spawn = Some(cell),
            Glyph::Spike { tiles } => builder.push_spike(cell, tiles),
            Glyph::ZoneMarker { momentary } => {
                builder.markers[row * builder.columns + col] = Some(momentary);
            },
        }
    }
}

fn cell_rect(col: usize, row: usize) -> Rect {
    Rect::new(
        col as f32 * TILE_SIZE,
        row as f32 * TILE_SIZE,
        TILE_SIZE,
        TILE_SIZE,
    )
}

struct Builder<'a> {
    level: &'a LevelDef,
    geometry: LevelGeometry,
    columns: usize,
    rows: usize,
    /// Zone-marker cells, row-major; `Some(true)` for lowercase markers.
    markers: Vec<Option<bool>>,
}

impl Builder<'_> {
    fn push_spike(&mut self, cell: Rect, tiles: u8) {
        let index = self.geometry.spikes.len();
        let rect = Rect::new(
            cell.x,
            cell.y + TILE_SIZE - SPIKE_HEIGHT,
            TILE_SIZE,
            SPIKE_HEIGHT,
        );

        let offset = self
            .level
            .spike_triggers
            .get(index)
            .copied()
            .filter(|o| o.is_finite())
            .unwrap_or(DEFAULT_TRIGGER_OFFSET);
        let trigger_x = rect.x - offset * TILE_SIZE;

        let (trigger_y, trigger_height) = match self
            .level
            .spike_trigger_lengths
            .get(index)
            .copied()
            .flatten()
        {
            // Positive spans reach above the spike's top, negative below it
            Some(len) if len.is_finite() && len > 0.0 => {
                (rect.top() - len * TILE_SIZE, len * TILE_SIZE)
            },
            Some(len) if len.is_finite() && len < 0.0 => (rect.top(), -len * TILE_SIZE),
            _ => (0.0, self.geometry.height),
        };

        self.geometry.spikes.push(Spike::new(
            rect,
            -f32::from(tiles) * TILE_SIZE,
            trigger_x,
            trigger_y,
            trigger_height,
        ));
    }

    /// Group zone markers into 4-connected regions, in row-major discovery
    /// order, and attach merged configuration to each.
    fn build_zones(&mut self, chapter_zones: &[ZoneOverride]) {
        let mut visited = vec![false; self.markers.len()];
        let mut queue = VecDeque::new();

        for start in 0..self.markers.len() {
            if visited[start] || self.markers[start].is_none() {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);

            let (mut min_c, mut max_c) = (usize::MAX, 0);
            let (mut min_r, mut max_r) = (usize::MAX, 0);
            let mut momentary = false;

            while let Some(idx) = queue.pop_front() {
                let (row, col) = (idx / self.columns, idx % self.columns);
                min_c = min_c.min(col);
                max_c = max_c.max(col);
                min_r = min_r.min(row);
                max_r = max_r.max(row);
                momentary |= self.markers[idx] == Some(true);

                for next in self.neighbours(row, col) {
                    if !visited[next] && self.markers[next].is_some() {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }

            let id = self.geometry.gravity_zones.len();
            let rect = Rect::new(
                min_c as f32 * TILE_SIZE,
                min_r as f32 * TILE_SIZE,
                (max_c - min_c + 1) as f32 * TILE_SIZE,
                (max_r - min_r + 1) as f32 * TILE_SIZE,
            );
            let default_kind = if momentary {
                ZoneKind::Momentary
            } else {
                ZoneKind::Flip
            };
            let config = ZoneConfig::merged(
                default_kind,
                &[chapter_zones.get(id), self.level.gravity_zones.get(id)],
            );
            self.geometry
                .gravity_zones
                .push(GravityZone::new(id, rect, config));
        }
    }

    fn neighbours(&self, row: usize, col: usize) -> impl Iterator<Item = usize> {
        let (rows, cols) = (self.rows, self.columns);
        let up = (row > 0).then(|| (row - 1) * cols + col);
        let down = (row + 1 < rows).then(|| (row + 1) * cols + col);
        let left = (col > 0).then(|| row * cols + col - 1);
        let right = (col + 1 < cols).then(|| row * cols + col + 1);
        [up, down, left, right].into_iter().flatten()
    }
}

/// Build level geometry from a level definition.
///
/// `chapter_zones` supplies zone parameters shared across the chapter; the
/// level's own list takes precedence entry by entry.
pub fn parse(
    level: &LevelDef,
    chapter_zones: &[ZoneOverride],
) -> Result<LevelGeometry, LevelError> {
    level.validate()?;

    let columns = level.columns();
    let rows = level.rows();
    let mut builder = Builder {
        level,
        geometry: LevelGeometry {
            platforms: Vec::new(),
            fake_blocks: Vec::new(),
            invisible_platforms: Vec::new(),
            spikes: Vec::new(),
            door: None,
            spawn: None,
            gravity_zones: Vec::new(),
            gravity_locked: level.gravity_locked,
            width: columns as f32 * TILE_SIZE,
            height: rows as f32 * TILE_SIZE,
        },
        columns,
        rows,
        markers: vec![None; columns * rows],
    };

    for (row, line) in level.grid.iter().enumerate() {
        for (col, c) in line.chars().enumerate() {
            if let Some(glyph) = Glyph::lookup(c) {
                glyph.place(&mut builder, col, row);
            }
        }
    }
    builder.build_zones(chapter_zones);

    let geometry = builder.geometry;
    if level.spike_triggers.len() < geometry.spikes.len() {
        tracing::debug!(
            "Level '{}': {} of {} spikes use the default trigger offset",
            level.name,
            geometry.spikes.len() - level.spike_triggers.len(),
            geometry.spikes.len()
        );
    }
    Ok(geometry)
}
