use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LevelError;
use crate::zones::{ZoneKind, ZoneTrigger};

/// Level pack compiled into the crate.
const BUILTIN_PACK: &str = include_str!("../levels/default.toml");

/// Partial gravity-zone parameters. Unset fields inherit from the layer below
/// (built-in defaults, then the chapter list, then the level list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneOverride {
    pub kind: Option<ZoneKind>,
    pub trigger: Option<ZoneTrigger>,
    pub duration: Option<f32>,
    pub cooldown: Option<f32>,
    pub one_shot: Option<bool>,
    pub visual: Option<String>,
    pub sound: Option<String>,
}

/// A single level as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    /// Rows of glyphs, top to bottom. All rows must have the same length.
    pub grid: Vec<String>,
    /// Trigger-line offsets in tiles, aligned to spike discovery order.
    #[serde(default)]
    pub spike_triggers: Vec<f32>,
    /// Trigger-window lengths in tiles, aligned to spike discovery order.
    /// `None`, zero, or non-finite means the full world height.
    #[serde(default)]
    pub spike_trigger_lengths: Vec<Option<f32>>,
    /// Zone parameters aligned to zone discovery order.
    #[serde(default)]
    pub gravity_zones: Vec<ZoneOverride>,
    /// Disables every gravity zone in the level.
    #[serde(default)]
    pub gravity_locked: bool,
}

impl LevelDef {
    /// Build a level from grid rows with no overrides.
    pub fn from_rows(name: &str, rows: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            grid: rows.iter().map(|r| (*r).to_string()).collect(),
            spike_triggers: Vec::new(),
            spike_trigger_lengths: Vec::new(),
            gravity_zones: Vec::new(),
            gravity_locked: false,
        }
    }

    /// Grid width in cells.
    pub fn columns(&self) -> usize {
        self.grid.first().map_or(0, |r| r.chars().count())
    }

    pub fn rows(&self) -> usize {
        self.grid.len()
    }

    /// Reject empty or ragged grids instead of loading a truncated level.
    pub fn validate(&self) -> Result<(), LevelError> {
        let expected = self.columns();
        if expected == 0 {
            return Err(LevelError::EmptyGrid {
                level: self.name.clone(),
            });
        }
        for (row, line) in self.grid.iter().enumerate() {
            let found = line.chars().count();
            if found != expected {
                return Err(LevelError::RaggedRow {
                    level: self.name.clone(),
                    row,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// A named, ordered group of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDef {
    pub name: String,
    /// Zone parameters shared by every level in the chapter, by discovery order.
    #[serde(default)]
    pub gravity_zones: Vec<ZoneOverride>,
    #[serde(default, rename = "level")]
    pub levels: Vec<LevelDef>,
}

/// Position of a level inside a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCursor {
    pub chapter: usize,
    pub level: usize,
    pub global: usize,
}

/// Every chapter the game ships with, in play order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelPack {
    #[serde(default, rename = "chapter")]
    pub chapters: Vec<ChapterDef>,
}

impl LevelPack {
    /// The pack bundled with the crate.
    pub fn builtin() -> Result<Self, LevelError> {
        Self::from_toml_str(BUILTIN_PACK)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LevelError> {
        let pack: LevelPack =
            toml::from_str(content).map_err(|e| LevelError::Pack(e.to_string()))?;
        pack.validate()?;
        Ok(pack)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LevelError::Pack(format!("{}: {e}", path.display())))?;
        let pack = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded level pack {} ({} chapters, {} levels)",
            path.display(),
            pack.chapters.len(),
            pack.level_count()
        );
        Ok(pack)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        self.chapters
            .iter()
            .flat_map(|c| c.levels.iter())
            .try_for_each(LevelDef::validate)
    }

    pub fn level_count(&self) -> usize {
        self.chapters.iter().map(|c| c.levels.len()).sum()
    }

    /// Resolve a global level index to its chapter and in-chapter position.
    pub fn locate(&self, global: usize) -> Result<LevelCursor, LevelError> {
        let mut first = 0;
        for (chapter, c) in self.chapters.iter().enumerate() {
            if global < first + c.levels.len() {
                return Ok(LevelCursor {
                    chapter,
                    level: global - first,
                    global,
                });
            }
            first += c.levels.len();
        }
        Err(LevelError::UnknownLevel(global))
    }

    pub fn chapter(&self, cursor: LevelCursor) -> &ChapterDef {
        &self.chapters[cursor.chapter]
    }

    pub fn level(&self, cursor: LevelCursor) -> &LevelDef {
        &self.chapters[cursor.chapter].levels[cursor.level]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chapter_pack() -> LevelPack {
        LevelPack {
            chapters: vec![
                ChapterDef {
                    name: "One".to_string(),
                    gravity_zones: Vec::new(),
                    levels: vec![
                        LevelDef::from_rows("1-1", &["S.D", "###"]),
                        LevelDef::from_rows("1-2", &["S.D", "###"]),
                    ],
                },
                ChapterDef {
                    name: "Two".to_string(),
                    gravity_zones: Vec::new(),
                    levels: vec![LevelDef::from_rows("2-1", &["S.D", "###"])],
                },
            ],
        }
    }

    #[test]
    fn ragged_row_is_rejected() {
        let level = LevelDef::from_rows("bad", &["S..D", "###"]);
        assert_eq!(
            level.validate(),
            Err(LevelError::RaggedRow {
                level: "bad".to_string(),
                row: 1,
                expected: 4,
                found: 3,
            })
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        let level = LevelDef::from_rows("void", &[]);
        assert!(matches!(level.validate(), Err(LevelError::EmptyGrid { .. })));
        let blank = LevelDef::from_rows("blank", &[""]);
        assert!(matches!(blank.validate(), Err(LevelError::EmptyGrid { .. })));
    }

    #[test]
    fn locate_walks_chapters() {
        let pack = two_chapter_pack();
        assert_eq!(pack.level_count(), 3);
        let c = pack.locate(2).unwrap();
        assert_eq!((c.chapter, c.level, c.global), (1, 0, 2));
        assert_eq!(pack.level(c).name, "2-1");
        assert_eq!(pack.locate(3), Err(LevelError::UnknownLevel(3)));
    }

    #[test]
    fn toml_pack_parses_overrides() {
        let pack = LevelPack::from_toml_str(
            r########"
            [[chapter]]
            name = "Test"
            gravity_zones = [{ kind = "toggle", cooldown = 2.0 }]

            [[chapter.level]]
            name = "t"
            grid = ["S.2D", "####"]
            spike_triggers = [1.5]
            spike_trigger_lengths = [2.0]
            gravity_zones = [{}, { one_shot = true }]
            "########,
        )
        .unwrap();
        let level = &pack.chapters[0].levels[0];
        assert_eq!(level.spike_triggers, vec![1.5]);
        assert_eq!(level.spike_trigger_lengths, vec![Some(2.0)]);
        assert_eq!(level.gravity_zones[1].one_shot, Some(true));
        assert_eq!(pack.chapters[0].gravity_zones[0].kind, Some(ZoneKind::Toggle));
        assert!(!level.gravity_locked);
    }

    #[test]
    fn toml_pack_with_ragged_level_fails() {
        let err = LevelPack::from_toml_str(
            r########"
            [[chapter]]
            name = "Broken"
            [[chapter.level]]
            name = "b"
            grid = ["S..D", "##"]
            "########,
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn malformed_toml_is_pack_error() {
        assert!(matches!(
            LevelPack::from_toml_str("[[chapter]\nname ="),
            Err(LevelError::Pack(_))
        ));
    }

    #[test]
    fn builtin_pack_is_valid() {
        let pack = LevelPack::builtin().unwrap();
        assert!(pack.level_count() >= 4);
        assert!(pack.chapters.len() >= 2);
    }
}
