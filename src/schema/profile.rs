//! Tag-addressed profile records consumed by the compiler.
//!
//! A [`ProfileDatabase`] is plain authoring data loaded from JSON. Before a
//! compile it is turned into a [`ProfileIndex`], which lowercases every tag
//! once and answers [`ProfileSource::resolve_tag`] lookups without touching
//! strings again in the numeric stages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Rgba;

/// Visual behaviour of a star once it is a live particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum StarKind {
    /// Plain point that fades out.
    #[default]
    Solid = 0,
    /// Short trail from recent positions.
    Tail = 1,
    /// Trail plus a velocity-aligned streak.
    Comet = 2,
    /// Periodic on/off blinking.
    Strobe = 3,
    /// Tick-quantized sparkle.
    Glitter = 4,
    /// Late-life scatter of tiny fragments.
    Crackle = 5,
    /// Late-life four-way split.
    Crossette = 6,
    /// Long drooping trail.
    Willow = 7,
}

impl StarKind {
    /// Every kind, in discriminant order.
    pub const ALL: [StarKind; 8] = [
        StarKind::Solid,
        StarKind::Tail,
        StarKind::Comet,
        StarKind::Strobe,
        StarKind::Glitter,
        StarKind::Crackle,
        StarKind::Crossette,
        StarKind::Willow,
    ];
}

/// Kinematic and visual defaults for one star type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarProfile {
    pub tag: String,
    pub kind: StarKind,
    /// Base ejection speed (shell-local units per second).
    pub base_speed: f32,
    /// Relative speed jitter (0.1 = +/-10%).
    pub speed_jitter: f32,
    pub base_size: f32,
    pub size_jitter: f32,
    /// Base lifetime in seconds.
    pub base_life: f32,
    /// Absolute lifetime jitter in seconds.
    pub life_jitter: f32,
    pub drag: f32,
    pub brightness: f32,
}

impl Default for StarProfile {
    fn default() -> Self {
        Self {
            tag: String::new(),
            kind: StarKind::Solid,
            base_speed: 12.0,
            speed_jitter: 0.1,
            base_size: 0.06,
            size_jitter: 0.01,
            base_life: 2.2,
            life_jitter: 0.3,
            drag: 0.08,
            brightness: 1.0,
        }
    }
}

/// Ordered list of colors addressed by star palette index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteDef {
    pub tag: String,
    pub colors: Vec<Rgba>,
}

/// Burst charge ("waruyaku") parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterDef {
    pub tag: String,
    /// Multiplies both ejection speed and directional spread.
    pub strength: f32,
    /// Overrides the blueprint's uniformity (0-1).
    pub uniformity: f32,
    /// Scales ignition cost of every non-fuse cell.
    pub ignite_cost_multiplier: f32,
}

impl Default for ScatterDef {
    fn default() -> Self {
        Self {
            tag: String::new(),
            strength: 1.0,
            uniformity: 0.5,
            ignite_cost_multiplier: 1.0,
        }
    }
}

/// Paper ("washi") wall parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashiDef {
    pub tag: String,
    /// Ejection delay at full paper strength (seconds).
    pub delay: f32,
    /// Fraction of sideways spread removed at full paper strength.
    pub collimation: f32,
}

impl Default for WashiDef {
    fn default() -> Self {
        Self {
            tag: String::new(),
            delay: 0.08,
            collimation: 0.7,
        }
    }
}

/// Fuse burn parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseDef {
    pub tag: String,
    pub burn_speed: f32,
    pub ignite_cost: f32,
    /// Relative per-cell cost jitter (0.2 = +/-20%).
    pub jitter: f32,
}

impl Default for FuseDef {
    fn default() -> Self {
        Self {
            tag: String::new(),
            burn_speed: 1.0,
            ignite_cost: 0.01,
            jitter: 0.0,
        }
    }
}

/// Mortar launch parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchDef {
    pub tag: String,
    pub speed: f32,
    pub fuse_duration: f32,
    pub gravity_scale: f32,
    pub wind_scale: f32,
    pub drag_scale: f32,
}

impl Default for LaunchDef {
    fn default() -> Self {
        Self {
            tag: String::new(),
            speed: 40.0,
            fuse_duration: 3.0,
            gravity_scale: 1.0,
            wind_scale: 1.0,
            drag_scale: 1.0,
        }
    }
}

/// The record families a tag can resolve into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Star,
    Palette,
    Scatter,
    Washi,
    Fuse,
    Launch,
}

/// Stable index of a record within its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u16);

/// Profile database as authored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDatabase {
    pub stars: Vec<StarProfile>,
    pub palettes: Vec<PaletteDef>,
    pub scatters: Vec<ScatterDef>,
    pub washi: Vec<WashiDef>,
    pub fuses: Vec<FuseDef>,
    pub launches: Vec<LaunchDef>,
}

impl ProfileDatabase {
    /// Parse a database from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(text)?)
    }

    fn tags(&self, kind: RecordKind) -> Vec<&str> {
        match kind {
            RecordKind::Star => self.stars.iter().map(|r| r.tag.as_str()).collect(),
            RecordKind::Palette => self.palettes.iter().map(|r| r.tag.as_str()).collect(),
            RecordKind::Scatter => self.scatters.iter().map(|r| r.tag.as_str()).collect(),
            RecordKind::Washi => self.washi.iter().map(|r| r.tag.as_str()).collect(),
            RecordKind::Fuse => self.fuses.iter().map(|r| r.tag.as_str()).collect(),
            RecordKind::Launch => self.launches.iter().map(|r| r.tag.as_str()).collect(),
        }
    }
}

/// Errors raised while loading a profile database.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to parse profile database: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lookup capability the compiler needs from a profile collaborator.
pub trait ProfileSource {
    /// Resolve a tag case-insensitively.
    ///
    /// An empty or unknown tag falls back to record 0 when the family has any
    /// records, and `None` otherwise.
    fn resolve_tag(&self, kind: RecordKind, tag: &str) -> Option<RecordId>;

    fn star(&self, id: RecordId) -> Option<&StarProfile>;
    fn palette(&self, id: RecordId) -> Option<&PaletteDef>;
    fn scatter(&self, id: RecordId) -> Option<&ScatterDef>;
    fn washi(&self, id: RecordId) -> Option<&WashiDef>;
    fn fuse(&self, id: RecordId) -> Option<&FuseDef>;
    fn launch(&self, id: RecordId) -> Option<&LaunchDef>;
}

/// A database with its tag tables built once per load.
#[derive(Debug, Clone)]
pub struct ProfileIndex {
    db: ProfileDatabase,
    tags: HashMap<(RecordKind, String), RecordId>,
    counts: HashMap<RecordKind, usize>,
}

impl ProfileIndex {
    pub fn new(db: ProfileDatabase) -> Self {
        let mut tags = HashMap::new();
        let mut counts = HashMap::new();

        for kind in [
            RecordKind::Star,
            RecordKind::Palette,
            RecordKind::Scatter,
            RecordKind::Washi,
            RecordKind::Fuse,
            RecordKind::Launch,
        ] {
            let family = db.tags(kind);
            counts.insert(kind, family.len());
            for (i, tag) in family.iter().enumerate().take(u16::MAX as usize + 1) {
                // First record wins on duplicate tags
                tags.entry((kind, tag.to_lowercase()))
                    .or_insert(RecordId(i as u16));
            }
        }

        Self { db, tags, counts }
    }

    /// Visual kind of every star profile, indexed by profile id.
    pub fn kind_table(&self) -> Vec<StarKind> {
        self.db.stars.iter().map(|s| s.kind).collect()
    }
}

impl ProfileSource for ProfileIndex {
    fn resolve_tag(&self, kind: RecordKind, tag: &str) -> Option<RecordId> {
        if self.counts.get(&kind).copied().unwrap_or(0) == 0 {
            return None;
        }
        let key = (kind, tag.trim().to_lowercase());
        Some(self.tags.get(&key).copied().unwrap_or(RecordId(0)))
    }

    fn star(&self, id: RecordId) -> Option<&StarProfile> {
        self.db.stars.get(id.0 as usize)
    }

    fn palette(&self, id: RecordId) -> Option<&PaletteDef> {
        self.db.palettes.get(id.0 as usize)
    }

    fn scatter(&self, id: RecordId) -> Option<&ScatterDef> {
        self.db.scatters.get(id.0 as usize)
    }

    fn washi(&self, id: RecordId) -> Option<&WashiDef> {
        self.db.washi.get(id.0 as usize)
    }

    fn fuse(&self, id: RecordId) -> Option<&FuseDef> {
        self.db.fuses.get(id.0 as usize)
    }

    fn launch(&self, id: RecordId) -> Option<&LaunchDef> {
        self.db.launches.get(id.0 as usize)
    }
}
