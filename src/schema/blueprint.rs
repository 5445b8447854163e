//! Blueprint types describing one firework shell.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{CompilerConfig, LaunchDef, StarKind};

/// Shell size class, which fixes the voxel grid resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl ShellSize {
    /// Side length of the cubic voxel grid.
    pub fn resolution(self) -> usize {
        match self {
            ShellSize::Small => 64,
            ShellSize::Medium => 96,
            ShellSize::Large => 128,
        }
    }
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(v: [u8; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Ring-shaped star skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarRing {
    /// Number of sample points requested. Samples outside the unit sphere are dropped.
    pub count: u32,
    /// Ring radius in shell-local units (unit sphere).
    pub radius: f32,
    /// Half-width of the band, both in-plane and out-of-plane.
    pub thickness: f32,
}

impl Default for StarRing {
    fn default() -> Self {
        Self {
            count: 600,
            radius: 0.8,
            thickness: 0.08,
        }
    }
}

/// Flat disc of paper that delays ignition and collimates ejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperDisc {
    pub center: Vec3,
    pub normal: Vec3,
    pub radius: f32,
    /// Non-zero wall identifier written into covered cells.
    pub wall_id: u16,
    /// 0 means "flat delay, no strength scaling".
    pub strength: u8,
}

impl Default for PaperDisc {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            normal: Vec3::Y,
            radius: 0.5,
            wall_id: 1,
            strength: 255,
        }
    }
}

/// Ignition point, in shell-local coordinates within `[-1, 1]^3`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Igniter {
    pub position: Vec3,
    /// Fuse profile tag for the igniter's own cell.
    pub fuse: String,
    /// Time at which this igniter lights (seconds).
    pub start_delay: f32,
}

/// Straight fuse run between two shell-local points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseLine {
    pub start: Vec3,
    pub end: Vec3,
    pub fuse: String,
}

/// Authoring intent for star ejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub base_speed: f32,
    /// 0 = chaotic spread, 1 = perfectly radial.
    pub uniformity: f32,
    /// Relative jitter applied to speed, size and life.
    pub jitter: f32,
    pub life: f32,
    /// Expected air drag at playback.
    pub drag: f32,
    /// Expected wind at playback.
    pub wind: Vec3,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            base_speed: 12.0,
            uniformity: 0.6,
            jitter: 0.1,
            life: 2.2,
            drag: 0.08,
            wind: Vec3::ZERO,
        }
    }
}

/// Profile tags resolved against an optional profile database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTags {
    pub star: String,
    pub palette: String,
    pub scatter: String,
    pub washi: String,
    pub launch: String,
}

/// Complete declarative description of a shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    pub size: ShellSize,
    pub seed: u32,
    pub stars: StarRing,
    pub papers: Vec<PaperDisc>,
    pub igniters: Vec<Igniter>,
    pub fuses: Vec<FuseLine>,
    pub intent: Intent,
    pub palette: Vec<Rgba>,
    /// Visual kind used when no star profile resolves.
    pub star_kind: StarKind,
    /// Launch parameters used when no launch profile resolves.
    pub launch: LaunchDef,
    /// Decorative effect attached to every burst, -1 for none.
    pub effect_id: i32,
    pub tags: ProfileTags,
    pub compiler: CompilerConfig,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            size: ShellSize::Small,
            seed: 1,
            stars: StarRing::default(),
            papers: Vec::new(),
            igniters: vec![Igniter::default()],
            fuses: Vec::new(),
            intent: Intent::default(),
            palette: vec![Rgba::new(255, 180, 80, 255)],
            star_kind: StarKind::Solid,
            launch: LaunchDef::default(),
            effect_id: -1,
            tags: ProfileTags::default(),
            compiler: CompilerConfig::default(),
        }
    }
}

impl Blueprint {
    /// A small peony with a paper cap, used by the CLI's `--example`.
    pub fn example() -> Self {
        Self {
            seed: 12345,
            stars: StarRing {
                count: 1500,
                radius: 0.85,
                thickness: 0.06,
            },
            papers: vec![PaperDisc {
                center: Vec3::new(0.0, 0.45, 0.0),
                normal: Vec3::Y,
                radius: 0.35,
                wall_id: 1,
                strength: 180,
            }],
            fuses: vec![FuseLine {
                start: Vec3::ZERO,
                end: Vec3::new(0.0, -0.6, 0.0),
                fuse: "quickmatch".into(),
            }],
            palette: vec![Rgba::new(255, 90, 60, 255), Rgba::new(80, 160, 255, 255)],
            star_kind: StarKind::Tail,
            ..Default::default()
        }
    }
}
