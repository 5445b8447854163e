//! Binary encoding of compiled shows.

use glam::Vec3;

use super::{BurstEvent, CompiledShow, LaunchParams, ParticleInit};
use crate::schema::Rgba;

/// Magic bytes of a version 1 show (no launch parameters).
pub const MAGIC_V1: &[u8; 4] = b"HNB1";

/// Magic bytes of a version 2 show.
pub const MAGIC_V2: &[u8; 4] = b"HNB2";

/// Magic(4) + Version(4) + Seed(4) + BurstCount(4) + ParticleCount(4)
pub const HEADER_SIZE: usize = 20;

/// Five f32 launch parameters.
pub const LAUNCH_SIZE: usize = 20;

/// time(4) + position(12) + effect(4) + count(4) + start(4)
pub const BURST_RECORD_SIZE: usize = 28;

/// position(12) + velocity(12) + life(4) + size(4) + color(4) + delay(4) +
/// profile(2) + seed(4)
pub const PARTICLE_RECORD_SIZE: usize = 46;

/// Format revision to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatVersion {
    /// Header, bursts and particles only.
    V1,
    /// Adds launch parameters after the header.
    #[default]
    V2,
}

impl FormatVersion {
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            FormatVersion::V1 => MAGIC_V1,
            FormatVersion::V2 => MAGIC_V2,
        }
    }

    pub fn number(self) -> i32 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
        }
    }
}

/// Reasons a blob fails to decode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("Blob too short: {0} bytes, header needs {HEADER_SIZE}")]
    TooShort(usize),
    #[error("Invalid show magic bytes {0:?}")]
    BadMagic([u8; 4]),
    #[error("Unsupported version {version} for magic {magic:?}")]
    UnsupportedVersion { magic: [u8; 4], version: i32 },
    #[error("Negative {field} count: {value}")]
    NegativeCount { field: &'static str, value: i32 },
    #[error("Truncated blob: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Burst {index} references particles outside the particle array")]
    BurstOutOfRange { index: usize },
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_vec3(out: &mut Vec<u8>, v: Vec3) {
    put_f32(out, v.x);
    put_f32(out, v.y);
    put_f32(out, v.z);
}

/// Encode a show. Version 1 drops the launch parameters.
pub fn encode(show: &CompiledShow, version: FormatVersion) -> Vec<u8> {
    let launch_size = if version == FormatVersion::V2 { LAUNCH_SIZE } else { 0 };
    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + launch_size
            + show.bursts.len() * BURST_RECORD_SIZE
            + show.particles.len() * PARTICLE_RECORD_SIZE,
    );

    out.extend_from_slice(version.magic());
    put_i32(&mut out, version.number());
    out.extend_from_slice(&show.seed.to_le_bytes());
    put_i32(&mut out, show.bursts.len() as i32);
    put_i32(&mut out, show.particles.len() as i32);

    if version == FormatVersion::V2 {
        let l = &show.launch;
        for v in [l.speed, l.fuse_duration, l.gravity_scale, l.wind_scale, l.drag_scale] {
            put_f32(&mut out, v);
        }
    }

    for burst in &show.bursts {
        put_f32(&mut out, burst.time);
        put_vec3(&mut out, burst.position);
        put_i32(&mut out, burst.effect_id);
        put_i32(&mut out, burst.count as i32);
        put_i32(&mut out, burst.start as i32);
    }

    for p in &show.particles {
        put_vec3(&mut out, p.position);
        put_vec3(&mut out, p.velocity);
        put_f32(&mut out, p.life);
        put_f32(&mut out, p.size);
        out.extend_from_slice(&p.color.to_array());
        put_f32(&mut out, p.delay);
        out.extend_from_slice(&p.profile_id.to_le_bytes());
        out.extend_from_slice(&p.seed.to_le_bytes());
    }

    out
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or(FormatError::Truncated {
            needed: N,
            available: self.remaining(),
        })?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn f32(&mut self) -> Result<f32, FormatError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, FormatError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn vec3(&mut self) -> Result<Vec3, FormatError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    fn count(&mut self, field: &'static str) -> Result<usize, FormatError> {
        let value = self.i32()?;
        usize::try_from(value).map_err(|_| FormatError::NegativeCount { field, value })
    }
}

/// Decode a show blob.
///
/// Both magics are accepted; version 1 blobs get default launch parameters.
/// Counts are checked against the blob length before anything is allocated.
pub fn decode(bytes: &[u8]) -> Result<CompiledShow, FormatError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::TooShort(bytes.len()));
    }

    let mut r = Reader::new(bytes);
    let magic: [u8; 4] = r.take()?;
    let has_launch = match &magic {
        m if m == MAGIC_V1 => false,
        m if m == MAGIC_V2 => true,
        _ => return Err(FormatError::BadMagic(magic)),
    };

    let version = r.i32()?;
    let version_ok = if has_launch { version >= 2 } else { version == 1 };
    if !version_ok {
        return Err(FormatError::UnsupportedVersion { magic, version });
    }

    let seed = r.u32()?;
    let burst_count = r.count("burst")?;
    let particle_count = r.count("particle")?;

    let needed = (if has_launch { LAUNCH_SIZE } else { 0 })
        .saturating_add(burst_count.saturating_mul(BURST_RECORD_SIZE))
        .saturating_add(particle_count.saturating_mul(PARTICLE_RECORD_SIZE));
    if needed > r.remaining() {
        return Err(FormatError::Truncated {
            needed,
            available: r.remaining(),
        });
    }

    let launch = if has_launch {
        LaunchParams {
            speed: r.f32()?,
            fuse_duration: r.f32()?,
            gravity_scale: r.f32()?,
            wind_scale: r.f32()?,
            drag_scale: r.f32()?,
        }
    } else {
        LaunchParams::default()
    };

    let mut bursts = Vec::with_capacity(burst_count);
    for index in 0..burst_count {
        let time = r.f32()?;
        let position = r.vec3()?;
        let effect_id = r.i32()?;
        let count = r.count("burst particle")?;
        let start = r.count("burst start")?;
        if start.checked_add(count).is_none_or(|end| end > particle_count) {
            return Err(FormatError::BurstOutOfRange { index });
        }
        bursts.push(BurstEvent {
            time,
            position,
            effect_id,
            count: count as u32,
            start: start as u32,
        });
    }

    let mut particles = Vec::with_capacity(particle_count);
    for _ in 0..particle_count {
        particles.push(ParticleInit {
            position: r.vec3()?,
            velocity: r.vec3()?,
            life: r.f32()?,
            size: r.f32()?,
            color: Rgba::from_array(r.take()?),
            delay: r.f32()?,
            profile_id: r.u16()?,
            seed: r.u32()?,
        });
    }

    if r.remaining() > 0 {
        return Err(FormatError::TrailingBytes(r.remaining()));
    }

    Ok(CompiledShow {
        seed,
        launch,
        bursts,
        particles,
    })
}

/// Fail-closed decode into an existing show.
///
/// On failure the show is reset to empty and `false` is returned.
pub fn decode_into(bytes: &[u8], show: &mut CompiledShow) -> bool {
    match decode(bytes) {
        Ok(decoded) => {
            *show = decoded;
            true
        }
        Err(e) => {
            log::warn!("Rejected show blob: {}", e);
            show.seed = 0;
            show.launch = LaunchParams::default();
            show.bursts.clear();
            show.particles.clear();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_show() -> CompiledShow {
        let particle = |i: u32| ParticleInit {
            position: Vec3::new(0.1 * i as f32, -0.5, 0.25),
            velocity: Vec3::new(3.0, 4.5, -1.0e-3),
            life: 2.5 + i as f32,
            size: 0.07,
            color: Rgba::new(10, 200, 30, 250),
            delay: 0.015 * i as f32,
            profile_id: 6 + i as u16,
            seed: 0xDEAD_BEEF ^ i,
        };
        CompiledShow {
            seed: 12345,
            launch: LaunchParams {
                speed: 55.0,
                fuse_duration: 3.25,
                gravity_scale: 0.9,
                wind_scale: 1.5,
                drag_scale: 0.75,
            },
            bursts: vec![
                BurstEvent {
                    time: 0.0,
                    position: Vec3::new(0.2, 0.0, -0.1),
                    effect_id: -1,
                    count: 2,
                    start: 0,
                },
                BurstEvent {
                    time: 0.4,
                    position: Vec3::new(-0.3, 0.1, 0.6),
                    effect_id: 9,
                    count: 1,
                    start: 2,
                },
            ],
            particles: (0..3).map(particle).collect(),
        }
    }

    #[test]
    fn test_v2_roundtrip() {
        let show = sample_show();
        let bytes = encode(&show, FormatVersion::V2);
        assert_eq!(
            bytes.len(),
            HEADER_SIZE + LAUNCH_SIZE + 2 * BURST_RECORD_SIZE + 3 * PARTICLE_RECORD_SIZE
        );
        assert_eq!(&bytes[..4], MAGIC_V2);
        assert_eq!(decode(&bytes).unwrap(), show);
    }

    #[test]
    fn test_v1_roundtrip_uses_default_launch() {
        let mut show = sample_show();
        let bytes = encode(&show, FormatVersion::V1);
        assert_eq!(&bytes[..4], MAGIC_V1);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.launch, LaunchParams::default());

        show.launch = LaunchParams::default();
        assert_eq!(decoded, show);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample_show(), FormatVersion::V2);
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 12345);
        assert_eq!(i32::from_le_bytes(bytes[12..16].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 3);
        assert_eq!(f32::from_le_bytes(bytes[20..24].try_into().unwrap()), 55.0);
    }

    #[test]
    fn test_short_blob_fails_closed() {
        let mut show = sample_show();
        assert_eq!(decode(&[0u8; 10]), Err(FormatError::TooShort(10)));
        assert!(!decode_into(&[0u8; 10], &mut show));
        assert!(show.bursts.is_empty());
        assert!(show.particles.is_empty());
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut bytes = encode(&sample_show(), FormatVersion::V2);
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(FormatError::BadMagic(_))));

        let mut bytes = encode(&sample_show(), FormatVersion::V1);
        bytes[4..8].copy_from_slice(&2i32.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(FormatError::UnsupportedVersion { version: 2, .. })
        ));
    }

    #[test]
    fn test_truncation_and_trailing_bytes() {
        let bytes = encode(&sample_show(), FormatVersion::V2);
        for cut in [HEADER_SIZE, HEADER_SIZE + 5, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(FormatError::Truncated { .. })),
                "Cut at {} should be truncated",
                cut
            );
        }

        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(decode(&padded), Err(FormatError::TrailingBytes(1)));
    }

    #[test]
    fn test_negative_and_huge_counts() {
        let mut bytes = encode(&sample_show(), FormatVersion::V2);
        bytes[16..20].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(decode(&bytes), Err(FormatError::NegativeCount { .. })));

        bytes[16..20].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn test_burst_range_checked() {
        let mut show = sample_show();
        show.bursts[1].count = 5;
        let bytes = encode(&show, FormatVersion::V2);
        assert_eq!(decode(&bytes), Err(FormatError::BurstOutOfRange { index: 1 }));
    }

    #[test]
    fn test_non_finite_floats_survive() {
        let mut show = sample_show();
        show.particles[0].life = f32::INFINITY;
        show.particles[1].delay = -0.0;
        let decoded = decode(&encode(&show, FormatVersion::V2)).unwrap();
        assert_eq!(decoded.particles[0].life, f32::INFINITY);
        assert!(decoded.particles[1].delay.is_sign_negative());
    }

    fn finite() -> impl Strategy<Value = f32> {
        use proptest::num::f32::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
        POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
    }

    fn vec3() -> impl Strategy<Value = Vec3> {
        (finite(), finite(), finite()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    fn particle_strategy() -> impl Strategy<Value = ParticleInit> {
        (
            (vec3(), vec3(), finite(), finite()),
            (any::<[u8; 4]>(), finite(), any::<u16>(), any::<u32>()),
        )
            .prop_map(|((position, velocity, life, size), (color, delay, profile_id, seed))| {
                ParticleInit {
                    position,
                    velocity,
                    life,
                    size,
                    color: Rgba::from_array(color),
                    delay,
                    profile_id,
                    seed,
                }
            })
    }

    /// Shows whose bursts tile the particle array in order.
    fn show_strategy() -> impl Strategy<Value = CompiledShow> {
        (
            any::<u32>(),
            (finite(), finite(), finite(), finite(), finite()),
            proptest::collection::vec(particle_strategy(), 0..24),
            proptest::collection::vec((finite(), vec3(), any::<i32>(), 0usize..8), 0..8),
        )
            .prop_map(|(seed, (speed, fuse_duration, gravity_scale, wind_scale, drag_scale), particles, raw)| {
                let mut start = 0;
                let bursts = raw
                    .into_iter()
                    .map(|(time, position, effect_id, wanted)| {
                        let count = wanted.min(particles.len() - start);
                        let burst = BurstEvent {
                            time,
                            position,
                            effect_id,
                            count: count as u32,
                            start: start as u32,
                        };
                        start += count;
                        burst
                    })
                    .collect();
                CompiledShow {
                    seed,
                    launch: LaunchParams {
                        speed,
                        fuse_duration,
                        gravity_scale,
                        wind_scale,
                        drag_scale,
                    },
                    bursts,
                    particles,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_roundtrip(show in show_strategy()) {
            let v2 = encode(&show, FormatVersion::V2);
            prop_assert_eq!(decode(&v2), Ok(show.clone()));

            let v1 = encode(&show, FormatVersion::V1);
            prop_assert_eq!(v1.len() + LAUNCH_SIZE, v2.len());
            let expected = CompiledShow {
                launch: LaunchParams::default(),
                ..show
            };
            prop_assert_eq!(decode(&v1), Ok(expected));
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut show = CompiledShow::default();
            if !decode_into(&bytes, &mut show) {
                prop_assert!(show.bursts.is_empty());
                prop_assert!(show.particles.is_empty());
            }
        }

        #[test]
        fn prop_corrupted_header_never_panics(index in 0usize..HEADER_SIZE + LAUNCH_SIZE, value: u8) {
            let mut bytes = encode(&sample_show(), FormatVersion::V2);
            bytes[index] = value;
            let _ = decode(&bytes);
        }
    }
}
