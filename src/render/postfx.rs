//! Bloom and vignette, applied to the resolved linear frame.

use glam::{Vec2, Vec3};
use rayon::prelude::*;
use serde::Deserialize;

use crate::color::{luminance, smoothstep};
use crate::error::PipelineError;
use crate::render::target::try_filled;

/// Weight of each coarser level when folded back into the finer one.
const UPSAMPLE_RADIUS: f32 = 0.85;
const TENT: [f32; 4] = [0.125, 0.375, 0.375, 0.125];

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub threshold: f32,
    pub smoothing: f32,
    pub intensity: f32,
    pub levels: u32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            smoothing: 0.25,
            intensity: 1.2,
            levels: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct VignetteSettings {
    pub offset: f32,
    pub darkness: f32,
}

impl Default for VignetteSettings {
    fn default() -> Self {
        Self {
            offset: 0.2,
            darkness: 0.6,
        }
    }
}

struct MipLevel {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
}

impl MipLevel {
    fn fetch(&self, x: i64, y: i64) -> Vec3 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    /// Bilinear sample at texel-space coordinates (texel centres on .5).
    fn sample(&self, p: Vec2) -> Vec3 {
        let p = p - 0.5;
        let base = p.floor();
        let f = p - base;
        let (x, y) = (base.x as i64, base.y as i64);
        let top = self.fetch(x, y).lerp(self.fetch(x + 1, y), f.x);
        let bottom = self.fetch(x, y + 1).lerp(self.fetch(x + 1, y + 1), f.x);
        top.lerp(bottom, f.y)
    }
}

/// Half-resolution mip chain used by bloom. Sized once per target size.
pub struct BloomChain {
    levels: Vec<MipLevel>,
}

fn mip_sizes(width: u32, height: u32, levels: u32) -> Vec<(u32, u32)> {
    let mut sizes = Vec::new();
    let (mut w, mut h) = (width, height);
    while (sizes.len() as u32) < levels && (w > 1 || h > 1) {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        sizes.push((w, h));
    }
    sizes
}

impl BloomChain {
    pub fn allocate(settings: &BloomSettings, width: u32, height: u32) -> Result<Self, PipelineError> {
        let levels = mip_sizes(width, height, settings.levels)
            .into_iter()
            .map(|(w, h)| {
                Ok(MipLevel {
                    width: w,
                    height: h,
                    texels: try_filled("bloom mip level", (width, height), (w * h) as usize, Vec3::ZERO)?,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(Self { levels })
    }

    pub fn dimensions(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|l| (l.width, l.height)).collect()
    }

    /// Extracts bright regions of `frame`, blurs them down and up the chain and adds them back.
    pub fn apply(&mut self, settings: &BloomSettings, frame: &mut [Vec3], width: u32, height: u32) {
        if self.levels.is_empty() || settings.intensity <= 0.0 {
            return;
        }

        let lo = settings.threshold;
        let hi = settings.threshold + settings.smoothing;
        let frame_ro: &[Vec3] = frame;
        let fetch_frame = |x: i64, y: i64| {
            let x = x.clamp(0, width as i64 - 1) as usize;
            let y = y.clamp(0, height as i64 - 1) as usize;
            let c = frame_ro[y * width as usize + x];
            c * smoothstep(lo, hi, luminance(c))
        };
        downsample_into(&mut self.levels[0], fetch_frame);

        for i in 1..self.levels.len() {
            let (done, rest) = self.levels.split_at_mut(i);
            let src = &done[i - 1];
            downsample_into(&mut rest[0], |x, y| src.fetch(x, y));
        }

        for i in (1..self.levels.len()).rev() {
            let (finer, coarser) = self.levels.split_at_mut(i);
            let dst = &mut finer[i - 1];
            let src = &coarser[0];
            let (dw, dh) = (dst.width as f32, dst.height as f32);
            dst.texels
                .par_chunks_mut(dst.width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, t) in row.iter_mut().enumerate() {
                        let uv = Vec2::new((x as f32 + 0.5) / dw, (y as f32 + 0.5) / dh);
                        *t += src.sample(uv * Vec2::new(src.width as f32, src.height as f32))
                            * UPSAMPLE_RADIUS;
                    }
                });
        }

        let top = &self.levels[0];
        let scale = Vec2::new(top.width as f32 / width as f32, top.height as f32 / height as f32);
        frame
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, c) in row.iter_mut().enumerate() {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * scale;
                    *c += top.sample(p) * settings.intensity;
                }
            });
    }
}

/// 2x reduction with a separable [1 3 3 1] tent over each 4x4 footprint.
fn downsample_into(dst: &mut MipLevel, fetch: impl Fn(i64, i64) -> Vec3 + Sync) {
    let width = dst.width as usize;
    dst.texels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, t) in row.iter_mut().enumerate() {
                let (sx, sy) = (2 * x as i64 - 1, 2 * y as i64 - 1);
                let mut acc = Vec3::ZERO;
                for (j, wy) in TENT.iter().enumerate() {
                    for (i, wx) in TENT.iter().enumerate() {
                        acc += fetch(sx + i as i64, sy + j as i64) * (wx * wy);
                    }
                }
                *t = acc;
            }
        });
}

/// Radial darkening: `color *= smoothstep(0.8, offset * 0.799, d * (darkness + offset))`.
pub fn apply_vignette(settings: &VignetteSettings, frame: &mut [Vec3], width: u32, height: u32) {
    let VignetteSettings { offset, darkness } = *settings;
    frame
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) / height as f32;
            for (x, c) in row.iter_mut().enumerate() {
                let u = (x as f32 + 0.5) / width as f32;
                let d = Vec2::new(u - 0.5, v - 0.5).length();
                *c *= smoothstep(0.8, offset * 0.799, d * (darkness + offset));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_halves_until_levels_run_out() {
        let chain = BloomChain::allocate(&BloomSettings::default(), 64, 48).unwrap();
        assert_eq!(
            chain.dimensions(),
            vec![(32, 24), (16, 12), (8, 6), (4, 3), (2, 1), (1, 1)]
        );
        let chain = BloomChain::allocate(
            &BloomSettings {
                levels: 2,
                ..BloomSettings::default()
            },
            64,
            48,
        )
        .unwrap();
        assert_eq!(chain.dimensions(), vec![(32, 24), (16, 12)]);
    }

    #[test]
    fn dark_frames_get_no_bloom() {
        let settings = BloomSettings::default();
        let mut chain = BloomChain::allocate(&settings, 16, 16).unwrap();
        let mut frame = vec![Vec3::splat(0.05); 256];
        chain.apply(&settings, &mut frame, 16, 16);
        assert!(frame.iter().all(|&c| (c - Vec3::splat(0.05)).length() < 1e-6));
    }

    #[test]
    fn bright_spot_bleeds_into_neighbours() {
        let settings = BloomSettings::default();
        let mut chain = BloomChain::allocate(&settings, 32, 32).unwrap();
        let mut frame = vec![Vec3::ZERO; 32 * 32];
        frame[16 * 32 + 16] = Vec3::splat(20.0);
        chain.apply(&settings, &mut frame, 32, 32);
        assert!(frame[16 * 32 + 20].x > 0.0);
        assert!(frame[16 * 32 + 16].x > 20.0);
    }

    #[test]
    fn hard_threshold_stays_finite() {
        let c = Vec3::new(0.6, 0.5, 0.4);
        let settings = BloomSettings {
            threshold: luminance(c),
            smoothing: 0.0,
            ..BloomSettings::default()
        };
        let mut chain = BloomChain::allocate(&settings, 16, 16).unwrap();
        let mut frame = vec![c; 256];
        chain.apply(&settings, &mut frame, 16, 16);
        assert!(frame.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn vignette_darkens_corners_only() {
        let settings = VignetteSettings::default();
        let mut frame = vec![Vec3::ONE; 64 * 64];
        apply_vignette(&settings, &mut frame, 64, 64);
        assert!((frame[32 * 64 + 32] - Vec3::ONE).length() < 1e-3);
        assert!(frame[0].x < 0.9);
    }
}
