//! Banded multisample rasterizer.
//!
//! The frame is split into horizontal bands that are rendered independently in
//! parallel. Each band owns its own sample buffers, so peak multisample memory
//! is bounded by `band_height * width * samples` per worker.

use glam::{Mat3, Vec2, Vec3};
use rayon::prelude::*;

use crate::camera::CameraFrame;
use crate::error::PipelineError;
use crate::render::shading::{ShadingContext, shade};
use crate::render::target::try_filled;
use crate::scene::{DrawItem, Material};

/// Sub-pixel sample offsets in 1/16 pixel, relative to the pixel centre.
fn sample_pattern(samples: u32) -> &'static [(i8, i8)] {
    match samples {
        1 => &[(0, 0)],
        2 => &[(4, 4), (-4, -4)],
        4 => &[(-2, -6), (6, -2), (-6, 2), (2, 6)],
        _ => &[
            (1, -3),
            (-1, 3),
            (5, 1),
            (-3, -5),
            (-5, 5),
            (-7, -1),
            (3, 7),
            (7, -7),
        ],
    }
}

pub fn supported_sample_count(samples: u32) -> bool {
    matches!(samples, 1 | 2 | 4 | 8)
}

/// A triangle in screen space with the world attributes needed for shading.
pub struct ScreenTriangle<'a> {
    /// x, y in pixels (y down) and depth in [0, 1].
    screen: [Vec3; 3],
    world: [Vec3; 3],
    normals: [Vec3; 3],
    material: &'a Material,
    inv_area: f32,
    min: Vec2,
    max: Vec2,
}

fn edge(a: Vec3, b: Vec3, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Draw items flattened into screen-space triangles and binned per band.
pub struct PreparedFrame<'a> {
    triangles: Vec<ScreenTriangle<'a>>,
    opaque_bins: Vec<Vec<u32>>,
    transparent_bins: Vec<Vec<u32>>,
}

impl<'a> PreparedFrame<'a> {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Projects and culls every draw item for a `width x height` target.
///
/// Transparent items are ordered back to front by their centre's view depth.
pub fn prepare<'a>(
    items: Vec<DrawItem<'a>>,
    camera: &CameraFrame,
    width: u32,
    height: u32,
    band_height: u32,
) -> PreparedFrame<'a> {
    let view_proj = camera.view_projection_matrix();
    let forward = camera.forward();

    let (mut transparent, opaque): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|item| item.material.is_transparent());

    let depth_of = |item: &DrawItem<'_>| {
        let centre = item
            .mesh
            .bounds()
            .map(|(lo, hi)| (lo + hi) * 0.5)
            .unwrap_or(Vec3::ZERO);
        (item.transform.transform_point3(centre) - camera.position).dot(forward)
    };
    transparent.sort_by(|a, b| depth_of(b).total_cmp(&depth_of(a)));

    let to_screen = |world: Vec3| {
        let ndc = view_proj.project_point3(world);
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
            ndc.z,
        )
    };

    let project_item = |item: &DrawItem<'a>| -> Vec<ScreenTriangle<'a>> {
        let normal_m = Mat3::from_mat4(item.transform).inverse().transpose();
        let world: Vec<Vec3> = item
            .mesh
            .positions
            .iter()
            .map(|&p| item.transform.transform_point3(p))
            .collect();
        let screen: Vec<Vec3> = world.iter().map(|&p| to_screen(p)).collect();
        let normals: Vec<Vec3> = item
            .mesh
            .normals
            .iter()
            .map(|&n| (normal_m * n).normalize_or_zero())
            .collect();

        item.mesh
            .triangles()
            .filter_map(|[a, b, c]| {
                let s = [screen[a], screen[b], screen[c]];
                let area = edge(s[0], s[1], s[2].truncate());
                if area == 0.0 || !area.is_finite() {
                    return None;
                }
                // y is flipped on screen, so counter-clockwise front faces come out negative
                let back_facing = area > 0.0;
                if back_facing && !item.material.double_sided {
                    return None;
                }
                let min = s[0].truncate().min(s[1].truncate()).min(s[2].truncate());
                let max = s[0].truncate().max(s[1].truncate()).max(s[2].truncate());
                if max.x < 0.0 || max.y < 0.0 || min.x >= width as f32 || min.y >= height as f32 {
                    return None;
                }
                let flip = if back_facing { -1.0 } else { 1.0 };
                Some(ScreenTriangle {
                    screen: s,
                    world: [world[a], world[b], world[c]],
                    normals: [normals[a] * flip, normals[b] * flip, normals[c] * flip],
                    material: item.material,
                    inv_area: 1.0 / area,
                    min,
                    max,
                })
            })
            .collect()
    };

    let opaque_tris: Vec<ScreenTriangle<'a>> = opaque.par_iter().flat_map_iter(project_item).collect();
    let transparent_tris: Vec<ScreenTriangle<'a>> =
        transparent.par_iter().flat_map_iter(project_item).collect();

    let bands = height.div_ceil(band_height) as usize;
    let mut opaque_bins = vec![Vec::new(); bands];
    let mut transparent_bins = vec![Vec::new(); bands];

    let mut triangles = opaque_tris;
    let split = triangles.len();
    triangles.extend(transparent_tris);

    for (i, tri) in triangles.iter().enumerate() {
        let first = (tri.min.y.max(0.0) as u32 / band_height) as usize;
        let last = ((tri.max.y.max(0.0) as u32).min(height - 1) / band_height) as usize;
        let bins = if i < split {
            &mut opaque_bins
        } else {
            &mut transparent_bins
        };
        for bin in &mut bins[first..=last.min(bands - 1)] {
            bin.push(i as u32);
        }
    }

    PreparedFrame {
        triangles,
        opaque_bins,
        transparent_bins,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Blend {
    Replace,
    Over,
}

struct Band<'b> {
    y0: u32,
    rows: u32,
    width: u32,
    pattern: &'static [(i8, i8)],
    color: &'b mut [Vec3],
    depth: &'b mut [f32],
}

impl Band<'_> {
    fn draw(&mut self, tri: &ScreenTriangle<'_>, ctx: &ShadingContext<'_>, blend: Blend) {
        let spp = self.pattern.len();
        let x0 = tri.min.x.floor().max(0.0) as u32;
        let x1 = (tri.max.x.ceil() as u32).min(self.width);
        let y0 = (tri.min.y.floor().max(self.y0 as f32)) as u32;
        let y1 = (tri.max.y.ceil() as u32).min(self.y0 + self.rows);

        let [a, b, c] = tri.screen;
        for y in y0..y1 {
            for x in x0..x1 {
                let base = ((y - self.y0) * self.width + x) as usize * spp;
                let mut covered = 0u32;
                let mut centroid = Vec2::ZERO;
                let mut depths = [0.0f32; 8];

                for (s, &(ox, oy)) in self.pattern.iter().enumerate() {
                    let p = Vec2::new(
                        x as f32 + 0.5 + ox as f32 / 16.0,
                        y as f32 + 0.5 + oy as f32 / 16.0,
                    );
                    let w0 = edge(b, c, p) * tri.inv_area;
                    let w1 = edge(c, a, p) * tri.inv_area;
                    let w2 = edge(a, b, p) * tri.inv_area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let z = w0 * a.z + w1 * b.z + w2 * c.z;
                    if !(0.0..=1.0).contains(&z) || z >= self.depth[base + s] {
                        continue;
                    }
                    depths[s] = z;
                    covered |= 1 << s;
                    centroid += p;
                }

                if covered == 0 {
                    continue;
                }
                centroid /= covered.count_ones() as f32;

                let w0 = edge(b, c, centroid) * tri.inv_area;
                let w1 = edge(c, a, centroid) * tri.inv_area;
                let w2 = edge(a, b, centroid) * tri.inv_area;
                let position = tri.world[0] * w0 + tri.world[1] * w1 + tri.world[2] * w2;
                let normal = tri.normals[0] * w0 + tri.normals[1] * w1 + tri.normals[2] * w2;
                let shaded = shade(ctx, tri.material, position, normal);

                for s in 0..spp {
                    if covered & (1 << s) == 0 {
                        continue;
                    }
                    let slot = base + s;
                    match blend {
                        Blend::Replace => {
                            self.color[slot] = shaded.color;
                            self.depth[slot] = depths[s];
                        }
                        Blend::Over => {
                            self.color[slot] =
                                shaded.color * shaded.alpha + self.color[slot] * (1.0 - shaded.alpha);
                        }
                    }
                }
            }
        }
    }
}

/// Rasterizes `frame` into `output` (one linear colour per pixel, rows top to bottom).
pub fn rasterize(
    frame: &PreparedFrame<'_>,
    ctx: &ShadingContext<'_>,
    output: &mut [Vec3],
    (width, height): (u32, u32),
    samples: u32,
    band_height: u32,
    clear: Vec3,
) -> Result<(), PipelineError> {
    let pattern = sample_pattern(samples);
    let spp = pattern.len();
    let band_len = (width * band_height) as usize;

    output
        .par_chunks_mut(band_len)
        .enumerate()
        .try_for_each(|(band_index, pixels)| {
            let rows = (pixels.len() / width as usize) as u32;
            let n = pixels.len() * spp;
            let mut color = try_filled("multisample colour band", (width, height), n, clear)?;
            let mut depth = try_filled("multisample depth band", (width, height), n, f32::INFINITY)?;

            let mut band = Band {
                y0: band_index as u32 * band_height,
                rows,
                width,
                pattern,
                color: &mut color,
                depth: &mut depth,
            };
            for &t in &frame.opaque_bins[band_index] {
                band.draw(&frame.triangles[t as usize], ctx, Blend::Replace);
            }
            for &t in &frame.transparent_bins[band_index] {
                band.draw(&frame.triangles[t as usize], ctx, Blend::Over);
            }

            for (pixel, samples) in pixels.iter_mut().zip(color.chunks_exact(spp)) {
                *pixel = samples.iter().copied().sum::<Vec3>() / spp as f32;
            }
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::IsometricProjector;
    use crate::geometry::primitives::plane_mesh;
    use crate::scene::Lights;
    use crate::scene::environment::GradientEnvironment;
    use glam::Mat4;

    fn camera() -> CameraFrame {
        IsometricProjector::default().compute_frustum(1.0, 6.0).unwrap()
    }

    fn render(items: Vec<DrawItem<'_>>, size: u32, samples: u32, band: u32) -> Vec<Vec3> {
        let cam = camera();
        let frame = prepare(items, &cam, size, size, band);
        let lights = Lights::studio();
        let env = GradientEnvironment::city();
        let ctx = ShadingContext {
            lights: &lights,
            environment: &env,
            view_dir: -cam.forward(),
        };
        let mut out = vec![Vec3::ZERO; (size * size) as usize];
        rasterize(&frame, &ctx, &mut out, (size, size), samples, band, Vec3::ZERO).unwrap();
        out
    }

    #[test]
    fn unlit_quad_fills_centre() {
        let mesh = plane_mesh(2.0, 2.0).unwrap();
        let mat = Material::unlit(0xffffff, 1.0);
        let items = vec![DrawItem {
            name: "quad",
            mesh: &mesh,
            material: &mat,
            transform: Mat4::from_translation(Vec3::new(0.0, 0.8, 0.0))
                * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4),
        }];
        let out = render(items, 32, 4, 8);
        let centre = out[16 * 32 + 16];
        assert!((centre - Vec3::ONE).length() < 1e-4, "centre {centre}");
        assert_eq!(out[0], Vec3::ZERO);
    }

    #[test]
    fn back_faces_are_culled_unless_double_sided() {
        let mesh = plane_mesh(2.0, 2.0).unwrap();
        let single = Material::unlit(0xffffff, 1.0);
        let double = Material {
            double_sided: true,
            ..single
        };
        // facing away from the camera
        let away = Mat4::from_translation(Vec3::new(0.0, 0.8, 0.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4 + std::f32::consts::PI);
        let hidden = render(
            vec![DrawItem { name: "q", mesh: &mesh, material: &single, transform: away }],
            16,
            1,
            4,
        );
        assert!(hidden.iter().all(|&c| c == Vec3::ZERO));
        let shown = render(
            vec![DrawItem { name: "q", mesh: &mesh, material: &double, transform: away }],
            16,
            1,
            4,
        );
        assert!(shown.iter().any(|&c| c != Vec3::ZERO));
    }

    #[test]
    fn band_height_does_not_change_the_image() {
        let mesh = plane_mesh(2.0, 1.0).unwrap();
        let mat = Material::gold();
        let item = DrawItem {
            name: "q",
            mesh: &mesh,
            material: &mat,
            transform: Mat4::from_rotation_y(0.3),
        };
        let a = render(vec![item], 24, 4, 5);
        let b = render(vec![item], 24, 4, 24);
        assert_eq!(a, b);
    }

    #[test]
    fn sample_counts() {
        for n in [1, 2, 4, 8] {
            assert!(supported_sample_count(n));
            assert_eq!(sample_pattern(n).len(), n as usize);
        }
        assert!(!supported_sample_count(3));
    }
}
