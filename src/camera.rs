//! True isometric orthographic camera.
//!
//! Pitch and yaw are fixed; only the frustum extents follow the viewport.

use glam::{Mat4, Vec3};
use serde::Deserialize;

use crate::error::{InvalidParameters, require_positive};

pub const ISOMETRIC_PITCH_DEG: f32 = 35.264;
pub const ISOMETRIC_YAW_DEG: f32 = 45.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraFrame {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() / self.height()
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.position).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct IsometricProjector {
    pub radius: f32,
    pub look_at: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for IsometricProjector {
    fn default() -> Self {
        Self {
            radius: 10.0,
            look_at: Vec3::new(0.0, 0.8, 0.0),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl IsometricProjector {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        require_positive("camera radius", self.radius)?;
        require_positive("near plane", self.near)?;
        require_positive("far plane", self.far)?;
        if self.far <= self.near {
            return Err(InvalidParameters::new(format!(
                "far plane {} must lie beyond near plane {}",
                self.far, self.near
            )));
        }
        if !self.look_at.is_finite() {
            return Err(InvalidParameters::new("look-at target must be finite"));
        }
        Ok(())
    }

    pub fn camera_position(&self) -> Vec3 {
        let pitch = ISOMETRIC_PITCH_DEG.to_radians();
        let yaw = ISOMETRIC_YAW_DEG.to_radians();
        Vec3::new(yaw.cos(), pitch.tan(), yaw.sin()) * self.radius
    }

    /// Frustum for `aspect_ratio = width / height` with vertical extent `zoom_scale`.
    pub fn compute_frustum(
        &self,
        aspect_ratio: f32,
        zoom_scale: f32,
    ) -> Result<CameraFrame, InvalidParameters> {
        require_positive("aspect ratio", aspect_ratio)?;
        require_positive("zoom scale", zoom_scale)?;
        self.validate()?;

        let half_h = zoom_scale / 2.0;
        let half_w = aspect_ratio * zoom_scale / 2.0;
        Ok(CameraFrame {
            left: -half_w,
            right: half_w,
            top: half_h,
            bottom: -half_h,
            near: self.near,
            far: self.far,
            position: self.camera_position(),
            look_at: self.look_at,
        })
    }
}

/// Viewport-bound camera: keeps its frame in step with the viewport shape.
#[derive(Clone, Debug)]
pub struct IsometricCamera {
    projector: IsometricProjector,
    zoom_scale: f32,
    viewport: (u32, u32),
    frame: CameraFrame,
}

impl IsometricCamera {
    pub fn new(
        projector: IsometricProjector,
        zoom_scale: f32,
        width: u32,
        height: u32,
    ) -> Result<Self, InvalidParameters> {
        let frame = projector.compute_frustum(aspect(width, height)?, zoom_scale)?;
        Ok(Self {
            projector,
            zoom_scale,
            viewport: (width, height),
            frame,
        })
    }

    pub fn frame(&self) -> &CameraFrame {
        &self.frame
    }

    pub fn projector(&self) -> &IsometricProjector {
        &self.projector
    }

    pub fn zoom_scale(&self) -> f32 {
        self.zoom_scale
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Recomputes the frustum for a new viewport. Returns whether the aspect changed.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<bool, InvalidParameters> {
        let ratio = aspect(width, height)?;
        self.viewport = (width, height);
        if ratio == self.frame.aspect_ratio() {
            return Ok(false);
        }
        self.frame = self.projector.compute_frustum(ratio, self.zoom_scale)?;
        Ok(true)
    }
}

fn aspect(width: u32, height: u32) -> Result<f32, InvalidParameters> {
    if width == 0 || height == 0 {
        return Err(InvalidParameters::new(format!(
            "viewport must be non-empty, got {width}x{height}"
        )));
    }
    Ok(width as f32 / height as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_follow_aspect() {
        let p = IsometricProjector::default();
        for a in [0.25_f32, 0.75, 1.0, 4.0 / 3.0, 16.0 / 9.0, 3.5] {
            let f = p.compute_frustum(a, 6.0).unwrap();
            assert!((f.width() - a * 6.0).abs() < 1e-4);
            assert!((f.height() - 6.0).abs() < 1e-6);
            assert_eq!(f.left, -f.right);
            assert_eq!(f.bottom, -f.top);
        }
    }

    #[test]
    fn angles_do_not_drift_with_aspect() {
        let p = IsometricProjector::default();
        let a = p.compute_frustum(0.5, 6.0).unwrap();
        let b = p.compute_frustum(2.0, 6.0).unwrap();
        assert_eq!(a.position, b.position);
        assert_eq!(a.view_matrix(), b.view_matrix());

        let pos = a.position;
        let yaw = pos.z.atan2(pos.x).to_degrees();
        assert!((yaw - ISOMETRIC_YAW_DEG).abs() < 1e-3);
        let horizontal = (pos.x * pos.x + pos.z * pos.z).sqrt();
        assert!((pos.y / horizontal - ISOMETRIC_PITCH_DEG.to_radians().tan()).abs() < 1e-4);
    }

    #[test]
    fn unit_cube_axes_foreshorten_equally() {
        let p = IsometricProjector {
            look_at: Vec3::ZERO,
            ..IsometricProjector::default()
        };
        let f = p.compute_frustum(1.0, 6.0).unwrap();
        let view = f.view_matrix();
        let len = |v: Vec3| view.transform_vector3(v).truncate().length();
        let (x, y, z) = (len(Vec3::X), len(Vec3::Y), len(Vec3::Z));
        assert!((x - z).abs() < 1e-4);
        assert!((x - y).abs() < 1e-3, "x={x} y={y}");
    }

    #[test]
    fn camera_recomputes_on_resize() {
        let mut cam = IsometricCamera::new(IsometricProjector::default(), 6.0, 800, 600).unwrap();
        assert!((cam.frame().aspect_ratio() - 800.0 / 600.0).abs() < 1e-5);

        assert!(cam.set_viewport(600, 800).unwrap());
        assert!((cam.frame().width() - 6.0 * 600.0 / 800.0).abs() < 1e-4);
        assert!(!cam.set_viewport(600, 800).unwrap());
        assert!(cam.set_viewport(0, 800).is_err());
    }

    #[test]
    fn rejects_bad_inputs() {
        let p = IsometricProjector::default();
        assert!(p.compute_frustum(0.0, 6.0).is_err());
        assert!(p.compute_frustum(f32::NAN, 6.0).is_err());
        assert!(p.compute_frustum(1.0, -1.0).is_err());
        let inverted = IsometricProjector {
            near: 10.0,
            far: 1.0,
            ..p
        };
        assert!(inverted.compute_frustum(1.0, 6.0).is_err());
    }
}
