use std::f32::consts::PI;

use glam::Vec3;

use crate::scene::{EnvironmentMap, Lights, Material, Shading};

const DIELECTRIC_F0: f32 = 0.04;
const MAX_SHININESS: f32 = 2048.0;
/// Share of incoming light a fully transmissive surface lets through.
const TRANSMISSION_CLARITY: f32 = 0.6;

pub struct ShadingContext<'a> {
    pub lights: &'a Lights,
    pub environment: &'a dyn EnvironmentMap,
    /// Unit vector from the surface towards the (orthographic) camera.
    pub view_dir: Vec3,
}

/// Linear radiance and coverage alpha of one surface point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shaded {
    pub color: Vec3,
    pub alpha: f32,
}

fn schlick(f0: Vec3, cos_theta: f32) -> Vec3 {
    let k = (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5);
    f0 + (Vec3::ONE - f0) * k
}

fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * i.dot(n) * n
}

pub fn shade(ctx: &ShadingContext<'_>, material: &Material, position: Vec3, normal: Vec3) -> Shaded {
    if material.shading == Shading::Unlit {
        return Shaded {
            color: material.base_color + material.emissive,
            alpha: material.opacity,
        };
    }

    let n = normal.normalize_or_zero();
    let v = ctx.view_dir;
    let n_dot_v = n.dot(v).max(1e-4);

    let f0 = Vec3::splat(DIELECTRIC_F0).lerp(material.base_color, material.metalness);
    let diffuse = material.base_color * (1.0 - material.metalness);

    let a = material.roughness.max(0.03).powi(2);
    let shininess = (2.0 / (a * a) - 2.0).clamp(1.0, MAX_SHININESS);
    let spec_norm = (shininess + 8.0) / (8.0 * PI);

    let mut color = ctx.lights.ambient.color * ctx.lights.ambient.intensity * diffuse;

    for light in ctx.lights.samples(position) {
        let n_dot_l = n.dot(light.direction);
        if n_dot_l <= 0.0 {
            continue;
        }
        let h = (light.direction + v).normalize_or_zero();
        let fresnel = schlick(f0, h.dot(v));
        let spec = fresnel * spec_norm * n.dot(h).max(0.0).powf(shininess);
        color += light.radiance * n_dot_l * (diffuse + spec);
    }

    let r = reflect(-v, n);
    let glossiness = 1.0 - 0.7 * material.roughness;
    let env_fresnel = schlick(f0, n_dot_v);
    color += ctx.environment.radiance(r) * env_fresnel * glossiness;
    color += ctx.environment.radiance(n) * diffuse * 0.3;

    if material.clearcoat > 0.0 {
        let coat = schlick(Vec3::splat(DIELECTRIC_F0), n_dot_v);
        color += ctx.environment.radiance(r) * coat * material.clearcoat;
    }

    color += material.emissive;

    let alpha = if material.is_transparent() {
        let rim = schlick(Vec3::splat(DIELECTRIC_F0), n_dot_v).x;
        (material.opacity * (1.0 - TRANSMISSION_CLARITY * material.transmission) + rim).clamp(0.0, 1.0)
    } else {
        1.0
    };

    Shaded { color, alpha }
}
