use glam::Vec3;
use log::debug;
use rayon::prelude::*;

use crate::camera::CameraFrame;
use crate::color::encode_srgb8;
use crate::error::PipelineError;
use crate::render::postfx::{BloomChain, BloomSettings, VignetteSettings, apply_vignette};
use crate::render::raster::{prepare, rasterize, supported_sample_count};
use crate::render::shading::ShadingContext;
use crate::render::target::{PixelBuffer, RenderTargetState, try_filled};
use crate::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    pub bloom: BloomSettings,
    pub vignette: VignetteSettings,
    /// Multisample count: 1, 2, 4 or 8.
    pub samples: u32,
    /// Rows per raster band.
    pub band_height: u32,
    /// Largest physical width or height the target may take.
    pub max_dimension: u32,
    /// Keep the last frame readable after it has been presented.
    pub preserve_drawing_buffer: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            bloom: BloomSettings::default(),
            vignette: VignetteSettings::default(),
            samples: 4,
            band_height: 64,
            max_dimension: 8192,
            preserve_drawing_buffer: true,
        }
    }
}

/// Frame buffers sized for one physical target size.
struct Buffers {
    size: (u32, u32),
    hdr: Vec<Vec3>,
    rgba: Vec<u8>,
    bloom: BloomChain,
}

impl Buffers {
    fn allocate(settings: &PipelineSettings, (width, height): (u32, u32)) -> Result<Self, PipelineError> {
        let pixels = width as usize * height as usize;
        Ok(Self {
            size: (width, height),
            hdr: try_filled("colour buffer", (width, height), pixels, Vec3::ZERO)?,
            rgba: try_filled("output buffer", (width, height), pixels * 4, 0u8)?,
            bloom: BloomChain::allocate(&settings.bloom, width, height)?,
        })
    }
}

/// Owns the render target and runs scene rendering plus post-processing into it.
pub struct RenderPipeline {
    settings: PipelineSettings,
    state: RenderTargetState,
    buffers: Option<Buffers>,
    frame_ready: bool,
    allocations: usize,
    /// While set, every buffer allocation fails as if memory ran out.
    #[cfg(test)]
    pub(crate) fail_allocations: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl RenderPipeline {
    pub fn new(settings: PipelineSettings, state: RenderTargetState) -> Result<Self, PipelineError> {
        if !supported_sample_count(settings.samples) {
            return Err(PipelineError::UnsupportedSamples(settings.samples));
        }
        if settings.band_height == 0 {
            return Err(PipelineError::InvalidBandHeight);
        }
        let mut pipeline = Self {
            settings,
            state,
            buffers: None,
            frame_ready: false,
            allocations: 0,
            #[cfg(test)]
            fail_allocations: Default::default(),
        };
        pipeline.apply_state(state)?;
        Ok(pipeline)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn target_state(&self) -> RenderTargetState {
        self.state
    }

    pub fn physical_size(&self) -> (u32, u32) {
        self.state.physical_size()
    }

    pub fn preserves_drawing_buffer(&self) -> bool {
        self.settings.preserve_drawing_buffer
    }

    /// Physical size the internal buffers are currently allocated for.
    pub fn buffer_dimensions(&self) -> Option<(u32, u32)> {
        self.buffers.as_ref().map(|b| b.size)
    }

    pub fn bloom_dimensions(&self) -> Vec<(u32, u32)> {
        self.buffers
            .as_ref()
            .map(|b| b.bloom.dimensions())
            .unwrap_or_default()
    }

    /// Number of times the frame buffers have been (re)allocated.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        self.apply_state(RenderTargetState {
            width,
            height,
            ..self.state
        })
    }

    pub fn set_pixel_density(&mut self, pixel_density: f32) -> Result<(), PipelineError> {
        self.apply_state(self.state.with_density(pixel_density))
    }

    /// Moves the target to `state`, resizing buffers when the physical size changes.
    ///
    /// On error the previous state is kept, but its buffers may have been released;
    /// they are reallocated by the next successful `apply_state` or `render`.
    pub fn apply_state(&mut self, state: RenderTargetState) -> Result<(), PipelineError> {
        state.validate()?;
        let (width, height) = state.physical_size();
        let max = self.settings.max_dimension;
        if width > max || height > max {
            return Err(PipelineError::ExceedsMaxDimension { width, height, max });
        }
        self.resize_buffers((width, height))?;
        self.state = state;
        Ok(())
    }

    fn resize_buffers(&mut self, size: (u32, u32)) -> Result<(), PipelineError> {
        if self.buffers.as_ref().is_some_and(|b| b.size == size) {
            return Ok(());
        }
        // release first so two full-size targets never coexist
        self.buffers = None;
        self.frame_ready = false;
        #[cfg(test)]
        if self.fail_allocations.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(refused_allocation(size));
        }
        let buffers = Buffers::allocate(&self.settings, size)?;
        self.allocations += 1;
        debug!(
            "render buffers allocated at {}x{} (bloom levels {:?})",
            size.0,
            size.1,
            buffers.bloom.dimensions()
        );
        self.buffers = Some(buffers);
        Ok(())
    }

    /// Renders `scene` at the current target size, glyph animation sampled at `time`.
    pub fn render(&mut self, scene: &Scene, camera: &CameraFrame, time: f32) -> Result<(), PipelineError> {
        let size = self.physical_size();
        self.resize_buffers(size)?;
        let (width, height) = size;
        let settings = self.settings;
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(PipelineError::NoFrame);
        };

        let frame = prepare(scene.draw_items(time), camera, width, height, settings.band_height);
        let ctx = ShadingContext {
            lights: scene.lights(),
            environment: scene.environment(),
            view_dir: -camera.forward(),
        };
        rasterize(
            &frame,
            &ctx,
            &mut buffers.hdr,
            size,
            settings.samples,
            settings.band_height,
            scene.background(),
        )?;

        buffers.bloom.apply(&settings.bloom, &mut buffers.hdr, width, height);
        apply_vignette(&settings.vignette, &mut buffers.hdr, width, height);

        buffers
            .rgba
            .par_chunks_mut(4)
            .zip(buffers.hdr.par_iter())
            .for_each(|(px, &c)| {
                let [r, g, b] = encode_srgb8(c);
                px.copy_from_slice(&[r, g, b, 255]);
            });

        self.frame_ready = true;
        Ok(())
    }

    /// Resizes to `width x height` at density 1, renders and reads the frame back.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &CameraFrame,
        time: f32,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, PipelineError> {
        self.apply_state(RenderTargetState::new(width, height))?;
        self.render(scene, camera, time)?;
        self.read_pixels()
    }

    /// The last rendered frame, for presentation. Always available once a frame exists.
    pub fn frame_rgba(&self) -> Option<&[u8]> {
        match &self.buffers {
            Some(b) if self.frame_ready => Some(&b.rgba),
            _ => None,
        }
    }

    /// Copies the last frame out. Needs a drawing buffer that is preserved after presentation.
    pub fn read_pixels(&self) -> Result<PixelBuffer, PipelineError> {
        if !self.settings.preserve_drawing_buffer {
            return Err(PipelineError::ReadbackUnavailable);
        }
        let (Some(buffers), true) = (&self.buffers, self.frame_ready) else {
            return Err(PipelineError::NoFrame);
        };
        let (width, height) = buffers.size;
        let mut data = Vec::new();
        data.try_reserve_exact(buffers.rgba.len())
            .map_err(|source| PipelineError::Allocation {
                what: "readback buffer",
                width,
                height,
                source,
            })?;
        data.extend_from_slice(&buffers.rgba);
        Ok(PixelBuffer::new(width, height, data))
    }
}

#[cfg(test)]
fn refused_allocation((width, height): (u32, u32)) -> PipelineError {
    let source = match Vec::<u8>::new().try_reserve_exact(usize::MAX) {
        Err(e) => e,
        Ok(()) => unreachable!("reserving usize::MAX bytes cannot succeed"),
    };
    PipelineError::Allocation {
        what: "colour buffer",
        width,
        height,
        source,
    }
}
