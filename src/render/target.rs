use crate::error::PipelineError;

/// Logical size of the render target plus its device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTargetState {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
}

impl RenderTargetState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_density: 1.0,
        }
    }

    pub fn with_density(mut self, pixel_density: f32) -> Self {
        self.pixel_density = pixel_density;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.pixel_density.is_finite() && self.pixel_density > 0.0) {
            return Err(PipelineError::InvalidDensity(self.pixel_density));
        }
        let (w, h) = self.physical_size();
        if self.width == 0 || self.height == 0 || w == 0 || h == 0 {
            return Err(PipelineError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Size in device pixels: `round(width * density) x round(height * density)`.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f64 * self.pixel_density as f64).round() as u32;
        (scale(self.width), scale(self.height))
    }
}

/// Non-premultiplied sRGB RGBA8 pixels, rows top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub(crate) fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// `len` copies of `value`, or `PipelineError::Allocation` if the memory is not there.
pub(crate) fn try_filled<T: Clone>(
    what: &'static str,
    (width, height): (u32, u32),
    len: usize,
    value: T,
) -> Result<Vec<T>, PipelineError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| PipelineError::Allocation {
            what,
            width,
            height,
            source,
        })?;
    buf.resize(len, value);
    Ok(buf)
}
