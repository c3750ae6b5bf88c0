/// YCbCr (BT.601 video range) to RGBA colour decoding.
use crate::buffer::{BufferError, PlanarBuffer, PlanarBufferView, PixelBuffer};
use bevy_math::Vec4;

const LUMA_OFFSET: f32 = 16.0;
const CHROMA_OFFSET: f32 = 128.0;

const LUMA_SCALE: f32 = 1.164;
const CR_TO_RED: f32 = 1.596;
const CB_TO_GREEN: f32 = 0.392;
const CR_TO_GREEN: f32 = 0.813;
const CB_TO_BLUE: f32 = 2.017;

const LUMA_PLANE: usize = 0;
const CHROMA_PLANE: usize = 1;

/// Convert one luma/chroma triple to normalised RGBA with opaque alpha.
/// Out-of-range results are clamped, never rejected.
pub fn decode(y_sample: u8, cb_sample: u8, cr_sample: u8) -> Vec4 {
    let y = f32::from(y_sample) - LUMA_OFFSET;
    let cb = f32::from(cb_sample) - CHROMA_OFFSET;
    let cr = f32::from(cr_sample) - CHROMA_OFFSET;

    let r = LUMA_SCALE * y + CR_TO_RED * cr;
    let g = LUMA_SCALE * y - CB_TO_GREEN * cb - CR_TO_GREEN * cr;
    let b = LUMA_SCALE * y + CB_TO_BLUE * cb;

    Vec4::new(normalize(r), normalize(g), normalize(b), 1.0)
}

fn normalize(channel: f32) -> f32 {
    channel.clamp(0.0, 255.0) / 255.0
}

/// Colour lookups over a locked bi-planar 4:2:0 image (luma + interleaved CbCr).
pub struct YCbCrView<'a, B: PlanarBuffer + ?Sized = PixelBuffer> {
    view: PlanarBufferView<'a, B>,
}

impl<'a, B: PlanarBuffer + ?Sized> YCbCrView<'a, B> {
    pub fn new(buffer: &'a B) -> Result<Self, BufferError> {
        Ok(Self {
            view: PlanarBufferView::new(buffer, 2)?,
        })
    }

    pub fn width(&self) -> usize {
        self.view.width()
    }

    pub fn height(&self) -> usize {
        self.view.height()
    }

    /// Decoded colour at full-resolution pixel `(x, y)`.
    pub fn color(&self, x: usize, y: usize) -> Result<Vec4, BufferError> {
        let luma = self.view.sample::<u8>(LUMA_PLANE, x, y)?;
        let [cb, cr] = self.view.sample::<[u8; 2]>(CHROMA_PLANE, x / 2, y / 2)?;
        Ok(decode(luma, cb, cr))
    }
}
