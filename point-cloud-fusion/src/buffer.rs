/// Locked planar pixel buffers with bounds-checked typed sampling.
use bytemuck::Pod;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("base address of plane {plane} is unavailable")]
    Unavailable { plane: usize },
    #[error("sample ({x}, {y}) lies outside plane {plane} ({width}x{height})")]
    OutOfBounds {
        plane: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("plane {plane} holds {len} bytes but declares {expected}")]
    Truncated {
        plane: usize,
        len: usize,
        expected: usize,
    },
    #[error("buffer could not be locked for reading")]
    Locked,
}

/// Borrowed view of one plane, only handed out while the buffer is locked.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub width: usize,
    pub height: usize,
    pub bytes_per_row: usize,
    pub bytes: &'a [u8],
}

/// A native pixel buffer made of one or more planes that must be locked before reading.
pub trait PlanarBuffer {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn plane_count(&self) -> usize;
    fn lock_read_only(&self) -> Result<(), BufferError>;
    fn unlock_read_only(&self);
    /// Base address and layout of a plane. `None` when the plane cannot be mapped.
    fn plane(&self, index: usize) -> Option<PlaneRef<'_>>;
}

/// Read lock held for the lifetime of a view; unlocks on every exit path.
struct ReadLock<'a, B: PlanarBuffer + ?Sized> {
    buffer: &'a B,
}

impl<'a, B: PlanarBuffer + ?Sized> ReadLock<'a, B> {
    fn acquire(buffer: &'a B) -> Result<Self, BufferError> {
        buffer.lock_read_only()?;
        Ok(Self { buffer })
    }
}

impl<B: PlanarBuffer + ?Sized> Drop for ReadLock<'_, B> {
    fn drop(&mut self) {
        self.buffer.unlock_read_only();
    }
}

/// Typed read access over a locked planar buffer.
///
/// Plane base addresses are resolved once at construction. Every sample is
/// checked against the plane's declared extent and byte length, so a bad
/// coordinate surfaces as [`BufferError::OutOfBounds`] instead of a stray read.
pub struct PlanarBufferView<'a, B: PlanarBuffer + ?Sized = PixelBuffer> {
    planes: Vec<PlaneRef<'a>>,
    width: usize,
    height: usize,
    _lock: ReadLock<'a, B>,
}

impl<'a, B: PlanarBuffer + ?Sized> PlanarBufferView<'a, B> {
    /// Lock `buffer` and map its first `required_planes` planes.
    ///
    /// Each plane must hold at least `height * bytes_per_row` bytes.
    pub fn new(buffer: &'a B, required_planes: usize) -> Result<Self, BufferError> {
        let lock = ReadLock::acquire(buffer)?;

        let mut planes = Vec::with_capacity(required_planes);
        for index in 0..required_planes {
            // Returning here drops `lock`, which releases the buffer.
            let plane = buffer
                .plane(index)
                .ok_or(BufferError::Unavailable { plane: index })?;
            let expected = plane.height * plane.bytes_per_row;
            if plane.bytes.len() < expected {
                return Err(BufferError::Truncated {
                    plane: index,
                    len: plane.bytes.len(),
                    expected,
                });
            }
            planes.push(plane);
        }

        Ok(Self {
            planes,
            width: buffer.width(),
            height: buffer.height(),
            _lock: lock,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn bytes_per_row(&self, plane: usize) -> Option<usize> {
        self.planes.get(plane).map(|p| p.bytes_per_row)
    }

    /// Extent of a mapped plane; chroma planes report their subsampled size.
    pub fn plane_size(&self, plane: usize) -> Option<(usize, usize)> {
        self.planes.get(plane).map(|p| (p.width, p.height))
    }

    /// Read a `T` at `y * bytes_per_row + x * size_of::<T>()` within `plane`.
    pub fn sample<T: Pod>(&self, plane: usize, x: usize, y: usize) -> Result<T, BufferError> {
        let p = self
            .planes
            .get(plane)
            .ok_or(BufferError::Unavailable { plane })?;

        let out_of_bounds = BufferError::OutOfBounds {
            plane,
            x,
            y,
            width: p.width,
            height: p.height,
        };
        if x >= p.width || y >= p.height {
            return Err(out_of_bounds);
        }

        let size = std::mem::size_of::<T>();
        let offset = y * p.bytes_per_row + x * size;
        let bytes = p.bytes.get(offset..offset + size).ok_or(out_of_bounds)?;

        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

/// One plane of an owned [`PixelBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
}

impl Plane {
    pub fn new(width: usize, height: usize, bytes_per_row: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bytes_per_row,
            data,
        }
    }

    /// Tightly packed plane of `width * height` elements of `T`.
    pub fn packed<T: Pod>(width: usize, height: usize, values: &[T]) -> Self {
        Self::new(
            width,
            height,
            width * std::mem::size_of::<T>(),
            bytemuck::cast_slice(values).to_vec(),
        )
    }
}

/// In-memory planar buffer used for recorded captures and tests.
///
/// Tracks outstanding read locks so callers can verify that every view
/// released its lock.
#[derive(Debug)]
pub struct PixelBuffer {
    planes: Vec<Plane>,
    locks: AtomicUsize,
}

impl PixelBuffer {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self {
            planes,
            locks: AtomicUsize::new(0),
        }
    }

    /// Single-plane 32-bit float depth map.
    pub fn depth(width: usize, height: usize, values: &[f32]) -> Self {
        Self::new(vec![Plane::packed(width, height, values)])
    }

    /// Single-plane 8-bit map such as a confidence buffer.
    pub fn single_u8(width: usize, height: usize, values: &[u8]) -> Self {
        Self::new(vec![Plane::packed(width, height, values)])
    }

    /// Bi-planar 4:2:0 image: full resolution luma, interleaved CbCr at half resolution.
    pub fn nv12(width: usize, height: usize, luma: Vec<u8>, cbcr: Vec<u8>) -> Self {
        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);
        Self::new(vec![
            Plane::new(width, height, width, luma),
            Plane::new(chroma_width, chroma_height, chroma_width * 2, cbcr),
        ])
    }

    /// Number of read locks currently held.
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::Acquire)
    }
}

impl PlanarBuffer for PixelBuffer {
    fn width(&self) -> usize {
        self.planes.first().map_or(0, |p| p.width)
    }

    fn height(&self) -> usize {
        self.planes.first().map_or(0, |p| p.height)
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn lock_read_only(&self) -> Result<(), BufferError> {
        self.locks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn unlock_read_only(&self) {
        self.locks.fetch_sub(1, Ordering::AcqRel);
    }

    fn plane(&self, index: usize) -> Option<PlaneRef<'_>> {
        let plane = self.planes.get(index)?;
        if plane.data.is_empty() {
            return None;
        }
        Some(PlaneRef {
            width: plane.width,
            height: plane.height,
            bytes_per_row: plane.bytes_per_row,
            bytes: &plane.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_respect_row_padding() {
        // 2x2 floats stored with 4 bytes of padding per row.
        let mut data = Vec::new();
        for row in [[1.0f32, 2.0], [3.0, 4.0]] {
            for v in row {
                data.extend_from_slice(&v.to_ne_bytes());
            }
            data.extend_from_slice(&[0xAA; 4]);
        }
        let buffer = PixelBuffer::new(vec![Plane::new(2, 2, 12, data)]);
        let view = PlanarBufferView::new(&buffer, 1).unwrap();

        assert_eq!(view.bytes_per_row(0), Some(12));
        assert_eq!(view.sample::<f32>(0, 0, 0).unwrap(), 1.0);
        assert_eq!(view.sample::<f32>(0, 1, 0).unwrap(), 2.0);
        assert_eq!(view.sample::<f32>(0, 0, 1).unwrap(), 3.0);
        assert_eq!(view.sample::<f32>(0, 1, 1).unwrap(), 4.0);
    }

    #[test]
    fn out_of_bounds_sample_fails_fast() {
        let buffer = PixelBuffer::single_u8(3, 2, &[0, 1, 2, 3, 4, 5]);
        let view = PlanarBufferView::new(&buffer, 1).unwrap();

        assert_eq!(view.sample::<u8>(0, 2, 1), Ok(5));
        assert!(matches!(
            view.sample::<u8>(0, 3, 0),
            Err(BufferError::OutOfBounds { x: 3, y: 0, .. })
        ));
        assert!(matches!(
            view.sample::<u8>(0, 0, 2),
            Err(BufferError::OutOfBounds { .. })
        ));
        assert_eq!(
            view.sample::<u8>(1, 0, 0),
            Err(BufferError::Unavailable { plane: 1 })
        );
    }

    #[test]
    fn truncated_plane_is_rejected_up_front() {
        // Declares 2x2 u16 but only holds three values.
        let buffer = PixelBuffer::new(vec![Plane::new(2, 2, 4, vec![0; 6])]);

        assert_eq!(
            PlanarBufferView::new(&buffer, 1).err(),
            Some(BufferError::Truncated {
                plane: 0,
                len: 6,
                expected: 8,
            })
        );
        assert_eq!(buffer.lock_count(), 0);
    }

    #[test]
    fn narrow_row_stride_still_fails_per_sample() {
        // Four u16 columns squeezed into a 4-byte stride: the data length
        // matches the declared size but the last columns run past the end.
        let buffer = PixelBuffer::new(vec![Plane::new(4, 2, 4, vec![0; 8])]);
        let view = PlanarBufferView::new(&buffer, 1).unwrap();

        assert!(view.sample::<u16>(0, 1, 1).is_ok());
        assert!(matches!(
            view.sample::<u16>(0, 3, 1),
            Err(BufferError::OutOfBounds { x: 3, y: 1, .. })
        ));
    }

    /// A buffer whose lock is always held elsewhere.
    struct ContendedBuffer {
        unlocks: AtomicUsize,
    }

    impl PlanarBuffer for ContendedBuffer {
        fn width(&self) -> usize {
            1
        }

        fn height(&self) -> usize {
            1
        }

        fn plane_count(&self) -> usize {
            1
        }

        fn lock_read_only(&self) -> Result<(), BufferError> {
            Err(BufferError::Locked)
        }

        fn unlock_read_only(&self) {
            self.unlocks.fetch_add(1, Ordering::Relaxed);
        }

        fn plane(&self, _index: usize) -> Option<PlaneRef<'_>> {
            None
        }
    }

    #[test]
    fn failed_lock_is_reported_and_never_unlocked() {
        let buffer = ContendedBuffer {
            unlocks: AtomicUsize::new(0),
        };

        assert!(matches!(
            PlanarBufferView::new(&buffer, 1),
            Err(BufferError::Locked)
        ));
        assert_eq!(buffer.unlocks.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let buffer = PixelBuffer::depth(1, 1, &[0.5]);
        {
            let view = PlanarBufferView::new(&buffer, 1).unwrap();
            assert_eq!(buffer.lock_count(), 1);
            let _ = view.sample::<f32>(0, 5, 5);
            assert_eq!(buffer.lock_count(), 1);
        }
        assert_eq!(buffer.lock_count(), 0);
    }

    #[test]
    fn lock_is_released_when_a_plane_is_missing() {
        let buffer = PixelBuffer::new(vec![
            Plane::packed(2, 2, &[1u8, 2, 3, 4]),
            Plane::new(1, 1, 2, Vec::new()),
        ]);

        let result = PlanarBufferView::new(&buffer, 2);
        assert!(matches!(result, Err(BufferError::Unavailable { plane: 1 })));
        assert_eq!(buffer.lock_count(), 0);
    }

    #[test]
    fn nv12_layout_halves_chroma_plane() {
        let buffer = PixelBuffer::nv12(5, 3, vec![16; 15], vec![128; 12]);
        let view = PlanarBufferView::new(&buffer, 2).unwrap();

        assert_eq!(view.width(), 5);
        assert_eq!(view.height(), 3);
        assert_eq!(view.plane_size(1), Some((3, 2)));
        assert_eq!(view.bytes_per_row(1), Some(6));
        assert_eq!(view.sample::<[u8; 2]>(1, 2, 1), Ok([128, 128]));
    }
}
