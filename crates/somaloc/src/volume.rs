//! Read-only voxel access for the refinement core.
//!
//! [`VoxelSource`] is the seam between the analysis code and whatever holds
//! the intensities. [`Volume`] is the built-in dense implementation; it can
//! be assembled from per-slice grayscale images.

use std::path::Path;

use image::{ImageBuffer, Luma};

/// Single 16-bit grayscale slice of a volume.
pub type Slice16 = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Random-access intensity volume with anisotropic z sampling.
///
/// Implementations must be immutable for the duration of an analysis; the
/// batch entry points share one source across worker threads.
///
/// # Example
///
/// ```
/// use somaloc::VoxelSource;
///
/// struct Constant;
///
/// impl VoxelSource for Constant {
///     fn dimensions(&self) -> [usize; 3] {
///         [8, 8, 4]
///     }
///     fn z_scale(&self) -> f64 {
///         0.5
///     }
///     fn intensity(&self, p: [i32; 3]) -> Option<u16> {
///         let [w, h, d] = self.dimensions();
///         let inside = p[0] >= 0 && p[1] >= 0 && p[2] >= 0
///             && (p[0] as usize) < w && (p[1] as usize) < h && (p[2] as usize) < d;
///         inside.then_some(100)
///     }
/// }
/// ```
pub trait VoxelSource {
    /// Volume extent `[width, height, depth]` in voxels.
    fn dimensions(&self) -> [usize; 3];
    /// Ratio of z sampling to xy sampling, in `(0, 1]`.
    fn z_scale(&self) -> f64;
    /// Intensity at integer coordinates, `None` outside the volume.
    fn intensity(&self, p: [i32; 3]) -> Option<u16>;
}

/// Errors raised while building a [`Volume`].
#[derive(Debug)]
pub enum VolumeError {
    /// Data length does not match the requested dimensions.
    ShapeMismatch {
        /// Expected number of voxels (`w * h * d`).
        expected: usize,
        /// Number of voxels supplied.
        got: usize,
    },
    /// z-scale outside `(0, 1]` or not finite.
    InvalidZScale(f64),
    /// No slices were supplied.
    EmptyStack,
    /// A slice does not match the size of the first slice.
    SliceSizeMismatch {
        /// Index of the offending slice.
        index: usize,
        /// Size of the first slice `[w, h]`.
        expected: [u32; 2],
        /// Size of the offending slice `[w, h]`.
        got: [u32; 2],
    },
    /// Slice decoding failed.
    Image(image::ImageError),
}

impl std::fmt::Display for VolumeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch { expected, got } => {
                write!(f, "voxel count mismatch: expected {}, got {}", expected, got)
            }
            Self::InvalidZScale(s) => write!(f, "z-scale must be in (0, 1], got {}", s),
            Self::EmptyStack => write!(f, "volume has no slices"),
            Self::SliceSizeMismatch {
                index,
                expected,
                got,
            } => write!(
                f,
                "slice {} is {}x{}, expected {}x{}",
                index, got[0], got[1], expected[0], expected[1]
            ),
            Self::Image(e) => write!(f, "failed to read slice: {}", e),
        }
    }
}

impl std::error::Error for VolumeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for VolumeError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

fn check_z_scale(z_scale: f64) -> Result<(), VolumeError> {
    if z_scale.is_finite() && z_scale > 0.0 && z_scale <= 1.0 {
        Ok(())
    } else {
        Err(VolumeError::InvalidZScale(z_scale))
    }
}

/// Dense `u16` volume stored x-fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    dims: [usize; 3],
    z_scale: f64,
    data: Vec<u16>,
}

impl Volume {
    /// Wrap an existing buffer.
    pub fn new(dims: [usize; 3], z_scale: f64, data: Vec<u16>) -> Result<Self, VolumeError> {
        check_z_scale(z_scale)?;
        let expected = dims[0] * dims[1] * dims[2];
        if data.len() != expected {
            return Err(VolumeError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            dims,
            z_scale,
            data,
        })
    }

    /// Volume with every voxel set to `value`.
    pub fn filled(dims: [usize; 3], z_scale: f64, value: u16) -> Result<Self, VolumeError> {
        Self::new(dims, z_scale, vec![value; dims[0] * dims[1] * dims[2]])
    }

    /// Build a volume by evaluating `f(x, y, z)` at every voxel.
    pub fn from_fn(
        dims: [usize; 3],
        z_scale: f64,
        mut f: impl FnMut(usize, usize, usize) -> u16,
    ) -> Result<Self, VolumeError> {
        let mut data = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    data.push(f(x, y, z));
                }
            }
        }
        Self::new(dims, z_scale, data)
    }

    /// Stack same-sized grayscale slices along z.
    pub fn from_slices(slices: Vec<Slice16>, z_scale: f64) -> Result<Self, VolumeError> {
        check_z_scale(z_scale)?;
        let first = slices.first().ok_or(VolumeError::EmptyStack)?;
        let (w, h) = first.dimensions();
        let mut data = Vec::with_capacity(w as usize * h as usize * slices.len());
        for (index, slice) in slices.iter().enumerate() {
            let (sw, sh) = slice.dimensions();
            if (sw, sh) != (w, h) {
                return Err(VolumeError::SliceSizeMismatch {
                    index,
                    expected: [w, h],
                    got: [sw, sh],
                });
            }
            data.extend_from_slice(slice.as_raw());
        }
        Self::new([w as usize, h as usize, slices.len()], z_scale, data)
    }

    /// Decode slice images (any grayscale or color format `image` reads) in
    /// the given order and stack them along z.
    pub fn load_slices<P: AsRef<Path>>(paths: &[P], z_scale: f64) -> Result<Self, VolumeError> {
        let mut slices = Vec::with_capacity(paths.len());
        for path in paths {
            slices.push(image::open(path.as_ref())?.into_luma16());
        }
        tracing::debug!("decoded {} slices", slices.len());
        Self::from_slices(slices, z_scale)
    }

    /// Overwrite one voxel. Out-of-bounds writes are ignored.
    pub fn set_voxel(&mut self, p: [i32; 3], value: u16) {
        if let Some(idx) = self.index(p) {
            self.data[idx] = value;
        }
    }

    /// Raw voxel buffer.
    pub fn as_raw(&self) -> &[u16] {
        &self.data
    }

    #[inline]
    fn index(&self, p: [i32; 3]) -> Option<usize> {
        let [w, h, d] = self.dims;
        if p[0] < 0 || p[1] < 0 || p[2] < 0 {
            return None;
        }
        let (x, y, z) = (p[0] as usize, p[1] as usize, p[2] as usize);
        if x >= w || y >= h || z >= d {
            return None;
        }
        Some((z * h + y) * w + x)
    }
}

impl VoxelSource for Volume {
    fn dimensions(&self) -> [usize; 3] {
        self.dims
    }

    fn z_scale(&self) -> f64 {
        self.z_scale
    }

    #[inline]
    fn intensity(&self, p: [i32; 3]) -> Option<u16> {
        self.index(p).map(|idx| self.data[idx])
    }
}
