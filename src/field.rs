//! Dense per-sample field arrays.
//!
//! Dataset archives store fields with a variety of element types. Once loaded, every field is
//! normalized into a [`FieldArray`], which only distinguishes between floating-point and integer
//! data so that connectivity stays integral while everything else can be treated as `f64`.
use ndarray::{Array2, ArrayD, Axis, Ix2};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldArray {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
}

impl FieldArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(array) => array.shape(),
            Self::Int(array) => array.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Size of the leading (time) axis, or zero for a scalar.
    pub fn num_frames(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Human-readable element kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "integer",
        }
    }

    /// Copies the two-dimensional slice at index `t` of the leading axis as `f64`.
    ///
    /// Returns `None` if the array is not of rank 3 or `t` is out of bounds.
    pub fn frame_f64(&self, t: usize) -> Option<Array2<f64>> {
        if self.ndim() != 3 || t >= self.num_frames() {
            return None;
        }
        match self {
            Self::Float(array) => array
                .index_axis(Axis(0), t)
                .into_dimensionality::<Ix2>()
                .ok()
                .map(|view| view.to_owned()),
            Self::Int(array) => array
                .index_axis(Axis(0), t)
                .into_dimensionality::<Ix2>()
                .ok()
                .map(|view| view.mapv(|x| x as f64)),
        }
    }

    /// Copies the two-dimensional slice at index `t` of the leading axis as `i64`.
    ///
    /// Returns `None` for floating-point arrays, arrays not of rank 3 or an out-of-bounds `t`.
    pub fn frame_i64(&self, t: usize) -> Option<Array2<i64>> {
        match self {
            Self::Int(array) if array.ndim() == 3 && t < array.len_of(Axis(0)) => array
                .index_axis(Axis(0), t)
                .into_dimensionality::<Ix2>()
                .ok()
                .map(|view| view.to_owned()),
            _ => None,
        }
    }
}

macro_rules! impl_from_float_array {
    ($($t:ty),*) => {
        $(
            impl From<ArrayD<$t>> for FieldArray {
                fn from(array: ArrayD<$t>) -> Self {
                    Self::Float(array.mapv(f64::from))
                }
            }
        )*
    };
}

macro_rules! impl_from_int_array {
    ($($t:ty),*) => {
        $(
            impl From<ArrayD<$t>> for FieldArray {
                fn from(array: ArrayD<$t>) -> Self {
                    Self::Int(array.mapv(i64::from))
                }
            }
        )*
    };
}

impl_from_float_array!(f32, f64);
impl_from_int_array!(u8, i32, i64);
