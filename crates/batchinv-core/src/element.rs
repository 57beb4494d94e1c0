//! Scalar element kinds supported by the inversion engine.
//!
//! The engine is generic over [`Element`], which is implemented for a closed
//! set of floating and complex types. [`ElementKind`] is the runtime tag for
//! that set, used for logging, CLI parsing and backend capability checks.

use num_traits::NumAssign;
use std::fmt;
use std::ops::Neg;

/// Single-precision complex scalar.
pub type C32 = num_complex::Complex32;
/// Double-precision complex scalar.
pub type C64 = num_complex::Complex64;

/// Plain-old-data value that can be stored in device memory.
///
/// Covers the matrix elements as well as pivot/status integers (`i32`) and
/// device addresses (`u64`).
pub trait DeviceScalar: bytemuck::Pod + Default + Send + Sync + fmt::Debug + 'static {}

impl DeviceScalar for i32 {}
impl DeviceScalar for u64 {}
impl DeviceScalar for f32 {}
impl DeviceScalar for f64 {}
impl DeviceScalar for C32 {}
impl DeviceScalar for C64 {}

/// Runtime tag for the closed set of element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    F32,
    F64,
    Complex32,
    Complex64,
}

impl ElementKind {
    /// Parse from string (for CLI).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "f32" | "float" | "float32" => Some(Self::F32),
            "f64" | "double" | "float64" => Some(Self::F64),
            "c32" | "complex32" => Some(Self::Complex32),
            "c64" | "complex64" => Some(Self::Complex64),
            _ => None,
        }
    }

    /// Short name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Complex32 => "c32",
            Self::Complex64 => "c64",
        }
    }

    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 | Self::Complex32 => 8,
            Self::Complex64 => 16,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex32 | Self::Complex64)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Matrix element type accepted by the inversion engine.
pub trait Element: DeviceScalar + PartialEq + NumAssign + Neg<Output = Self> {
    /// Runtime tag of this type.
    const KIND: ElementKind;

    /// Pivoting magnitude: `|x|` for reals, `|re| + |im|` for complex values.
    fn magnitude(self) -> f64;

    /// Convert a real value into this element type.
    fn from_f64(value: f64) -> Self;
}

impl Element for f32 {
    const KIND: ElementKind = ElementKind::F32;

    fn magnitude(self) -> f64 {
        f64::from(self.abs())
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::F64;

    fn magnitude(self) -> f64 {
        self.abs()
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl Element for C32 {
    const KIND: ElementKind = ElementKind::Complex32;

    fn magnitude(self) -> f64 {
        f64::from(self.re.abs() + self.im.abs())
    }

    fn from_f64(value: f64) -> Self {
        C32::new(value as f32, 0.0)
    }
}

impl Element for C64 {
    const KIND: ElementKind = ElementKind::Complex64;

    fn magnitude(self) -> f64 {
        self.re.abs() + self.im.abs()
    }

    fn from_f64(value: f64) -> Self {
        C64::new(value, 0.0)
    }
}
