//! Non-owning descriptors for dense `f64` buffers that cross the boundary.
//!
//! A view borrows the caller's buffer for exactly as long as the call it is
//! passed to, so nothing on the host side can alias it afterwards.

use crate::errors::ArgumentError;

/// Values per point: 3 for coordinate and vector fields, 1 for scalar fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Components {
    Scalar,
    Vector3,
}

impl Components {
    pub const fn count(self) -> usize {
        match self {
            Components::Scalar => 1,
            Components::Vector3 => 3,
        }
    }
}

fn required_len(points: usize, components: Components) -> Result<usize, ArgumentError> {
    points
        .checked_mul(components.count())
        .ok_or(ArgumentError::BufferTooSmall {
            needed: usize::MAX,
            len: 0,
        })
}

/// Read-only view of `points × components` contiguous, row-major doubles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrayView<'a> {
    data: &'a [f64],
    points: usize,
    components: Components,
}

impl<'a> ArrayView<'a> {
    /// Extra trailing values beyond `points × components` are ignored.
    pub fn new(
        data: &'a [f64],
        points: usize,
        components: Components,
    ) -> Result<Self, ArgumentError> {
        let needed = required_len(points, components)?;
        if data.len() < needed {
            return Err(ArgumentError::BufferTooSmall {
                needed,
                len: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            points,
            components,
        })
    }

    /// Interprets the whole slice as `(x, y, z)` triples.
    pub fn vectors(data: &'a [f64]) -> Result<Self, ArgumentError> {
        if data.len() % 3 != 0 {
            return Err(ArgumentError::BufferTooSmall {
                needed: data.len().next_multiple_of(3),
                len: data.len(),
            });
        }
        Self::new(data, data.len() / 3, Components::Vector3)
    }

    pub fn scalars(data: &'a [f64]) -> Self {
        Self {
            data,
            points: data.len(),
            components: Components::Scalar,
        }
    }

    /// Builds a view over a caller-supplied pointer.
    ///
    /// # Safety
    ///
    /// When `points > 0`, `ptr` must be null or point to at least
    /// `points × components` initialized doubles that stay valid and are not
    /// mutated for `'a`. A null pointer with a non-zero count is rejected.
    pub unsafe fn from_raw_parts(
        ptr: *const f64,
        points: usize,
        components: Components,
    ) -> Result<Self, ArgumentError> {
        if points == 0 {
            return Ok(Self {
                data: &[],
                points: 0,
                components,
            });
        }
        if ptr.is_null() {
            return Err(ArgumentError::NullBuffer { points });
        }
        let len = required_len(points, components)?;
        // SAFETY: non-null, and the caller guarantees `len` readable doubles.
        let data = unsafe { std::slice::from_raw_parts(ptr, len) };
        Ok(Self {
            data,
            points,
            components,
        })
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn components(&self) -> Components {
        self.components
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }

    pub fn point(&self, index: usize) -> Option<&'a [f64]> {
        let c = self.components.count();
        let start = index.checked_mul(c)?;
        self.data.get(start..start.checked_add(c)?)
    }

    pub fn expect_components(&self, expected: Components) -> Result<(), ArgumentError> {
        if self.components != expected {
            return Err(ArgumentError::ComponentMismatch {
                expected: expected.count(),
                found: self.components.count(),
            });
        }
        Ok(())
    }
}

/// Writable counterpart of [`ArrayView`], used as a pre-sized destination.
#[derive(Debug)]
pub struct ArrayViewMut<'a> {
    data: &'a mut [f64],
    points: usize,
    components: Components,
}

impl<'a> ArrayViewMut<'a> {
    pub fn new(
        data: &'a mut [f64],
        points: usize,
        components: Components,
    ) -> Result<Self, ArgumentError> {
        let needed = required_len(points, components)?;
        if data.len() < needed {
            return Err(ArgumentError::BufferTooSmall {
                needed,
                len: data.len(),
            });
        }
        Ok(Self {
            data: &mut data[..needed],
            points,
            components,
        })
    }

    pub fn scalars(data: &'a mut [f64]) -> Self {
        let points = data.len();
        Self {
            data,
            points,
            components: Components::Scalar,
        }
    }

    /// # Safety
    ///
    /// When `points > 0`, `ptr` must be null or point to at least
    /// `points × components` doubles that are valid for writes and not
    /// accessed through any other pointer for `'a`.
    pub unsafe fn from_raw_parts(
        ptr: *mut f64,
        points: usize,
        components: Components,
    ) -> Result<Self, ArgumentError> {
        if points == 0 {
            return Ok(Self {
                data: &mut [],
                points: 0,
                components,
            });
        }
        if ptr.is_null() {
            return Err(ArgumentError::NullBuffer { points });
        }
        let len = required_len(points, components)?;
        // SAFETY: non-null, and the caller guarantees exclusive access to `len` doubles.
        let data = unsafe { std::slice::from_raw_parts_mut(ptr, len) };
        Ok(Self {
            data,
            points,
            components,
        })
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn components(&self) -> Components {
        self.components
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
    }

    /// Copies `src` in; on a length mismatch nothing is written and the
    /// offending length is returned.
    pub fn copy_from(&mut self, src: &[f64]) -> Result<(), usize> {
        if src.len() != self.data.len() {
            return Err(src.len());
        }
        self.data.copy_from_slice(src);
        Ok(())
    }

    pub fn copy_from_iter<I>(&mut self, src: I) -> Result<(), usize>
    where
        I: ExactSizeIterator<Item = f64>,
    {
        if src.len() != self.data.len() {
            return Err(src.len());
        }
        for (dst, v) in self.data.iter_mut().zip(src) {
            *dst = v;
        }
        Ok(())
    }
}
