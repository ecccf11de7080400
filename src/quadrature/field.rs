//! Flat per-(element, quadrature point) storage

use serde::{Deserialize, Serialize};

use crate::error::{UmatError, UmatResult};

/// Element count and points per element of a homogeneous quadrature space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadratureLayout {
    /// Number of elements
    pub num_elements: usize,
    /// Quadrature points per element (same for every element)
    pub points_per_element: usize,
}

impl QuadratureLayout {
    pub fn new(num_elements: usize, points_per_element: usize) -> Self {
        Self {
            num_elements,
            points_per_element,
        }
    }

    /// Total number of quadrature points
    pub fn total_points(&self) -> usize {
        self.num_elements * self.points_per_element
    }

    /// All (element, point) pairs, element-major
    pub fn indices(self) -> impl Iterator<Item = (usize, usize)> {
        let ppe = self.points_per_element;
        (0..self.num_elements).flat_map(move |e| (0..ppe).map(move |p| (e, p)))
    }
}

/// Fixed-stride field with one block of `stride` components per point.
///
/// Data is element-major, point-minor, component-innermost:
/// `offset(e, p) = e·points_per_element·stride + p·stride`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureField {
    layout: QuadratureLayout,
    stride: usize,
    data: Vec<f64>,
}

impl QuadratureField {
    /// Zero-initialised field
    pub fn new(layout: QuadratureLayout, stride: usize) -> Self {
        Self::filled(layout, stride, 0.0)
    }

    /// Field with every component set to `value`
    pub fn filled(layout: QuadratureLayout, stride: usize, value: f64) -> Self {
        Self {
            layout,
            stride,
            data: vec![value; layout.total_points() * stride],
        }
    }

    /// Wrap existing data, checking its length against the layout
    pub fn from_data(layout: QuadratureLayout, stride: usize, data: Vec<f64>) -> UmatResult<Self> {
        let expected = layout.total_points() * stride;
        if data.len() != expected {
            return Err(UmatError::LayoutMismatch(format!(
                "field data has {} values, expected {} ({} points x stride {})",
                data.len(),
                expected,
                layout.total_points(),
                stride
            )));
        }
        Ok(Self { layout, stride, data })
    }

    /// Check a caller's declared stride against this field's configured stride
    pub fn check_stride(&self, declared: usize) -> UmatResult<()> {
        if declared != self.stride {
            return Err(UmatError::LayoutMismatch(format!(
                "declared stride {} does not match field stride {}",
                declared, self.stride
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> QuadratureLayout {
        self.layout
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Components per element
    pub fn element_width(&self) -> usize {
        self.layout.points_per_element * self.stride
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first component of (element, point)
    pub fn offset(&self, element: usize, point: usize) -> usize {
        debug_assert!(element < self.layout.num_elements);
        debug_assert!(point < self.layout.points_per_element);
        element * self.layout.points_per_element * self.stride + point * self.stride
    }

    pub fn point(&self, element: usize, point: usize) -> &[f64] {
        let start = self.offset(element, point);
        &self.data[start..start + self.stride]
    }

    pub fn point_mut(&mut self, element: usize, point: usize) -> &mut [f64] {
        let start = self.offset(element, point);
        &mut self.data[start..start + self.stride]
    }

    pub fn element(&self, element: usize) -> &[f64] {
        let start = self.offset(element, 0);
        &self.data[start..start + self.element_width()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Set every point to the same component block
    pub fn fill_points(&mut self, values: &[f64]) -> UmatResult<()> {
        self.check_stride(values.len())?;
        if self.stride == 0 {
            return Ok(());
        }
        for chunk in self.data.chunks_exact_mut(self.stride) {
            chunk.copy_from_slice(values);
        }
        Ok(())
    }

    /// Overwrite this field with `other`, which must share layout and stride
    pub fn copy_from(&mut self, other: &QuadratureField) -> UmatResult<()> {
        if self.layout != other.layout {
            return Err(UmatError::LayoutMismatch(format!(
                "cannot copy field over {:?} into {:?}",
                other.layout, self.layout
            )));
        }
        self.check_stride(other.stride)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_formula() {
        let layout = QuadratureLayout::new(3, 8);
        let field = QuadratureField::new(layout, 9);

        assert_eq!(field.len(), 3 * 8 * 9);
        assert_eq!(field.offset(0, 0), 0);
        assert_eq!(field.offset(0, 1), 9);
        assert_eq!(field.offset(1, 0), 72);
        assert_eq!(field.offset(2, 7), 2 * 8 * 9 + 7 * 9);
    }

    #[test]
    fn test_point_views_are_disjoint() {
        let layout = QuadratureLayout::new(2, 2);
        let mut field = QuadratureField::new(layout, 3);

        field.point_mut(1, 0).copy_from_slice(&[1.0, 2.0, 3.0]);

        assert_eq!(field.point(1, 0), &[1.0, 2.0, 3.0]);
        assert_eq!(field.point(0, 1), &[0.0, 0.0, 0.0]);
        assert_eq!(field.point(1, 1), &[0.0, 0.0, 0.0]);
        assert_eq!(&field.element(1)[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_declared_stride_mismatch() {
        let field = QuadratureField::new(QuadratureLayout::new(4, 1), 6);
        assert!(field.check_stride(6).is_ok());
        assert!(matches!(field.check_stride(7), Err(UmatError::LayoutMismatch(_))));
    }

    #[test]
    fn test_from_data_length_checked() {
        let layout = QuadratureLayout::new(2, 3);
        assert!(QuadratureField::from_data(layout, 2, vec![0.0; 12]).is_ok());
        assert!(matches!(
            QuadratureField::from_data(layout, 2, vec![0.0; 11]),
            Err(UmatError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_fill_points_and_copy() {
        let layout = QuadratureLayout::new(2, 2);
        let mut a = QuadratureField::new(layout, 2);
        a.fill_points(&[4.0, 5.0]).unwrap();
        assert!(a.as_slice().chunks(2).all(|c| c == [4.0, 5.0]));

        let mut b = QuadratureField::new(layout, 2);
        b.copy_from(&a).unwrap();
        assert_eq!(a, b);

        let mut c = QuadratureField::new(layout, 3);
        assert!(c.copy_from(&a).is_err());
    }

    #[test]
    fn test_indices_are_element_major() {
        let layout = QuadratureLayout::new(2, 2);
        let pairs: Vec<_> = layout.indices().collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
