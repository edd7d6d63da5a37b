//! Reading computation: digit-sum normalization and the element table.

pub mod elements;
pub mod normalize;

pub use elements::{map_elements, Element, ElementResult, ELEMENTS};
pub use normalize::{normalize, normalize_field};
