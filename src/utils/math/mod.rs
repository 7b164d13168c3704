pub mod dense;
pub mod sparse;
