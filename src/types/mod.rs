pub mod cube;
pub mod point;

pub use cube::Cube;
pub use point::Point;
