//! Mathematical utilities and data structures

pub mod aabb;
pub mod grid_box;
pub mod ray;

pub use aabb::Aabb;
pub use grid_box::GridBox;
pub use ray::Ray;
