//! Pure data structures (DTOs) for the order domain.

pub mod order;

pub use order::*;
