//! E-paper panel drivers

pub mod uc8179;

pub use uc8179::{Uc8179, Uc8179Config};
