//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in inkwire-core:
//!
//! - E-paper panels (UC8179, 7.5" 800×480 4-gray)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod panel;
