#![cfg_attr(not(feature = "std"), no_std)]

pub mod ecosystem;
pub mod trade;

pub use ecosystem::*;
pub use trade::*;
