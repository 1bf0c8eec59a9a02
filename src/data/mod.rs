pub mod demo;
pub mod error;
pub mod export;
pub mod features;
pub mod loader;
pub mod resample;
pub mod split;
pub mod windows;
