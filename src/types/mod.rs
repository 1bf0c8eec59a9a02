pub mod interval;
pub mod record;
pub mod timestamp;
