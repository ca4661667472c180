pub mod analysis;
pub mod audio;
pub mod input;
