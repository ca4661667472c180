pub mod circles;
pub mod judgment;
pub mod pattern_library;
pub mod patterns;
pub mod session;
pub mod track;
