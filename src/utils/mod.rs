pub mod file;
pub mod geo;
