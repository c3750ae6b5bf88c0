/// Tuning constants shared by the fusion engine and its tooling.
pub mod coordinate_system;
pub mod export;
pub mod fusion;
pub mod render_settings;
