pub mod controller;
pub mod policy;

pub use controller::SprayController;
pub use policy::{decide, duration_for, MoistureBand, MoistureViolation, SprayDecision};
