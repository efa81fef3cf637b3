pub mod configuration;
pub mod random;
pub mod simulation_time;
