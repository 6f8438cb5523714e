//! Background loops for mission execution.

pub mod simulation;
