//! # Arm library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the arm executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - plays hand trajectories and solves them into axis consigns
pub mod arm_ctrl;

/// Global data store for the executable
pub mod data_store;

/// Localisation - provides the arms with the pose of the base on the table
pub mod loc;

/// Parameters for the executable itself
pub mod params;

/// Simulated axis plants, used when no hardware is connected
pub mod sim;

/// Telecommands accepted by the executable
pub mod tc;
