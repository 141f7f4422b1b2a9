//! Inverse kinematics for Armature robots.
//!
//! Provides end-effector selection, kinematic-chain extraction, and a
//! Cyclic Coordinate Descent (CCD) solver for chains defined by URDF
//! robot models.
//!
//! # Architecture
//!
//! ```text
//! Robot ──► find_end_effector ──► Chain ──► CcdSolver ──► joint value map
//! ```
//!
//! The [`Chain`] is extracted from a live [`Robot`](armature_urdf::Robot)
//! once per loaded description. The solver then takes target poses and
//! produces joint-name to value maps; applying them is the caller's
//! business, and the robot's own joint values are untouched by a solve.

pub mod chain;
pub mod config;
pub mod effector;
pub mod error;
pub mod solver;

pub use chain::Chain;
pub use config::CcdConfig;
pub use effector::find_end_effector;
pub use error::ConfigError;
pub use solver::{CcdSolver, Solution, SolveOutcome, SolveRequest};
