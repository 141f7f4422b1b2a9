//! URDF parsing and live kinematic model for Armature.
//!
//! Provides types for representing a robot's kinematic tree (links, joints,
//! mimic couplings), parsing URDF XML files, and a [`Robot`] that holds
//! joint values and computes forward kinematics.

pub mod error;
pub mod parser;
pub mod robot;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::{KinematicsError, ParseError};
pub use parser::{parse_file, parse_string};
pub use robot::{Joint, Link, MimicDrive, Robot};
pub use types::{JointData, JointLimits, JointType, LinkData, Mimic, Origin, RobotModel};
