//! Description-level data types for a parsed robot.
//!
//! These are the crate's canonical representation of a URDF document,
//! independent of the XML layer. Links and joints are stored in declaration
//! order; the live [`Robot`](crate::robot::Robot) is built from this.

use std::collections::HashSet;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// Supported URDF joint types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Rotation about a single axis, with position limits.
    Revolute,
    /// Unlimited rotation about a single axis.
    Continuous,
    /// Translation along an axis, with position limits.
    Prismatic,
    /// No relative motion between parent and child.
    Fixed,
}

impl JointType {
    /// Whether this joint type has an actuatable degree of freedom.
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }

    /// Map a URDF `type` attribute value, rejecting everything outside the
    /// supported set.
    pub fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "revolute" => Ok(Self::Revolute),
            "continuous" => Ok(Self::Continuous),
            "prismatic" => Ok(Self::Prismatic),
            "fixed" => Ok(Self::Fixed),
            other => Err(ParseError::UnsupportedJointType(other.into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A local pose specified as translation + roll-pitch-yaw.
///
/// The rpy rotation composes as `Rz(yaw) * Ry(pitch) * Rx(roll)` (fixed-axis
/// Z-Y-X), matching the URDF convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    /// Translation `[x, y, z]` in meters.
    pub xyz: [f32; 3],
    /// Rotation `[roll, pitch, yaw]` in radians.
    pub rpy: [f32; 3],
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            xyz: [0.0; 3],
            rpy: [0.0; 3],
        }
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Optional bounds on a joint's scalar value (rad or m).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointLimits {
    /// Lower bound. `None` means unbounded.
    pub lower: Option<f32>,
    /// Upper bound. `None` means unbounded.
    pub upper: Option<f32>,
}

// ---------------------------------------------------------------------------
// Mimic
// ---------------------------------------------------------------------------

/// A mimic specification: this joint's value is a fixed linear function of
/// another joint's value, `multiplier * driver + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mimic {
    /// Name of the driver joint.
    pub joint: String,
    /// Scale applied to the driver value (URDF default 1.0).
    pub multiplier: f32,
    /// Constant added after scaling (URDF default 0.0).
    pub offset: f32,
}

// ---------------------------------------------------------------------------
// LinkData
// ---------------------------------------------------------------------------

/// A declared link. Mesh, material, and inertial content is out of scope
/// and dropped at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkData {
    /// Link name.
    pub name: String,
}

impl LinkData {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ---------------------------------------------------------------------------
// JointData
// ---------------------------------------------------------------------------

/// A declared joint connecting exactly one parent link to one child link.
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint frame relative to the parent link frame.
    pub origin: Origin,
    /// Unit rotation/translation axis in the joint-local frame.
    /// Defaults to `[0, 0, 1]`; normalized by the parser.
    pub axis: [f32; 3],
    /// Motion limits.
    pub limits: JointLimits,
    /// Mimic specification, if this joint follows another.
    pub mimic: Option<Mimic>,
}

// ---------------------------------------------------------------------------
// RobotModel
// ---------------------------------------------------------------------------

/// Complete description-level representation of a robot.
///
/// Links and joints keep their declaration order, which fixes child-joint
/// ordering and traversal tie-breaking downstream.
#[derive(Debug, Clone)]
pub struct RobotModel {
    /// Robot name.
    pub name: String,
    /// All links, in declaration order.
    pub links: Vec<LinkData>,
    /// All joints (mimics included), in declaration order.
    pub joints: Vec<JointData>,
    /// Name of the root link (the one never referenced as a child).
    pub root_link: String,
}

impl RobotModel {
    /// Look up a link by name.
    pub fn link(&self, name: &str) -> Option<&LinkData> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Look up a joint by name.
    pub fn joint(&self, name: &str) -> Option<&JointData> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Iterate over actuated joints (revolute, continuous, prismatic).
    pub fn actuated_joints(&self) -> impl Iterator<Item = &JointData> {
        self.joints.iter().filter(|j| j.joint_type.is_actuated())
    }

    /// Number of actuated degrees of freedom (mimics included).
    pub fn dof(&self) -> usize {
        self.actuated_joints().count()
    }

    /// Check the structural invariants the parser guarantees.
    ///
    /// Hand-built models go through the same checks when a
    /// [`Robot`](crate::robot::Robot) is constructed from them:
    /// unique names, declared link references, a valid root, resolvable
    /// mimic drivers, and an acyclic mimic graph.
    pub fn validate(&self) -> Result<(), ParseError> {
        let mut link_names = HashSet::new();
        for link in &self.links {
            if !link_names.insert(link.name.as_str()) {
                return Err(ParseError::DuplicateLink(link.name.clone()));
            }
        }

        let mut joint_names = HashSet::new();
        for joint in &self.joints {
            if !joint_names.insert(joint.name.as_str()) {
                return Err(ParseError::DuplicateJoint(joint.name.clone()));
            }
            for link in [&joint.parent, &joint.child] {
                if !link_names.contains(link.as_str()) {
                    return Err(ParseError::UndeclaredLink {
                        joint: joint.name.clone(),
                        link: link.clone(),
                    });
                }
            }
        }

        if self.link(&self.root_link).is_none() {
            return Err(ParseError::NoRootLink);
        }

        for joint in &self.joints {
            if let Some(mimic) = &joint.mimic {
                if !joint_names.contains(mimic.joint.as_str()) {
                    return Err(ParseError::UnknownMimicDriver {
                        joint: joint.name.clone(),
                        driver: mimic.joint.clone(),
                    });
                }
            }
        }

        self.check_mimic_cycles()
    }

    /// Walk each joint's driver chain with a visited set. Every node has at
    /// most one outgoing mimic edge, so a revisit means a cycle.
    fn check_mimic_cycles(&self) -> Result<(), ParseError> {
        for start in &self.joints {
            let mut visited = HashSet::new();
            let mut current = start;
            loop {
                if !visited.insert(current.name.as_str()) {
                    return Err(ParseError::MimicCycle(current.name.clone()));
                }
                match &current.mimic {
                    Some(mimic) => {
                        // Driver existence is checked in validate() first.
                        current = match self.joint(&mimic.joint) {
                            Some(j) => j,
                            None => break,
                        };
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
