//! Movable-joint chain from the base to a chosen effector link.

use armature_urdf::Robot;

use crate::effector::find_end_effector;

/// An ordered sequence of movable joint indices, base to effector.
///
/// Fixed joints contribute no degree of freedom and mimic joints are
/// driven rather than actuated, so both are excluded. The chain only
/// stores indices; all state lives on the [`Robot`].
#[derive(Debug, Clone)]
pub struct Chain {
    joints: Vec<usize>,
    effector_link: usize,
}

impl Chain {
    /// Build the chain ending at `effector_link` by walking parent joints
    /// up to the root.
    pub fn to_link(robot: &Robot, effector_link: usize) -> Self {
        let mut joints = Vec::new();
        let mut link = effector_link;
        while let Some(j) = robot.link(link).parent_joint {
            let joint = robot.joint(j);
            if joint.joint_type.is_actuated() && joint.mimic.is_none() {
                joints.push(j);
            }
            link = joint.parent_link;
        }
        joints.reverse();
        Self {
            joints,
            effector_link,
        }
    }

    /// Build the chain to the heuristically chosen end effector.
    ///
    /// Returns `None` when the robot has no links to target.
    pub fn for_robot(robot: &Robot) -> Option<Self> {
        find_end_effector(robot).map(|link| Self::to_link(robot, link))
    }

    /// Movable joint indices, base to effector.
    pub fn joints(&self) -> &[usize] {
        &self.joints
    }

    /// Index of the effector link this chain ends at.
    pub fn effector_link(&self) -> usize {
        self.effector_link
    }

    /// Number of movable joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint names in chain order.
    pub fn joint_names<'a>(&self, robot: &'a Robot) -> Vec<&'a str> {
        self.joints
            .iter()
            .map(|&j| robot.joint(j).name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
