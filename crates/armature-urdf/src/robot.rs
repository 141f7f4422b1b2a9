//! Live kinematic model: index-based link/joint tree, joint values, and
//! forward kinematics.
//!
//! A [`Robot`] is built once from a validated [`RobotModel`]; afterwards
//! only joint values mutate. Writing a joint value propagates through the
//! mimic driver→dependents table before the next FK pass reads it.

use std::collections::HashMap;
use std::f32::consts::PI;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use crate::error::{KinematicsError, ParseError};
use crate::types::{JointLimits, JointType, RobotModel};

// ---------------------------------------------------------------------------
// Link / Joint
// ---------------------------------------------------------------------------

/// A link in the live tree.
#[derive(Debug, Clone)]
pub struct Link {
    /// Link name.
    pub name: String,
    /// Index of the joint whose child this link is. `None` for the root.
    pub parent_joint: Option<usize>,
    /// Joints whose parent this link is, in declaration order.
    pub child_joints: Vec<usize>,
}

/// Resolved mimic coupling on a live joint.
#[derive(Debug, Clone, Copy)]
pub struct MimicDrive {
    /// Index of the driver joint.
    pub driver: usize,
    pub multiplier: f32,
    pub offset: f32,
}

/// A joint in the live tree.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Static transform from the parent link frame to the joint frame.
    pub origin: Isometry3<f32>,
    /// Unit axis in the joint-local frame.
    pub axis: UnitVector3<f32>,
    /// Declared limits.
    pub limits: JointLimits,
    /// Index of the parent link.
    pub parent_link: usize,
    /// Index of the child link.
    pub child_link: usize,
    /// Mimic coupling, if this joint follows another.
    pub mimic: Option<MimicDrive>,
    value: f32,
}

impl Joint {
    /// Current scalar value (rad or m).
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Limit bounds with the unspecified sides defaulted to ±π.
    pub fn clamp_range(&self) -> (f32, f32) {
        (
            self.limits.lower.unwrap_or(-PI),
            self.limits.upper.unwrap_or(PI),
        )
    }

    /// Transform contributed by the current joint value.
    fn motion(&self) -> Isometry3<f32> {
        match self.joint_type {
            JointType::Revolute | JointType::Continuous => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, self.value),
            ),
            JointType::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * self.value),
                UnitQuaternion::identity(),
            ),
            JointType::Fixed => Isometry3::identity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

/// The live robot graph: a link/joint tree plus cached world transforms.
///
/// Joint values are the only state that mutates after construction.
/// Cloning yields an independent copy, which is how embedders run
/// concurrent multi-start solves.
#[derive(Debug, Clone)]
pub struct Robot {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    link_index: HashMap<String, usize>,
    joint_index: HashMap<String, usize>,
    root: usize,
    /// Per-joint mimic dependents (joints whose value follows this one).
    dependents: Vec<Vec<usize>>,
    link_world: Vec<Isometry3<f32>>,
    joint_world: Vec<Isometry3<f32>>,
}

impl Robot {
    /// Build a live robot from a description model.
    ///
    /// Runs [`RobotModel::validate`] first, so hand-built models get the
    /// same structural guarantees as parsed ones. World transforms are
    /// computed before returning.
    pub fn from_model(model: &RobotModel) -> Result<Self, ParseError> {
        model.validate()?;

        let link_index: HashMap<String, usize> = model
            .links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), i))
            .collect();
        let joint_index: HashMap<String, usize> = model
            .joints
            .iter()
            .enumerate()
            .map(|(i, j)| (j.name.clone(), i))
            .collect();

        let mut links: Vec<Link> = model
            .links
            .iter()
            .map(|l| Link {
                name: l.name.clone(),
                parent_joint: None,
                child_joints: Vec::new(),
            })
            .collect();

        let mut joints = Vec::with_capacity(model.joints.len());
        for (i, data) in model.joints.iter().enumerate() {
            let parent_link = link_index[&data.parent];
            let child_link = link_index[&data.child];
            links[parent_link].child_joints.push(i);
            links[child_link].parent_joint = Some(i);

            let rotation = UnitQuaternion::from_euler_angles(
                data.origin.rpy[0],
                data.origin.rpy[1],
                data.origin.rpy[2],
            );
            let translation =
                Translation3::new(data.origin.xyz[0], data.origin.xyz[1], data.origin.xyz[2]);

            joints.push(Joint {
                name: data.name.clone(),
                joint_type: data.joint_type,
                origin: Isometry3::from_parts(translation, rotation),
                axis: UnitVector3::new_normalize(Vector3::new(
                    data.axis[0],
                    data.axis[1],
                    data.axis[2],
                )),
                limits: data.limits,
                parent_link,
                child_link,
                mimic: data.mimic.as_ref().map(|m| MimicDrive {
                    driver: joint_index[&m.joint],
                    multiplier: m.multiplier,
                    offset: m.offset,
                }),
                value: 0.0,
            });
        }

        // Driver -> dependents, built once. Acyclic per validate().
        let mut dependents = vec![Vec::new(); joints.len()];
        for (i, joint) in joints.iter().enumerate() {
            if let Some(mimic) = joint.mimic {
                dependents[mimic.driver].push(i);
            }
        }

        let n_links = links.len();
        let n_joints = joints.len();
        let mut robot = Self {
            name: model.name.clone(),
            links,
            joints,
            link_index,
            joint_index,
            root: link_index_of(model)?,
            dependents,
            link_world: vec![Isometry3::identity(); n_links],
            joint_world: vec![Isometry3::identity(); n_joints],
        };

        // Seed mimic values and the initial FK state.
        let drivers: Vec<usize> = (0..robot.joints.len())
            .filter(|&i| !robot.dependents[i].is_empty())
            .collect();
        for i in drivers {
            robot.propagate_mimics(i);
        }
        robot.update_world_transforms();
        Ok(robot)
    }

    /// Robot name from the description.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the root link.
    pub fn root(&self) -> usize {
        self.root
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn link(&self, index: usize) -> &Link {
        &self.links[index]
    }

    pub fn joint(&self, index: usize) -> &Joint {
        &self.joints[index]
    }

    /// Look up a link index by name.
    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.link_index.get(name).copied()
    }

    /// Look up a joint index by name.
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_index.get(name).copied()
    }

    /// Set a joint value by name and propagate mimic dependents.
    ///
    /// The value is stored as given; limits only constrain the solver's
    /// working values, not external writes. Call
    /// [`update_world_transforms`](Self::update_world_transforms) before
    /// reading world poses again.
    pub fn set_joint_value(&mut self, name: &str, value: f32) -> Result<(), KinematicsError> {
        let index = self
            .joint_index(name)
            .ok_or_else(|| KinematicsError::UnknownJoint(name.into()))?;
        self.set_joint_value_at(index, value);
        Ok(())
    }

    /// Set a joint value by index and propagate mimic dependents.
    pub fn set_joint_value_at(&mut self, index: usize, value: f32) {
        self.joints[index].value = value;
        self.propagate_mimics(index);
    }

    /// Apply a joint-name→value map (e.g. a solver result), then refresh FK.
    pub fn apply_joint_values<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a str, f32)>,
    ) -> Result<(), KinematicsError> {
        for (name, value) in values {
            self.set_joint_value(name, value)?;
        }
        self.update_world_transforms();
        Ok(())
    }

    /// Recompute world transforms for every joint and link from the root
    /// down. Deterministic: identical joint values always produce identical
    /// transforms.
    pub fn update_world_transforms(&mut self) {
        self.link_world[self.root] = Isometry3::identity();
        let mut stack = vec![self.root];
        while let Some(link) = stack.pop() {
            let base = self.link_world[link];
            for &j in &self.links[link].child_joints {
                let joint = &self.joints[j];
                let world = base * joint.origin;
                self.joint_world[j] = world;
                self.link_world[joint.child_link] = world * joint.motion();
                stack.push(joint.child_link);
            }
        }
    }

    /// World transform of a link (valid after the last FK pass).
    pub fn link_world(&self, index: usize) -> &Isometry3<f32> {
        &self.link_world[index]
    }

    /// World transform of a joint frame (before its own motion).
    pub fn joint_world(&self, index: usize) -> &Isometry3<f32> {
        &self.joint_world[index]
    }

    /// Joint axis rotated into the world frame, normalized.
    pub fn joint_world_axis(&self, index: usize) -> Vector3<f32> {
        (self.joint_world[index].rotation * self.joints[index].axis.into_inner()).normalize()
    }

    /// Follow the dependents table transitively from a written joint.
    fn propagate_mimics(&mut self, driver: usize) {
        let mut stack = vec![driver];
        while let Some(d) = stack.pop() {
            let driver_value = self.joints[d].value;
            // Clone is cheap: dependent lists are tiny (usually 0 or 1).
            for dep in self.dependents[d].clone() {
                let mimic = self.joints[dep]
                    .mimic
                    .as_ref()
                    .map_or((1.0, 0.0), |m| (m.multiplier, m.offset));
                self.joints[dep].value = mimic.0 * driver_value + mimic.1;
                stack.push(dep);
            }
        }
    }
}

fn link_index_of(model: &RobotModel) -> Result<usize, ParseError> {
    model
        .links
        .iter()
        .position(|l| l.name == model.root_link)
        .ok_or(ParseError::NoRootLink)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
