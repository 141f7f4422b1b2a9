//! Cyclic Coordinate Descent IK solver.
//!
//! Iteratively sweeps the chain from effector to base, rotating each joint
//! toward the target, then restores the robot's original joint values and
//! returns the computed map. The solve never leaves a lasting side effect
//! on the robot.

use std::collections::HashMap;

use log::trace;
use nalgebra::{UnitQuaternion, Vector3};

use armature_urdf::Robot;

use crate::chain::Chain;
use crate::config::CcdConfig;

/// Joint-to-effector or joint-to-target lever arms shorter than this are
/// numerically coincident with the pivot; rotating there is unstable.
const MIN_LEVER: f32 = 1e-3;

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// One solve request.
///
/// `current_effector_position` may differ from the chain's actual effector
/// position, e.g. when the caller tracks a tool tip rigidly mounted beyond
/// the last link. The difference is captured once as a constant offset and
/// applied to every recomputed effector position, so the solver drives the
/// tool tip rather than the bare link.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    /// Where the caller currently considers the effector to be.
    pub current_effector_position: Vector3<f32>,
    /// Current effector orientation as tracked by the caller, if it
    /// likewise differs from the bare link's orientation.
    pub current_effector_orientation: Option<UnitQuaternion<f32>>,
    /// Target position in the root frame.
    pub target_position: Vector3<f32>,
    /// Target orientation as roll/pitch/yaw radians, if any.
    pub target_orientation: Option<[f32; 3]>,
}

impl SolveRequest {
    /// Position-only request with the effector where the chain says it is.
    pub fn position(current: Vector3<f32>, target: Vector3<f32>) -> Self {
        Self {
            current_effector_position: current,
            current_effector_orientation: None,
            target_position: target,
            target_orientation: None,
        }
    }
}

/// Result of a successful solver run (converged or best-effort).
#[derive(Debug, Clone)]
pub struct Solution {
    /// Joint name to solved scalar value.
    pub joint_values: HashMap<String, f32>,
    /// Whether the errors fell within tolerance.
    pub converged: bool,
    /// Sweeps performed before stopping.
    pub iterations: u32,
    /// Final position error (meters).
    pub position_error: f32,
    /// Final orientation error (radians). Zero without a target orientation.
    pub orientation_error: f32,
}

/// What a solve call produced.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved(Solution),
    /// The chain has no movable joints to solve with.
    NoSolution,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Solved(s) => Some(s),
            Self::NoSolution => None,
        }
    }

    pub fn is_no_solution(&self) -> bool {
        matches!(self, Self::NoSolution)
    }
}

// ---------------------------------------------------------------------------
// CcdSolver
// ---------------------------------------------------------------------------

/// CCD solver with reusable per-call scratch buffers.
///
/// Stateless across calls apart from the buffers; a solve reads the
/// robot's joint values at entry, works on a copy, and restores the
/// originals at exit. Run concurrent multi-start solves against
/// independent `Robot` clones, not a shared one.
pub struct CcdSolver {
    config: CcdConfig,
    starting: Vec<f32>,
    working: Vec<f32>,
}

impl CcdSolver {
    /// Create a new solver with the given configuration.
    pub const fn new(config: CcdConfig) -> Self {
        Self {
            config,
            starting: Vec::new(),
            working: Vec::new(),
        }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CcdConfig::default())
    }

    pub fn config(&self) -> &CcdConfig {
        &self.config
    }

    /// Drive the chain's effector toward the requested target.
    ///
    /// Deterministic for identical inputs. Being a local greedy heuristic,
    /// different starting configurations can converge to different
    /// solutions; that is expected. Never fails on an unreachable target:
    /// the best-effort values after `max_iterations` sweeps are returned
    /// with `converged = false`.
    pub fn solve(
        &mut self,
        robot: &mut Robot,
        chain: &Chain,
        request: &SolveRequest,
    ) -> SolveOutcome {
        if chain.is_empty() {
            return SolveOutcome::NoSolution;
        }

        self.starting.clear();
        self.starting
            .extend(chain.joints().iter().map(|&j| robot.joint(j).value()));
        self.working.clear();
        self.working.extend_from_slice(&self.starting);

        robot.update_world_transforms();
        let effector = chain.effector_link();
        let actual = *robot.link_world(effector);

        // Constant tool-tip offsets, captured once at the starting pose.
        let offset = request.current_effector_position - actual.translation.vector;
        let orientation_offset = request
            .current_effector_orientation
            .map(|supplied| supplied * actual.rotation.inverse());
        let target_orientation = request
            .target_orientation
            .map(|[roll, pitch, yaw]| UnitQuaternion::from_euler_angles(roll, pitch, yaw));

        let n = chain.len();
        let mut converged = false;
        let mut iterations = 0u32;
        let mut position_error = f32::INFINITY;
        let mut orientation_error = 0.0f32;

        for iteration in 0..=self.config.max_iterations {
            for (i, &j) in chain.joints().iter().enumerate() {
                robot.set_joint_value_at(j, self.working[i]);
            }
            robot.update_world_transforms();

            let pose = robot.link_world(effector);
            let effector_pos = pose.translation.vector + offset;
            position_error = (effector_pos - request.target_position).norm();
            orientation_error = match &target_orientation {
                Some(target) => {
                    let current = orientation_offset
                        .map_or(pose.rotation, |ori_offset| ori_offset * pose.rotation);
                    target.angle_to(&current)
                }
                None => 0.0,
            };

            let within_tolerance = position_error < self.config.tolerance
                && (target_orientation.is_none()
                    || orientation_error < 2.0 * self.config.tolerance);
            if within_tolerance {
                converged = true;
                iterations = iteration;
                break;
            }
            if iteration == self.config.max_iterations {
                iterations = iteration;
                break;
            }
            iterations = iteration + 1;

            // One CCD sweep, effector to base. Each adjustment moves the
            // effector, so position and axis are re-read per joint.
            for (i, &j) in chain.joints().iter().enumerate().rev() {
                let joint_pos = robot.joint_world(j).translation.vector;
                let axis = robot.joint_world_axis(j);
                let effector_pos = robot.link_world(effector).translation.vector + offset;

                let to_effector = effector_pos - joint_pos;
                let to_target = request.target_position - joint_pos;
                if to_effector.norm() < MIN_LEVER || to_target.norm() < MIN_LEVER {
                    continue;
                }
                let to_effector = to_effector.normalize();
                let to_target = to_target.normalize();

                let mut position_angle =
                    to_effector.dot(&to_target).clamp(-0.999, 0.999).acos();
                if to_effector.cross(&to_target).dot(&axis) < 0.0 {
                    position_angle = -position_angle;
                }

                let total_angle = match &target_orientation {
                    None => position_angle,
                    Some(_) => {
                        let mut orientation_angle = 0.0;
                        if self.config.orientation_weight > 0.0
                            && orientation_error > self.config.orientation_threshold
                        {
                            // Joints nearer the base carry the larger share.
                            let joint_weight = (n - i) as f32 / n as f32;
                            orientation_angle = orientation_error
                                * self.config.orientation_weight
                                * joint_weight
                                * self.config.orientation_scale;
                        }
                        let position_weight = if position_error > self.config.coarse_distance {
                            self.config.position_weight_coarse
                        } else {
                            self.config.position_weight_fine
                        };
                        position_angle * position_weight
                            + orientation_angle * (1.0 - position_weight)
                    }
                };

                let step = (total_angle * self.config.damping_factor)
                    .clamp(-self.config.angle_limit, self.config.angle_limit);
                let (lower, upper) = robot.joint(j).clamp_range();
                self.working[i] = (self.working[i] + step).clamp(lower, upper);
                robot.set_joint_value_at(j, self.working[i]);
                robot.update_world_transforms();
            }
        }

        // Restore: the solve never mutates the robot it was handed.
        for (i, &j) in chain.joints().iter().enumerate() {
            robot.set_joint_value_at(j, self.starting[i]);
        }
        robot.update_world_transforms();

        let joint_values = chain
            .joints()
            .iter()
            .zip(&self.working)
            .map(|(&j, &v)| (robot.joint(j).name.clone(), v))
            .collect();

        trace!(
            "ccd solve: converged={converged} iterations={iterations} \
             position_error={position_error:.4} orientation_error={orientation_error:.4}"
        );

        SolveOutcome::Solved(Solution {
            joint_values,
            converged,
            iterations,
            position_error,
            orientation_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armature_urdf::parse_string;
    use std::f32::consts::FRAC_PI_2;

    const SINGLE_JOINT: &str = r#"
        <robot name="single_joint">
            <link name="base"/>
            <link name="arm"/>
            <link name="tip"/>
            <joint name="pivot" type="revolute">
                <parent link="base"/><child link="arm"/>
                <axis xyz="0 0 1"/>
            </joint>
            <joint name="tip_fixed" type="fixed">
                <parent link="arm"/><child link="tip"/>
                <origin xyz="1 0 0"/>
            </joint>
        </robot>
    "#;

    const PLANAR_ARM: &str = r#"
        <robot name="planar_arm">
            <link name="base"/>
            <link name="upper"/>
            <link name="lower"/>
            <link name="tip"/>
            <joint name="shoulder" type="revolute">
                <parent link="base"/><child link="upper"/>
                <axis xyz="0 0 1"/>
            </joint>
            <joint name="elbow" type="revolute">
                <parent link="upper"/><child link="lower"/>
                <origin xyz="1 0 0"/>
                <axis xyz="0 0 1"/>
            </joint>
            <joint name="tip_fixed" type="fixed">
                <parent link="lower"/><child link="tip"/>
                <origin xyz="1 0 0"/>
            </joint>
        </robot>
    "#;

    const FIXED_ONLY: &str = r#"
        <robot name="fixed_only">
            <link name="base"/>
            <link name="mount"/>
            <joint name="mount_fixed" type="fixed">
                <parent link="base"/><child link="mount"/>
                <origin xyz="0.5 0 0"/>
            </joint>
        </robot>
    "#;

    fn setup(urdf: &str, effector: &str) -> (Robot, Chain) {
        let robot = Robot::from_model(&parse_string(urdf).unwrap()).unwrap();
        let link = robot.link_index(effector).unwrap();
        let chain = Chain::to_link(&robot, link);
        (robot, chain)
    }

    fn effector_position(robot: &Robot, chain: &Chain) -> Vector3<f32> {
        robot.link_world(chain.effector_link()).translation.vector
    }

    #[test]
    fn single_joint_reaches_quarter_turn() {
        let (mut robot, chain) = setup(SINGLE_JOINT, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest::position(current, Vector3::new(0.0, 1.0, 0.0));

        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(solution.converged, "position_error={}", solution.position_error);
        assert!(solution.iterations <= 10);
        assert!(solution.position_error < 0.01);
        assert_relative_eq!(solution.joint_values["pivot"], FRAC_PI_2, epsilon = 0.05);
    }

    #[test]
    fn two_link_converges_within_loose_tolerance() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest::position(current, Vector3::new(0.5, 1.5, 0.0));

        let mut solver = CcdSolver::new(CcdConfig {
            max_iterations: 20,
            tolerance: 0.05,
            ..CcdConfig::default()
        });
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(solution.converged, "position_error={}", solution.position_error);
        assert!(solution.position_error < 0.05);

        // Applying the returned values actually places the effector there.
        robot
            .apply_joint_values(
                solution
                    .joint_values
                    .iter()
                    .map(|(name, &v)| (name.as_str(), v)),
            )
            .unwrap();
        let reached = effector_position(&robot, &chain);
        assert!((reached - Vector3::new(0.5, 1.5, 0.0)).norm() < 0.05);
    }

    #[test]
    fn unreachable_target_terminates_with_best_effort() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest::position(current, Vector3::new(5.0, 5.0, 0.0));

        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 10);
        assert!(solution.position_error > 1.0);
        assert_eq!(solution.joint_values.len(), 2);
    }

    #[test]
    fn per_sweep_step_is_bounded() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest::position(current, Vector3::new(0.0, 2.0, 0.0));

        let config = CcdConfig {
            max_iterations: 1,
            ..CcdConfig::default()
        };
        let angle_limit = config.angle_limit;
        let mut solver = CcdSolver::new(config);
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        // One sweep from all-zero: each joint moved at most angle_limit.
        for &v in solution.joint_values.values() {
            assert!(v.abs() <= angle_limit + 1e-6, "step {v} exceeds cap");
        }
    }

    #[test]
    fn solve_does_not_mutate_robot() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        robot.set_joint_value("shoulder", 0.2).unwrap();
        robot.set_joint_value("elbow", -0.1).unwrap();
        robot.update_world_transforms();
        let current = effector_position(&robot, &chain);

        let request = SolveRequest::position(current, Vector3::new(0.5, 1.5, 0.0));
        let mut solver = CcdSolver::with_defaults();
        let _ = solver.solve(&mut robot, &chain, &request);

        let shoulder = robot.joint_index("shoulder").unwrap();
        let elbow = robot.joint_index("elbow").unwrap();
        assert_eq!(robot.joint(shoulder).value(), 0.2);
        assert_eq!(robot.joint(elbow).value(), -0.1);
    }

    #[test]
    fn empty_chain_returns_no_solution() {
        let (mut robot, chain) = setup(FIXED_ONLY, "mount");
        assert!(chain.is_empty());

        let request = SolveRequest::position(
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        );
        let mut solver = CcdSolver::with_defaults();
        assert!(solver.solve(&mut robot, &chain, &request).is_no_solution());
    }

    #[test]
    fn tool_tip_offset_already_at_target() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        // Caller tracks a tool tip 0.5 beyond the last link.
        let tool_tip = effector_position(&robot, &chain) + Vector3::new(0.5, 0.0, 0.0);
        let request = SolveRequest::position(tool_tip, tool_tip);

        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn tool_tip_offset_drives_toward_target() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let tool_tip = effector_position(&robot, &chain) + Vector3::new(0.5, 0.0, 0.0);
        let target = Vector3::new(0.5, 2.0, 0.0);
        let initial_error = (tool_tip - target).norm();

        let request = SolveRequest::position(tool_tip, target);
        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(solution.position_error < 0.5);
        assert!(solution.position_error < initial_error);
    }

    #[test]
    fn orientation_target_already_satisfied() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest {
            current_effector_position: current,
            current_effector_orientation: None,
            target_position: current,
            target_orientation: Some([0.0, 0.0, 0.0]),
        };

        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
        assert!(solution.orientation_error < 0.02);
    }

    #[test]
    fn single_joint_converges_with_orientation_target() {
        let (mut robot, chain) = setup(SINGLE_JOINT, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest {
            current_effector_position: current,
            current_effector_orientation: None,
            target_position: Vector3::new(0.0, 1.0, 0.0),
            target_orientation: Some([0.0, 0.0, FRAC_PI_2]),
        };

        // Orientation blending slows the position term; give it headroom.
        let mut solver = CcdSolver::new(CcdConfig {
            max_iterations: 20,
            ..CcdConfig::default()
        });
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(
            solution.converged,
            "position_error={} orientation_error={}",
            solution.position_error, solution.orientation_error
        );
        assert!(solution.orientation_error < 0.02);
        assert_relative_eq!(solution.joint_values["pivot"], FRAC_PI_2, epsilon = 0.05);
    }

    #[test]
    fn identical_inputs_give_identical_solutions() {
        let (mut robot, chain) = setup(PLANAR_ARM, "tip");
        let current = effector_position(&robot, &chain);
        let request = SolveRequest::position(current, Vector3::new(1.2, 0.9, 0.0));

        let mut solver = CcdSolver::with_defaults();
        let first = solver.solve(&mut robot, &chain, &request);
        let second = solver.solve(&mut robot, &chain, &request);

        let first = first.solution().unwrap();
        let second = second.solution().unwrap();
        assert_eq!(first.joint_values, second.joint_values);
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn solution_respects_joint_limits() {
        let urdf = r#"
            <robot name="limited">
                <link name="base"/>
                <link name="arm"/>
                <link name="tip"/>
                <joint name="pivot" type="revolute">
                    <parent link="base"/><child link="arm"/>
                    <axis xyz="0 0 1"/>
                    <limit lower="-0.5" upper="0.5"/>
                </joint>
                <joint name="tip_fixed" type="fixed">
                    <parent link="arm"/><child link="tip"/>
                    <origin xyz="1 0 0"/>
                </joint>
            </robot>
        "#;
        let (mut robot, chain) = setup(urdf, "tip");
        let current = effector_position(&robot, &chain);
        // Target needs a full quarter turn, but the joint stops at 0.5.
        let request = SolveRequest::position(current, Vector3::new(0.0, 1.0, 0.0));

        let mut solver = CcdSolver::with_defaults();
        let outcome = solver.solve(&mut robot, &chain, &request);
        let solution = outcome.solution().unwrap();

        assert!(!solution.converged);
        let v = solution.joint_values["pivot"];
        assert!(v <= 0.5 + 1e-6);
        assert_relative_eq!(v, 0.5, epsilon = 1e-5);
    }
}
