//! End-effector selection heuristic.
//!
//! Robot descriptions rarely declare which link is the working end of the
//! arm. This module guesses: first by conventional terminal-link names,
//! then by picking the deepest link in the tree.

use armature_urdf::Robot;

/// Conventional terminal-link names, tried in order.
const TERMINAL_LINK_NAMES: &[&str] = &[
    "tool_tip",
    "tool0",
    "tcp",
    "end_effector",
    "ee_link",
    "gripper",
    "hand",
    "tool",
];

/// Pick the link the solver should drive toward targets.
///
/// Returns the first link whose name matches the conventional list;
/// otherwise the deepest link by depth-first traversal from the root,
/// ties broken by traversal order. `None` only for a robot with no links.
pub fn find_end_effector(robot: &Robot) -> Option<usize> {
    for name in TERMINAL_LINK_NAMES {
        if let Some(index) = robot.link_index(name) {
            return Some(index);
        }
    }

    if robot.link_count() == 0 {
        return None;
    }

    let mut best = (robot.root(), 0usize);
    let mut stack = vec![(robot.root(), 0usize)];
    while let Some((link, depth)) = stack.pop() {
        if depth > best.1 {
            best = (link, depth);
        }
        // Reverse push keeps declaration-order traversal on a stack.
        for &j in robot.link(link).child_joints.iter().rev() {
            stack.push((robot.joint(j).child_link, depth + 1));
        }
    }
    Some(best.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
