//! Solve a reach target for a small planar arm and print the result.
//!
//! Run with `RUST_LOG=trace` to see per-solve diagnostics.

use nalgebra::Vector3;

use armature_ik::{CcdSolver, Chain, SolveOutcome, SolveRequest};
use armature_urdf::{parse_string, Robot};

const PLANAR_ARM: &str = r#"
    <robot name="planar_arm">
        <link name="base"/>
        <link name="upper"/>
        <link name="lower"/>
        <link name="tool_tip"/>
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
            <parent link="lower"/><child link="tool_tip"/>
            <origin xyz="1 0 0"/>
        </joint>
    </robot>
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let model = parse_string(PLANAR_ARM)?;
    let mut robot = Robot::from_model(&model)?;
    let chain = Chain::for_robot(&robot).ok_or("robot has no links")?;
    println!(
        "chain: {:?} -> {}",
        chain.joint_names(&robot),
        robot.link(chain.effector_link()).name
    );

    let current = robot
        .link_world(chain.effector_link())
        .translation
        .vector;
    let target = Vector3::new(0.5, 1.5, 0.0);
    let request = SolveRequest::position(current, target);

    let mut solver = CcdSolver::with_defaults();
    match solver.solve(&mut robot, &chain, &request) {
        SolveOutcome::Solved(solution) => {
            println!(
                "converged={} iterations={} position_error={:.4}",
                solution.converged, solution.iterations, solution.position_error
            );
            let mut names: Vec<_> = solution.joint_values.keys().collect();
            names.sort();
            for name in names {
                println!("  {name} = {:.4} rad", solution.joint_values[name]);
            }
        }
        SolveOutcome::NoSolution => println!("no movable joints to solve with"),
    }
    Ok(())
}
