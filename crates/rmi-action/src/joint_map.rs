//! Joint-order mapping between a goal and the driver.
//!
//! A goal may list its joints in any order.  [`joint_mapping`] computes,
//! once per goal, where each canonical joint lives in the goal's arrays;
//! [`reorder_trajectory`] then rewrites every waypoint in one pass.
//!
//! ```
//! use rmi_action::joint_map::{joint_mapping, sort_by_indices};
//!
//! let canonical = vec!["a".to_string(), "b".to_string(), "c".to_string()];
//! let incoming = vec!["c".to_string(), "a".to_string(), "b".to_string()];
//!
//! let mapping = joint_mapping(&canonical, &incoming).unwrap();
//! assert_eq!(mapping, vec![1, 2, 0]);
//! assert_eq!(sort_by_indices(&mapping, &[30.0, 10.0, 20.0]).unwrap(), vec![10.0, 20.0, 30.0]);
//! ```

use rmi_types::{JointTrajectory, RmiError, Waypoint};

/// `mapping[i]` is the index of canonical joint `i` in `incoming`.
///
/// # Errors
///
/// [`RmiError::InvalidJoints`] when the counts differ, a canonical joint is
/// missing from `incoming`, or `incoming` names a joint twice.
pub fn joint_mapping(canonical: &[String], incoming: &[String]) -> Result<Vec<usize>, RmiError> {
    if canonical.len() != incoming.len() {
        return Err(RmiError::InvalidJoints(format!(
            "goal has {} joints, driver is configured for {}",
            incoming.len(),
            canonical.len()
        )));
    }

    let mut seen = vec![false; incoming.len()];
    let mut mapping = Vec::with_capacity(canonical.len());
    for name in canonical {
        let idx = incoming
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| RmiError::InvalidJoints(format!("joint '{name}' missing from goal")))?;
        if seen[idx] {
            return Err(RmiError::InvalidJoints(format!(
                "joint '{name}' mapped twice"
            )));
        }
        seen[idx] = true;
        mapping.push(idx);
    }
    Ok(mapping)
}

/// Rearrange `values` so that `out[i] = values[mapping[i]]`.  An empty
/// slice stays empty (the array was not provided).
///
/// # Errors
///
/// [`RmiError::InvalidGoal`] when a non-empty `values` does not have one
/// entry per mapped joint.
pub fn sort_by_indices<T: Clone>(mapping: &[usize], values: &[T]) -> Result<Vec<T>, RmiError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    if values.len() != mapping.len() || mapping.iter().any(|&i| i >= values.len()) {
        return Err(RmiError::InvalidGoal(format!(
            "array has {} entries, expected {}",
            values.len(),
            mapping.len()
        )));
    }
    Ok(mapping.iter().map(|&i| values[i].clone()).collect())
}

/// Apply `mapping` to the joint names and to every waypoint array.
/// `time_from_start` is carried over unchanged.
///
/// Every waypoint must carry one position per joint; the other arrays may
/// be empty.
pub fn reorder_trajectory(
    mapping: &[usize],
    trajectory: &JointTrajectory,
) -> Result<JointTrajectory, RmiError> {
    let points = trajectory
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if p.positions.len() != mapping.len() {
                return Err(RmiError::InvalidGoal(format!(
                    "waypoint {i} has {} positions, expected {}",
                    p.positions.len(),
                    mapping.len()
                )));
            }
            Ok(Waypoint {
                positions: sort_by_indices(mapping, &p.positions)?,
                velocities: sort_by_indices(mapping, &p.velocities)?,
                accelerations: sort_by_indices(mapping, &p.accelerations)?,
                effort: sort_by_indices(mapping, &p.effort)?,
                time_from_start: p.time_from_start,
            })
        })
        .collect::<Result<Vec<_>, RmiError>>()?;

    Ok(JointTrajectory {
        joint_names: sort_by_indices(mapping, &trajectory.joint_names)?,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identity_mapping_for_same_order() {
        let joints = names(&["a", "b", "c"]);
        assert_eq!(joint_mapping(&joints, &joints).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn count_mismatch_is_invalid_joints() {
        let result = joint_mapping(&names(&["a", "b", "c"]), &names(&["a", "b"]));
        assert!(matches!(result, Err(RmiError::InvalidJoints(_))));
    }

    #[test]
    fn unknown_joint_is_invalid_joints() {
        let result = joint_mapping(&names(&["a", "b", "c"]), &names(&["a", "b", "x"]));
        assert!(matches!(result, Err(RmiError::InvalidJoints(msg)) if msg.contains("'c'")));
    }

    #[test]
    fn duplicate_canonical_name_is_invalid_joints() {
        let result = joint_mapping(&names(&["a", "a", "b"]), &names(&["a", "b", "c"]));
        assert!(matches!(result, Err(RmiError::InvalidJoints(_))));
    }

    #[test]
    fn wrong_length_array_is_invalid_goal() {
        let result = sort_by_indices(&[1, 2, 0], &[1.0, 2.0]);
        assert!(matches!(result, Err(RmiError::InvalidGoal(_))));
    }

    #[test]
    fn waypoint_without_positions_is_invalid_goal() {
        let traj = JointTrajectory {
            joint_names: names(&["a", "b"]),
            points: vec![Waypoint::from_positions(vec![1.0, 2.0]), Waypoint::default()],
        };
        let result = reorder_trajectory(&[0, 1], &traj);
        assert!(matches!(result, Err(RmiError::InvalidGoal(msg)) if msg.contains("waypoint 1")));
    }

    #[test]
    fn reorder_rewrites_every_array() {
        let traj = JointTrajectory {
            joint_names: names(&["c", "a", "b"]),
            points: vec![Waypoint {
                positions: vec![3.0, 1.0, 2.0],
                velocities: vec![0.3, 0.1, 0.2],
                accelerations: vec![],
                effort: vec![30.0, 10.0, 20.0],
                time_from_start: Duration::from_millis(250),
            }],
        };
        let mapping = joint_mapping(&names(&["a", "b", "c"]), &traj.joint_names).unwrap();
        let sorted = reorder_trajectory(&mapping, &traj).unwrap();

        assert_eq!(sorted.joint_names, names(&["a", "b", "c"]));
        let p = &sorted.points[0];
        assert_eq!(p.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(p.velocities, vec![0.1, 0.2, 0.3]);
        assert!(p.accelerations.is_empty());
        assert_eq!(p.effort, vec![10.0, 20.0, 30.0]);
        assert_eq!(p.time_from_start, Duration::from_millis(250));
    }
}
