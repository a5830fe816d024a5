//! `rmi-driver` – runs the RMI translation core against a simulated
//! controller.
//!
//! 1. Loads `~/.rmi/config.toml` (written with defaults on first run) and
//!    applies the `RMI_*` environment overrides.
//! 2. Builds the command registry with the built-in handlers and wires the
//!    command bus, the list dispatcher and the goal coordinator.
//! 3. With a trajectory JSON path as the first argument, submits it as a
//!    goal and exits with its outcome.  Without one, idles until Ctrl-C.
//! 4. Ctrl-C aborts the robot ("Goal cancelled") before exiting.

mod config;
mod sim;
mod telemetry;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use rmi_action::{
    BusGoalHandle, CANCEL_MESSAGE, GoalCoordinator, GoalHandle, TrajectoryActionConfig,
};
use rmi_commands::{CommandRegistry, register_default_handlers};
use rmi_middleware::{CommandBus, CommandListDispatcher};
use rmi_types::{GoalStatus, JointTrajectory, RmiError, goal_error_code};
use tracing::{debug, error, info, warn};

use crate::sim::SimController;

#[tokio::main]
async fn main() -> ExitCode {
    let telemetry_guard = telemetry::init_tracing("rmi-driver");
    if telemetry_guard.exporting() {
        info!("exporting spans over OTLP");
    }

    let cfg = match config::resolve() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(path = %config::config_path().display(), error = %e, "configuration error");
            return ExitCode::FAILURE;
        }
    };
    info!(
        namespace = %cfg.namespace,
        joints = cfg.joint_names.len(),
        host = %cfg.controller.host,
        command_port = cfg.controller.command_port,
        get_port = cfg.controller.get_port,
        "starting rmi-driver (simulated controller)"
    );

    // ── Registry ──────────────────────────────────────────────────────────
    let mut registry = CommandRegistry::new(cfg.joint_names.clone(), env!("CARGO_PKG_VERSION"));
    register_default_handlers(&mut registry);
    for handler in registry.handlers() {
        debug!(handler = %handler.as_ref(), "registered handler");
    }
    let registry = Arc::new(registry);

    // ── Bus, dispatcher, coordinator ─────────────────────────────────────
    let bus = CommandBus::new(cfg.bus_capacity);
    let controller = Arc::new(SimController::start(bus.clone(), cfg.controller.sim_step()));
    let dispatcher = CommandListDispatcher::new(registry.clone(), controller, bus.clone()).spawn();

    let coordinator = Arc::new(GoalCoordinator::new(
        TrajectoryActionConfig {
            namespace: cfg.namespace.clone(),
            abort_grace: cfg.abort_grace(),
        },
        registry,
        Arc::new(bus.clone()),
    ));
    let listener = coordinator.clone().spawn_result_listener(&bus);

    let outcome = match std::env::args().nth(1) {
        Some(path) => run_goal(&coordinator, &bus, Path::new(&path)).await,
        None => {
            info!("no trajectory given; press Ctrl-C to stop");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            coordinator
                .abort(goal_error_code::ABORTED, CANCEL_MESSAGE)
                .await;
            ExitCode::SUCCESS
        }
    };

    listener.abort();
    dispatcher.abort();
    info!("rmi-driver stopped");
    outcome
}

/// Submit the trajectory at `path` and wait for its resolution.
async fn run_goal(coordinator: &GoalCoordinator, bus: &CommandBus, path: &Path) -> ExitCode {
    let trajectory = match load_trajectory(path) {
        Ok(trajectory) => trajectory,
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot load trajectory");
            return ExitCode::FAILURE;
        }
    };

    let goal = BusGoalHandle::new(trajectory, bus.clone());
    coordinator.on_goal(goal.clone()).await;

    let status = tokio::select! {
        status = goal.wait_terminal() => status,
        _ = tokio::signal::ctrl_c() => {
            warn!(goal_id = %goal.id(), "Ctrl-C received, cancelling goal");
            coordinator.on_cancel(goal.id()).await;
            goal.status()
        }
    };

    match status {
        Some(GoalStatus::Succeeded) => {
            info!(goal_id = %goal.id(), "trajectory completed");
            ExitCode::SUCCESS
        }
        other => {
            error!(goal_id = %goal.id(), status = ?other, "trajectory did not complete");
            ExitCode::FAILURE
        }
    }
}

fn load_trajectory(path: &Path) -> Result<JointTrajectory, RmiError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RmiError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_trajectory(&raw)
}

fn parse_trajectory(raw: &str) -> Result<JointTrajectory, RmiError> {
    serde_json::from_str(raw).map_err(|e| RmiError::InvalidGoal(format!("bad trajectory JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmi_middleware::Topic;
    use std::time::Duration;

    #[test]
    fn demo_trajectory_parses() {
        let traj = parse_trajectory(include_str!("../demos/six_axis.json")).unwrap();
        assert_eq!(traj.joint_names.len(), 6);
        assert_eq!(traj.points.len(), 4);
        assert!(traj.points[0].velocities.is_empty());
        assert_eq!(traj.points[1].velocities.len(), 6);
    }

    #[test]
    fn malformed_trajectory_is_invalid_goal() {
        assert!(matches!(
            parse_trajectory("{\"points\": 3}"),
            Err(RmiError::InvalidGoal(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_goal_runs_to_success_on_sim_controller() {
        let cfg = config::Config::default();
        let mut registry = CommandRegistry::new(cfg.joint_names.clone(), "test");
        register_default_handlers(&mut registry);
        let registry = Arc::new(registry);

        let bus = CommandBus::default();
        let controller = Arc::new(SimController::start(bus.clone(), Duration::from_millis(5)));
        let dispatcher =
            CommandListDispatcher::new(registry.clone(), controller, bus.clone()).spawn();
        let coordinator = Arc::new(GoalCoordinator::new(
            TrajectoryActionConfig::default(),
            registry,
            Arc::new(bus.clone()),
        ));
        let listener = coordinator.clone().spawn_result_listener(&bus);
        let mut statuses = bus.subscribe_to(Topic::GoalStatus);

        let traj = parse_trajectory(include_str!("../demos/six_axis.json")).unwrap();
        let goal = BusGoalHandle::new(traj, bus.clone());
        coordinator.on_goal(goal.clone()).await;

        assert_eq!(goal.wait_terminal().await, Some(GoalStatus::Succeeded));
        assert!(statuses.try_recv().is_ok());
        assert!(!coordinator.is_active().await);

        listener.abort();
        dispatcher.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn single_point_goal_superseding_another_waits_for_its_own_result() {
        let step = Duration::from_millis(50);
        let joints = vec!["a".to_string(), "b".to_string()];
        let mut registry = CommandRegistry::new(joints.clone(), "test");
        register_default_handlers(&mut registry);
        let registry = Arc::new(registry);

        let bus = CommandBus::default();
        let controller = Arc::new(SimController::start(bus.clone(), step));
        let dispatcher =
            CommandListDispatcher::new(registry.clone(), controller, bus.clone()).spawn();
        let coordinator = Arc::new(GoalCoordinator::new(
            TrajectoryActionConfig::default(),
            registry,
            Arc::new(bus.clone()),
        ));
        let listener = coordinator.clone().spawn_result_listener(&bus);

        let goal_of = |points: usize| {
            let traj = JointTrajectory {
                joint_names: joints.clone(),
                points: (0..points)
                    .map(|i| rmi_types::Waypoint::from_positions(vec![i as f64; 2]))
                    .collect(),
            };
            BusGoalHandle::new(traj, bus.clone())
        };
        let first = goal_of(3);
        let second = goal_of(1);
        coordinator.on_goal(first.clone()).await;
        coordinator.on_goal(second.clone()).await;

        // ABORT_OK and the first goal's in-flight result arrive well within
        // one step; neither may complete the second goal.
        tokio::time::sleep(step / 5).await;
        assert_eq!(second.status(), Some(GoalStatus::Accepted));

        let start = tokio::time::Instant::now();
        assert_eq!(second.wait_terminal().await, Some(GoalStatus::Succeeded));
        assert!(start.elapsed() >= step / 2);
        assert!(matches!(first.status(), Some(GoalStatus::Canceled { .. })));

        listener.abort();
        dispatcher.abort();
    }
}
