//! Unit and scenario tests for fleet-dispatch.

use chrono::Duration;
use fleet_core::time::parse_timestamp;
use fleet_core::{Position, RobotId, TableId, Timestamp};

use crate::{
    Algorithm, DispatchConfig, DispatchEngine, DispatchEngineBuilder, FailoverConfig,
    MemoryAlertSink, Robot, TaskRequest, TaskType,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Monday noon.
fn t0() -> Timestamp {
    parse_timestamp("2024-03-04T12:00:00Z").unwrap()
}

fn at(secs: i64) -> Timestamp {
    t0() + Duration::seconds(secs)
}

fn robot(id: u32, x: f32, y: f32) -> Robot {
    Robot::new(RobotId(id), format!("bot-{id}"), Position::new(x, y), t0())
}

fn engine(algorithm: Algorithm, robots: Vec<Robot>) -> (DispatchEngine, MemoryAlertSink) {
    let alerts = MemoryAlertSink::new();
    let engine = DispatchEngineBuilder::new()
        .config(DispatchConfig { algorithm, ..Default::default() })
        .robots(robots)
        .alert_sink(alerts.clone())
        .build()
        .unwrap();
    (engine, alerts)
}

fn deliver_to_origin() -> TaskRequest {
    TaskRequest::new(TaskType::Deliver).table(TableId(1), Position::ORIGIN)
}

// ── TaskQueue ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod queue {
    use super::*;
    use crate::{TaskPriority, TaskStatus};

    #[test]
    fn pending_sorted_by_priority_then_age() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let low = e.create_task(TaskRequest::new(TaskType::Patrol).priority(TaskPriority::Low), at(0));
        let n1 = e.create_task(TaskRequest::new(TaskType::Deliver), at(1));
        let urgent = e.create_task(
            TaskRequest::new(TaskType::Escort).priority(TaskPriority::Urgent),
            at(2),
        );
        let n2 = e.create_task(TaskRequest::new(TaskType::Service), at(3));

        let order: Vec<_> = e.pending_tasks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![urgent, n1, n2, low]);
    }

    #[test]
    fn same_instant_falls_back_to_id() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let a = e.create_task(TaskRequest::new(TaskType::Deliver), at(0));
        let b = e.create_task(TaskRequest::new(TaskType::Deliver), at(0));
        let order: Vec<_> = e.pending_tasks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn cancel_pending_task() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let id = e.create_task(TaskRequest::new(TaskType::Cleaning), at(0));
        assert_eq!(e.queue().pending_len(), 1);
        e.cancel_task(id, at(5)).unwrap();
        assert_eq!(e.queue().pending_len(), 0);
        let task = e.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.completed_at, Some(at(5)));
        assert!(e.pending_tasks().is_empty());
    }

    #[test]
    fn cancel_assigned_task_is_a_conflict() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), at(0));
        e.auto_assign_pending_tasks(at(0));
        assert_eq!(e.queue().active_len(), 1);
        let err = e.cancel_task(id, at(1)).unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn list_filters_by_status() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.create_task(deliver_to_origin(), at(0));
        e.create_task(deliver_to_origin(), at(1));
        e.auto_assign_pending_tasks(at(2));
        assert_eq!(e.list_tasks(Some(TaskStatus::Assigned)).len(), 1);
        assert_eq!(e.list_tasks(Some(TaskStatus::Pending)).len(), 1);
        assert_eq!(e.list_tasks(None).len(), 2);
    }

    #[test]
    fn prune_drops_only_old_terminal_tasks() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let old = e.create_task(TaskRequest::new(TaskType::Deliver), at(0));
        let keep = e.create_task(TaskRequest::new(TaskType::Deliver), at(0));
        e.cancel_task(old, at(10)).unwrap();
        assert_eq!(e.prune_finished(at(60)), 1);
        assert!(e.get_task(old).is_none());
        assert!(e.get_task(keep).is_some());
    }
}

// ── Escalation ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod escalation {
    use super::*;
    use crate::TaskPriority;

    #[test]
    fn normal_task_escalates_to_high_then_urgent_then_stays() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let id = e.create_task(TaskRequest::new(TaskType::Deliver), t0());

        e.escalate(at(2 * 60));
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::Normal);

        e.escalate(at(4 * 60));
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::High);

        e.escalate(at(7 * 60));
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::Urgent);

        let raised = e.escalate(at(10 * 60));
        assert!(raised.is_empty());
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::Urgent);
    }

    #[test]
    fn exactly_one_window_is_enough() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let id = e.create_task(TaskRequest::new(TaskType::Deliver), t0());
        assert!(e.escalate(at(179)).is_empty());
        assert_eq!(e.escalate(at(180)), vec![(id, TaskPriority::High)]);
    }

    #[test]
    fn never_twice_in_one_window() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let id = e.create_task(TaskRequest::new(TaskType::Deliver).priority(TaskPriority::Low), t0());
        e.escalate(at(200));
        e.escalate(at(201));
        e.escalate(at(370));
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::Normal);
    }

    #[test]
    fn assigned_tasks_do_not_escalate() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.escalate(at(600));
        assert_eq!(e.get_task(id).unwrap().priority, TaskPriority::Normal);
    }

    use proptest::prelude::*;

    fn any_priority() -> impl Strategy<Value = TaskPriority> {
        prop_oneof![
            Just(TaskPriority::Low),
            Just(TaskPriority::Normal),
            Just(TaskPriority::High),
            Just(TaskPriority::Urgent),
        ]
    }

    proptest! {
        #[test]
        fn priority_is_monotone_and_capped(
            start in any_priority(),
            steps in proptest::collection::vec(1u32..600, 1..40),
        ) {
            let (mut e, _) = engine(Algorithm::Nearest, vec![]);
            let id = e.create_task(TaskRequest::new(TaskType::Service).priority(start), t0());
            let mut now = t0();
            let mut last = start;
            for s in steps {
                now += Duration::seconds(s as i64);
                e.escalate(now);
                let p = e.get_task(id).unwrap().priority;
                prop_assert!(p >= last);
                prop_assert!(p <= TaskPriority::Urgent);
                last = p;
            }
        }
    }
}

// ── Selection strategies ──────────────────────────────────────────────────────

#[cfg(test)]
mod strategy {
    use super::*;
    use crate::{Candidate, Task, TaskPriority};

    fn candidate(r: &Robot, active_tasks: u32, last_assigned: Option<u64>) -> Candidate<'_> {
        Candidate { robot: r, active_tasks, last_assigned }
    }

    fn probe(priority: TaskPriority) -> Task {
        Task::new(fleet_core::TaskId(1), deliver_to_origin().priority(priority), t0())
    }

    #[test]
    fn nearest_picks_closer_robot() {
        // R1 at distance 5, R2 at distance 50.
        let (e, _) = engine(
            Algorithm::Nearest,
            vec![robot(1, 3.0, 4.0), robot(2, 30.0, 40.0)],
        );
        let task = probe(TaskPriority::Normal);
        assert_eq!(e.find_best_robot_for_task(&task, t0()), Some(RobotId(1)));
    }

    #[test]
    fn nearest_ignores_id_when_distance_differs() {
        let (e, _) = engine(
            Algorithm::Nearest,
            vec![robot(1, 30.0, 40.0), robot(2, 3.0, 4.0)],
        );
        let task = probe(TaskPriority::Normal);
        assert_eq!(e.find_best_robot_for_task(&task, t0()), Some(RobotId(2)));
    }

    #[test]
    fn nearest_tie_breaks_on_lowest_id() {
        let (e, _) = engine(
            Algorithm::Nearest,
            vec![robot(7, 0.0, 5.0), robot(3, 5.0, 0.0)],
        );
        let task = probe(TaskPriority::Normal);
        assert_eq!(e.find_best_robot_for_task(&task, t0()), Some(RobotId(3)));
    }

    #[test]
    fn load_balanced_prefers_fewer_tasks_then_battery() {
        let a = robot(1, 0.0, 0.0).with_battery(90.0);
        let b = robot(2, 0.0, 0.0).with_battery(60.0);
        let c = robot(3, 0.0, 0.0).with_battery(95.0);
        let task = probe(TaskPriority::Normal);
        let sel = Algorithm::LoadBalanced.selector();

        let cands = [candidate(&a, 1, None), candidate(&b, 0, None), candidate(&c, 1, None)];
        assert_eq!(sel.select(&cands, &task), Some(RobotId(2)));

        let cands = [candidate(&a, 0, None), candidate(&b, 0, None), candidate(&c, 0, None)];
        assert_eq!(sel.select(&cands, &task), Some(RobotId(3)));
    }

    #[test]
    fn round_robin_prefers_never_assigned() {
        let a = robot(1, 0.0, 0.0);
        let b = robot(2, 0.0, 0.0);
        let c = robot(3, 0.0, 0.0);
        let task = probe(TaskPriority::Normal);
        let cands = [
            candidate(&a, 0, Some(4)),
            candidate(&b, 0, None),
            candidate(&c, 0, Some(2)),
        ];
        assert_eq!(Algorithm::RoundRobin.selector().select(&cands, &task), Some(RobotId(2)));
    }

    #[test]
    fn priority_maximizes_battery_for_high_tasks() {
        let near_low = robot(1, 1.0, 0.0).with_battery(40.0);
        let far_full = robot(2, 50.0, 0.0).with_battery(100.0);
        let cands = [candidate(&near_low, 0, None), candidate(&far_full, 0, None)];
        let sel = Algorithm::Priority.selector();

        assert_eq!(sel.select(&cands, &probe(TaskPriority::High)), Some(RobotId(2)));
        assert_eq!(sel.select(&cands, &probe(TaskPriority::Urgent)), Some(RobotId(2)));
        assert_eq!(sel.select(&cands, &probe(TaskPriority::Normal)), Some(RobotId(1)));
    }

    #[test]
    fn empty_candidates_select_nothing() {
        let task = probe(TaskPriority::Normal);
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.selector().select(&[], &task), None);
        }
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod assignment {
    use super::*;
    use crate::{RobotStatus, TaskStatus};

    #[test]
    fn round_robin_three_cycles_assign_a_b_c() {
        // C is nearest, so the order proves the algorithm is not Nearest.
        let (mut e, _) = engine(
            Algorithm::RoundRobin,
            vec![robot(1, 9.0, 0.0), robot(2, 6.0, 0.0), robot(3, 1.0, 0.0)],
        );
        let mut order = Vec::new();
        for i in 0..3 {
            let now = at(i);
            let id = e.create_task(deliver_to_origin(), now);
            let summary = e.auto_assign_pending_tasks(now);
            assert_eq!(summary.assigned, 1);
            order.push(summary.assignments[0].robot);
            e.start_task(id, now).unwrap();
            e.complete_task(id, now).unwrap();
        }
        assert_eq!(order, vec![RobotId(1), RobotId(2), RobotId(3)]);
    }

    #[test]
    fn assignment_moves_task_and_robot_together() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(at(1));

        let task = e.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.robot_id, Some(RobotId(1)));
        assert_eq!(task.assigned_at, Some(at(1)));
        let r = e.get_robot(RobotId(1)).unwrap();
        assert_eq!(r.status, RobotStatus::Delivering);
        assert_eq!(r.current_task_id, Some(id));
    }

    #[test]
    fn ineligible_robots_are_skipped() {
        let mut disabled = robot(2, 0.0, 0.0);
        disabled.enabled = false;
        let (mut e, _) = engine(
            Algorithm::Nearest,
            vec![robot(1, 0.0, 0.0).with_battery(10.0), disabled],
        );
        e.create_task(deliver_to_origin(), t0());
        let summary = e.auto_assign_pending_tasks(t0());
        assert_eq!(summary.assigned, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(e.pending_tasks().len(), 1);
    }

    #[test]
    fn one_live_task_per_robot() {
        let (mut e, _) = engine(Algorithm::LoadBalanced, vec![robot(1, 0.0, 0.0), robot(2, 5.0, 5.0)]);
        e.update_config(DispatchConfig {
            algorithm: Algorithm::LoadBalanced,
            max_tasks_per_robot: 5,
            ..Default::default()
        })
        .unwrap();
        for i in 0..6 {
            e.create_task(deliver_to_origin(), at(i));
        }
        let summary = e.auto_assign_pending_tasks(at(10));
        assert_eq!(summary.assigned, 2);
        assert_eq!(summary.skipped, 4);
        for r in e.list_robots() {
            assert!(e.queue().active_count_for(r.id) <= 1);
        }
    }

    #[test]
    fn higher_priority_is_served_first() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let normal = e.create_task(deliver_to_origin(), at(0));
        let urgent = e.create_task(
            deliver_to_origin().priority(crate::TaskPriority::Urgent),
            at(1),
        );
        let summary = e.auto_assign_pending_tasks(at(2));
        assert_eq!(summary.assignments[0].task, urgent);
        assert_eq!(e.get_task(normal).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn dispatch_queue_previews_without_committing() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let a = e.create_task(deliver_to_origin(), at(0));
        let b = e.create_task(deliver_to_origin(), at(1));
        let preview = e.dispatch_queue(at(2));
        assert_eq!(preview.len(), 2);
        assert_eq!((preview[0].task.id, preview[0].proposed_robot), (a, Some(RobotId(1))));
        assert_eq!((preview[1].task.id, preview[1].proposed_robot), (b, None));
        assert_eq!(e.get_task(a).unwrap().status, TaskStatus::Pending);
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Idle);
    }

    #[test]
    fn manual_assignment_rejects_busy_robot() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let a = e.create_task(deliver_to_origin(), t0());
        let b = e.create_task(deliver_to_origin(), t0());
        e.assign_task(a, RobotId(1), t0()).unwrap();
        let err = e.assign_task(b, RobotId(1), t0()).unwrap_err();
        assert!(matches!(err, crate::DispatchError::RobotUnavailable(RobotId(1))));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn charge_task_puts_robot_on_charger() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.create_task(TaskRequest::new(TaskType::Charge), t0());
        e.auto_assign_pending_tasks(t0());
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Charging);
    }

    #[test]
    fn concurrent_passes_never_double_book() {
        use std::sync::Arc;
        use parking_lot::Mutex;

        let robots = (1..=3).map(|i| robot(i, i as f32, 0.0)).collect();
        let (mut e, _) = engine(Algorithm::Nearest, robots);
        for i in 0..10 {
            e.create_task(deliver_to_origin(), at(i));
        }
        let shared = Arc::new(Mutex::new(e));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&shared);
                std::thread::spawn(move || engine.lock().auto_assign_pending_tasks(at(20)).assigned)
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 3);
        let e = shared.lock();
        for r in e.list_robots() {
            assert_eq!(e.queue().active_count_for(r.id), 1);
        }
    }
}

// ── Failover ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod failover {
    use super::*;
    use crate::{AlertCategory, ReleaseReason, RobotStatus, TaskStatus};
    use tracing_test::traced_test;

    #[test]
    fn blocked_task_requeues_then_fails_with_one_alert() {
        let (mut e, alerts) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());

        // Attempt 1.
        e.auto_assign_pending_tasks(at(0));
        e.start_task(id, at(0)).unwrap();
        let released = e.check_blocked_tasks(at(125));
        assert_eq!(released.len(), 1);
        let task = e.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 1);
        assert_eq!(task.robot_id, None);
        assert!(alerts.is_empty());
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Idle);

        // Attempt 2, after the reassignment cooldown.
        assert_eq!(e.auto_assign_pending_tasks(at(200)).assigned, 1);
        e.start_task(id, at(200)).unwrap();
        e.check_blocked_tasks(at(325));
        assert_eq!(e.get_task(id).unwrap().retry_count, 2);
        assert!(alerts.is_empty());

        // Attempt 3 exhausts the retries.
        assert_eq!(e.auto_assign_pending_tasks(at(400)).assigned, 1);
        e.start_task(id, at(400)).unwrap();
        let released = e.check_blocked_tasks(at(525));
        assert!(released[0].failed());

        let task = e.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.retry_count, 3);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts.alerts()[0].category, AlertCategory::NavigationBlocked);
        assert_eq!(alerts.alerts()[0].task_id, Some(id));
        assert_eq!(e.alerts_raised(), 1);

        // Nothing further happens to a failed task.
        assert!(e.check_blocked_tasks(at(900)).is_empty());
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn progress_resets_blocked_timer() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(id, t0()).unwrap();
        e.update_position(RobotId(1), Position::new(1.0, 1.0), at(100)).unwrap();
        assert!(e.check_blocked_tasks(at(125)).is_empty());
        e.report_progress(id, at(200)).unwrap();
        assert!(e.check_blocked_tasks(at(310)).is_empty());
        assert_eq!(e.check_blocked_tasks(at(321)).len(), 1);
    }

    #[test]
    fn assigned_but_unstarted_tasks_are_not_blocked() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        assert!(e.check_blocked_tasks(at(1_000)).is_empty());
    }

    #[test]
    fn cooldown_keeps_failing_robot_away() {
        // Robot 1 is nearest and fails; robot 2 must get the requeued task.
        let (mut e, _) = engine(
            Algorithm::Nearest,
            vec![robot(1, 0.0, 0.0), robot(2, 20.0, 0.0)],
        );
        let id = e.create_task(deliver_to_origin(), t0());
        let first = e.auto_assign_pending_tasks(t0());
        assert_eq!(first.assignments[0].robot, RobotId(1));
        e.start_task(id, t0()).unwrap();
        e.check_blocked_tasks(at(121));

        let task = e.get_task(id).unwrap().clone();
        assert!(task.excludes(RobotId(1), at(150)));
        assert!(!task.excludes(RobotId(1), at(181)));
        assert_eq!(e.find_best_robot_for_task(&task, at(150)), Some(RobotId(2)));
        assert_eq!(e.find_best_robot_for_task(&task, at(200)), Some(RobotId(1)));
    }

    #[test]
    fn zero_cooldown_allows_immediate_reassignment() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.update_failover_config(FailoverConfig { reassign_cooldown_secs: 0, ..Default::default() })
            .unwrap();
        assert_eq!(e.failover_config().reassign_cooldown_secs, 0);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(id, t0()).unwrap();
        e.check_blocked_tasks(at(121));
        assert_eq!(e.auto_assign_pending_tasks(at(121)).assigned, 1);
    }

    #[test]
    fn requeue_restarts_escalation_window() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(id, t0()).unwrap();
        e.check_blocked_tasks(at(300));
        assert_eq!(e.get_task(id).unwrap().last_escalated_at, at(300));
        assert!(e.escalate(at(400)).is_empty());
    }

    #[test]
    fn robot_fault_sends_robot_to_error() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        let release = e.fail_task(id, "wheel jammed", at(5)).unwrap();
        assert_eq!(release.reason, ReleaseReason::RobotFault);
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Error);
        let task = e.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.error_message.as_deref(), Some("wheel jammed"));

        // Error only clears through explicit recovery.
        e.record_heartbeat(RobotId(1), at(6)).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Error);
        e.recover_robot(RobotId(1), at(7)).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Idle);
        assert!(e.recover_robot(RobotId(1), at(8)).is_err());
    }

    #[test]
    fn heartbeat_loss_errors_then_offlines_robot() {
        let (mut e, alerts) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());

        assert_eq!(e.check_heartbeats(at(30)), Default::default());

        let report = e.check_heartbeats(at(31));
        assert_eq!(report.errored, vec![RobotId(1)]);
        assert_eq!(report.released.len(), 1);
        assert_eq!(report.released[0].reason, ReleaseReason::HeartbeatLost);
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Error);
        assert_eq!(e.get_robot(RobotId(1)).unwrap().current_task_id, None);
        assert_eq!(e.get_task(id).unwrap().status, TaskStatus::Pending);
        assert!(alerts.is_empty());

        let report = e.check_heartbeats(at(301));
        assert_eq!(report.offline, vec![RobotId(1)]);
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Offline);

        e.record_heartbeat(RobotId(1), at(400)).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Idle);
    }

    #[test]
    fn heartbeat_exhausting_retries_raises_robot_error_alert() {
        let (mut e, alerts) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.update_failover_config(FailoverConfig { max_retry_count: 1, ..Default::default() })
            .unwrap();
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.check_heartbeats(at(45));
        assert_eq!(e.get_task(id).unwrap().status, TaskStatus::Failed);
        assert_eq!(alerts.alerts()[0].category, AlertCategory::RobotError);
    }

    #[test]
    fn run_cycle_applies_all_steps_against_one_instant() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0), robot(2, 1.0, 0.0)]);
        let stuck = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(stuck, t0()).unwrap();
        let waiting = e.create_task(deliver_to_origin(), t0());

        // Robot 2 keeps heartbeating; robot 1 goes silent.
        e.record_heartbeat(RobotId(2), at(200)).unwrap();
        e.update_battery(RobotId(2), 80.0).unwrap();
        let report = e.run_cycle(at(200));

        assert_eq!(report.now, at(200));
        assert!(report.escalated.iter().any(|(id, _)| *id == waiting));
        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.heartbeats.errored, vec![RobotId(1)]);
        let assignment = report.assignment.unwrap();
        assert_eq!(assignment.assigned, 1);
        assert_eq!(assignment.assignments[0].robot, RobotId(2));
    }

    #[test]
    fn run_cycle_respects_auto_assign_switch() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.update_config(DispatchConfig { auto_assign_enabled: false, ..Default::default() })
            .unwrap();
        e.create_task(deliver_to_origin(), t0());
        let report = e.run_cycle(t0());
        assert!(report.assignment.is_none());
        assert_eq!(e.pending_tasks().len(), 1);
    }

    #[traced_test]
    #[test]
    fn requeue_is_logged() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(id, t0()).unwrap();
        e.check_blocked_tasks(at(130));
        assert!(logs_contain("task requeued"));
    }
}

// ── Robots ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod robots {
    use super::*;
    use crate::{DispatchError, RobotStatus};

    #[test]
    fn duplicate_registration_rejected() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let err = e.register_robot(robot(1, 5.0, 5.0)).unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateRobot(RobotId(1))));
    }

    #[test]
    fn charging_cycle() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0).with_battery(15.0)]);
        e.begin_charging(RobotId(1)).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().status, RobotStatus::Charging);
        assert!(e.begin_charging(RobotId(1)).is_err());
        e.finish_charging(RobotId(1), 100.0).unwrap();
        let r = e.get_robot(RobotId(1)).unwrap();
        assert_eq!(r.status, RobotStatus::Idle);
        assert_eq!(r.battery_level, 100.0);
    }

    #[test]
    fn battery_is_clamped() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.update_battery(RobotId(1), 140.0).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().battery_level, 100.0);
        e.update_battery(RobotId(1), -3.0).unwrap();
        assert_eq!(e.get_robot(RobotId(1)).unwrap().battery_level, 0.0);
    }

    #[test]
    fn unknown_robot_is_not_found() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![]);
        let err = e.record_heartbeat(RobotId(9), t0()).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.body().error, "robot R9 not found");
    }

    #[test]
    fn disabling_removes_from_eligibility() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        e.set_robot_enabled(RobotId(1), false).unwrap();
        e.create_task(deliver_to_origin(), t0());
        assert_eq!(e.auto_assign_pending_tasks(t0()).skipped, 1);
        e.set_robot_enabled(RobotId(1), true).unwrap();
        assert_eq!(e.auto_assign_pending_tasks(t0()).assigned, 1);
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{ConfigStore, DispatchError, MemoryConfigStore, MAX_DURATION_SECS};

    #[test]
    fn defaults_are_valid() {
        DispatchConfig::default().validate().unwrap();
        FailoverConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_rejected() {
        for bad in [
            DispatchConfig { max_tasks_per_robot: 0, ..Default::default() },
            DispatchConfig { max_tasks_per_robot: 11, ..Default::default() },
            DispatchConfig { min_battery_for_assignment: 101, ..Default::default() },
            DispatchConfig { assignment_interval_seconds: 0, ..Default::default() },
            DispatchConfig { assignment_interval_seconds: u64::MAX, ..Default::default() },
            DispatchConfig { assignment_interval_seconds: MAX_DURATION_SECS + 1, ..Default::default() },
        ] {
            let err = bad.validate().unwrap_err();
            assert_eq!(err.status_code(), 400, "{bad:?}");
        }
        for bad in [
            FailoverConfig { blocked_timeout_secs: 10_000_000_000_000_000, ..Default::default() },
            FailoverConfig { heartbeat_timeout_secs: u64::MAX, offline_grace_secs: u64::MAX, ..Default::default() },
            FailoverConfig { offline_grace_secs: MAX_DURATION_SECS + 1, ..Default::default() },
            FailoverConfig { reassign_cooldown_secs: u64::MAX, ..Default::default() },
            FailoverConfig { priority_escalation_minutes: u64::MAX, ..Default::default() },
        ] {
            let err = bad.validate().unwrap_err();
            assert_eq!(err.status_code(), 400, "{bad:?}");
        }
    }

    #[test]
    fn conversions_saturate_instead_of_wrapping() {
        let year = Duration::seconds(MAX_DURATION_SECS as i64);
        let f = FailoverConfig {
            blocked_timeout_secs:        u64::MAX,
            priority_escalation_minutes: u64::MAX,
            reassign_cooldown_secs:      1 << 63,
            ..Default::default()
        };
        assert_eq!(f.blocked_timeout(), year);
        assert_eq!(f.escalation_window(), year);
        assert_eq!(f.reassign_cooldown(), year);
        let d = DispatchConfig { assignment_interval_seconds: u64::MAX, ..Default::default() };
        assert_eq!(d.assignment_interval(), year);

        let longest = FailoverConfig {
            blocked_timeout_secs: MAX_DURATION_SECS,
            offline_grace_secs:   MAX_DURATION_SECS,
            ..Default::default()
        };
        longest.validate().unwrap();
        assert_eq!(longest.offline_grace(), year);
    }

    #[test]
    fn engine_rejects_an_unbounded_failover_update() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let err = e
            .update_failover_config(FailoverConfig {
                blocked_timeout_secs: 10_000_000_000_000_000,
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(e.failover_config(), &FailoverConfig::default());

        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());
        e.start_task(id, t0()).unwrap();
        assert!(e.check_blocked_tasks(at(60)).is_empty());
    }

    #[test]
    fn algorithm_names_parse() {
        for a in Algorithm::ALL {
            assert_eq!(a.as_str().parse::<Algorithm>().unwrap(), a);
        }
        let err = "fastest".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAlgorithm(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn rejected_update_leaves_config_untouched() {
        let (mut e, _) = engine(Algorithm::RoundRobin, vec![]);
        let before = e.get_config().clone();
        assert!(e.update_config(DispatchConfig { max_tasks_per_robot: 42, ..Default::default() }).is_err());
        assert_eq!(e.get_config(), &before);
    }

    #[test]
    fn update_is_persisted_and_reloaded() {
        let store = MemoryConfigStore::new();
        let mut e = DispatchEngineBuilder::new().config_store(store.clone()).build().unwrap();
        e.update_config(DispatchConfig {
            algorithm: Algorithm::Priority,
            min_battery_for_assignment: 35,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(store.get("dispatch.algorithm").as_deref(), Some("priority"));

        let reloaded = DispatchEngineBuilder::new().config_store(store).build().unwrap();
        assert_eq!(reloaded.get_config().algorithm, Algorithm::Priority);
        assert_eq!(reloaded.get_config().min_battery_for_assignment, 35);
    }

    #[test]
    fn stored_garbage_is_rejected() {
        let store = MemoryConfigStore::new();
        store.set("dispatch.algorithm", "teleport");
        assert!(DispatchEngineBuilder::new().config_store(store.clone()).build().is_err());

        let mut pairs = BTreeMap::new();
        pairs.insert("dispatch.max_tasks_per_robot".to_owned(), "many".to_owned());
        assert!(DispatchConfig::from_pairs(&pairs).is_err());
        assert!(store.load().is_ok());
    }

    #[test]
    fn algorithm_serde_uses_snake_case() {
        let json = serde_json::to_string(&Algorithm::LoadBalanced).unwrap();
        assert_eq!(json, "\"load_balanced\"");
        let back: Algorithm = serde_json::from_str("\"round_robin\"").unwrap();
        assert_eq!(back, Algorithm::RoundRobin);
    }

    #[test]
    fn failover_grace_must_cover_heartbeat_timeout() {
        let bad = FailoverConfig { offline_grace_secs: 10, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}

// ── Collaborators and background loop ─────────────────────────────────────────

#[cfg(test)]
mod background {
    use std::sync::Arc;

    use fleet_core::ManualClock;
    use parking_lot::Mutex;

    use super::*;
    use crate::{ChannelBroadcaster, DispatchLoop, StatusChange, TaskStatus};

    #[test]
    fn broadcaster_sees_task_and_robot_changes() {
        let (tx, rx) = ChannelBroadcaster::bounded(16);
        let mut e = DispatchEngineBuilder::new()
            .robots([robot(1, 0.0, 0.0)])
            .broadcaster(tx)
            .build()
            .unwrap();
        let id = e.create_task(deliver_to_origin(), t0());
        e.auto_assign_pending_tasks(t0());

        let changes: Vec<StatusChange> = rx.try_iter().collect();
        assert!(changes.contains(&StatusChange::Task { task: id, status: TaskStatus::Pending, robot: None }));
        assert!(changes.contains(&StatusChange::Task {
            task:   id,
            status: TaskStatus::Assigned,
            robot:  Some(RobotId(1)),
        }));
        assert!(changes.iter().any(|c| matches!(c, StatusChange::Robot { robot: RobotId(1), .. })));
    }

    #[test]
    fn full_broadcast_channel_never_blocks_dispatch() {
        let (tx, _rx) = ChannelBroadcaster::bounded(1);
        let mut e = DispatchEngineBuilder::new().broadcaster(tx).build().unwrap();
        for i in 0..10 {
            e.create_task(deliver_to_origin(), at(i));
        }
        assert_eq!(e.pending_tasks().len(), 10);
    }

    #[test]
    fn loop_runs_cycle_on_demand() {
        let (mut e, _) = engine(Algorithm::Nearest, vec![robot(1, 0.0, 0.0)]);
        let id = e.create_task(deliver_to_origin(), t0());
        let shared = Arc::new(Mutex::new(e));
        let clock = ManualClock::new(t0());

        let dispatch = DispatchLoop::spawn(Arc::clone(&shared), Arc::new(clock.clone())).unwrap();
        let report = dispatch.run_now().unwrap();
        assert_eq!(report.assignment.unwrap().assigned, 1);
        assert_eq!(shared.lock().get_task(id).unwrap().status, TaskStatus::Assigned);

        clock.advance(Duration::seconds(5));
        let report = dispatch.run_now().unwrap();
        assert_eq!(report.now, at(5));
        dispatch.shutdown();
    }
}
