use proptest::prelude::*;
use qk::engine::{CoreCommand, FailureReason, RunEvent, RunSummary, UnitOutcome};
use qk::registry::{Status, UnitId};
use qk::types::ExitedPolicy;
use qk_test_utils::builders::{core_for, RegistryBuilder};

fn outcome_strategy() -> impl Strategy<Value = UnitOutcome> {
    prop_oneof![
        Just(UnitOutcome::Finished),
        (1..128i32).prop_map(|c| UnitOutcome::Failed(FailureReason::ExitCode(c))),
        Just(UnitOutcome::Failed(FailureReason::Signal(9))),
        Just(UnitOutcome::Failed(FailureReason::Spawn("not found".into()))),
        Just(UnitOutcome::Exited),
    ]
}

// A run of `n` single-command projects: per-unit outcomes plus an arrival
// order in which every unit index appears twice (first = started, second =
// finished).
fn run_strategy(max_units: usize) -> impl Strategy<Value = (Vec<UnitOutcome>, Vec<usize>)> {
    (1..=max_units).prop_flat_map(|n| {
        let order: Vec<usize> = (0..n).flat_map(|i| [i, i]).collect();
        (
            proptest::collection::vec(outcome_strategy(), n),
            Just(order).prop_shuffle(),
        )
    })
}

fn policy_strategy() -> impl Strategy<Value = ExitedPolicy> {
    prop_oneof![Just(ExitedPolicy::Ignore), Just(ExitedPolicy::Fail)]
}

proptest! {
    #[test]
    fn statuses_only_move_forward_and_run_completes_once(
        (outcomes, order) in run_strategy(6),
        policy in policy_strategy(),
        cancel_at in proptest::option::of(0..12usize),
    ) {
        let n = outcomes.len();
        let registry = RegistryBuilder::new().projects(n).command("yarn", &[]).build();
        let mut core = core_for(registry, policy);
        core.start();

        let mut seen_started = vec![false; n];
        let mut events = Vec::new();
        for (pos, idx) in order.iter().copied().enumerate() {
            if cancel_at == Some(pos) {
                events.push(RunEvent::CancelRequested);
            }
            let unit = UnitId::new(idx, 0);
            if seen_started[idx] {
                events.push(RunEvent::UnitFinished { unit, outcome: outcomes[idx].clone() });
            } else {
                seen_started[idx] = true;
                events.push(RunEvent::UnitStarted { unit, pid: None });
            }
        }

        let mut last: Vec<Status> = vec![Status::Pending; n];
        let mut summaries: Vec<RunSummary> = Vec::new();

        for event in events {
            let step = core.step(event);
            for cmd in &step.commands {
                if let CoreCommand::Complete(summary) = cmd {
                    summaries.push(*summary);
                }
            }

            let now: Vec<Status> = core
                .registry()
                .unit_ids()
                .into_iter()
                .map(|id| core.registry().unit(id).unwrap().status())
                .collect();
            for (prev, cur) in last.iter().zip(&now) {
                prop_assert!(cur.rank() >= prev.rank());
                prop_assert!(!prev.is_terminal() || prev == cur);
            }
            if summaries.is_empty() {
                prop_assert!(!core.is_done());
            }
            last = now;
        }

        prop_assert_eq!(summaries.len(), 1);
        prop_assert!(core.registry().all_terminal());

        let summary = summaries[0];
        let expected: Vec<Status> = outcomes.iter().map(UnitOutcome::status).collect();
        prop_assert_eq!(&last, &expected);

        let failed = expected.iter().filter(|s| **s == Status::Failed).count();
        let exited = expected.iter().filter(|s| **s == Status::Exited).count();
        prop_assert_eq!(summary.counts.failed, failed);
        prop_assert_eq!(summary.counts.exited, exited);
        prop_assert_eq!(
            summary.success,
            failed == 0 && !(policy == ExitedPolicy::Fail && exited > 0)
        );
        prop_assert_eq!(summary.cancelled, cancel_at.is_some_and(|c| c < 2 * n));
    }

    #[test]
    fn late_events_after_completion_change_nothing(
        (outcomes, order) in run_strategy(4),
    ) {
        let n = outcomes.len();
        let registry = RegistryBuilder::new().projects(n).command("yarn", &[]).build();
        let mut core = core_for(registry, ExitedPolicy::Ignore);
        core.start();

        let mut started = vec![false; n];
        for idx in order {
            let unit = UnitId::new(idx, 0);
            let event = if started[idx] {
                RunEvent::UnitFinished { unit, outcome: outcomes[idx].clone() }
            } else {
                started[idx] = true;
                RunEvent::UnitStarted { unit, pid: None }
            };
            core.step(event);
        }
        prop_assert!(core.is_done());
        let before = core.summary();

        for idx in 0..n {
            let unit = UnitId::new(idx, 0);
            core.step(RunEvent::UnitStarted { unit, pid: None });
            core.step(RunEvent::UnitFinished { unit, outcome: UnitOutcome::Exited });
        }
        let step = core.step(RunEvent::CancelRequested);

        prop_assert!(!step.keep_running);
        prop_assert_eq!(core.summary().counts, before.counts);
    }
}
