use std::collections::HashMap;
use std::sync::Arc;

use chrono::TimeDelta;
use jobloop::checkpoint::JobState;
use jobloop::clock::ManualClock;
use jobloop::engine::Scheduler;
use jobloop::job::{Job, JobHandle, NoDependencies, StepOutcome};
use jobloop_test_utils::epoch;
use jobloop_test_utils::units::{Script, ScriptedUnit};
use proptest::prelude::*;
use serde_json::json;

fn script_strategy() -> impl Strategy<Value = Vec<Script>> {
    proptest::collection::vec(
        prop_oneof![
            3 => any::<u8>().prop_map(|n| Script::Yield(json!(n))),
            1 => "[a-z]{1,8}".prop_map(Script::Fail),
        ],
        0..8,
    )
}

fn state_strategy() -> impl Strategy<Value = JobState> {
    (
        0.0f64..1.0e6,
        any::<bool>(),
        any::<bool>(),
        -5i64..50,
    )
        .prop_map(|(actual_working_time, is_done, is_stopped, tries)| JobState {
            actual_working_time,
            is_done,
            is_stopped,
            tries,
        })
}

/// One job per entry; each job may depend on any subset of earlier jobs.
fn jobs_strategy(max_jobs: usize) -> impl Strategy<Value = Vec<(Vec<Script>, i64, Vec<usize>)>> {
    (1..=max_jobs).prop_flat_map(|n| {
        proptest::collection::vec(
            (
                script_strategy(),
                0i64..3,
                proptest::collection::vec(any::<usize>(), 0..3),
            ),
            n,
        )
    })
}

proptest! {
    #[test]
    fn checkpoint_state_survives_serialization(state in state_strategy()) {
        let body = serde_json::to_string(&state).unwrap();
        let back: JobState = serde_json::from_str(&body).unwrap();
        prop_assert_eq!(back, state);
    }

    #[test]
    fn load_of_dump_is_identity(state in state_strategy(), tries in -3i64..3) {
        let mut job = Job::new("prop", ScriptedUnit::yields(1).boxed()).with_tries(tries);
        job.load(&state);
        let first = job.dump();

        let mut other = Job::new("prop", ScriptedUnit::yields(1).boxed());
        other.load(&first.state);
        prop_assert_eq!(other.dump(), first);
    }

    #[test]
    fn steps_never_reduce_working_time(script in script_strategy(), millis in 0i64..2000) {
        let clock = ManualClock::new(epoch());
        let unit = ScriptedUnit::new(script).advancing(clock.clone(), TimeDelta::milliseconds(millis));
        let mut job = Job::new("mono", unit.boxed()).with_tries(2);

        let mut last = 0.0;
        for _ in 0..12 {
            job.step(&clock, &NoDependencies);
            prop_assert!(job.actual_working_time() >= last);
            last = job.actual_working_time();
        }
        prop_assert!(job.is_done());
    }

    #[test]
    fn every_job_retires_once_and_dependencies_first(jobs in jobs_strategy(6)) {
        let clock = ManualClock::new(epoch());
        let mut sched = Scheduler::new(jobs.len()).with_clock(Arc::new(clock));

        let mut handles: Vec<JobHandle> = Vec::new();
        let mut deps_of: HashMap<String, Vec<String>> = HashMap::new();
        for (i, (script, tries, raw_deps)) in jobs.into_iter().enumerate() {
            let id = format!("job_{i}");
            let mut job = Job::new(id.clone(), ScriptedUnit::new(script).boxed()).with_tries(tries);
            let mut deps = Vec::new();
            if i > 0 {
                for raw in raw_deps {
                    let dep = raw % i;
                    job = job.depends_on(handles[dep]);
                    deps.push(format!("job_{dep}"));
                }
            }
            deps_of.insert(id, deps);
            handles.push(sched.schedule(job).unwrap());
        }

        let mut steps = 0usize;
        let mut retired: Vec<String> = Vec::new();
        while let Some(tick) = sched.step_once() {
            steps += 1;
            prop_assert!(steps < 10_000, "scheduler did not terminate");

            if let StepOutcome::Value(_) | StepOutcome::TransientError(_) = tick.outcome {
                for dep in &deps_of[&tick.job] {
                    prop_assert!(retired.contains(dep), "{} ran before {}", tick.job, dep);
                }
            }
            if tick.retired {
                prop_assert!(!retired.contains(&tick.job));
                retired.push(tick.job);
            }
        }

        prop_assert_eq!(retired.len(), handles.len());
        prop_assert_eq!(sched.queue_len(), 0);
    }
}
