mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::builders::{JobConfigBuilder, ManifestBuilder};
use common::init_tracing;
use jobloop::cli::CliArgs;
use jobloop::config::{default_manifest_path, load_and_validate, load_from_path, Manifest, UnitKind};
use jobloop::engine::{Scheduler, StopHandle};
use jobloop::errors::JobloopError;
use jobloop::fs::mock::MockFileSystem;
use jobloop::types::AdmissionPolicy;
use serde_json::{json, Value};
use tempfile::tempdir;

fn write_manifest(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("Jobloop.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn parses_scheduler_section_and_jobs() {
    let dir = tempdir().unwrap();
    let path = write_manifest(
        dir.path(),
        r#"
[scheduler]
pool_size = 3
checkpoint = "state/info.json"
admission = "strict"

[job.prepare]
kind = "init_dir"
dir = "results"

[job.report]
kind = "command"
commands = ["echo one", "echo two"]
after = ["prepare"]
tries = 2
max_working_time = 1.5
start_at = "2030-01-02T03:04:05Z"
"#,
    );

    let manifest = load_and_validate(&path).unwrap();

    assert_eq!(manifest.scheduler.pool_size, 3);
    assert_eq!(manifest.scheduler.admission, AdmissionPolicy::Strict);
    assert_eq!(manifest.scheduler.checkpoint, Path::new("state/info.json"));

    let report = &manifest.job["report"];
    assert_eq!(report.kind, UnitKind::Command);
    assert_eq!(report.commands, vec!["echo one", "echo two"]);
    assert_eq!(report.after, vec!["prepare"]);
    assert_eq!(report.tries, 2);
    assert_eq!(report.max_working_time, Some(1.5));
    assert_eq!(
        report.start_at,
        Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).single()
    );
}

#[test]
fn defaults_apply_when_sections_are_omitted() {
    let dir = tempdir().unwrap();
    let path = write_manifest(
        dir.path(),
        r#"
[job.only]
kind = "command"
commands = ["true"]
"#,
    );

    let raw = load_from_path(&path).unwrap();
    assert_eq!(raw.scheduler.pool_size, 10);
    assert_eq!(raw.scheduler.checkpoint, Path::new("scheduler_info.json"));
    assert_eq!(raw.scheduler.admission, AdmissionPolicy::Literal);
    assert_eq!(raw.job["only"].tries, 0);
    assert!(raw.job["only"].start_at.is_none());
    assert_eq!(default_manifest_path(), Path::new("Jobloop.toml"));
    assert_eq!(CliArgs::for_config("Jobloop.toml").config, "Jobloop.toml");
}

#[test]
fn unknown_kind_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), "[job.x]\nkind = \"teleport\"\n");

    assert!(matches!(load_from_path(&path), Err(JobloopError::TomlError(_))));
}

#[test]
fn empty_manifest_is_rejected() {
    let err = Manifest::try_from(ManifestBuilder::new().raw()).unwrap_err();
    assert!(matches!(err, JobloopError::ConfigError(_)));
}

#[test]
fn cycles_are_rejected() {
    let raw = ManifestBuilder::new()
        .with_job("a", JobConfigBuilder::command(&["true"]).after("b").build())
        .with_job("b", JobConfigBuilder::command(&["true"]).after("a").build())
        .raw();

    assert!(matches!(Manifest::try_from(raw), Err(JobloopError::DagCycle(_))));
}

#[test]
fn unknown_and_self_dependencies_are_rejected() {
    let unknown = ManifestBuilder::new()
        .with_job("a", JobConfigBuilder::command(&["true"]).after("ghost").build())
        .raw();
    match Manifest::try_from(unknown) {
        Err(JobloopError::ConfigError(msg)) => assert!(msg.contains("unknown dependency 'ghost'")),
        other => panic!("expected config error, got {other:?}"),
    }

    let own = ManifestBuilder::new()
        .with_job("a", JobConfigBuilder::command(&["true"]).after("a").build())
        .raw();
    match Manifest::try_from(own) {
        Err(JobloopError::ConfigError(msg)) => assert!(msg.contains("cannot depend on itself")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn jobs_must_fit_into_the_queue() {
    let mut builder = ManifestBuilder::new().with_pool_size(1);
    for id in ["a", "b"] {
        builder = builder.with_job(id, JobConfigBuilder::command(&["true"]).build());
    }
    // Literal admission: pool_size 1 still holds two jobs.
    let literal = builder.raw();
    assert!(Manifest::try_from(literal.clone()).is_ok());

    let mut strict = literal;
    strict.scheduler.admission = AdmissionPolicy::Strict;
    assert!(matches!(Manifest::try_from(strict), Err(JobloopError::ConfigError(_))));

    let zero = ManifestBuilder::new()
        .with_pool_size(0)
        .with_job("a", JobConfigBuilder::command(&["true"]).build())
        .raw();
    assert!(matches!(Manifest::try_from(zero), Err(JobloopError::ConfigError(_))));
}

#[test]
fn per_kind_fields_are_required() {
    let no_dir = ManifestBuilder::new()
        .with_job("c", JobConfigBuilder::new(UnitKind::Collect).build())
        .raw();
    assert!(matches!(Manifest::try_from(no_dir), Err(JobloopError::ConfigError(_))));

    let no_commands = ManifestBuilder::new()
        .with_job("c", JobConfigBuilder::new(UnitKind::Command).build())
        .raw();
    assert!(matches!(Manifest::try_from(no_commands), Err(JobloopError::ConfigError(_))));

    let negative_budget = ManifestBuilder::new()
        .with_job("c", JobConfigBuilder::command(&["true"]).max_working_time(-1.0).build())
        .raw();
    assert!(matches!(
        Manifest::try_from(negative_budget),
        Err(JobloopError::ConfigError(_))
    ));
}

#[test]
fn admission_order_puts_dependencies_first() {
    let manifest = ManifestBuilder::new()
        .with_job("a_report", JobConfigBuilder::command(&["true"]).after("z_fetch").build())
        .with_job("m_other", JobConfigBuilder::command(&["true"]).build())
        .with_job("z_fetch", JobConfigBuilder::command(&["true"]).build())
        .build();

    assert_eq!(manifest.admission_order(), vec!["m_other", "z_fetch", "a_report"]);
}

#[test]
fn admission_order_breaks_ties_by_id_at_every_level() {
    // d depends on b and c, both depend on a; e is free.
    let manifest = ManifestBuilder::new()
        .with_job("d", JobConfigBuilder::command(&["true"]).after("c").after("b").build())
        .with_job("c", JobConfigBuilder::command(&["true"]).after("a").build())
        .with_job("b", JobConfigBuilder::command(&["true"]).after("a").build())
        .with_job("a", JobConfigBuilder::command(&["true"]).build())
        .with_job("e", JobConfigBuilder::command(&["true"]).build())
        .build();

    // Once a is placed, b, c and e are all ready and go out by id.
    assert_eq!(manifest.admission_order(), vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn admission_order_of_a_long_chain_follows_the_edges_not_the_ids() {
    // j39 has no dependencies and every other jN runs after jN+1.
    let mut builder = ManifestBuilder::new()
        .with_pool_size(40)
        .with_job("j39", JobConfigBuilder::command(&["true"]).build());
    for i in 0..39 {
        let next = format!("j{:02}", i + 1);
        builder = builder.with_job(
            &format!("j{i:02}"),
            JobConfigBuilder::command(&["true"]).after(&next).build(),
        );
    }
    let manifest = builder.build();

    let expected: Vec<String> = (0..40).rev().map(|i| format!("j{i:02}")).collect();
    assert_eq!(manifest.admission_order(), expected);
}

#[test]
fn collect_sources_may_mix_paths_and_urls() {
    init_tracing();
    let body = r#"
[job.collect]
kind = "collect"
dir = "results"
sources = ["data/moscow.json", "https://weather.test/paris"]
"#;
    let tmp = tempdir().unwrap();
    let path = write_manifest(tmp.path(), body);
    let manifest = load_and_validate(&path).unwrap();

    assert_eq!(
        manifest.job["collect"].sources,
        vec!["data/moscow.json", "https://weather.test/paris"]
    );

    let sched =
        Scheduler::from_manifest(&manifest, Path::new("root"), Arc::new(MockFileSystem::new()))
            .unwrap();
    assert_eq!(sched.queued_ids(), vec!["collect"]);
}

#[test]
fn from_manifest_wires_dependencies_and_budgets() {
    init_tracing();
    let manifest = ManifestBuilder::new()
        .with_pool_size(2)
        .with_checkpoint("ckpt.json")
        .with_job("fetch", JobConfigBuilder::command(&["true"]).tries(3).build())
        .with_job(
            "report",
            JobConfigBuilder::command(&["true"])
                .after("fetch")
                .max_working_time(4.0)
                .build(),
        )
        .build();

    let sched =
        Scheduler::from_manifest(&manifest, Path::new("root"), Arc::new(MockFileSystem::new()))
            .unwrap();

    assert_eq!(sched.queued_ids(), vec!["fetch", "report"]);
    assert_eq!(sched.checkpoint().path(), Path::new("root/ckpt.json"));

    let fetch = sched.handle_of("fetch").unwrap();
    let report = sched.job(sched.handle_of("report").unwrap()).unwrap();
    assert_eq!(report.depends(), &[fetch]);
    assert_eq!(report.max_working_time(), Some(4.0));
    assert_eq!(sched.job(fetch).unwrap().tries(), 3);
}

const FORECAST_MOSCOW: &str = r#"{
  "geo_object": { "locality": { "name": "Moscow" } },
  "forecasts": [
    { "date": "2022-05-26", "hours": [
      { "temp": 10, "pressure_mm": 750, "humidity": 50 },
      { "temp": 14, "pressure_mm": 752, "humidity": 70 }
    ] }
  ]
}"#;

const PIPELINE: &str = r#"
[scheduler]
pool_size = 3

[job.init]
kind = "init_dir"
dir = "results"

[job.collect]
kind = "collect"
dir = "results"
sources = ["data/moscow.json"]
after = ["init"]

[job.aggregate]
kind = "aggregate"
dir = "results"
after = ["collect"]
"#;

#[test]
fn run_executes_a_pipeline_and_checkpoints_it() {
    init_tracing();
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/moscow.json"), FORECAST_MOSCOW).unwrap();
    let path = write_manifest(dir.path(), PIPELINE);

    let report = jobloop::run(
        CliArgs::for_config(path.to_string_lossy()),
        StopHandle::new(),
    )
    .unwrap();

    assert_eq!(report.retired, vec!["init", "collect", "aggregate"]);

    let result: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("results/result.json")).unwrap())
            .unwrap();
    assert_eq!(
        result["Moscow"]["2022-05-26"],
        json!({ "temp": 12.0, "pressure_mm": 751.0, "humidity": 60.0 })
    );

    let checkpoint: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("scheduler_info.json")).unwrap(),
    )
    .unwrap();
    let checkpoint = checkpoint.as_object().unwrap();
    assert_eq!(checkpoint.len(), 3);
    assert!(checkpoint.values().all(|state| state["is_done"] == json!(true)));

    // Resuming a finished run retires everything without doing work again.
    fs::remove_file(dir.path().join("data/moscow.json")).unwrap();
    let mut args = CliArgs::for_config(path.to_string_lossy());
    args.resume = true;
    let resumed = jobloop::run(args, StopHandle::new()).unwrap();

    assert_eq!(resumed.values, 0);
    assert_eq!(resumed.transient_errors, 0);
    assert_eq!(resumed.retired.len(), 3);
}

#[test]
fn resume_without_checkpoint_fails() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), "[job.a]\nkind = \"command\"\ncommands = [\"true\"]\n");

    let mut args = CliArgs::for_config(path.to_string_lossy());
    args.resume = true;

    assert!(matches!(
        jobloop::run(args, StopHandle::new()),
        Err(JobloopError::CheckpointLoad { .. })
    ));
}

#[test]
fn dry_run_touches_nothing() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), PIPELINE);

    let mut args = CliArgs::for_config(path.to_string_lossy());
    args.dry_run = true;
    let report = jobloop::run(args, StopHandle::new()).unwrap();

    assert_eq!(report.steps, 0);
    assert!(!dir.path().join("results").exists());
    assert!(!dir.path().join("scheduler_info.json").exists());
}

const THREE_JOBS_POOL_TWO: &str = r#"
[scheduler]
pool_size = 2

[job.a]
kind = "command"
commands = ["true"]

[job.b]
kind = "command"
commands = ["true"]

[job.c]
kind = "command"
commands = ["true"]
"#;

#[test]
fn cli_overrides_are_validated_like_the_manifest() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), THREE_JOBS_POOL_TWO);

    let mut strict = CliArgs::for_config(path.to_string_lossy());
    strict.admission = Some(AdmissionPolicy::Strict);
    assert!(matches!(
        jobloop::run(strict.clone(), StopHandle::new()),
        Err(JobloopError::ConfigError(_))
    ));

    // A dry run agrees with the real run.
    strict.dry_run = true;
    assert!(matches!(
        jobloop::run(strict, StopHandle::new()),
        Err(JobloopError::ConfigError(_))
    ));

    let mut empty_checkpoint = CliArgs::for_config(path.to_string_lossy());
    empty_checkpoint.checkpoint = Some(String::new());
    empty_checkpoint.dry_run = true;
    match jobloop::run(empty_checkpoint, StopHandle::new()) {
        Err(JobloopError::ConfigError(msg)) => assert!(msg.contains("checkpoint")),
        other => panic!("expected config error, got {other:?}"),
    }

    // Nothing was run, so nothing was checkpointed.
    assert!(!dir.path().join("scheduler_info.json").exists());
}

#[cfg(unix)]
#[test]
fn checkpoint_override_redirects_the_checkpoint_file() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), THREE_JOBS_POOL_TWO);

    let mut args = CliArgs::for_config(path.to_string_lossy());
    args.checkpoint = Some("state/elsewhere.json".to_string());
    let report = jobloop::run(args, StopHandle::new()).unwrap();

    assert_eq!(report.retired.len(), 3);
    assert!(dir.path().join("state/elsewhere.json").is_file());
    assert!(!dir.path().join("scheduler_info.json").exists());
}
