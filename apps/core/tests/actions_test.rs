mod support;

use std::cell::Cell;

use pretty_assertions::assert_eq;
use upkiller_core::actions::{execute_on, ExecuteOutcome};
use upkiller_core::executors::ActionContext;
use upkiller_core::i18n::Localizer;
use upkiller_core::model::Target;
use upkiller_core::scanners::SCHTASKS;

use support::{ok_output, snapshot, FakeHelper, FakeProcessTable, FakeServiceManager};

fn targets() -> Vec<Target> {
    vec![
        Target::process("alpha", "alpha", String::new()),
        Target::process("boom", "boom", String::new()),
        Target::scheduled_task("\\Nightly", String::new(), false),
    ]
}

#[test]
fn a_panicking_executor_does_not_stop_the_batch() {
    let processes = FakeProcessTable {
        panic_on_name: Some("boom".to_string()),
        ..FakeProcessTable::with(vec![snapshot(1, "alpha", ""), snapshot(2, "boom", "")])
    };
    let services = FakeServiceManager::default();
    let helper = FakeHelper::responding(SCHTASKS, Ok(ok_output(0, "SUCCESS", "")));
    let i18n = Localizer::builtin("en");
    let ctx = ActionContext {
        processes: &processes,
        services: &services,
        helper: &helper,
        i18n: &i18n,
    };
    let targets = targets();
    let selected: Vec<&Target> = targets.iter().collect();

    let outcome = execute_on(&ctx, &selected, &|_count: usize| true);
    let report = outcome.report().unwrap();
    let lines = report.lines();

    assert!(lines[0].starts_with("Timestamp: "));
    assert_eq!(lines[1], "");
    assert_eq!(
        &lines[2..],
        &[
            "[PROCESS] alpha (PID: 1) terminating...".to_string(),
            "[PROCESS] alpha (PID: 1) terminated.".to_string(),
            "[PROCESS] boom unexpected failure: process table exploded for boom".to_string(),
            "[TASK] \\Nightly disabled. Exit code: 0".to_string(),
            "    OUT: SUCCESS".to_string(),
        ]
    );
    assert_eq!(processes.terminated(), vec![1]);
}

#[test]
fn a_failing_executor_is_reported_and_later_targets_still_run() {
    let processes = FakeProcessTable {
        refuse_pids: vec![2],
        ..FakeProcessTable::with(vec![snapshot(1, "alpha", ""), snapshot(2, "boom", "")])
    };
    let services = FakeServiceManager::default();
    let helper = FakeHelper::default();
    let i18n = Localizer::builtin("en");
    let ctx = ActionContext {
        processes: &processes,
        services: &services,
        helper: &helper,
        i18n: &i18n,
    };
    let targets = targets();
    let selected: Vec<&Target> = targets.iter().collect();

    let outcome = execute_on(&ctx, &selected, &|_count: usize| true);
    let report = outcome.report().unwrap();

    assert_eq!(report.lines_starting_with("[PROCESS] boom (PID: 2) could not be terminated").count(), 1);
    assert_eq!(report.lines_starting_with("[TASK] ").count(), 1);
    assert_eq!(helper.calls().len(), 1);
}

#[test]
fn empty_selection_never_asks_for_confirmation() {
    let processes = FakeProcessTable::default();
    let services = FakeServiceManager::default();
    let helper = FakeHelper::default();
    let i18n = Localizer::builtin("en");
    let ctx = ActionContext {
        processes: &processes,
        services: &services,
        helper: &helper,
        i18n: &i18n,
    };
    let asked = Cell::new(false);

    let outcome = execute_on(&ctx, &[], &|_count: usize| {
        asked.set(true);
        true
    });

    assert_eq!(outcome, ExecuteOutcome::NothingSelected("Nothing selected.".to_string()));
    assert!(!asked.get());
}

#[test]
fn declined_confirmation_touches_nothing() {
    let processes = FakeProcessTable::with(vec![snapshot(1, "alpha", "")]);
    let services = FakeServiceManager::default();
    let helper = FakeHelper::default();
    let i18n = Localizer::builtin("en");
    let ctx = ActionContext {
        processes: &processes,
        services: &services,
        helper: &helper,
        i18n: &i18n,
    };
    let targets = targets();
    let selected: Vec<&Target> = targets.iter().collect();
    let seen = Cell::new(0);

    let outcome = execute_on(&ctx, &selected, &|count: usize| {
        seen.set(count);
        false
    });

    assert_eq!(seen.get(), 3);
    assert!(matches!(outcome, ExecuteOutcome::Declined(_)));
    assert!(outcome.report().is_none());
    assert!(processes.terminated().is_empty());
    assert!(helper.calls().is_empty());
}
