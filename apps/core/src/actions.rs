use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Local;

use crate::executors::{dispatch, ActionContext};
use crate::logging::panic_message;
use crate::model::Target;
use crate::report::Report;

/// Operator confirmation before any target is touched.
pub trait Confirm {
    fn confirm(&self, count: usize) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(usize) -> bool,
{
    fn confirm(&self, count: usize) -> bool {
        self(count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    NothingSelected(String),
    Declined(String),
    Completed(Report),
}

impl ExecuteOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Acts on `selected` in order. Every target is attempted; a failure or panic in
/// one executor is recorded in the report and the batch moves on.
pub fn execute_on(
    ctx: &ActionContext<'_>,
    selected: &[&Target],
    confirm: &dyn Confirm,
) -> ExecuteOutcome {
    if selected.is_empty() {
        return ExecuteOutcome::NothingSelected(ctx.i18n.t("msg.noSelection.body").to_string());
    }

    if !confirm.confirm(selected.len()) {
        log::info!("action batch of {} target(s) declined", selected.len());
        return ExecuteOutcome::Declined(ctx.i18n.t("msg.declined.body").to_string());
    }

    let mut report = Report::new();
    report.push(format!(
        "{}: {}",
        ctx.i18n.t("report.timestamp"),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.blank();

    log::info!("action batch started: {} target(s)", selected.len());
    for target in selected {
        log::info!("dispatching {} {}", target.kind, target.name);
        let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(ctx, target, &mut report)));
        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            log::error!("executor for {} {} panicked: {message}", target.kind, target.name);
            report.push(format!(
                "{} {}",
                target.kind.report_tag(),
                ctx.i18n.tf("report.unexpected", &[&target.name, &message])
            ));
        }
    }
    log::info!("action batch finished");

    ExecuteOutcome::Completed(report)
}
