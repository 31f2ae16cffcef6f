use std::time::Duration;

use crate::helper::{HelperRunner, COMMAND_TIMEOUT};
use crate::i18n::Localizer;
use crate::model::{Target, TargetKind};
use crate::process_table::ProcessTable;
use crate::report::Report;
use crate::scanners::SCHTASKS;
use crate::service_manager::{ServiceManager, ServiceState};

pub const PROCESS_EXIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const SERVICE_STOP_TIMEOUT: Duration = Duration::from_secs(15);
pub const SC: &str = "sc.exe";

/// Platform capabilities and strings shared by every executor in a batch.
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    pub processes: &'a dyn ProcessTable,
    pub services: &'a dyn ServiceManager,
    pub helper: &'a dyn HelperRunner,
    pub i18n: &'a Localizer,
}

impl ActionContext<'_> {
    fn line(&self, kind: TargetKind, key: &str, args: &[&dyn std::fmt::Display]) -> String {
        format!("{} {}", kind.report_tag(), self.i18n.tf(key, args))
    }

    fn exit_code_text(&self, code: Option<i32>) -> String {
        match code {
            Some(code) => code.to_string(),
            None => self.i18n.t("report.exitUnknown").to_string(),
        }
    }
}

/// Kills every live instance named like `target`, re-resolved by name.
pub fn kill_process(ctx: &ActionContext<'_>, target: &Target, report: &mut Report) {
    let kind = TargetKind::Process;
    let name = target.name.as_str();

    let pids = match ctx.processes.find_by_name(name) {
        Ok(pids) => pids,
        Err(error) => {
            log::warn!("process lookup for {name} failed: {error}");
            report.push(ctx.line(kind, "report.generalError", &[&name, &error]));
            return;
        }
    };

    if pids.is_empty() {
        report.push(ctx.line(kind, "report.process.notRunning", &[&name]));
        return;
    }

    for pid in pids {
        report.push(ctx.line(kind, "report.process.killing", &[&name, &pid]));
        if let Err(error) = ctx.processes.terminate_tree(pid) {
            log::warn!("terminate {name} pid={pid} failed: {error}");
            report.push(ctx.line(kind, "report.process.killFailed", &[&name, &pid, &error]));
            continue;
        }

        if ctx.processes.wait_for_exit(pid, PROCESS_EXIT_TIMEOUT) {
            report.push(ctx.line(kind, "report.process.killed", &[&name, &pid]));
        } else {
            report.push(ctx.line(
                kind,
                "report.process.noExit",
                &[&name, &pid, &PROCESS_EXIT_TIMEOUT.as_secs()],
            ));
        }
    }
}

/// Stops the service when it is running, then sets its start mode to disabled.
/// A failed stop does not prevent the disable step.
pub fn stop_and_disable_service(ctx: &ActionContext<'_>, target: &Target, report: &mut Report) {
    let kind = TargetKind::Service;
    let name = target.name.as_str();

    let state = match ctx.services.query_state(name) {
        Ok(state) => state,
        Err(error) => {
            log::warn!("service {name} could not be opened: {error}");
            report.push(ctx.line(kind, "report.generalError", &[&name, &error]));
            return;
        }
    };
    report.push(ctx.line(
        kind,
        "report.service.status",
        &[&target.display_name, &name, &state],
    ));

    if state.is_stoppable() {
        stop_service(ctx, name, report);
    }

    match ctx
        .helper
        .run(SC, &["config", name, "start=", "disabled"], COMMAND_TIMEOUT)
    {
        Ok(output) => {
            if !output.success() {
                log::warn!("{SC} config {name} exited with {:?}", output.exit_code);
            }
            report.push(ctx.line(
                kind,
                "report.service.disabled",
                &[&name, &ctx.exit_code_text(output.exit_code)],
            ));
            report.push_streams(&output.stdout, &output.stderr);
        }
        Err(error) => {
            log::warn!("{SC} config {name} could not run: {error}");
            report.push(ctx.line(kind, "report.service.disableFailed", &[&name, &error]));
        }
    }
}

fn stop_service(ctx: &ActionContext<'_>, name: &str, report: &mut Report) {
    let kind = TargetKind::Service;
    report.push(ctx.line(kind, "report.service.stopping", &[&name]));

    let stopped = ctx.services.request_stop(name).and_then(|()| {
        ctx.services
            .wait_for_state(name, ServiceState::Stopped, SERVICE_STOP_TIMEOUT)
    });
    match stopped {
        Ok(true) => report.push(ctx.line(kind, "report.service.stopped", &[&name])),
        Ok(false) => report.push(ctx.line(
            kind,
            "report.service.stopTimeout",
            &[&name, &SERVICE_STOP_TIMEOUT.as_secs()],
        )),
        Err(error) => {
            log::warn!("stopping service {name} failed: {error}");
            report.push(ctx.line(kind, "report.service.stopFailed", &[&name, &error]));
        }
    }
}

pub fn disable_scheduled_task(ctx: &ActionContext<'_>, target: &Target, report: &mut Report) {
    let kind = TargetKind::ScheduledTask;
    let name = target.name.as_str();

    let output = match ctx
        .helper
        .run(SCHTASKS, &["/Change", "/TN", name, "/Disable"], COMMAND_TIMEOUT)
    {
        Ok(output) => output,
        Err(error) => {
            log::warn!("{SCHTASKS} /Change {name} could not run: {error}");
            report.push(ctx.line(kind, "report.task.startFailed", &[&name, &error]));
            return;
        }
    };

    if !output.success() {
        log::warn!("{SCHTASKS} /Change {name} exited with {:?}", output.exit_code);
    }
    report.push(ctx.line(
        kind,
        "report.task.disabled",
        &[&name, &ctx.exit_code_text(output.exit_code)],
    ));
    report.push_streams(&output.stdout, &output.stderr);
}

/// Routes `target` to the executor for its kind.
pub fn dispatch(ctx: &ActionContext<'_>, target: &Target, report: &mut Report) {
    match target.kind {
        TargetKind::Process => kill_process(ctx, target, report),
        TargetKind::Service => stop_and_disable_service(ctx, target, report),
        TargetKind::ScheduledTask => disable_scheduled_task(ctx, target, report),
    }
}
