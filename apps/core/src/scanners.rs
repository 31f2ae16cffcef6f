use crate::helper::{HelperError, HelperRunner, QUERY_TIMEOUT};
use crate::i18n::Localizer;
use crate::matcher::Matcher;
use crate::model::{Target, TargetKind};
use crate::platform::PlatformError;
use crate::process_table::ProcessTable;
use crate::service_manager::{ServiceManager, ServiceState};

pub const SCHTASKS: &str = "schtasks.exe";

/// Short names of services that belong to Windows Update regardless of display name.
pub const KNOWN_UPDATE_SERVICES: [&str; 4] = ["wuauserv", "UsoSvc", "BITS", "WaaSMedicSvc"];

/// Status substrings that mark a scheduled task as disabled. `devre` covers the
/// Turkish "Devre dışı" label.
const DISABLED_TASK_MARKERS: [&str; 2] = ["disabled", "devre"];

const TASK_NAME_COLUMN: usize = 0;
const TASK_NEXT_RUN_COLUMN: usize = 1;
const TASK_STATUS_COLUMN: usize = 3;
const TASK_MIN_COLUMNS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Helper(#[from] HelperError),
}

pub struct ScanContext<'a> {
    pub matcher: &'a Matcher,
    pub i18n: &'a Localizer,
    pub include_windows_update: bool,
}

pub trait Scanner {
    fn kind(&self) -> TargetKind;
    fn scan(&self, ctx: &ScanContext<'_>, out: &mut Vec<Target>) -> Result<(), ScanError>;
}

pub struct ProcessScanner<'a> {
    table: &'a dyn ProcessTable,
    self_name: Option<String>,
}

impl<'a> ProcessScanner<'a> {
    pub fn new(table: &'a dyn ProcessTable, self_name: Option<String>) -> Self {
        Self { table, self_name }
    }
}

impl Scanner for ProcessScanner<'_> {
    fn kind(&self) -> TargetKind {
        TargetKind::Process
    }

    fn scan(&self, ctx: &ScanContext<'_>, out: &mut Vec<Target>) -> Result<(), ScanError> {
        let mut processes = self.table.snapshot()?;
        processes.sort_by_cached_key(|p| p.name.to_lowercase());

        for process in processes {
            let is_self = self
                .self_name
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(&process.name));
            if is_self {
                continue;
            }

            let combined = format!("{} {}", process.name, process.window_title);
            if !ctx.matcher.is_match(&combined) {
                continue;
            }

            let ram_mb = process.memory_bytes.unwrap_or(0) as f64 / 1024.0 / 1024.0;
            let cpu_seconds = process.cpu_time.map(|d| d.as_secs_f64()).unwrap_or(0.0);
            let detail = format!(
                "{}: {}, RAM: {ram_mb:.1} MB, {}: {cpu_seconds:.1} {}",
                ctx.i18n.t("detail.pid"),
                process.pid,
                ctx.i18n.t("detail.cpuTime"),
                ctx.i18n.t("detail.seconds"),
            );
            let display = if process.window_title.trim().is_empty() {
                process.name.as_str()
            } else {
                process.window_title.as_str()
            };

            out.push(Target::process(&process.name, display, detail));
        }
        Ok(())
    }
}

pub struct ServiceScanner<'a> {
    manager: &'a dyn ServiceManager,
}

impl<'a> ServiceScanner<'a> {
    pub fn new(manager: &'a dyn ServiceManager) -> Self {
        Self { manager }
    }
}

pub fn is_windows_update_service(name: &str, display_name: &str) -> bool {
    display_name.to_lowercase().contains("windows update")
        || KNOWN_UPDATE_SERVICES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
}

impl Scanner for ServiceScanner<'_> {
    fn kind(&self) -> TargetKind {
        TargetKind::Service
    }

    fn scan(&self, ctx: &ScanContext<'_>, out: &mut Vec<Target>) -> Result<(), ScanError> {
        let mut services = self.manager.services()?;
        services.sort_by_cached_key(|s| s.display_name.to_lowercase());

        for service in services {
            let matched = ctx
                .matcher
                .is_match(&format!("{} {}", service.name, service.display_name));
            let forced = ctx.include_windows_update
                && is_windows_update_service(&service.name, &service.display_name);
            if !matched && !forced {
                continue;
            }

            let stopped = service.state == ServiceState::Stopped;
            let detail = if stopped {
                format!(
                    "{}: {}",
                    ctx.i18n.t("detail.status"),
                    ctx.i18n.t("detail.disabled")
                )
            } else {
                format!("{}: {}", ctx.i18n.t("detail.status"), service.state)
            };

            out.push(Target::service(
                &service.name,
                &service.display_name,
                detail,
                stopped,
            ));
        }
        Ok(())
    }
}

pub struct TaskScanner<'a> {
    helper: &'a dyn HelperRunner,
}

impl<'a> TaskScanner<'a> {
    pub fn new(helper: &'a dyn HelperRunner) -> Self {
        Self { helper }
    }
}

impl Scanner for TaskScanner<'_> {
    fn kind(&self) -> TargetKind {
        TargetKind::ScheduledTask
    }

    fn scan(&self, ctx: &ScanContext<'_>, out: &mut Vec<Target>) -> Result<(), ScanError> {
        let output = self.helper.run(
            SCHTASKS,
            &["/Query", "/FO", "CSV", "/V", "/NH"],
            QUERY_TIMEOUT,
        )?;
        if output.timed_out {
            log::warn!("{SCHTASKS} query timed out; using partial output");
        }

        for line in output.stdout.lines() {
            if let Some(target) = parse_task_line(line, ctx) {
                out.push(target);
            }
        }
        Ok(())
    }
}

fn parse_task_line(line: &str, ctx: &ScanContext<'_>) -> Option<Target> {
    if line.trim().is_empty() {
        return None;
    }

    let columns = parse_csv_line(line);
    if columns.len() < TASK_MIN_COLUMNS {
        return None;
    }

    let task_name = columns[TASK_NAME_COLUMN].as_str();
    let next_run = columns
        .get(TASK_NEXT_RUN_COLUMN)
        .map(String::as_str)
        .unwrap_or_default();
    let status = columns
        .get(TASK_STATUS_COLUMN)
        .map(String::as_str)
        .unwrap_or_default();

    if !ctx.matcher.is_match(&format!("{task_name} {status}")) {
        return None;
    }

    let detail = format!(
        "{}: {next_run}, {}: {status}",
        ctx.i18n.t("detail.nextRun"),
        ctx.i18n.t("detail.status"),
    );
    Some(Target::scheduled_task(
        task_name,
        detail,
        is_disabled_task_status(status),
    ))
}

pub fn is_disabled_task_status(status: &str) -> bool {
    let lowered = status.to_lowercase();
    DISABLED_TASK_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Splits one quoted CSV record. Commas inside double quotes do not split and the
/// quote characters themselves are dropped.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => columns.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    columns.push(current);
    columns
}
