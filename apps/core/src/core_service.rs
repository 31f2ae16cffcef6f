use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::actions::{execute_on, Confirm, ExecuteOutcome};
use crate::config::{validate, Config, ConfigError};
use crate::executors::ActionContext;
use crate::helper::{HelperRunner, SystemHelperRunner};
use crate::i18n::Localizer;
use crate::matcher::MatcherError;
use crate::model::ScanResult;
use crate::process_table::{current_process_name, ProcessTable, SysinfoProcessTable};
use crate::scan::{perform_scan, ScanOptions};
use crate::scanners::{ProcessScanner, Scanner, ServiceScanner, TaskScanner};
use crate::service_manager::{ScmServiceManager, ServiceManager};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("matcher error: {0}")]
    Matcher(#[from] MatcherError),
    #[error("another scan or action batch is in progress")]
    Busy,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Front-end facing entry point: `scan` and `execute` never overlap.
pub struct CoreService {
    config: Mutex<Config>,
    i18n: Localizer,
    processes: Box<dyn ProcessTable>,
    services: Box<dyn ServiceManager>,
    helper: Box<dyn HelperRunner>,
    self_name: Option<String>,
    busy: AtomicBool,
}

impl CoreService {
    pub fn new(config: Config, i18n: Localizer) -> Result<Self, ServiceError> {
        Self::with_platform(
            config,
            i18n,
            Box::new(SysinfoProcessTable::default()),
            Box::new(ScmServiceManager),
            Box::new(SystemHelperRunner),
        )
        .map(|service| service.with_self_name(current_process_name()))
    }

    pub fn with_platform(
        config: Config,
        i18n: Localizer,
        processes: Box<dyn ProcessTable>,
        services: Box<dyn ServiceManager>,
        helper: Box<dyn HelperRunner>,
    ) -> Result<Self, ServiceError> {
        validate(&config)?;
        Ok(Self {
            config: Mutex::new(config),
            i18n,
            processes,
            services,
            helper,
            self_name: None,
            busy: AtomicBool::new(false),
        })
    }

    /// Name excluded from the process scan, normally this executable's own.
    pub fn with_self_name(mut self, self_name: Option<String>) -> Self {
        self.self_name = self_name;
        self
    }

    pub fn i18n(&self) -> &Localizer {
        &self.i18n
    }

    pub fn config(&self) -> Config {
        self.lock_config().clone()
    }

    pub fn set_filter(&self, filter: &str) {
        self.lock_config().filter = filter.to_string();
    }

    pub fn set_include_windows_update(&self, include: bool) {
        self.lock_config().include_windows_update = include;
    }

    pub fn set_show_only_active(&self, only_active: bool) {
        self.lock_config().show_only_active = only_active;
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn scan(&self, show_summary: bool) -> Result<ScanResult, ServiceError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ServiceError::Busy)?;
        let options = {
            let cfg = self.lock_config();
            ScanOptions {
                filter: cfg.filter.clone(),
                include_windows_update: cfg.include_windows_update,
                show_only_active: cfg.show_only_active,
                show_summary,
            }
        };
        log::info!(
            "scan started filter={:?} include_windows_update={} show_only_active={}",
            options.filter,
            options.include_windows_update,
            options.show_only_active
        );

        let process_scanner = ProcessScanner::new(self.processes.as_ref(), self.self_name.clone());
        let service_scanner = ServiceScanner::new(self.services.as_ref());
        let task_scanner = TaskScanner::new(self.helper.as_ref());
        let scanners: [&dyn Scanner; 3] = [&process_scanner, &service_scanner, &task_scanner];

        let result = perform_scan(&options, &scanners, &self.i18n)?;
        if let Some(filter) = &result.effective_filter {
            self.lock_config().filter = filter.clone();
        }
        Ok(result)
    }

    pub fn execute(
        &self,
        result: &ScanResult,
        confirm: &dyn Confirm,
    ) -> Result<ExecuteOutcome, ServiceError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ServiceError::Busy)?;
        let ctx = ActionContext {
            processes: self.processes.as_ref(),
            services: self.services.as_ref(),
            helper: self.helper.as_ref(),
            i18n: &self.i18n,
        };
        Ok(execute_on(&ctx, &result.selected(), confirm))
    }

    fn lock_config(&self) -> MutexGuard<'_, Config> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
