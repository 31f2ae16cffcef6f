#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use upkiller_core::helper::{HelperError, HelperOutput, HelperRunner};
use upkiller_core::platform::PlatformError;
use upkiller_core::process_table::{ProcessSnapshot, ProcessTable};
use upkiller_core::service_manager::{ServiceEntry, ServiceManager, ServiceState};

pub fn snapshot(pid: u32, name: &str, title: &str) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        name: name.to_string(),
        window_title: title.to_string(),
        memory_bytes: Some(50 * 1024 * 1024),
        cpu_time: Some(Duration::from_millis(2_500)),
    }
}

pub fn service(name: &str, display_name: &str, state: ServiceState) -> ServiceEntry {
    ServiceEntry {
        name: name.to_string(),
        display_name: display_name.to_string(),
        state,
    }
}

pub fn ok_output(exit_code: i32, stdout: &str, stderr: &str) -> HelperOutput {
    HelperOutput {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        timed_out: false,
    }
}

#[derive(Default)]
pub struct FakeProcessTable {
    pub processes: Vec<ProcessSnapshot>,
    pub snapshot_error: Option<PlatformError>,
    pub refuse_pids: Vec<u32>,
    pub linger_pids: Vec<u32>,
    pub panic_on_name: Option<String>,
    pub terminated: Mutex<Vec<u32>>,
}

impl FakeProcessTable {
    pub fn with(processes: Vec<ProcessSnapshot>) -> Self {
        Self {
            processes,
            ..Default::default()
        }
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }
}

impl ProcessTable for FakeProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessSnapshot>, PlatformError> {
        match &self.snapshot_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.processes.clone()),
        }
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<u32>, PlatformError> {
        if self
            .panic_on_name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
        {
            panic!("process table exploded for {name}");
        }
        Ok(self
            .processes
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.pid)
            .collect())
    }

    fn terminate_tree(&self, pid: u32) -> Result<(), PlatformError> {
        if self.refuse_pids.contains(&pid) {
            return Err(PlatformError::Control("access is denied".to_string()));
        }
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }

    fn wait_for_exit(&self, pid: u32, _timeout: Duration) -> bool {
        !self.linger_pids.contains(&pid)
    }
}

#[derive(Default)]
pub struct FakeServiceManager {
    pub entries: Mutex<Vec<ServiceEntry>>,
    pub list_error: Option<PlatformError>,
    pub stop_error: Option<PlatformError>,
    pub stop_hangs: bool,
    pub stop_requests: Mutex<Vec<String>>,
}

impl FakeServiceManager {
    pub fn with(entries: Vec<ServiceEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Default::default()
        }
    }

    pub fn stop_requests(&self) -> Vec<String> {
        self.stop_requests.lock().unwrap().clone()
    }
}

impl ServiceManager for FakeServiceManager {
    fn services(&self) -> Result<Vec<ServiceEntry>, PlatformError> {
        match &self.list_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.entries.lock().unwrap().clone()),
        }
    }

    fn query_state(&self, name: &str) -> Result<ServiceState, PlatformError> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.state)
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))
    }

    fn request_stop(&self, name: &str) -> Result<(), PlatformError> {
        self.stop_requests.lock().unwrap().push(name.to_string());
        if let Some(error) = &self.stop_error {
            return Err(error.clone());
        }
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|s| s.name.eq_ignore_ascii_case(name)) {
            entry.state = if self.stop_hangs {
                ServiceState::StopPending
            } else {
                ServiceState::Stopped
            };
        }
        Ok(())
    }

    fn wait_for_state(
        &self,
        name: &str,
        wanted: ServiceState,
        _timeout: Duration,
    ) -> Result<bool, PlatformError> {
        Ok(self.query_state(name)? == wanted)
    }
}

/// Answers by program name; records every invocation.
#[derive(Default)]
pub struct FakeHelper {
    pub responses: HashMap<String, Result<HelperOutput, HelperError>>,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeHelper {
    pub fn responding(program: &str, response: Result<HelperOutput, HelperError>) -> Self {
        let mut helper = Self::default();
        helper.responses.insert(program.to_string(), response);
        helper
    }

    pub fn and(mut self, program: &str, response: Result<HelperOutput, HelperError>) -> Self {
        self.responses.insert(program.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HelperRunner for FakeHelper {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<HelperOutput, HelperError> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        self.responses
            .get(program)
            .cloned()
            .unwrap_or_else(|| Ok(ok_output(0, "", "")))
    }
}
