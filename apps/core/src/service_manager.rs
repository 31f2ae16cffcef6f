use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use crate::platform::PlatformError;

const STATE_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Unknown(u32),
}

impl ServiceState {
    /// States in which a stop request makes sense.
    pub fn is_stoppable(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::StartPending)
    }
}

impl Display for ServiceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::StartPending => write!(f, "StartPending"),
            Self::StopPending => write!(f, "StopPending"),
            Self::Running => write!(f, "Running"),
            Self::ContinuePending => write!(f, "ContinuePending"),
            Self::PausePending => write!(f, "PausePending"),
            Self::Paused => write!(f, "Paused"),
            Self::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub display_name: String,
    pub state: ServiceState,
}

/// Service enumeration and control used by the service scanner and executor.
pub trait ServiceManager: Send + Sync {
    fn services(&self) -> Result<Vec<ServiceEntry>, PlatformError>;

    fn query_state(&self, name: &str) -> Result<ServiceState, PlatformError>;

    fn request_stop(&self, name: &str) -> Result<(), PlatformError>;

    /// Polls until `name` reports `wanted`. `Ok(false)` means the timeout elapsed.
    fn wait_for_state(
        &self,
        name: &str,
        wanted: ServiceState,
        timeout: Duration,
    ) -> Result<bool, PlatformError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.query_state(name)? == wanted {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(STATE_POLL_INTERVAL);
        }
    }
}

/// Service Control Manager backed implementation.
#[derive(Debug, Default)]
pub struct ScmServiceManager;

#[cfg(target_os = "windows")]
mod scm {
    use windows_sys::Win32::Foundation::{GetLastError, ERROR_MORE_DATA};
    use windows_sys::Win32::System::Services::{
        CloseServiceHandle, ControlService, EnumServicesStatusExW, OpenSCManagerW, OpenServiceW,
        QueryServiceStatus, ENUM_SERVICE_STATUS_PROCESSW, SC_ENUM_PROCESS_INFO, SC_HANDLE,
        SC_MANAGER_CONNECT, SC_MANAGER_ENUMERATE_SERVICE, SERVICE_CONTINUE_PENDING,
        SERVICE_CONTROL_STOP, SERVICE_PAUSED, SERVICE_PAUSE_PENDING, SERVICE_QUERY_STATUS,
        SERVICE_RUNNING, SERVICE_START_PENDING, SERVICE_STATE_ALL, SERVICE_STATUS,
        SERVICE_STOP, SERVICE_STOPPED, SERVICE_STOP_PENDING, SERVICE_WIN32,
    };

    use super::{ServiceEntry, ServiceState};
    use crate::platform::{to_wide, PlatformError};

    struct ScHandle(SC_HANDLE);

    impl Drop for ScHandle {
        fn drop(&mut self) {
            unsafe {
                CloseServiceHandle(self.0);
            }
        }
    }

    fn last_error(action: &str) -> String {
        let code = unsafe { GetLastError() };
        format!("{action} failed with error {code}")
    }

    fn open_manager(access: u32) -> Result<ScHandle, PlatformError> {
        let handle = unsafe { OpenSCManagerW(std::ptr::null(), std::ptr::null(), access) };
        if handle.is_null() {
            return Err(PlatformError::Query(last_error("OpenSCManagerW")));
        }
        Ok(ScHandle(handle))
    }

    fn open_service(name: &str, access: u32) -> Result<ScHandle, PlatformError> {
        let manager = open_manager(SC_MANAGER_CONNECT)?;
        let wide = to_wide(name);
        let handle = unsafe { OpenServiceW(manager.0, wide.as_ptr(), access) };
        if handle.is_null() {
            return Err(PlatformError::NotFound(last_error(&format!(
                "OpenServiceW({name})"
            ))));
        }
        Ok(ScHandle(handle))
    }

    fn state_from_raw(raw: u32) -> ServiceState {
        match raw {
            SERVICE_STOPPED => ServiceState::Stopped,
            SERVICE_START_PENDING => ServiceState::StartPending,
            SERVICE_STOP_PENDING => ServiceState::StopPending,
            SERVICE_RUNNING => ServiceState::Running,
            SERVICE_CONTINUE_PENDING => ServiceState::ContinuePending,
            SERVICE_PAUSE_PENDING => ServiceState::PausePending,
            SERVICE_PAUSED => ServiceState::Paused,
            other => ServiceState::Unknown(other),
        }
    }

    unsafe fn wide_ptr_to_string(ptr: *const u16) -> String {
        if ptr.is_null() {
            return String::new();
        }
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }

    pub fn services() -> Result<Vec<ServiceEntry>, PlatformError> {
        let manager = open_manager(SC_MANAGER_ENUMERATE_SERVICE)?;
        let mut entries = Vec::new();
        let mut resume = 0_u32;
        // u64 backing keeps the returned structs aligned.
        let mut buffer: Vec<u64> = vec![0; 8 * 1024];

        loop {
            let mut needed = 0_u32;
            let mut returned = 0_u32;
            let ok = unsafe {
                EnumServicesStatusExW(
                    manager.0,
                    SC_ENUM_PROCESS_INFO,
                    SERVICE_WIN32,
                    SERVICE_STATE_ALL,
                    buffer.as_mut_ptr() as *mut u8,
                    (buffer.len() * std::mem::size_of::<u64>()) as u32,
                    &mut needed,
                    &mut returned,
                    &mut resume,
                    std::ptr::null(),
                )
            };
            let more = ok == 0 && unsafe { GetLastError() } == ERROR_MORE_DATA;
            if ok == 0 && !more {
                return Err(PlatformError::Query(last_error("EnumServicesStatusExW")));
            }

            let records = unsafe {
                std::slice::from_raw_parts(
                    buffer.as_ptr() as *const ENUM_SERVICE_STATUS_PROCESSW,
                    returned as usize,
                )
            };
            for record in records {
                entries.push(ServiceEntry {
                    name: unsafe { wide_ptr_to_string(record.lpServiceName) },
                    display_name: unsafe { wide_ptr_to_string(record.lpDisplayName) },
                    state: state_from_raw(record.ServiceStatusProcess.dwCurrentState),
                });
            }

            if !more {
                return Ok(entries);
            }
            let wanted = (needed as usize).div_ceil(std::mem::size_of::<u64>());
            if wanted > buffer.len() {
                buffer.resize(wanted, 0);
            }
        }
    }

    fn empty_status() -> SERVICE_STATUS {
        SERVICE_STATUS {
            dwServiceType: 0,
            dwCurrentState: 0,
            dwControlsAccepted: 0,
            dwWin32ExitCode: 0,
            dwServiceSpecificExitCode: 0,
            dwCheckPoint: 0,
            dwWaitHint: 0,
        }
    }

    pub fn query_state(name: &str) -> Result<ServiceState, PlatformError> {
        let service = open_service(name, SERVICE_QUERY_STATUS)?;
        let mut status = empty_status();
        let ok = unsafe { QueryServiceStatus(service.0, &mut status) };
        if ok == 0 {
            return Err(PlatformError::Query(last_error("QueryServiceStatus")));
        }
        Ok(state_from_raw(status.dwCurrentState))
    }

    pub fn request_stop(name: &str) -> Result<(), PlatformError> {
        let service = open_service(name, SERVICE_STOP | SERVICE_QUERY_STATUS)?;
        let mut status = empty_status();
        let ok = unsafe { ControlService(service.0, SERVICE_CONTROL_STOP, &mut status) };
        if ok == 0 {
            return Err(PlatformError::Control(last_error("ControlService(stop)")));
        }
        Ok(())
    }
}

#[cfg(target_os = "windows")]
impl ServiceManager for ScmServiceManager {
    fn services(&self) -> Result<Vec<ServiceEntry>, PlatformError> {
        scm::services()
    }

    fn query_state(&self, name: &str) -> Result<ServiceState, PlatformError> {
        scm::query_state(name)
    }

    fn request_stop(&self, name: &str) -> Result<(), PlatformError> {
        scm::request_stop(name)
    }
}

#[cfg(not(target_os = "windows"))]
impl ServiceManager for ScmServiceManager {
    fn services(&self) -> Result<Vec<ServiceEntry>, PlatformError> {
        Err(PlatformError::UnsupportedPlatform)
    }

    fn query_state(&self, _name: &str) -> Result<ServiceState, PlatformError> {
        Err(PlatformError::UnsupportedPlatform)
    }

    fn request_stop(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::UnsupportedPlatform)
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceState;

    #[test]
    fn only_running_paused_and_start_pending_are_stoppable() {
        assert!(ServiceState::Running.is_stoppable());
        assert!(ServiceState::Paused.is_stoppable());
        assert!(ServiceState::StartPending.is_stoppable());
        assert!(!ServiceState::Stopped.is_stoppable());
        assert!(!ServiceState::StopPending.is_stoppable());
        assert!(!ServiceState::PausePending.is_stoppable());
    }

    #[test]
    fn state_names_match_service_controller_wording() {
        assert_eq!(ServiceState::Running.to_string(), "Running");
        assert_eq!(ServiceState::StartPending.to_string(), "StartPending");
        assert_eq!(ServiceState::Unknown(42).to_string(), "Unknown(42)");
    }
}
