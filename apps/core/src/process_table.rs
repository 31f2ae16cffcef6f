use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::platform::PlatformError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub window_title: String,
    pub memory_bytes: Option<u64>,
    pub cpu_time: Option<Duration>,
}

/// Process enumeration and control used by the process scanner and the kill executor.
pub trait ProcessTable: Send + Sync {
    fn snapshot(&self) -> Result<Vec<ProcessSnapshot>, PlatformError>;

    /// Live pids whose name equals `name`, ignoring case.
    fn find_by_name(&self, name: &str) -> Result<Vec<u32>, PlatformError>;

    /// Forcefully terminates `pid` and every descendant it can find.
    fn terminate_tree(&self, pid: u32) -> Result<(), PlatformError>;

    /// True once `pid` is gone, false if it is still alive after `timeout`.
    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool;
}

/// Strips a trailing `.exe` so names compare the way the operator types them.
pub fn normalize_process_name(raw: &str) -> String {
    let len = raw.len();
    if len > 4 && raw.is_char_boundary(len - 4) && raw[len - 4..].eq_ignore_ascii_case(".exe") {
        raw[..len - 4].to_string()
    } else {
        raw.to_string()
    }
}

/// Name of the running executable, used to keep the tool out of its own scan.
pub fn current_process_name() -> Option<String> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| normalize_process_name(&name))
}

pub struct SysinfoProcessTable {
    system: Mutex<System>,
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl SysinfoProcessTable {
    fn with_refreshed<T>(&self, f: impl FnOnce(&System) -> T) -> Result<T, PlatformError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| PlatformError::Query("process table lock poisoned".to_string()))?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        Ok(f(&system))
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessSnapshot>, PlatformError> {
        let titles = window_titles();
        self.with_refreshed(|system| {
            system
                .processes()
                .values()
                .map(|process| {
                    let pid = process.pid().as_u32();
                    ProcessSnapshot {
                        pid,
                        name: normalize_process_name(&process.name().to_string_lossy()),
                        window_title: titles.get(&pid).cloned().unwrap_or_default(),
                        memory_bytes: Some(process.memory()),
                        cpu_time: Some(Duration::from_millis(process.accumulated_cpu_time())),
                    }
                })
                .collect()
        })
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<u32>, PlatformError> {
        self.with_refreshed(|system| {
            let mut pids: Vec<u32> = system
                .processes()
                .values()
                .filter(|process| {
                    normalize_process_name(&process.name().to_string_lossy())
                        .eq_ignore_ascii_case(name)
                })
                .map(|process| process.pid().as_u32())
                .collect();
            pids.sort_unstable();
            pids
        })
    }

    fn terminate_tree(&self, pid: u32) -> Result<(), PlatformError> {
        self.with_refreshed(|system| {
            let root = Pid::from_u32(pid);
            if system.process(root).is_none() {
                return Err(PlatformError::NotFound(format!("pid {pid}")));
            }

            let parents: HashMap<Pid, Pid> = system
                .processes()
                .iter()
                .filter_map(|(child, process)| process.parent().map(|parent| (*child, parent)))
                .collect();

            // Leaves first so children are not re-parented before they are reached.
            for descendant in descendants_of(root, &parents).into_iter().rev() {
                if let Some(process) = system.process(descendant) {
                    if !process.kill() {
                        log::debug!("could not terminate descendant {descendant} of {pid}");
                    }
                }
            }

            match system.process(root) {
                Some(process) if process.kill() => Ok(()),
                Some(_) => Err(PlatformError::Control(format!(
                    "terminate request for pid {pid} was refused"
                ))),
                None => Ok(()),
            }
        })?
    }

    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let target = Pid::from_u32(pid);
        loop {
            let alive = match self.system.lock() {
                Ok(mut system) => {
                    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
                    system.process(target).is_some()
                }
                Err(_) => return false,
            };
            if !alive {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

/// Descendants of `root` (excluding `root`), each listed after its parent.
pub fn descendants_of<P>(root: P, parents: &HashMap<P, P>) -> Vec<P>
where
    P: Copy + Eq + std::hash::Hash,
{
    let mut children: HashMap<P, Vec<P>> = HashMap::new();
    for (child, parent) in parents {
        if child != parent {
            children.entry(*parent).or_default().push(*child);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut order = Vec::new();
    let mut frontier = vec![root];
    while let Some(next) = frontier.pop() {
        for child in children.get(&next).into_iter().flatten() {
            if seen.insert(*child) {
                order.push(*child);
                frontier.push(*child);
            }
        }
    }
    order
}

#[cfg(target_os = "windows")]
fn window_titles() -> HashMap<u32, String> {
    use windows_sys::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
        IsWindowVisible, GW_OWNER,
    };

    unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let titles = &mut *(lparam as *mut HashMap<u32, String>);
        if IsWindowVisible(hwnd) == 0 || !GetWindow(hwnd, GW_OWNER).is_null() {
            return 1;
        }

        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return 1;
        }

        let mut pid = 0_u32;
        GetWindowThreadProcessId(hwnd, &mut pid);
        if pid == 0 || titles.contains_key(&pid) {
            return 1;
        }

        let mut buffer = vec![0_u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32);
        if copied > 0 {
            titles.insert(pid, String::from_utf16_lossy(&buffer[..copied as usize]));
        }
        1
    }

    let mut titles: HashMap<u32, String> = HashMap::new();
    unsafe {
        EnumWindows(Some(collect), &mut titles as *mut HashMap<u32, String> as LPARAM);
    }
    titles
}

#[cfg(not(target_os = "windows"))]
fn window_titles() -> HashMap<u32, String> {
    HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::{descendants_of, normalize_process_name};
    use std::collections::HashMap;

    #[test]
    fn exe_suffix_is_stripped_case_insensitively() {
        assert_eq!(normalize_process_name("Teams.EXE"), "Teams");
        assert_eq!(normalize_process_name("bash"), "bash");
        assert_eq!(normalize_process_name(".exe"), ".exe");
    }

    #[test]
    fn descendants_cover_grandchildren_once() {
        let parents = HashMap::from([(2, 1), (3, 2), (4, 2), (5, 9), (1, 1)]);
        let mut found = descendants_of(1, &parents);
        found.sort_unstable();
        assert_eq!(found, vec![2, 3, 4]);
    }
}
