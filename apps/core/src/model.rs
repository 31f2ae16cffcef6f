use std::fmt::{Display, Formatter};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Process,
    Service,
    ScheduledTask,
}

impl TargetKind {
    pub fn report_tag(self) -> &'static str {
        match self {
            Self::Process => "[PROCESS]",
            Self::Service => "[SERVICE]",
            Self::ScheduledTask => "[TASK]",
        }
    }

    pub fn label_key(self) -> &'static str {
        match self {
            Self::Process => "type.process",
            Self::Service => "type.service",
            Self::ScheduledTask => "type.task",
        }
    }
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process => write!(f, "Process"),
            Self::Service => write!(f, "Service"),
            Self::ScheduledTask => write!(f, "ScheduledTask"),
        }
    }
}

/// One discovered entity the operator may act on.
///
/// `name` is the identifier used to re-resolve the live entity when an action
/// runs; it is never a snapshot handle such as a pid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    pub display_name: String,
    pub detail: String,
    pub is_selected: bool,
    pub is_active: bool,
    pub is_disabled_like: bool,
    #[serde(skip)]
    pub is_stopped_service: bool,
}

impl Target {
    pub fn process(name: &str, display_name: &str, detail: String) -> Self {
        Self {
            kind: TargetKind::Process,
            name: name.to_string(),
            display_name: display_name.to_string(),
            detail,
            is_selected: true,
            is_active: true,
            is_disabled_like: false,
            is_stopped_service: false,
        }
    }

    pub fn service(name: &str, display_name: &str, detail: String, stopped: bool) -> Self {
        Self {
            kind: TargetKind::Service,
            name: name.to_string(),
            display_name: display_name.to_string(),
            detail,
            is_selected: !stopped,
            is_active: !stopped,
            is_disabled_like: stopped,
            is_stopped_service: stopped,
        }
    }

    pub fn scheduled_task(name: &str, detail: String, disabled: bool) -> Self {
        Self {
            kind: TargetKind::ScheduledTask,
            name: name.to_string(),
            display_name: name.to_string(),
            detail,
            is_selected: !disabled,
            is_active: !disabled,
            is_disabled_like: disabled,
            is_stopped_service: false,
        }
    }

    /// Running processes and non-stopped services form the top ordering tier.
    /// Scheduled tasks never do, even when enabled.
    pub fn is_running(&self) -> bool {
        match self.kind {
            TargetKind::Process => true,
            TargetKind::Service => !self.is_stopped_service,
            TargetKind::ScheduledTask => false,
        }
    }
}

/// The ordered, pre-selected outcome of one scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub targets: Vec<Target>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_filter: Option<String>,
    #[serde(skip)]
    pub summary: Option<String>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn selected(&self) -> Vec<&Target> {
        self.targets.iter().filter(|t| t.is_selected).collect()
    }

    pub fn selected_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_selected).count()
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        match self.targets.get_mut(index) {
            Some(target) => {
                target.is_selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        match self.targets.get_mut(index) {
            Some(target) => {
                target.is_selected = !target.is_selected;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for target in &mut self.targets {
            target.is_selected = selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ScanResult, Target, TargetKind};

    #[test]
    fn kinds_order_by_declaration() {
        assert!(TargetKind::Process < TargetKind::Service);
        assert!(TargetKind::Service < TargetKind::ScheduledTask);
    }

    #[test]
    fn enabled_task_is_active_but_not_running_tier() {
        let task = Target::scheduled_task("\\Updater", String::new(), false);
        assert!(task.is_active);
        assert!(!task.is_running());
    }

    #[test]
    fn toggle_ignores_out_of_range_index() {
        let mut result = ScanResult {
            targets: vec![Target::process("notepad", "notepad", String::new())],
            ..Default::default()
        };
        assert!(!result.toggle(3));
        assert!(result.toggle(0));
        assert_eq!(result.selected_count(), 0);
    }
}
