use std::cmp::Reverse;

use crate::i18n::Localizer;
use crate::matcher::{Matcher, MatcherError};
use crate::model::{ScanResult, Target, TargetKind};
use crate::scanners::{ScanContext, Scanner};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub filter: String,
    pub include_windows_update: bool,
    pub show_only_active: bool,
    pub show_summary: bool,
}

/// Runs every scanner, then filters, orders and pre-selects the combined list.
///
/// A failing scanner contributes a warning instead of aborting the scan; only a
/// matcher that cannot be built stops the scan before any scanner runs.
pub fn perform_scan(
    options: &ScanOptions,
    scanners: &[&dyn Scanner],
    i18n: &Localizer,
) -> Result<ScanResult, MatcherError> {
    let matcher = Matcher::compile(&options.filter)?;
    let ctx = ScanContext {
        matcher: &matcher,
        i18n,
        include_windows_update: options.include_windows_update,
    };

    let mut targets = Vec::new();
    let mut warnings = Vec::new();
    for scanner in scanners {
        let before = targets.len();
        match scanner.scan(&ctx, &mut targets) {
            Ok(()) => log::debug!(
                "{} scan found {} target(s)",
                scanner.kind(),
                targets.len() - before
            ),
            Err(error) => {
                log::warn!("{} scan failed: {error}", scanner.kind());
                warnings.push(match scanner.kind() {
                    TargetKind::ScheduledTask => i18n.tf("msg.taskReadError.body", &[&error]),
                    kind => i18n.tf("msg.scanFailed.body", &[&kind, &error]),
                });
            }
        }
    }

    if options.show_only_active {
        retain_active(&mut targets);
    }
    sort_targets(&mut targets);
    apply_default_selection(&mut targets);

    log::info!(
        "scan finished: {} target(s), {} warning(s), pattern_mode={}",
        targets.len(),
        warnings.len(),
        matcher.uses_pattern()
    );

    let summary = options
        .show_summary
        .then(|| i18n.tf("msg.scan.body", &[&targets.len()]));
    Ok(ScanResult {
        targets,
        warnings,
        effective_filter: matcher.substituted_filter().map(str::to_string),
        summary,
    })
}

pub fn retain_active(targets: &mut Vec<Target>) {
    targets.retain(|t| t.is_active);
}

/// Running tier first, then kind in declaration order, then name ignoring case.
pub fn sort_targets(targets: &mut [Target]) {
    targets.sort_by_cached_key(|t| (Reverse(t.is_running()), t.kind, t.name.to_lowercase()));
}

pub fn apply_default_selection(targets: &mut [Target]) {
    for target in targets {
        target.is_selected = !target.is_disabled_like;
    }
}
