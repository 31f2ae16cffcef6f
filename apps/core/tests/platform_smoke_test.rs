use std::time::Duration;

use upkiller_core::process_table::{current_process_name, ProcessTable, SysinfoProcessTable};

#[test]
fn live_process_table_sees_this_test_binary() {
    let table = SysinfoProcessTable::default();
    let own_pid = std::process::id();

    let snapshot = table.snapshot().expect("process snapshot should succeed");
    let own = snapshot
        .iter()
        .find(|p| p.pid == own_pid)
        .expect("own pid should be listed");
    assert!(!own.name.ends_with(".exe"));
    assert!(own.cpu_time.is_some());
    assert!(own.memory_bytes.is_some_and(|bytes| bytes > 0));

    let pids = table.find_by_name(&own.name).expect("lookup should succeed");
    assert!(pids.contains(&own_pid));
    assert!(current_process_name().is_some());
}

#[cfg(unix)]
#[test]
fn terminate_tree_ends_a_spawned_child() {
    let mut child = std::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("sleep should spawn");
    let table = SysinfoProcessTable::default();

    table.terminate_tree(child.id()).expect("terminate should succeed");
    child.wait().expect("child should be reaped");
    assert!(table.wait_for_exit(child.id(), Duration::from_secs(5)));
}

#[cfg(not(target_os = "windows"))]
#[test]
fn windows_only_capabilities_report_unsupported_elsewhere() {
    use upkiller_core::platform::{is_elevated, PlatformError};
    use upkiller_core::service_manager::{ScmServiceManager, ServiceManager};

    assert_eq!(is_elevated(), Err(PlatformError::UnsupportedPlatform));
    assert_eq!(
        ScmServiceManager.services().unwrap_err(),
        PlatformError::UnsupportedPlatform
    );
    assert_eq!(
        ScmServiceManager.request_stop("wuauserv").unwrap_err(),
        PlatformError::UnsupportedPlatform
    );
}

#[cfg(target_os = "windows")]
#[test]
fn windows_runtime_smoke_scans_without_acting() {
    if std::env::var("UPKILLER_WINDOWS_RUNTIME_SMOKE").as_deref() != Ok("1") {
        eprintln!("skipping windows runtime smoke (set UPKILLER_WINDOWS_RUNTIME_SMOKE=1 to enable)");
        return;
    }

    let cfg = upkiller_core::config::Config {
        filter: "svchost".to_string(),
        include_windows_update: true,
        config_path: std::env::temp_dir().join("upkiller-smoke").join("settings.json"),
        ..Default::default()
    };
    let service = upkiller_core::core_service::CoreService::new(
        cfg,
        upkiller_core::i18n::Localizer::builtin("en"),
    )
    .expect("service should initialize");

    let result = service.scan(true).expect("scan should succeed");
    assert!(result
        .targets
        .iter()
        .any(|t| t.kind == upkiller_core::model::TargetKind::Process));
    assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
}
