pub mod actions;
pub mod auto_scan;
pub mod cli;
pub mod config;
pub mod core_service;
pub mod executors;
pub mod helper;
pub mod i18n;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod platform;
pub mod process_table;
pub mod report;
pub mod runtime;
pub mod scan;
pub mod scanners;
pub mod service_manager;
