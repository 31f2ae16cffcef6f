use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::actions::{Confirm, ExecuteOutcome};
use crate::auto_scan::{interval_from_minutes, AutoScanTimer};
use crate::cli::CliArgs;
use crate::config::{self, Config, ConfigError};
use crate::core_service::{CoreService, ServiceError};
use crate::i18n::Localizer;
use crate::model::ScanResult;
use crate::platform::{self, PlatformError};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    Done,
    All,
    None,
    Toggle(Vec<usize>),
}

pub fn parse_cli_args(args: &[String]) -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse_from(std::iter::once("upkiller".to_string()).chain(args.iter().cloned()))
}

pub fn run_with_options(options: CliArgs) -> Result<(), RuntimeError> {
    if let Err(error) = crate::logging::init() {
        eprintln!("[upkiller] logging disabled: {error}");
    }

    let mut cfg = load_config_or_default(&options);
    options.apply_to(&mut cfg);
    let cfg = cfg.normalized();
    log::info!(
        "startup config_path={} language={} watch={}",
        cfg.config_path.display(),
        cfg.language,
        wants_watch(&options, &cfg)
    );

    let i18n = match Localizer::default_dir() {
        Some(dir) => Localizer::load(&cfg.language, &dir),
        None => Localizer::builtin(&cfg.language),
    };
    print_admin_notice(&i18n);

    let service = Arc::new(CoreService::new(cfg.clone(), i18n)?);
    let outcome = if wants_watch(&options, &cfg) {
        run_watch(&service, cfg.auto_scan_minutes)
    } else {
        run_once(&service, &options)
    };

    if !options.no_save {
        if let Err(error) = config::save(&service.config()) {
            log::warn!("settings not saved: {error}");
        }
    }
    outcome
}

/// `--watch`, or auto-scan enabled in settings unless the run is `--yes` or `--json`.
pub fn wants_watch(options: &CliArgs, cfg: &Config) -> bool {
    options.watch || (cfg.auto_scan_enabled && !options.yes && !options.json)
}

fn load_config_or_default(options: &CliArgs) -> Config {
    match config::load(options.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(error) => {
            log::warn!("settings could not be loaded, using defaults: {error}");
            Config {
                config_path: options
                    .config
                    .clone()
                    .unwrap_or_else(config::default_config_path),
                ..Config::default()
            }
        }
    }
}

fn print_admin_notice(i18n: &Localizer) {
    match platform::is_elevated() {
        Ok(true) => println!("{}", i18n.t("admin.running")),
        Ok(false) => println!("{}", i18n.t("admin.need")),
        Err(PlatformError::UnsupportedPlatform) => {}
        Err(error) => {
            log::warn!("elevation check failed: {error}");
            println!("{}", i18n.t("admin.unknown"));
        }
    }
}

fn run_once(service: &CoreService, options: &CliArgs) -> Result<(), RuntimeError> {
    let mut result = service.scan(true)?;
    let i18n = service.i18n();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_scan(&result, i18n);
    if options.is_scan_only() || result.is_empty() {
        return Ok(());
    }

    if !options.yes {
        choose_selection(&mut result, i18n)?;
    }

    let outcome = if options.yes {
        service.execute(&result, &|_count: usize| true)?
    } else {
        service.execute(&result, &StdinConfirm { i18n })?
    };

    match outcome {
        ExecuteOutcome::NothingSelected(message) | ExecuteOutcome::Declined(message) => {
            println!("{message}");
        }
        ExecuteOutcome::Completed(report) => {
            println!("\n== {} ==\n{report}", i18n.t("report.label"));
            println!("{}", i18n.t("msg.done.body"));
        }
    }
    Ok(())
}

fn run_watch(service: &Arc<CoreService>, minutes: u32) -> Result<(), RuntimeError> {
    let i18n = service.i18n();
    print_scan(&service.scan(true)?, i18n);
    println!("{}", i18n.tf("prompt.watch", &[&minutes]));

    let ticking = Arc::clone(service);
    let mut timer = AutoScanTimer::start(interval_from_minutes(minutes), move || {
        let i18n = ticking.i18n();
        let outcome = ticking.scan(false);
        match &outcome {
            Ok(result) => print_scan(result, i18n),
            Err(ServiceError::Busy) => log::info!("auto-scan tick skipped: service busy"),
            Err(error) => log::warn!("auto-scan failed: {error}"),
        }
        for line in tick_footer(&outcome, i18n, minutes) {
            println!("{line}");
        }
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if line?.trim().eq_ignore_ascii_case("q") {
            break;
        }
    }
    timer.stop();
    Ok(())
}

/// Lines printed after each auto-scan tick; always ends with the watch prompt.
fn tick_footer(
    outcome: &Result<ScanResult, ServiceError>,
    i18n: &Localizer,
    minutes: u32,
) -> Vec<String> {
    let mut lines = match outcome {
        Ok(_) => Vec::new(),
        Err(ServiceError::Busy) => vec![i18n.t("msg.busy.body").to_string()],
        Err(error) => vec![format!("! {error}")],
    };
    lines.push(i18n.tf("prompt.watch", &[&minutes]));
    lines
}

fn print_scan(result: &ScanResult, i18n: &Localizer) {
    for warning in &result.warnings {
        eprintln!("! {warning}");
    }
    if let Some(filter) = &result.effective_filter {
        println!("filter: {filter}");
    }
    println!("{}", render_table(result, i18n));
    if let Some(summary) = &result.summary {
        println!("{summary}");
    }
}

pub fn render_table(result: &ScanResult, i18n: &Localizer) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            i18n.t("column.index"),
            i18n.t("column.select"),
            i18n.t("column.type"),
            i18n.t("column.name"),
            i18n.t("column.displayName"),
            i18n.t("column.details"),
        ]);

    for (index, target) in result.targets.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            if target.is_selected { "[x]" } else { "[ ]" }.to_string(),
            i18n.t(target.kind.label_key()).to_string(),
            target.name.clone(),
            target.display_name.clone(),
            target.detail.clone(),
        ]);
    }
    table
}

fn choose_selection(result: &mut ScanResult, i18n: &Localizer) -> Result<(), RuntimeError> {
    loop {
        let Some(input) = prompt_line(i18n.t("prompt.toggle"))? else {
            return Ok(());
        };

        match parse_selection_input(&input, result.len()) {
            Ok(SelectionCommand::Done) => return Ok(()),
            Ok(SelectionCommand::All) => result.select_all(true),
            Ok(SelectionCommand::None) => result.select_all(false),
            Ok(SelectionCommand::Toggle(indices)) => {
                for index in indices {
                    result.toggle(index);
                }
            }
            Err(bad) => {
                println!("{}", i18n.tf("prompt.invalid", &[&bad]));
                continue;
            }
        }
        println!("{}", render_table(result, i18n));
    }
}

/// Parses operator input such as `1 3-5,7` into zero-based indices below `len`.
pub fn parse_selection_input(input: &str, len: usize) -> Result<SelectionCommand, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(SelectionCommand::Done);
    }
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(SelectionCommand::All);
    }
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(SelectionCommand::None);
    }

    let mut indices = Vec::new();
    for part in trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_position(a, len)?, parse_position(b, len)?),
            None => {
                let single = parse_position(part, len)?;
                (single, single)
            }
        };
        if start > end {
            return Err(part.to_string());
        }
        indices.extend(start..=end);
    }
    Ok(SelectionCommand::Toggle(indices))
}

fn parse_position(raw: &str, len: usize) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(position) if (1..=len).contains(&position) => Ok(position - 1),
        _ => Err(raw.to_string()),
    }
}

fn prompt_line(prompt: &str) -> Result<Option<String>, std::io::Error> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

struct StdinConfirm<'a> {
    i18n: &'a Localizer,
}

impl Confirm for StdinConfirm<'_> {
    fn confirm(&self, count: usize) -> bool {
        match prompt_line(&self.i18n.tf("msg.confirm.body", &[&count])) {
            Ok(Some(answer)) => is_affirmative(&answer),
            _ => false,
        }
    }
}

/// Accepts `y`/`yes` and the Turkish `e`/`evet`.
fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "e" | "evet"
    )
}
