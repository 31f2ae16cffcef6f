use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "upkiller",
    version,
    about = "Find and stop processes, services and scheduled tasks matching a filter"
)]
pub struct CliArgs {
    /// Filter text: words, "quoted phrases", or a single regular expression.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Always include Windows Update related services.
    #[arg(long)]
    pub include_windows_update: bool,

    /// Also list stopped services and disabled tasks.
    #[arg(long)]
    pub all: bool,

    /// Language code for messages (en, tr).
    #[arg(long)]
    pub lang: Option<String>,

    /// Settings file to read and write instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Act on the default selection without prompting.
    #[arg(short, long)]
    pub yes: bool,

    /// Only list matches; never act.
    #[arg(long)]
    pub scan_only: bool,

    /// Print the scan result as JSON (implies --scan-only).
    #[arg(long)]
    pub json: bool,

    /// Rescan on an interval and print each result until `q` is entered.
    #[arg(long, conflicts_with_all = ["yes", "json"])]
    pub watch: bool,

    /// Rescan interval in minutes for --watch.
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: Option<u32>,

    /// Do not persist settings on exit.
    #[arg(long)]
    pub no_save: bool,
}

impl CliArgs {
    /// Overlays explicit flags on persisted settings.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(filter) = &self.filter {
            cfg.filter = filter.clone();
        }
        if self.include_windows_update {
            cfg.include_windows_update = true;
        }
        if self.all {
            cfg.show_only_active = false;
        }
        if let Some(lang) = &self.lang {
            cfg.language = lang.clone();
        }
        if let Some(minutes) = self.interval {
            cfg.auto_scan_minutes = minutes;
        }
        if self.watch {
            cfg.auto_scan_enabled = true;
        }
    }

    pub fn is_scan_only(&self) -> bool {
        self.scan_only || self.json
    }
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use crate::config::Config;
    use clap::Parser;

    #[test]
    fn flags_override_persisted_settings() {
        let args = CliArgs::try_parse_from([
            "upkiller",
            "--filter",
            "teams",
            "--all",
            "--lang",
            "tr",
            "--interval",
            "2",
        ])
        .unwrap();
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);

        assert_eq!(cfg.filter, "teams");
        assert!(!cfg.show_only_active);
        assert_eq!(cfg.language, "tr");
        assert_eq!(cfg.auto_scan_minutes, 2);
        assert!(!cfg.auto_scan_enabled);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(CliArgs::try_parse_from(["upkiller", "--interval", "0"]).is_err());
    }

    #[test]
    fn json_implies_scan_only() {
        let args = CliArgs::try_parse_from(["upkiller", "--json"]).unwrap();
        assert!(args.is_scan_only());
    }
}
