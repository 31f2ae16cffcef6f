use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_LANGUAGE: &str = "en";

const EMBEDDED: [(&str, &str); 2] = [
    ("en", include_str!("../lang/en.json")),
    ("tr", include_str!("../lang/tr.json")),
];

/// Key/value string table for one language.
///
/// Lookups never fail: an unresolved or blank entry yields the key itself.
#[derive(Debug, Clone, Default)]
pub struct Localizer {
    language: String,
    strings: HashMap<String, String>,
}

impl Localizer {
    /// Embedded table for `language`, falling back to English for unknown codes.
    pub fn builtin(language: &str) -> Self {
        let code = normalize_code(language);
        let source = EMBEDDED
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .or_else(|| EMBEDDED.iter().find(|(candidate, _)| *candidate == DEFAULT_LANGUAGE))
            .map(|(_, json)| *json)
            .unwrap_or("{}");

        Self {
            language: code,
            strings: parse_table(source).unwrap_or_default(),
        }
    }

    /// Embedded table overlaid with `<dir>/<language>.json` when that file exists,
    /// or with `<dir>/en.json` otherwise.
    pub fn load(language: &str, dir: &Path) -> Self {
        let mut localizer = Self::builtin(language);
        let file = dir.join(format!("{}.json", localizer.language));
        let fallback = dir.join(format!("{DEFAULT_LANGUAGE}.json"));
        let to_read = if file.exists() { file } else { fallback };
        if !to_read.exists() {
            return localizer;
        }

        match std::fs::read_to_string(&to_read)
            .map_err(|e| e.to_string())
            .and_then(|json| parse_table(&json))
        {
            Ok(table) => localizer.strings.extend(table),
            Err(error) => log::warn!(
                "ignoring language file {}: {error}",
                to_read.display()
            ),
        }
        localizer
    }

    /// `lang/` next to the running executable.
    pub fn default_dir() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("lang")))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.strings.get(key) {
            Some(value) if !value.trim().is_empty() => value.as_str(),
            _ => key,
        }
    }

    /// Looks up `key` and replaces `{0}`, `{1}`, ... with `args` in a single pass.
    /// Text coming from an argument is never substituted again.
    pub fn tf(&self, key: &str, args: &[&dyn std::fmt::Display]) -> String {
        fill_placeholders(self.t(key), args)
    }
}

fn fill_placeholders(template: &str, args: &[&dyn std::fmt::Display]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let arg = (digits > 0 && after[digits..].starts_with('}'))
            .then(|| after[..digits].parse::<usize>().ok())
            .flatten()
            .and_then(|index| args.get(index));
        match arg {
            Some(arg) => {
                text.push_str(&arg.to_string());
                rest = &after[digits + 1..];
            }
            None => {
                text.push('{');
                rest = after;
            }
        }
    }
    text.push_str(rest);
    text
}

fn normalize_code(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

fn parse_table(json: &str) -> Result<HashMap<String, String>, String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "language file root must be an object".to_string())?;

    Ok(object
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_string())))
        .collect())
}
