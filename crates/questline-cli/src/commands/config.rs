//! Config subcommand.
//!
//! Settings are grouped in four sections: where the remote store lives,
//! how sync behaves, what learner actions are worth, and where the local
//! cache is kept. Keys are `section.field`.

use clap::Subcommand;
use questline_core::Config;
use serde_json::Value;

use super::{print_json, CommandResult};

const SECTIONS: [(&str, &str); 4] = [
    ("remote", "remote content store: base_url, api_key, user_id, timeout"),
    ("sync", "background sync cadence, save debounce and retry backoff"),
    ("rewards", "XP per action and micro-reward limits"),
    ("storage", "local cache namespace and database file"),
];

const SECRET_KEYS: [&str; 1] = ["remote.api_key"];

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show one value ("sync.max_attempts") or a whole section ("sync")
    Get { key: String },
    /// Change a value ("none" clears an optional one)
    Set { key: String, value: String },
    /// List values, optionally for one section; secrets are masked
    List { section: Option<String> },
    /// Describe the config sections
    Sections,
    /// Restore defaults for one section, or for everything
    Reset { section: Option<String> },
}

pub fn run(action: ConfigAction, json: bool) -> CommandResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or_else(|| unknown_key(&key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            section_of(&key)?;
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {}", display_value(&key, &stored));
            if key == "remote.base_url" && config.remote.is_configured() {
                println!("run `questline-cli sync run` to fetch remote content");
            }
        }
        ConfigAction::List { section } => {
            if let Some(section) = &section {
                section_of(section)?;
            }
            let entries = flatten(&Config::load()?, section.as_deref())?;
            if json {
                let map: serde_json::Map<String, Value> = entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect();
                return print_json(&map);
            }
            for (key, value) in entries {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Sections => {
            for (name, description) in SECTIONS {
                println!("{name:<8} {description}");
            }
        }
        ConfigAction::Reset { section } => match section {
            Some(section) => {
                section_of(&section)?;
                let defaults = serde_json::to_value(Config::default())?;
                let mut config = Config::load()?;
                config.set(&section, &defaults[section.as_str()].to_string())?;
                println!("{section} reset to defaults");
            }
            None => {
                Config::default().save()?;
                println!("config reset to defaults");
            }
        },
    }
    Ok(())
}

/// Section name of `key`, or an error naming the valid ones.
fn section_of(key: &str) -> Result<&str, Box<dyn std::error::Error>> {
    let section = key.split('.').next().unwrap_or(key);
    if SECTIONS.iter().any(|(name, _)| *name == section) {
        Ok(section)
    } else {
        Err(unknown_key(key))
    }
}

fn unknown_key(key: &str) -> Box<dyn std::error::Error> {
    let names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();
    format!("unknown key: {key} (sections: {})", names.join(", ")).into()
}

fn display_value(key: &str, value: &str) -> String {
    if SECRET_KEYS.contains(&key) && value != "null" {
        "********".into()
    } else {
        value.to_string()
    }
}

/// `section.field = value` pairs in declaration order of the sections.
fn flatten(config: &Config, only: Option<&str>) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let tree = serde_json::to_value(config)?;
    let mut entries = Vec::new();
    for (section, _) in SECTIONS {
        if only.is_some_and(|s| s != section) {
            continue;
        }
        let Some(fields) = tree.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (field, value) in fields {
            let key = format!("{section}.{field}");
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let text = display_value(&key, &text);
            entries.push((key, text));
        }
    }
    Ok(entries)
}
