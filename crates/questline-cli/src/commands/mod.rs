pub mod achievements;
pub mod config;
pub mod goal;
pub mod habit;
pub mod homework;
pub mod lesson;
pub mod progress;
pub mod reward;
pub mod sync;

use chrono::NaiveDate;
use questline_core::gamification::all_achievements;
use questline_core::ActionResult;
use serde::Serialize;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print what a learner action earned.
pub fn print_action(result: &ActionResult, json: bool) -> CommandResult {
    if json {
        return print_json(result);
    }
    if result.xp_awarded > 0 {
        println!("+{} XP (total {}, level {})", result.xp_awarded, result.xp, result.level);
    } else {
        println!("no XP awarded (total {}, level {})", result.xp, result.level);
    }
    if result.leveled_up {
        println!("level up! now level {}", result.level);
    }
    let badges = all_achievements();
    for id in &result.new_achievements {
        if let Some(badge) = badges.iter().find(|b| b.id == *id) {
            println!("achievement unlocked: {} ({})", badge.name, badge.description);
        }
    }
    Ok(())
}

/// Parse `YYYY-MM-DD`, defaulting to today.
pub fn parse_date(value: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{s}': {e}").into()),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
