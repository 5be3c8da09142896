use questline_core::LearnerSession;

use super::{print_json, CommandResult};

pub fn run(session: &LearnerSession, json: bool) -> CommandResult {
    let badges = session.achievements();
    if json {
        return print_json(&badges);
    }
    let unlocked = badges.iter().filter(|b| b.unlocked).count();
    println!("{unlocked}/{} unlocked", badges.len());
    for badge in &badges {
        let mark = if badge.unlocked { "*" } else { " " };
        println!(
            "  [{mark}] {:<16} {}",
            badge.achievement.name, badge.achievement.description
        );
    }
    Ok(())
}
