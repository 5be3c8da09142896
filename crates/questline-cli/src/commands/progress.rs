use clap::Subcommand;
use questline_core::LearnerSession;
use serde::Serialize;

use super::{parse_date, print_json, CommandResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Show XP, level, streaks and course completion
    Show {
        /// Evaluate streaks as of this date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Set the display name shown on the leaderboard
    Name { name: String },
    /// Show the cached leaderboard
    Leaderboard,
    /// Wipe all progress for this learner (identity is kept)
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct Summary {
    learner: String,
    remote_id: Option<String>,
    name: String,
    xp: u64,
    level: u32,
    lessons_completed: usize,
    total_lessons: usize,
    completion_percent: u32,
    homeworks: usize,
    best_streak: u32,
    habits: Vec<HabitLine>,
    goals: Vec<GoalLine>,
}

#[derive(Serialize)]
struct HabitLine {
    id: String,
    title: String,
    streak: u32,
}

#[derive(Serialize)]
struct GoalLine {
    id: String,
    title: String,
    current: u32,
    target: u32,
    completed: bool,
}

pub fn run(action: ProgressAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        ProgressAction::Show { date } => {
            let today = parse_date(date.as_deref())?;
            let record = session.refresh_streaks(today);
            let summary = Summary {
                learner: record.local_id.clone(),
                remote_id: record.remote_id.clone(),
                name: record.display_name.clone(),
                xp: record.xp(),
                level: record.level(),
                lessons_completed: record.completed_lesson_ids.len(),
                total_lessons: session.total_lessons(),
                completion_percent: session.completion_percent(),
                homeworks: record.submitted_homeworks.len(),
                best_streak: record.best_streak(),
                habits: record
                    .habits
                    .iter()
                    .map(|h| HabitLine {
                        id: h.id.clone(),
                        title: h.title.clone(),
                        streak: h.streak(),
                    })
                    .collect(),
                goals: record
                    .goals
                    .iter()
                    .map(|g| GoalLine {
                        id: g.id.clone(),
                        title: g.title.clone(),
                        current: g.current_value(),
                        target: g.target_value(),
                        completed: g.is_completed(),
                    })
                    .collect(),
            };
            if json {
                return print_json(&summary);
            }
            print_summary(&summary);
        }
        ProgressAction::Name { name } => {
            session.set_display_name(&name);
            println!("display name set to {name}");
        }
        ProgressAction::Leaderboard => {
            let board = session.leaderboard();
            if json {
                return print_json(&board);
            }
            if board.is_empty() {
                println!("leaderboard is empty; run `questline-cli sync run`");
            }
            for (rank, profile) in board.iter().enumerate() {
                println!("{:>3}. {:<24} {:>7} XP  level {}", rank + 1, profile.name, profile.xp, profile.level);
            }
        }
        ProgressAction::Reset { yes } => {
            if !yes {
                return Err("refusing to reset without --yes".into());
            }
            let record = session.admin_reset();
            if json {
                return print_json(&record);
            }
            println!("progress reset for {}", record.local_id);
        }
    }
    Ok(())
}

fn print_summary(s: &Summary) {
    let name = if s.name.is_empty() { "(anonymous)" } else { s.name.as_str() };
    println!("{name} [{}]", s.learner);
    println!("  XP:         {} (level {})", s.xp, s.level);
    println!(
        "  Lessons:    {}/{} ({}%)",
        s.lessons_completed, s.total_lessons, s.completion_percent
    );
    println!("  Homeworks:  {}", s.homeworks);
    println!("  Best streak: {} days", s.best_streak);
    if !s.habits.is_empty() {
        println!("  Habits:");
        for h in &s.habits {
            println!("    {} {} (streak {})", h.id, h.title, h.streak);
        }
    }
    if !s.goals.is_empty() {
        println!("  Goals:");
        for g in &s.goals {
            let mark = if g.completed { "x" } else { " " };
            println!("    [{mark}] {} {} {}/{}", g.id, g.title, g.current, g.target);
        }
    }
}
