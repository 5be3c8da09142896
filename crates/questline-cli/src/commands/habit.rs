use clap::Subcommand;
use questline_core::LearnerSession;

use super::{parse_date, print_action, CommandResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Start tracking a daily habit
    Add { title: String },
    /// Tick or untick a habit for a day
    Toggle {
        habit_id: String,
        /// Day to toggle (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

pub fn run(action: HabitAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        HabitAction::Add { title } => {
            let id = session.add_habit(&title);
            if json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("habit added: {id}");
            }
        }
        HabitAction::Toggle { habit_id, date } => {
            let today = parse_date(None)?;
            let date = parse_date(date.as_deref())?;
            if date > today {
                return Err("cannot tick a habit in the future".into());
            }
            let result = session.toggle_habit(&habit_id, date, today)?;
            print_action(&result, json)?;
            if !json {
                if let Some(habit) = session.progress().habit(&habit_id) {
                    let state = if habit.is_done_on(date) { "done" } else { "not done" };
                    println!("{} on {date}: {state} (streak {})", habit.title, habit.streak());
                }
            }
        }
    }
    Ok(())
}
