use clap::Subcommand;
use questline_core::LearnerSession;

use super::{print_action, CommandResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Set a personal goal with a numeric target
    Add {
        title: String,
        #[arg(long, default_value_t = 1)]
        target: u32,
    },
    /// Move a goal's progress by DELTA (negative to step back)
    Advance {
        goal_id: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        delta: i64,
    },
}

pub fn run(action: GoalAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        GoalAction::Add { title, target } => {
            let id = session.add_goal(&title, target);
            if json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("goal added: {id}");
            }
        }
        GoalAction::Advance { goal_id, delta } => {
            let result = session.advance_goal(&goal_id, delta)?;
            print_action(&result, json)?;
            if !json {
                if let Some(goal) = session.progress().goal(&goal_id) {
                    println!("{}: {}/{}", goal.title, goal.current_value(), goal.target_value());
                }
            }
        }
    }
    Ok(())
}
