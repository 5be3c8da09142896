use clap::Subcommand;
use questline_core::LearnerSession;

use super::{print_action, print_json, CommandResult};

#[derive(Subcommand)]
pub enum HomeworkAction {
    /// Submit an answer for a lesson's homework
    Submit {
        lesson_id: String,
        /// Answer text
        answer: String,
    },
    /// List submitted homeworks
    List,
}

pub fn run(action: HomeworkAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        HomeworkAction::Submit { lesson_id, answer } => {
            if answer.trim().is_empty() {
                return Err("answer must not be empty".into());
            }
            let result = session.submit_homework(&lesson_id, &answer);
            print_action(&result, json)?;
        }
        HomeworkAction::List => {
            let submissions = session.progress().submitted_homeworks;
            if json {
                return print_json(&submissions);
            }
            for hw in &submissions {
                let grade = hw.grade.as_deref().unwrap_or("-");
                println!(
                    "{} {} {} grade {grade}",
                    hw.id,
                    hw.lesson_id,
                    hw.submitted_at.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}
