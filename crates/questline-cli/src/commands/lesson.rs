use clap::Subcommand;
use questline_core::LearnerSession;

use super::{print_action, print_json, CommandResult};

#[derive(Subcommand)]
pub enum LessonAction {
    /// Mark a lesson complete (XP is awarded once per lesson)
    Complete { lesson_id: String },
    /// List cached course modules and their lessons
    List,
    /// Add a notebook entry, optionally attached to a lesson
    Note {
        text: String,
        #[arg(long)]
        lesson: Option<String>,
    },
}

pub fn run(action: LessonAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        LessonAction::Complete { lesson_id } => {
            let result = session.complete_lesson(&lesson_id);
            print_action(&result, json)?;
        }
        LessonAction::List => {
            let modules = session.modules();
            if json {
                return print_json(&modules);
            }
            if modules.is_empty() {
                println!("no modules cached; run `questline-cli sync run`");
            }
            let done = session.progress().completed_lesson_ids;
            for module in &modules {
                println!("{} {}", module.id, module.title);
                for lesson in module.lesson_ids() {
                    let mark = if done.contains(&lesson) { "x" } else { " " };
                    println!("  [{mark}] {lesson}");
                }
            }
        }
        LessonAction::Note { text, lesson } => {
            let id = session.add_note(lesson.as_deref(), &text);
            println!("note saved: {id}");
        }
    }
    Ok(())
}
