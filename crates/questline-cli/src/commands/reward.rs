use clap::Subcommand;
use questline_core::LearnerSession;

use super::{parse_date, print_action, CommandResult};

#[derive(Subcommand)]
pub enum RewardAction {
    /// Claim the reward for asking a question in a lesson
    Ask { lesson_id: String },
    /// Claim the daily reward for sharing a story
    Story {
        #[arg(long)]
        date: Option<String>,
    },
    /// Record a successful referral
    Referral,
}

pub fn run(action: RewardAction, session: &LearnerSession, json: bool) -> CommandResult {
    let result = match action {
        RewardAction::Ask { lesson_id } => session.ask_question(&lesson_id),
        RewardAction::Story { date } => session.share_story(parse_date(date.as_deref())?),
        RewardAction::Referral => session.record_referral(),
    };
    print_action(&result, json)
}
