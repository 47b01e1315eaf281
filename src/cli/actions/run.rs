use crate::cli::actions::{account, reports, rewards, Action};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::SignIn { email, password } => account::sign_in(globals, &email, &password).await,
        Action::SignUp {
            email,
            password,
            details,
        } => account::sign_up(globals, &email, &password, &details).await,
        Action::SignOut => account::sign_out(globals).await,
        Action::WhoAmI => account::who_am_i(globals).await,
        Action::UpdateProfile(update) => account::update_profile(globals, update).await,
        Action::ListReports { limit } => reports::list(globals, limit).await,
        Action::SubmitReport(draft) => reports::submit(globals, draft).await,
        Action::ListRewards => rewards::list(globals).await,
        Action::Redeem { reward_id } => rewards::redeem(globals, reward_id).await,
        Action::AdminReports { limit } => reports::admin(globals, limit).await,
    }
}
