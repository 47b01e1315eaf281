pub mod account;
pub mod console;
pub mod reports;
pub mod rewards;

mod run;

use crate::auth::types::{ProfileUpdate, SignUpDetails};
use crate::cli::globals::GlobalArgs;
use crate::reports::types::ReportDraft;
use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    SignIn {
        email: String,
        password: SecretString,
    },
    SignUp {
        email: String,
        password: SecretString,
        details: SignUpDetails,
    },
    SignOut,
    WhoAmI,
    UpdateProfile(ProfileUpdate),
    ListReports {
        limit: usize,
    },
    SubmitReport(ReportDraft),
    ListRewards,
    Redeem {
        reward_id: u32,
    },
    AdminReports {
        limit: usize,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails or the session does not pass its guard.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
