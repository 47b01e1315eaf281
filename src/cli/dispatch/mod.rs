use crate::api::{ApiConfig, DEFAULT_TIMEOUT_SECS};
use crate::auth::types::{ProfileUpdate, Role, SignUpDetails};
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::reports::types::ReportDraft;
use crate::reports::{Coordinates, WasteType, RECENT_REPORTS_LIMIT};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn optional(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn limit(matches: &ArgMatches) -> usize {
    matches
        .get_one::<usize>("limit")
        .copied()
        .unwrap_or(RECENT_REPORTS_LIMIT)
}

/// # Errors
/// Returns an error if the API URL is missing or invalid.
pub fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let api_url = required(matches, "api-url")?;
    let api_key = required(matches, "api-key")?;
    let timeout = matches
        .get_one::<u64>("timeout")
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let api = ApiConfig::new(&api_url, SecretString::from(api_key))
        .context("invalid ECOCAMPUS_API_URL")?
        .with_timeout(Duration::from_secs(timeout));
    let session_file = matches.get_one::<String>("session-file").map(PathBuf::from);

    Ok(GlobalArgs::new(api, session_file))
}

fn report_draft(matches: &ArgMatches) -> Result<ReportDraft> {
    let coordinates = match (
        matches.get_one::<f64>("lat").copied(),
        matches.get_one::<f64>("lng").copied(),
    ) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        (None, None) => None,
        _ => return Err(anyhow!("--lat and --lng must be given together")),
    };

    Ok(ReportDraft {
        title: required(matches, "title")?,
        description: optional(matches, "description").unwrap_or_default(),
        waste_type: matches.get_one::<WasteType>("type").copied(),
        location_name: optional(matches, "location").unwrap_or_default(),
        coordinates,
        image_url: optional(matches, "image-url").unwrap_or_default(),
    })
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let sub_m = |subcommand: &str| -> Result<&ArgMatches> {
        matches
            .subcommand_matches(subcommand)
            .context("arguments not found")
    };

    match matches.subcommand_name() {
        Some("signin") => {
            let sub = sub_m("signin")?;
            Ok(Action::SignIn {
                email: required(sub, "email")?,
                password: SecretString::from(required(sub, "password")?),
            })
        }
        Some("signup") => {
            let sub = sub_m("signup")?;
            let mut details = SignUpDetails::new(required(sub, "name")?)
                .with_role(sub.get_one::<Role>("role").copied().unwrap_or_default());
            if let Some(student_id) = optional(sub, "student-id") {
                details = details.with_student_id(student_id);
            }
            Ok(Action::SignUp {
                email: required(sub, "email")?,
                password: SecretString::from(required(sub, "password")?),
                details,
            })
        }
        Some("signout") => Ok(Action::SignOut),
        Some("whoami") => Ok(Action::WhoAmI),
        Some("profile") => {
            let update = sub_m("profile")?
                .subcommand_matches("update")
                .context("missing profile subcommand")?;
            Ok(Action::UpdateProfile(ProfileUpdate {
                full_name: optional(update, "name"),
                student_id: optional(update, "student-id"),
                ..ProfileUpdate::default()
            }))
        }
        Some("reports") => match sub_m("reports")?.subcommand() {
            Some(("list", list)) => Ok(Action::ListReports { limit: limit(list) }),
            Some(("submit", submit)) => Ok(Action::SubmitReport(report_draft(submit)?)),
            _ => Err(anyhow!("missing reports subcommand")),
        },
        Some("rewards") => match sub_m("rewards")?.subcommand() {
            Some(("list", _)) => Ok(Action::ListRewards),
            Some(("redeem", redeem)) => Ok(Action::Redeem {
                reward_id: redeem
                    .get_one::<u32>("id")
                    .copied()
                    .context("missing reward id")?,
            }),
            _ => Err(anyhow!("missing rewards subcommand")),
        },
        Some("admin") => match sub_m("admin")?.subcommand() {
            Some(("reports", reports)) => Ok(Action::AdminReports {
                limit: limit(reports),
            }),
            _ => Err(anyhow!("missing admin subcommand")),
        },
        Some(other) => Err(anyhow!("unknown command: {other}")),
        None => Err(anyhow!("no command given")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn matches(extra: &[&str]) -> ArgMatches {
        let args = ["ecocampus", "--api-url", "https://project.supabase.co", "--api-key", "anon"]
            .iter()
            .chain(extra);
        commands::new().get_matches_from(args)
    }

    #[test]
    fn test_globals() -> Result<()> {
        let globals = temp_env::with_vars(
            [
                ("ECOCAMPUS_SESSION_FILE", None::<&str>),
                ("ECOCAMPUS_TIMEOUT", None::<&str>),
                ("HOME", Some("/home/ada")),
            ],
            || globals(&matches(&["whoami", "--timeout", "4"])),
        )?;
        assert_eq!(globals.api.timeout, Duration::from_secs(4));
        assert_eq!(globals.api.api_key.expose_secret(), "anon");
        assert_eq!(
            globals.session_file,
            PathBuf::from("/home/ada/.ecocampus/session.json")
        );
        Ok(())
    }

    #[test]
    fn test_signup_action() -> Result<()> {
        let action = handler(&matches(&[
            "signup",
            "--email",
            "new@campus.edu",
            "--password",
            "secret",
            "--name",
            "New Student",
            "--student-id",
            "S-42",
            "--role",
            "Recycler",
        ]))?;
        let Action::SignUp { email, details, .. } = action else {
            return Err(anyhow!("expected signup, got {action:?}"));
        };
        assert_eq!(email, "new@campus.edu");
        assert_eq!(
            details,
            SignUpDetails::new("New Student")
                .with_student_id("S-42")
                .with_role(Role::Recycler)
        );
        Ok(())
    }

    #[test]
    fn test_profile_update_keeps_unset_fields_empty() -> Result<()> {
        let action = handler(&matches(&["profile", "update", "--name", "Ada King"]))?;
        let Action::UpdateProfile(update) = action else {
            return Err(anyhow!("expected profile update, got {action:?}"));
        };
        assert_eq!(update.full_name.as_deref(), Some("Ada King"));
        assert_eq!(update.student_id, None);
        assert_eq!(update.points, None);
        Ok(())
    }

    #[test]
    fn test_submit_report_action() -> Result<()> {
        let action = handler(&matches(&[
            "reports",
            "submit",
            "--title",
            "Bottles",
            "--type",
            "plastic",
            "--location",
            "Gym",
            "--lat",
            "-33.9",
            "--lng",
            "18.4",
        ]))?;
        let Action::SubmitReport(draft) = action else {
            return Err(anyhow!("expected report submission, got {action:?}"));
        };
        assert_eq!(draft.waste_type, Some(WasteType::Plastic));
        assert_eq!(draft.location_name, "Gym");
        assert_eq!(
            draft.coordinates,
            Some(Coordinates {
                latitude: -33.9,
                longitude: 18.4
            })
        );
        assert!(draft.description.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_and_admin_limits() -> Result<()> {
        assert!(matches!(
            handler(&matches(&["reports", "list"]))?,
            Action::ListReports { limit: 10 }
        ));
        assert!(matches!(
            handler(&matches(&["admin", "reports", "--limit", "25"]))?,
            Action::AdminReports { limit: 25 }
        ));
        assert!(matches!(
            handler(&matches(&["rewards", "redeem", "3"]))?,
            Action::Redeem { reward_id: 3 }
        ));
        Ok(())
    }
}
