use crate::auth::types::Role;
use crate::reports::WasteType;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use regex::Regex;
use tracing::Level;

pub const ARG_VERBOSE: &str = "verbose";

/// Levels in `-v` order; the count is the index, so no flag means errors only.
pub const LOG_LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email.trim()))
}

#[must_use]
pub fn validator_email() -> ValueParser {
    ValueParser::from(move |email: &str| -> std::result::Result<String, String> {
        if valid_email(email) {
            Ok(email.trim().to_lowercase())
        } else {
            Err("invalid email address".to_string())
        }
    })
}

/// `ECOCAMPUS_LOG_LEVEL` takes a level name or its `-v` count.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        let index = match level.trim().parse::<usize>() {
            Ok(count) => Some(count),
            Err(_) => level
                .parse::<Level>()
                .ok()
                .and_then(|level| LOG_LEVELS.iter().position(|known| *known == level)),
        };
        index
            .filter(|index| *index < LOG_LEVELS.len())
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level: {level}"))
    })
}

fn verbose_arg() -> Arg {
    Arg::new(ARG_VERBOSE)
        .short('v')
        .long("verbose")
        .help("Increase log output: -v warn, -vv info, -vvv debug, -vvvv trace")
        .env("ECOCAMPUS_LOG_LEVEL")
        .global(true)
        .action(ArgAction::Count)
        .value_parser(validator_log_level())
}

#[must_use]
pub fn validator_role() -> ValueParser {
    ValueParser::from(move |role: &str| role.parse::<Role>())
}

#[must_use]
pub fn validator_waste_type() -> ValueParser {
    ValueParser::from(move |kind: &str| kind.parse::<WasteType>())
}

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .required(true)
        .value_parser(validator_email())
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("ECOCAMPUS_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn account_commands() -> [Command; 5] {
    [
        Command::new("signin")
            .about("Sign in with email and password")
            .arg(email_arg())
            .arg(password_arg()),
        Command::new("signup")
            .about("Create a new account")
            .arg(email_arg())
            .arg(password_arg())
            .arg(
                Arg::new("name")
                    .short('n')
                    .long("name")
                    .help("Full name")
                    .required(true),
            )
            .arg(
                Arg::new("student-id")
                    .long("student-id")
                    .help("Student ID (optional)"),
            )
            .arg(
                Arg::new("role")
                    .long("role")
                    .help("Account role: student, staff, admin, recycler")
                    .default_value("student")
                    .value_parser(validator_role()),
            ),
        Command::new("signout").about("Sign out and forget the stored session"),
        Command::new("whoami").about("Show the signed-in profile"),
        Command::new("profile")
            .about("Manage your profile")
            .subcommand_required(true)
            .subcommand(
                Command::new("update")
                    .about("Update name or student ID")
                    .arg(Arg::new("name").short('n').long("name").help("Full name"))
                    .arg(
                        Arg::new("student-id")
                            .long("student-id")
                            .help("Student ID"),
                    ),
            ),
    ]
}

fn limit_arg() -> Arg {
    Arg::new("limit")
        .short('l')
        .long("limit")
        .help("Number of reports to show")
        .default_value("10")
        .value_parser(clap::value_parser!(usize))
}

fn reports_command() -> Command {
    Command::new("reports")
        .about("Waste reports")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("Show the most recent reports")
                .arg(limit_arg()),
        )
        .subcommand(
            Command::new("submit")
                .about("Report waste on campus")
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("Short title")
                        .required(true),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .help("Waste type: plastic|paper|glass|metal|organic|electronic|other")
                        .required(true)
                        .value_parser(validator_waste_type()),
                )
                .arg(
                    Arg::new("description")
                        .short('d')
                        .long("description")
                        .help("What did you see?"),
                )
                .arg(
                    Arg::new("location")
                        .long("location")
                        .help("Where on campus"),
                )
                .arg(
                    Arg::new("lat")
                        .long("lat")
                        .help("Latitude")
                        .requires("lng")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("lng")
                        .long("lng")
                        .help("Longitude")
                        .requires("lat")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("image-url")
                        .long("image-url")
                        .help("Link to a photo"),
                ),
        )
}

fn rewards_command() -> Command {
    Command::new("rewards")
        .about("Redeem points for campus rewards")
        .subcommand_required(true)
        .subcommand(Command::new("list").about("Show the reward catalog"))
        .subcommand(
            Command::new("redeem").about("Redeem a reward").arg(
                Arg::new("id")
                    .help("Reward id from `rewards list`")
                    .required(true)
                    .value_parser(clap::value_parser!(u32)),
            ),
        )
}

fn admin_command() -> Command {
    Command::new("admin")
        .about("Administration (admin role only)")
        .subcommand_required(true)
        .subcommand(
            Command::new("reports")
                .about("Review recent reports and their status")
                .arg(limit_arg()),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("ecocampus")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the hosted backend, example: https://project.supabase.co")
                .env("ECOCAMPUS_API_URL")
                .required(true),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("Public (anon) API key")
                .env("ECOCAMPUS_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("session-file")
                .long("session-file")
                .help("Session file kept between runs (default: $HOME/.ecocampus/session.json)")
                .env("ECOCAMPUS_SESSION_FILE")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("HTTP request timeout in seconds")
                .default_value("10")
                .env("ECOCAMPUS_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(verbose_arg())
        .subcommands(account_commands())
        .subcommand(reports_command())
        .subcommand(rewards_command())
        .subcommand(admin_command())
}
