use crate::cli::{actions::Action, commands, dispatch, globals::GlobalArgs, telemetry};
use anyhow::Result;

/// Zero keeps the subscriber default; higher counts saturate at trace.
fn get_verbosity_level(verbosity: u8) -> Option<tracing::Level> {
    match usize::from(verbosity) {
        0 => None,
        count => commands::LOG_LEVELS
            .get(count)
            .or_else(|| commands::LOG_LEVELS.last())
            .copied(),
    }
}

/// Parses the command line, initializes telemetry and returns the action to
/// run together with the connection settings.
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<(Action, GlobalArgs)> {
    let matches = commands::new().get_matches();

    let verbosity_level = get_verbosity_level(
        matches
            .get_one::<u8>(commands::ARG_VERBOSE)
            .copied()
            .unwrap_or(0),
    );

    telemetry::init(verbosity_level)?;

    let globals = dispatch::globals(&matches)?;
    let action = dispatch::handler(&matches)?;

    Ok((action, globals))
}
