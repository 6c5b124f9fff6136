use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names accepted through `AFFILIATE_LOG_LEVEL`, by verbosity count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a verbosity count (`0..=5`) or a level name, case-insensitive.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        if let Ok(count) = level.parse::<u8>() {
            return if count <= 5 {
                Ok(count)
            } else {
                Err(format!("verbosity {count} is above 5"))
            };
        }

        let level = level.to_lowercase();
        LEVELS
            .iter()
            .position(|name| *name == level)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level '{level}', expected one of {LEVELS:?}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log probe, policy and alert events: -v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE (default: ERROR)")
            .env("AFFILIATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(level: &str) -> Result<u8, clap::Error> {
        Command::new("affiliate-auth")
            .arg(Arg::new("level").value_parser(validator_log_level()))
            .try_get_matches_from(["affiliate-auth", level])
            .map(|matches| matches.get_one::<u8>("level").copied().unwrap_or_default())
    }

    #[test]
    fn test_level_names_and_counts() {
        assert_eq!(parse("ERROR").ok(), Some(0));
        assert_eq!(parse("Debug").ok(), Some(3));
        assert_eq!(parse("5").ok(), Some(5));
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(parse("verbose").is_err());
        assert!(parse("6").is_err());
    }

    #[test]
    fn test_help_mentions_env() {
        let command = with_args(Command::new("affiliate-auth"));
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == ARG_VERBOSITY)
            .and_then(|arg| arg.get_help().map(ToString::to_string));
        assert!(help.is_some_and(|text| text.contains("alert")));
    }
}
