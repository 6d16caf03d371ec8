use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_CLAIMS_CONFIG_PATH: &str = "claims-config-path";
pub const ARG_USER_SCHEMA_PATH: &str = "user-schema-path";

#[derive(Debug, Default)]
pub struct Options {
    pub claims_config_path: Option<PathBuf>,
    pub user_schema_path: Option<PathBuf>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let path = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        Self {
            claims_config_path: path(ARG_CLAIMS_CONFIG_PATH),
            user_schema_path: path(ARG_USER_SCHEMA_PATH),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLAIMS_CONFIG_PATH)
                .long(ARG_CLAIMS_CONFIG_PATH)
                .help("JSON claims document: callback redirect, forwarded headers, authorization checks")
                .env("GATEHOUSE_CLAIMS_CONFIG_PATH"),
        )
        .arg(
            Arg::new(ARG_USER_SCHEMA_PATH)
                .long(ARG_USER_SCHEMA_PATH)
                .help("JSON document listing the fields /user-info must return")
                .env("GATEHOUSE_USER_SCHEMA_PATH"),
        )
}
