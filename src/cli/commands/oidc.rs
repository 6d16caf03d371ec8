use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_OIDC_ISSUER: &str = "oidc-issuer";
pub const ARG_OIDC_CLIENT_ID: &str = "oidc-client-id";
pub const ARG_OIDC_CLIENT_SECRET: &str = "oidc-client-secret";

#[derive(Debug)]
pub struct Options {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Options {
    /// # Errors
    /// Returns an error naming the first missing argument.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            issuer: required(ARG_OIDC_ISSUER)?,
            client_id: required(ARG_OIDC_CLIENT_ID)?,
            client_secret: SecretString::from(required(ARG_OIDC_CLIENT_SECRET)?),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OIDC_ISSUER)
                .long(ARG_OIDC_ISSUER)
                .help("OIDC issuer host, e.g. auth.example.com (https:// is implied)")
                .env("GATEHOUSE_OIDC_ISSUER"),
        )
        .arg(
            Arg::new(ARG_OIDC_CLIENT_ID)
                .long(ARG_OIDC_CLIENT_ID)
                .help("OIDC client id")
                .env("GATEHOUSE_OIDC_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_OIDC_CLIENT_SECRET)
                .long(ARG_OIDC_CLIENT_SECRET)
                .help("OIDC client secret")
                .env("GATEHOUSE_OIDC_CLIENT_SECRET")
                .hide_env_values(true),
        )
}
