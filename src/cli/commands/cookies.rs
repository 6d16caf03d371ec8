use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::cookies::{
    CookieNames, DEFAULT_ACCESS_TOKEN, DEFAULT_CODE_VERIFIER, DEFAULT_ID_TOKEN, DEFAULT_NONCE,
    DEFAULT_REFRESH_TOKEN, DEFAULT_STATE,
};

pub const ARG_COOKIE_SECRET: &str = "cookie-secret";
pub const ARG_COOKIE_CODE_VERIFIER: &str = "cookie-code-verifier";
pub const ARG_COOKIE_NONCE: &str = "cookie-nonce";
pub const ARG_COOKIE_STATE: &str = "cookie-state";
pub const ARG_COOKIE_ID_TOKEN: &str = "cookie-id-token";
pub const ARG_COOKIE_ACCESS_TOKEN: &str = "cookie-access-token";
pub const ARG_COOKIE_REFRESH_TOKEN: &str = "cookie-refresh-token";

/// (argument id, env var, default, help)
const NAME_ARGS: [(&str, &str, &str, &str); 6] = [
    (
        ARG_COOKIE_CODE_VERIFIER,
        "GATEHOUSE_COOKIE_CODE_VERIFIER",
        DEFAULT_CODE_VERIFIER,
        "Cookie holding the PKCE code verifier",
    ),
    (
        ARG_COOKIE_NONCE,
        "GATEHOUSE_COOKIE_NONCE",
        DEFAULT_NONCE,
        "Cookie holding the login nonce",
    ),
    (
        ARG_COOKIE_STATE,
        "GATEHOUSE_COOKIE_STATE",
        DEFAULT_STATE,
        "Cookie holding the login state",
    ),
    (
        ARG_COOKIE_ID_TOKEN,
        "GATEHOUSE_COOKIE_ID_TOKEN",
        DEFAULT_ID_TOKEN,
        "Cookie holding the ID token",
    ),
    (
        ARG_COOKIE_ACCESS_TOKEN,
        "GATEHOUSE_COOKIE_ACCESS_TOKEN",
        DEFAULT_ACCESS_TOKEN,
        "Cookie holding the access token",
    ),
    (
        ARG_COOKIE_REFRESH_TOKEN,
        "GATEHOUSE_COOKIE_REFRESH_TOKEN",
        DEFAULT_REFRESH_TOKEN,
        "Cookie holding the refresh token",
    ),
];

#[derive(Debug)]
pub struct Options {
    /// Signing key for the flow cookies; random per process when unset.
    pub secret: Option<SecretString>,
    pub names: CookieNames,
}

impl Options {
    /// # Errors
    /// Returns an error if a cookie name is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let name = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("cookie name --{id} must not be empty"))
        };

        Ok(Self {
            secret: matches
                .get_one::<String>(ARG_COOKIE_SECRET)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.clone())),
            names: CookieNames {
                code_verifier: name(ARG_COOKIE_CODE_VERIFIER)?,
                nonce: name(ARG_COOKIE_NONCE)?,
                state: name(ARG_COOKIE_STATE)?,
                id_token: name(ARG_COOKIE_ID_TOKEN)?,
                access_token: name(ARG_COOKIE_ACCESS_TOKEN)?,
                refresh_token: name(ARG_COOKIE_REFRESH_TOKEN)?,
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command.arg(
        Arg::new(ARG_COOKIE_SECRET)
            .long(ARG_COOKIE_SECRET)
            .help("Key used to sign the login flow cookies (default: random per process)")
            .env("GATEHOUSE_COOKIE_SECRET")
            .hide_env_values(true),
    );

    NAME_ARGS
        .into_iter()
        .fold(command, |command, (id, env, default, help)| {
            command.arg(
                Arg::new(id)
                    .long(id)
                    .help(help)
                    .env(env)
                    .default_value(default),
            )
        })
}
