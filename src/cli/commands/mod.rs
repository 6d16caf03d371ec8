pub mod claims;
pub mod cookies;
pub mod logging;
pub mod oidc;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DOMAIN: &str = "domain";

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

    let command = Command::new("gatehouse")
        .about("OIDC authentication gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEHOUSE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DOMAIN)
                .short('d')
                .long(ARG_DOMAIN)
                .help("Public domain of the gateway, used for the callback URL and cookies")
                .env("GATEHOUSE_DOMAIN"),
        );

    let command = oidc::with_args(command);
    let command = cookies::with_args(command);
    let command = claims::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata() {
        let command = new();
        assert_eq!(command.get_name(), "gatehouse");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("OIDC authentication gateway".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn port_default_and_override() {
        temp_env::with_vars([("GATEHOUSE_PORT", None::<&str>)], || {
            let matches = new().get_matches_from(["gatehouse"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));

            let matches = new().get_matches_from(["gatehouse", "-p", "9090"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));
        });
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = new().try_get_matches_from(["gatehouse", "--port", "http"]);
        assert!(result.is_err());
    }

    #[test]
    fn domain_from_env() {
        temp_env::with_vars([("GATEHOUSE_DOMAIN", Some("gatehouse.dev"))], || {
            let matches = new().get_matches_from(["gatehouse"]);
            assert_eq!(
                matches.get_one::<String>(ARG_DOMAIN).map(String::as_str),
                Some("gatehouse.dev")
            );
        });
    }
}
