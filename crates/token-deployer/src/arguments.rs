use {
    semver::Version,
    std::{
        fmt::{self, Display, Formatter},
        net::SocketAddr,
        num::{NonZeroU64, ParseIntError},
        path::PathBuf,
        time::Duration,
    },
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// The Ethereum node URL the token gets deployed through.
    #[clap(long, env, default_value = "http://localhost:9636")]
    pub rpc_url: Url,

    /// Chain id the deployment transaction is signed for.
    #[clap(long, env, default_value = "9636")]
    pub chain_id: u64,

    /// Hex encoded private key of the deployer account. Not validated on
    /// startup: an unusable key only fails the first deployment.
    #[clap(long, env, default_value = "", hide_env_values = true)]
    pub private_key: String,

    /// Wallet paying for gas. Informational only, it ends up in the
    /// deployment record.
    #[clap(long, env, default_value = "")]
    pub gas_wallet: String,

    /// Seconds between two heartbeat log lines.
    #[clap(long, env, default_value = "10", value_parser = duration_from_seconds)]
    pub heartbeat_interval: Duration,

    #[clap(long, env, default_value = "0.0.0.0:10000")]
    pub bind_address: SocketAddr,

    /// JSON file the last deployment is recorded in.
    #[clap(long, env, default_value = "deployed_address.json")]
    pub deployment_file: PathBuf,

    /// Directory `index.html` is served from.
    #[clap(long, env, default_value = ".")]
    pub static_dir: PathBuf,

    /// Solc version used to compile the token. Installed on startup when
    /// missing.
    #[clap(long, env, default_value = "0.8.21")]
    pub solc_version: Version,

    /// How long to wait for the deployment transaction to be mined.
    #[clap(long, env, default_value = "2m", value_parser = humantime::parse_duration)]
    pub receipt_timeout: Duration,

    /// How often the node is polled for the deployment receipt.
    #[clap(long, env, default_value = "1s", value_parser = humantime::parse_duration)]
    pub receipt_poll_interval: Duration,
}

#[derive(clap::Parser)]
#[group(skip)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,token_deployer=debug,contracts=debug,observe=info")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false")]
    pub use_json_logs: bool,
}

fn duration_from_seconds(s: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_secs(s.parse::<NonZeroU64>()?.get()))
}

pub fn display_secret(f: &mut Formatter<'_>, name: &str, secret: &str) -> fmt::Result {
    let value = if secret.is_empty() { "" } else { "SECRET" };
    writeln!(f, "{name}: {value}")
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            rpc_url,
            chain_id,
            private_key,
            gas_wallet,
            heartbeat_interval,
            bind_address,
            deployment_file,
            static_dir,
            solc_version,
            receipt_timeout,
            receipt_poll_interval,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "rpc_url: {rpc_url}")?;
        writeln!(f, "chain_id: {chain_id}")?;
        display_secret(f, "private_key", private_key)?;
        writeln!(f, "gas_wallet: {gas_wallet}")?;
        writeln!(f, "heartbeat_interval: {heartbeat_interval:?}")?;
        writeln!(f, "bind_address: {bind_address}")?;
        writeln!(f, "deployment_file: {}", deployment_file.display())?;
        writeln!(f, "static_dir: {}", static_dir.display())?;
        writeln!(f, "solc_version: {solc_version}")?;
        writeln!(f, "receipt_timeout: {receipt_timeout:?}")?;
        writeln!(f, "receipt_poll_interval: {receipt_poll_interval:?}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[test]
    fn defaults_match_local_node() {
        let args = Arguments::try_parse_from(["token-deployer"]).unwrap();

        assert_eq!(args.rpc_url.as_str(), "http://localhost:9636/");
        assert_eq!(args.chain_id, 9636);
        assert_eq!(args.private_key, "");
        assert_eq!(args.gas_wallet, "");
        assert_eq!(args.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(args.deployment_file, PathBuf::from("deployed_address.json"));
        assert_eq!(args.solc_version, Version::new(0, 8, 21));
    }

    #[test]
    fn heartbeat_interval_is_in_seconds() {
        let args =
            Arguments::try_parse_from(["token-deployer", "--heartbeat-interval", "3"]).unwrap();
        assert_eq!(args.heartbeat_interval, Duration::from_secs(3));

        assert!(
            Arguments::try_parse_from(["token-deployer", "--heartbeat-interval", "3s"]).is_err()
        );
        assert!(
            Arguments::try_parse_from(["token-deployer", "--heartbeat-interval", "0"]).is_err()
        );
    }

    #[test]
    fn display_hides_private_key() {
        let args = Arguments::try_parse_from([
            "token-deployer",
            "--private-key",
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        ])
        .unwrap();

        let displayed = args.to_string();
        assert!(displayed.contains("private_key: SECRET"));
        assert!(!displayed.contains("4c0883a6"));
    }
}
