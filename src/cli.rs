use crate::cache::DEFAULT_REFRESH_INTERVAL;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "k4a",
    version,
    about = "A terminal dashboard for Kafka topics, schemas and connectors managed through kafkactl."
)]
pub struct CliArgs {
    /// Cache freshness window and auto-refresh period in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_INTERVAL.as_secs())]
    pub refresh_secs: u64,

    /// Write a debug log to ~/.local/k4a/debug.log
    #[arg(long)]
    pub debug: bool,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// kafkactl executable, optionally with leading arguments
    #[arg(long, default_value = "kafkactl")]
    pub kafkactl: String,

    /// Switch to this context before starting
    #[arg(short, long)]
    pub context: Option<String>,

    /// kafkactl config file (defaults to $KAFKACTL_CONFIG, then ~/.kafkactl/config.yml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cache directory (defaults to ~/.local/k4a/cache)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Always call kafkactl, never read or write the disk cache
    #[arg(long)]
    pub no_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_match_ten_minute_window() {
        let args = CliArgs::parse_from(["k4a"]);
        assert_eq!(args.refresh_secs, 600);
        assert_eq!(args.kafkactl, "kafkactl");
        assert!(!args.debug);
        assert!(!args.no_cache);
    }

    #[test]
    fn parses_context_and_debug() {
        let args = CliArgs::parse_from(["k4a", "--debug", "-c", "prod", "--refresh-secs", "30"]);
        assert!(args.debug);
        assert_eq!(args.context.as_deref(), Some("prod"));
        assert_eq!(args.refresh_secs, 30);
    }
}
