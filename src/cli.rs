use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "remit-core")]
#[command(about = "Money transfer and withdrawal processing service", long_about = None)]
pub struct Cli {
    /// Port number on which the server should run. Overrides SERVER_PORT.
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Number of workers handling transfer transactions simultaneously
    #[arg(long, short = 't', default_value_t = 10)]
    pub transfer_workers: usize,

    /// Number of workers handling withdrawal transactions simultaneously
    #[arg(long, short = 'w', default_value_t = 20)]
    pub withdrawal_workers: usize,

    /// Interval in milliseconds between stuck-transaction recovery scans
    #[arg(long, short = 'r', default_value_t = 60_000)]
    pub recovery_interval_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["remit-core"]);
        assert_eq!(cli.port, None);
        assert_eq!(cli.transfer_workers, 10);
        assert_eq!(cli.withdrawal_workers, 20);
        assert_eq!(cli.recovery_interval_ms, 60_000);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["remit-core", "-p", "9000", "-t", "2", "-w", "4", "-r", "500"]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.transfer_workers, 2);
        assert_eq!(cli.withdrawal_workers, 4);
        assert_eq!(cli.recovery_interval_ms, 500);
    }
}
