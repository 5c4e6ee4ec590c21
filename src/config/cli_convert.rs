//! CLI to Config conversion utilities

use crate::config::cli;
use crate::stats;
use anyhow::{Context, Result};
use std::path::Path;

/// Convert CLI PercentileMode to stats PercentileMode
pub fn convert_percentile_mode(mode: cli::PercentileMode) -> stats::PercentileMode {
    match mode {
        cli::PercentileMode::Nearest => stats::PercentileMode::Nearest,
        cli::PercentileMode::Legacy => stats::PercentileMode::Legacy,
    }
}

/// Append `default_port` to an address that has none
fn with_default_port(addr: &str, default_port: u16) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

/// Parse a comma-separated worker list
///
/// # Examples
///
/// ```
/// use datacrunch::config::cli_convert::parse_worker_list;
///
/// assert_eq!(
///     parse_worker_list("10.0.1.10, 10.0.1.11:7000", 9999),
///     vec!["10.0.1.10:9999".to_string(), "10.0.1.11:7000".to_string()]
/// );
/// ```
pub fn parse_worker_list(list: &str, default_port: u16) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(|addr| with_default_port(addr, default_port))
        .collect()
}

/// Read worker addresses from a file, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clients file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|addr| with_default_port(addr, default_port))
        .collect())
}

/// Worker addresses from whichever of --workers / --clients-file was given
pub fn worker_addresses(cli: &cli::Cli) -> Result<Vec<String>> {
    let addresses = if let Some(ref list) = cli.workers {
        parse_worker_list(list, cli.worker_port)
    } else if let Some(ref path) = cli.clients_file {
        read_clients_file(path, cli.worker_port)?
    } else {
        Vec::new()
    };

    if addresses.is_empty() {
        anyhow::bail!("No worker addresses specified");
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_convert_percentile_mode() {
        assert_eq!(
            convert_percentile_mode(cli::PercentileMode::Legacy),
            stats::PercentileMode::Legacy
        );
        assert_eq!(
            convert_percentile_mode(cli::PercentileMode::Nearest),
            stats::PercentileMode::Nearest
        );
    }

    #[test]
    fn test_parse_worker_list_skips_empty_entries() {
        assert_eq!(parse_worker_list("a,,b:1,", 5), vec!["a:5", "b:1"]);
    }

    #[test]
    fn test_read_clients_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# workers").unwrap();
        writeln!(file, "node1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  node2:7000  ").unwrap();

        let addresses = read_clients_file(file.path(), 9999).unwrap();
        assert_eq!(addresses, vec!["node1:9999", "node2:7000"]);
    }

    #[test]
    fn test_read_clients_file_missing() {
        assert!(read_clients_file(Path::new("/nonexistent/clients.txt"), 9999).is_err());
    }
}
