// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container stats lines (`container stats --format '{{json .}}'`).

use crate::bytesize::parse_byte_size;
use gantry_error::{Error, Result};
use serde::Deserialize;

/// Resource usage of one container at one sample instant. All byte
/// quantities are plain bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStats {
    /// Bytes read from block devices.
    pub block_read: u64,
    /// Bytes written to block devices.
    pub block_write: u64,
    /// CPU usage in percent.
    pub cpu_percentage: f64,
    /// Short container id.
    pub container: String,
    /// Full container id.
    pub container_id: String,
    /// Memory usage in percent of the limit.
    pub memory_percentage: f64,
    /// Memory in use.
    pub memory_used: u64,
    /// Memory limit.
    pub memory_limit: u64,
    /// Container name.
    pub container_name: String,
    /// Bytes sent on the network.
    pub net_upload: u64,
    /// Bytes received from the network.
    pub net_download: u64,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(rename = "BlockIO")]
    block_io: String,
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "Container")]
    container: String,
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "MemPerc")]
    mem_perc: String,
    #[serde(rename = "MemUsage")]
    mem_usage: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "NetIO")]
    net_io: String,
}

impl ContainerStats {
    /// Parse one `{{json .}}` stats line.
    pub fn parse(line: &str) -> Result<Self> {
        let raw: RawStats = serde_json::from_str(line)
            .map_err(|e| Error::parse_failure(format!("bad stats line: {e}"), line))?;
        let (block_read, block_write) = split_pair(&raw.block_io, line)?;
        let (memory_used, memory_limit) = split_pair(&raw.mem_usage, line)?;
        let (net_upload, net_download) = split_pair(&raw.net_io, line)?;
        Ok(Self {
            block_read,
            block_write,
            cpu_percentage: parse_percent(&raw.cpu_perc, line)?,
            container: raw.container,
            container_id: raw.id,
            memory_percentage: parse_percent(&raw.mem_perc, line)?,
            memory_used,
            memory_limit,
            container_name: raw.name,
            net_upload,
            net_download,
        })
    }

    /// Parse the whole stats output, one record per line.
    pub fn parse_lines(stdout: &str) -> Result<Vec<Self>> {
        stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Split an `"A / B"` quantity pair and parse both sides as byte sizes.
fn split_pair(text: &str, line: &str) -> Result<(u64, u64)> {
    let Some((left, right)) = text.split_once('/') else {
        return Err(Error::parse_failure(
            format!("expected an 'A / B' pair, got {text:?}"),
            line,
        ));
    };
    Ok((parse_byte_size(left)?, parse_byte_size(right)?))
}

fn parse_percent(text: &str, line: &str) -> Result<f64> {
    text.trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| Error::parse_failure(format!("bad percentage {text:?}"), line))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"{"BlockIO":"12.3MB / 4.5MB","CPUPerc":"0.08%","Container":"e90ae41a5b17","ID":"e90ae41a5b17df998584141692f1e361","MemPerc":"0.18%","MemUsage":"11.2MB / 6.233GB","Name":"crazy_northcutt","NetIO":"696B / 0B","PIDs":"4"}"#;

    #[test]
    fn parses_one_line() {
        let stats = ContainerStats::parse(LINE).unwrap();
        assert_eq!(stats.block_read, 12_300_000);
        assert_eq!(stats.block_write, 4_500_000);
        assert_eq!(stats.cpu_percentage, 0.08);
        assert_eq!(stats.memory_used, 11_200_000);
        assert_eq!(stats.memory_limit, 6_233_000_000);
        assert_eq!(stats.container_name, "crazy_northcutt");
        assert_eq!(stats.net_upload, 696);
        assert_eq!(stats.net_download, 0);
    }

    #[test]
    fn parses_multiple_lines_and_skips_blanks() {
        let text = format!("{LINE}\n\n{LINE}\n");
        let all = ContainerStats::parse_lines(&text).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn missing_pair_separator_is_an_error() {
        let bad = LINE.replace("696B / 0B", "696B");
        assert!(ContainerStats::parse(&bad).is_err());
    }
}
