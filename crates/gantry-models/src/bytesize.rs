// SPDX-License-Identifier: MIT OR Apache-2.0
//! Human-readable byte sizes as printed by the engine (`7.77GB`,
//! `1.2MiB`, `56kB`, `0B`).

use gantry_error::{Error, Result};

/// Parse a human byte size into bytes.
///
/// Decimal units (`kB`, `MB`, …) are powers of 1000, binary units (`KiB`,
/// `MiB`, …) powers of 1024, matching how the engine prints them. A bare
/// number means bytes.
pub fn parse_byte_size(text: &str) -> Result<u64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("empty byte size".to_string()));
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number_part, unit_part) = text.split_at(split);
    let number: f64 = number_part
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid byte size {text:?}")))?;

    let multiplier: f64 = match unit_part.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1e3,
        "m" | "mb" => 1e6,
        "g" | "gb" => 1e9,
        "t" | "tb" => 1e12,
        "p" | "pb" => 1e15,
        "ki" | "kib" => 1024.0,
        "mi" | "mib" => 1024.0 * 1024.0,
        "gi" | "gib" => 1024.0 * 1024.0 * 1024.0,
        "ti" | "tib" => 1024.0f64.powi(4),
        "pi" | "pib" => 1024.0f64.powi(5),
        other => {
            return Err(Error::InvalidInput(format!(
                "unknown byte size unit {other:?} in {text:?}"
            )));
        }
    };

    Ok((number * multiplier).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_bytes() {
        assert_eq!(parse_byte_size("512").unwrap(), 512);
    }

    #[test]
    fn zero_bytes() {
        assert_eq!(parse_byte_size("0B").unwrap(), 0);
    }

    #[test]
    fn decimal_units_are_powers_of_1000() {
        assert_eq!(parse_byte_size("56kB").unwrap(), 56_000);
        assert_eq!(parse_byte_size("1.5MB").unwrap(), 1_500_000);
        assert_eq!(parse_byte_size("7.77GB").unwrap(), 7_770_000_000);
    }

    #[test]
    fn binary_units_are_powers_of_1024() {
        assert_eq!(parse_byte_size("1KiB").unwrap(), 1024);
        assert_eq!(parse_byte_size("1.2MiB").unwrap(), 1_258_291);
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_eq!(parse_byte_size("  11.2MB ").unwrap(), 11_200_000);
    }

    #[test]
    fn case_is_ignored() {
        assert_eq!(parse_byte_size("1gb").unwrap(), 1_000_000_000);
        assert_eq!(parse_byte_size("1GiB").unwrap(), 1_073_741_824);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_byte_size("eleven").is_err());
        assert!(parse_byte_size("1XB").is_err());
        assert!(parse_byte_size("").is_err());
    }
}
