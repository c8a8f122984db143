//! Parsing helpers for OS tool output.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::MacAddress;

/// Six hex pairs joined by `:` or `-`.
static MAC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:[0-9a-f]{2}[:-]){5}[0-9a-f]{2}\b").expect("MAC token pattern is valid")
});

/// `DriverDesc    REG_SZ    <description>` as printed by `reg query`.
static DRIVER_DESC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*DriverDesc\s+REG_\w+\s+(.*?)\s*$").expect("DriverDesc pattern is valid")
});

/// Find the first MAC-shaped token in `text`.
pub fn first_mac_token(text: &str) -> Option<MacAddress> {
    MAC_TOKEN
        .find(text)
        .and_then(|m| MacAddress::normalize(m.as_str()).ok())
}

/// Find the MAC following a `link/ether` marker, as printed by `ip link show`.
///
/// Falls back to the first MAC-shaped token anywhere in the output.
pub fn link_ether_token(text: &str) -> Option<MacAddress> {
    text.lines()
        .find_map(|line| {
            let mut words = line.split_whitespace();
            while let Some(word) = words.next() {
                if word == "link/ether" || word == "ether" || word == "lladdr" {
                    return words.next().and_then(first_mac_token);
                }
            }
            None
        })
        .or_else(|| first_mac_token(text))
}

/// Split `getmac /v /fo list` output into per-adapter blocks.
///
/// Blocks are separated by one or more blank lines. Works with both `\n`
/// and `\r\n` line endings.
pub fn adapter_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

/// Extract the adapter description from `wmic nic ... get Name` output.
///
/// Returns `Ok(None)` when no adapter matched (no data rows) and `Err` with a
/// reason when the output doesn't look like a `Name` column at all.
pub fn wmic_name_column(text: &str) -> Result<Option<String>, String> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let Some(header) = lines.next() else {
        return Ok(None);
    };
    if !header.eq_ignore_ascii_case("Name") {
        return Err(format!("unexpected wmic header '{}'", header));
    }

    Ok(lines.next().map(str::to_string))
}

/// Subkey paths listed by `reg query <container>`.
///
/// Only direct children of `container` are returned, in listing order.
pub fn registry_subkeys(text: &str, container: &str) -> Vec<String> {
    let prefix = format!("{}\\", container.to_ascii_lowercase());
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            lower.starts_with(&prefix) && !line[prefix.len()..].contains('\\')
        })
        .map(str::to_string)
        .collect()
}

/// The `DriverDesc` value from `reg query <key> /v DriverDesc` output.
pub fn driver_desc(text: &str) -> Option<String> {
    DRIVER_DESC
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}
