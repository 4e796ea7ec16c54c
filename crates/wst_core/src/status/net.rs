//! Network throughput from `netstat -ibn`.
//!
//! Rates need the previous sample, so the poller threads an explicit
//! `NetState` through every call instead of keeping counters in globals:
//!
//! ```text
//! state0 = NetState::default()
//! (rates1, state1) = poll(state0, sample1)   // rates1 empty: nothing to diff
//! (rates2, state2) = poll(state1, sample2)
//! ```

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;

use super::{StatusError, StatusResult};
use crate::process::{exit_code, CommandLine};

/// Cumulative byte counters for one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One reading of every interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSample {
    pub at: Instant,
    pub interfaces: BTreeMap<String, Counters>,
}

/// What the next poll needs from the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetState {
    last: Option<NetSample>,
}

impl NetState {
    pub fn last(&self) -> Option<&NetSample> {
        self.last.as_ref()
    }
}

/// Bytes per second for one interface between two samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub interface: String,
    pub rx_per_sec: f64,
    pub tx_per_sec: f64,
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in {} out {}",
            self.interface,
            human_rate(self.rx_per_sec),
            human_rate(self.tx_per_sec)
        )
    }
}

/// Fold `sample` into `state` and return the rates since the last poll.
///
/// Interfaces that appeared since the last sample have no rate yet. A
/// counter that went backwards (interface reset) counts as zero traffic.
pub fn poll(state: NetState, sample: NetSample) -> (Vec<Rate>, NetState) {
    let rates = match &state.last {
        Some(prev) => {
            let secs = sample.at.saturating_duration_since(prev.at).as_secs_f64();
            if secs > 0.0 {
                sample
                    .interfaces
                    .iter()
                    .filter_map(|(name, now)| {
                        let before = prev.interfaces.get(name)?;
                        Some(Rate {
                            interface: name.clone(),
                            rx_per_sec: now.rx_bytes.saturating_sub(before.rx_bytes) as f64 / secs,
                            tx_per_sec: now.tx_bytes.saturating_sub(before.tx_bytes) as f64 / secs,
                        })
                    })
                    .collect()
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };

    (rates, NetState { last: Some(sample) })
}

/// Parse `netstat -ibn` output taken at `at`.
///
/// Only link-level rows (`<Link#N>`) are counted so each interface shows up
/// once. Rows may omit the address column, so byte columns are located from
/// the right-hand end of the header.
pub fn parse_netstat(output: &str, at: Instant) -> StatusResult<NetSample> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| StatusError::Parse("empty netstat output".to_string()))?
        .split_whitespace()
        .collect();

    let from_end = |column: &str| {
        header
            .iter()
            .position(|h| *h == column)
            .map(|i| header.len() - i)
            .ok_or_else(|| StatusError::Parse(format!("netstat header has no {} column", column)))
    };
    let ibytes = from_end("Ibytes")?;
    let obytes = from_end("Obytes")?;

    let mut interfaces = BTreeMap::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let is_link = fields.get(2).is_some_and(|n| n.starts_with("<Link"));
        if !is_link || fields.len() < ibytes.max(obytes) {
            continue;
        }

        let read = |offset: usize| fields[fields.len() - offset].parse::<u64>().ok();
        match (read(ibytes), read(obytes)) {
            (Some(rx_bytes), Some(tx_bytes)) => {
                interfaces.insert(fields[0].to_string(), Counters { rx_bytes, tx_bytes });
            }
            _ => tracing::debug!("Skipping unparsable netstat row: {}", line),
        }
    }

    Ok(NetSample { at, interfaces })
}

/// Run `netstat -ibn` once.
pub fn sample() -> StatusResult<NetSample> {
    let cmd = CommandLine::new("netstat").arg("-ibn");
    let output = cmd
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|source| StatusError::Spawn {
            command: cmd.to_string(),
            source,
        })?;
    let at = Instant::now();

    if !output.status.success() {
        return Err(StatusError::CommandFailed {
            command: cmd.to_string(),
            code: exit_code(output.status),
        });
    }
    parse_netstat(&String::from_utf8_lossy(&output.stdout), at)
}

/// `1.5M/s` style rate.
pub fn human_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0}{}/s", value, UNITS[unit])
    } else {
        format!("{:.1}{}/s", value, UNITS[unit])
    }
}
