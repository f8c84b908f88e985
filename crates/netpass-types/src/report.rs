//! Accounting reports from the access gateway.
//!
//! The gateway reports usage per credential as cumulative figures: total
//! octets in each direction and total elapsed seconds since session start.
//! Report kind is advisory, not a sequence number — the engine tolerates
//! arbitrary delay and reordering between Start, Update, and Stop.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, ClientId, VoucherCode};

/// The kind of accounting report. Exhaustive dispatch keeps the absorbing
/// Terminated state and idempotent Start handling statically checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Start,
    Update,
    Stop,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "START"),
            Self::Update => write!(f, "UPDATE"),
            Self::Stop => write!(f, "STOP"),
        }
    }
}

/// One usage report from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub kind: ReportKind,
    pub code: VoucherCode,
    /// Cumulative octets received from the client.
    pub input_octets: u64,
    /// Cumulative octets sent to the client.
    pub output_octets: u64,
    /// Cumulative session seconds.
    pub session_secs: u64,
    pub client: ClientId,
}

impl UsageReport {
    #[must_use]
    pub fn new(kind: ReportKind, code: VoucherCode, client: ClientId) -> Self {
        Self {
            kind,
            code,
            input_octets: 0,
            output_octets: 0,
            session_secs: 0,
            client,
        }
    }

    /// Builder-style usage figures, cumulative as the gateway reports them.
    #[must_use]
    pub fn with_usage(mut self, input_octets: u64, output_octets: u64, session_secs: u64) -> Self {
        self.input_octets = input_octets;
        self.output_octets = output_octets;
        self.session_secs = session_secs;
        self
    }

    #[must_use]
    pub fn total_octets(&self) -> u64 {
        self.input_octets + self.output_octets
    }

    /// Reported data converted to the plan's data unit (MB).
    #[must_use]
    pub fn data_used_mb(&self) -> Decimal {
        Decimal::from(self.total_octets()) / Decimal::from(constants::BYTES_PER_MB)
    }

    /// Reported time converted to the plan's time unit (minutes).
    #[must_use]
    pub fn time_used_min(&self) -> Decimal {
        Decimal::from(self.session_secs) / Decimal::from(constants::SECS_PER_MIN)
    }
}

/// Acknowledgment returned to the gateway for every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountingAck {
    Success,
    Failed,
}

impl std::fmt::Display for AccountingAck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn client() -> ClientId {
        ClientId::new("AA:BB:CC:DD:EE:FF", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)))
    }

    #[test]
    fn octet_to_mb_conversion() {
        let report = UsageReport::new(ReportKind::Update, VoucherCode::new("AB12-CD34"), client())
            .with_usage(60 * 1024 * 1024, 40 * 1024 * 1024, 0);
        assert_eq!(report.total_octets(), 100 * 1024 * 1024);
        assert_eq!(report.data_used_mb(), Decimal::from(100u64));
    }

    #[test]
    fn seconds_to_minutes_conversion() {
        let report = UsageReport::new(ReportKind::Update, VoucherCode::new("AB12-CD34"), client())
            .with_usage(0, 0, 90);
        assert_eq!(report.time_used_min(), Decimal::new(15, 1)); // 1.5 min
    }

    #[test]
    fn report_serde_roundtrip() {
        let report = UsageReport::new(ReportKind::Stop, VoucherCode::new("AB12-CD34"), client())
            .with_usage(1, 2, 3);
        let json = serde_json::to_string(&report).unwrap();
        let back: UsageReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ReportKind::Stop);
        assert_eq!(back.total_octets(), 3);
        assert_eq!(back.session_secs, 3);
    }
}
