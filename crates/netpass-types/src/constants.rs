//! System-wide constants for the Netpass engine.

/// Alphabet for voucher codes: 36 symbols, no lowercase.
pub const CODE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Total symbols in a voucher code (excluding the group separator).
pub const CODE_LENGTH: usize = 8;

/// Symbols per rendered group (`XXXX-XXXX`).
pub const CODE_GROUP_LENGTH: usize = 4;

/// Generate-and-check attempts before issuance gives up.
/// At 36^8 combinations a collision is negligible per call, so hitting
/// this bound means the store itself is misbehaving.
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// Redemption window for payment-bound vouchers (hours).
pub const DEFAULT_REDEMPTION_WINDOW_HOURS: i64 = 24;

/// Expiry horizon for bulk-issued vouchers (days).
pub const DEFAULT_BULK_EXPIRY_DAYS: i64 = 30;

/// Default batch size for bulk issuance.
pub const DEFAULT_BULK_QUANTITY: usize = 10;

/// Octets per megabyte, the plan's data unit.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Seconds per minute, the plan's time unit.
pub const SECS_PER_MIN: u64 = 60;

/// Provider result code that signals a settled payment.
pub const PROVIDER_RESULT_SUCCESS: i64 = 0;

/// Metadata item name carrying the settled amount.
pub const METADATA_AMOUNT: &str = "Amount";

/// Metadata item name carrying the provider receipt code.
pub const METADATA_RECEIPT: &str = "ReceiptNumber";

/// Default currency for plans and transactions.
pub const DEFAULT_CURRENCY: &str = "KES";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Netpass";
