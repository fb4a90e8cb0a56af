/// Transient success status clears after this delay.
pub const SUCCESS_CLEAR_MS: u64 = 2000;
/// Transient error status clears after this delay.
pub const ERROR_CLEAR_MS: u64 = 3000;

/// Board-level status surfaced to the embedding UI on a watch channel.
/// `Success` and `Error` auto-clear back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoardStatus {
    #[default]
    Idle,
    Success,
    Error(String),
}
