use lsk_common::Money;

/// Split a gross payment into a platform fee and the counterparty's share.
///
/// The fee is `gross × fee_bps / 10_000`, rounded half-up to the nearest cent; the share is whatever remains.
/// Computing the share by subtraction (rather than rounding it independently) guarantees that
/// `fee + share == gross` for every input, with any rounding remainder landing in the platform fee.
pub fn split_platform_fee(gross: Money, fee_bps: u32) -> (Money, Money) {
    let fee_cents = (i128::from(gross.cents()) * i128::from(fee_bps) + 5_000) / 10_000;
    let fee = Money::from_cents(fee_cents as i64);
    (fee, gross - fee)
}
