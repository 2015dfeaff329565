//! Presentation-side rounding and formatting for rupiah amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to the nearest whole currency unit, halves away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to the nearest multiple of `step` (e.g. 100 for price tags).
/// Non-positive steps fall back to whole units.
pub fn round_to_step(amount: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return round_currency(amount);
    }
    match amount.checked_div(step) {
        Some(steps) => {
            steps.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
        }
        None => round_currency(amount),
    }
}

/// `Rp 1.400`, `-Rp 25.000`.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = round_currency(amount);
    let digits = rounded.abs().trunc().to_string();
    let grouped = group_thousands(&digits);

    if rounded < Decimal::ZERO {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Percentage with at most two decimals: `40%`, `12.5%`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{rounded}%")
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let len = digits.len();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_currency(dec!(1399.5)), dec!(1400));
        assert_eq!(round_currency(dec!(1399.49)), dec!(1399));
        assert_eq!(round_currency(dec!(-2.5)), dec!(-3));
    }

    #[test]
    fn rounds_to_step() {
        assert_eq!(round_to_step(dec!(1349), dec!(100)), dec!(1300));
        assert_eq!(round_to_step(dec!(1350), dec!(100)), dec!(1400));
        assert_eq!(round_to_step(dec!(1350.4), dec!(0)), dec!(1350));
    }

    #[test]
    fn formats_rupiah() {
        assert_eq!(format_rupiah(dec!(0)), "Rp 0");
        assert_eq!(format_rupiah(dec!(999)), "Rp 999");
        assert_eq!(format_rupiah(dec!(1400)), "Rp 1.400");
        assert_eq!(format_rupiah(dec!(1333.3333)), "Rp 1.333");
        assert_eq!(format_rupiah(dec!(1250000)), "Rp 1.250.000");
        assert_eq!(format_rupiah(dec!(-25000)), "-Rp 25.000");
    }

    #[test]
    fn formats_percent() {
        assert_eq!(format_percent(dec!(40)), "40%");
        assert_eq!(format_percent(dec!(12.500)), "12.5%");
        assert_eq!(format_percent(dec!(33.3333)), "33.33%");
    }
}
