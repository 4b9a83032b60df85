//! Prediction output formatting

/// Currency symbol prepended to every price
pub const CURRENCY_SYMBOL: &str = "$";

/// Format a price with two decimals and thousands separators.
///
/// The sign follows the symbol: `-1234.5` renders as `$-1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{CURRENCY_SYMBOL}{sign}{grouped}.{fraction}")
}

/// Success text shown alongside the formatted price
pub fn success_message(formatted: &str) -> String {
    format!("The predicted house price is: {formatted}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_amounts() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(5.0), "$5.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(24531.204), "$24,531.20");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(100000.0), "$100,000.00");
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(format_currency(-1234.5), "$-1,234.50");
        assert_eq!(format_currency(-12.0), "$-12.00");
    }

    #[test]
    fn test_success_message() {
        assert_eq!(
            success_message("$22.53"),
            "The predicted house price is: $22.53"
        );
    }
}
