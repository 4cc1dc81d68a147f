use std::fmt;

/// Prices and payments are integer amounts denominated in the smallest
/// payment unit. There is no decimal subdivision: an item priced at 1500
/// costs exactly 1500 units.
pub type Units = i64;

/// Format an amount with digit grouping for display.
/// Example: 1500 -> "1,500", 1000000000000000 -> "1,000,000,000,000,000"
pub fn format_units(amount: Units) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// Parse a non-negative amount from user input.
/// Accepts plain digits with optional `,` or `_` group separators:
/// "1500", "1,500" and "1_500" all parse to 1500.
pub fn parse_units(input: &str) -> Result<Units, ParseUnitsError> {
    let input = input.trim();
    let mut amount: Units = 0;
    let mut saw_digit = false;

    for ch in input.chars() {
        match ch {
            '0'..='9' => {
                let digit = Units::from(ch as u8 - b'0');
                amount = amount
                    .checked_mul(10)
                    .and_then(|a| a.checked_add(digit))
                    .ok_or(ParseUnitsError::TooLarge)?;
                saw_digit = true;
            }
            ',' | '_' => {}
            _ => return Err(ParseUnitsError::InvalidFormat),
        }
    }

    if !saw_digit {
        return Err(ParseUnitsError::InvalidFormat);
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseUnitsError {
    InvalidFormat,
    TooLarge,
}

impl fmt::Display for ParseUnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseUnitsError::InvalidFormat => write!(f, "invalid amount format"),
            ParseUnitsError::TooLarge => write!(f, "amount too large"),
        }
    }
}

impl std::error::Error for ParseUnitsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(7), "7");
        assert_eq!(format_units(999), "999");
        assert_eq!(format_units(1500), "1,500");
        assert_eq!(format_units(1_000_000), "1,000,000");
        assert_eq!(format_units(1_000_000_000_000_000), "1,000,000,000,000,000");
        assert_eq!(format_units(-1500), "-1,500");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1500"), Ok(1500));
        assert_eq!(parse_units("1,500"), Ok(1500));
        assert_eq!(parse_units("1_500"), Ok(1500));
        assert_eq!(parse_units("0"), Ok(0));
        assert_eq!(parse_units("  42 "), Ok(42));
        assert_eq!(
            parse_units("1,000,000,000,000,000"),
            Ok(1_000_000_000_000_000)
        );
    }

    #[test]
    fn test_parse_units_invalid() {
        assert_eq!(parse_units(""), Err(ParseUnitsError::InvalidFormat));
        assert_eq!(parse_units(","), Err(ParseUnitsError::InvalidFormat));
        assert_eq!(parse_units("12.50"), Err(ParseUnitsError::InvalidFormat));
        assert_eq!(parse_units("-5"), Err(ParseUnitsError::InvalidFormat));
        assert_eq!(parse_units("abc"), Err(ParseUnitsError::InvalidFormat));
    }

    #[test]
    fn test_parse_units_overflow() {
        assert_eq!(
            parse_units("99999999999999999999"),
            Err(ParseUnitsError::TooLarge)
        );
    }
}
