use crate::error::ExtractError;

/// Parses a site-local price string into a float.
///
/// Both sites format prices with a dot as thousands separator and a comma
/// as decimal separator, optionally followed by currency text:
/// `"1.234,56 TL"` -> `1234.56`.
pub fn parse_price(raw: &str) -> Result<f64, ExtractError> {
    let numeric: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    // Split on the LAST comma: left is the integer part (dots are thousand
    // separators), right is the fraction.
    let (int_part, frac_part) = numeric.rsplit_once(',').ok_or_else(|| {
        ExtractError::MalformedPrice {
            raw: raw.to_string(),
            reason: "no decimal comma".to_string(),
        }
    })?;

    let joined = format!("{}.{}", int_part.replace('.', ""), frac_part);
    joined
        .parse::<f64>()
        .map_err(|e| ExtractError::MalformedPrice {
            raw: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_comma_decimal() {
        assert_eq!(parse_price("129,99").unwrap(), 129.99);
    }

    #[test]
    fn strips_thousands_separator_and_currency() {
        assert_eq!(parse_price("1.234,56 TL").unwrap(), 1234.56);
        assert_eq!(parse_price("12.345.678,90 TL").unwrap(), 12_345_678.90);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_price("  45,00 TL  ").unwrap(), 45.0);
    }

    #[test]
    fn rejects_string_without_comma() {
        assert!(matches!(
            parse_price("1299 TL"),
            Err(ExtractError::MalformedPrice { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_price("fiyat yok").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price(",").is_err());
    }
}
