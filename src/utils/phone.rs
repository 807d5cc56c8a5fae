/// Locale-dependent dialing rules. Supplied by configuration so the recovery
/// flow itself stays free of any hard-coded country assumptions.
#[derive(Debug, Clone)]
pub struct DialingPlan {
    country_code: String,
    trunk_prefix: String,
}

impl DialingPlan {
    pub fn new(country_code: impl Into<String>, trunk_prefix: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            trunk_prefix: trunk_prefix.into(),
        }
    }

    /// Normalizes a raw user-supplied number to a single international form.
    ///
    /// Pure function: strips whitespace and dashes, substitutes the local
    /// trunk prefix ("0909000111") with the configured country code
    /// ("+84909000111") and accepts already-international input as-is.
    /// Returns `None` for anything that cannot be a subscriber number.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if let Some(rest) = cleaned.strip_prefix('+') {
            if rest.len() >= 7 && rest.bytes().all(|b| b.is_ascii_digit()) {
                return Some(cleaned);
            }
            return None;
        }

        let rest = cleaned.strip_prefix(&self.trunk_prefix)?;
        if rest.len() >= 6 && rest.bytes().all(|b| b.is_ascii_digit()) {
            return Some(format!("{}{}", self.country_code, rest));
        }
        None
    }
}
