use std::cmp::Ordering;

/// Dotted numeric version. Missing trailing components compare as zero.
#[derive(Debug, Clone)]
pub struct Version(Vec<u64>);

impl Version {
    /// Parse the leading digits of each dot-separated component, stopping at the
    /// first component without any (`6.8.0-45-generic` reads as `6.8.0`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_matches('"').trim_start_matches(['v', 'V']);
        let mut parts = Vec::new();
        for component in s.split('.') {
            let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse().ok()?);
            if digits.len() != component.len() {
                break;
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn trailing_zeros_are_equal() {
        assert_eq!(v("10.0"), v("10.0.0"));
    }

    #[test]
    fn numeric_not_lexical_ordering() {
        assert!(v("22.10") > v("22.4"));
        assert!(v("2.9") < v("2.10"));
    }

    #[test]
    fn kernel_release_suffix_is_ignored() {
        assert_eq!(v("6.8.0-45-generic"), v("6.8.0"));
        assert_eq!(v("6.8.0-45-generic").to_string(), "6.8.0");
    }

    #[test]
    fn quoted_and_prefixed_values_parse() {
        assert_eq!(v("\"24.04\""), v("24.4"));
        assert_eq!(v("v1.2"), v("1.2"));
    }

    #[test]
    fn non_numeric_is_rejected() {
        assert!(Version::parse("jammy").is_none());
        assert!(Version::parse("").is_none());
    }
}
