
/// Group a count with thousands separators ("1234567" -> "1,234,567").
pub fn fmt_grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-friendly age of an RFC 3339 timestamp.
pub fn fmt_relative_time(rfc3339: &str) -> String {
    let parsed = match chrono::DateTime::parse_from_rfc3339(rfc3339) {
        Ok(t) => t.with_timezone(&chrono::Utc),
        Err(_) => return "\u{2014}".into(),
    };
    let ago = chrono::Utc::now()
        .signed_duration_since(parsed)
        .num_seconds()
        .max(0);
    if ago < 60 {
        "just now".into()
    } else if ago < 3600 {
        format!("{}m ago", ago / 60)
    } else if ago < 86400 {
        format!("{}h ago", ago / 3600)
    } else {
        format!("{}d ago", ago / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(fmt_grouped(0), "0");
        assert_eq!(fmt_grouped(42), "42");
        assert_eq!(fmt_grouped(999), "999");
        assert_eq!(fmt_grouped(1000), "1,000");
        assert_eq!(fmt_grouped(1_234_567), "1,234,567");
    }

    #[test]
    fn relative_time_handles_garbage() {
        assert_eq!(fmt_relative_time("not a timestamp"), "\u{2014}");
    }

    #[test]
    fn relative_time_recent_is_just_now() {
        let now = chrono::Utc::now().to_rfc3339();
        assert_eq!(fmt_relative_time(&now), "just now");
    }
}
