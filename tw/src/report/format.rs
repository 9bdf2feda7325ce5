//! Value formatting and text measurement for the report

use chrono::NaiveDateTime;

use crate::domain::TripRequest;

/// Currency used when an entry carries none
pub const DEFAULT_CURRENCY: &str = "USD";

/// Format an amount with its currency code and thousands separators
///
/// Whole amounts print without decimals (`USD 1,234`), anything else with
/// two (`USD 1,234.50`).
pub fn format_price(amount: f64, currency: Option<&str>, default_currency: &str) -> String {
    let code = currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default_currency)
        .to_uppercase();

    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let fraction = cents % 100;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };

    if fraction == 0 {
        format!("{} {}{}", code, sign, whole)
    } else {
        format!("{} {}{}.{:02}", code, sign, whole, fraction)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a duration given in hours
///
/// Rounded to whole minutes first: under an hour prints minutes, exactly
/// one hour is singular, anything longer prints hours with up to two
/// decimals.
pub fn format_duration(hours: f64) -> String {
    let minutes = (hours.max(0.0) * 60.0).round() as u64;
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let text = format!("{:.2}", minutes as f64 / 60.0);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "1" {
        return "1 hour".to_string();
    }
    format!("{} hours", text)
}

/// Format a stop count
pub fn format_stops(stops: u32) -> String {
    match stops {
        0 => "Direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

/// Output filename for a report
///
/// `trip-<origin>-<destination>-<date>.pdf` when the request is known,
/// otherwise a timestamped generic name.
pub fn report_filename(request: Option<&TripRequest>, now: NaiveDateTime) -> String {
    match request {
        Some(request) => format!(
            "trip-{}-{}-{}.pdf",
            slug(&request.origin),
            slug(&request.destination),
            now.format("%Y-%m-%d")
        ),
        None => format!("trip-itinerary-{}.pdf", now.format("%Y%m%d-%H%M%S")),
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to one `-`
fn slug(text: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() { "unknown".to_string() } else { out }
}

/// Millimetres per typographic point
pub const MM_PER_PT: f32 = 0.3528;

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// How many characters of `size`-point text fit in `width_mm`
pub fn chars_per_line(width_mm: f32, size: f32) -> usize {
    let glyph_mm = size * AVG_GLYPH_WIDTH * MM_PER_PT;
    ((width_mm / glyph_mm).floor() as usize).max(1)
}

/// Greedy word wrap to at most `max_chars` characters per line
///
/// Words longer than a whole line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(hh, mm, ss).unwrap()
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1234.0, Some("usd"), DEFAULT_CURRENCY), "USD 1,234");
        assert_eq!(format_price(1234.5, None, DEFAULT_CURRENCY), "USD 1,234.50");
        assert_eq!(format_price(980.0, Some("KES"), DEFAULT_CURRENCY), "KES 980");
        assert_eq!(format_price(1_250_000.0, Some("AED"), DEFAULT_CURRENCY), "AED 1,250,000");
        assert_eq!(format_price(0.0, Some(" "), "EUR"), "EUR 0");
        assert_eq!(format_price(-12.25, None, DEFAULT_CURRENCY), "USD -12.25");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.75), "45 min");
        assert_eq!(format_duration(0.5), "30 min");
        assert_eq!(format_duration(1.0), "1 hour");
        assert_eq!(format_duration(2.5), "2.5 hours");
        assert_eq!(format_duration(3.0), "3 hours");
        assert_eq!(format_duration(1.25), "1.25 hours");
    }

    #[test]
    fn test_format_duration_rounds_before_choosing_unit() {
        assert_eq!(format_duration(0.9999), "1 hour");
        assert_eq!(format_duration(1.001), "1 hour");
        assert_eq!(format_duration(0.004), "0 min");
        assert_eq!(format_duration(-1.0), "0 min");
        assert_eq!(format_duration(1.999), "2 hours");
    }

    #[test]
    fn test_format_stops() {
        assert_eq!(format_stops(0), "Direct");
        assert_eq!(format_stops(1), "1 stop");
        assert_eq!(format_stops(2), "2 stops");
    }

    #[test]
    fn test_report_filename_with_request() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let request = TripRequest::new("NBO", "Dubai, UAE", day, day);
        assert_eq!(
            report_filename(Some(&request), at(2025, 10, 1, 9, 30, 0)),
            "trip-nbo-dubai-uae-2025-10-01.pdf"
        );
    }

    #[test]
    fn test_report_filename_without_request() {
        assert_eq!(
            report_filename(None, at(2025, 10, 1, 9, 30, 5)),
            "trip-itinerary-20251001-093005.pdf"
        );
    }

    #[test]
    fn test_slug_edge_cases() {
        assert_eq!(slug("  São Paulo!! "), "são-paulo");
        assert_eq!(slug("---"), "unknown");
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap("see https://example.com/booking/12345", 12);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
        assert_eq!(lines.concat().replace(' ', ""), "seehttps://example.com/booking/12345");
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn test_chars_per_line_positive() {
        assert!(chars_per_line(174.0, 10.0) > 50);
        assert_eq!(chars_per_line(0.1, 40.0), 1);
    }
}
