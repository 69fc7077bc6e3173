/// Progress template passed to yt-dlp so stdout carries plain percent lines.
pub const PROGRESS_TEMPLATE: &str = "downloaded_bytes:%(progress._percent_str)s";

/// Parses one line of templated yt-dlp output into a 0.0..=1.0 fraction.
pub fn parse_progress_from_line(line: &str) -> Option<f32> {
    if let Some(rest) = line.strip_prefix("downloaded_bytes:") {
        let trimmed = rest.trim();
        if let Some(number) = trimmed.strip_suffix('%') {
            if let Ok(v) = number.trim().parse::<f32>() {
                return Some(v / 100.0);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_templated_percent_lines() {
        let v = parse_progress_from_line("downloaded_bytes:  42.3%").unwrap();
        assert!((v - 0.423).abs() < 1e-6);
    }

    #[test]
    fn parses_completion() {
        let v = parse_progress_from_line("downloaded_bytes: 100.0%").unwrap();
        assert!((v - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ignores_unrelated_output() {
        assert_eq!(parse_progress_from_line("[download] Destination: downloads/x.mp4"), None);
        assert_eq!(parse_progress_from_line(""), None);
    }

    #[test]
    fn ignores_unavailable_percentages() {
        // yt-dlp prints N/A before the total size is known
        assert_eq!(parse_progress_from_line("downloaded_bytes:   N/A%"), None);
        assert_eq!(parse_progress_from_line("downloaded_bytes:N/A"), None);
    }
}
