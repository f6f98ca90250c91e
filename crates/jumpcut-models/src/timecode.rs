//! Frame/timecode conversion.
//!
//! The EDL interchange format displays 1-based frame numbers as
//! `HH:MM:SS:FF` at the source frame rate, while chapter lists accept the
//! looser `H:MM:SS[.FF|;FF]` shape with missing leading components
//! zero-padded. Fractional frame rates are rounded to whole frames per
//! second for timecode arithmetic.

use thiserror::Error;

/// Timecode parsing error.
#[derive(Debug, Error, PartialEq)]
pub enum TimecodeError {
    #[error("timecode cannot be empty")]
    Empty,

    #[error("invalid timecode '{0}': at most one frame delimiter ('.' or ';') is allowed")]
    ExtraFrameDelimiter(String),

    #[error("invalid timecode '{0}': expected H:MM:SS[.FF] with at most three ':' components")]
    TooManyComponents(String),

    #[error("invalid {component} value '{value}'")]
    InvalidValue {
        component: &'static str,
        value: String,
    },
}

/// Whole frames per second used for timecode arithmetic.
fn rounded_fps(frame_rate: f64) -> u64 {
    (frame_rate.round() as u64).max(1)
}

/// Format a 0-based frame index as `HH:MM:SS:FF`.
///
/// This matches the EDL convention of writing `frame + 1` as a 1-based
/// frame number: frame 0 renders as `00:00:00:00`.
///
/// # Examples
/// ```
/// use jumpcut_models::timecode::format_frame_timecode;
/// assert_eq!(format_frame_timecode(0, 30.0), "00:00:00:00");
/// assert_eq!(format_frame_timecode(95, 30.0), "00:00:03:05");
/// ```
pub fn format_frame_timecode(frame: u64, frame_rate: f64) -> String {
    let fps = rounded_fps(frame_rate);
    let ff = frame % fps;
    let total_secs = frame / fps;
    let ss = total_secs % 60;
    let mm = (total_secs / 60) % 60;
    let hh = total_secs / 3600;
    format!("{:02}:{:02}:{:02}:{:02}", hh, mm, ss, ff)
}

/// Parse a chapter timecode (`H:MM:SS[.FF|;FF]`) to a 0-based frame index.
///
/// Missing leading components are treated as zero, so `12` means twelve
/// seconds and `1:20` means one minute twenty seconds.
///
/// # Examples
/// ```
/// use jumpcut_models::timecode::parse_chapter_timecode;
/// assert_eq!(parse_chapter_timecode("1:20", 30.0).unwrap(), 2400);
/// assert_eq!(parse_chapter_timecode("00:01:20;12", 30.0).unwrap(), 2412);
/// ```
pub fn parse_chapter_timecode(text: &str, frame_rate: f64) -> Result<u64, TimecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TimecodeError::Empty);
    }

    // Split off the frame part, delimited by '.' or ';'.
    let (clock, frames) = match split_frame_part(text)? {
        Some((clock, frames)) => (clock, frames),
        None => (text, "0"),
    };

    let mut parts: Vec<&str> = clock.split(':').collect();
    if parts.len() > 3 {
        return Err(TimecodeError::TooManyComponents(text.to_string()));
    }
    while parts.len() < 3 {
        parts.insert(0, "0");
    }

    let hours = parse_component(parts[0], "hours")?;
    let minutes = parse_component(parts[1], "minutes")?;
    let seconds = parse_component(parts[2], "seconds")?;
    let ff = parse_component(frames, "frames")?;

    let fps = rounded_fps(frame_rate);
    Ok((hours * 3600 + minutes * 60 + seconds) * fps + ff)
}

/// Convert a duration in seconds to a whole frame count.
pub fn duration_to_frames(secs: f64, frame_rate: f64) -> u64 {
    (secs.max(0.0) * frame_rate).round() as u64
}

fn split_frame_part(text: &str) -> Result<Option<(&str, &str)>, TimecodeError> {
    for delimiter in ['.', ';'] {
        let parts: Vec<&str> = text.split(delimiter).collect();
        if parts.len() > 2 {
            return Err(TimecodeError::ExtraFrameDelimiter(text.to_string()));
        }
        if parts.len() == 2 {
            return Ok(Some((parts[0], parts[1])));
        }
    }
    Ok(None)
}

fn parse_component(value: &str, component: &'static str) -> Result<u64, TimecodeError> {
    value.parse().map_err(|_| TimecodeError::InvalidValue {
        component,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frame_zero() {
        assert_eq!(format_frame_timecode(0, 30.0), "00:00:00:00");
    }

    #[test]
    fn test_format_rolls_over_components() {
        // 30 fps: one hour is 108000 frames.
        assert_eq!(format_frame_timecode(108_000, 30.0), "01:00:00:00");
        assert_eq!(format_frame_timecode(108_000 + 61 * 30 + 7, 30.0), "01:01:01:07");
    }

    #[test]
    fn test_format_fractional_frame_rate_rounds() {
        // 29.97 rounds to 30 for timecode math.
        assert_eq!(format_frame_timecode(30, 29.97), "00:00:01:00");
    }

    #[test]
    fn test_parse_seconds_only() {
        assert_eq!(parse_chapter_timecode("12", 30.0).unwrap(), 360);
    }

    #[test]
    fn test_parse_with_frame_delimiters() {
        assert_eq!(parse_chapter_timecode("00.12", 30.0).unwrap(), 12);
        assert_eq!(parse_chapter_timecode("00:00.12", 30.0).unwrap(), 12);
        assert_eq!(
            parse_chapter_timecode("00:01:20;12", 30.0).unwrap(),
            80 * 30 + 12
        );
    }

    #[test]
    fn test_parse_full_clock() {
        assert_eq!(
            parse_chapter_timecode("01:02:03", 25.0).unwrap(),
            (3600 + 123) * 25
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_chapter_timecode("", 30.0), Err(TimecodeError::Empty));
        assert!(matches!(
            parse_chapter_timecode("1.2.3", 30.0),
            Err(TimecodeError::ExtraFrameDelimiter(_))
        ));
        assert!(matches!(
            parse_chapter_timecode("1:2:3:4", 30.0),
            Err(TimecodeError::TooManyComponents(_))
        ));
        assert!(matches!(
            parse_chapter_timecode("ab:12", 30.0),
            Err(TimecodeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duration_to_frames() {
        assert_eq!(duration_to_frames(2.0, 30.0), 60);
        assert_eq!(duration_to_frames(1.5, 30.0), 45);
        assert_eq!(duration_to_frames(-1.0, 30.0), 0);
    }
}
