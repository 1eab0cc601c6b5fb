//! Subtitle generation in SRT and VTT formats.

use lumacut_common::error::LumacutResult;
use lumacut_project_model::{CueTrack, SubtitleCue};

/// Phrases used for auto-generated captions until a recognizer is wired in.
pub const PLACEHOLDER_PHRASES: &[&str] = &[
    "Welcome to the show",
    "Here is what happened next",
    "Take a closer look",
    "Thanks for watching",
];

/// Default length of one placeholder cue in seconds.
pub const DEFAULT_CUE_SECS: f64 = 3.0;

/// Fill `duration_secs` with back-to-back cues cycling through `phrases`.
///
/// The last cue is trimmed to end at `duration_secs`. Returns an empty track
/// for a non-positive duration or an empty phrase list.
pub fn generate_placeholder_cues(
    duration_secs: f64,
    phrases: &[&str],
    cue_len_secs: f64,
) -> CueTrack {
    let mut track = CueTrack::new();
    if !(duration_secs > 0.0) || phrases.is_empty() || !(cue_len_secs > 0.0) {
        return track;
    }

    let mut start = 0.0;
    let mut index = 0usize;
    while start < duration_secs {
        let end = (start + cue_len_secs).min(duration_secs);
        let cue = SubtitleCue::new(start, end, phrases[index % phrases.len()]);
        if let Err(e) = track.insert(cue) {
            tracing::warn!(error = %e, "Skipping placeholder cue");
        }
        start = end;
        index += 1;
    }

    tracing::debug!(cues = track.len(), duration_secs, "Generated placeholder cues");
    track
}

/// Generate SRT subtitle content from cues.
pub fn generate_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from cues.
pub fn generate_vtt(cues: &[SubtitleCue]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start_secs),
            format_vtt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

fn split_time(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_time(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_time(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Save subtitles to a file. `.vtt` writes WebVTT, anything else SRT.
pub fn save_subtitles(cues: &[SubtitleCue], path: &std::path::Path) -> LumacutResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(cues),
        _ => generate_srt(cues),
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), cues = cues.len(), "Saved subtitles");
    Ok(())
}
