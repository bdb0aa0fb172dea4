//! Pure mixing primitives: looping, trimming, attenuation, and overlay.
//!
//! Everything here is deterministic sample math with no I/O, so the whole
//! surface is unit-testable. The overlay maps the music track onto the voice
//! track's clock by integer frame-index scaling when the two sample rates
//! differ; nearest-sample mapping is plenty for background beds that sit
//! 0 to 20 dB below the voice.

use super::decode::Track;

/// Maximum attenuation applied to background music, in dB.
const MAX_MUSIC_ATTENUATION_DB: f32 = 20.0;

/// Maps the user-facing music volume (0.0 to 1.0) onto an attenuation in dB.
///
/// Volume 1.0 leaves the music untouched (0 dB); volume 0.0 pushes it
/// 20 dB under the voice.
pub fn music_attenuation_db(volume: f32) -> f32 {
    -(MAX_MUSIC_ATTENUATION_DB - MAX_MUSIC_ATTENUATION_DB * volume)
}

/// Converts a dB change to a linear gain factor.
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Loops or trims `music` so it covers exactly `target_len` samples.
///
/// Shorter beds repeat end-to-start; longer beds are cut at the target.
pub fn fit_to_length(music: &[f32], target_len: usize) -> Vec<f32> {
    if music.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }
    music.iter().copied().cycle().take(target_len).collect()
}

/// Overlays an attenuated music bed under the voice track.
///
/// The result keeps the voice track's sample rate and length. The music bed
/// is first fit to the voice duration on its own clock, then each voice
/// frame reads the nearest music frame. Summed samples are clamped to
/// `[-1.0, 1.0]`.
pub fn overlay(voice: &Track, music: &Track, music_volume: f32) -> Track {
    let gain = db_to_gain(music_attenuation_db(music_volume));

    // Music bed length on the music clock matching the voice duration.
    let bed_len = (voice.samples.len() as u64 * music.sample_rate as u64
        / voice.sample_rate.max(1) as u64) as usize;
    let bed = fit_to_length(&music.samples, bed_len.max(1));

    let samples = voice
        .samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let music_idx = (i as u64 * music.sample_rate as u64
                / voice.sample_rate.max(1) as u64) as usize;
            let m = bed.get(music_idx).copied().unwrap_or(0.0);
            (v + m * gain).clamp(-1.0, 1.0)
        })
        .collect();

    Track {
        samples,
        sample_rate: voice.sample_rate,
    }
}

// =============================================================================
// Tests
// =============================================================================
