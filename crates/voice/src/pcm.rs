//! Frame encoding for the live session.
//!
//! The capture side hands us mono f32 samples in [-1.0, 1.0] at 16 kHz;
//! the wire wants base64 over 16-bit little-endian PCM.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// MIME type announced with every outbound audio frame.
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Capture sample rate the session is configured for.
pub const SAMPLE_RATE: u32 = 16_000;

/// Convert f32 samples to 16-bit little-endian PCM bytes. The cast
/// saturates, so out-of-range samples clip instead of wrapping.
pub fn to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * 32768.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Encode one microphone frame into its transport representation.
pub fn encode_frame(samples: &[f32]) -> String {
    STANDARD.encode(to_pcm16(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_known_values() {
        let bytes = to_pcm16(&[0.0, 0.5, -0.5]);
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 16384);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -16384);
    }

    #[test]
    fn test_pcm16_clips_out_of_range() {
        let bytes = to_pcm16(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MIN);
    }

    #[test]
    fn test_full_scale_negative() {
        let bytes = to_pcm16(&[-1.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MIN);
    }

    #[test]
    fn test_encode_frame_round_trip() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let samples = [0.25f32, -0.25, 0.0];
        let encoded = encode_frame(&samples);
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, to_pcm16(&samples));
    }

    #[test]
    fn test_empty_frame() {
        assert!(to_pcm16(&[]).is_empty());
        assert_eq!(encode_frame(&[]), "");
    }
}
