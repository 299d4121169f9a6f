//! Placeholder media files
//!
//! Small but structurally valid MP4, WAV and PNG files, so a media download
//! produces something a player or viewer will open.

use super::ExportError;
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::f32::consts::PI;
use std::io::Cursor;

/// Sample rate of generated audio
pub const SAMPLE_RATE: u32 = 44_100;
/// Tone frequency of generated audio
pub const TONE_HZ: f32 = 440.0;
/// Default length of generated audio, in seconds
pub const DEFAULT_AUDIO_SECONDS: u32 = 5;

const TONE_AMPLITUDE: f32 = 0.3;

/// Minimal MP4: an `ftyp` box followed by an empty `mdat` box
pub fn placeholder_mp4() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(40);

    // ftyp: size, type, major brand, minor version, compatible brands
    bytes.extend_from_slice(&0x20u32.to_be_bytes());
    bytes.extend_from_slice(b"ftyp");
    bytes.extend_from_slice(b"isom");
    bytes.extend_from_slice(&0x200u32.to_be_bytes());
    for brand in [b"isom", b"iso2", b"avc1", b"mp41"] {
        bytes.extend_from_slice(brand);
    }

    bytes.extend_from_slice(&8u32.to_be_bytes());
    bytes.extend_from_slice(b"mdat");
    bytes
}

/// 16-bit stereo PCM sine tone
pub fn sine_wav(seconds: u32) -> Result<Vec<u8>, ExportError> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let amplitude = TONE_AMPLITUDE * f32::from(i16::MAX);
        for n in 0..SAMPLE_RATE * seconds {
            let t = n as f32 / SAMPLE_RATE as f32;
            let sample = ((2.0 * PI * TONE_HZ * t).sin() * amplitude) as i16;
            writer.write_sample(sample)?;
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

fn channel(value: u32, extent: u32) -> u8 {
    ((value * 255) / extent.max(1)).min(255) as u8
}

/// 100×100 diagonal gradient
pub fn gradient_png() -> Result<Vec<u8>, ExportError> {
    let image: RgbImage = ImageBuffer::from_fn(100, 100, |x, y| {
        Rgb([channel(x, 99), channel(y, 99), channel(x + y, 198)])
    });
    encode_png(&image)
}

/// 800×600 storyboard sheet: gradient background with a 4×3 grid of frames
pub fn storyboard_png() -> Result<Vec<u8>, ExportError> {
    const WIDTH: u32 = 800;
    const HEIGHT: u32 = 600;
    const COLUMNS: u32 = 4;
    const ROWS: u32 = 3;
    const MARGIN: u32 = 12;
    const BORDER: u32 = 3;

    let cell_w = WIDTH / COLUMNS;
    let cell_h = HEIGHT / ROWS;

    let image: RgbImage = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
        let (cx, cy) = (x % cell_w, y % cell_h);
        let inside = cx >= MARGIN && cx < cell_w - MARGIN && cy >= MARGIN && cy < cell_h - MARGIN;
        let on_border = inside
            && (cx < MARGIN + BORDER
                || cx >= cell_w - MARGIN - BORDER
                || cy < MARGIN + BORDER
                || cy >= cell_h - MARGIN - BORDER);

        if on_border {
            Rgb([240, 240, 240])
        } else if inside {
            // Each frame gets its own tint
            let frame = (y / cell_h) * COLUMNS + x / cell_w;
            let tint = channel(frame, COLUMNS * ROWS - 1);
            Rgb([tint, channel(cx, cell_w), 255 - tint])
        } else {
            Rgb([channel(x, WIDTH) / 3, channel(y, HEIGHT) / 3, 60])
        }
    });
    encode_png(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_mp4_layout() {
        let mp4 = placeholder_mp4();
        assert_eq!(mp4.len(), 40);
        assert_eq!(&mp4[0..4], &[0, 0, 0, 0x20]);
        assert_eq!(&mp4[4..8], b"ftyp");
        assert_eq!(&mp4[8..12], b"isom");
        assert_eq!(&mp4[28..32], b"mp41");
        assert_eq!(&mp4[36..40], b"mdat");
    }

    #[test]
    fn test_wav_header_and_length() {
        let wav = sine_wav(1).unwrap();
        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        // Two channels of one second each
        assert_eq!(reader.len(), SAMPLE_RATE * 2);
    }

    #[test]
    fn test_wav_amplitude() {
        let wav = sine_wav(1).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let peak = reader
            .samples::<i16>()
            .map(|s| s.unwrap().unsigned_abs())
            .max()
            .unwrap();
        let expected = (TONE_AMPLITUDE * f32::from(i16::MAX)) as u16;
        assert!(peak <= expected && peak > expected - 50);
    }

    #[test]
    fn test_pngs_decode() {
        let gradient = image::load_from_memory_with_format(&gradient_png().unwrap(), ImageFormat::Png)
            .unwrap();
        assert_eq!(gradient.dimensions(), (100, 100));

        let storyboard =
            image::load_from_memory_with_format(&storyboard_png().unwrap(), ImageFormat::Png)
                .unwrap();
        assert_eq!(storyboard.dimensions(), (800, 600));
        // Frame border of the first cell
        assert_eq!(storyboard.get_pixel(13, 13).0[..3], [240, 240, 240]);
    }
}
