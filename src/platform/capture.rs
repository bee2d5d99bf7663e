use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Raw RGBA8 pixels of one display, row-major.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Acquires the pixels of the primary display.
pub trait ScreenGrabber: Send + Sync {
    fn capture_primary(&self) -> Result<RawFrame, String>;
}

/// Grabber for builds without display support.
#[derive(Debug, Default)]
pub struct UnsupportedGrabber;

impl ScreenGrabber for UnsupportedGrabber {
    fn capture_primary(&self) -> Result<RawFrame, String> {
        Err("screen capture is not enabled in this build (feature `screen-capture`)".into())
    }
}

/// `xcap`-backed grabber: primary monitor, falling back to the first one listed.
#[cfg(feature = "screen-capture")]
#[derive(Debug, Default)]
pub struct XcapGrabber;

#[cfg(feature = "screen-capture")]
impl ScreenGrabber for XcapGrabber {
    fn capture_primary(&self) -> Result<RawFrame, String> {
        let monitors =
            xcap::Monitor::all().map_err(|e| format!("failed to list monitors: {e}"))?;

        let primary = monitors
            .iter()
            .position(|m| m.is_primary().unwrap_or(false))
            .unwrap_or(0);
        let monitor = monitors
            .into_iter()
            .nth(primary)
            .ok_or_else(|| "no monitor found".to_string())?;

        let image = monitor
            .capture_image()
            .map_err(|e| format!("capture failed: {e}"))?;
        tracing::debug!("Captured display: {}x{}", image.width(), image.height());

        Ok(RawFrame {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }
}

/// Grabber selected by the build features.
pub fn default_grabber() -> Arc<dyn ScreenGrabber> {
    #[cfg(feature = "screen-capture")]
    {
        Arc::new(XcapGrabber)
    }
    #[cfg(not(feature = "screen-capture"))]
    {
        Arc::new(UnsupportedGrabber)
    }
}

/// Encode a frame as PNG. Alpha is dropped; displays are opaque.
pub fn encode_png(frame: RawFrame) -> Result<Vec<u8>, String> {
    let RawFrame {
        width,
        height,
        rgba,
    } = frame;
    let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        format!("pixel buffer does not match {width}x{height} RGBA dimensions")
    })?;

    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn solid_frame(width: u32, height: u32) -> RawFrame {
        RawFrame {
            width,
            height,
            rgba: [10u8, 20, 30, 255].repeat((width * height) as usize),
        }
    }

    #[test]
    fn encodes_png_losslessly() {
        let png = encode_png(solid_frame(4, 3)).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let mut frame = solid_frame(4, 3);
        frame.rgba.truncate(10);
        let err = encode_png(frame).unwrap_err();
        assert!(err.contains("4x3"));
    }

    #[test]
    fn unsupported_grabber_fails() {
        assert!(UnsupportedGrabber.capture_primary().is_err());
    }
}
