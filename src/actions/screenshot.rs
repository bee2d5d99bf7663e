use super::traits::{Action, ActionResult, BinaryOutput};
use crate::error::ActionError;
use crate::platform::{encode_png, ScreenGrabber};
use crate::protocol::Verb;
use async_trait::async_trait;
use std::sync::Arc;

pub const SCREENSHOT_FILE_NAME: &str = "screenshot.png";

/// `/screenshot <target>`: primary display as a PNG photo.
pub struct ScreenshotAction {
    grabber: Arc<dyn ScreenGrabber>,
}

impl ScreenshotAction {
    pub fn new(grabber: Arc<dyn ScreenGrabber>) -> Self {
        Self { grabber }
    }
}

#[async_trait]
impl Action for ScreenshotAction {
    fn verb(&self) -> Verb {
        Verb::Screenshot
    }

    fn description(&self) -> &str {
        "Capture and send a screenshot of the primary monitor"
    }

    async fn execute(&self, _argument: Option<&str>) -> ActionResult {
        let grabber = Arc::clone(&self.grabber);
        let png = tokio::task::spawn_blocking(move || {
            let frame = grabber.capture_primary().map_err(ActionError::Capture)?;
            encode_png(frame).map_err(ActionError::Encode)
        })
        .await;

        match png {
            Ok(Ok(bytes)) => {
                tracing::debug!("Screenshot encoded: {} bytes", bytes.len());
                ActionResult::Binary(BinaryOutput::photo(bytes, SCREENSHOT_FILE_NAME, "Screenshot"))
            }
            Ok(Err(e)) => ActionResult::failure(e),
            Err(e) => ActionResult::failure(ActionError::Capture(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{RawFrame, UnsupportedGrabber};
    use crate::response::AttachmentKind;

    struct CheckerGrabber;

    impl ScreenGrabber for CheckerGrabber {
        fn capture_primary(&self) -> Result<RawFrame, String> {
            let (width, height) = (8u32, 8u32);
            let mut rgba = Vec::with_capacity((width * height * 4) as usize);
            for y in 0..height {
                for x in 0..width {
                    let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
            }
            Ok(RawFrame { width, height, rgba })
        }
    }

    #[tokio::test]
    async fn capture_becomes_png_photo() {
        let action = ScreenshotAction::new(Arc::new(CheckerGrabber));
        match action.execute(None).await {
            ActionResult::Binary(out) => {
                assert_eq!(out.file_name, "screenshot.png");
                assert_eq!(out.caption, "Screenshot");
                assert_eq!(out.kind, AttachmentKind::Photo);
                assert_eq!(&out.bytes[1..4], b"PNG");
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_error_is_failure() {
        let action = ScreenshotAction::new(Arc::new(UnsupportedGrabber));
        match action.execute(None).await {
            ActionResult::Failure(err) => {
                let text = err.render();
                assert!(text.starts_with("Error: screen capture failed:"), "{text}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
