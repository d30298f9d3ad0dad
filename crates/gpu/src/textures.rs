//! Fire-and-forget surface texture loading.
//!
//! Loaders decode off the frame loop and post results to a [`TextureInbox`],
//! which the engine drains at the start of each tick. Once the inbox is
//! cancelled, late completions are dropped on the floor.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace};

use crate::device::TextureFormat;
use crate::error::TextureError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    Albedo,
    Roughness,
    Normal,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 3] = [Self::Albedo, Self::Roughness, Self::Normal];

    pub fn format(&self) -> TextureFormat {
        match self {
            Self::Albedo => TextureFormat::Rgba8Srgb,
            Self::Roughness | Self::Normal => TextureFormat::Rgba8Linear,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Albedo => "globe-albedo",
            Self::Roughness => "globe-roughness",
            Self::Normal => "globe-normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub slot: TextureSlot,
    pub path: PathBuf,
}

/// Tightly packed RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl DecodedTexture {
    pub fn from_image(image: image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            rgba: rgba.into_raw(),
        }
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba: color.repeat(width as usize * height as usize),
        }
    }
}

#[derive(Debug)]
pub struct TextureMessage {
    pub slot: TextureSlot,
    pub result: Result<DecodedTexture, TextureError>,
}

/// One-shot reply handle for a single request.
#[derive(Debug)]
pub struct TextureCompletion {
    slot: TextureSlot,
    sender: Sender<TextureMessage>,
    cancelled: Arc<AtomicBool>,
}

impl TextureCompletion {
    pub fn slot(&self) -> TextureSlot {
        self.slot
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Posts the result unless the inbox was cancelled or dropped.
    pub fn complete(self, result: Result<DecodedTexture, TextureError>) {
        if self.is_cancelled() {
            trace!(slot = ?self.slot, "texture completion after cancel; dropped");
            return;
        }
        // A closed channel means the engine is gone; nothing to deliver to.
        let _ = self.sender.send(TextureMessage {
            slot: self.slot,
            result,
        });
    }
}

#[derive(Debug)]
pub struct TextureInbox {
    sender: Sender<TextureMessage>,
    receiver: Receiver<TextureMessage>,
    cancelled: Arc<AtomicBool>,
}

impl Default for TextureInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureInbox {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn completion(&self, slot: TextureSlot) -> TextureCompletion {
        TextureCompletion {
            slot,
            sender: self.sender.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Everything that arrived since the last drain. Never blocks.
    pub fn drain(&self) -> Vec<TextureMessage> {
        if self.is_cancelled() {
            return Vec::new();
        }
        self.receiver.try_iter().collect()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            debug!(dropped, "discarded undelivered textures on cancel");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub trait TextureLoader {
    /// Starts a load and returns at once; the result goes to `completion`.
    fn load(&mut self, request: TextureRequest, completion: TextureCompletion);
}

/// Reads and decodes image files on a background thread per request.
#[derive(Debug, Default)]
pub struct FileTextureLoader;

impl FileTextureLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_file(path: &std::path::Path) -> Result<DecodedTexture, TextureError> {
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(DecodedTexture::from_image(image))
    }
}

impl TextureLoader for FileTextureLoader {
    fn load(&mut self, request: TextureRequest, completion: TextureCompletion) {
        debug!(slot = ?request.slot, path = %request.path.display(), "loading texture");
        std::thread::spawn(move || {
            if completion.is_cancelled() {
                return;
            }
            let result = Self::decode_file(&request.path);
            completion.complete(result);
        });
    }
}

/// Holds requests until the caller completes them by hand.
#[derive(Debug, Default)]
pub struct ManualTextureLoader {
    pending: Vec<(TextureRequest, TextureCompletion)>,
}

impl ManualTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> impl Iterator<Item = &TextureRequest> {
        self.pending.iter().map(|(request, _)| request)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Completes the oldest pending request for `slot`. Returns `false` if none.
    pub fn complete(&mut self, slot: TextureSlot, result: Result<DecodedTexture, TextureError>) -> bool {
        let Some(pos) = self.pending.iter().position(|(r, _)| r.slot == slot) else {
            return false;
        };
        let (_, completion) = self.pending.remove(pos);
        completion.complete(result);
        true
    }
}

impl TextureLoader for ManualTextureLoader {
    fn load(&mut self, request: TextureRequest, completion: TextureCompletion) {
        self.pending.push((request, completion));
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DecodedTexture, FileTextureLoader, ManualTextureLoader, TextureInbox, TextureLoader,
        TextureRequest, TextureSlot,
    };
    use crate::error::TextureError;

    fn request(slot: TextureSlot) -> TextureRequest {
        TextureRequest {
            slot,
            path: format!("{}.png", slot.label()).into(),
        }
    }

    #[test]
    fn completions_arrive_in_the_inbox() {
        let inbox = TextureInbox::new();
        let mut loader = ManualTextureLoader::new();
        for slot in TextureSlot::ALL {
            loader.load(request(slot), inbox.completion(slot));
        }
        assert!(inbox.drain().is_empty());

        assert!(loader.complete(TextureSlot::Normal, Ok(DecodedTexture::solid(1, 1, [128, 128, 255, 255]))));
        let messages = inbox.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].slot, TextureSlot::Normal);
        assert_eq!(loader.pending_count(), 2);
    }

    #[test]
    fn cancelled_inbox_drops_late_completions() {
        let inbox = TextureInbox::new();
        let mut loader = ManualTextureLoader::new();
        loader.load(request(TextureSlot::Albedo), inbox.completion(TextureSlot::Albedo));

        inbox.cancel();
        assert!(loader.complete(TextureSlot::Albedo, Ok(DecodedTexture::solid(1, 1, [0; 4]))));
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = FileTextureLoader::decode_file(std::path::Path::new("/nonexistent/earth.jpg"))
            .expect_err("missing");
        assert!(matches!(err, TextureError::Io { .. }));
    }

    #[test]
    fn garbage_bytes_report_decode_error() {
        let path = std::env::temp_dir().join(format!("globe-texture-{}.png", std::process::id()));
        std::fs::write(&path, b"not an image").expect("write temp file");
        let err = FileTextureLoader::decode_file(&path).expect_err("garbage");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn solid_texture_has_packed_pixels() {
        let t = DecodedTexture::solid(2, 3, [1, 2, 3, 4]);
        assert_eq!(t.rgba.len(), 24);
        assert_eq!(&t.rgba[4..8], &[1, 2, 3, 4]);
    }
}
