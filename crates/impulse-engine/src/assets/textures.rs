use std::collections::HashMap;
use std::path::Path;

use crate::coords::Rect;
use crate::gfx::TextureImage;
use crate::render::ribbon::{RibbonError, TextureSource};

#[derive(Debug, Clone)]
struct StoredTexture {
    image: TextureImage,
    /// Named sub-rectangles in pixels, for atlases.
    frames: HashMap<String, Rect>,
}

/// In-memory texture registry keyed by asset name.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    textures: HashMap<String, StoredTexture>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `image` under `key`, replacing any previous entry and its frames.
    pub fn insert(&mut self, key: impl Into<String>, image: TextureImage) {
        self.textures.insert(
            key.into(),
            StoredTexture {
                image,
                frames: HashMap::new(),
            },
        );
    }

    /// Decodes `path` and registers it under `key`.
    pub fn load(&mut self, key: impl Into<String>, path: impl AsRef<Path>) -> Result<(), RibbonError> {
        let key = key.into();
        let image = TextureImage::open(path.as_ref())?;
        log::info!(
            "loaded texture '{key}' ({}x{}) from {}",
            image.width,
            image.height,
            path.as_ref().display()
        );
        self.insert(key, image);
        Ok(())
    }

    /// Names a pixel rectangle inside the texture at `key`. Returns `false`
    /// when `key` is unknown.
    pub fn insert_frame(&mut self, key: &str, frame: impl Into<String>, rect: Rect) -> bool {
        match self.textures.get_mut(key) {
            Some(t) => {
                t.frames.insert(frame.into(), rect);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }
}

impl TextureSource for AssetStore {
    fn resolve(&self, key: &str, frame: Option<&str>) -> Result<TextureImage, RibbonError> {
        let stored = self.textures.get(key).ok_or_else(|| RibbonError::TextureNotFound {
            key: key.to_string(),
            frame: None,
        })?;

        let not_found = |frame: &str| RibbonError::TextureNotFound {
            key: key.to_string(),
            frame: Some(frame.to_string()),
        };
        match frame.filter(|f| !f.is_empty()) {
            None => Ok(stored.image.clone()),
            Some(name) => {
                let rect = stored.frames.get(name).ok_or_else(|| not_found(name))?;
                stored.image.crop(*rect).ok_or_else(|| not_found(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AssetStore {
        let mut s = AssetStore::new();
        s.insert("tex", TextureImage::checker(8, 2, [0, 0, 0, 255], [255, 255, 255, 255]));
        s
    }

    #[test]
    fn resolves_whole_texture() {
        let img = store().resolve("tex", None).unwrap();
        assert_eq!((img.width, img.height), (8, 8));
    }

    #[test]
    fn empty_frame_name_means_whole_texture() {
        let img = store().resolve("tex", Some("")).unwrap();
        assert_eq!((img.width, img.height), (8, 8));
    }

    #[test]
    fn resolves_named_frame() {
        let mut s = store();
        assert!(s.insert_frame("tex", "corner", Rect::new(4.0, 0.0, 4.0, 4.0)));
        let img = s.resolve("tex", Some("corner")).unwrap();
        assert_eq!((img.width, img.height), (4, 4));
        assert_eq!(&img.pixels[0..4], &[255, 255, 255, 255]);
    }

    #[test]
    fn unknown_key_or_frame_is_not_found() {
        let mut s = store();
        assert!(!s.insert_frame("nope", "a", Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(matches!(
            s.resolve("nope", None),
            Err(RibbonError::TextureNotFound { frame: None, .. })
        ));
        assert!(matches!(
            s.resolve("tex", Some("missing")),
            Err(RibbonError::TextureNotFound { frame: Some(_), .. })
        ));

        s.insert_frame("tex", "outside", Rect::new(6.0, 6.0, 4.0, 4.0));
        assert!(s.resolve("tex", Some("outside")).is_err());
    }
}
