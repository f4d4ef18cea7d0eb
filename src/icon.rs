// src/icon.rs
//! Icon resolution collaborator
//!
//! Decoding and downloading icons is not done by the engine. Callers supply
//! an [`IconResolver`] that turns an [`Icon`] reference into pixels; plugins
//! that need pixels disable themselves when no resolver is configured.

use crate::app::{Icon, KeyColor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Decoded RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixbuf {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Pixbuf {
    /// Wrap raw RGBA data, four bytes per pixel in row-major order
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::DataFormat(format!(
                "pixbuf {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully opaque image of one color
    pub fn solid(width: u32, height: u32, color: KeyColor) -> Self {
        let pixels = [color.red, color.green, color.blue, 255]
            .into_iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    /// Nearest-neighbour resample to `width` x `height`
    pub fn scale_nearest(&self, width: u32, height: u32) -> Pixbuf {
        if self.width == 0 || self.height == 0 || width == 0 || height == 0 {
            return Pixbuf {
                width,
                height,
                pixels: vec![0; width as usize * height as usize * 4],
            };
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height as u64) as u32;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width as u64) as u32;
                pixels.extend_from_slice(&self.pixel(src_x, src_y));
            }
        }
        Pixbuf {
            width,
            height,
            pixels,
        }
    }

    /// Iterate pixels as `[r, g, b, a]`
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.pixels
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// What a plugin asks the resolver for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    pub icon: Icon,
    /// Logical size in pixels
    pub size: u32,
    pub scale: u32,
}

/// Turns icon references into decoded images
#[async_trait]
pub trait IconResolver: Send + Sync {
    async fn resolve(&self, request: &IconRequest) -> Result<Pixbuf>;
}

/// Resolver backed by a fixed map from icon name to image
#[derive(Debug, Default)]
pub struct StaticIconResolver {
    icons: RwLock<HashMap<String, Pixbuf>>,
}

impl StaticIconResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, pixbuf: Pixbuf) {
        self.icons.write().insert(name.into(), pixbuf);
    }
}

#[async_trait]
impl IconResolver for StaticIconResolver {
    async fn resolve(&self, request: &IconRequest) -> Result<Pixbuf> {
        self.icons
            .read()
            .get(&request.icon.name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("icon {}", request.icon.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixbuf_size_is_checked() {
        assert!(Pixbuf::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(Pixbuf::new(2, 2, vec![0; 15]), Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_scale_nearest() {
        let pixbuf = Pixbuf::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let scaled = pixbuf.scale_nearest(4, 2);
        assert_eq!(scaled.width(), 4);
        assert_eq!(scaled.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(scaled.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(scaled.pixel(2, 0), [0, 0, 255, 255]);
        assert_eq!(scaled.pixel(3, 1), [0, 0, 255, 255]);
    }

    #[test]
    fn test_solid_pixbuf() {
        let pixbuf = Pixbuf::solid(3, 2, KeyColor::new(10, 20, 30));
        assert_eq!(pixbuf.pixels().count(), 6);
        assert!(pixbuf.pixels().all(|p| p == [10, 20, 30, 255]));
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticIconResolver::new();
        resolver.insert("foo", Pixbuf::solid(1, 1, KeyColor::new(1, 2, 3)));

        let request = IconRequest {
            icon: Icon::stock("foo"),
            size: 64,
            scale: 1,
        };
        assert_eq!(resolver.resolve(&request).await.unwrap().width(), 1);

        let missing = IconRequest {
            icon: Icon::stock("bar"),
            ..request
        };
        assert!(matches!(resolver.resolve(&missing).await, Err(Error::NotFound(_))));
    }
}
