//! Asset cache - background images and font faces
//!
//! Loaded once from `<dir>/images` and `<dir>/fonts` before any render
//! runs, then shared read-only. File names look like `03-beach.png`:
//! the ordinal prefix sets load order and is dropped from the key.
//! Each font family is exposed as two faces, `<name>Large` and
//! `<name>Small`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, info};

/// Point size of the large face
pub const LARGE_SIZE: f32 = 40.0;

/// Point size of the small face
pub const SMALL_SIZE: f32 = 25.0;

const LARGE_SUFFIX: &str = "Large";
const SMALL_SUFFIX: &str = "Small";

/// Asset loading errors. All of them abort startup.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to parse font {path}: {source}")]
    Font {
        path: PathBuf,
        source: ab_glyph::InvalidFont,
    },

    #[error("asset file name has no logical name: {0}")]
    InvalidName(PathBuf),

    #[error("duplicate {kind} name '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("no {kind} found")]
    Empty { kind: &'static str },
}

/// A font at a fixed pixel scale
#[derive(Clone)]
pub struct FontFace {
    pub font: FontArc,
    pub scale: PxScale,
}

impl FontFace {
    fn new(font: FontArc, size: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(size),
        }
    }
}

/// One font file, parsed once, at both sizes
#[derive(Clone)]
struct FontFamily {
    name: String,
    large: FontFace,
    small: FontFace,
}

/// Immutable collection of backgrounds and font faces
pub struct AssetCache {
    /// Load order is preserved; never empty
    images: Vec<(String, RgbaImage)>,
    image_index: HashMap<String, usize>,
    /// Load order is preserved; never empty
    families: Vec<FontFamily>,
}

impl AssetCache {
    /// Load every image and font under `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        let images_path = dir.join("images");
        let fonts_path = dir.join("fonts");

        let mut images = Vec::new();
        for (name, path) in list_assets(&images_path)? {
            let bytes = read(&path)?;
            let image = image::load_from_memory(&bytes)
                .map_err(|source| AssetError::Decode {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            info!("Loaded image '{}' from {}", name, path.display());
            images.push((name, image));
        }

        let mut fonts = Vec::new();
        for (name, path) in list_assets(&fonts_path)? {
            let bytes = read(&path)?;
            let font = FontArc::try_from_vec(bytes).map_err(|source| AssetError::Font {
                path: path.clone(),
                source,
            })?;
            info!("Loaded font '{}' from {}", name, path.display());
            fonts.push((name, font));
        }

        Self::from_parts(images, fonts)
    }

    /// Build a cache from already-decoded assets, in load order
    pub fn from_parts(
        images: Vec<(String, RgbaImage)>,
        fonts: Vec<(String, FontArc)>,
    ) -> Result<Self, AssetError> {
        if images.is_empty() {
            return Err(AssetError::Empty { kind: "images" });
        }
        if fonts.is_empty() {
            return Err(AssetError::Empty { kind: "fonts" });
        }

        let mut image_index = HashMap::new();
        for (i, (name, _)) in images.iter().enumerate() {
            if image_index.insert(name.clone(), i).is_some() {
                return Err(AssetError::Duplicate {
                    kind: "image",
                    name: name.clone(),
                });
            }
        }

        let mut families: Vec<FontFamily> = Vec::with_capacity(fonts.len());
        for (name, font) in fonts {
            if families.iter().any(|f| f.name == name) {
                return Err(AssetError::Duplicate { kind: "font", name });
            }
            families.push(FontFamily {
                large: FontFace::new(font.clone(), LARGE_SIZE),
                small: FontFace::new(font, SMALL_SIZE),
                name,
            });
        }

        Ok(Self {
            images,
            image_index,
            families,
        })
    }

    /// Look up a background by logical name
    pub fn image(&self, name: &str) -> Option<&RgbaImage> {
        self.image_index.get(name).map(|&i| &self.images[i].1)
    }

    /// Background names in load order
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up a face by `<family>Large` or `<family>Small`
    pub fn font(&self, name: &str) -> Option<&FontFace> {
        if let Some(family) = name.strip_suffix(LARGE_SUFFIX) {
            return self.family(family).map(|f| &f.large);
        }
        if let Some(family) = name.strip_suffix(SMALL_SUFFIX) {
            return self.family(family).map(|f| &f.small);
        }
        None
    }

    /// Face names in load order, large before small
    pub fn font_names(&self) -> Vec<String> {
        self.families
            .iter()
            .flat_map(|f| {
                [
                    format!("{}{}", f.name, LARGE_SUFFIX),
                    format!("{}{}", f.name, SMALL_SUFFIX),
                ]
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn font_count(&self) -> usize {
        self.families.len() * 2
    }

    /// Resolve a background, falling back to `default`, then to the
    /// first image loaded. Returns the name actually used.
    pub fn resolve_image<'a>(&'a self, name: &str, default: &str) -> (&'a str, &'a RgbaImage) {
        let index = self
            .image_index
            .get(name)
            .or_else(|| self.image_index.get(default))
            .copied()
            .unwrap_or(0);
        let (resolved, image) = &self.images[index];
        if resolved != name {
            debug!("Image '{}' not loaded, using '{}'", name, resolved);
        }
        (resolved.as_str(), image)
    }

    /// The large and small faces of the first font family
    pub fn primary_faces(&self) -> (&FontFace, &FontFace) {
        let family = &self.families[0];
        (&family.large, &family.small)
    }

    fn family(&self, name: &str) -> Option<&FontFamily> {
        self.families.iter().find(|f| f.name == name)
    }
}

/// Strip the ordinal prefix (through the last `-`) and the extension
/// (from the first `.`) off an asset file name
pub fn logical_name(file_name: &str) -> &str {
    let without_prefix = match file_name.rfind('-') {
        Some(i) => &file_name[i + 1..],
        None => file_name,
    };
    match without_prefix.find('.') {
        Some(i) => &without_prefix[..i],
        None => without_prefix,
    }
}

/// List the regular files in `dir` sorted by file name, with their logical names
fn list_assets(dir: &Path) -> Result<Vec<(String, PathBuf)>, AssetError> {
    let read_dir_err = |source: std::io::Error| AssetError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            debug!("Skipping hidden file {}", path.display());
            continue;
        }
        files.push((file_name, path));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    files
        .into_iter()
        .map(|(file_name, path)| {
            let name = logical_name(&file_name);
            if name.is_empty() {
                return Err(AssetError::InvalidName(path));
            }
            Ok((name.to_string(), path))
        })
        .collect()
}

fn read(path: &Path) -> Result<Vec<u8>, AssetError> {
    fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::test_utils::{test_cache, test_font};
    use super::*;
    use image::Rgba;

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("01-original.png"), "original");
        assert_eq!(logical_name("10-x-beach.jpg"), "beach");
        assert_eq!(logical_name("sky.png"), "sky");
        assert_eq!(logical_name("02-font.regular.ttf"), "font");
        assert_eq!(logical_name("03-noext"), "noext");
    }

    #[test]
    fn test_font_lookup() {
        let cache = test_cache(&["original"]);
        assert!(cache.font("dejavuLarge").is_some());
        assert!(cache.font("dejavuSmall").is_some());
        assert!(cache.font("dejavu").is_none());
        assert!(cache.font("otherLarge").is_none());
        assert_eq!(cache.font_names(), vec!["dejavuLarge", "dejavuSmall"]);

        let (large, small) = cache.primary_faces();
        assert_eq!(large.scale, PxScale::from(LARGE_SIZE));
        assert_eq!(small.scale, PxScale::from(SMALL_SIZE));
    }

    #[test]
    fn test_resolve_image_fallback() {
        let cache = test_cache(&["grey", "original", "beach"]);

        assert_eq!(cache.resolve_image("beach", "original").0, "beach");
        assert_eq!(cache.resolve_image("lava", "original").0, "original");
        // Default missing too: first in load order
        assert_eq!(cache.resolve_image("lava", "nope").0, "grey");
    }

    #[test]
    fn test_empty_parts_rejected() {
        let err = AssetCache::from_parts(Vec::new(), vec![("f".into(), test_font())]);
        assert!(matches!(err, Err(AssetError::Empty { kind: "images" })));

        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let err = AssetCache::from_parts(vec![("a".into(), img)], Vec::new());
        assert!(matches!(err, Err(AssetError::Empty { kind: "fonts" })));
    }

    #[test]
    fn test_duplicate_image_rejected() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let err = AssetCache::from_parts(
            vec![("a".into(), img.clone()), ("a".into(), img)],
            vec![("f".into(), test_font())],
        );
        assert!(matches!(err, Err(AssetError::Duplicate { kind: "image", .. })));
    }

    #[test]
    fn test_load_bundled_assets() {
        let cache = AssetCache::load(concat!(env!("CARGO_MANIFEST_DIR"), "/assets")).unwrap();
        assert_eq!(
            cache.image_names(),
            vec!["original", "grey", "beach", "sleepy", "friends", "melon", "sky"]
        );
        assert_eq!(cache.font_count(), 2);
        assert!(cache.image(crate::welcome::DEFAULT_IMAGE).is_some());
    }
}
