//! Common test utilities - on-disk databases and asset trees

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use welcomed::db::Database;
use welcomed::welcome::WelcomeStore;

/// Bundled asset directory shipped with the crate
pub fn bundled_assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

/// The bundled font file
pub fn bundled_font() -> PathBuf {
    bundled_assets().join("fonts").join("01-dejavu.ttf")
}

/// A store backed by a WAL-mode SQLite file in a temp directory
pub async fn file_store(dir: &TempDir) -> WelcomeStore {
    let path = dir.path().join("welcome.db");
    let db = Database::with_max_connections(path.to_str(), 8)
        .await
        .expect("Failed to create test database");
    WelcomeStore::new(db.pool().clone())
}

/// Builder for an `images/` + `fonts/` tree
pub struct AssetTree {
    pub dir: TempDir,
}

impl AssetTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("images")).unwrap();
        std::fs::create_dir(dir.path().join("fonts")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a solid PNG background
    pub fn image(self, file_name: &str, width: u32, height: u32) -> Self {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 60, 90, 255]));
        img.save_with_format(self.path().join("images").join(file_name), ImageFormat::Png)
            .unwrap();
        self
    }

    /// Copy the bundled font under a new name
    pub fn font(self, file_name: &str) -> Self {
        std::fs::copy(bundled_font(), self.path().join("fonts").join(file_name)).unwrap();
        self
    }

    /// Write arbitrary bytes into a subdirectory
    pub fn raw(self, subdir: &str, file_name: &str, bytes: &[u8]) -> Self {
        std::fs::write(self.path().join(subdir).join(file_name), bytes).unwrap();
        self
    }
}
