//! Discovery and loading of stimulus images, one test case per file.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use walkdir::WalkDir;

use crate::HarnessError;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Image files directly inside `dir`, sorted by path.
pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<DynamicImage, HarnessError> {
    Ok(image::open(path)?)
}

/// Case name derived from the file name.
pub fn case_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn discovers_only_images_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b.png", "a.JPG", "e.bmp", "d.GIF", "c.webp", "notes.txt", "header.bin",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.png"), b"").unwrap();

        let names: Vec<_> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| case_name(p))
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.webp", "d.GIF", "e.bmp"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path().join("absent")).is_err());
    }

    #[test]
    fn loads_rgb_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.png");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&path).unwrap();

        let image = load(&path).unwrap();
        assert_eq!(image.color(), image::ColorType::Rgb8);
        assert_eq!((image.width(), image.height()), (8, 8));
    }
}
