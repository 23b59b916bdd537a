use crate::utils::command::run_tool;
use crate::utils::{DeedError, Result};
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "tif", "tiff", "jpg", "png"];

/// How an input file is turned into page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Tiff,
    Image,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(DeedError::UnsupportedFileType(path.to_path_buf()));
        }
        Ok(match ext.as_str() {
            "pdf" => InputKind::Pdf,
            "tif" | "tiff" => InputKind::Tiff,
            _ => InputKind::Image,
        })
    }
}

/// A page image written to a uniquely named temporary PNG for the
/// recognizer. The file is removed when this value is dropped.
pub struct TransientImage {
    file: NamedTempFile,
}

impl TransientImage {
    pub fn write(image: &DynamicImage) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("deedscan_page_")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        Ok(TransientImage { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Rasterize every page of a PDF with pdftoppm, in page order.
pub fn pdf_to_images(pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
    let temp_dir = TempDir::new()?;
    let output_prefix = temp_dir.path().join("page");
    let dpi_str = dpi.to_string();

    let mut command = Command::new("pdftoppm");
    command
        .args(["-png", "-r", &dpi_str])
        .arg(pdf_path)
        .arg(&output_prefix);
    run_tool(command, "pdftoppm", DeedError::Rasterization)?;

    let pages = collect_page_images(temp_dir.path())?;
    if pages.is_empty() {
        return Err(DeedError::Rasterization(format!(
            "No pages rendered from {}",
            pdf_path.display()
        )));
    }
    debug!("Rendered {} pages from {:?} at {} dpi", pages.len(), pdf_path, dpi);

    pages.iter().map(|page| load_image(page)).collect()
}

/// Find pdftoppm output (`page-1.png`, `page-01.png`, ...) sorted by page
/// number rather than by name.
pub fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("page-"))
            .and_then(|n| n.strip_suffix(".png"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Convert a (multi-page) TIFF into a searchable PDF inside `out_dir`.
///
/// The intermediate image-only PDF is removed on every path. Any failure of
/// either external pass is returned as `Conversion`.
pub fn tiff_to_searchable_pdf(tiff_path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let conversion = |e: DeedError| DeedError::Conversion {
        path: tiff_path.to_path_buf(),
        message: e.to_string(),
    };

    fs::create_dir_all(out_dir)?;
    let temp_pdf = tempfile::Builder::new()
        .prefix("temp_")
        .suffix(".pdf")
        .tempfile_in(out_dir)?;
    let output = tempfile::Builder::new()
        .prefix("converted_")
        .suffix(".pdf")
        .tempfile_in(out_dir)?;

    let mut tiff2pdf = Command::new("tiff2pdf");
    tiff2pdf.arg("-o").arg(temp_pdf.path()).arg(tiff_path);
    run_tool(tiff2pdf, "tiff2pdf", DeedError::Rasterization).map_err(conversion)?;

    let mut ocrmypdf = Command::new("ocrmypdf");
    ocrmypdf
        .args(["--force-ocr", "--deskew", "--rotate-pages"])
        .arg(temp_pdf.path())
        .arg(output.path());
    run_tool(ocrmypdf, "ocrmypdf", DeedError::Rasterization).map_err(conversion)?;

    let (_, pdf_path) = output.keep().map_err(|e| DeedError::Io(e.error))?;
    info!("Converted {:?} to searchable PDF {:?}", tiff_path, pdf_path);
    Ok(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind_by_extension() {
        assert_eq!(InputKind::from_path(Path::new("a/deed.PDF")).unwrap(), InputKind::Pdf);
        assert_eq!(InputKind::from_path(Path::new("scan.tif")).unwrap(), InputKind::Tiff);
        assert_eq!(InputKind::from_path(Path::new("scan.TIFF")).unwrap(), InputKind::Tiff);
        assert_eq!(InputKind::from_path(Path::new("page.jpg")).unwrap(), InputKind::Image);
        assert_eq!(InputKind::from_path(Path::new("page.png")).unwrap(), InputKind::Image);
    }

    #[test]
    fn test_rejects_other_extensions() {
        for name in ["notes.docx", "page.jpeg", "README", "scan.pdf.bak"] {
            let err = InputKind::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, DeedError::UnsupportedFileType(_)), "{}", name);
        }
    }

    #[test]
    fn test_transient_image_removed_on_drop() {
        let image = DynamicImage::new_rgb8(8, 8);
        let first = TransientImage::write(&image).unwrap();
        let second = TransientImage::write(&image).unwrap();
        let path = first.path().to_path_buf();
        assert!(path.exists());
        assert_ne!(path, second.path());
        assert!(load_image(&path).is_ok());
        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn test_page_images_sorted_numerically() {
        let temp = TempDir::new().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "other.png"] {
            fs::write(temp.path().join(name), b"png").unwrap();
        }
        let pages = collect_page_images(temp.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn test_failed_conversion_leaves_no_temp_pdf() {
        let out = TempDir::new().unwrap();
        let result = tiff_to_searchable_pdf(Path::new("/nonexistent/scan.tif"), out.path());
        assert!(matches!(result, Err(DeedError::Conversion { .. })));
        let leftovers: Vec<_> = fs::read_dir(out.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
