use crate::models::{BoundingBox, OcrLine};
use crate::utils::command::run_tool;
use crate::utils::{DeedError, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Page-image text recognizer.
pub trait TextRecognizer {
    fn name(&self) -> &str;

    /// Recognize text lines in reading order, each with a confidence in [0, 1].
    fn recognize(&self, image_path: &Path) -> Result<Vec<OcrLine>>;
}

// TSV columns: level page_num block_num par_num line_num word_num
//              left top width height conf text
const WORD_LEVEL: u32 = 5;
const TSV_MIN_COLUMNS: usize = 11;

#[derive(Debug)]
struct LineAccumulator {
    key: (u32, u32, u32, u32),
    bbox: BoundingBox,
    words: Vec<String>,
    confidence_sum: f64,
}

impl LineAccumulator {
    fn finish(self) -> OcrLine {
        let count = self.words.len() as f64;
        OcrLine {
            bbox: self.bbox,
            text: self.words.join(" "),
            confidence: (self.confidence_sum / count / 100.0).clamp(0.0, 1.0),
        }
    }
}

/// Group Tesseract TSV word rows into lines.
///
/// Rows that are not words, have a negative confidence or blank text are
/// ignored. Header and malformed rows are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<LineAccumulator> = Vec::new();

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < TSV_MIN_COLUMNS {
            continue;
        }
        let nums: Option<Vec<u32>> = cols[..10].iter().map(|c| c.trim().parse().ok()).collect();
        let nums = match nums {
            Some(nums) => nums,
            None => continue,
        };
        if nums[0] != WORD_LEVEL {
            continue;
        }
        let conf: f64 = match cols[10].trim().parse() {
            Ok(conf) if conf >= 0.0 => conf,
            _ => continue,
        };
        let word = cols.get(11).map(|t| t.trim()).unwrap_or("");
        if word.is_empty() {
            continue;
        }

        let key = (nums[1], nums[2], nums[3], nums[4]);
        let bbox = BoundingBox {
            left: nums[6],
            top: nums[7],
            width: nums[8],
            height: nums[9],
        };
        if let Some(line) = lines.last_mut().filter(|line| line.key == key) {
            line.bbox = line.bbox.union(&bbox);
            line.words.push(word.to_string());
            line.confidence_sum += conf;
            continue;
        }
        lines.push(LineAccumulator {
            key,
            bbox,
            words: vec![word.to_string()],
            confidence_sum: conf,
        });
    }

    lines.into_iter().map(LineAccumulator::finish).collect()
}

/// Recognizer backed by the `tesseract` command-line tool.
pub struct TesseractCli {
    language: String,
}

impl TesseractCli {
    pub fn new(language: &str) -> Self {
        TesseractCli {
            language: language.to_string(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image_path: &Path) -> Result<Vec<OcrLine>> {
        let mut command = Command::new("tesseract");
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv");
        let stdout = run_tool(command, "tesseract", DeedError::Recognition)?;
        let lines = parse_tsv(&String::from_utf8_lossy(&stdout));
        debug!("tesseract recognized {} lines in {:?}", lines.len(), image_path);
        Ok(lines)
    }
}

/// Recognizer backed by the linked libtesseract.
#[cfg(feature = "libtesseract")]
pub struct TesseractLib {
    language: String,
}

#[cfg(feature = "libtesseract")]
impl TesseractLib {
    pub fn new(language: &str) -> Self {
        TesseractLib {
            language: language.to_string(),
        }
    }
}

#[cfg(feature = "libtesseract")]
impl TextRecognizer for TesseractLib {
    fn name(&self) -> &str {
        "libtesseract"
    }

    fn recognize(&self, image_path: &Path) -> Result<Vec<OcrLine>> {
        use tesseract::Tesseract;

        let path_str = image_path
            .to_str()
            .ok_or_else(|| DeedError::Recognition("Image path is not valid UTF-8".to_string()))?;

        let mut tess = Tesseract::new(None, Some(self.language.as_str()))
            .map_err(|e| DeedError::Recognition(format!("Tesseract init error: {}", e)))?
            .set_image(path_str)
            .map_err(|e| DeedError::Recognition(format!("Tesseract set image error: {}", e)))?
            .recognize()
            .map_err(|e| DeedError::Recognition(format!("Tesseract recognize error: {}", e)))?;
        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| DeedError::Recognition(format!("Tesseract TSV error: {}", e)))?;

        Ok(parse_tsv(&tsv))
    }
}

/// Pick the recognizer compiled into this build.
pub fn default_recognizer(language: &str) -> Box<dyn TextRecognizer> {
    #[cfg(feature = "libtesseract")]
    {
        Box::new(TesseractLib::new(language))
    }
    #[cfg(not(feature = "libtesseract"))]
    {
        Box::new(TesseractCli::new(language))
    }
}
