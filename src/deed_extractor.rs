use crate::config::BatchConfig;
use crate::export;
use crate::models::{DocumentResult, OcrLine, PageResult};
use crate::ner::{self, EntityExtractor};
use crate::processing::grant_clause;
use crate::processing::identifiers::overlay_identifiers;
use crate::processing::image::{self as raster, InputKind, TransientImage};
use crate::processing::ocr::{default_recognizer, TextRecognizer};
use crate::processing::map_fields;
use crate::utils::{DeedError, PipelineStage, Result};
use chrono::Local;
use image::DynamicImage;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Results of a completed batch and where they were written.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: DocumentResult,
    pub output_path: PathBuf,
}

/// Mean confidence over every recognized line, rounded to four decimals.
pub fn average_confidence(lines: &[OcrLine]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let mean = lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64;
    (mean * 10_000.0).round() / 10_000.0
}

/// Text of the lines strictly above `threshold`, one per line.
pub fn confident_text(lines: &[OcrLine], threshold: f64) -> String {
    lines
        .iter()
        .filter(|l| l.confidence > threshold)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-batch pipeline: recognizer and entity models are loaded once and
/// reused for every page.
pub struct DeedExtractor {
    config: BatchConfig,
    recognizer: Box<dyn TextRecognizer>,
    person_extractor: Box<dyn EntityExtractor>,
    entity_extractor: Box<dyn EntityExtractor>,
}

impl DeedExtractor {
    /// Load the configured models. Fails before any page is touched if a
    /// model key is unknown or a model cannot be loaded.
    pub fn new(config: BatchConfig) -> Result<Self> {
        let person_extractor = ner::load_extractor(config.person_model_choice()?, &config.model_dir)?;
        let entity_extractor = ner::load_extractor(config.model_choice()?, &config.model_dir)?;
        let recognizer = default_recognizer(&config.ocr_language);
        Ok(Self::with_components(config, recognizer, person_extractor, entity_extractor))
    }

    pub fn with_components(
        config: BatchConfig,
        recognizer: Box<dyn TextRecognizer>,
        person_extractor: Box<dyn EntityExtractor>,
        entity_extractor: Box<dyn EntityExtractor>,
    ) -> Self {
        DeedExtractor {
            config,
            recognizer,
            person_extractor,
            entity_extractor,
        }
    }

    pub fn process_page(&self, image: &DynamicImage, page: usize, source_file: &str) -> Result<PageResult> {
        let lines = {
            let transient = TransientImage::write(image)
                .map_err(|e| e.at_page(source_file, page, PipelineStage::TransientImage))?;
            self.recognizer
                .recognize(transient.path())
                .map_err(|e| e.at_page(source_file, page, PipelineStage::Recognition))?
        };
        self.process_lines(&lines, page, source_file)
    }

    /// Everything after recognition: extraction, mapping and overrides.
    pub fn process_lines(&self, lines: &[OcrLine], page: usize, source_file: &str) -> Result<PageResult> {
        let threshold = self.config.confidence_threshold;
        let full_text = confident_text(lines, threshold);
        let confidence_avg = average_confidence(lines);
        debug!(
            "{} page {}: {} lines, {} above threshold, avg confidence {}",
            source_file,
            page,
            lines.len(),
            lines.iter().filter(|l| l.confidence > threshold).count(),
            confidence_avg
        );

        let persons = self
            .person_extractor
            .extract(&full_text)
            .map_err(|e| e.at_page(source_file, page, PipelineStage::PersonExtraction))?;
        let parties = grant_clause::resolve(&full_text, &ner::person_entities(persons))
            .map_err(|e| e.at_page(source_file, page, PipelineStage::GrantResolution))?;

        let entities = self
            .entity_extractor
            .extract(&full_text)
            .map_err(|e| e.at_page(source_file, page, PipelineStage::EntityExtraction))?;
        let mut fields = map_fields(&entities);

        if !parties.grantor.is_empty() {
            fields.seller_name = parties.grantor;
        }
        if !parties.grantee.is_empty() {
            fields.buyer_name = parties.grantee;
        }
        if self.config.extract_identifiers {
            overlay_identifiers(&mut fields, &full_text);
        }

        Ok(PageResult {
            fields,
            confidence_avg,
            page,
            source_file: source_file.to_string(),
            confidence_threshold: threshold,
        })
    }

    /// Rasterize one input and process its pages in order.
    pub fn process_file(&self, path: &Path) -> Result<Vec<PageResult>> {
        let source_file = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let pages = match InputKind::from_path(path)? {
            InputKind::Pdf => raster::pdf_to_images(path, self.config.dpi)?,
            InputKind::Tiff if self.config.convert_tiff => {
                let pdf = raster::tiff_to_searchable_pdf(path, &self.config.output_dir)?;
                raster::pdf_to_images(&pdf, self.config.dpi)?
            }
            InputKind::Tiff | InputKind::Image => vec![raster::load_image(path)?],
        };
        info!("Processing {} ({} pages)", source_file, pages.len());
        self.process_pages(&pages, &source_file)
    }

    /// Process rasterized pages of one file, numbering them from 1.
    pub fn process_pages(&self, pages: &[DynamicImage], source_file: &str) -> Result<Vec<PageResult>> {
        pages
            .iter()
            .enumerate()
            .map(|(i, image)| self.process_page(image, i + 1, source_file))
            .collect()
    }

    /// Process every file in upload order, flattening pages.
    pub fn process_files(&self, files: &[PathBuf]) -> Result<DocumentResult> {
        let mut results = Vec::new();
        for file in files {
            results.extend(self.process_file(file)?);
        }
        Ok(results)
    }

    /// Extract every file and write one export stamped with the batch start
    /// time.
    pub fn run(&self, files: &[PathBuf]) -> Result<BatchOutcome> {
        check_inputs(files)?;
        let config = &self.config;
        fs::create_dir_all(&config.output_dir)?;
        let timestamp = export::batch_timestamp(&Local::now());

        let results = self.process_files(files)?;
        if results.is_empty() {
            warn!("No pages were produced from {} files", files.len());
        }
        let output_path = export::write_results(&results, config.format, &config.output_dir, &timestamp)?;
        Ok(BatchOutcome { results, output_path })
    }
}

fn check_inputs(files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        return Err(DeedError::EmptyInput);
    }
    for file in files {
        InputKind::from_path(file)?;
    }
    Ok(())
}

/// Validate inputs and configuration, then extract and export one batch.
///
/// No directory is created and no model is loaded unless every input has an
/// accepted extension and the configuration is valid.
pub fn run_batch(files: &[PathBuf], config: &BatchConfig) -> Result<BatchOutcome> {
    check_inputs(files)?;
    config.validate()?;
    info!(
        "Starting batch: {} files, model {}, person model {}, threshold {}",
        files.len(),
        config.model,
        config.person_model,
        config.confidence_threshold
    );

    DeedExtractor::new(config.clone())?.run(files)
}
