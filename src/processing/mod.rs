pub mod field_mapper;
pub mod grant_clause;
pub mod identifiers;
pub mod image;
pub mod normalize;
pub mod ocr;

pub use field_mapper::map_fields;
pub use grant_clause::GrantParties;
pub use identifiers::overlay_identifiers;
pub use image::{InputKind, TransientImage};
pub use normalize::normalize;
pub use ocr::{TesseractCli, TextRecognizer};
