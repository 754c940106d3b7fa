//! Helpers shared by the extraction and resolution passes.

pub mod attributes;
pub mod paths;

#[doc(inline)]
pub use attributes::{doc_lines, has_cfg_test, DocLine};
