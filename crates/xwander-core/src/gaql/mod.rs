//! GAQL (Google Ads Query Language) Module
//!
//! Provides:
//! - `GaqlBuilder`, a fluent clause accumulator
//! - `validate` / `pretty_print` for built or hand-written queries
//! - `QueryTemplates`, prebuilt report queries

pub mod builder;
pub mod format;
pub mod templates;

pub use builder::{GaqlBuilder, DATE_FIELD};
pub use format::{pretty_print, pretty_print_with_indent, validate};
pub use templates::{QueryTemplates, TemplateParams, TEMPLATE_NAMES};
