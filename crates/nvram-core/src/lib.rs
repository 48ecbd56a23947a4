//! # nvram-core
//!
//! A library for converting DD-WRT NVRAM backup images to editable text and back.
//!
//! This crate provides the core functionality for:
//! - Parsing and writing the length-prefixed binary backup format
//! - Escaping arbitrary bytes into printable `name=value` lines and back
//! - Reading the human-friendly multi-line variant of the text form
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`image`]: Binary image reading, writing and streaming output
//! - [`escape`]: Backslash escaping of raw bytes
//! - [`text`]: Line-oriented text parsing and rendering
//! - [`diag`]: Per-record diagnostics and sinks
//! - [`convert`]: Whole-buffer conversions in both directions
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use nvram_core::{convert, EscapeMode, NullSink, RenderConfig};
//!
//! let text = b"wl_ssid=MyNet\\x01\nmotd=line1\\\nline2\n";
//! let image = convert::build(text, NullSink)?;
//!
//! let config = RenderConfig::new().mode(EscapeMode::Human);
//! let dumped = convert::dump(&image, &config, NullSink)?;
//! assert_eq!(dumped.as_bytes(), &text[..]);
//! # Ok::<(), nvram_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`DiagnosticSink`]: Decide where per-record reports go
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod convert;
pub mod diag;
pub mod error;
pub mod escape;
pub mod image;
pub mod record;
pub mod text;

// Re-export primary types for convenience
pub use diag::{Diagnostic, DiagnosticSink, Location, NullSink, Severity, TracingSink};
pub use error::{Error, RecordField, Result};
pub use escape::EscapeMode;
pub use image::ImageWriter;
pub use record::{Record, MAX_NAME_LEN, MAX_RECORDS, MAX_VALUE_LEN};
pub use text::{RenderConfig, Renderer};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
