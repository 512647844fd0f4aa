//! # Utility Functions and Types
//!
//! Helpers shared by the manifest decoder and encoder:
//!
//! - Attribute-list tokenizing (`NAME=VALUE,NAME="quoted"`)
//! - Enumerated `YES` / `NO` strings
//! - Float, duration and date-time rendering
//!
//! ## Attribute Lists
//!
//! ```rust
//! use hlsio::utils::parse_attributes;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let attrs = parse_attributes(r#"URI="init.mp4",BYTERANGE=720@0"#)?;
//! assert_eq!(attrs[0].name, "URI");
//! assert_eq!(attrs[1].value, "720@0");
//! # Ok(())
//! # }
//! ```
//!
//! ## Numbers
//!
//! ```rust
//! use hlsio::utils::{format_duration, format_float};
//!
//! assert_eq!(format_float(3.0), "3");
//! assert_eq!(format_duration(9.1, true), "10");
//! assert_eq!(format_duration(9.1, false), "9.100");
//! ```

/// Attribute-list parsing
pub mod attributes;

/// Number and date-time formatting
pub mod numbers;

pub use attributes::*;
pub use numbers::*;
