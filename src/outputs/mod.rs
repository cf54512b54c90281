//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: writes aggregation results, topic listings and timelines as JSON
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2026-10-17/
//!     ├── ai-development_142501.json
//!     └── ai-development_142501_timeline.json
//! ```
//!
//! Without an output directory the JSON is printed to stdout instead.

pub mod json;
