//! video-hpp-gen — video codec registry XML → C++ `vulkan_video.hpp` generator.
//!
//! Reads the Vulkan video registry (`video.xml`), resolves which extension
//! emits each struct and in which order, and writes a header that wraps the
//! C codec types in scoped enums and structs binary-compatible with the C
//! definitions.
//!
//! # Quick start
//!
//! Generate and write the header (suitable for `build.rs`):
//!
//! ```no_run
//! use std::path::Path;
//! use video_hpp_gen::config::Config;
//!
//! let cfg = Config::default();
//! video_hpp_gen::run(&cfg, Some(Path::new("registry/video.xml"))).unwrap();
//! ```
//!
//! Or get the header text without touching the disk:
//!
//! ```no_run
//! use video_hpp_gen::config::Config;
//!
//! let xml = std::fs::read_to_string("registry/video.xml").unwrap();
//! let header = video_hpp_gen::generate_from_str(&Config::default(), &xml).unwrap();
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use roxmltree::Document;
use tracing::info;

pub mod check;
pub mod config;
pub mod diag;
pub mod emit;
pub mod model;
pub mod naming;
pub mod reader;
pub mod resolve;
pub mod template;
pub mod xml;

#[cfg(test)]
mod test_support;

use config::Config;
use model::Registry;

impl Registry {
    /// Read a parsed registry document and run every pass up to and
    /// including the correctness check. The result is ready for
    /// [`emit::emit_header`].
    pub fn from_document(cfg: &Config, doc: &Document<'_>) -> Result<Registry> {
        let mut registry = reader::read_document(cfg, doc)?;
        resolve::add_implicitly_required_types(&mut registry)?;
        resolve::sort_structs(&mut registry)?;
        check::check_correctness(&mut registry, &cfg.naming.type_prefix)?;
        Ok(registry)
    }
}

/// Run the full pipeline: read the registry, generate the header, write it
/// and run the configured formatter.
///
/// `input` overrides `cfg.input`. Returns the path the header was written
/// to.
pub fn run(cfg: &Config, input: Option<&Path>) -> Result<PathBuf> {
    let input = input.unwrap_or(&cfg.input);
    let header = generate(cfg, input)?;

    let output_path = cfg.output.file.clone();
    emit::write_header(&output_path, &header)?;
    info!(
        path = %output_path.display(),
        size = header.len(),
        "wrote header"
    );

    if let Some(format) = &cfg.format {
        emit::format_header(format, &output_path);
    }
    Ok(output_path)
}

/// Read the registry at `input` and return the generated header without
/// writing it.
pub fn generate(cfg: &Config, input: &Path) -> Result<String> {
    info!(path = %input.display(), "loading registry");
    let xml = std::fs::read_to_string(input)
        .with_context(|| format!("reading registry {}", input.display()))?;
    generate_from_str(cfg, &xml)
}

/// Generate the header from registry XML text.
pub fn generate_from_str(cfg: &Config, xml: &str) -> Result<String> {
    info!(size = xml.len(), "parsing registry");
    let doc = Document::parse(xml).context("parsing registry XML")?;
    let registry = Registry::from_document(cfg, &doc)?;

    info!(
        extensions = registry.extensions.len(),
        warnings = registry.warnings.len(),
        "generating header"
    );
    emit::emit_header(cfg, &registry)
}
