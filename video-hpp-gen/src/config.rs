//! Configuration types for `video-hpp-gen.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::naming::strip_postfix;

/// Root configuration.
///
/// Every section has defaults matching the Vulkan video registry, so an
/// empty file (or [`Config::default`]) generates `vulkan_video.hpp`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry XML to read when the caller does not pass one explicitly.
    pub input: PathBuf,
    pub output: OutputConfig,
    pub naming: NamingConfig,
    pub registry: RegistryConfig,
    /// `#include` targets written at the top of the generated header, in
    /// order.
    pub includes: Vec<String>,
    /// External formatter run on the written file. `None` skips formatting.
    pub format: Option<FormatConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("video.xml"),
            output: OutputConfig::default(),
            naming: NamingConfig::default(),
            registry: RegistryConfig::default(),
            includes: default_includes(),
            format: None,
        }
    }
}

fn default_includes() -> Vec<String> {
    [
        "vk_video/vulkan_video_codecs_common.h",
        "vk_video/vulkan_video_codec_h264std.h",
        "vk_video/vulkan_video_codec_h264std_decode.h",
        "vk_video/vulkan_video_codec_h264std_encode.h",
        "vk_video/vulkan_video_codec_h265std.h",
        "vk_video/vulkan_video_codec_h265std_decode.h",
        "vk_video/vulkan_video_codec_h265std_encode.h",
        "vulkan/vulkan.hpp",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Output file settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file path (e.g. `vulkan/vulkan_video.hpp`).
    pub file: PathBuf,
    /// Include guard macro.
    pub guard: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("vulkan_video.hpp"),
            guard: "VULKAN_VIDEO_HPP".to_string(),
        }
    }
}

/// Names used when turning registry identifiers into C++ identifiers.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Domain prefix of registry-owned types. Stripped from emitted type
    /// names and used to tell registry types from primitives.
    pub type_prefix: String,
    /// Outer namespace macro.
    pub namespace: String,
    /// Inner namespace macro.
    pub video_namespace: String,
    /// Value the inner namespace macro gets when the includer leaves it
    /// undefined.
    pub video_namespace_default: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            type_prefix: "StdVideo".to_string(),
            namespace: "VULKAN_HPP_NAMESPACE".to_string(),
            video_namespace: "VULKAN_HPP_VIDEO_NAMESPACE".to_string(),
            video_namespace_default: "video".to_string(),
        }
    }
}

impl NamingConfig {
    /// `outer::inner`, the qualification of emitted domain types.
    pub fn qualified_namespace(&self) -> String {
        format!("{}::{}", self.namespace, self.video_namespace)
    }
}

/// Registry schema knobs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// The only accepted value of an extension's `supported` attribute.
    pub supported: String,
    /// Directory part of codec header names (`vk_video/`).
    pub header_dir: String,
    /// File stem shared by all codec headers (`vulkan_video_codec`).
    pub header_stem: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            supported: "vulkan".to_string(),
            header_dir: "vk_video/".to_string(),
            header_stem: "vulkan_video_codec".to_string(),
        }
    }
}

impl RegistryConfig {
    /// If `name` is a codec header path, returns the extension it stands
    /// for (`vk_video/vulkan_video_codec_h264std.h` → `vulkan_video_codec_h264std`).
    pub fn header_extension<'a>(&self, name: &'a str) -> Option<&'a str> {
        let rest = name.strip_prefix(self.header_dir.as_str())?;
        if !rest.starts_with(self.header_stem.as_str()) || !rest.ends_with(".h") {
            return None;
        }
        Some(strip_postfix(rest, ".h"))
    }
}

/// External formatter invocation.
///
/// ```toml
/// [format]
/// program = "clang-format"
/// args = ["-i", "--style=file"]
/// ```
///
/// The output path is appended as the last argument.
#[derive(Debug, Deserialize)]
pub struct FormatConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Load and parse a `video-hpp-gen.toml` configuration file.
///
/// Relative `input` and `output.file` paths are resolved against the
/// directory containing the config file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let mut config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.input = resolve_path(&config.input, base_dir);
    config.output.file = resolve_path(&config.output.file, base_dir);
    Ok(config)
}

/// Absolute paths are returned as-is, relative ones are joined to
/// `base_dir`.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
