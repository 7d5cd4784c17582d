//! Engine configuration, stored as RON.
//!
//! Every field has a default, so a config file only needs to name what it changes:
//!
//! ```ron
//! (
//!     window: (width: 1280, height: 720),
//!     swapchain: (present_mode: Mailbox),
//!     background_shader: Some("cadence/shaders/gradient.comp.spv"),
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cadence_gpu::ash::vk;
use cadence_gpu::{ContextSettings, DeviceFeatures, SwapchainSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub application_name: String,
    pub window: WindowConfig,
    pub gpu: GpuConfig,
    pub swapchain: SwapchainConfig,
    pub pacing: PacingConfig,
    /// SPIR-V compute shader drawing the background. Without one the draw image is cleared.
    pub background_shader: Option<PathBuf>,
    pub logging: LoggingConfig,
    /// Start a Tracy client
    pub profiling: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: String::from("Example Vulkan Application"),
            window: WindowConfig::default(),
            gpu: GpuConfig::default(),
            swapchain: SwapchainConfig::default(),
            pacing: PacingConfig::default(),
            background_shader: None,
            logging: LoggingConfig::default(),
            profiling: false,
        }
    }
}

impl EngineConfig {
    /// Reads the config at `path`, or returns the defaults if there is none
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("    ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Settings for bringing up the GPU context
    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            application_name: self.application_name.clone(),
            api_version: self.gpu.api_version,
            enable_validation: self.gpu.validation,
            features: self.gpu.features.into(),
            ..Default::default()
        }
    }

    pub fn swapchain_settings(&self) -> SwapchainSettings {
        SwapchainSettings {
            surface_format: vk::SurfaceFormatKHR {
                format: self.swapchain.format.into(),
                color_space: self.swapchain.color_space.into(),
            },
            present_mode: self.swapchain.present_mode.into(),
            image_usage: self
                .swapchain
                .usage
                .iter()
                .fold(vk::ImageUsageFlags::empty(), |flags, usage| {
                    flags | vk::ImageUsageFlags::from(*usage)
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("Vulkan Engine"),
            width: 1700,
            height: 900,
        }
    }
}

impl WindowConfig {
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Minimum API version as `(major, minor, patch)`
    pub api_version: (u32, u32, u32),
    pub validation: bool,
    pub features: FeaturesConfig,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            api_version: (1, 3, 0),
            validation: cfg!(debug_assertions),
            features: FeaturesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
    pub buffer_device_address: bool,
    pub descriptor_indexing: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        let features = DeviceFeatures::default();
        Self {
            dynamic_rendering: features.dynamic_rendering,
            synchronization2: features.synchronization2,
            buffer_device_address: features.buffer_device_address,
            descriptor_indexing: features.descriptor_indexing,
        }
    }
}

impl From<FeaturesConfig> for DeviceFeatures {
    fn from(value: FeaturesConfig) -> Self {
        Self {
            dynamic_rendering: value.dynamic_rendering,
            synchronization2: value.synchronization2,
            buffer_device_address: value.buffer_device_address,
            descriptor_indexing: value.descriptor_indexing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapchainConfig {
    pub format: SurfaceFormat,
    pub color_space: ColorSpace,
    pub present_mode: PresentMode,
    pub usage: Vec<ImageUsage>,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            format: SurfaceFormat::Bgra8Unorm,
            color_space: ColorSpace::SrgbNonlinear,
            present_mode: PresentMode::Fifo,
            usage: vec![ImageUsage::ColorAttachment, ImageUsage::TransferDst],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceFormat {
    Bgra8Unorm,
    Bgra8Srgb,
    Rgba8Unorm,
    Rgba8Srgb,
    A2b10g10r10Unorm,
}

impl From<SurfaceFormat> for vk::Format {
    fn from(value: SurfaceFormat) -> Self {
        match value {
            SurfaceFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            SurfaceFormat::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            SurfaceFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            SurfaceFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
            SurfaceFormat::A2b10g10r10Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    SrgbNonlinear,
    ExtendedSrgbLinear,
    Hdr10St2084,
}

impl From<ColorSpace> for vk::ColorSpaceKHR {
    fn from(value: ColorSpace) -> Self {
        match value {
            ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
            ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentMode {
    Fifo,
    FifoRelaxed,
    Mailbox,
    Immediate,
}

impl From<PresentMode> for vk::PresentModeKHR {
    fn from(value: PresentMode) -> Self {
        match value {
            PresentMode::Fifo => vk::PresentModeKHR::FIFO,
            PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
            PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageUsage {
    ColorAttachment,
    TransferSrc,
    TransferDst,
    Storage,
}

impl From<ImageUsage> for vk::ImageUsageFlags {
    fn from(value: ImageUsage) -> Self {
        match value {
            ImageUsage::ColorAttachment => vk::ImageUsageFlags::COLOR_ATTACHMENT,
            ImageUsage::TransferSrc => vk::ImageUsageFlags::TRANSFER_SRC,
            ImageUsage::TransferDst => vk::ImageUsageFlags::TRANSFER_DST,
            ImageUsage::Storage => vk::ImageUsageFlags::STORAGE,
        }
    }
}

/// Timeouts and idling, in nanoseconds unless noted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub fence_timeout_ns: u64,
    pub acquire_timeout_ns: u64,
    pub immediate_timeout_ns: u64,
    /// Sleep between checks while the window is minimized
    pub minimized_idle_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            fence_timeout_ns: 1_000_000_000,
            acquire_timeout_ns: 1_000_000_000,
            immediate_timeout_ns: 9_999_999_999,
            minimized_idle_ms: 100,
        }
    }
}

impl PacingConfig {
    pub fn minimized_idle(&self) -> Duration {
        Duration::from_millis(self.minimized_idle_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub console_level: LogLevel,
    pub file_level: LogLevel,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: LogLevel::Debug,
            file_level: LogLevel::Trace,
            file: Some(PathBuf::from("cadence.log")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.window.extent(), vk::Extent2D { width: 1700, height: 900 });
        assert_eq!(config.pacing.fence_timeout_ns, 1_000_000_000);
        assert_eq!(config.pacing.minimized_idle(), Duration::from_millis(100));
    }

    #[test]
    fn defaults_match_context_defaults() {
        let settings = EngineConfig::default().context_settings();
        let defaults = ContextSettings::default();
        assert_eq!(settings.features, defaults.features);
        assert_eq!(settings.api_version, defaults.api_version);
        assert_eq!(
            EngineConfig::default().swapchain_settings(),
            SwapchainSettings::default()
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"(
                window: (width: 1280, height: 720),
                swapchain: (present_mode: Mailbox, usage: [ColorAttachment, TransferDst, Storage]),
                background_shader: Some("shaders/gradient.comp.spv"),
            )"#,
        );
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.window.title, "Vulkan Engine");
        assert_eq!(config.window.width, 1280);
        assert_eq!(
            config.background_shader,
            Some(PathBuf::from("shaders/gradient.comp.spv"))
        );

        let swapchain = config.swapchain_settings();
        assert_eq!(swapchain.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(swapchain.surface_format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(
            swapchain.image_usage,
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::STORAGE
        );
        assert_eq!(config.window.extent(), vk::Extent2D { width: 1280, height: 720 });
    }

    #[test]
    fn written_config_reads_back() {
        let mut config = EngineConfig::default();
        config.profiling = true;
        config.logging.file = None;
        config.pacing.minimized_idle_ms = 5;
        let file = write_config(&config.to_ron().unwrap());
        assert_eq!(EngineConfig::load(Some(file.path())).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(Some(&dir.path().join("missing.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let file = write_config("(window: (width: \"wide\"))");
        let err = EngineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn shipped_config_loads_with_and_without_shader() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("cadence.ron");
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.background_shader, None);

        let contents = std::fs::read_to_string(&path).unwrap();
        let with_shader = contents.replace(
            "    background_shader: None,",
            "    background_shader: Some(\"cadence/shaders/gradient.comp.spv\"),",
        );
        assert_ne!(with_shader, contents);
        let file = write_config(&with_shader);
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(
            config.background_shader,
            Some(PathBuf::from("cadence/shaders/gradient.comp.spv"))
        );
    }
}
