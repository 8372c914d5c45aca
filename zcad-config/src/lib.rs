use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "ZCAD_DXF_CONFIG";

/// 转换器配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub precision: PrecisionConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub xdata: XDataConfig,
}

impl ConverterConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ZCAD_DXF_CONFIG`，否则寻找 `./config/dxf.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("dxf.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 几何比较容差。
#[derive(Debug, Clone, Deserialize)]
pub struct PrecisionConfig {
    #[serde(default = "PrecisionConfig::default_eps")]
    pub eps: f64,
}

impl PrecisionConfig {
    fn default_eps() -> f64 {
        1e-6
    }
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            eps: Self::default_eps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// 曲线离散为折线时的弦高误差。
    #[serde(default = "ImportConfig::default_approximation_precision")]
    pub approximation_precision: f64,
    #[serde(default = "ImportConfig::default_import_paper_space")]
    pub import_paper_space: bool,
}

impl ImportConfig {
    fn default_approximation_precision() -> f64 {
        0.01
    }

    fn default_import_paper_space() -> bool {
        true
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            approximation_precision: Self::default_approximation_precision(),
            import_paper_space: Self::default_import_paper_space(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// 路径导出为匿名块加插入，否则展开为独立实体。
    #[serde(default = "ExportConfig::default_paths_as_blocks")]
    pub paths_as_blocks: bool,
    /// 壳的每个面单独导出为一个网格实体。
    #[serde(default)]
    pub single_mesh_per_face: bool,
    /// 使用 MESH 实体代替多面网格。
    #[serde(default)]
    pub use_mesh: bool,
}

impl ExportConfig {
    fn default_paths_as_blocks() -> bool {
        true
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            paths_as_blocks: Self::default_paths_as_blocks(),
            single_mesh_per_face: false,
            use_mesh: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct XDataConfig {
    /// 严格模式下未知或类型不符的扩展数据记录视为错误。
    #[serde(default = "XDataConfig::default_strict")]
    pub strict: bool,
}

impl XDataConfig {
    fn default_strict() -> bool {
        cfg!(debug_assertions)
    }
}

impl Default for XDataConfig {
    fn default() -> Self {
        Self {
            strict: Self::default_strict(),
        }
    }
}

/// 按配置安装全局 tracing 订阅者；等级无效时退回 `info`，已安装时忽略。
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_new(config.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = ConverterConfig::discover().expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert!((cfg.precision.eps - 1e-6).abs() < 1e-18);
        assert!((cfg.import.approximation_precision - 0.01).abs() < 1e-12);
        assert!(cfg.import.import_paper_space);
        assert!(cfg.export.paths_as_blocks);
        assert!(!cfg.export.single_mesh_per_face);
        assert!(!cfg.export.use_mesh);
        assert_eq!(cfg.xdata.strict, cfg!(debug_assertions));
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [precision]
            eps = 1e-8

            [import]
            import_paper_space = false

            [export]
            paths_as_blocks = false
            use_mesh = true

            [xdata]
            strict = false
            "#
        )
        .unwrap();

        let cfg = ConverterConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!((cfg.precision.eps - 1e-8).abs() < 1e-20);
        assert!(!cfg.import.import_paper_space);
        assert!((cfg.import.approximation_precision - 0.01).abs() < 1e-12);
        assert!(!cfg.export.paths_as_blocks);
        assert!(cfg.export.use_mesh);
        assert!(!cfg.xdata.strict);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[precision]\neps = \"tiny\"").unwrap();
        let err = ConverterConfig::from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = ConverterConfig::from_file(dir.path().join("absent.toml")).expect_err("should fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_level_falls_back_without_panicking() {
        init_logging(&LoggingConfig {
            level: "[[[".to_string(),
        });
        init_logging(&LoggingConfig::default());
    }
}
