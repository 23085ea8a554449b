//! 程序配置
//!
//! 加载顺序：默认值 ← TOML 配置文件（可选）← 环境变量

use crate::error::ConfigError;
use crate::infrastructure::wait::PollPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名（位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "mathml_eps.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输入 XML 文件（通常来自命令行参数）
    pub xml_file: Option<PathBuf>,
    /// EPS 输出目录，未设置时为 XML 所在目录下的 eps_output
    pub output_dir: Option<PathBuf>,
    /// 公式偏好报告（制表符分隔）
    pub report_file: PathBuf,
    /// 提取出的 MathML 检查点文件（每行一个公式）
    pub checkpoint_file: PathBuf,
    /// 运行日志文件名（与检查点文件同目录）
    pub run_log_name: String,
    // --- MathType 配置 ---
    pub mathtype_path: PathBuf,
    pub process_name: String,
    pub main_window_title: String,
    pub main_window_class: String,
    /// 保存对话框标题（正则）
    pub save_dialog_pattern: String,
    /// 覆盖确认对话框标题（正则）
    pub confirm_save_pattern: String,
    /// 加载偏好确认对话框标题（正则）
    pub preference_dialog_pattern: String,
    // --- UI 自动化桥接程序 ---
    pub ui_bridge_command: String,
    pub ui_bridge_args: Vec<String>,
    /// 弹窗标题关键字（不区分大小写）
    pub popup_keywords: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 等待与延时
    pub timings: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let desktop = desktop_dir();
        Self {
            xml_file: None,
            output_dir: None,
            report_file: desktop.join("EquationFontReport.txt"),
            checkpoint_file: desktop.join("mathml.txt"),
            run_log_name: "conversion_log.txt".to_string(),
            mathtype_path: PathBuf::from(r"C:\Program Files (x86)\MathType\MathType.exe"),
            process_name: "MathType.exe".to_string(),
            main_window_title: "MathType".to_string(),
            main_window_class: "EQNWINCLASS".to_string(),
            save_dialog_pattern: ".*Save.*".to_string(),
            confirm_save_pattern: ".*Confirm Save.*".to_string(),
            preference_dialog_pattern: "Load Equation Preferences from File".to_string(),
            ui_bridge_command: "uia-bridge".to_string(),
            ui_bridge_args: Vec::new(),
            popup_keywords: ["error", "math", "warning", "confirm", "save", "server"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            verbose_logging: false,
            timings: TimingConfig::default(),
        }
    }
}

impl Config {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("MATHML_EPS_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let base = match file {
            Some(path) => Self::from_toml_file(&path)?,
            None => Self::default(),
        };

        let config = base.with_env()?;
        config.timings.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 使用环境变量覆盖
    pub fn with_env(self) -> Result<Self, ConfigError> {
        let verbose_logging = match std::env::var("VERBOSE_LOGGING") {
            Ok(value) => parse_bool("VERBOSE_LOGGING", &value)?,
            Err(_) => self.verbose_logging,
        };

        Ok(Self {
            xml_file: std::env::var("XML_FILE").ok().map(PathBuf::from).or(self.xml_file),
            output_dir: std::env::var("OUTPUT_DIR").ok().map(PathBuf::from).or(self.output_dir),
            report_file: std::env::var("REPORT_FILE").map(PathBuf::from).unwrap_or(self.report_file),
            checkpoint_file: std::env::var("CHECKPOINT_FILE").map(PathBuf::from).unwrap_or(self.checkpoint_file),
            mathtype_path: std::env::var("MATHTYPE_PATH").map(PathBuf::from).unwrap_or(self.mathtype_path),
            ui_bridge_command: std::env::var("UI_BRIDGE_CMD").unwrap_or(self.ui_bridge_command),
            verbose_logging,
            ..self
        })
    }

    /// 运行日志写在检查点文件旁边，输出目录只放 EPS 文件
    pub fn run_log_path(&self) -> PathBuf {
        self.checkpoint_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .join(&self.run_log_name)
    }

    /// 输出目录：显式配置优先，否则为 XML 同级的 eps_output
    pub fn resolve_output_dir(&self, xml_file: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => xml_file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("eps_output"),
        }
    }
}

fn parse_bool(var_name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: "bool".to_string(),
        }),
    }
}

/// 系统登记的桌面目录（支持重定向的桌面），取不到时用当前目录
fn desktop_dir() -> PathBuf {
    dirs::desktop_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// 等待与延时配置（毫秒）
///
/// 控制通道没有"就绪"信号，只能轮询或固定等待
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub launch_settle_ms: u64,
    pub window_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_backoff: f64,
    pub max_poll_interval_ms: u64,
    pub clear_settle_ms: u64,
    pub paste_settle_ms: u64,
    pub select_settle_ms: u64,
    pub preference_settle_ms: u64,
    pub preference_dialog_timeout_ms: u64,
    pub save_menu_settle_ms: u64,
    pub save_dialog_timeout_ms: u64,
    pub path_settle_ms: u64,
    pub save_settle_ms: u64,
    pub overwrite_confirm_timeout_ms: u64,
    pub close_settle_ms: u64,
    pub dismiss_settle_ms: u64,
    pub between_equations_ms: u64,
    pub bridge_request_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            launch_settle_ms: 3000,
            window_timeout_ms: 10_000,
            poll_interval_ms: 500,
            poll_backoff: 1.0,
            max_poll_interval_ms: 2000,
            clear_settle_ms: 300,
            paste_settle_ms: 1000,
            select_settle_ms: 500,
            preference_settle_ms: 1000,
            preference_dialog_timeout_ms: 3000,
            save_menu_settle_ms: 1000,
            save_dialog_timeout_ms: 10_000,
            path_settle_ms: 500,
            save_settle_ms: 1000,
            overwrite_confirm_timeout_ms: 2000,
            close_settle_ms: 500,
            dismiss_settle_ms: 1000,
            between_equations_ms: 1000,
            bridge_request_timeout_ms: 15_000,
        }
    }
}

impl TimingConfig {
    /// 所有等待为零，超时只检查一次（用于测试和模拟通道）
    pub fn instant() -> Self {
        Self {
            launch_settle_ms: 0,
            window_timeout_ms: 0,
            poll_interval_ms: 0,
            poll_backoff: 1.0,
            max_poll_interval_ms: 0,
            clear_settle_ms: 0,
            paste_settle_ms: 0,
            select_settle_ms: 0,
            preference_settle_ms: 0,
            preference_dialog_timeout_ms: 0,
            save_menu_settle_ms: 0,
            save_dialog_timeout_ms: 0,
            path_settle_ms: 0,
            save_settle_ms: 0,
            overwrite_confirm_timeout_ms: 0,
            close_settle_ms: 0,
            dismiss_settle_ms: 0,
            between_equations_ms: 0,
            bridge_request_timeout_ms: 15_000,
        }
    }

    /// 检查来自配置文件的数值
    ///
    /// 退避倍数必须是有限值且不小于 1.0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.poll_backoff.is_finite() || self.poll_backoff < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "timings.poll_backoff",
                value: self.poll_backoff.to_string(),
                reason: "必须是不小于 1.0 的有限数",
            });
        }
        Ok(())
    }

    /// 以给定超时构造轮询策略，间隔与退避沿用全局设置
    pub fn poll(&self, timeout_ms: u64) -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
            backoff: self.poll_backoff,
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
        }
    }
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let config = Config::from_toml_str(
            r#"
            process_name = "MT7.exe"
            popup_keywords = ["fehler"]

            [timings]
            save_dialog_timeout_ms = 4000
            "#,
        )
        .unwrap();

        assert_eq!(config.process_name, "MT7.exe");
        assert_eq!(config.popup_keywords, vec!["fehler".to_string()]);
        assert_eq!(config.timings.save_dialog_timeout_ms, 4000);
        // 未设置的字段保持默认
        assert_eq!(config.main_window_class, "EQNWINCLASS");
        assert_eq!(config.timings.window_timeout_ms, 10_000);
    }

    #[test]
    fn test_output_dir_defaults_next_to_xml() {
        let config = Config::default();
        let dir = config.resolve_output_dir(Path::new("/data/book/chapter1.xml"));
        assert_eq!(dir, PathBuf::from("/data/book/eps_output"));
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        let config = Config {
            output_dir: Some(PathBuf::from("/tmp/eps")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_output_dir(Path::new("/data/book/chapter1.xml")),
            PathBuf::from("/tmp/eps")
        );
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("VERBOSE_LOGGING", "TRUE").unwrap());
        assert!(parse_bool("VERBOSE_LOGGING", "1").unwrap());
        assert!(!parse_bool("VERBOSE_LOGGING", "off").unwrap());
        assert!(matches!(
            parse_bool("VERBOSE_LOGGING", "maybe"),
            Err(ConfigError::EnvVarParseFailed { .. })
        ));
    }

    #[test]
    fn test_default_paths_live_on_system_desktop() {
        let desktop = dirs::desktop_dir().unwrap_or_else(|| PathBuf::from("."));
        let config = Config::default();
        assert_eq!(config.report_file, desktop.join("EquationFontReport.txt"));
        assert_eq!(config.checkpoint_file, desktop.join("mathml.txt"));
    }

    #[test]
    fn test_invalid_backoff_is_rejected() {
        for value in ["nan", "inf", "0.5"] {
            let config = Config::from_toml_str(&format!("[timings]\npoll_backoff = {}\n", value))
                .unwrap();
            assert!(
                matches!(
                    config.timings.validate(),
                    Err(ConfigError::InvalidValue { field: "timings.poll_backoff", .. })
                ),
                "poll_backoff = {} 应被拒绝",
                value
            );
        }

        let config = Config::from_toml_str("[timings]\npoll_backoff = 1.5\n").unwrap();
        assert!(config.timings.validate().is_ok());
        assert!(TimingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_run_log_sits_beside_checkpoint() {
        let config = Config {
            checkpoint_file: PathBuf::from("/work/mathml.txt"),
            ..Config::default()
        };
        assert_eq!(config.run_log_path(), PathBuf::from("/work/conversion_log.txt"));

        let bare = Config {
            checkpoint_file: PathBuf::from("mathml.txt"),
            ..Config::default()
        };
        assert_eq!(bare.run_log_path(), PathBuf::from("./conversion_log.txt"));
    }

    #[test]
    fn test_poll_policy_uses_global_interval() {
        let timings = TimingConfig::default();
        let policy = timings.poll(timings.save_dialog_timeout_ms);
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.interval, Duration::from_millis(500));
    }
}
