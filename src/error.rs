use std::path::PathBuf;
use thiserror::Error;

/// 启动阶段的致命错误
///
/// 任何一个出现都会在处理公式之前终止程序，且不产生任何输出文件
#[derive(Debug, Error)]
pub enum StartupError {
    /// 输入 XML 文件不存在
    #[error("XML 文件不存在: {}", path.display())]
    InputNotFound { path: PathBuf },
    /// MathType 可执行文件不存在
    #[error("未找到 MathType: {}", path.display())]
    RendererNotFound { path: PathBuf },
    /// XML 中没有带 altimg 的 <math> 块
    #[error("XML 中没有找到带 altimg 的 <math> 块: {}", path.display())]
    NoMathBlocks { path: PathBuf },
    /// 系统剪贴板不可用
    #[error("无法访问系统剪贴板: {message}")]
    ClipboardUnavailable { message: String },
    /// UI 自动化桥接进程无法启动
    #[error("无法启动 UI 自动化桥接程序 '{command}': {message}")]
    BridgeUnavailable { command: String, message: String },
}

/// 单个公式处理过程中的错误
///
/// 在编排层的单个公式边界被捕获，转换为占位文件，不会中止整个批次
#[derive(Debug, Error)]
pub enum RenderError {
    /// 既无法连接也无法启动 MathType
    #[error("MathType 不可用: {message}")]
    ApplicationUnavailable { message: String },
    /// 超时仍未找到 MathType 主窗口
    #[error("未找到 MathType 主窗口 (阶段: {stage})")]
    MainWindowNotFound { stage: &'static str },
    /// 保存对话框超时未出现
    #[error("等待保存对话框超时 ({timeout_ms} ms)")]
    SaveDialogTimeout { timeout_ms: u64 },
    /// 偏好菜单调用失败
    #[error("无法应用偏好 '{preference}': {message}")]
    PreferenceFailed { preference: String, message: String },
    /// 剪贴板写入或粘贴失败
    #[error("粘贴 MathML 失败: {message}")]
    PasteFailed { message: String },
    /// 控制通道调用失败
    #[error("控制通道操作 {op} 失败: {message}")]
    Channel { op: &'static str, message: String },
}

impl RenderError {
    /// 将控制通道错误包装为 RenderError
    pub fn channel(op: &'static str, err: anyhow::Error) -> Self {
        RenderError::Channel {
            op,
            message: format!("{:#}", err),
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值超出允许范围
    #[error("配置项 {field} 的值 {value} 无效: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    /// 窗口标题匹配模式无效
    #[error("无效的窗口标题模式 '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// ========== 便捷构造函数 ==========

impl FileError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}
