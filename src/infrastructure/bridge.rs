//! UI 自动化桥接通道 - 基础设施层
//!
//! 持有唯一的桥接进程，通过 stdin/stdout 上的逐行 JSON 请求执行 UI 操作。
//! 剪贴板直接在本进程内通过 arboard 写入。
//!
//! 协议：
//! ```text
//! → {"id":1,"op":"windows","args":{}}
//! ← {"id":1,"ok":true,"result":[{"handle":1,"title":"MathType","class_name":"EQNWINCLASS"}]}
//! ← {"id":2,"ok":false,"error":"menu item not found"}
//! ```

use crate::error::StartupError;
use crate::infrastructure::ui_channel::{UiChannel, WindowHandle, WindowInfo};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    op: &'a str,
    args: JsonValue,
}

#[derive(Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: JsonValue,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeIo {
    async fn exchange(&mut self, id: u64, line: &str) -> Result<BridgeResponse> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        // 跳过之前超时请求的迟到响应
        loop {
            let Some(reply) = self.stdout.next_line().await? else {
                bail!("桥接程序已退出");
            };
            debug!("← bridge: {}", reply);
            let response: BridgeResponse = match serde_json::from_str(&reply) {
                Ok(response) => response,
                Err(e) => {
                    warn!("忽略无法解析的桥接输出: {} ({})", reply, e);
                    continue;
                }
            };
            if response.id == id {
                return Ok(response);
            }
        }
    }
}

/// 桥接通道
///
/// 职责：
/// - 持有桥接子进程（drop 时结束）
/// - 暴露 call() 能力，每个请求有独立超时
/// - 不处理 MathType 的业务流程
pub struct BridgeChannel {
    io: Mutex<BridgeIo>,
    next_id: AtomicU64,
    request_timeout: Duration,
    _child: Child,
}

impl BridgeChannel {
    /// 启动桥接进程
    pub fn spawn(
        command: &str,
        args: &[String],
        request_timeout: Duration,
    ) -> Result<Self, StartupError> {
        let unavailable = |message: String| StartupError::BridgeUnavailable {
            command: command.to_string(),
            message,
        };

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| unavailable("stdin 不可用".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| unavailable("stdout 不可用".to_string()))?;

        info!("✓ UI 自动化桥接程序已启动: {}", command);

        Ok(Self {
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            next_id: AtomicU64::new(1),
            request_timeout,
            _child: child,
        })
    }

    /// 检查系统剪贴板是否可用
    pub fn probe_clipboard() -> Result<(), StartupError> {
        arboard::Clipboard::new()
            .map(|_| ())
            .map_err(|e| StartupError::ClipboardUnavailable {
                message: e.to_string(),
            })
    }

    /// 发送一个请求并返回 JSON 结果
    pub async fn call(&self, op: &str, args: JsonValue) -> Result<JsonValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&BridgeRequest { id, op, args })?;
        debug!("→ bridge: {}", line);

        let mut io = self.io.lock().await;
        let response = tokio::time::timeout(self.request_timeout, io.exchange(id, &line))
            .await
            .map_err(|_| anyhow!("桥接请求 {} 超时 ({:?})", op, self.request_timeout))??;

        if response.ok {
            Ok(response.result)
        } else {
            Err(anyhow!(
                "{}",
                response.error.unwrap_or_else(|| "未知错误".to_string())
            ))
        }
    }

    /// 发送请求并反序列化为指定类型
    pub async fn call_as<T: DeserializeOwned>(&self, op: &str, args: JsonValue) -> Result<T> {
        let value = self.call(op, args).await?;
        serde_json::from_value(value).with_context(|| format!("无法解析 {} 的返回值", op))
    }
}

#[async_trait]
impl UiChannel for BridgeChannel {
    async fn attach(&self, process_name: &str) -> Result<bool> {
        self.call_as("attach", json!({ "process": process_name }))
            .await
    }

    async fn launch(&self, executable: &Path) -> Result<()> {
        self.call("launch", json!({ "path": executable.to_string_lossy() }))
            .await?;
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowInfo>> {
        self.call_as("windows", json!({})).await
    }

    async fn focus(&self, window: WindowHandle) -> Result<()> {
        self.call("focus", json!({ "handle": window })).await?;
        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<()> {
        self.call("send_keys", json!({ "keys": keys })).await?;
        Ok(())
    }

    async fn set_clipboard(&self, text: &str) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| anyhow!("无法访问剪贴板: {}", e))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| anyhow!("无法写入剪贴板: {}", e))?;
        debug!("已复制 {} 字符到剪贴板", text.chars().count());
        Ok(())
    }

    async fn menu_select(&self, window: WindowHandle, path: &str) -> Result<()> {
        self.call("menu_select", json!({ "handle": window, "path": path }))
            .await?;
        Ok(())
    }

    async fn set_edit_text(&self, window: WindowHandle, text: &str) -> Result<()> {
        self.call("set_edit_text", json!({ "handle": window, "text": text }))
            .await?;
        Ok(())
    }

    async fn click_button(&self, window: WindowHandle, label: &str) -> Result<()> {
        self.call("click_button", json!({ "handle": window, "label": label }))
            .await?;
        Ok(())
    }
}
