use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mathml_to_eps::models::extract_math_blocks;
use mathml_to_eps::{
    preflight, App, Config, EquationProcessor, EquationSequence, PopupDismisser, PreferenceMap,
    RendererController, StartupError, TimingConfig, UiChannel, WindowHandle, WindowInfo,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const MAIN: u64 = 1;
const SAVE_DIALOG: u64 = 2;
const ERROR_POPUP: u64 = 3;

/// 模拟的 MathType 状态
#[derive(Default)]
struct FakeState {
    running: bool,
    launched: bool,
    /// 已粘贴次数，即当前是第几个公式
    pastes: usize,
    clipboard: String,
    popups: Vec<WindowInfo>,
    focused: Option<u64>,
    pending_path: Option<String>,
    save_timeout_for: Vec<usize>,
    hide_main_for: Vec<usize>,
    preferences_applied: Vec<(usize, String)>,
    escaped: Vec<u64>,
}

/// 在内存中模拟 MathType：保存时把剪贴板内容写到对话框里的路径
#[derive(Clone, Default)]
struct FakeMathType {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMathType {
    fn running() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().running = true;
        fake
    }

    /// 第 n 个公式点击"另存为"后只弹出错误框，不弹出保存对话框
    fn save_times_out_for(self, ordinal: usize) -> Self {
        self.state.lock().unwrap().save_timeout_for.push(ordinal);
        self
    }

    /// 处理第 n 个公式期间主窗口不可见
    fn main_hidden_for(self, ordinal: usize) -> Self {
        self.state.lock().unwrap().hide_main_for.push(ordinal);
        self
    }

    fn preferences_applied(&self) -> Vec<(usize, String)> {
        self.state.lock().unwrap().preferences_applied.clone()
    }
}

fn window(handle: u64, title: &str, class_name: &str) -> WindowInfo {
    WindowInfo {
        handle: WindowHandle(handle),
        title: title.to_string(),
        class_name: class_name.to_string(),
        visible: true,
    }
}

#[async_trait]
impl UiChannel for FakeMathType {
    async fn attach(&self, _process_name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().running)
    }

    async fn launch(&self, _executable: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.running = true;
        state.launched = true;
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowInfo>> {
        let state = self.state.lock().unwrap();
        // 弹窗在主窗口之前（置顶）
        let mut windows = state.popups.clone();
        if state.running && !state.hide_main_for.contains(&state.pastes) {
            windows.push(window(MAIN, "MathType - Untitled 1", "EQNWINCLASS"));
        }
        Ok(windows)
    }

    async fn focus(&self, window: WindowHandle) -> Result<()> {
        self.state.lock().unwrap().focused = Some(window.0);
        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match keys {
            "^v" => state.pastes += 1,
            "{ESC}" => {
                if let Some(focused) = state.focused {
                    state.escaped.push(focused);
                    state.popups.retain(|w| w.handle.0 != focused);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn set_clipboard(&self, text: &str) -> Result<()> {
        self.state.lock().unwrap().clipboard = text.to_string();
        Ok(())
    }

    async fn menu_select(&self, _window: WindowHandle, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if path == "File->Save As" {
            let popup = if state.save_timeout_for.contains(&state.pastes) {
                window(ERROR_POPUP, "MathType Error", "#32770")
            } else {
                window(SAVE_DIALOG, "Save As", "#32770")
            };
            state.popups.push(popup);
            return Ok(());
        }
        if let Some(name) = path.strip_prefix("Preferences->") {
            let ordinal = state.pastes;
            state.preferences_applied.push((ordinal, name.to_string()));
            return Ok(());
        }
        Err(anyhow!("菜单不存在: {}", path))
    }

    async fn set_edit_text(&self, window: WindowHandle, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if window.0 != SAVE_DIALOG {
            return Err(anyhow!("窗口没有编辑框"));
        }
        state.pending_path = Some(text.to_string());
        Ok(())
    }

    async fn click_button(&self, window: WindowHandle, label: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if window.0 == SAVE_DIALOG && label == "Save" {
            let path = state
                .pending_path
                .take()
                .ok_or_else(|| anyhow!("未填写保存路径"))?;
            std::fs::write(&path, state.clipboard.as_bytes())?;
            state.popups.retain(|w| w.handle.0 != SAVE_DIALOG);
        }
        Ok(())
    }
}

/// 测试环境：临时目录 + 零等待配置
struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mathtype = dir.path().join("MathType.exe");
        std::fs::write(&mathtype, b"").unwrap();

        let config = Config {
            output_dir: Some(dir.path().join("eps_output")),
            report_file: dir.path().join("EquationFontReport.txt"),
            checkpoint_file: dir.path().join("mathml.txt"),
            mathtype_path: mathtype,
            timings: TimingConfig::instant(),
            ..Config::default()
        };

        Self { dir, config }
    }

    fn write_xml(&self, count: usize) -> PathBuf {
        let mut xml = String::from("<article>\n");
        for i in 1..=count {
            xml.push_str(&format!(
                "<p><math xmlns=\"http://www.w3.org/1998/Math/MathML\" altimg=\"eq{i}.png\">\n  <mi>x</mi><mo>+</mo><mn>{i}</mn>\n</math></p>\n"
            ));
        }
        xml.push_str("</article>\n");
        let path = self.dir.path().join("book.xml");
        std::fs::write(&path, xml).unwrap();
        path
    }

    fn write_report(&self, content: &str) {
        std::fs::write(&self.config.report_file, content).unwrap();
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("eps_output")
    }

    fn eps_files(&self) -> BTreeSet<String> {
        std::fs::read_dir(self.output_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".eps"))
            .collect()
    }

    async fn run(&self, fake: &FakeMathType, count: usize) -> mathml_to_eps::RunStats {
        let xml = self.write_xml(count);
        let blocks = preflight(&self.config, &xml).await.unwrap();
        let controller = RendererController::from_config(fake.clone(), &self.config).unwrap();
        let app = App::with_engine(self.config.clone(), xml, blocks, Box::new(controller));
        app.run().await.unwrap()
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_all_equations_rendered() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running();

    let stats = fixture.run(&fake, 3).await;

    assert_eq!(stats.total, 3);
    assert_eq!(stats.rendered, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(fixture.eps_files(), names(&["Eqn1.eps", "Eqn2.eps", "Eqn3.eps"]));

    // 保存的内容就是粘贴进去的单行 MathML
    let saved = std::fs::read_to_string(fixture.output_dir().join("Eqn2.eps")).unwrap();
    assert_eq!(saved, r#"<math altimg="eq2.png">  <mi>x</mi><mo>+</mo><mn>2</mn></math>"#);
}

#[tokio::test]
async fn test_save_timeout_on_second_equation() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running().save_times_out_for(2);

    let stats = fixture.run(&fake, 3).await;

    assert_eq!(
        fixture.eps_files(),
        names(&["Eqn1.eps", "Eqn2_failed.eps", "Eqn3.eps"])
    );
    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failed_names(), vec!["Eqn2_failed.eps".to_string()]);

    let placeholder = fixture.output_dir().join("Eqn2_failed.eps");
    assert_eq!(std::fs::metadata(placeholder).unwrap().len(), 0, "占位文件应为空");

    // 错误弹窗被 ESC 关闭
    let state = fake.state.lock().unwrap();
    assert_eq!(state.escaped, vec![ERROR_POPUP]);
    assert!(state.popups.is_empty());
}

#[tokio::test]
async fn test_counter_ends_one_past_last_equation() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.output_dir()).unwrap();
    let fake = FakeMathType::running().save_times_out_for(2);
    let controller = RendererController::from_config(fake.clone(), &fixture.config).unwrap();
    let dismisser = PopupDismisser::default();
    let processor =
        EquationProcessor::new(&controller, &dismisser, &fixture.config, &fixture.output_dir());

    let equations: Vec<String> = (1..=3).map(|i| format!("<math><mn>{i}</mn></math>")).collect();
    let mut sequence = EquationSequence::new();
    let stats = processor
        .process_all(&equations, &PreferenceMap::new(), &mut sequence)
        .await;

    assert_eq!(sequence.current(), 4);
    let indices: Vec<usize> = stats.artifacts.iter().map(|a| a.index()).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(stats.artifacts[1].is_placeholder());
}

#[tokio::test]
async fn test_missing_main_window_fails_only_that_equation() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running().main_hidden_for(3);

    let stats = fixture.run(&fake, 5).await;

    assert_eq!(
        fixture.eps_files(),
        names(&[
            "Eqn1.eps",
            "Eqn2.eps",
            "Eqn3_failed.eps",
            "Eqn4.eps",
            "Eqn5.eps"
        ])
    );
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.lost, 0);
}

#[tokio::test]
async fn test_indices_have_no_gaps_with_many_failures() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running()
        .save_times_out_for(1)
        .save_times_out_for(2)
        .main_hidden_for(4)
        .save_times_out_for(6);

    let stats = fixture.run(&fake, 6).await;

    let files = fixture.eps_files();
    assert_eq!(files.len(), 6, "每个公式恰好一个输出文件");
    for i in 1..=6 {
        let ok = format!("Eqn{}.eps", i);
        let failed = format!("Eqn{}_failed.eps", i);
        assert!(
            files.contains(&ok) ^ files.contains(&failed),
            "编号 {} 应该恰好有一个输出",
            i
        );
    }
    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.failed, 4);
}

#[tokio::test]
async fn test_preferences_applied_by_output_name() {
    let fixture = Fixture::new();
    fixture.write_report("Eqn1.eps\tLarge\nnot a valid line\nEqn3.eps\tSmall\textra\n");
    let fake = FakeMathType::running();

    let stats = fixture.run(&fake, 3).await;

    assert_eq!(stats.rendered, 3);
    assert_eq!(
        fake.preferences_applied(),
        vec![(1, "Large".to_string()), (3, "Small".to_string())]
    );
}

#[tokio::test]
async fn test_missing_report_skips_preferences() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running();

    let stats = fixture.run(&fake, 2).await;

    assert_eq!(stats.rendered, 2);
    assert!(fake.preferences_applied().is_empty());
}

#[tokio::test]
async fn test_launches_mathtype_when_not_running() {
    let fixture = Fixture::new();
    let fake = FakeMathType::default();

    let stats = fixture.run(&fake, 1).await;

    assert!(fake.state.lock().unwrap().launched);
    assert_eq!(stats.rendered, 1);
}

#[tokio::test]
async fn test_checkpoint_and_run_log_written() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running().save_times_out_for(1);

    fixture.run(&fake, 2).await;

    let checkpoint = std::fs::read_to_string(&fixture.config.checkpoint_file).unwrap();
    assert_eq!(checkpoint.lines().count(), 2);

    let log = std::fs::read_to_string(fixture.dir.path().join("conversion_log.txt")).unwrap();
    assert!(log.contains("Eqn1_failed.eps | 失败"));
    assert!(log.contains("Eqn2.eps | 成功"));
}

#[tokio::test]
async fn test_output_dir_holds_only_eps_files() {
    let fixture = Fixture::new();
    let fake = FakeMathType::running().save_times_out_for(2);

    fixture.run(&fake, 3).await;

    let entries: BTreeSet<String> = std::fs::read_dir(fixture.output_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        entries,
        names(&["Eqn1.eps", "Eqn2_failed.eps", "Eqn3.eps"]),
        "输出目录中只能有 EPS 文件"
    );
}

#[tokio::test]
async fn test_preflight_missing_input() {
    let fixture = Fixture::new();
    let err = preflight(&fixture.config, &fixture.dir.path().join("nope.xml"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::InputNotFound { .. })
    ));
    assert!(!fixture.output_dir().exists(), "启动失败时不应产生输出");
}

#[tokio::test]
async fn test_preflight_missing_mathtype() {
    let fixture = Fixture::new();
    let xml = fixture.write_xml(1);
    let config = Config {
        mathtype_path: fixture.dir.path().join("missing").join("MathType.exe"),
        ..fixture.config.clone()
    };
    let err = preflight(&config, &xml).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::RendererNotFound { .. })
    ));
}

#[tokio::test]
async fn test_preflight_no_math_blocks() {
    let fixture = Fixture::new();
    let xml = fixture.dir.path().join("plain.xml");
    std::fs::write(&xml, "<article><p>no equations</p></article>").unwrap();
    let err = preflight(&fixture.config, &xml).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::NoMathBlocks { .. })
    ));
}

#[test]
fn test_extraction_matches_fixture_count() {
    let fixture = Fixture::new();
    let xml = fixture.write_xml(4);
    let content = std::fs::read_to_string(xml).unwrap();
    let blocks = extract_math_blocks(&content).unwrap();
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks[3].altimg, "eq4.png");
}
