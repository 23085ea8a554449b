use anyhow::Result;
use mathml_to_eps::{logger, App, Config};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    let xml_file = resolve_xml_file(&config)?;

    // 初始化并运行应用
    let app = App::initialize(config, xml_file).await?;
    app.run().await?;

    Ok(())
}

/// 输入文件：命令行参数 → XML_FILE / 配置文件 → 交互输入
fn resolve_xml_file(config: &Config) -> Result<PathBuf> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    if let Some(path) = &config.xml_file {
        return Ok(path.clone());
    }

    print!("请输入 XML 文件路径: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim().trim_matches('"')))
}
