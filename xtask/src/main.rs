use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "ReceiptLink 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建 CLI (release)
    Build,
    /// 以调试日志运行一次扫描
    Scan {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "debug")]
        log_level: String,
        /// 只扫描一种传输 (ble / spp)
        #[arg(long)]
        transport: Option<String>,
        /// 扫描超时 (秒)
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },
    /// 向指定打印机发送 ESC/POS 自检页
    SelfTest {
        /// 目标设备地址
        #[arg(short, long)]
        device: String,
        /// 日志级别
        #[arg(short, long, default_value = "debug")]
        log_level: String,
    },
    /// 打包发布 (tar.gz)
    Dist,
    /// 运行测试
    Test,
    /// 运行测试并生成覆盖率报告
    Coverage,
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 在项目根目录执行
    let project_root = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
        Err(_) => std::env::current_dir()?,
    };
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Scan {
            log_level,
            transport,
            timeout,
        } => scan(&sh, &log_level, transport.as_deref(), timeout)?,
        Commands::SelfTest { device, log_level } => self_test(&sh, &device, &log_level)?,
        Commands::Dist => dist(&sh)?,
        Commands::Test => test(&sh)?,
        Commands::Coverage => coverage(&sh)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn rust_log(level: &str) -> String {
    format!("{level},receiptlink_core={level},bluer={level},btleplug=info")
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建 receiptlink...");
    cmd!(sh, "cargo build --release -p receiptlink-cli").run()?;
    println!("✅ 构建完成: target/release/receiptlink");
    Ok(())
}

fn scan(sh: &Shell, log_level: &str, transport: Option<&str>, timeout: u64) -> Result<()> {
    println!("🔍 调试扫描 (日志级别: {})", log_level);
    let _env = sh.push_env("RUST_LOG", rust_log(log_level));
    let timeout = timeout.to_string();
    let transport_args: Vec<&str> = match transport {
        Some(t) => vec!["--transport", t],
        None => Vec::new(),
    };
    cmd!(
        sh,
        "cargo run -p receiptlink-cli -- scan --timeout {timeout} {transport_args...}"
    )
    .run()?;
    Ok(())
}

fn self_test(sh: &Shell, device: &str, log_level: &str) -> Result<()> {
    println!("🖨️  向 {} 发送自检页...", device);

    // ESC @ 初始化, 文本, 走纸 3 行, GS V 1 切纸
    let mut ticket = vec![0x1b, 0x40];
    ticket.extend_from_slice(b"ReceiptLink self test\n");
    ticket.extend_from_slice(&[0x1b, 0x64, 0x03, 0x1d, 0x56, 0x01]);

    let dir = sh.create_temp_dir()?;
    let file = dir.path().join("selftest.bin");
    sh.write_file(&file, ticket)?;

    let _env = sh.push_env("RUST_LOG", rust_log(log_level));
    cmd!(sh, "cargo run -p receiptlink-cli -- print {file} --device {device}").run()?;
    Ok(())
}

fn dist(sh: &Shell) -> Result<()> {
    println!("📦 打包发布...");

    build(sh)?;

    let version = "0.1.0";
    let dist_name = format!("receiptlink-{}-linux-x86_64", version);

    cmd!(sh, "mkdir -p dist/{dist_name}").run()?;
    cmd!(sh, "cp target/release/receiptlink dist/{dist_name}/").run()?;
    if sh.path_exists("README.md") {
        cmd!(sh, "cp README.md dist/{dist_name}/").run()?;
    }

    sh.change_dir("dist");
    cmd!(sh, "tar -czvf {dist_name}.tar.gz {dist_name}").run()?;

    println!("✅ 打包完成: dist/{}.tar.gz", dist_name);
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    println!("✅ 测试完成");
    Ok(())
}

fn coverage(sh: &Shell) -> Result<()> {
    println!("📊 运行测试覆盖率分析...");

    if cmd!(sh, "cargo tarpaulin --version").run().is_err() {
        println!("📦 安装 cargo-tarpaulin...");
        cmd!(sh, "cargo install cargo-tarpaulin").run()?;
    }

    cmd!(
        sh,
        "cargo tarpaulin --packages receiptlink-core --out Html --output-dir target/coverage"
    )
    .run()?;

    println!("✅ 覆盖率报告已生成");
    println!("   HTML 报告: target/coverage/tarpaulin-report.html");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    sh.remove_path("dist")?;
    println!("✅ 清理完成");
    Ok(())
}
