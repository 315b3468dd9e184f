//! ReceiptLink CLI
//!
//! 命令行客户端，扫描蓝牙小票打印机并通过 BLE 或 SPP 发送打印数据

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use receiptlink_core::{CharacteristicRef, PrinterSettings, SendOptions, TransferOutcome, TransportKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "receiptlink", version, about = "蓝牙小票打印工具")]
struct Cli {
    /// 提高日志级别 (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 扫描附近的打印机
    Scan {
        /// 扫描超时时间 (秒)，默认取配置值
        #[arg(short, long)]
        timeout: Option<u64>,
        /// 只扫描一种传输 (ble / spp)
        #[arg(long)]
        transport: Option<TransportKind>,
        /// 以 JSON 输出结果
        #[arg(long)]
        json: bool,
    },
    /// 发送打印数据
    Print {
        /// 已编码的小票文件 (ESC/POS 字节)
        file: PathBuf,
        /// 目标设备地址
        #[arg(short, long)]
        device: String,
        /// 强制使用某一种传输
        #[arg(long)]
        transport: Option<TransportKind>,
        /// 覆盖分片大小
        #[arg(long)]
        chunk_size: Option<usize>,
        /// 覆盖分片间隔 (毫秒)
        #[arg(long)]
        delay_ms: Option<u64>,
        /// 指定写入特征 `<service-uuid>/<characteristic-uuid>`
        #[arg(long)]
        characteristic: Option<CharacteristicRef>,
    },
    /// 查看或重置配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 显示当前配置
    Show,
    /// 恢复默认配置
    Reset,
    /// 显示配置文件路径
    Path,
}

fn init_logging(settings: &PrinterSettings, verbose: u8) {
    // 桥接 log crate（receiptlink-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let directive = settings.log_level.raised_by(verbose).filter_directive();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(outcome: &TransferOutcome) {
    match outcome {
        TransferOutcome::Success => println!("✅ {}", outcome),
        TransferOutcome::NeedsCharacteristicSelection { candidates } => {
            println!("⚠️  {}，可用 --characteristic 指定:", outcome);
            for candidate in candidates {
                println!("   {}", candidate);
            }
        }
        _ => println!("❌ {}", outcome),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = PrinterSettings::load();
    init_logging(&settings, cli.verbose);

    match cli.command {
        Commands::Scan {
            timeout,
            transport,
            json,
        } => {
            let timeout = timeout.unwrap_or(settings.scan_timeout_secs);
            if !json {
                println!("🔍 扫描设备 ({}s)...", timeout);
            }
            let session = client::open_session(&settings).await?;
            client::scan(
                &session,
                Duration::from_secs(timeout),
                transport.or(settings.transport_filter),
                json,
            )
            .await?;
        }
        Commands::Print {
            file,
            device,
            transport,
            chunk_size,
            delay_ms,
            characteristic,
        } => {
            println!("🖨️  打印: {}", file.display());
            let mut options = SendOptions::default();
            if let Some(size) = chunk_size {
                options = options.with_chunk_size(size);
            }
            if let Some(ms) = delay_ms {
                options = options.with_inter_chunk_delay(Duration::from_millis(ms));
            }

            let session = client::open_session(&settings).await?;
            let outcome = client::print(
                &session,
                &settings,
                client::PrintRequest {
                    file: &file,
                    address: &device,
                    transport,
                    characteristic,
                    options,
                },
            )
            .await?;
            report(&outcome);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&settings)?);
            }
            ConfigAction::Reset => {
                PrinterSettings::default().save()?;
                println!("♻️  已恢复默认配置: {}", PrinterSettings::config_path().display());
            }
            ConfigAction::Path => {
                println!("{}", PrinterSettings::config_path().display());
            }
        },
    }

    Ok(())
}
