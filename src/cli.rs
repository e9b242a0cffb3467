/*
 * Responsibility
 * - コマンドライン定義 (otpd start ...)
 * - .env 読み込み → Config 構築 → app::run() 呼び出し
 */
use std::net::IpAddr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{app, config::Config};

#[derive(Debug, Parser)]
#[command(name = "otpd", version, about = "OTP server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start otp server
    Start(StartArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Console,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    /// web listening port
    #[arg(short, long, env = "PORT", default_value_t = 18181)]
    pub port: u16,

    /// bind ip addr
    #[arg(short, long, env = "BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// data path (empty keeps accounts in memory)
    #[arg(short, long, env = "DATA_PATH", default_value = "")]
    pub data_path: String,

    /// log level or filter directives (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Console)]
    pub log_format: LogFormat,
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Start(args) => {
            let config = Config::load(&args)?;
            app::run(config).await
        }
    }
}
