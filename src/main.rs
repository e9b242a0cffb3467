/*
 * Responsibility
 * - tokio runtime 起動
 * - cli::run() の呼び出し（ロジックは置かない）
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    otpd::cli::run().await
}
