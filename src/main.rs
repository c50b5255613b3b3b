// ==========================================
// 设备预约系统 - 智能导入助手命令行入口
// ==========================================
// 用法:
//   booking-import analyze <file>                    识别记录类型与建议映射
//   booking-import preview <file> [选项]             预览校验结果
//   booking-import import  <file> [选项]             执行导入
//   booking-import batches [--limit N]               最近的导入批次
//   booking-import config  [key] [value]             查看/设置配置
//
// 选项:
//   --type users|equipment    覆盖自动识别的记录类型
//   --set field=value         缺失字段统一取值（可重复）
//   --skip-invalid            存在错误行时仅导入有效行
//   --db <path>               数据库路径（默认见 BOOKING_IMPORT_DB_PATH）
// ==========================================

use anyhow::{anyhow, bail, Context};
use booking_import::app::{get_default_db_path, AppState};
use booking_import::domain::{RecordType, TargetField};
use booking_import::{logging, ImportOptions};
use serde::Serialize;

const USAGE: &str = "用法: booking-import <analyze|preview|import|batches|config> [参数] [--db <path>]";

struct CliArgs {
    command: String,
    positional: Vec<String>,
    db_path: Option<String>,
    limit: usize,
    options: ImportOptions,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<CliArgs> {
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let mut cli = CliArgs {
        command,
        positional: Vec::new(),
        db_path: None,
        limit: 20,
        options: ImportOptions::default(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => cli.db_path = Some(args.next().context("--db 需要路径参数")?),
            "--type" => {
                let value = args.next().context("--type 需要 users 或 equipment")?;
                let record_type = value.parse::<RecordType>().map_err(|e| anyhow!(e))?;
                cli.options.record_type = Some(record_type);
            }
            "--set" => {
                let pair = args.next().context("--set 需要 field=value")?;
                let (field, value) = pair
                    .split_once('=')
                    .with_context(|| format!("--set 格式错误: {}", pair))?;
                let field = field.parse::<TargetField>().map_err(|e| anyhow!(e))?;
                cli.options.defaults.push((field, value.trim().to_string()));
            }
            "--skip-invalid" => cli.options.skip_invalid = true,
            "--limit" => {
                cli.limit = args
                    .next()
                    .context("--limit 需要数字")?
                    .parse()
                    .context("--limit 需要数字")?;
            }
            flag if flag.starts_with("--") => bail!("未知选项: {}\n{}", flag, USAGE),
            _ => cli.positional.push(arg),
        }
    }

    Ok(cli)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn file_arg(cli: &CliArgs) -> anyhow::Result<&str> {
    cli.positional
        .first()
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少文件参数\n{}", USAGE))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = parse_args(std::env::args().skip(1))?;
    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);

    tracing::info!("{} v{}", booking_import::APP_NAME, booking_import::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)?;
    let api = &state.import_api;

    match cli.command.as_str() {
        "analyze" => {
            let resp = api.analyze_file(file_arg(&cli)?).await?;
            print_json(&resp)?;
        }
        "preview" => {
            let resp = api.preview_file(file_arg(&cli)?, &cli.options).await?;
            print_json(&resp)?;
        }
        "import" => {
            let mut last = 0u8;
            let resp = api
                .import_file(file_arg(&cli)?, &cli.options, |p| {
                    if p >= last.saturating_add(10) || p == 100 {
                        eprintln!("进度: {}%", p);
                        last = p;
                    }
                })
                .await?;
            print_json(&resp)?;
        }
        "batches" => {
            let batches = api.list_batches(cli.limit).await?;
            print_json(&batches)?;
        }
        "config" => match cli.positional.as_slice() {
            [] => print_json(&api.config().get_config_snapshot()?)?,
            [key] => println!(
                "{}",
                api.config().get_global_config_value(key)?.unwrap_or_default()
            ),
            [key, value] => {
                api.config().set_global_config_value(key, value)?;
                println!("{}={}", key, value);
            }
            _ => bail!("config 最多接受两个参数\n{}", USAGE),
        },
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
