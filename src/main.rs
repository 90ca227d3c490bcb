use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dsql::{is_dsql_query, parse, DsqlError, SqlDialect, SqlTranslator, TranslatorConfig};

const HELP: &str = "\
输入以 `dsql:` 开头的查询, 例如:
  dsql:SELECT name FROM Account WHERE age > 21 ORDER BY name DESC LIMIT 10

命令:
  .help              显示帮助
  .json              切换是否输出查询结构 (JSON)
  .dialect <name>    切换 SQL 方言 (postgres | mysql | sqlite)
  .config <path>     加载 JSON 翻译配置
  .exit              退出";

struct Shell {
    translator: SqlTranslator,
    show_json: bool,
}

impl Shell {
    fn new(config: TranslatorConfig) -> Self {
        Self {
            translator: SqlTranslator::with_config(config),
            show_json: false,
        }
    }

    /// Handles one input line. Returns `false` when the shell should stop.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.splitn(2, char::is_whitespace);
        match parts.next().unwrap_or_default() {
            ".exit" | ".quit" => return Ok(false),
            ".help" => println!("{HELP}"),
            ".json" => {
                self.show_json = !self.show_json;
                println!("JSON 输出: {}", if self.show_json { "开" } else { "关" });
            }
            ".dialect" => {
                let name = parts.next().unwrap_or_default().trim();
                let dialect: SqlDialect = name.parse()?;
                self.translator.config_mut().dialect = dialect;
                println!("当前方言: {dialect}");
            }
            ".config" => {
                let path = parts.next().unwrap_or_default().trim();
                let config = TranslatorConfig::from_json_file(path)?;
                println!(
                    "已加载 {} 个表映射, {} 个列映射",
                    config.tables.len(),
                    config.columns.len()
                );
                *self.translator.config_mut() = config;
            }
            _ if is_dsql_query(line) => self.run_query(line)?,
            _ => println!("不是 DSQL 查询 (缺少 `dsql:` 前缀), 输入 .help 查看帮助"),
        }
        Ok(true)
    }

    fn run_query(&mut self, line: &str) -> Result<()> {
        match parse(line) {
            Ok(query) => {
                if self.show_json {
                    println!("{}", serde_json::to_string_pretty(&query)?);
                }
                println!("{}", query.translate(&mut self.translator));
            }
            Err(e) => report(line, &e),
        }
        Ok(())
    }
}

/// Prints the error with a caret under the offending column.
fn report(line: &str, error: &DsqlError) {
    println!("✗ {error}");
    if let Some(position) = error.position() {
        if let Some(source_line) = line.lines().nth(position.line - 1) {
            println!("  {source_line}");
            println!("  {}^", " ".repeat(position.column.saturating_sub(1)));
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TranslatorConfig::from_json_file(&path)
            .with_context(|| format!("加载配置文件 {path} 失败"))?,
        None => TranslatorConfig::default(),
    };
    info!(dialect = %config.dialect, "starting DSQL shell");

    println!("--- DSQL: 查询翻译器 (输入 .help 查看帮助) ---");
    let mut shell = Shell::new(config);
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("dsql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match shell.handle_line(line) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("✗ {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
