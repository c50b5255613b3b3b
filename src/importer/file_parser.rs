// ==========================================
// 设备预约系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取 / 粘贴文本解析
// 支持: 分隔文本 (.csv/.tsv/.txt，分隔符自动识别) / Excel (.xlsx/.xls)
// ==========================================

use crate::domain::{ParsedTable, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, Trim};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// 识别分隔符（逗号 / 制表符 / 分号）
///
/// 只看第一行：制表符严格多于逗号和分号 → 制表符；
/// 否则分号多于逗号 → 分号；否则逗号
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text.split('\n').next().unwrap_or("");
    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();

    if tabs > commas && tabs > semicolons {
        '\t'
    } else if semicolons > commas {
        ';'
    } else {
        ','
    }
}

fn ensure_has_data(text: &str) -> ImportResult<()> {
    let non_empty = text.lines().filter(|l| !l.trim().is_empty()).count();
    if non_empty < 2 {
        return Err(ImportError::EmptyInput);
    }
    Ok(())
}

/// 由表头 + 数据行组装 ParsedTable（列数不符的行丢弃）
fn build_table<I>(headers: Vec<String>, records: I, delimiter: char) -> ParsedTable
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = Vec::new();
    let mut dropped_rows = 0;

    for (idx, values) in records.into_iter().enumerate() {
        // 完全空白的行不计入
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }

        if values.len() != headers.len() {
            warn!(
                row = idx + 2,
                expected = headers.len(),
                actual = values.len(),
                "列数与表头不一致，丢弃该行"
            );
            dropped_rows += 1;
            continue;
        }

        rows.push(headers.iter().cloned().zip(values).collect::<RawRow>());
    }

    ParsedTable {
        headers,
        rows,
        delimiter,
        dropped_rows,
    }
}

// ==========================================
// DelimitedTextParser - 分隔文本解析
// ==========================================
// RFC 4180 语法（引号内分隔符、"" 转义）由 csv crate 处理，
// 分隔符识别作为外层
pub struct DelimitedTextParser;

impl DelimitedTextParser {
    pub fn parse_text(&self, text: &str) -> ImportResult<ParsedTable> {
        ensure_has_data(text)?;

        let delimiter = detect_delimiter(text);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 列数不符的行由 build_table 统一丢弃
            .trim(Trim::All)
            .delimiter(delimiter as u8)
            .from_reader(text.as_bytes());

        let mut records = reader.records();

        let headers: Vec<String> = loop {
            match records.next() {
                Some(record) => {
                    let record = record?;
                    let headers: Vec<String> = record
                        .iter()
                        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                        .collect();
                    if headers.iter().any(|h| !h.is_empty()) {
                        break headers;
                    }
                    // 空白行跳过；多列但全空的表头行视为无表头
                    if headers.len() > 1 {
                        return Err(ImportError::EmptyInput);
                    }
                }
                None => return Err(ImportError::EmptyInput),
            }
        };

        let mut data = Vec::new();
        for record in records {
            let record = record?;
            data.push(record.iter().map(|v| v.trim().to_string()).collect());
        }

        let table = build_table(headers, data, delimiter);
        debug!(
            headers = table.headers.len(),
            rows = table.rows.len(),
            dropped = table.dropped_rows,
            delimiter = ?table.delimiter,
            "文本解析完成"
        );
        Ok(table)
    }
}

impl FileParser for DelimitedTextParser {
    fn parse_file(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let bytes = fs::read(file_path)?;
        let text = String::from_utf8_lossy(&bytes);
        self.parse_text(&text)
    }
}

// ==========================================
// ExcelParser - 读取第一个工作表
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_file(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| c.to_string().trim().to_string())
                    .collect::<Vec<String>>()
            })
            .filter(|values| values.iter().any(|v| !v.is_empty()));

        let headers = rows.next().ok_or(ImportError::EmptyInput)?;
        let data: Vec<Vec<String>> = rows.collect();
        if data.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        Ok(build_table(headers, data, ','))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ParsedTable> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => DelimitedTextParser.parse_file(path),
            "xlsx" | "xls" => ExcelParser.parse_file(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
