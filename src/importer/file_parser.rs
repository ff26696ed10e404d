// ==========================================
// 销售预算报表系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: Excel (.xlsx/.xls) / CSV (.csv) / HTML 导出页面 (.html/.htm)
// ==========================================

use crate::importer::budget_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_mapper::normalize_header;
use calamine::{Data, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// 读取文件前的公共检查
fn read_checked(path: &Path, allowed: &[&str]) -> ImporterResult<(Vec<u8>, String)> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&ext.as_str()) {
        return Err(ImportError::UnsupportedFormat(ext));
    }

    Ok((std::fs::read(path)?, ext))
}

/// 每列是否保留: 空表头丢弃；规范化后重名的表头只保留最左一列
fn header_mask(headers: &[String]) -> Vec<bool> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .map(|h| !h.is_empty() && seen.insert(normalize_header(h)))
        .collect()
}

/// 表头 + 数据行 → 行记录（跳过完全空白的行）
fn rows_to_records<I, R>(headers: &[String], rows: I) -> Vec<HashMap<String, String>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let keep = header_mask(headers);
    let mut records = Vec::new();
    for row in rows {
        let mut row_map = HashMap::new();
        for (col_idx, value) in row.into_iter().enumerate() {
            if keep.get(col_idx).copied().unwrap_or(false) {
                row_map.insert(headers[col_idx].clone(), value.trim().to_string());
            }
        }

        if row_map.values().all(|v| v.is_empty()) {
            continue;
        }
        records.push(row_map);
    }
    records
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImporterResult<Vec<HashMap<String, String>>> {
        let (bytes, ext) = read_checked(file_path, &["csv"])?;
        self.parse_bytes(&bytes, &ext)
    }

    fn parse_bytes(&self, bytes: &[u8], _extension: &str) -> ImporterResult<Vec<HashMap<String, String>>> {
        // Excel 导出的 CSV 常带 UTF-8 BOM
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }

        Ok(rows_to_records(&headers, rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 读取第一个工作表
    fn read_first_sheet<RS, W>(mut workbook: W) -> ImporterResult<Vec<HashMap<String, String>>>
    where
        RS: Read + Seek,
        W: Reader<RS>,
        W::Error: std::fmt::Display,
    {
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        Self::range_to_records(&range)
    }

    fn range_to_records(range: &Range<Data>) -> ImporterResult<Vec<HashMap<String, String>>> {
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        Ok(rows_to_records(
            &headers,
            rows.map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>()),
        ))
    }
}

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImporterResult<Vec<HashMap<String, String>>> {
        let (bytes, ext) = read_checked(file_path, &["xlsx", "xls"])?;
        self.parse_bytes(&bytes, &ext)
    }

    fn parse_bytes(&self, bytes: &[u8], extension: &str) -> ImporterResult<Vec<HashMap<String, String>>> {
        match extension {
            "xls" => {
                let workbook: Xls<_> = Xls::new(Cursor::new(bytes))
                    .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
                Self::read_first_sheet(workbook)
            }
            _ => {
                let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
                    .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
                Self::read_first_sheet(workbook)
            }
        }
    }
}

// ==========================================
// HTML 内嵌数据解析器
// ==========================================
// 导出页面把预算记录序列化为 JSON 数组嵌在页面里，两种写法:
// 1) <script type="application/json" id="budget-data">[...]</script>
// 2) budgetData = [...]（分号可省略）
pub struct HtmlEmbeddedParser {
    script_block: Regex,
    assignment: Regex,
}

impl HtmlEmbeddedParser {
    pub fn new() -> ImporterResult<Self> {
        let script_block = Regex::new(
            r#"(?is)<script[^>]*\bid\s*=\s*["']budget-data["'][^>]*>(.*?)</script>"#,
        )
        .map_err(|e| ImportError::InternalError(e.to_string()))?;
        let assignment = Regex::new(r"\bbudgetData\s*=\s*\[")
            .map_err(|e| ImportError::InternalError(e.to_string()))?;

        Ok(Self {
            script_block,
            assignment,
        })
    }

    /// 提取内嵌 JSON 数组
    ///
    /// 赋值写法只定位数组起点，由 serde_json 流式读取恰好一个数组，
    /// 字符串里的 `];` 不会截断数据
    pub fn extract_items(&self, html: &str) -> ImporterResult<Vec<Value>> {
        if let Some(block) = self.script_block.captures(html).and_then(|c| c.get(1)) {
            return Ok(serde_json::from_str(block.as_str().trim())?);
        }

        let start = self
            .assignment
            .find(html)
            .map(|m| m.end() - 1)
            .ok_or_else(|| {
                ImportError::HtmlParseError("未找到内嵌预算数据 (budget-data / budgetData)".to_string())
            })?;

        serde_json::Deserializer::from_str(&html[start..])
            .into_iter::<Vec<Value>>()
            .next()
            .unwrap_or_else(|| Ok(Vec::new()))
            .map_err(ImportError::from)
    }

    /// JSON 标量 → 文本（null → 空串）
    fn value_to_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// 解析 HTML 文本
    pub fn parse_html(&self, html: &str) -> ImporterResult<Vec<HashMap<String, String>>> {
        let items = self.extract_items(html)?;

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| ImportError::FieldMappingError {
                row: idx + 1,
                message: "内嵌数据元素不是对象".to_string(),
            })?;

            let row: HashMap<String, String> = obj
                .iter()
                .map(|(k, v)| (k.trim().to_string(), Self::value_to_text(v).trim().to_string()))
                .collect();
            if row.values().all(|v| v.is_empty()) {
                continue;
            }
            records.push(row);
        }
        Ok(records)
    }
}

impl FileParser for HtmlEmbeddedParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImporterResult<Vec<HashMap<String, String>>> {
        let (bytes, ext) = read_checked(file_path, &["html", "htm"])?;
        self.parse_bytes(&bytes, &ext)
    }

    fn parse_bytes(&self, bytes: &[u8], _extension: &str) -> ImporterResult<Vec<HashMap<String, String>>> {
        let html = String::from_utf8_lossy(bytes);
        self.parse_html(&html)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn extension_of(name: &str) -> String {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImporterResult<Vec<HashMap<String, String>>> {
        let path = file_path.as_ref();
        match Self::extension_of(&path.to_string_lossy()).as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_records(path),
            "html" | "htm" => HtmlEmbeddedParser::new()?.parse_to_raw_records(path),
            ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn parse_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> ImporterResult<Vec<HashMap<String, String>>> {
        let ext = Self::extension_of(file_name);
        match ext.as_str() {
            "csv" => CsvParser.parse_bytes(bytes, &ext),
            "xlsx" | "xls" => ExcelParser.parse_bytes(bytes, &ext),
            "html" | "htm" => HtmlEmbeddedParser::new()?.parse_bytes(bytes, &ext),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
