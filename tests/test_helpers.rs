// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、临时导入文件等功能
// ==========================================

#![allow(dead_code)]

use sales_budget_report::db::{init_schema, open_sqlite_connection};
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入带扩展名的临时导入文件
///
/// # 参数
/// - suffix: 扩展名（含点，例如 ".csv"）
/// - content: 文件内容
pub fn write_import_file(suffix: &str, content: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// 预算 HTML 导出（内嵌 budget-data 脚本块）
pub fn budget_html(records_json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Budget</title></head>
<body>
<table id="budget"></table>
<script type="application/json" id="budget-data">{}</script>
</body>
</html>"#,
        records_json
    )
}
