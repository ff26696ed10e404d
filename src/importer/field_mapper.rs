// ==========================================
// 销售预算报表系统 - 字段映射器实现
// ==========================================
// 职责: 源表头 → 标准字段映射 + 类型转换
// 口径: 表头比较忽略大小写、空格、下划线、连字符
// 宽表: 每月一列（Jan..Dec）的行按月展开
// ==========================================

use crate::domain::fact::RawFactRecord;
use crate::domain::import::ImportContext;
use crate::importer::budget_importer_trait::FieldMapper as FieldMapperTrait;
use std::collections::HashMap;

/// 标准字段 → 可接受的表头（已规范化）
const DIVISION_ALIASES: &[&str] = &["division", "div", "事业部"];
const YEAR_ALIASES: &[&str] = &["year", "budgetyear", "年份"];
const MONTH_ALIASES: &[&str] = &["month", "monthno", "月份"];
const SALES_REP_ALIASES: &[&str] = &["salesrep", "salesrepname", "rep", "salesman", "销售员"];
const CUSTOMER_ALIASES: &[&str] = &["customer", "customername", "client", "客户"];
const COUNTRY_ALIASES: &[&str] = &["country", "countryname", "国家"];
const PRODUCT_GROUP_ALIASES: &[&str] = &["productgroup", "pgcombine", "productgroupname", "产品组"];
const VALUE_TYPE_ALIASES: &[&str] = &["valuetype", "valuestype", "measure", "数值类型"];
const RECORD_TYPE_ALIASES: &[&str] = &["type", "recordtype", "datatype", "记录类型"];
const VALUE_ALIASES: &[&str] = &["value", "values", "数值"];

/// 表头规范化
pub(crate) fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-' && *c != '.')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// 月份文本 → 1..12（数字或英文月份名）
pub fn parse_month(value: &str) -> Option<u32> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    if let Ok(n) = v.parse::<u32>() {
        return Some(n);
    }
    if let Ok(f) = v.parse::<f64>() {
        if f.fract() == 0.0 && f >= 0.0 {
            return Some(f as u32);
        }
        return None;
    }

    month_from_name(&normalize_header(v))
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// 数值解析（容忍千分位逗号）
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub struct FieldMapper;

impl FieldMapper {
    /// 按别名取第一个非空值
    fn get_string(&self, row: &HashMap<String, &String>, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| row.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    /// 解析数值字段；失败时记入 invalid_fields
    fn parse_f64(
        &self,
        row: &HashMap<String, &String>,
        aliases: &[&str],
        field: &str,
        invalid: &mut Vec<(String, String)>,
    ) -> Option<f64> {
        let raw = self.get_string(row, aliases)?;
        match parse_number(&raw) {
            Some(v) => Some(v),
            None => {
                invalid.push((field.to_string(), raw));
                None
            }
        }
    }

    fn parse_i32(
        &self,
        row: &HashMap<String, &String>,
        aliases: &[&str],
        field: &str,
        invalid: &mut Vec<(String, String)>,
    ) -> Option<i32> {
        let raw = self.get_string(row, aliases)?;
        match parse_number(&raw) {
            Some(v) if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => Some(v as i32),
            _ => {
                invalid.push((field.to_string(), raw));
                None
            }
        }
    }

    fn parse_month_field(
        &self,
        row: &HashMap<String, &String>,
        invalid: &mut Vec<(String, String)>,
    ) -> Option<u32> {
        let raw = self.get_string(row, MONTH_ALIASES)?;
        match parse_month(&raw) {
            Some(m) => Some(m),
            None => {
                invalid.push(("month".to_string(), raw));
                None
            }
        }
    }

    /// 宽表月份列: (月份, 原值)，按月份排序
    fn month_columns<'a>(&self, row: &HashMap<String, &'a String>) -> Vec<(u32, &'a String)> {
        let mut cols: Vec<(u32, &String)> = row
            .iter()
            .filter_map(|(k, v)| month_from_name(k).map(|m| (m, *v)))
            .collect();
        cols.sort_by_key(|(m, _)| *m);
        cols
    }
}

impl FieldMapperTrait for FieldMapper {
    fn map_to_raw_records(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> Vec<RawFactRecord> {
        // 规范化后重名时按原表头排序取第一个，结果与 HashMap 遍历顺序无关
        let mut headers: Vec<&String> = row.keys().collect();
        headers.sort();
        let mut normalized: HashMap<String, &String> = HashMap::new();
        for header in headers {
            normalized
                .entry(normalize_header(header))
                .or_insert(&row[header]);
        }

        let mut invalid = Vec::new();
        let base = RawFactRecord {
            division: self.get_string(&normalized, DIVISION_ALIASES),
            year: self.parse_i32(&normalized, YEAR_ALIASES, "year", &mut invalid),
            month: None,
            sales_rep: self.get_string(&normalized, SALES_REP_ALIASES),
            customer: self.get_string(&normalized, CUSTOMER_ALIASES),
            country: self.get_string(&normalized, COUNTRY_ALIASES),
            product_group: self.get_string(&normalized, PRODUCT_GROUP_ALIASES),
            value_type: self.get_string(&normalized, VALUE_TYPE_ALIASES),
            record_type: self.get_string(&normalized, RECORD_TYPE_ALIASES),
            value: None,
            row_number,
            invalid_fields: Vec::new(),
        };

        let wide: Vec<(u32, &String)> = self
            .month_columns(&normalized)
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let has_long_value = self.get_string(&normalized, VALUE_ALIASES).is_some();

        // 长表: month + value
        if wide.is_empty() || has_long_value {
            let mut record = base;
            record.month = self.parse_month_field(&normalized, &mut invalid);
            record.value = self.parse_f64(&normalized, VALUE_ALIASES, "value", &mut invalid);
            record.invalid_fields = invalid;
            return vec![record];
        }

        // 宽表: 每个非空月份列一条
        wide.into_iter()
            .map(|(month, raw)| {
                let mut record = base.clone();
                let mut invalid = invalid.clone();
                record.month = Some(month);
                record.value = match parse_number(raw) {
                    Some(v) => Some(v),
                    None => {
                        invalid.push(("value".to_string(), raw.trim().to_string()));
                        None
                    }
                };
                record.invalid_fields = invalid;
                record
            })
            .collect()
    }

    fn apply_context(&self, record: &mut RawFactRecord, context: &ImportContext) {
        if record.division.is_none() {
            record.division = context.division.map(|d| d.to_db_str().to_string());
        }
        if record.year.is_none() {
            record.year = context.year;
        }
        if record.sales_rep.is_none() {
            record.sales_rep = context.sales_rep.clone();
        }
        if record.value_type.is_none() {
            record.value_type = context.value_type.map(|v| v.to_db_str().to_string());
        }
        if record.record_type.is_none() {
            record.record_type = context.record_type.map(|r| r.to_db_str().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Division, RecordType};

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_field_mapper_aliases() {
        let records = FieldMapper.map_to_raw_records(
            &row(&[
                ("Sales Rep", " Narek "),
                ("Customer Name", "ACME LLC"),
                ("Country", "UAE"),
                ("PGCombine", "Plain"),
                ("Month", "3"),
                ("Value", "1,250.5"),
                ("Type", "Budget"),
            ]),
            2,
        );

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.sales_rep.as_deref(), Some("Narek"));
        assert_eq!(r.customer.as_deref(), Some("ACME LLC"));
        assert_eq!(r.product_group.as_deref(), Some("Plain"));
        assert_eq!(r.month, Some(3));
        assert_eq!(r.value, Some(1250.5));
        assert_eq!(r.record_type.as_deref(), Some("Budget"));
        assert_eq!(r.row_number, 2);
        assert!(r.invalid_fields.is_empty());
    }

    #[test]
    fn test_colliding_headers_resolved_deterministically() {
        let input = row(&[
            ("customer", "Lower Co"),
            ("Customer", "Upper Co"),
            ("Month", "1"),
            ("Value", "5"),
        ]);

        for _ in 0..8 {
            let records = FieldMapper.map_to_raw_records(&input, 1);
            assert_eq!(records[0].customer.as_deref(), Some("Upper Co"));
        }
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_month("Feb"), Some(2));
        assert_eq!(parse_month(" september "), Some(9));
        assert_eq!(parse_month("12.0"), Some(12));
        assert_eq!(parse_month("13"), Some(13)); // 越界由 DQ 阶段阻断
        assert_eq!(parse_month("Q1"), None);
    }

    #[test]
    fn test_wide_row_expands_non_empty_months() {
        let records = FieldMapper.map_to_raw_records(
            &row(&[
                ("customer", "ACME"),
                ("Jan", "10"),
                ("Feb", ""),
                ("Mar", "30"),
                ("December", "x"),
            ]),
            5,
        );

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].month, Some(1));
        assert_eq!(records[0].value, Some(10.0));
        assert_eq!(records[1].month, Some(3));
        assert_eq!(records[2].month, Some(12));
        assert_eq!(records[2].value, None);
        assert_eq!(
            records[2].invalid_fields,
            vec![("value".to_string(), "x".to_string())]
        );
        assert!(records.iter().all(|r| r.customer.as_deref() == Some("ACME")));
    }

    #[test]
    fn test_invalid_number_recorded() {
        let records = FieldMapper.map_to_raw_records(
            &row(&[("customer", "ACME"), ("month", "1"), ("value", "abc"), ("year", "20x5")]),
            1,
        );

        assert_eq!(records[0].value, None);
        assert_eq!(records[0].year, None);
        assert_eq!(records[0].invalid_fields.len(), 2);
    }

    #[test]
    fn test_apply_context_keeps_row_values() {
        let mut record = RawFactRecord {
            division: Some("HC".to_string()),
            ..Default::default()
        };
        let ctx = ImportContext {
            division: Some(Division::Fp),
            year: Some(2025),
            sales_rep: Some("Narek".to_string()),
            record_type: Some(RecordType::Budget),
            ..Default::default()
        };

        FieldMapper.apply_context(&mut record, &ctx);

        assert_eq!(record.division.as_deref(), Some("HC"));
        assert_eq!(record.year, Some(2025));
        assert_eq!(record.sales_rep.as_deref(), Some("Narek"));
        assert_eq!(record.record_type.as_deref(), Some("BUDGET"));
        assert_eq!(record.value_type, None);
    }
}
