// ==========================================
// 销售预算报表系统 - 数据质量校验器实现
// ==========================================
// 职责: DQ 校验 + 转换为 Fact
// 级别:
// - ERROR   阻断该行: 代码无法识别 / 年份非正 / 月份越界 / 必填缺失 / 数值不可解析
// - WARNING 允许导入: 国家或产品组缺失 / 数值为 0
// - CONFLICT 同文件重复键: 后者覆盖前者，报告前者
// ==========================================

use crate::domain::fact::{Fact, FactKey, RawFactRecord};
use crate::domain::import::{DqLevel, DqSummary, DqViolation};
use crate::domain::types::{Division, RecordType, ValueType};
use crate::importer::budget_importer_trait::{DqOutcome, DqValidator as DqValidatorTrait};
use std::collections::HashMap;

pub struct DqValidator;

impl DqValidator {
    pub fn new() -> Self {
        Self
    }

    fn violation(record: &RawFactRecord, level: DqLevel, field: &str, message: String) -> DqViolation {
        DqViolation {
            row_number: record.row_number,
            customer: record.customer.clone(),
            level,
            field: field.to_string(),
            message,
        }
    }

    /// 单条记录校验；通过时返回 Fact
    fn check_record(&self, record: &RawFactRecord, out: &mut Vec<DqViolation>) -> Option<Fact> {
        let start = out.len();

        for (field, raw) in &record.invalid_fields {
            out.push(Self::violation(
                record,
                DqLevel::Error,
                field,
                format!("无法解析的数值: {}", raw),
            ));
        }

        let division = match record.division.as_deref() {
            None => {
                out.push(Self::violation(record, DqLevel::Error, "division", "事业部缺失".to_string()));
                None
            }
            Some(raw) => {
                let parsed = Division::from_str(raw);
                if parsed.is_none() {
                    out.push(Self::violation(
                        record,
                        DqLevel::Error,
                        "division",
                        format!("未知的事业部代码: {}", raw),
                    ));
                }
                parsed
            }
        };

        let year = match record.year {
            Some(y) if y > 0 => Some(y),
            Some(y) => {
                out.push(Self::violation(record, DqLevel::Error, "year", format!("年份必须为正整数: {}", y)));
                None
            }
            None => {
                out.push(Self::violation(record, DqLevel::Error, "year", "年份缺失".to_string()));
                None
            }
        };

        let month = match record.month {
            Some(m) if (1..=12).contains(&m) => Some(m),
            Some(m) => {
                out.push(Self::violation(record, DqLevel::Error, "month", format!("月份超出 1-12: {}", m)));
                None
            }
            None => {
                out.push(Self::violation(record, DqLevel::Error, "month", "月份缺失".to_string()));
                None
            }
        };

        let value_type = match record.value_type.as_deref() {
            None => {
                out.push(Self::violation(record, DqLevel::Error, "value_type", "数值类型缺失".to_string()));
                None
            }
            Some(raw) => {
                let parsed = ValueType::from_str(raw);
                if parsed.is_none() {
                    out.push(Self::violation(
                        record,
                        DqLevel::Error,
                        "value_type",
                        format!("未知的数值类型: {}", raw),
                    ));
                }
                parsed
            }
        };

        let record_type = match record.record_type.as_deref() {
            None => {
                out.push(Self::violation(record, DqLevel::Error, "record_type", "记录类型缺失".to_string()));
                None
            }
            Some(raw) => {
                let parsed = RecordType::from_str(raw);
                if parsed.is_none() {
                    out.push(Self::violation(
                        record,
                        DqLevel::Error,
                        "record_type",
                        format!("未知的记录类型: {}", raw),
                    ));
                }
                parsed
            }
        };

        if record.sales_rep.is_none() {
            out.push(Self::violation(record, DqLevel::Error, "sales_rep", "销售员缺失".to_string()));
        }
        if record.customer.is_none() {
            out.push(Self::violation(record, DqLevel::Error, "customer", "客户缺失".to_string()));
        }
        let value_missing = record.value.is_none()
            && !record.invalid_fields.iter().any(|(f, _)| f == "value");
        if value_missing {
            out.push(Self::violation(record, DqLevel::Error, "value", "数值缺失".to_string()));
        }

        let blocked = out[start..].iter().any(|v| v.level == DqLevel::Error);

        // 警告仅对未阻断的行有意义
        if !blocked {
            if record.country.is_none() {
                out.push(Self::violation(record, DqLevel::Warning, "country", "国家缺失".to_string()));
            }
            if record.product_group.is_none() {
                out.push(Self::violation(
                    record,
                    DqLevel::Warning,
                    "product_group",
                    "产品组缺失".to_string(),
                ));
            }
            if record.value == Some(0.0) {
                out.push(Self::violation(record, DqLevel::Warning, "value", "数值为 0".to_string()));
            }
        }

        Some(Fact {
            division: division?,
            year: year?,
            month: month?,
            sales_rep: record.sales_rep.clone()?,
            customer: record.customer.clone()?,
            country: record.country.clone().unwrap_or_default(),
            product_group: record.product_group.clone().unwrap_or_default(),
            value_type: value_type?,
            record_type: record_type?,
            value: record.value?,
        })
        .filter(|_| !blocked)
    }
}

impl Default for DqValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl DqValidatorTrait for DqValidator {
    fn validate(&self, records: Vec<RawFactRecord>) -> DqOutcome {
        let mut violations = Vec::new();
        let mut kept: Vec<Option<(usize, Fact)>> = Vec::new();
        let mut index_by_key: HashMap<FactKey, usize> = HashMap::new();
        let mut summary = DqSummary {
            total_rows: records.len(),
            ..Default::default()
        };

        for record in &records {
            let before = violations.len();
            let fact = self.check_record(record, &mut violations);

            let Some(fact) = fact else {
                summary.blocked += 1;
                continue;
            };
            if violations[before..].iter().any(|v| v.level == DqLevel::Warning) {
                summary.warning += 1;
            }

            let key = fact.key();
            if let Some(&idx) = index_by_key.get(&key) {
                if let Some((earlier_row, earlier)) = kept[idx].take() {
                    violations.push(DqViolation {
                        row_number: earlier_row,
                        customer: Some(earlier.customer.clone()),
                        level: DqLevel::Conflict,
                        field: "key".to_string(),
                        message: format!("与第 {} 行重复，以后者为准", record.row_number),
                    });
                    summary.conflict += 1;
                }
            }
            index_by_key.insert(key, kept.len());
            kept.push(Some((record.row_number, fact)));
        }

        let facts: Vec<(usize, Fact)> = kept.into_iter().flatten().collect();
        summary.success = facts.len();

        DqOutcome {
            facts,
            violations,
            summary,
        }
    }
}
