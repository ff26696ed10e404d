// ==========================================
// 销售预算报表系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / 压缩空白 / NULL 标准化
// 说明: 不改大小写，名称比较口径由 canonical_name 统一
// ==========================================

use crate::domain::fact::RawFactRecord;
use crate::importer::budget_importer_trait::DataCleaner as DataCleanerTrait;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let cleaned = self.clean_text(&v);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }

    fn clean_record(&self, record: RawFactRecord) -> RawFactRecord {
        RawFactRecord {
            division: self.normalize_null(record.division),
            sales_rep: self.normalize_null(record.sales_rep),
            customer: self.normalize_null(record.customer),
            country: self.normalize_null(record.country),
            product_group: self.normalize_null(record.product_group),
            value_type: self.normalize_null(record.value_type),
            record_type: self.normalize_null(record.record_type),
            ..record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(DataCleaner.clean_text("  ACME \t  LLC  "), "ACME LLC");
        assert_eq!(DataCleaner.clean_text("Plain"), "Plain");
    }

    #[test]
    fn test_normalize_null() {
        assert_eq!(DataCleaner.normalize_null(Some("   ".to_string())), None);
        assert_eq!(DataCleaner.normalize_null(None), None);
        assert_eq!(
            DataCleaner.normalize_null(Some(" UAE ".to_string())),
            Some("UAE".to_string())
        );
    }

    #[test]
    fn test_clean_record_keeps_case_and_numbers() {
        let record = RawFactRecord {
            customer: Some(" Acme   llc ".to_string()),
            country: Some("".to_string()),
            value: Some(-12.5),
            month: Some(4),
            row_number: 9,
            ..Default::default()
        };

        let cleaned = DataCleaner.clean_record(record);

        assert_eq!(cleaned.customer.as_deref(), Some("Acme llc"));
        assert_eq!(cleaned.country, None);
        assert_eq!(cleaned.value, Some(-12.5));
        assert_eq!(cleaned.month, Some(4));
        assert_eq!(cleaned.row_number, 9);
    }
}
