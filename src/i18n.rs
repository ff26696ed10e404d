// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数，使用当前语言）
///
/// # 示例
/// ```no_run
/// use sales_budget_report::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 按指定语言翻译（不修改全局语言，供并发请求使用）
pub fn t_for(locale: &str, key: &str) -> String {
    rust_i18n::t!(key, locale = locale).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use sales_budget_report::i18n::t_with_args;
/// let msg = t_with_args("import.file_not_found", &[("path", "/tmp/test.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 由 Accept-Language 头解析语言
///
/// 首选语言为 en* 时返回 "en"，其余（含缺省）返回 "zh-CN"
pub fn resolve_locale(accept_language: Option<&str>) -> &'static str {
    let preferred = accept_language
        .and_then(|h| h.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or("").trim().to_lowercase());

    match preferred {
        Some(tag) if tag.starts_with("en") => "en",
        _ => DEFAULT_LOCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");

        set_locale("en");
        assert_eq!(current_locale(), "en");

        // 恢复默认语言
        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("common.success"), "操作成功");

        set_locale("en");
        assert_eq!(t("common.success"), "Operation successful");

        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("import.file_not_found", &[("path", "/tmp/budget.html")]);
        assert!(msg.contains("/tmp/budget.html"));
        assert!(msg.contains("File not found"));

        set_locale("zh-CN");
    }

    #[test]
    fn test_t_for_ignores_global_locale() {
        assert_eq!(t_for("en", "errors.validation_error"), "Validation failed");
        assert_eq!(t_for("zh-CN", "errors.validation_error"), "数据验证失败");
    }

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale(None), "zh-CN");
        assert_eq!(resolve_locale(Some("en-US,en;q=0.9")), "en");
        assert_eq!(resolve_locale(Some("EN")), "en");
        assert_eq!(resolve_locale(Some("zh-CN,zh;q=0.9,en;q=0.8")), "zh-CN");
        assert_eq!(resolve_locale(Some("")), "zh-CN");
    }
}
