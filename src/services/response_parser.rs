//! 生成响应解析与校验 - 业务能力层
//!
//! 把不可信的表格文本转换为合法的 [`QuestionRecord`] 列表。
//! 行级缺陷变成诊断信息，不会让整批失败。

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::error::{AppResult, InputError};
use crate::models::table::FIELD_SEPARATOR;
use crate::models::{decode_row, ChoicesFormat, QuestionRecord, Table, ValidationError};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:tsv)?\n(.+?)```").expect("代码块正则不合法")
});

/// 诊断预览的条数上限
pub const DIAGNOSTIC_PREVIEW: usize = 5;

/// 候选文本提取策略，按声明顺序依次尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// ```tsv 或无标签代码块
    FencedBlock,
    /// 所有包含制表符的行
    TabLines,
    /// 整个响应文本
    RawText,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::FencedBlock,
        ExtractionStrategy::TabLines,
        ExtractionStrategy::RawText,
    ];

    fn extract(self, response: &str) -> Option<String> {
        let candidate = match self {
            ExtractionStrategy::FencedBlock => FENCED_BLOCK
                .captures(response)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string()),
            ExtractionStrategy::TabLines => {
                let lines: Vec<&str> = response
                    .lines()
                    .filter(|line| line.contains(FIELD_SEPARATOR))
                    .collect();
                (!lines.is_empty()).then(|| lines.join("\n"))
            }
            ExtractionStrategy::RawText => Some(response.trim().to_string()),
        };
        candidate.filter(|text| !text.trim().is_empty())
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractionStrategy::FencedBlock => "代码块",
            ExtractionStrategy::TabLines => "制表符行",
            ExtractionStrategy::RawText => "全文",
        };
        write!(f, "{}", name)
    }
}

/// 按固定顺序尝试各提取策略
///
/// 只有在响应完全没有文本时才返回错误。
pub fn extract_candidate(response: &str) -> AppResult<(ExtractionStrategy, String)> {
    ExtractionStrategy::ORDER
        .into_iter()
        .find_map(|strategy| strategy.extract(response).map(|text| (strategy, text)))
        .ok_or_else(|| InputError::NoCandidateText.into())
}

/// 单行的解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(QuestionRecord),
    Rejected(RowDiagnostic),
}

/// 行级诊断
#[derive(Debug, Clone, PartialEq)]
pub struct RowDiagnostic {
    /// 行号（表头为第1行）
    pub line: usize,
    pub reason: ValidationError,
}

impl std::fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "行{}: {}", self.line, self.reason)
    }
}

/// 解析报告
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub strategy: ExtractionStrategy,
    pub accepted: Vec<QuestionRecord>,
    pub rejected: Vec<RowDiagnostic>,
}

impl ParseReport {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn error_count(&self) -> usize {
        self.rejected.len()
    }

    /// 前 N 条诊断
    pub fn preview(&self) -> &[RowDiagnostic] {
        &self.rejected[..self.rejected.len().min(DIAGNOSTIC_PREVIEW)]
    }

    /// 记录诊断：总数、前5条原因、剩余条数
    pub fn log_diagnostics(&self) {
        if self.rejected.is_empty() {
            return;
        }
        warn!("⚠️ 校验错误: {} 件", self.error_count());
        for diag in self.preview() {
            warn!("  - {}", diag);
        }
        let rest = self.error_count().saturating_sub(DIAGNOSTIC_PREVIEW);
        if rest > 0 {
            warn!("  ... 以及其他 {} 件", rest);
        }
    }
}

/// 解码表格中的每一行
pub fn decode_rows(table: &Table) -> Vec<RowOutcome> {
    table
        .rows
        .iter()
        .map(|row| match decode_row(row, ChoicesFormat::JsonOnly) {
            Ok(record) => RowOutcome::Accepted(record),
            Err(reason) => RowOutcome::Rejected(RowDiagnostic {
                line: row.line,
                reason,
            }),
        })
        .collect()
}

/// 解析并校验一次生成响应
pub fn parse_response(response: &str) -> AppResult<ParseReport> {
    let (strategy, text) = extract_candidate(response)?;
    debug!("候选文本提取方式: {}", strategy);

    let table = Table::parse(&text);
    let (mut accepted, mut rejected) = (Vec::new(), Vec::new());
    for outcome in decode_rows(&table) {
        match outcome {
            RowOutcome::Accepted(record) => accepted.push(record),
            RowOutcome::Rejected(diag) => rejected.push(diag),
        }
    }

    let report = ParseReport {
        strategy,
        accepted,
        rejected,
    };
    info!(
        "✓ 解析完成: 合格 {} 件 / 错误 {} 件",
        report.accepted_count(),
        report.error_count()
    );
    report.log_diagnostics();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const HEADER: &str = "subject\tgenre_id\tgenre_name\tquestion_text\tchoices\tcorrect_index\tcorrect_answer\thint\tdifficulty";

    fn row(choices: &str, index: &str, answer: &str) -> String {
        format!(
            "jp\tJP01\t漢字・語彙\t「山」の読みは？\t{}\t{}\t{}\tやま\tnormal",
            choices, index, answer
        )
    }

    fn fenced(rows: &[String]) -> String {
        format!("はい。\n```tsv\n{}\n{}\n```\n以上です。", HEADER, rows.join("\n"))
    }

    #[test]
    fn test_fenced_block_is_preferred() {
        let response = fenced(&[row(r#"["やま","かわ","うみ","そら"]"#, "0", "やま")]);
        let report = parse_response(&response).unwrap();
        assert_eq!(report.strategy, ExtractionStrategy::FencedBlock);
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.accepted[0].choices[0], "やま");
        assert_eq!(report.accepted[0].hint.as_deref(), Some("やま"));
    }

    #[test]
    fn test_untagged_fence() {
        let response = format!(
            "```\n{}\n{}\n```",
            HEADER,
            row(r#"["A","B","C","D"]"#, "1", "B")
        );
        let report = parse_response(&response).unwrap();
        assert_eq!(report.strategy, ExtractionStrategy::FencedBlock);
        assert_eq!(report.accepted[0].correct_index, 1);
    }

    #[test]
    fn test_tab_lines_fallback() {
        let response = format!(
            "以下が結果です\n{}\n{}\nおわり",
            HEADER,
            row(r#"["A","B","C","D"]"#, "3", "D")
        );
        let report = parse_response(&response).unwrap();
        assert_eq!(report.strategy, ExtractionStrategy::TabLines);
        assert_eq!(report.accepted_count(), 1);
    }

    #[test]
    fn test_raw_text_fallback_never_raises() {
        let report = parse_response("申し訳ありません").unwrap();
        assert_eq!(report.strategy, ExtractionStrategy::RawText);
        assert_eq!(report.accepted_count(), 0);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_blank_response_has_no_candidate() {
        assert!(matches!(
            parse_response("  \n "),
            Err(AppError::Input(InputError::NoCandidateText))
        ));
    }

    #[test]
    fn test_short_row_is_padded_not_dropped() {
        // hint / difficulty 缺失
        let short = "jp\tJP01\t漢字・語彙\tq\t[\"A\",\"B\",\"C\",\"D\"]\t0\tA".to_string();
        let report = parse_response(&fenced(&[short])).unwrap();
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.accepted[0].hint, None);
        assert_eq!(report.accepted[0].difficulty, None);
    }

    #[test]
    fn test_row_level_diagnostics() {
        let rows = vec![
            row(r#"["A","B","C","D"]"#, "0", "A"),
            row(r#"["A","B","B","C"]"#, "0", "A"),
            row(r#"["A","B","C","D"]"#, "5", "A"),
            row("not json", "0", "A"),
            row(r#"["A","B","C"]"#, "0", "A"),
            row(r#"["A","B","C","D"]"#, "x", "A"),
            "jp\tJP01".to_string(),
        ];
        let report = parse_response(&fenced(&rows)).unwrap();

        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.error_count(), 6);

        let reasons: Vec<&ValidationError> = report.rejected.iter().map(|d| &d.reason).collect();
        assert!(reasons[0].is_duplicate());
        assert!(report.rejected[0].to_string().contains("重复"));
        assert_eq!(
            *reasons[1],
            ValidationError::IndexOutOfRange { index: 5, len: 4 }
        );
        assert_eq!(*reasons[2], ValidationError::ChoicesNotJson);
        assert_eq!(*reasons[3], ValidationError::ChoiceCount(3));
        assert_eq!(*reasons[4], ValidationError::IndexNotNumber("x".to_string()));
        assert_eq!(*reasons[5], ValidationError::MissingField("genre_name"));

        // 第一条数据行是第2行
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(report.preview().len(), DIAGNOSTIC_PREVIEW);
    }

    #[test]
    fn test_accepted_records_hold_invariants() {
        let rows = vec![
            row(r#"["A","B","C","D"]"#, "2", "C"),
            row(r#"["や","ま","か","わ"]"#, "3", "わ"),
        ];
        let report = parse_response(&fenced(&rows)).unwrap();
        for record in &report.accepted {
            assert_eq!(record.choices.len(), 4);
            let idx = record.checked_index().unwrap();
            assert!(!record.choices[idx].is_empty());
            assert!(record.validate().is_ok());
        }
    }
}
