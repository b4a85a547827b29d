//! 题目记录模型
//!
//! `QuestionRecord` 是整个流水线的基本单位。"合法" 的定义只在这里：
//! 解析器、导入协调器、乱序器都调用 [`QuestionRecord::validate`]，不各自实现。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 固定的四选一题型
pub const CHOICE_COUNT: usize = 4;

/// 必填字段（线上字段名）
pub const REQUIRED_FIELDS: [&str; 7] = [
    "subject",
    "genre_id",
    "genre_name",
    "question_text",
    "choices",
    "correct_index",
    "correct_answer",
];

/// TSV 列顺序
pub const TSV_COLUMNS: [&str; 9] = [
    "subject",
    "genre_id",
    "genre_name",
    "question_text",
    "choices",
    "correct_index",
    "correct_answer",
    "hint",
    "difficulty",
];

/// 题目记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub subject: String,
    pub genre_id: String,
    pub genre_name: String,
    pub question_text: String,
    pub choices: Vec<String>,
    /// 正确选项位置（0-based）。导入的旧数据可能是 1-based，见 `services::shuffler`
    pub correct_index: i64,
    /// 正确选项文本的冗余副本，选项重排后用它重新定位正确答案
    #[serde(rename = "correct_answer")]
    pub correct_answer_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// 由存储服务分配
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// 校验失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("缺少字段: {0}")]
    MissingField(&'static str),
    #[error("choices 不是合法的JSON")]
    ChoicesNotJson,
    #[error("choices 必须是数组")]
    ChoicesNotArray,
    #[error("choices 的元素必须是文本")]
    ChoiceNotText,
    #[error("choices 必须恰好有 4 个选项, 实际 {0} 个")]
    ChoiceCount(usize),
    #[error("choices 存在重复选项: {0:?}")]
    DuplicateChoices(Vec<String>),
    #[error("correct_index 不是整数: {0}")]
    IndexNotNumber(String),
    #[error("correct_index {index} 超出范围 [0, {len})")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("correct_answer '{0}' 不在 choices 中")]
    AnswerNotInChoices(String),
    #[error("correct_answer '{answer}' 与 choices[{index}] '{choice}' 不一致")]
    AnswerMismatch {
        index: usize,
        choice: String,
        answer: String,
    },
}

impl ValidationError {
    /// 是否为重复选项错误
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ValidationError::DuplicateChoices(_))
    }
}

/// 校验选项列表：数量恰好为4，且两两不同
pub fn validate_choices(choices: &[String]) -> Result<(), ValidationError> {
    if choices.len() != CHOICE_COUNT {
        return Err(ValidationError::ChoiceCount(choices.len()));
    }
    let unique: HashSet<&String> = choices.iter().collect();
    if unique.len() != choices.len() {
        return Err(ValidationError::DuplicateChoices(choices.to_vec()));
    }
    Ok(())
}

impl QuestionRecord {
    /// 校验记录是否满足全部不变式
    ///
    /// 顺序：必填字段 → 选项数量 → 选项重复 → 索引范围 → 正确答案一致性。
    /// 遇到第一个失败即返回。
    pub fn validate(&self) -> Result<(), ValidationError> {
        let text_fields = [
            ("subject", &self.subject),
            ("genre_id", &self.genre_id),
            ("genre_name", &self.genre_name),
            ("question_text", &self.question_text),
        ];
        for (name, value) in text_fields {
            if value.is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }
        if self.choices.is_empty() {
            return Err(ValidationError::MissingField("choices"));
        }
        if self.correct_answer_text.is_empty() {
            return Err(ValidationError::MissingField("correct_answer"));
        }

        validate_choices(&self.choices)?;

        let index = self.checked_index()?;

        let choice = &self.choices[index];
        if choice != &self.correct_answer_text {
            return Err(ValidationError::AnswerMismatch {
                index,
                choice: choice.clone(),
                answer: self.correct_answer_text.clone(),
            });
        }

        Ok(())
    }

    /// `correct_index` 落在 `[0, len(choices))` 内时返回其 usize 形式
    pub fn checked_index(&self) -> Result<usize, ValidationError> {
        usize::try_from(self.correct_index)
            .ok()
            .filter(|i| *i < self.choices.len())
            .ok_or(ValidationError::IndexOutOfRange {
                index: self.correct_index,
                len: self.choices.len(),
            })
    }

    /// 正确选项文本（索引合法时）
    pub fn correct_choice(&self) -> Option<&str> {
        self.checked_index()
            .ok()
            .map(|i| self.choices[i].as_str())
    }
}
