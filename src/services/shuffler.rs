//! 选项乱序 - 业务能力层
//!
//! 均匀随机排列选项，并重新计算 `correct_index`，保证乱序前后
//! 被标为正确的是同一段文本。

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use crate::models::{QuestionRecord, ValidationError, CHOICE_COUNT};

/// 旧格式题目（`choice_1`..`choice_4`）缺少 correct_index 时的默认值
pub const LEGACY_DEFAULT_INDEX: i64 = 1;

/// 按存储的索引定位正确选项文本
///
/// 兼容处理：索引在 `[1, 4]` 内视为旧的 1-based 格式，否则视为 0-based。
/// 这个启发式无法区分 0-based 的 1..3 与旧数据，只作为兼容手段保留。
pub fn legacy_correct_text(choices: &[String], index: i64) -> Result<&str, ValidationError> {
    let position = if (1..=CHOICE_COUNT as i64).contains(&index) {
        index - 1
    } else {
        index
    };
    usize::try_from(position)
        .ok()
        .and_then(|p| choices.get(p))
        .map(String::as_str)
        .ok_or(ValidationError::IndexOutOfRange {
            index,
            len: choices.len(),
        })
}

/// 确定乱序前的正确选项文本
///
/// 有 `correct_answer` 时以它为准，在选项中找不到则报错；
/// 只有缺少 `correct_answer` 时才使用索引启发式。
pub fn resolve_correct_text<'a>(
    choices: &'a [String],
    index: i64,
    answer: Option<&str>,
) -> Result<&'a str, ValidationError> {
    match answer.filter(|a| !a.is_empty()) {
        Some(answer) => choices
            .iter()
            .find(|c| c.as_str() == answer)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::AnswerNotInChoices(answer.to_string())),
        None => legacy_correct_text(choices, index),
    }
}

/// 乱序后正确答案位置的分布
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDistribution {
    pub counts: [usize; CHOICE_COUNT],
    /// 无法确定正确答案、未处理的题目数
    pub unresolved: usize,
}

impl IndexDistribution {
    /// 记录一个乱序后的位置，超出范围的计为未处理
    pub fn record(&mut self, index: usize) {
        match self.counts.get_mut(index) {
            Some(count) => *count += 1,
            None => self.unresolved += 1,
        }
    }

    /// 已乱序的题目数
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// 某位置所占百分比
    pub fn percentage(&self, index: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.get(index).copied().unwrap_or(0) as f64 * 100.0 / total as f64
    }
}

impl std::fmt::Display for IndexDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "正确答案位置分布:")?;
        for (idx, count) in self.counts.iter().enumerate() {
            writeln!(f, "  位置{}: {} 题 ({:.1}%)", idx, count, self.percentage(idx))?;
        }
        if self.unresolved > 0 {
            writeln!(f, "  未处理: {} 题", self.unresolved)?;
        }
        Ok(())
    }
}

/// 选项乱序器
pub struct ChoiceShuffler {
    rng: ChaCha8Rng,
}

impl ChoiceShuffler {
    /// 指定种子时结果可复现
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self { rng }
    }

    /// 排列选项，返回新选项和正确文本的位置（有重复时取第一个）
    fn permute(&mut self, mut choices: Vec<String>, correct: &str) -> (Vec<String>, usize) {
        choices.shuffle(&mut self.rng);
        let position = choices
            .iter()
            .position(|c| c == correct)
            .unwrap_or_default();
        (choices, position)
    }

    /// 乱序单个题目记录
    pub fn shuffle_record(&mut self, record: &QuestionRecord) -> Result<QuestionRecord, ValidationError> {
        let correct = resolve_correct_text(
            &record.choices,
            record.correct_index,
            Some(&record.correct_answer_text),
        )?
        .to_string();

        let (choices, position) = self.permute(record.choices.clone(), &correct);
        Ok(QuestionRecord {
            choices,
            correct_index: position as i64,
            correct_answer_text: correct,
            ..record.clone()
        })
    }

    /// 原地乱序一批记录，无法确定正确答案的记录保持不变
    pub fn shuffle_records(&mut self, records: &mut [QuestionRecord]) -> IndexDistribution {
        let mut distribution = IndexDistribution::default();
        for record in records.iter_mut() {
            match self.shuffle_record(record) {
                Ok(shuffled) => {
                    distribution.record(shuffled.correct_index as usize);
                    *record = shuffled;
                }
                Err(e) => {
                    tracing::warn!("⚠️ 跳过题目 '{}': {}", record.question_text, e);
                    distribution.unresolved += 1;
                }
            }
        }
        distribution
    }

    /// 乱序一个 JSON 题目，支持 `choices` 数组与旧的 `choice_1`..`choice_4` 两种形式
    ///
    /// 返回乱序后的 0-based 正确位置。
    pub fn shuffle_question_value(&mut self, question: &mut Value) -> Result<usize, ValidationError> {
        let answer = question
            .get("correct_answer")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(Value::Array(items)) = question.get("choices") {
            let choices = items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or(ValidationError::ChoiceNotText))
                .collect::<Result<Vec<String>, _>>()?;
            if choices.len() != CHOICE_COUNT {
                return Err(ValidationError::ChoiceCount(choices.len()));
            }
            let index = json_index(question).unwrap_or(0);
            let correct = resolve_correct_text(&choices, index, answer.as_deref())?.to_string();
            let (choices, position) = self.permute(choices, &correct);

            question["choices"] = Value::from(choices);
            question["correct_index"] = Value::from(position);
            if answer.is_some() {
                question["correct_answer"] = Value::from(correct);
            }
            return Ok(position);
        }

        let choices = (1..=CHOICE_COUNT)
            .map(|n| {
                question
                    .get(format!("choice_{}", n))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or(ValidationError::MissingField("choices"))
            })
            .collect::<Result<Vec<String>, _>>()?;
        let index = json_index(question).unwrap_or(LEGACY_DEFAULT_INDEX);
        let correct = legacy_correct_text(&choices, index)?.to_string();
        let (choices, position) = self.permute(choices, &correct);

        for (n, choice) in choices.into_iter().enumerate() {
            question[format!("choice_{}", n + 1)] = Value::from(choice);
        }
        question["correct_index"] = Value::from(position);
        Ok(position)
    }

    /// 乱序整个文档：带 `questions` 数组的题库对象，或题目数组
    pub fn shuffle_document(&mut self, document: &mut Value) -> IndexDistribution {
        let questions = match document {
            Value::Array(items) => items,
            Value::Object(map) => match map.get_mut("questions") {
                Some(Value::Array(items)) => items,
                _ => return IndexDistribution::default(),
            },
            _ => return IndexDistribution::default(),
        };

        let mut distribution = IndexDistribution::default();
        for (idx, question) in questions.iter_mut().enumerate() {
            match self.shuffle_question_value(question) {
                Ok(position) => distribution.record(position),
                Err(e) => {
                    tracing::warn!("⚠️ 题目 {} 无法乱序: {}", idx + 1, e);
                    distribution.unresolved += 1;
                }
            }
        }
        distribution
    }
}

fn json_index(question: &Value) -> Option<i64> {
    match question.get("correct_index")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::tests::sample_record;
    use serde_json::json;
    use std::collections::HashMap;

    fn abcd(index: i64, answer: &str) -> QuestionRecord {
        QuestionRecord {
            choices: vec!["A", "B", "C", "D"].into_iter().map(String::from).collect(),
            correct_index: index,
            correct_answer_text: answer.to_string(),
            ..sample_record()
        }
    }

    #[test]
    fn test_shuffle_preserves_correct_text() {
        let mut shuffler = ChoiceShuffler::new(Some(7));
        let record = sample_record();
        let original = record.correct_choice().unwrap().to_string();
        for _ in 0..200 {
            let shuffled = shuffler.shuffle_record(&record).unwrap();
            assert_eq!(shuffled.correct_choice(), Some(original.as_str()));
            assert!(shuffled.validate().is_ok());
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut shuffler = ChoiceShuffler::new(Some(3));
        let record = abcd(2, "C");
        let mut shuffled = shuffler.shuffle_record(&record).unwrap().choices;
        shuffled.sort();
        assert_eq!(shuffled, record.choices);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let record = abcd(2, "C");
        let first = ChoiceShuffler::new(Some(42)).shuffle_record(&record).unwrap();
        let second = ChoiceShuffler::new(Some(42)).shuffle_record(&record).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.choices, vec!["C", "B", "A", "D"]);
        assert_eq!(first.correct_index, 0);
        assert_eq!(first.correct_answer_text, "C");
    }

    #[test]
    fn test_unknown_answer_is_not_guessed() {
        // correct_answer 不在选项中时不回退到索引
        let record = abcd(2, "Z");
        let err = ChoiceShuffler::new(Some(1)).shuffle_record(&record).unwrap_err();
        assert_eq!(err, ValidationError::AnswerNotInChoices("Z".to_string()));

        let mut records = vec![record.clone()];
        let distribution = ChoiceShuffler::new(Some(1)).shuffle_records(&mut records);
        assert_eq!(distribution.unresolved, 1);
        assert_eq!(records[0], record);

        let mut document = json!([
            {"choices": ["A", "B", "C", "D"], "correct_index": 2, "correct_answer": "Z"}
        ]);
        let distribution = ChoiceShuffler::new(Some(1)).shuffle_document(&mut document);
        assert_eq!(distribution.unresolved, 1);
        assert_eq!(document[0]["choices"], json!(["A", "B", "C", "D"]));
        assert_eq!(document[0]["correct_answer"], "Z");
    }

    #[test]
    fn test_choice_array_must_have_four_entries() {
        let mut shuffler = ChoiceShuffler::new(Some(4));
        let mut five = json!({"choices": ["A", "B", "C", "D", "E"], "correct_index": 4});
        assert_eq!(
            shuffler.shuffle_question_value(&mut five),
            Err(ValidationError::ChoiceCount(5))
        );
        let mut three = json!({"choices": ["A", "B", "C"], "correct_index": 0});
        assert_eq!(
            shuffler.shuffle_question_value(&mut three),
            Err(ValidationError::ChoiceCount(3))
        );
    }

    #[test]
    fn test_out_of_range_position_counts_as_unresolved() {
        let mut distribution = IndexDistribution::default();
        distribution.record(3);
        distribution.record(4);
        assert_eq!(distribution.total(), 1);
        assert_eq!(distribution.unresolved, 1);
    }

    #[test]
    fn test_permutations_are_uniform() {
        let mut shuffler = ChoiceShuffler::new(Some(2024));
        let record = abcd(0, "A");
        let runs = 24_000;
        let mut seen: HashMap<Vec<String>, usize> = HashMap::new();
        for _ in 0..runs {
            let shuffled = shuffler.shuffle_record(&record).unwrap();
            *seen.entry(shuffled.choices).or_default() += 1;
        }
        // 4! 种排列都出现，且各自在期望值 ±20% 以内
        assert_eq!(seen.len(), 24);
        let expected = runs / 24;
        for count in seen.values() {
            assert!(
                (expected * 8 / 10..=expected * 12 / 10).contains(count),
                "count {} outside tolerance",
                count
            );
        }
    }

    #[test]
    fn test_legacy_and_zero_based_agree() {
        // 没有 correct_answer 时：1-based 的 3 与 0-based 的 2 都指向 "C"
        let choices: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(legacy_correct_text(&choices, 3).unwrap(), "C");
        assert_eq!(resolve_correct_text(&choices, 2, Some("C")).unwrap(), "C");

        let mut shuffler = ChoiceShuffler::new(Some(11));
        let legacy = shuffler.shuffle_record(&abcd(3, "")).unwrap();
        let modern = shuffler.shuffle_record(&abcd(2, "C")).unwrap();
        assert_eq!(legacy.correct_choice(), Some("C"));
        assert_eq!(modern.correct_choice(), Some("C"));
        assert_eq!(legacy.correct_answer_text, "C");
    }

    #[test]
    fn test_index_zero_is_zero_based() {
        let choices: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(legacy_correct_text(&choices, 0).unwrap(), "A");
        assert!(legacy_correct_text(&choices, 5).is_err());
        assert!(legacy_correct_text(&choices, -1).is_err());
    }

    #[test]
    fn test_shuffle_records_distribution() {
        let mut shuffler = ChoiceShuffler::new(Some(1));
        let mut records = vec![abcd(0, "A"), abcd(1, "B"), abcd(9, "")];
        let distribution = shuffler.shuffle_records(&mut records);
        assert_eq!(distribution.total(), 2);
        assert_eq!(distribution.unresolved, 1);
        // 无法处理的记录保持原样
        assert_eq!(records[2].correct_index, 9);
        assert!(distribution.to_string().contains("位置0"));
    }

    #[test]
    fn test_shuffle_book_document() {
        let mut document = json!({
            "subject": "jp",
            "title": "T",
            "questions": [
                {"question": "q1", "choice_1": "A", "choice_2": "B", "choice_3": "C", "choice_4": "D", "correct_index": 3},
                {"question": "q2", "choice_1": "W", "choice_2": "X", "choice_3": "Y", "choice_4": "Z"},
                {"question": "q3", "choice_1": "W"}
            ]
        });
        let distribution = ChoiceShuffler::new(Some(5)).shuffle_document(&mut document);
        assert_eq!(distribution.total(), 2);
        assert_eq!(distribution.unresolved, 1);

        let q1 = &document["questions"][0];
        let idx = q1["correct_index"].as_u64().unwrap();
        assert_eq!(q1[format!("choice_{}", idx + 1)], "C");

        // 缺少索引时默认为 1（旧格式 1-based）
        let q2 = &document["questions"][1];
        let idx = q2["correct_index"].as_u64().unwrap();
        assert_eq!(q2[format!("choice_{}", idx + 1)], "W");
    }

    #[test]
    fn test_shuffle_record_array_document() {
        let mut document = json!([
            {"question_text": "q", "choices": ["A", "B", "C", "D"], "correct_index": 2, "correct_answer": "C"}
        ]);
        let distribution = ChoiceShuffler::new(Some(9)).shuffle_document(&mut document);
        assert_eq!(distribution.total(), 1);
        let q = &document[0];
        let idx = q["correct_index"].as_u64().unwrap() as usize;
        assert_eq!(q["choices"][idx], "C");
        assert_eq!(q["correct_answer"], "C");
    }
}
