//! 制表符分隔表格
//!
//! 第一行为表头，按位置定义字段名。后续每个非空行按制表符切分，
//! 字段数不足表头时在末尾补空字符串（短行不丢弃）。

use std::collections::HashMap;

/// 字段分隔符
pub const FIELD_SEPARATOR: char = '\t';

/// 表格中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 行号（表头为第1行）
    pub line: usize,
    fields: HashMap<String, String>,
}

impl TableRow {
    /// 字段值，表头中不存在的字段返回 None
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// 字段值，不存在或为空时返回 None
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// 按表头位置组装一行，字段不足时补空字符串，多出的字段丢弃
    pub fn from_values<'v>(line: usize, header: &[String], values: impl IntoIterator<Item = &'v str>) -> TableRow {
        let mut values = values.into_iter();
        let fields = header
            .iter()
            .map(|name| (name.clone(), values.next().unwrap_or_default().to_string()))
            .collect();
        TableRow { line, fields }
    }
}

/// 解析后的表格
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// 解析表格文本
    pub fn parse(text: &str) -> Self {
        let mut lines = text.trim().lines().enumerate();

        let header: Vec<String> = match lines.next() {
            Some((_, line)) if !line.trim().is_empty() => line
                .split(FIELD_SEPARATOR)
                .map(|name| name.trim().to_string())
                .collect(),
            _ => return Self::default(),
        };

        let rows = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| TableRow::from_values(idx + 1, &header, line.split(FIELD_SEPARATOR)))
            .collect();

        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
