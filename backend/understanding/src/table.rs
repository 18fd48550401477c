//! Table formatting: asks a text model to lay free text out as a
//! pipe-delimited table, then parses that answer into rows.

use std::sync::Arc;

use snapsheet_core::{GenerateRequest, GenerativeModel, PipelineError, Table};
use tracing::{debug, info, warn};

/// Prompt template; `{text}` is replaced with the extracted text.
pub const TABLE_PROMPT_TEMPLATE: &str = "以下のテキストを表形式に整形してください。
各行は「|」で区切られ、最初の行はヘッダーとしてください。
可能な限り情報を整理し、見やすい表にしてください。

テキスト:
{text}
";

pub fn render_table_prompt(template: &str, text: &str) -> String {
    template.replace("{text}", text)
}

/// Parse pipe-delimited model output into rows.
///
/// Only lines containing `|` are considered. Cells are trimmed and blank
/// cells dropped; rows left empty are dropped, as is a markdown delimiter
/// row directly under the header. No column-count check is made.
pub fn parse_table(text: &str) -> Table {
    let mut rows: Vec<Vec<String>> = text
        .trim()
        .lines()
        .filter(|line| line.contains('|'))
        .map(|line| {
            line.split('|')
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    if rows.get(1).is_some_and(|row| is_alignment_row(row)) {
        rows.remove(1);
    }
    Table::new(rows)
}

fn is_alignment_row(row: &[String]) -> bool {
    row.iter()
        .all(|cell| cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}

pub struct TableFormatter {
    model: Arc<dyn GenerativeModel>,
    template: String,
}

impl TableFormatter {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model, template: TABLE_PROMPT_TEMPLATE.to_string() }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Format free text as a table. An answer with no parsable rows is a failure.
    pub async fn format(&self, text: &str) -> Result<Table, PipelineError> {
        info!(provider = self.model.name(), chars = text.chars().count(), "Formatting text as table");

        let request = GenerateRequest::text(render_table_prompt(&self.template, text));
        let response = self.model.generate(&request).await.map_err(|e| {
            warn!(error = %e, "Table formatting failed");
            PipelineError::Formatting(format!("{e:#}"))
        })?;

        let table = parse_table(&response.text);
        if table.is_empty() {
            warn!("Table formatting produced no rows");
            return Err(PipelineError::EmptyTable);
        }
        debug!(rows = table.len(), "Parsed table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockModel;

    fn rows(t: &Table) -> Vec<Vec<&str>> {
        t.rows().iter().map(|r| r.iter().map(String::as_str).collect()).collect()
    }

    #[test]
    fn parses_markdown_table() {
        let text = "
| 品名 | 数量 | 金額 |
|------|:----:|-----:|
| りんご | 2 | 240 |
| みかん | 5 | 400 |
";
        assert_eq!(
            rows(&parse_table(text)),
            vec![vec!["品名", "数量", "金額"], vec!["りんご", "2", "240"], vec!["みかん", "5", "400"]]
        );
    }

    #[test]
    fn parses_bare_pipes_and_drops_blank_rows() {
        let text = "Here is the table:\n日付 | 店名\n|  |  |\n\n2024/05/01 | 八百屋\n";
        assert_eq!(rows(&parse_table(text)), vec![vec!["日付", "店名"], vec!["2024/05/01", "八百屋"]]);
    }

    #[test]
    fn keeps_ragged_rows_as_is() {
        let text = "a | b | c\n1 || 3\nonly |";
        assert_eq!(rows(&parse_table(text)), vec![vec!["a", "b", "c"], vec!["1", "3"], vec!["only"]]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        assert_eq!(rows(&parse_table("a | b\r\n1 | 2\r\n")), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn text_without_pipes_is_empty() {
        assert!(parse_table("no table here\njust prose").is_empty());
        assert!(parse_table("").is_empty());
    }

    #[test]
    fn dash_rows_in_the_body_are_data() {
        let text = "| 項目 | 前回 | 今回 |\n|---|---|---|\n| 売上 | 100 | 120 |\n| - | - | - |\n| -- | --- | :-: |";
        assert_eq!(
            rows(&parse_table(text)),
            vec![
                vec!["項目", "前回", "今回"],
                vec!["売上", "100", "120"],
                vec!["-", "-", "-"],
                vec!["--", "---", ":-:"],
            ]
        );
    }

    #[test]
    fn dash_only_content_cells_are_kept_when_mixed() {
        let text = "項目 | 値\n割引 | -\n";
        assert_eq!(rows(&parse_table(text)), vec![vec!["項目", "値"], vec!["割引", "-"]]);
    }

    #[tokio::test]
    async fn format_embeds_text_in_prompt() {
        let model = Arc::new(MockModel::new("text").with_response("a | b\n1 | 2"));
        let formatter = TableFormatter::new(model.clone());
        let table = formatter.format("合計 1,200円").await.unwrap();
        assert_eq!(table.len(), 2);
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("テキスト:\n合計 1,200円"));
    }

    #[tokio::test]
    async fn empty_answer_is_a_failure() {
        let formatter = TableFormatter::new(Arc::new(MockModel::new("text").with_response("")));
        assert!(matches!(formatter.format("x").await, Err(PipelineError::EmptyTable)));
    }

    #[tokio::test]
    async fn model_error_is_a_failure() {
        let formatter = TableFormatter::new(Arc::new(MockModel::new("text").with_failure()));
        assert!(matches!(formatter.format("x").await, Err(PipelineError::Formatting(_))));
    }
}
