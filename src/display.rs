use crate::error::SsmBatchError;

pub fn print_success(message: &str) {
    tracing::info!("✓ {}", message);
}

pub fn print_info(message: &str) {
    tracing::info!("{}", message);
}

pub fn print_warning(message: &str) {
    tracing::warn!("{}", message);
}

pub fn print_error(message: &str) {
    tracing::error!("{}", message);
}

/// Split `text` into lines of at most `max_width` characters, breaking at
/// spaces and splitting words longer than a line
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.len() <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + word.len() < max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }

        if current_line.len() > max_width {
            let word = current_line;
            current_line = String::new();

            for chunk in word.chars().collect::<Vec<_>>().chunks(max_width) {
                let chunk_str: String = chunk.iter().collect();
                lines.push(chunk_str);
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(text.to_string());
    }

    lines
}

/// One line of the end-of-run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub account_id: String,
    pub region: String,
    pub target: String,
    pub error: Option<String>,
}

/// Render the summary as a bordered table, with error details wrapped below it
pub fn render_summary(lines: &[SummaryLine]) -> String {
    if lines.is_empty() {
        return "No rows processed".to_string();
    }

    let headers = ["Account", "Region", "Target", "Result"];
    let results: Vec<&str> = lines
        .iter()
        .map(|l| if l.error.is_some() { "ERROR" } else { "OK" })
        .collect();

    let mut widths = headers.map(str::len);
    for (line, result) in lines.iter().zip(&results) {
        let cells = [
            line.account_id.as_str(),
            line.region.as_str(),
            line.target.as_str(),
            *result,
        ];
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let format_row = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!(" {:<width$} ", cell, width = w))
            .collect::<Vec<_>>()
            .join("|")
    };

    let mut out = Vec::new();
    out.push(separator.clone());
    out.push(format_row(headers));
    out.push(separator.clone());
    for (line, result) in lines.iter().zip(&results) {
        out.push(format_row([
            line.account_id.as_str(),
            line.region.as_str(),
            line.target.as_str(),
            *result,
        ]));
    }
    out.push(separator);

    let failures: Vec<&SummaryLine> = lines.iter().filter(|l| l.error.is_some()).collect();
    if !failures.is_empty() {
        out.push(String::new());
        out.push(format!("Errors ({}):", failures.len()));
        for (i, line) in failures.iter().enumerate() {
            let is_last = i == failures.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let line_prefix = if is_last { "    " } else { "│   " };
            out.push(format!("{} {} {}", prefix, line.account_id, line.target));
            let detail = line.error.as_deref().unwrap_or("");
            for text_line in detail.lines().flat_map(|l| wrap_text(l, 100)) {
                out.push(format!("{}{}", line_prefix, text_line));
            }
        }
    }

    out.join("\n")
}

pub fn print_summary(lines: &[SummaryLine]) {
    println!("{}", render_summary(lines));
}

pub fn format_json_output<T: serde::Serialize>(data: &T) -> Result<String, SsmBatchError> {
    serde_json::to_string_pretty(data)
        .map_err(|e| SsmBatchError::ParseError(format!("JSON serialization error: {}", e)))
}
