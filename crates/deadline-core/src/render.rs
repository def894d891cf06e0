use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::view::{Board, Row};

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// `terminal` says whether the output is an interactive terminal; color is
    /// only emitted when it is and the config allows it.
    pub fn new(cfg: &Config, terminal: bool) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);
        Self {
            color: color && terminal,
        }
    }

    #[tracing::instrument(skip(self, out, board))]
    pub fn print_board<W: Write>(
        &self,
        out: &mut W,
        category: &str,
        board: &Board,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "[{category}] todo {}  done {}  overdue {}",
            board.counts.todo, board.counts.done, board.counts.overdue
        )?;

        if board.pending.is_empty() && board.done.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        if !board.pending.is_empty() {
            writeln!(out)?;
            writeln!(out, "Pending")?;
            self.print_rows(out, &board.pending)?;
        }
        if !board.done.is_empty() {
            writeln!(out)?;
            writeln!(out, "Done")?;
            self.print_rows(out, &board.done)?;
        }
        Ok(())
    }

    fn print_rows<W: Write>(&self, out: &mut W, rows: &[Row]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
        ];

        let body = rows
            .iter()
            .map(|row| {
                let id = self.paint(short_id(&row.task.id), "33");
                let due = if row.overdue {
                    self.paint(&format!("{} overdue", row.task.due_date), "31")
                } else {
                    row.task.due_date.clone()
                };
                vec![id, due, row.task.priority.to_string(), row.task.title.clone()]
            })
            .collect();

        write_table(out, headers, body)
    }

    pub fn print_suggestions<W: Write>(
        &self,
        out: &mut W,
        suggestions: &[String],
    ) -> anyhow::Result<()> {
        for title in suggestions {
            writeln!(out, "{title}")?;
        }
        Ok(())
    }

    pub fn print_tabs<W: Write>(
        &self,
        out: &mut W,
        tabs: &[String],
        active: &str,
    ) -> anyhow::Result<()> {
        for tab in tabs {
            let marker = if tab == active { "*" } else { " " };
            writeln!(out, "{marker} {tab}")?;
        }
        if !tabs.iter().any(|tab| tab == active) {
            writeln!(out, "* {active} (not configured)")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_by_display_width() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["A".into(), "B".into()],
            vec![vec!["\x1b[31m締切\x1b[0m".into(), "x".into()]],
        )
        .expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[1], "---- - ");
        assert!(lines[2].ends_with("締切\x1b[0m x "));
    }

    #[test]
    fn short_id_truncates_on_char_boundary() {
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn color_requires_terminal() {
        let renderer = Renderer::new(&Config::default(), false);
        assert_eq!(renderer.paint("x", "31"), "x");
        let renderer = Renderer::new(&Config::default(), true);
        assert_eq!(renderer.paint("x", "31"), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn color_setting_uses_config_boolean_words() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "y".to_string())]);
        assert!(Renderer::new(&cfg, true).color);

        cfg.apply_overrides(vec![("color".to_string(), "off".to_string())]);
        assert!(!Renderer::new(&cfg, true).color);
    }
}
