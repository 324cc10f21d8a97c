//! Elastic tabstop writer.
//!
//! Text is buffered until [`TabWriter::flush`]. Each line is split into
//! cells at `\t`; only tab-terminated cells are padded. A column block is a
//! run of consecutive lines that all have a cell in that column, and every
//! cell in the block is padded to the widest cell plus the padding. Lines
//! without a cell in the column end the block. Widths ignore ANSI styling.

use std::fmt;

use console::measure_text_width;

pub const DEFAULT_PADDING: usize = 3;

#[derive(Debug)]
pub struct TabWriter {
    padding: usize,
    buf: String,
}

impl Default for TabWriter {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING)
    }
}

impl TabWriter {
    pub fn new(padding: usize) -> Self {
        Self {
            padding,
            buf: String::new(),
        }
    }

    /// Aligns everything written so far. The writer cannot be used again.
    pub fn flush(self) -> String {
        let lines: Vec<Vec<&str>> = self
            .buf
            .split('\n')
            .map(|line| line.split('\t').collect())
            .collect();

        let mut layout = Layout {
            lines: &lines,
            padding: self.padding,
            widths: Vec::new(),
            out: String::with_capacity(self.buf.len()),
        };
        layout.format(0, lines.len());
        layout.out
    }
}

impl fmt::Write for TabWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

struct Layout<'a> {
    lines: &'a [Vec<&'a str>],
    padding: usize,
    widths: Vec<usize>,
    out: String,
}

impl Layout<'_> {
    fn has_column(&self, line: usize, column: usize) -> bool {
        column + 1 < self.lines[line].len()
    }

    fn format(&mut self, mut line0: usize, line1: usize) {
        let column = self.widths.len();
        let mut this = line0;

        while this < line1 {
            if !self.has_column(this, column) {
                this += 1;
                continue;
            }

            // Lines before the block are already fully laid out.
            self.write_lines(line0, this);
            line0 = this;

            let mut width = 0;
            while this < line1 && self.has_column(this, column) {
                let cell = self.lines[this][column];
                width = width.max(measure_text_width(cell) + self.padding);
                this += 1;
            }

            self.widths.push(width);
            self.format(line0, this);
            self.widths.pop();
            line0 = this;
        }

        self.write_lines(line0, line1);
    }

    fn write_lines(&mut self, line0: usize, line1: usize) {
        for i in line0..line1 {
            for (j, cell) in self.lines[i].iter().enumerate() {
                self.out.push_str(cell);
                if let Some(width) = self.widths.get(j) {
                    let pad = width.saturating_sub(measure_text_width(cell));
                    self.out.extend(std::iter::repeat_n(' ', pad));
                }
            }
            // The final segment follows the last newline, if any.
            if i + 1 < self.lines.len() {
                self.out.push('\n');
            }
        }
    }
}
