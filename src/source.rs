// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::model::Location;
use crate::*;

use core::cmp;
use core::fmt::{self, Debug, Formatter};

use anyhow::{bail, Result};

#[derive(Clone)]
struct SourceInternal {
    pub file: Rc<str>,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// A named piece of template text. Cloning is cheap; clones compare equal.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::as_ptr(&self.src) == Rc::as_ptr(&other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed template size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                file: file.into(),
                contents,
                lines,
            }),
        })
    }

    pub fn file(&self) -> &Rc<str> {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    /// Builds a span covering the byte range `start..end`, computing its
    /// 1-based line and column.
    pub fn span(&self, start: u32, end: u32) -> Result<Span> {
        let len = self.src.contents.len() as u32;
        if start > end || end > len {
            bail!(
                "{}: span {start}..{end} is outside the template (length {len})",
                self.src.file
            );
        }
        let contents = &self.src.contents;
        if !contents.is_char_boundary(start as usize) || !contents.is_char_boundary(end as usize) {
            bail!(
                "{}: span {start}..{end} does not fall on character boundaries",
                self.src.file
            );
        }

        // Index of the last line starting at or before `start`.
        let line_idx = self
            .src
            .lines
            .partition_point(|(line_start, _)| *line_start <= start)
            .saturating_sub(1);
        let (line_start, _) = self.src.lines[line_idx];
        let col = self.src.contents[line_start as usize..start as usize]
            .chars()
            .count() as u32
            + 1;

        Ok(Span {
            source: self.clone(),
            line: line_idx as u32 + 1,
            col,
            start,
            end,
        })
    }

    /// Span of the first occurrence of `needle`, searching from byte `from`.
    pub fn find(&self, needle: &str, from: u32) -> Result<Span> {
        let Some(offset) = self
            .src
            .contents
            .get(from as usize..)
            .and_then(|rest| rest.find(needle))
        else {
            bail!("{}: `{needle}` not found", self.src.file);
        };
        let start = from + offset as u32;
        self.span(start, start + needle.len() as u32)
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.max(1) as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }
}

/// Region of a template an expression was read from.
#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Text covered by the span; empty if the range is not valid for its source.
    pub fn text(&self) -> &str {
        self.source
            .contents()
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }

    pub fn location(&self) -> Location {
        Location::new(self.source.file().clone(), self.line, self.col)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let max = 32;
        let t: String = self.text().escape_debug().take(max).collect();
        let trailer = if self.text().escape_debug().nth(max).is_some() {
            "..."
        } else {
            ""
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, t, trailer
        ))
    }
}
