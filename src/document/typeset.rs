//! Block list → A4 pages of PDF content operations.
//!
//! Text is set in the 14 standard PDF fonts with WinAnsi encoding, so no
//! font files are embedded. Anything WinAnsi cannot represent (emoji,
//! arrows, CJK) is dropped at encoding time; the Markdown file keeps it.
//!
//! Line breaking uses the standard Helvetica AFM advance widths. Courier is
//! fixed at 600 units. All coordinates are PDF points with the origin at the
//! bottom-left corner.

use crate::document::markdown::{Block, Font, Span};
use lopdf::content::Operation;
use lopdf::Object;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 56.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 64.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;

const BODY_SIZE: f32 = 10.5;
const CODE_SIZE: f32 = 8.5;
const FOOTER_SIZE: f32 = 8.0;
const MIN_TABLE_SIZE: f32 = 6.0;
const LEADING: f32 = 1.35;
const LIST_INDENT: f32 = 16.0;

impl Font {
    /// Resource name the page dictionaries map this font to.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::Mono => "F4",
            Font::MonoBold => "F5",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::Mono => "Courier",
            Font::MonoBold => "Courier-Bold",
        }
    }

    pub const ALL: [Font; 5] = [
        Font::Regular,
        Font::Bold,
        Font::Italic,
        Font::Mono,
        Font::MonoBold,
    ];

    /// Advance width of one encoded byte, in 1/1000 em.
    fn advance(self, byte: u8) -> u16 {
        let table = match self {
            Font::Mono | Font::MonoBold => return 600,
            Font::Bold => &HELVETICA_BOLD,
            Font::Regular | Font::Italic => &HELVETICA,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            _ => 556,
        }
    }

    fn width(self, bytes: &[u8], size: f32) -> f32 {
        bytes.iter().map(|&b| self.advance(b) as f32).sum::<f32>() * size / 1000.0
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode text as WinAnsi bytes. Whitespace becomes a single space byte
/// per character; characters outside the encoding are dropped.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let byte = match c {
            '\t' | '\n' | '\r' | '\u{2002}'..='\u{200A}' | '\u{202F}' => Some(b' '),
            ' '..='~' => Some(c as u8),
            '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            '\u{2010}' | '\u{2011}' | '\u{2212}' => Some(b'-'),
            _ => None,
        };
        out.extend(byte);
    }
    out
}

/// One word: consecutive pieces with no space between them.
#[derive(Debug, Default, Clone)]
struct Word {
    pieces: Vec<(Font, Vec<u8>)>,
}

impl Word {
    fn width(&self, size: f32) -> f32 {
        self.pieces.iter().map(|(f, b)| f.width(b, size)).sum()
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn push(&mut self, font: Font, bytes: &[u8]) {
        match self.pieces.last_mut() {
            Some((f, b)) if *f == font => b.extend_from_slice(bytes),
            _ => self.pieces.push((font, bytes.to_vec())),
        }
    }
}

fn split_words(spans: &[Span]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Word::default();
    for span in spans {
        let bytes = encode_win_ansi(&span.text);
        for (i, part) in bytes.split(|&b| b == b' ').enumerate() {
            if i > 0 && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            if !part.is_empty() {
                current.push(span.font, part);
            }
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// A laid-out line: runs drawn left to right from one start point.
type Line = Vec<(Font, Vec<u8>)>;

/// Greedy line filling. Words wider than `max_width` are cut.
fn wrap_words(words: Vec<Word>, size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Word::default();
    let mut width = 0.0;

    for word in words.into_iter().flat_map(|w| cut_word(w, size, max_width)) {
        let w = word.width(size);
        let font = line.pieces.last().map(|(f, _)| *f).unwrap_or(Font::Regular);
        let space = font.width(b" ", size);
        if !line.is_empty() && width + space + w > max_width {
            lines.push(std::mem::take(&mut line).pieces);
            width = 0.0;
        }
        if !line.is_empty() {
            line.push(font, b" ");
            width += space;
        }
        for (font, bytes) in &word.pieces {
            line.push(*font, bytes);
        }
        width += w;
    }
    if !line.is_empty() {
        lines.push(line.pieces);
    }
    lines
}

fn cut_word(word: Word, size: f32, max_width: f32) -> Vec<Word> {
    if word.width(size) <= max_width {
        return vec![word];
    }
    let mut parts = Vec::new();
    let mut current = Word::default();
    let mut width = 0.0;
    for (font, bytes) in word.pieces {
        for b in bytes {
            let w = font.width(&[b], size);
            if !current.is_empty() && width + w > max_width {
                parts.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(font, &[b]);
            width += w;
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Character-count wrap for monospace table cells.
fn wrap_chars(text: &[u8], cols: usize) -> Vec<Vec<u8>> {
    let cols = cols.max(1);
    let mut lines: Vec<Vec<u8>> = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    for word in text.split(|&b| b == b' ').filter(|w| !w.is_empty()) {
        for chunk in word.chunks(cols) {
            let needed = if line.is_empty() { chunk.len() } else { line.len() + 1 + chunk.len() };
            if needed > cols && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(b' ');
            }
            line.extend_from_slice(chunk);
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Lays blocks out top to bottom, breaking pages as needed.
struct Typesetter {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Typesetter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN_TOP;
    }

    fn at_page_top(&self) -> bool {
        self.y >= PAGE_HEIGHT - MARGIN_TOP
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN_BOTTOM || self.at_page_top()
    }

    /// Make room for `height`; breaks the page if it does not fit.
    fn reserve(&mut self, height: f32) {
        if !self.fits(height) {
            self.new_page();
        }
    }

    fn space(&mut self, amount: f32) {
        if !self.at_page_top() {
            self.y -= amount;
        }
    }

    fn draw_runs(&mut self, x: f32, baseline: f32, runs: &[(Font, Vec<u8>)], size: f32) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        for (font, bytes) in runs {
            self.ops.push(Operation::new(
                "Tf",
                vec![font.resource_name().into(), size.into()],
            ));
            self.ops.push(Operation::new("Tj", vec![Object::string_literal(bytes.clone())]));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn hline(&mut self, x0: f32, x1: f32, y: f32, width: f32) {
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("m", vec![x0.into(), y.into()]));
        self.ops.push(Operation::new("l", vec![x1.into(), y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Wrapped text starting at `x`, hanging to the same indent.
    fn text(&mut self, spans: &[Span], x: f32, size: f32) {
        let line_height = size * LEADING;
        for line in wrap_words(split_words(spans), size, PAGE_WIDTH - MARGIN_X - x) {
            self.reserve(line_height);
            self.y -= line_height;
            self.draw_runs(x, self.y + (line_height - size), &line, size);
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, spans } => {
                let size = match level {
                    1 => 18.0,
                    2 => 14.5,
                    3 => 12.5,
                    _ => 11.0,
                };
                self.space(size * 0.8);
                // keep a heading with at least two lines of what follows
                self.reserve(size * LEADING + 2.0 * BODY_SIZE * LEADING);
                let bold: Vec<Span> = spans
                    .iter()
                    .map(|s| Span::new(bold_of(s.font), s.text.clone()))
                    .collect();
                self.text(&bold, MARGIN_X, size);
                if *level == 1 {
                    self.y -= 3.0;
                    self.hline(MARGIN_X, PAGE_WIDTH - MARGIN_X, self.y, 0.8);
                }
                self.y -= size * 0.3;
            }
            Block::Paragraph(spans) => {
                self.text(spans, MARGIN_X, BODY_SIZE);
                self.space(BODY_SIZE * 0.6);
            }
            Block::ListItem { depth, marker, spans } => {
                let indent = MARGIN_X + LIST_INDENT * (*depth as f32 + 1.0);
                let line_height = BODY_SIZE * LEADING;
                self.reserve(line_height);
                if !marker.is_empty() {
                    let bytes = encode_win_ansi(marker);
                    let w = Font::Regular.width(&bytes, BODY_SIZE);
                    let baseline = self.y - line_height + (line_height - BODY_SIZE);
                    self.draw_runs(indent - w - 5.0, baseline, &[(Font::Regular, bytes)], BODY_SIZE);
                }
                if spans.is_empty() {
                    self.y -= line_height;
                } else {
                    self.text(spans, indent, BODY_SIZE);
                }
                self.y -= BODY_SIZE * 0.2;
            }
            Block::Quote(spans) => {
                let italic: Vec<Span> = spans
                    .iter()
                    .map(|s| match s.font {
                        Font::Regular => Span::new(Font::Italic, s.text.clone()),
                        _ => s.clone(),
                    })
                    .collect();
                let x = MARGIN_X + 14.0;
                let line_height = BODY_SIZE * LEADING;
                // one bar segment per page the quote touches
                let mut top = self.y;
                for line in wrap_words(split_words(&italic), BODY_SIZE, PAGE_WIDTH - MARGIN_X - x) {
                    if !self.fits(line_height) {
                        quote_bar(&mut self.ops, top, self.y);
                        self.new_page();
                        top = self.y;
                    }
                    self.y -= line_height;
                    self.draw_runs(x, self.y + (line_height - BODY_SIZE), &line, BODY_SIZE);
                }
                quote_bar(&mut self.ops, top, self.y);
                self.space(BODY_SIZE * 0.6);
            }
            Block::Code(lines) => {
                let line_height = CODE_SIZE * LEADING;
                let x = MARGIN_X + 8.0;
                let cols = ((PAGE_WIDTH - MARGIN_X - x) / (0.6 * CODE_SIZE)) as usize;
                for line in lines {
                    let bytes = encode_win_ansi(line);
                    for chunk in wrap_code_line(&bytes, cols) {
                        self.reserve(line_height);
                        self.y -= line_height;
                        let baseline = self.y + (line_height - CODE_SIZE);
                        self.draw_runs(x, baseline, &[(Font::Mono, chunk)], CODE_SIZE);
                    }
                }
                self.space(BODY_SIZE * 0.6);
            }
            Block::Table(rows) => self.table(rows),
            Block::Rule => {
                self.space(6.0);
                self.reserve(6.0);
                self.hline(MARGIN_X, PAGE_WIDTH - MARGIN_X, self.y, 0.5);
                self.y -= 10.0;
            }
        }
    }

    /// Monospace grid: columns sized to their content, shrunk (then
    /// wrapped) to fit the text width. Header row in bold.
    fn table(&mut self, rows: &[Vec<String>]) {
        let cells: Vec<Vec<Vec<u8>>> = rows
            .iter()
            .map(|r| r.iter().map(|c| encode_win_ansi(c)).collect())
            .collect();
        let ncols = cells.iter().map(Vec::len).max().unwrap_or(0);
        if ncols == 0 {
            return;
        }

        let mut widths = vec![1usize; ncols];
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        const GAP: usize = 2;
        let total = |w: &[usize]| w.iter().sum::<usize>() + GAP * (w.len() - 1);
        let size = (TEXT_WIDTH / (0.6 * total(&widths) as f32)).clamp(MIN_TABLE_SIZE, BODY_SIZE - 1.0);
        let budget = (TEXT_WIDTH / (0.6 * size)) as usize;
        while total(&widths) > budget {
            // narrow the widest column until the grid fits
            let (i, &w) = widths.iter().enumerate().max_by_key(|(_, w)| **w).unwrap_or((0, &1));
            if w <= 4 {
                break;
            }
            widths[i] = w - 1;
        }

        let line_height = size * LEADING;
        self.space(2.0);
        for (r, row) in cells.iter().enumerate() {
            let wrapped: Vec<Vec<Vec<u8>>> = (0..ncols)
                .map(|i| wrap_chars(row.get(i).map(Vec::as_slice).unwrap_or(&[]), widths[i]))
                .collect();
            let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);
            let font = if r == 0 { Font::MonoBold } else { Font::Mono };

            for line in 0..height {
                self.reserve(line_height);
                self.y -= line_height;
                let mut text = Vec::new();
                for (i, col) in wrapped.iter().enumerate() {
                    let part = col.get(line).map(Vec::as_slice).unwrap_or(&[]);
                    text.extend_from_slice(part);
                    if i + 1 < ncols {
                        text.resize(text.len() + widths[i] - part.len() + GAP, b' ');
                    }
                }
                let baseline = self.y + (line_height - size);
                self.draw_runs(MARGIN_X, baseline, &[(font, text)], size);
            }
            if r == 0 {
                self.y -= 2.0;
                self.hline(MARGIN_X, MARGIN_X + 0.6 * size * total(&widths) as f32, self.y, 0.5);
            }
        }
        self.space(BODY_SIZE * 0.8);
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.ops));
        }
        let count = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = encode_win_ansi(&format!("Page {} of {}", i + 1, count));
            let x = (PAGE_WIDTH - Font::Regular.width(&label, FOOTER_SIZE)) / 2.0;
            page.push(Operation::new("BT", vec![]));
            page.push(Operation::new("Td", vec![x.into(), (MARGIN_BOTTOM / 2.0).into()]));
            page.push(Operation::new(
                "Tf",
                vec![Font::Regular.resource_name().into(), FOOTER_SIZE.into()],
            ));
            page.push(Operation::new("Tj", vec![Object::string_literal(label)]));
            page.push(Operation::new("ET", vec![]));
        }
        self.pages
    }
}

const QUOTE_BAR_X: f32 = MARGIN_X + 4.0;

fn quote_bar(ops: &mut Vec<Operation>, top: f32, bottom: f32) {
    if bottom >= top {
        return;
    }
    ops.push(Operation::new("w", vec![2.0f32.into()]));
    ops.push(Operation::new("m", vec![QUOTE_BAR_X.into(), top.into()]));
    ops.push(Operation::new("l", vec![QUOTE_BAR_X.into(), bottom.into()]));
    ops.push(Operation::new("S", vec![]));
}

fn bold_of(font: Font) -> Font {
    match font {
        Font::Mono | Font::MonoBold => Font::MonoBold,
        _ => Font::Bold,
    }
}

fn wrap_code_line(bytes: &[u8], cols: usize) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return vec![Vec::new()];
    }
    bytes.chunks(cols.max(1)).map(<[u8]>::to_vec).collect()
}

/// Lay the blocks out. Always returns at least one page.
pub fn typeset(blocks: &[Block]) -> Vec<Vec<Operation>> {
    let mut t = Typesetter::new();
    for block in blocks {
        t.block(block);
    }
    t.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown_text(pages: &[Vec<Operation>]) -> String {
        let mut out = String::new();
        for op in pages.iter().flatten() {
            if op.operator == "Tj" {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    out.push_str(&String::from_utf8_lossy(bytes));
                    out.push('\n');
                }
            }
        }
        out
    }

    #[test]
    fn win_ansi_maps_typography_and_drops_emoji() {
        assert_eq!(encode_win_ansi("📈 Growth – 12%"), b" Growth \x96 12%".to_vec());
        assert_eq!(encode_win_ansi("€5 “net” café"), b"\x805 \x93net\x94 caf\xe9".to_vec());
        assert_eq!(encode_win_ansi("a\tb\nc"), b"a b c".to_vec());
    }

    #[test]
    fn helvetica_widths_are_sane() {
        assert_eq!(Font::Regular.width(b"i", 1000.0), 222.0);
        assert_eq!(Font::Bold.width(b"W", 1000.0), 944.0);
        assert_eq!(Font::Mono.width(b"iW", 10.0), 12.0);
    }

    #[test]
    fn words_join_across_fonts_without_spaces() {
        let spans = [Span::new(Font::Bold, "Revenue"), Span::new(Font::Regular, ": up 12%")];
        let words = split_words(&spans);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].pieces.len(), 2);
    }

    #[test]
    fn long_paragraph_wraps_within_width() {
        let text = "Operating margin improved to eighteen percent. ".repeat(20);
        let lines = wrap_words(split_words(&[Span::new(Font::Regular, text)]), BODY_SIZE, TEXT_WIDTH);
        assert!(lines.len() > 3);
        for line in &lines {
            let w: f32 = line.iter().map(|(f, b)| f.width(b, BODY_SIZE)).sum();
            assert!(w <= TEXT_WIDTH + 0.01, "line too wide: {w}");
        }
    }

    #[test]
    fn overlong_word_is_cut() {
        let url = "x".repeat(400);
        let lines = wrap_words(split_words(&[Span::new(Font::Mono, url)]), BODY_SIZE, TEXT_WIDTH);
        assert!(lines.len() >= 4);
    }

    #[test]
    fn many_paragraphs_break_pages() {
        let blocks: Vec<Block> = (0..120)
            .map(|i| Block::Paragraph(vec![Span::new(Font::Regular, format!("Paragraph {i} about liquidity."))]))
            .collect();
        let pages = typeset(&blocks);
        assert!(pages.len() > 1);
        let text = shown_text(&pages);
        assert!(text.contains("Paragraph 0 about liquidity."));
        assert!(text.contains("Paragraph 119 about liquidity."));
        assert!(text.contains(&format!("Page 1 of {}", pages.len())));
    }

    #[test]
    fn empty_document_still_has_one_page() {
        assert_eq!(typeset(&[]).len(), 1);
    }

    #[test]
    fn table_rows_are_aligned() {
        let rows = vec![
            vec!["Metric".to_string(), "Q1".to_string()],
            vec!["Revenue".to_string(), "$25B".to_string()],
        ];
        let text = shown_text(&typeset(&[Block::Table(rows)]));
        assert!(text.contains("Metric   Q1\n"), "got: {text}");
        assert!(text.contains("Revenue  $25B\n"), "got: {text}");
    }

    #[test]
    fn wide_table_cells_wrap() {
        let long = "very long narrative cell ".repeat(12);
        let rows = vec![
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![long.clone(), long.clone(), long],
        ];
        let pages = typeset(&[Block::Table(rows)]);
        let rows_drawn = pages[0].iter().filter(|op| op.operator == "Tj").count();
        assert!(rows_drawn > 3, "expected wrapped rows, got {rows_drawn}");
    }

    /// (top, bottom) of every quote bar segment, per page.
    fn quote_bars(pages: &[Vec<Operation>]) -> Vec<Vec<(f32, f32)>> {
        pages
            .iter()
            .map(|ops| {
                ops.windows(2)
                    .filter(|w| {
                        w[0].operator == "m"
                            && w[1].operator == "l"
                            && w[0].operands[0].as_float().ok() == Some(QUOTE_BAR_X)
                    })
                    .map(|w| {
                        (
                            w[0].operands[1].as_float().unwrap(),
                            w[1].operands[1].as_float().unwrap(),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn quote_across_page_break_gets_a_bar_on_each_page() {
        let mut blocks: Vec<Block> = (0..30)
            .map(|i| Block::Paragraph(vec![Span::new(Font::Regular, format!("Paragraph {i} about funding."))]))
            .collect();
        let quote = "Management expects margins to hold through the next quarter. ".repeat(60);
        blocks.push(Block::Quote(vec![Span::new(Font::Regular, quote)]));

        let pages = typeset(&blocks);
        let bars = quote_bars(&pages);
        let pages_with_bars = bars.iter().filter(|b| !b.is_empty()).count();
        assert!(pages_with_bars >= 2, "bars per page: {bars:?}");
        for (top, bottom) in bars.iter().flatten() {
            assert!(top > bottom);
            assert!(*top <= PAGE_HEIGHT - MARGIN_TOP);
            assert!(*bottom >= MARGIN_BOTTOM);
        }
    }

    #[test]
    fn short_quote_gets_one_bar() {
        let pages = typeset(&[Block::Quote(vec![Span::new(Font::Regular, "Outlook unchanged.")])]);
        let bars = quote_bars(&pages);
        assert_eq!(bars.iter().flatten().count(), 1);
    }

    #[test]
    fn chars_wrap_respects_columns() {
        assert_eq!(
            wrap_chars(b"net interest income", 8),
            vec![b"net".to_vec(), b"interest".to_vec(), b"income".to_vec()]
        );
        assert_eq!(wrap_chars(b"", 5), vec![Vec::<u8>::new()]);
    }
}
