//! Markdown → flat block list, via the comrak GFM parser.
//!
//! The typesetter only understands a handful of block kinds, so the AST is
//! flattened here: nested lists become items with a depth, inline markup
//! becomes font-tagged spans, tables become rows of plain cell text.

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use once_cell::sync::Lazy;
use regex::Regex;

/// Which of the standard fonts a run of text uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
    Mono,
    MonoBold,
}

/// A run of text in one font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub font: Font,
    pub text: String,
}

impl Span {
    pub fn new(font: Font, text: impl Into<String>) -> Self {
        Self {
            font,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    /// One list item's first paragraph. Continuation paragraphs of the same
    /// item come through with an empty `marker`.
    ListItem {
        depth: usize,
        marker: String,
        spans: Vec<Span>,
    },
    Quote(Vec<Span>),
    Code(Vec<String>),
    /// First row is the header.
    Table(Vec<Vec<String>>),
    Rule,
}

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Parse GFM Markdown into blocks.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;

    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &options);

    let mut blocks = Vec::new();
    for node in root.children() {
        push_block(node, 0, &mut blocks);
    }
    blocks
}

fn push_block<'a>(node: &'a AstNode<'a>, depth: usize, out: &mut Vec<Block>) {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Heading(heading) => out.push(Block::Heading {
            level: heading.level,
            spans: inline_spans(node),
        }),
        NodeValue::Paragraph => {
            let spans = inline_spans(node);
            if !spans.is_empty() {
                out.push(Block::Paragraph(spans));
            }
        }
        NodeValue::List(list) => {
            let ordered = list.list_type == ListType::Ordered;
            let mut number = list.start;
            for item in node.children() {
                let marker = if ordered {
                    format!("{number}.")
                } else {
                    "•".to_string()
                };
                push_list_item(item, depth, marker, out);
                number += 1;
            }
        }
        NodeValue::BlockQuote => {
            for child in node.children() {
                let spans = inline_spans(child);
                if !spans.is_empty() {
                    out.push(Block::Quote(spans));
                }
            }
        }
        NodeValue::CodeBlock(code) => {
            let lines = code.literal.trim_end_matches('\n').lines().map(str::to_string).collect();
            out.push(Block::Code(lines));
        }
        NodeValue::Table(_) => {
            let rows = node
                .children()
                .map(|row| row.children().map(cell_text).collect())
                .collect();
            out.push(Block::Table(rows));
        }
        NodeValue::ThematicBreak => out.push(Block::Rule),
        NodeValue::HtmlBlock(html) => {
            let text = RE_TAG.replace_all(&html.literal, " ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                out.push(Block::Paragraph(vec![Span::new(Font::Regular, text)]));
            }
        }
        _ => {
            for child in node.children() {
                push_block(child, depth, out);
            }
        }
    }
}

fn push_list_item<'a>(item: &'a AstNode<'a>, depth: usize, marker: String, out: &mut Vec<Block>) {
    let mut marker = Some(marker);
    for child in item.children() {
        let (is_list, is_block) = match child.data.borrow().value {
            NodeValue::List(_) => (true, false),
            NodeValue::Table(_) | NodeValue::CodeBlock(_) => (false, true),
            _ => (false, false),
        };
        if is_list {
            push_block(child, depth + 1, out);
            continue;
        }
        if is_block {
            // the marker goes above a table or code block that opens the item
            if let Some(marker) = marker.take() {
                out.push(Block::ListItem {
                    depth,
                    marker,
                    spans: Vec::new(),
                });
            }
            push_block(child, depth, out);
            continue;
        }
        let spans = inline_spans(child);
        if spans.is_empty() {
            continue;
        }
        out.push(Block::ListItem {
            depth,
            marker: marker.take().unwrap_or_default(),
            spans,
        });
    }
    // an item with no text still shows its marker
    if let Some(marker) = marker {
        out.push(Block::ListItem {
            depth,
            marker,
            spans: Vec::new(),
        });
    }
}

/// Inline content of a block node as font-tagged spans.
fn inline_spans<'a>(node: &'a AstNode<'a>) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    for child in node.children() {
        collect_inline(child, Font::Regular, &mut spans);
    }
    spans
}

fn collect_inline<'a>(node: &'a AstNode<'a>, font: Font, spans: &mut Vec<Span>) {
    let data = node.data.borrow();
    let (text, child_font) = match &data.value {
        NodeValue::Text(text) => (Some(text.to_string()), font),
        NodeValue::Code(code) => (Some(code.literal.clone()), Font::Mono),
        NodeValue::SoftBreak | NodeValue::LineBreak => (Some(" ".to_string()), font),
        NodeValue::HtmlInline(_) => (None, font),
        NodeValue::Strong => (None, bolder(font)),
        NodeValue::Emph => (None, if font == Font::Regular { Font::Italic } else { font }),
        _ => (None, font),
    };

    if let Some(text) = text {
        match spans.last_mut() {
            Some(last) if last.font == child_font => last.text.push_str(&text),
            _ => spans.push(Span::new(child_font, text)),
        }
    }
    for child in node.children() {
        collect_inline(child, child_font, spans);
    }
}

fn bolder(font: Font) -> Font {
    match font {
        Font::Mono | Font::MonoBold => Font::MonoBold,
        _ => Font::Bold,
    }
}

fn cell_text<'a>(cell: &'a AstNode<'a>) -> String {
    inline_spans(cell)
        .into_iter()
        .map(|s| s.text)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
