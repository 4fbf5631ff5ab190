//! hOCR parsing: pages, text lines and words with their pixel bounding boxes.
//!
//! The parser is tolerant by construction. A malformed `title` never aborts a page; the
//! element is kept with no box and its id is reported in [`MarkupDocument::unparsable`].

use std::collections::BTreeSet;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::{debug, warn};

use crate::region::PixelBox;

static BBOX_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static WCONF_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PAGENO_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn bbox_pattern() -> Option<&'static Regex> {
    BBOX_PATTERN
        .get_or_init(|| Regex::new(r"bbox\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)").ok())
        .as_ref()
}

fn wconf_pattern() -> Option<&'static Regex> {
    WCONF_PATTERN
        .get_or_init(|| Regex::new(r"x_wconf\s+(-?\d+(?:\.\d+)?)").ok())
        .as_ref()
}

fn pageno_pattern() -> Option<&'static Regex> {
    PAGENO_PATTERN
        .get_or_init(|| Regex::new(r"ppageno\s+(\d+)").ok())
        .as_ref()
}

/// Extracts the `bbox x0 y0 x1 y1` clause from an hOCR `title` attribute.
pub fn parse_bbox(title: &str) -> Option<PixelBox> {
    let caps = bbox_pattern()?.captures(title)?;
    let coord = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
    Some(PixelBox::new(coord(1)?, coord(2)?, coord(3)?, coord(4)?))
}

/// Extracts the `x_wconf` word confidence (0-100) from an hOCR `title` attribute.
pub fn parse_confidence(title: &str) -> Option<f32> {
    let caps = wconf_pattern()?.captures(title)?;
    caps.get(1)?.as_str().parse::<f32>().ok()
}

fn parse_physical_page(title: &str) -> Option<u32> {
    let caps = pageno_pattern()?.captures(title)?;
    caps.get(1)?.as_str().parse::<u32>().ok()
}

/// Line-level container classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Line,
    Caption,
    Header,
    TextFloat,
}

impl LineKind {
    fn from_class(class: &str) -> Option<Self> {
        match class {
            "ocr_line" => Some(Self::Line),
            "ocr_caption" => Some(Self::Caption),
            "ocr_header" => Some(Self::Header),
            "ocr_textfloat" => Some(Self::TextFloat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupWord {
    pub id: String,
    pub text: String,
    pub bbox: Option<PixelBox>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupLine {
    pub id: String,
    pub kind: LineKind,
    pub bbox: Option<PixelBox>,
    pub words: Vec<MarkupWord>,
    /// Character data found directly inside the line, outside any word element.
    pub loose_text: String,
}

impl MarkupLine {
    /// Full text of the line: its words joined by single spaces.
    pub fn text(&self) -> String {
        if self.words.is_empty() {
            return self.loose_text.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        self.words
            .iter()
            .map(|w| w.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Simple mean of the word confidences that could be parsed.
    pub fn average_confidence(&self) -> Option<f32> {
        let scores: Vec<f32> = self.words.iter().filter_map(|w| w.confidence).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupPage {
    pub id: String,
    /// 1-based page number claimed by this document.
    pub number: u32,
    pub bbox: Option<PixelBox>,
    pub lines: Vec<MarkupLine>,
}

impl MarkupPage {
    /// The declared page box, or the union of the line boxes when the page has none.
    pub fn effective_bbox(&self) -> PixelBox {
        if let Some(bbox) = self.bbox {
            return bbox;
        }
        self.lines
            .iter()
            .filter_map(|l| l.bbox)
            .reduce(|a, b| {
                PixelBox::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
            })
            .unwrap_or_default()
    }
}

/// Result of parsing one hOCR document (one recognition pass).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupDocument {
    pub pages: Vec<MarkupPage>,
    /// Ids of elements whose bounding box was missing or malformed.
    pub unparsable: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Page,
    Line,
    Word,
    Other,
}

struct Frame {
    name: Vec<u8>,
    container: Container,
}

struct ElementAttrs {
    id: Option<String>,
    classes: Vec<String>,
    title: String,
}

fn read_attrs(e: &BytesStart<'_>) -> ElementAttrs {
    let mut attrs = ElementAttrs {
        id: None,
        classes: Vec::new(),
        title: String::new(),
    };
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"id" => attrs.id = Some(value),
            b"class" => attrs.classes = value.split_whitespace().map(str::to_string).collect(),
            b"title" => attrs.title = value,
            _ => {}
        }
    }
    attrs
}

#[derive(Default)]
struct Builder {
    doc: MarkupDocument,
    page: Option<MarkupPage>,
    line: Option<MarkupLine>,
    word: Option<MarkupWord>,
    pages_seen: u32,
    anonymous: usize,
}

impl Builder {
    fn element_id(&mut self, attrs: &ElementAttrs, class: &str) -> String {
        attrs.id.clone().unwrap_or_else(|| {
            self.anonymous += 1;
            format!("{}#{}", class, self.anonymous)
        })
    }

    fn bbox_for(&mut self, id: &str, title: &str) -> Option<PixelBox> {
        let bbox = parse_bbox(title);
        if bbox.is_none() {
            warn!(element = id, "unparsable bbox, element will not be placed");
            self.doc.unparsable.insert(id.to_string());
        }
        bbox
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Container {
        let attrs = read_attrs(e);
        if attrs.classes.iter().any(|c| c == "ocr_page") {
            self.close_page();
            self.pages_seen = self.pages_seen.saturating_add(1);
            let id = self.element_id(&attrs, "ocr_page");
            let number = parse_physical_page(&attrs.title)
                .and_then(|n| n.checked_add(1))
                .unwrap_or(self.pages_seen);
            let bbox = self.bbox_for(&id, &attrs.title);
            self.page = Some(MarkupPage {
                id,
                number,
                bbox,
                lines: Vec::new(),
            });
            return Container::Page;
        }
        if let Some(kind) = attrs.classes.iter().find_map(|c| LineKind::from_class(c)) {
            if self.page.is_none() {
                return Container::Other;
            }
            self.close_line();
            let id = self.element_id(&attrs, "ocr_line");
            let bbox = self.bbox_for(&id, &attrs.title);
            self.line = Some(MarkupLine {
                id,
                kind,
                bbox,
                words: Vec::new(),
                loose_text: String::new(),
            });
            return Container::Line;
        }
        if attrs.classes.iter().any(|c| c == "ocrx_word" || c == "ocr_word") {
            if self.line.is_none() {
                debug!("word outside of a text line ignored");
                return Container::Other;
            }
            self.close_word();
            let id = self.element_id(&attrs, "ocrx_word");
            let bbox = self.bbox_for(&id, &attrs.title);
            self.word = Some(MarkupWord {
                id,
                text: String::new(),
                bbox,
                confidence: parse_confidence(&attrs.title),
            });
            return Container::Word;
        }
        Container::Other
    }

    fn text(&mut self, text: &str) {
        if let Some(word) = self.word.as_mut() {
            word.text.push_str(text);
        } else if let Some(line) = self.line.as_mut() {
            if !line.loose_text.is_empty() {
                line.loose_text.push(' ');
            }
            line.loose_text.push_str(text);
        }
    }

    fn close(&mut self, container: Container) {
        match container {
            Container::Word => self.close_word(),
            Container::Line => self.close_line(),
            Container::Page => self.close_page(),
            Container::Other => {}
        }
    }

    fn close_word(&mut self) {
        if let Some(mut word) = self.word.take() {
            word.text = word.text.trim().to_string();
            if let Some(line) = self.line.as_mut() {
                line.words.push(word);
            }
        }
    }

    fn close_line(&mut self) {
        self.close_word();
        if let Some(line) = self.line.take() {
            if let Some(page) = self.page.as_mut() {
                page.lines.push(line);
            }
        }
    }

    fn close_page(&mut self) {
        self.close_line();
        if let Some(page) = self.page.take() {
            debug!(page = page.number, lines = page.lines.len(), "parsed hOCR page");
            self.doc.pages.push(page);
        }
    }
}

/// Parses one hOCR document.
///
/// End tags are matched by name against the open elements, so unclosed HTML void elements
/// (`<meta>`, `<br>`) do not derail the structure. Parse errors stop reading; everything
/// collected up to that point is kept.
pub fn parse_markup(markup: &str) -> MarkupDocument {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut builder = Builder::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let container = builder.open(&e);
                stack.push(Frame {
                    name: e.name().as_ref().to_vec(),
                    container,
                });
            }
            Ok(Event::Empty(e)) => {
                let container = builder.open(&e);
                builder.close(container);
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                builder.text(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if let Some(pos) = stack.iter().rposition(|f| f.name == name.as_ref()) {
                    for frame in stack.drain(pos..).rev() {
                        builder.close(frame.container);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("hOCR parse error at byte {}: {e}", reader.buffer_position());
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    builder.close_page();
    builder.doc
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
 <head>
  <title></title>
  <meta http-equiv="Content-Type" content="text/html;charset=utf-8"/>
  <meta name='ocr-system' content='tesseract 5.3.0' />
 </head>
 <body>
  <div class='ocr_page' id='page_1' title='image "scan.png"; bbox 0 0 200 100; ppageno 0'>
   <div class='ocr_carea' id='block_1_1' title="bbox 10 10 190 60">
    <p class='ocr_par' id='par_1_1' lang='eng' title="bbox 10 10 190 60">
     <span class='ocr_line' id='line_1_1' title="bbox 10 10 120 30; baseline 0 -3; x_size 20">
      <span class='ocrx_word' id='word_1_1' title='bbox 10 10 60 30; x_wconf 96'>Hello</span>
      <span class='ocrx_word' id='word_1_2' title='bbox 70 12 120 30; x_wconf 90'><strong>world</strong></span>
     </span>
     <span class='ocr_caption' id='line_1_2' title="bbox 10 40 100 60">
      <span class='ocrx_word' id='word_1_3' title='x_wconf 50'>Figure</span>
     </span>
    </p>
   </div>
  </div>
 </body>
</html>
"#;

    #[test]
    fn test_bbox_round_trip() {
        for (x0, y0, x1, y1) in [(0, 0, 200, 100), (12, 7, 345, 9999), (-3, 4, 5, 6)] {
            let bbox = PixelBox::new(x0, y0, x1, y1);
            assert_eq!(parse_bbox(&bbox.to_string()), Some(bbox));
        }
    }

    #[test]
    fn test_parse_bbox_among_clauses() {
        let title = r#"image "a.tif"; bbox 1 2 3 4; baseline 0.1 -2; x_wconf 87"#;
        assert_eq!(parse_bbox(title), Some(PixelBox::new(1, 2, 3, 4)));
        assert_eq!(parse_confidence(title), Some(87.0));
    }

    #[test]
    fn test_parse_bbox_rejects_garbage() {
        assert_eq!(parse_bbox("bbox 1 2 three 4"), None);
        assert_eq!(parse_bbox("x_wconf 12"), None);
        assert_eq!(parse_bbox(""), None);
    }

    #[test]
    fn test_parse_sample_structure() {
        let doc = parse_markup(SAMPLE);
        assert_eq!(doc.pages.len(), 1);

        let page = &doc.pages[0];
        assert_eq!(page.number, 1);
        assert_eq!(page.bbox, Some(PixelBox::new(0, 0, 200, 100)));
        assert_eq!(page.lines.len(), 2);

        let line = &page.lines[0];
        assert_eq!(line.kind, LineKind::Line);
        assert_eq!(line.text(), "Hello world");
        assert_eq!(line.words[1].text, "world");
        assert_eq!(line.words[1].bbox, Some(PixelBox::new(70, 12, 120, 30)));
        assert_eq!(line.average_confidence(), Some(93.0));

        assert_eq!(page.lines[1].kind, LineKind::Caption);
    }

    #[test]
    fn test_unparsable_bbox_is_reported_not_fatal() {
        let doc = parse_markup(SAMPLE);
        assert!(doc.unparsable.contains("word_1_3"));
        let caption = &doc.pages[0].lines[1];
        assert_eq!(caption.words[0].bbox, None);
        assert_eq!(caption.words[0].text, "Figure");
    }

    #[test]
    fn test_page_numbers_from_ppageno_and_order() {
        let markup = r#"<html><body>
            <div class='ocr_page' id='p1' title='bbox 0 0 10 10'></div>
            <div class='ocr_page' id='p2' title='bbox 0 0 10 10'></div>
            <div class='ocr_page' id='p9' title='bbox 0 0 10 10; ppageno 8'></div>
        </body></html>"#;
        let numbers: Vec<u32> = parse_markup(markup).pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 9]);
    }

    #[test]
    fn test_unclosed_void_elements_do_not_break_nesting() {
        let markup = r#"<html><head><meta charset="utf-8"><title>x</title></head><body>
            <div class='ocr_page' id='page_1' title='bbox 0 0 100 50'>
              <span class='ocr_line' id='l1' title='bbox 0 0 50 20'>
                <span class='ocrx_word' id='w1' title='bbox 0 0 20 20'>one</span><br>
                <span class='ocrx_word' id='w2' title='bbox 25 0 50 20'>two</span>
              </span>
            </div></body></html>"#;
        let doc = parse_markup(markup);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].lines.len(), 1);
        assert_eq!(doc.pages[0].lines[0].text(), "one two");
    }

    #[test]
    fn test_missing_page_bbox_falls_back_to_lines() {
        let markup = r#"<div class='ocr_page' id='page_1'>
              <span class='ocr_line' id='l1' title='bbox 5 5 50 20'></span>
              <span class='ocr_line' id='l2' title='bbox 10 30 80 45'></span>
            </div>"#;
        let doc = parse_markup(markup);
        assert!(doc.unparsable.contains("page_1"));
        assert_eq!(doc.pages[0].effective_bbox(), PixelBox::new(5, 5, 80, 45));
    }

    #[test]
    fn test_truncated_document_keeps_collected_content() {
        let markup = r#"<div class='ocr_page' id='page_1' title='bbox 0 0 100 50'>
              <span class='ocr_line' id='l1' title='bbox 0 0 50 20'>
                <span class='ocrx_word' id='w1' title='bbox 0 0 20 20'>kept</span>"#;
        let doc = parse_markup(markup);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].lines[0].words[0].text, "kept");
    }

    #[test]
    fn test_out_of_range_ppageno_falls_back_to_position() {
        let markup = "<div class='ocr_page' id='p' title='bbox 0 0 10 10; ppageno 4294967295'></div>";
        let doc = parse_markup(markup);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].number, 1);
    }
}
