//! Turns parsed hOCR lines into the final text regions of a page.
//!
//! Three steps per line: the confidence filter, an optional pairing with a plain-text
//! transcript line, and emission at line or word granularity. Nothing here fails; problems
//! narrow the output and are reported in [`PageDiagnostics`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::markup::{MarkupLine, MarkupPage};
use crate::region::{PixelBox, TextRegion};
use crate::repair::repair_word_boxes;

/// Granularity of the emitted text regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextPositioning {
    #[default]
    ByLine,
    ByWord,
    /// Word boxes take their line's vertical extent.
    ByWordClampedToLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub positioning: TextPositioning,
    pub min_confidence: u8,
    pub repair_broken_boxes: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            positioning: TextPositioning::ByLine,
            min_confidence: 0,
            repair_broken_boxes: true,
        }
    }
}

/// Plain-text transcript of one page, one entry per non-blank line with whitespace runs
/// collapsed to single spaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    lines: Vec<String>,
    cursor: usize,
}

impl Transcript {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines, cursor: 0 }
    }

    /// Splits a multi-page transcript on form feeds, the page separator of plain-text
    /// recognizer output.
    pub fn split_pages(text: &str) -> Vec<Transcript> {
        let mut pages: Vec<Transcript> = text.split('\x0c').map(Transcript::parse).collect();
        // A trailing form feed leaves an empty last page behind.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.lines.is_empty()) {
            pages.pop();
        }
        pages
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Finds the next transcript line whose whitespace-stripped text equals `key`, searching
    /// forward from the last match so that repeated lines pair up in reading order.
    fn take_matching(&mut self, key: &str) -> Option<String> {
        let pos = self.lines[self.cursor..]
            .iter()
            .position(|l| strip_whitespace(l) == key)?;
        let index = self.cursor + pos;
        self.cursor = index + 1;
        Some(self.lines[index].clone())
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// What was dropped or adjusted while reconciling a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageDiagnostics {
    pub low_confidence_lines: Vec<String>,
    pub unmatched_lines: Vec<String>,
    pub unplaceable: Vec<String>,
    pub repaired_words: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledPage {
    pub number: u32,
    pub regions: Vec<TextRegion>,
    pub diagnostics: PageDiagnostics,
}

/// Produces the text regions of one parsed page, in pixel units relative to the page box
/// with a bottom-up vertical axis.
pub fn reconcile_page(
    page: &MarkupPage,
    transcript: Option<Transcript>,
    options: &ReconcileOptions,
) -> ReconciledPage {
    let page_box = page.effective_bbox();
    let mut transcript = transcript;
    let mut diagnostics = PageDiagnostics::default();
    let mut regions = Vec::new();

    for line in &page.lines {
        if options.min_confidence > 0 {
            if let Some(avg) = line.average_confidence() {
                if avg < f32::from(options.min_confidence) {
                    debug!(line = %line.id, confidence = avg, "line below confidence threshold");
                    diagnostics.low_confidence_lines.push(line.id.clone());
                    continue;
                }
            }
        }

        let text = line.text();
        if text.is_empty() {
            continue;
        }

        let matched = match transcript.as_mut() {
            Some(t) => {
                let found = t.take_matching(&strip_whitespace(&text));
                if found.is_none() {
                    warn!(line = %line.id, "no transcript line matches, keeping markup words");
                    diagnostics.unmatched_lines.push(line.id.clone());
                }
                found
            }
            None => None,
        };

        match options.positioning {
            TextPositioning::ByLine => {
                let Some(bbox) = line.bbox else {
                    diagnostics.unplaceable.push(line.id.clone());
                    continue;
                };
                let region = TextRegion::new(
                    page.number,
                    matched.unwrap_or(text),
                    bbox.to_page_relative(&page_box),
                )
                .with_confidence(line.average_confidence());
                regions.push(region);
            }
            TextPositioning::ByWord | TextPositioning::ByWordClampedToLine => {
                let words = word_regions(page.number, &page_box, line, options, &mut diagnostics);
                match matched {
                    Some(transcript_line) => match merge_with_transcript(&words, &transcript_line) {
                        Some(merged) => regions.extend(merged),
                        None => {
                            warn!(line = %line.id, "transcript tokens split markup words, keeping markup words");
                            diagnostics.unmatched_lines.push(line.id.clone());
                            regions.extend(words);
                        }
                    },
                    None => regions.extend(words),
                }
            }
        }
    }

    debug!(page = page.number, regions = regions.len(), "reconciled page");
    ReconciledPage {
        number: page.number,
        regions,
        diagnostics,
    }
}

/// One region per placeable word of `line`, after box repair and optional vertical
/// clamping to the line.
fn word_regions(
    page_number: u32,
    page_box: &PixelBox,
    line: &MarkupLine,
    options: &ReconcileOptions,
    diagnostics: &mut PageDiagnostics,
) -> Vec<TextRegion> {
    let mut placed = Vec::with_capacity(line.words.len());
    for word in &line.words {
        match word.bbox {
            Some(bbox) if !word.text.is_empty() => placed.push((word, bbox)),
            Some(_) => {}
            None => diagnostics.unplaceable.push(word.id.clone()),
        }
    }

    let mut boxes: Vec<PixelBox> = placed.iter().map(|(_, b)| *b).collect();
    if let (true, Some(line_box)) = (options.repair_broken_boxes, line.bbox) {
        let repaired = repair_word_boxes(&line_box, &mut boxes);
        if repaired > 0 {
            debug!(line = %line.id, repaired, "repaired broken word boxes");
            diagnostics.repaired_words += repaired;
        }
    }

    let clamp_to = match options.positioning {
        TextPositioning::ByWordClampedToLine => line.bbox.map(|b| b.to_page_relative(page_box)),
        _ => None,
    };

    placed
        .iter()
        .zip(boxes)
        .map(|((word, _), bbox)| {
            let mut bbox = bbox.to_page_relative(page_box);
            if let Some(line_box) = clamp_to {
                bbox.top = line_box.top;
                bbox.bottom = line_box.bottom;
            }
            TextRegion::new(page_number, word.text.clone(), bbox).with_confidence(word.confidence)
        })
        .collect()
}

/// Groups consecutive markup words until their concatenated text equals the next
/// transcript token, producing one merged region per token.
///
/// Returns `None` when the words cannot be grouped onto the tokens, e.g. a token boundary
/// falls inside a markup word.
pub fn merge_with_transcript(words: &[TextRegion], transcript_line: &str) -> Option<Vec<TextRegion>> {
    let tokens: Vec<&str> = transcript_line.split_whitespace().collect();
    let mut merged = Vec::with_capacity(tokens.len());
    let mut next_token = 0;
    let mut start = 0;
    let mut buffer = String::new();

    for (i, word) in words.iter().enumerate() {
        let token = *tokens.get(next_token)?;
        buffer.push_str(&strip_whitespace(&word.text));
        let key = strip_whitespace(token);
        if buffer == key {
            merged.push(TextRegion::merged(&words[start..=i], token)?);
            start = i + 1;
            next_token += 1;
            buffer.clear();
        } else if !key.starts_with(&buffer) {
            return None;
        }
    }

    if next_token != tokens.len() || !buffer.is_empty() {
        return None;
    }
    Some(merged)
}
