//! Repair of word boxes that escaped their line.
//!
//! Some engines occasionally emit a word box equal to the whole page. Such a word is pulled
//! back inside its line using its neighbours as anchors.

use crate::region::PixelBox;

/// Repairs `words` (in reading order) against their parent `line` and returns how many
/// boxes were changed.
///
/// A left edge outside `[line.x0, line.x1]` becomes the previous word's (already repaired)
/// right edge, or the line's left edge for the first word. A right edge outside the span
/// becomes the next word's left edge, or the line's right edge for the last word or when
/// the next word is broken too. Repaired boxes are clamped into the line span, horizontally
/// and vertically, so that `line.x0 <= x0 <= x1 <= line.x1` holds for each of them.
pub fn repair_word_boxes(line: &PixelBox, words: &mut [PixelBox]) -> usize {
    if line.x1 < line.x0 || line.y1 < line.y0 {
        return 0;
    }
    let outside = |x: i32| x < line.x0 || x > line.x1;
    let mut repaired = 0;

    for i in 0..words.len() {
        let mut word = words[i];
        let mut changed = false;

        if outside(word.x0) {
            word.x0 = match i.checked_sub(1) {
                Some(prev) => words[prev].x1,
                None => line.x0,
            };
            changed = true;
        }
        if outside(word.x1) {
            word.x1 = match words.get(i + 1) {
                Some(next) if !outside(next.x0) => next.x0,
                _ => line.x1,
            };
            changed = true;
        }

        if changed {
            word.x0 = word.x0.clamp(line.x0, line.x1);
            word.x1 = word.x1.clamp(word.x0, line.x1);
            word.y0 = word.y0.clamp(line.y0, line.y1);
            word.y1 = word.y1.clamp(word.y0, line.y1);
            words[i] = word;
            repaired += 1;
        }
    }

    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: PixelBox = PixelBox {
        x0: 100,
        y0: 50,
        x1: 400,
        y1: 80,
    };
    const PAGE: PixelBox = PixelBox {
        x0: 0,
        y0: 0,
        x1: 2480,
        y1: 3508,
    };

    fn assert_within_line(words: &[PixelBox]) {
        for w in words {
            assert!(
                LINE.x0 <= w.x0 && w.x0 <= w.x1 && w.x1 <= LINE.x1,
                "word {:?} escapes line {:?}",
                w,
                LINE
            );
        }
    }

    #[test]
    fn test_well_formed_words_untouched() {
        let mut words = vec![PixelBox::new(100, 50, 180, 80), PixelBox::new(190, 52, 260, 80)];
        let before = words.clone();
        assert_eq!(repair_word_boxes(&LINE, &mut words), 0);
        assert_eq!(words, before);
    }

    #[test]
    fn test_page_sized_middle_word_takes_neighbour_edges() {
        let mut words = vec![
            PixelBox::new(100, 50, 180, 80),
            PAGE,
            PixelBox::new(300, 50, 400, 80),
        ];
        assert_eq!(repair_word_boxes(&LINE, &mut words), 1);
        assert_eq!(words[1], PixelBox::new(180, 50, 300, 80));
        assert_within_line(&words);
    }

    #[test]
    fn test_first_and_last_words_clamp_to_line() {
        let mut words = vec![PixelBox::new(20, 50, 150, 80), PixelBox::new(200, 50, 900, 80)];
        assert_eq!(repair_word_boxes(&LINE, &mut words), 2);
        assert_eq!(words[0].x0, 100);
        assert_eq!(words[1].x1, 400);
        assert_within_line(&words);
    }

    #[test]
    fn test_adjacent_broken_words_stay_ordered() {
        let mut words = vec![PixelBox::new(100, 50, 150, 80), PAGE, PAGE];
        repair_word_boxes(&LINE, &mut words);
        assert_within_line(&words);
        assert!(words[1].x0 >= words[0].x1);
        assert!(words[2].x0 >= words[1].x0);
    }

    #[test]
    fn test_all_words_broken() {
        let mut words = vec![PAGE; 4];
        assert_eq!(repair_word_boxes(&LINE, &mut words), 4);
        assert_within_line(&words);
    }

    #[test]
    fn test_inverted_line_is_left_alone() {
        let line = PixelBox::new(400, 50, 100, 80);
        let mut words = vec![PAGE];
        assert_eq!(repair_word_boxes(&line, &mut words), 0);
        assert_eq!(words[0], PAGE);
    }
}
