use std::collections::BTreeMap;

use super::geom::{BBoxPx, union_bbox};
use super::text::needs_space;

const WORD_LEVEL: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct TsvLine {
    pub(super) text: String,
    pub(super) bbox: BBoxPx,
    /// Length-weighted word confidence, 0..=100 as tesseract reports it.
    pub(super) conf: f32,
}

struct WordToken {
    text: String,
    bbox: BBoxPx,
    conf: f32,
    len: usize,
}

pub(super) fn parse_tsv_lines(tsv: &str) -> Vec<TsvLine> {
    let mut word_map: BTreeMap<(i32, i32, i32, i32), Vec<WordToken>> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }
        let page_num: i32 = cols[1].parse().unwrap_or(0);
        let block_num: i32 = cols[2].parse().unwrap_or(0);
        let par_num: i32 = cols[3].parse().unwrap_or(0);
        let line_num: i32 = cols[4].parse().unwrap_or(0);
        let left: u32 = cols[6].parse().unwrap_or(0);
        let top: u32 = cols[7].parse().unwrap_or(0);
        let width: u32 = cols[8].parse().unwrap_or(0);
        let height: u32 = cols[9].parse().unwrap_or(0);
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11..].join("\t");
        let text = text.trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (page_num, block_num, par_num, line_num);
        word_map.entry(key).or_default().push(WordToken {
            text: text.to_string(),
            bbox: BBoxPx {
                x: left,
                y: top,
                w: width,
                h: height,
            },
            conf,
            len: text.chars().count().max(1),
        });
    }

    let mut lines = word_map
        .into_values()
        .filter_map(|mut words| {
            words.sort_by_key(|word| word.bbox.x);
            build_line(&words)
        })
        .collect::<Vec<_>>();
    lines.sort_by_key(|line| (line.bbox.y, line.bbox.x));
    lines
}

fn build_line(words: &[WordToken]) -> Option<TsvLine> {
    let first = words.first()?;

    let mut text = first.text.clone();
    let mut bbox = first.bbox;
    let mut conf_sum = first.conf * first.len as f32;
    let mut len_sum = first.len as f32;
    for pair in words.windows(2) {
        let (prev, word) = (&pair[0], &pair[1]);
        if needs_space(&prev.text, &word.text) {
            text.push(' ');
        }
        text.push_str(&word.text);
        bbox = union_bbox(&bbox, &word.bbox);
        conf_sum += word.conf * word.len as f32;
        len_sum += word.len as f32;
    }

    Some(TsvLine {
        text,
        bbox,
        conf: conf_sum / len_sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn groups_words_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t400\t200\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t",
            "5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t80\tworld",
            "5\t1\t1\t1\t1\t1\t10\t12\t50\t18\t90\thello",
            "5\t1\t1\t1\t2\t1\t10\t50\t30\t20\t60.5\tbye",
        ]);
        let lines = parse_tsv_lines(&input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "hello world");
        assert_eq!(
            lines[0].bbox,
            BBoxPx {
                x: 10,
                y: 10,
                w: 110,
                h: 20
            }
        );
        assert!((lines[0].conf - 85.0).abs() < 1e-4);
        assert_eq!(lines[1].text, "bye");
        assert!((lines[1].conf - 60.5).abs() < 1e-4);
    }

    #[test]
    fn skips_blank_and_unconfident_words() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t-1\tghost",
            "5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t95\t   ",
            "5\t1\t1\t1\t1\t3\tbad",
        ]);
        assert!(parse_tsv_lines(&input).is_empty());
    }

    #[test]
    fn cjk_words_are_joined_without_spaces() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t20\t20\t90\t你好",
            "5\t1\t1\t1\t1\t2\t22\t0\t20\t20\t90\t世界",
        ]);
        let lines = parse_tsv_lines(&input);
        assert_eq!(lines[0].text, "你好世界");
    }
}
