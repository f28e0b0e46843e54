use crate::config::CaptionPosition;
use crate::transcript::WordSpan;

pub const CAPTION_FONT_SIZE: u32 = 64;
const SHADOW_OFFSET_PX: u32 = 3;
const SHADOW_COLOR: &str = "black@0.6";

/// One timed on-screen text element: a run of consecutive words, shown
/// from the first word's start to the last word's end, relative to the
/// clip rather than the source video.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionUnit {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Groups consecutive words into caption units of at most `max_words`.
pub fn group_words(words: &[WordSpan], max_words: usize) -> Vec<CaptionUnit> {
    let max_words = max_words.max(1);

    words
        .chunks(max_words)
        .filter(|group| !group.is_empty())
        .map(|group| CaptionUnit {
            start: group[0].start,
            end: group[group.len() - 1].end,
            text: group
                .iter()
                .map(|w| w.word.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}

/// Escapes text for use inside a drawtext `text='...'` value.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            ',' => out.push_str("\\,"),
            _ => out.push(ch),
        }
    }
    out
}

fn y_expression(position: CaptionPosition) -> &'static str {
    match position {
        CaptionPosition::Top => "h*0.12",
        CaptionPosition::Center => "(h-text_h)/2",
        CaptionPosition::Bottom => "h-text_h-h*0.12",
    }
}

fn drawtext(
    unit: &CaptionUnit,
    font: &str,
    color: &str,
    y_expr: &str,
    offset: u32,
) -> String {
    format!(
        "drawtext=font='{font}':text='{text}':fontsize={size}:fontcolor={color}:\
         x=(w-text_w)/2+{dx}:y={y}+{dy}:enable='between(t,{start:.3},{end:.3})'",
        font = escape_drawtext(font),
        text = escape_drawtext(&unit.text),
        size = CAPTION_FONT_SIZE,
        color = color,
        dx = offset,
        y = y_expr,
        dy = offset,
        start = unit.start,
        end = unit.end,
    )
}

/// Builds the full drawtext chain for a clip's caption timeline. Each
/// unit renders twice: the shadow copy first, offset by a few pixels,
/// then the foreground text on top of it.
pub fn build_caption_filter(
    units: &[CaptionUnit],
    font: &str,
    text_color: &str,
    position: CaptionPosition,
) -> String {
    let y_expr = y_expression(position);
    let mut filters = Vec::with_capacity(units.len() * 2);

    for unit in units {
        filters.push(drawtext(unit, font, SHADOW_COLOR, y_expr, SHADOW_OFFSET_PX));
        filters.push(drawtext(unit, font, text_color, y_expr, 0));
    }

    filters.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64, text: &str) -> WordSpan {
        WordSpan {
            start,
            end,
            word: text.to_string(),
        }
    }

    #[test]
    fn grouping_respects_max_words() {
        let words = vec![
            word(0.0, 0.4, "you"),
            word(0.4, 0.9, "will"),
            word(0.9, 1.3, "not"),
            word(1.3, 1.9, "believe"),
            word(1.9, 2.4, "this"),
        ];

        let units = group_words(&words, 2);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "you will");
        assert_eq!(units[2].text, "this");
    }

    #[test]
    fn unit_span_covers_first_to_last_word() {
        let words = vec![
            word(1.5, 2.0, "a"),
            word(2.0, 2.8, "b"),
            word(2.8, 3.1, "c"),
        ];

        let units = group_words(&words, 3);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].start, 1.5);
        assert_eq!(units[0].end, 3.1);
    }

    #[test]
    fn zero_max_words_is_treated_as_one() {
        let words = vec![word(0.0, 1.0, "a"), word(1.0, 2.0, "b")];
        assert_eq!(group_words(&words, 0).len(), 2);
    }

    #[test]
    fn drawtext_escaping_covers_specials() {
        assert_eq!(escape_drawtext("it's 100% fine, ok:"), "it\\'s 100\\% fine\\, ok\\:");
        assert_eq!(escape_drawtext("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn caption_filter_renders_shadow_before_foreground() {
        let units = vec![CaptionUnit {
            start: 0.5,
            end: 2.0,
            text: "hello world".to_string(),
        }];
        let filter = build_caption_filter(&units, "Arial", "white", CaptionPosition::Bottom);

        let shadow_pos = filter.find("fontcolor=black@0.6").unwrap();
        let fg_pos = filter.find("fontcolor=white").unwrap();
        assert!(shadow_pos < fg_pos);
        assert!(filter.contains("enable='between(t,0.500,2.000)'"));
        assert!(filter.contains("y=h-text_h-h*0.12+3"));
        assert!(filter.contains("y=h-text_h-h*0.12+0"));
    }

    #[test]
    fn caption_position_changes_anchor() {
        let units = vec![CaptionUnit {
            start: 0.0,
            end: 1.0,
            text: "x".to_string(),
        }];
        let top = build_caption_filter(&units, "Arial", "white", CaptionPosition::Top);
        let center = build_caption_filter(&units, "Arial", "white", CaptionPosition::Center);
        assert!(top.contains("y=h*0.12+"));
        assert!(center.contains("y=(h-text_h)/2+"));
    }
}
