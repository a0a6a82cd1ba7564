use crate::constants::{
    PAGE_BOTTOM_MARGIN, PAGE_FIRST_LINE_Y, PAGE_LINE_STEP, SHOPPING_LIST_TITLE,
};

use super::aggregate::ShoppingListItem;

/// Receives a document as a sequence of lines and page breaks.
pub trait DocumentSink {
    fn title(&mut self, text: &str);
    fn line(&mut self, text: &str);
    fn page_break(&mut self);
    fn finish(self) -> Vec<u8>;

    fn content_type(&self) -> &'static str;
    fn file_name(&self) -> &'static str;
}

/// Number of item lines a page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub lines_per_page: usize,
}

impl PageLayout {
    /// Lines start at `first_line_y` and move down by `line_step` until they
    /// would cross `bottom_margin`.
    pub fn from_geometry(first_line_y: i32, line_step: i32, bottom_margin: i32) -> Self {
        let usable = (first_line_y - bottom_margin).max(0);
        let lines_per_page = (usable / line_step.max(1)) as usize + 1;

        Self { lines_per_page }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::from_geometry(PAGE_FIRST_LINE_Y, PAGE_LINE_STEP, PAGE_BOTTOM_MARGIN)
    }
}

/// Plain UTF-8 text, pages separated by a form feed.
#[derive(Debug, Default)]
pub struct TextDocument {
    buffer: String,
}

impl DocumentSink for TextDocument {
    fn title(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push_str("\n\n");
    }

    fn line(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    fn page_break(&mut self) {
        self.buffer.push('\u{000C}');
    }

    fn finish(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_name(&self) -> &'static str {
        "shopping_list.txt"
    }
}

/// Writes the title and one line per item into `sink`, breaking the page
/// whenever `layout.lines_per_page` lines have been written on it.
pub fn render_shopping_list<S: DocumentSink>(
    items: &[ShoppingListItem],
    mut sink: S,
    layout: PageLayout,
) -> Vec<u8> {
    sink.title(SHOPPING_LIST_TITLE);

    let lines_per_page = layout.lines_per_page.max(1);
    for (i, item) in items.iter().enumerate() {
        if i > 0 && i % lines_per_page == 0 {
            sink.page_break();
        }
        sink.line(&item.line());
    }

    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl DocumentSink for RecordingSink {
        fn title(&mut self, text: &str) {
            self.events.push(format!("title:{text}"));
        }

        fn line(&mut self, text: &str) {
            self.events.push(format!("line:{text}"));
        }

        fn page_break(&mut self) {
            self.events.push(String::from("break"));
        }

        fn finish(self) -> Vec<u8> {
            self.events.join("|").into_bytes()
        }

        fn content_type(&self) -> &'static str {
            "text/x-events"
        }

        fn file_name(&self) -> &'static str {
            "events.txt"
        }
    }

    fn items(count: usize) -> Vec<ShoppingListItem> {
        (0..count)
            .map(|i| ShoppingListItem {
                name: format!("Item {i}"),
                measurement_unit: String::from("g"),
                total_amount: i as i64 + 1,
            })
            .collect()
    }

    #[rstest]
    fn test_default_layout_matches_page_geometry() {
        // 780, 760, ... 60 fits; 40 would cross the margin
        assert_eq!(PageLayout::default().lines_per_page, 37);
    }

    #[rstest]
    fn test_empty_list_is_title_only() {
        let bytes = render_shopping_list(&[], TextDocument::default(), PageLayout::default());
        assert_eq!(String::from_utf8(bytes).unwrap(), "Shopping List\n\n");
    }

    #[rstest]
    fn test_lines_follow_item_format() {
        let list = vec![
            ShoppingListItem {
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                total_amount: 500,
            },
            ShoppingListItem {
                name: String::from("Egg"),
                measurement_unit: String::from("pcs"),
                total_amount: 2,
            },
        ];

        let bytes = render_shopping_list(&list, TextDocument::default(), PageLayout::default());

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Shopping List\n\nFlour - 500 g\nEgg - 2 pcs\n"
        );
    }

    #[rstest]
    #[case(3, 3, 0)]
    #[case(4, 3, 1)]
    #[case(7, 3, 2)]
    #[case(0, 3, 0)]
    fn test_page_breaks(#[case] count: usize, #[case] per_page: usize, #[case] breaks: usize) {
        let bytes = render_shopping_list(
            &items(count),
            RecordingSink::default(),
            PageLayout {
                lines_per_page: per_page,
            },
        );
        let events = String::from_utf8(bytes).unwrap();

        assert!(events.starts_with("title:Shopping List"));
        assert_eq!(events.matches("break").count(), breaks);
        assert_eq!(events.matches("line:").count(), count);
        assert!(!events.ends_with("break"));
    }
}
