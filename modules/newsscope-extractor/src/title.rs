use scraper::ElementRef;

const MIN_TITLE_LEN: usize = 12;

fn element_text(el: ElementRef) -> String {
    let text: Vec<&str> = el.text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the best title for an anchor: its own text if long enough,
/// otherwise the longest direct sibling's text, otherwise recurse up to
/// the parent. Terminates at the document root.
pub fn find_title_for_link(anchor: ElementRef) -> String {
    let own_text = element_text(anchor);
    if own_text.chars().count() > MIN_TITLE_LEN {
        return own_text;
    }

    let mut best = own_text;

    if let Some(parent) = anchor.parent() {
        for child in parent.children() {
            if let Some(sibling) = ElementRef::wrap(child) {
                let sibling_text = element_text(sibling);
                if sibling_text.chars().count() > best.chars().count() {
                    best = sibling_text;
                }
            }
        }

        if best.chars().count() <= MIN_TITLE_LEN {
            if let Some(parent_el) = ElementRef::wrap(parent) {
                return find_title_for_link(parent_el);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn short_anchor_text_falls_back_to_sibling() {
        let html = Html::parse_fragment(
            r#"<div><a href="/a">Read</a><span>A much longer headline about the world today</span></div>"#,
        );
        let a = Selector::parse("a").unwrap();
        let anchor = html.select(&a).next().unwrap();
        let title = find_title_for_link(anchor);
        assert_eq!(title, "A much longer headline about the world today");
    }

    #[test]
    fn long_anchor_text_wins_immediately() {
        let html = Html::parse_fragment(
            r#"<a href="/a">This headline itself is already long enough</a>"#,
        );
        let a = Selector::parse("a").unwrap();
        let anchor = html.select(&a).next().unwrap();
        assert_eq!(
            find_title_for_link(anchor),
            "This headline itself is already long enough"
        );
    }

    #[test]
    fn recurses_to_grandparent_when_still_short() {
        let html = Html::parse_fragment(
            r#"<section>Large surrounding context that is the real headline text here<div><a href="/a">x</a></div></section>"#,
        );
        let a = Selector::parse("a").unwrap();
        let anchor = html.select(&a).next().unwrap();
        let title = find_title_for_link(anchor);
        assert!(title.contains("Large surrounding context"));
    }
}
