//! HTML to plain text for problem statements and hints

use scraper::{ElementRef, Html, Node};

/// Strip markup from an HTML fragment, keeping its text.
///
/// Superscripts become caret notation (`10<sup>4</sup>` -> `10^4`) so
/// constraints stay readable. Entities are decoded by the HTML parser.
pub fn clean_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    append_text(fragment.root_element(), &mut out);
    out
}

fn append_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if el.name() == "sup" {
                    out.push('^');
                    out.extend(child_el.text());
                } else {
                    append_text(child_el, out);
                }
            },
            _ => {},
        }
    }
}
