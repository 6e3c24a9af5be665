// src/notify/render.rs
//! Builds the post body for one product's change events.
//!
//! Layout: title, name, blank line, one bulleted line per event, optional
//! current price, optional footer, product URL as the last line. Bodies are
//! capped at [`MAX_POST_CHARS`] Unicode scalar values: the name is shrunk
//! first, then the whole body is cut.

use crate::catalog::with_affiliate_tag;
use crate::change_detector::{ChangeEvent, Direction};
use crate::product::TrackedProduct;
use crate::templates::PostTemplate;

pub const MAX_POST_CHARS: usize = 280;
const NAME_FIT_TARGET: usize = 270;
const MIN_NAME_CHARS: usize = 10;
const ELLIPSIS: &str = "...";
const BULLET: &str = "・";

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    partner_tag: Option<String>,
}

impl Renderer {
    pub fn new(partner_tag: Option<String>) -> Self {
        Self {
            partner_tag: partner_tag.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn render(
        &self,
        product: &TrackedProduct,
        events: &[ChangeEvent],
        template: &PostTemplate,
    ) -> String {
        let url = with_affiliate_tag(&product.url, self.partner_tag.as_deref());
        let body = compose(&product.name, events, product.last_price, template, &url);
        let body_len = char_len(&body);
        if body_len <= MAX_POST_CHARS {
            return body;
        }

        let name_len = char_len(&product.name);
        let limit = MIN_NAME_CHARS.max(name_len.saturating_sub(body_len - NAME_FIT_TARGET));
        let mut short: String = product.name.chars().take(limit).collect();
        short.push_str(ELLIPSIS);

        let body = compose(&short, events, product.last_price, template, &url);
        if char_len(&body) <= MAX_POST_CHARS {
            return body;
        }

        tracing::debug!(asin = %product.asin, "post still too long after name shrink; cutting");
        let mut cut: String = body
            .chars()
            .take(MAX_POST_CHARS - ELLIPSIS.len())
            .collect();
        cut.push_str(ELLIPSIS);
        cut
    }
}

fn compose(
    name: &str,
    events: &[ChangeEvent],
    current_price: Option<i64>,
    t: &PostTemplate,
    url: &str,
) -> String {
    let mut post = format!("{}\n{}\n\n", t.title, name);

    for ev in events {
        let line = match ev {
            ChangeEvent::PriceChanged {
                delta_abs,
                delta_percent,
                direction,
                ..
            } => {
                let pattern = match direction {
                    Direction::Up => &t.price_up,
                    Direction::Down => &t.price_down,
                };
                fill(
                    pattern,
                    &[
                        ("diff", group_thousands(delta_abs.abs())),
                        ("percent", format!("{:.1}", delta_percent.abs())),
                    ],
                )
            }
            ChangeEvent::AvailabilityChanged { old, new } => fill(
                &t.availability_change,
                &[("old", old.clone()), ("new", new.clone())],
            ),
        };
        post.push_str(BULLET);
        post.push_str(&line);
        post.push('\n');
    }

    if let Some(price) = current_price {
        post.push('\n');
        post.push_str(&fill(&t.current_price, &[("price", group_thousands(price))]));
        post.push('\n');
    }

    if !t.footer.is_empty() {
        post.push('\n');
        post.push_str(&t.footer);
        post.push('\n');
    }

    post.push('\n');
    post.push_str(url);
    post
}

/// Substitute `{key}` (or `{key:<fmt>}`, format suffix ignored). Unknown keys stay
/// verbatim.
pub fn fill(pattern: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let inner = &after[..close];
        let key = inner.split(':').next().unwrap_or_default().trim();
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, v)) => out.push_str(v),
            None => {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
