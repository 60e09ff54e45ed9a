//! Playwright locators, built in Rust and rendered to JavaScript

use std::fmt;
use serde::{Deserialize, Serialize};

/// One link in a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Segment {
    Role { role: String, name: String },
    TestId { id: String },
    Text { text: String, exact: bool },
    HasText { text: String },
}

/// A chain of segments rooted at `page`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    segments: Vec<Segment>,
}

impl Locator {
    fn root(segment: Segment) -> Self {
        Self { segments: vec![segment] }
    }

    fn push(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Element by ARIA role and exact accessible name
    pub fn role(role: &str, name: &str) -> Self {
        Self::root(Segment::Role {
            role: role.to_string(),
            name: name.to_string(),
        })
    }

    pub fn button(name: &str) -> Self {
        Self::role("button", name)
    }

    pub fn test_id(id: &str) -> Self {
        Self::root(Segment::TestId { id: id.to_string() })
    }

    /// Element containing `text` (case-insensitive substring, Playwright semantics)
    pub fn text(text: &str) -> Self {
        Self::root(Segment::Text {
            text: text.to_string(),
            exact: false,
        })
    }

    pub fn exact_text(text: &str) -> Self {
        Self::root(Segment::Text {
            text: text.to_string(),
            exact: true,
        })
    }

    /// Keep only matches whose text contains `text`
    pub fn filter_has_text(self, text: &str) -> Self {
        self.push(Segment::HasText { text: text.to_string() })
    }

    /// Resolve `child` inside every element this locator matches
    pub fn within(mut self, child: Locator) -> Self {
        self.segments.extend(child.segments);
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Render as a Playwright expression
    pub fn to_js(&self) -> String {
        let mut js = String::from("page");
        for segment in &self.segments {
            match segment {
                Segment::Role { role, name } => js.push_str(&format!(
                    ".getByRole({}, {{ name: {}, exact: true }})",
                    js_str(role),
                    js_str(name)
                )),
                Segment::TestId { id } => {
                    js.push_str(&format!(".getByTestId({})", js_str(id)))
                }
                Segment::Text { text, exact } => js.push_str(&format!(
                    ".getByText({}, {{ exact: {} }})",
                    js_str(text),
                    exact
                )),
                Segment::HasText { text } => {
                    js.push_str(&format!(".filter({{ hasText: {} }})", js_str(text)))
                }
            }
        }
        js
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            match segment {
                Segment::Role { role, name } => write!(f, "{} {:?}", role, name)?,
                Segment::TestId { id } => write!(f, "[data-testid={}]", id)?,
                Segment::Text { text, .. } => write!(f, "text {:?}", text)?,
                Segment::HasText { text } => write!(f, "has {:?}", text)?,
            }
        }
        Ok(())
    }
}

/// JavaScript string literal. JSON strings are valid JS literals, so quotes,
/// newlines and trailing whitespace survive unchanged.
pub fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_locator() {
        assert_eq!(
            Locator::button("login").to_js(),
            r#"page.getByRole("button", { name: "login", exact: true })"#
        );
    }

    #[test]
    fn test_chained_locator() {
        let like = Locator::test_id("blog")
            .filter_has_text("Le Passager")
            .within(Locator::button("like"));
        assert_eq!(
            like.to_js(),
            r#"page.getByTestId("blog").filter({ hasText: "Le Passager" }).getByRole("button", { name: "like", exact: true })"#
        );
        assert_eq!(
            like.to_string(),
            r#"[data-testid=blog] >> has "Le Passager" >> button "like""#
        );
    }

    #[test]
    fn test_escaping_keeps_value_verbatim() {
        let js = Locator::text("it's \"quoted\"\n ").to_js();
        assert_eq!(js, r#"page.getByText("it's \"quoted\"\n ", { exact: false })"#);
    }

    #[test]
    fn test_exact_text() {
        assert_eq!(
            Locator::exact_text("Blogs").to_js(),
            r#"page.getByText("Blogs", { exact: true })"#
        );
        assert_eq!(Locator::exact_text("Blogs").segments().len(), 1);
    }
}
