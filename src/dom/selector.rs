use anyhow::{anyhow, Result};

use super::ElementData;

/// A compound selector without combinators: `tag.class#id[attr="value"]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl SimpleSelector {
    /// Parse a selector such as `div.message`, `[data-testid="user-message"]` or `#chat`
    pub fn parse(input: &str) -> Result<Self> {
        let source = input.trim();
        if source.is_empty() {
            return Err(anyhow!("Empty selector"));
        }

        let mut selector = Self::default();
        let mut rest = source;

        let tag = take_ident(rest);
        if !tag.is_empty() {
            selector.tag = Some(tag.to_ascii_lowercase());
            rest = &rest[tag.len()..];
        } else if let Some(stripped) = rest.strip_prefix('*') {
            rest = stripped;
        }

        while let Some(first) = rest.chars().next() {
            match first {
                '.' | '#' => {
                    let name = take_ident(&rest[1..]);
                    if name.is_empty() {
                        return Err(anyhow!("Missing name after '{}' in selector '{}'", first, source));
                    }
                    if first == '.' {
                        selector.classes.push(name.to_string());
                    } else {
                        selector.id = Some(name.to_string());
                    }
                    rest = &rest[1 + name.len()..];
                }
                '[' => {
                    let end = rest
                        .find(']')
                        .ok_or_else(|| anyhow!("Unclosed attribute in selector '{}'", source))?;
                    let body = &rest[1..end];
                    let (name, value) = match body.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                            (name.trim(), Some(value.to_string()))
                        }
                        None => (body.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(anyhow!("Missing attribute name in selector '{}'", source));
                    }
                    selector.attributes.push((name.to_ascii_lowercase(), value));
                    rest = &rest[end + 1..];
                }
                _ => return Err(anyhow!("Unsupported selector syntax in '{}'", source)),
            }
        }

        Ok(selector)
    }

    pub fn matches(&self, element: &ElementData) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != element.tag()) {
            return false;
        }
        if self.id.as_deref().is_some_and(|id| element.attr("id") != Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, expected)| {
            let actual = match name.as_str() {
                "class" => (!element.classes().is_empty()).then(|| element.classes().join(" ")),
                "style" => (!element.style_text().is_empty()).then(|| element.style_text()),
                _ => element.attr(name).map(str::to_string),
            };
            match (actual, expected) {
                (Some(actual), Some(expected)) => actual == *expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

fn take_ident(input: &str) -> &str {
    let end = input
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
        .map(|(index, _)| index)
        .unwrap_or(input.len());
    &input[..end]
}
