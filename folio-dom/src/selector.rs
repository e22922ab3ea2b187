//! A small CSS selector subset: compound steps joined by descendant or child
//! combinators, e.g. `img.lazy`, `#back-to-top`, `form [required]`,
//! `input[name="q"]`, `.alert, .toast`.

use crate::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrCondition {
    Exists { name: String },
    Equals { name: String, value: String },
}

/// One compound selector such as `input.form-control[required]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorStep {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPart {
    pub step: SelectorStep,
    /// Relation to the part on the left; `None` for the first part.
    pub combinator: Option<Combinator>,
}

/// A parsed selector list; an element matches if any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Vec<SelectorPart>>,
}

/// What the matcher needs to know about an element.
pub trait Subject {
    fn tag_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|list| list.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

impl Selector {
    /// Parse a selector.
    ///
    /// ```
    /// use folio_dom::Selector;
    ///
    /// let sel = Selector::parse(r#"input[name="q"]"#).unwrap();
    /// assert_eq!(sel.as_str(), r#"input[name="q"]"#);
    /// assert!(Selector::parse("").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(DomError::Selector(source.to_string()));
        }
        let alternatives = split_top_level(trimmed, ',')
            .into_iter()
            .map(|alt| parse_chain(alt.trim()).map_err(|_| DomError::Selector(source.into())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: trimmed.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `subject`, walking ancestors through `parent_of` for combinators.
    pub fn matches<'a, S, F>(&self, subject: &'a S, parent_of: F) -> bool
    where
        S: Subject + ?Sized,
        F: Fn(&'a S) -> Option<&'a S> + Copy,
    {
        self.alternatives
            .iter()
            .any(|parts| matches_chain(parts, parts.len(), subject, parent_of))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_step<S: Subject + ?Sized>(step: &SelectorStep, subject: &S) -> bool {
    if let Some(tag) = &step.tag {
        if !subject.tag_name().eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if subject.attribute("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !step.classes.iter().all(|c| subject.has_class(c)) {
        return false;
    }
    step.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists { name } => subject.attribute(name).is_some(),
        AttrCondition::Equals { name, value } => subject.attribute(name) == Some(value.as_str()),
    })
}

/// Match `parts[..len]` with its last part anchored on `subject`.
fn matches_chain<'a, S, F>(parts: &[SelectorPart], len: usize, subject: &'a S, parent_of: F) -> bool
where
    S: Subject + ?Sized,
    F: Fn(&'a S) -> Option<&'a S> + Copy,
{
    let Some(last) = len.checked_sub(1).map(|i| &parts[i]) else {
        return true;
    };
    if !matches_step(&last.step, subject) {
        return false;
    }
    match last.combinator {
        None => true,
        Some(Combinator::Child) => parent_of(subject)
            .map(|p| matches_chain(parts, len - 1, p, parent_of))
            .unwrap_or(false),
        Some(Combinator::Descendant) => {
            let mut cur = parent_of(subject);
            while let Some(ancestor) = cur {
                if matches_chain(parts, len - 1, ancestor, parent_of) {
                    return true;
                }
                cur = parent_of(ancestor);
            }
            false
        }
    }
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn parse_chain(s: &str) -> Result<Vec<SelectorPart>, ()> {
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut token = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in s.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                token.push(c);
            }
            (Some(_), c) => token.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                token.push(ch);
            }
            (None, '[') => {
                depth += 1;
                token.push(ch);
            }
            (None, ']') => {
                depth = depth.checked_sub(1).ok_or(())?;
                token.push(ch);
            }
            (None, c) if depth == 0 && c.is_whitespace() => {
                flush(&mut token, &mut pending, &mut parts)?;
            }
            (None, '>') if depth == 0 => {
                flush(&mut token, &mut pending, &mut parts)?;
                if parts.is_empty() || pending.is_some() {
                    return Err(());
                }
                pending = Some(Combinator::Child);
            }
            (None, c) => token.push(c),
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(());
    }
    flush(&mut token, &mut pending, &mut parts)?;
    if parts.is_empty() || pending.is_some() {
        return Err(());
    }
    Ok(parts)
}

fn flush(
    token: &mut String,
    pending: &mut Option<Combinator>,
    parts: &mut Vec<SelectorPart>,
) -> Result<(), ()> {
    if token.is_empty() {
        return Ok(());
    }
    let step = parse_step(token)?;
    let combinator = if parts.is_empty() {
        if pending.is_some() {
            return Err(());
        }
        None
    } else {
        Some(pending.take().unwrap_or(Combinator::Descendant))
    };
    parts.push(SelectorPart { step, combinator });
    token.clear();
    Ok(())
}

fn parse_step(token: &str) -> Result<SelectorStep, ()> {
    let mut step = SelectorStep::default();
    let mut rest = token;

    let tag_end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    if !tag.is_empty() && tag != "*" {
        if !is_ident(tag) {
            return Err(());
        }
        step.tag = Some(tag.to_ascii_lowercase());
    }
    rest = &rest[tag_end..];

    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let body = &rest[1..];
                let end = body.find(['.', '#', '[']).unwrap_or(body.len());
                let name = &body[..end];
                if !is_ident(name) {
                    return Err(());
                }
                if first == '.' {
                    step.classes.push(name.to_string());
                } else {
                    step.id = Some(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']').ok_or(())?;
                step.attrs.push(parse_attr(&rest[1..close])?);
                rest = &rest[close + 1..];
            }
            _ => return Err(()),
        }
    }
    Ok(step)
}

fn parse_attr(inner: &str) -> Result<AttrCondition, ()> {
    match inner.split_once('=') {
        None => {
            let name = inner.trim();
            if !is_ident(name) {
                return Err(());
            }
            Ok(AttrCondition::Exists {
                name: name.to_ascii_lowercase(),
            })
        }
        Some((name, value)) => {
            let name = name.trim();
            if !is_ident(name) {
                return Err(());
            }
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Ok(AttrCondition::Equals {
                name: name.to_ascii_lowercase(),
                value: unquoted.to_string(),
            })
        }
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        tag: &'static str,
        attrs: Vec<(&'static str, &'static str)>,
        parent: Option<usize>,
    }

    struct Tree(Vec<Node>);

    impl Subject for Node {
        fn tag_name(&self) -> &str {
            self.tag
        }
        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        }
    }

    impl Tree {
        fn matches(&self, sel: &str, idx: usize) -> bool {
            let sel = Selector::parse(sel).unwrap();
            let node = &self.0[idx];
            sel.matches(node, |n| n.parent.map(|p| &self.0[p]))
        }
    }

    fn page() -> Tree {
        Tree(vec![
            Node { tag: "body", attrs: vec![], parent: None },
            Node { tag: "form", attrs: vec![("class", "comment-form")], parent: Some(0) },
            Node {
                tag: "input",
                attrs: vec![("name", "q"), ("required", ""), ("class", "form-control")],
                parent: Some(1),
            },
            Node {
                tag: "img",
                attrs: vec![("class", "lazy  rounded"), ("data-src", "x.png")],
                parent: Some(0),
            },
            Node { tag: "button", attrs: vec![("id", "back-to-top")], parent: Some(0) },
        ])
    }

    #[test]
    fn compound_steps_match() {
        let t = page();
        assert!(t.matches("img.lazy", 3));
        assert!(t.matches(".rounded.lazy", 3));
        assert!(!t.matches("input.lazy", 3));
        assert!(t.matches("#back-to-top", 4));
        assert!(t.matches(r#"input[name="q"]"#, 2));
        assert!(t.matches("input[name=q]", 2));
        assert!(!t.matches(r#"input[name="query"]"#, 2));
        assert!(t.matches("[required]", 2));
        assert!(t.matches("*", 2));
    }

    #[test]
    fn combinators_walk_ancestors() {
        let t = page();
        assert!(t.matches("form [required]", 2));
        assert!(t.matches("body input", 2));
        assert!(t.matches("form > input", 2));
        assert!(!t.matches("body > input", 2));
        assert!(!t.matches("form img", 3));
    }

    #[test]
    fn selector_lists_match_any_alternative() {
        let t = page();
        assert!(t.matches(".toast, img.lazy", 3));
        assert!(!t.matches(".toast, .alert", 3));
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["", "  ", "img.", "[name", "> img", "img >", "a..b", "div[=x]", "#"] {
            assert!(Selector::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
