//! Just enough CSS for the selectors the driver uses: tags, classes, attribute presence,
//! equality and substring, the descendant combinator and selector lists.

use anyhow::{anyhow, ensure};

#[derive(Clone, Debug, Eq, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

/// Compounds from the outermost ancestor to the element itself
pub type Complex = Vec<Compound>;

pub trait Element {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl Compound {
    pub fn matches(&self, e: &dyn Element) -> bool {
        if let Some(tag) = &self.tag {
            if !e.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        let classes = e.attr("class").unwrap_or("");
        if !self
            .classes
            .iter()
            .all(|c| classes.split_whitespace().any(|have| have == c))
        {
            return false;
        }
        self.attrs.iter().all(|(name, op)| match (e.attr(name), op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals(want)) => v == want,
            (Some(v), AttrOp::Contains(want)) => !want.is_empty() && v.contains(want.as_str()),
        })
    }
}

pub fn parse(selector: &str) -> anyhow::Result<Vec<Complex>> {
    split_outside_brackets(selector, |c| c == ',')
        .into_iter()
        .map(|complex| {
            let compounds = split_outside_brackets(complex, char::is_whitespace)
                .into_iter()
                .filter(|c| !c.is_empty())
                .map(parse_compound)
                .collect::<anyhow::Result<Complex>>()?;
            ensure!(!compounds.is_empty(), "empty selector in {selector:?}");
            Ok(compounds)
        })
        .collect()
}

fn split_outside_brackets(s: &str, is_sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut res = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            c if depth == 0 && !quoted && is_sep(c) => {
                res.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => (),
        }
    }
    res.push(s[start..].trim());
    res
}

fn parse_compound(s: &str) -> anyhow::Result<Compound> {
    let mut res = Compound::default();
    let mut rest = s;
    let tag_len = rest
        .find(|c: char| c == '.' || c == '[')
        .unwrap_or(rest.len());
    match &rest[..tag_len] {
        "" | "*" => (),
        tag => {
            ensure!(
                tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
                "unsupported selector syntax {tag:?}"
            );
            res.tag = Some(String::from(tag));
        }
    }
    rest = &rest[tag_len..];

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let len = after
                .find(|c: char| c == '.' || c == '[')
                .unwrap_or(after.len());
            ensure!(len > 0, "empty class name in {s:?}");
            res.classes.push(String::from(&after[..len]));
            rest = &after[len..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| anyhow!("unterminated attribute selector in {s:?}"))?;
            res.attrs.push(parse_attr(&after[..end])?);
            rest = &after[end + 1..];
        } else {
            return Err(anyhow!("unsupported selector syntax {rest:?}"));
        }
    }
    Ok(res)
}

fn parse_attr(s: &str) -> anyhow::Result<(String, AttrOp)> {
    let unquote = |v: &str| String::from(v.trim().trim_matches('"'));
    if let Some((name, value)) = s.split_once("*=") {
        Ok((String::from(name.trim()), AttrOp::Contains(unquote(value))))
    } else if let Some((name, value)) = s.split_once('=') {
        Ok((String::from(name.trim()), AttrOp::Equals(unquote(value))))
    } else {
        ensure!(!s.trim().is_empty(), "empty attribute selector");
        Ok((String::from(s.trim()), AttrOp::Exists))
    }
}
