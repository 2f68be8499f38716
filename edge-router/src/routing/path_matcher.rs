/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! URL template compilation and matching for the REST listener.

use crate::error::RouterError;
use regex::Regex;
use std::cmp::Ordering;

/// Character class a `{placeholder}` segment expands to.
pub const PLACEHOLDER_CLASS: &str = "[-A-Za-z0-9+&@#%?=~_|!:,.;]+";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

impl Segment {
    fn parse(template: &str, raw: &str) -> Result<Self, RouterError> {
        let invalid = |reason: &str| RouterError::InvalidPathTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("empty segment"));
        }

        let opens = raw.matches('{').count();
        let closes = raw.matches('}').count();
        if opens == 0 && closes == 0 {
            return Ok(Segment::Literal(raw.to_string()));
        }

        match raw.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            Some(name) if opens == 1 && closes == 1 && !name.is_empty() => {
                Ok(Segment::Placeholder(name.to_string()))
            }
            _ => Err(invalid("unbalanced placeholder braces")),
        }
    }

    fn is_placeholder(&self) -> bool {
        matches!(self, Segment::Placeholder(_))
    }
}

/// A compiled `/seg/{name}/seg` template.
#[derive(Clone, Debug)]
pub struct PathTemplate {
    template: String,
    segments: Vec<Segment>,
    regex: Regex,
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, RouterError> {
        let invalid = |reason: &str| RouterError::InvalidPathTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let body = template
            .strip_prefix('/')
            .ok_or_else(|| invalid("template must start with '/'"))?;
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return Err(invalid("template has no segments"));
        }

        let segments = body
            .split('/')
            .map(|raw| Segment::parse(template, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut pattern = String::from("^");
        for segment in &segments {
            pattern.push('/');
            match segment {
                Segment::Literal(literal) => pattern.push_str(&regex::escape(literal)),
                Segment::Placeholder(_) => {
                    pattern.push('(');
                    pattern.push_str(PLACEHOLDER_CLASS);
                    pattern.push(')');
                }
            }
        }
        pattern.push_str("/?$");

        let regex = Regex::new(&pattern).map_err(|err| invalid(&err.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            segments,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Placeholder values of a matching `path`, in template order.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(path)?;
        Some(
            captures
                .iter()
                .skip(1)
                .flatten()
                .map(|value| value.as_str().to_string())
                .collect(),
        )
    }

    /// Segment-wise equality where two placeholders are interchangeable.
    pub fn contains(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(left, right)| {
                    left == right || (left.is_placeholder() && right.is_placeholder())
                })
    }

    fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_placeholder()).count()
    }

    /// Specificity order: more literals, then more segments, then template text.
    fn specificity_cmp(&self, other: &PathTemplate) -> Ordering {
        other
            .literal_count()
            .cmp(&self.literal_count())
            .then_with(|| other.segments.len().cmp(&self.segments.len()))
            .then_with(|| self.template.cmp(&other.template))
    }
}

/// Matches `path` against an uncompiled template; invalid templates never match.
pub fn is_match(template: &str, path: &str) -> bool {
    PathTemplate::compile(template)
        .map(|compiled| compiled.is_match(path))
        .unwrap_or(false)
}

/// String form of [`PathTemplate::contains`]; invalid templates are never contained.
pub fn contains(a: &str, b: &str) -> bool {
    match (PathTemplate::compile(a), PathTemplate::compile(b)) {
        (Ok(a), Ok(b)) => a.contains(&b),
        _ => false,
    }
}

/// Picks the most specific template among `candidates` that match `path`.
///
/// Candidates equivalent to another candidate are set aside first; when that
/// leaves nothing, every match competes. The winner is the minimum under
/// literal count, segment count and template text, so the choice does not
/// depend on iteration order.
pub fn select<'a, I>(candidates: I, path: &str) -> Option<&'a PathTemplate>
where
    I: IntoIterator<Item = &'a PathTemplate>,
{
    let matching: Vec<&PathTemplate> = candidates
        .into_iter()
        .filter(|candidate| candidate.is_match(path))
        .collect();

    let distinct: Vec<&PathTemplate> = matching
        .iter()
        .copied()
        .filter(|candidate| {
            !matching.iter().any(|other| {
                other.as_str() != candidate.as_str() && other.contains(candidate)
            })
        })
        .collect();

    let pool = if distinct.is_empty() {
        matching
    } else {
        distinct
    };

    pool.into_iter().min_by(|a, b| a.specificity_cmp(b))
}
