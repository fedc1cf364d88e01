//! Locale-friendly sort keys for directory listings.
//!
//! A [`CollateKey`] is computed once per leaf name and compared many times
//! while a listing is sorted, so the expensive part (case folding and
//! digit-run extraction) happens up front. Ordering rules: hidden entries
//! (leading dot) group first, comparison ignores case, and digit runs
//! compare by numeric value so `file9` sorts before `file10`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Number(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateKey {
    hidden: bool,
    segments: Vec<Segment>,
    /// The original leaf name, kept as a tiebreak so distinct names never
    /// compare equal and sorting stays total.
    source: String,
}

impl CollateKey {
    pub fn new(leafname: &str) -> Self {
        let hidden = leafname.starts_with('.');
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = leafname.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                let mut value: u64 = 0;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                    value = value.saturating_mul(10).saturating_add(d as u64);
                    chars.next();
                }
                segments.push(Segment::Number(value));
            } else {
                text.extend(c.to_lowercase());
                chars.next();
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self {
            hidden,
            segments,
            source: leafname.to_string(),
        }
    }
}

impl Ord for CollateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Hidden entries first.
        match (self.hidden, other.hidden) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        for pair in self.segments.iter().zip(other.segments.iter()) {
            let ord = match pair {
                (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
                (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
                // Digits sort before letters, as in a plain byte compare.
                (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
                (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.segments
            .len()
            .cmp(&other.segments.len())
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for CollateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
