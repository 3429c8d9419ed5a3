use crate::records::Hint;

/// Sorts hints by `(term, query)`
pub fn sort_hints(hints: &mut [Hint]) {
    hints.sort_by(|a, b| a.term.cmp(&b.term).then_with(|| a.query.cmp(&b.query)));
}

/// Collapses each run of equal terms to its highest-priority hint
///
/// Expects input sorted by [`sort_hints`]. On a priority tie the earliest
/// hint of the run wins.
pub fn uniq(sorted: &[Hint]) -> Vec<Hint> {
    let mut out = Vec::new();
    let mut iter = sorted.iter();
    let Some(mut held) = iter.next() else {
        return out;
    };

    for hint in iter {
        if hint.term != held.term {
            out.push(held.clone());
            held = hint;
        } else if hint.priority > held.priority {
            held = hint;
        }
    }
    out.push(held.clone());
    out
}

/// Collapses each term to the most specific queries that found it
///
/// Expects input sorted by [`sort_hints`]. Within a term, the held hint is
/// replaced as long as the next query extends the held one; a query that
/// does not extend it starts a new hold.
pub fn leaf(sorted: &[Hint]) -> Vec<Hint> {
    let mut out = Vec::new();
    let mut iter = sorted.iter();
    let Some(mut held) = iter.next() else {
        return out;
    };

    for hint in iter {
        let extends = hint.term == held.term && hint.query.starts_with(held.query.as_str());
        if !extends {
            out.push(held.clone());
        }
        held = hint;
    }
    out.push(held.clone());
    out
}

/// Terms of the hints whose priority reaches `min_priority`, in input order
pub fn terms(hints: &[Hint], min_priority: i16) -> impl Iterator<Item = &str> {
    hints
        .iter()
        .filter(move |hint| hint.priority >= min_priority)
        .map(|hint| hint.term.as_str())
}
