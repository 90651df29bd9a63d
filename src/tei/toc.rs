use serde::Serialize;

use crate::model::Textpart;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub label: String,
    pub urn: String,
    pub subtype: Option<String>,
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subpassages: Vec<TocEntry>,
}

pub fn table_of_contents(textparts: &[Textpart], labels: &[String]) -> Vec<TocEntry> {
    let entries: Vec<TocEntry> = textparts
        .iter()
        .filter(|textpart| textpart.kind.as_deref() == Some("textpart"))
        .map(entry_for)
        .collect();

    if labels.len() <= 1 {
        return entries;
    }

    nest(entries, labels)
}

fn entry_for(textpart: &Textpart) -> TocEntry {
    let subtype = textpart.subtype.as_deref().map(capitalize).unwrap_or_default();
    let label = format!("{} {}", subtype, textpart.n.as_deref().unwrap_or_default())
        .trim()
        .to_string();

    TocEntry {
        label,
        urn: textpart.urn.clone(),
        subtype: textpart.subtype.clone(),
        n: textpart.n.clone(),
        subpassages: Vec::new(),
    }
}

// Textparts arrive in closing order, so children precede their parent.
fn nest(entries: Vec<TocEntry>, labels: &[String]) -> Vec<TocEntry> {
    let mut stack: Vec<(usize, TocEntry)> = Vec::new();

    for mut entry in entries {
        let rank = entry
            .subtype
            .as_ref()
            .and_then(|subtype| labels.iter().position(|label| label == subtype))
            .unwrap_or(labels.len());

        let mut children = Vec::new();
        while stack.last().is_some_and(|(top_rank, _)| *top_rank > rank) {
            if let Some((_, child)) = stack.pop() {
                children.push(child);
            }
        }

        if !children.is_empty() {
            children.reverse();
            entry.subpassages = children;
        }

        stack.push((rank, entry));
    }

    stack.into_iter().map(|(_, entry)| entry).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
