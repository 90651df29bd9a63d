use std::collections::HashMap;

pub fn location_of<'a, I>(open_ns: I, own_n: Option<&str>) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut location: Vec<String> = open_ns
        .into_iter()
        .flatten()
        .map(ToOwned::to_owned)
        .collect();

    if let Some(n) = own_n {
        location.push(n.to_string());
    }

    location
}

pub fn textpart_urn(document_urn: &str, location: &[String]) -> String {
    format!("{}:{}", document_urn, location.join("."))
}

// `prior_same_tag` is zero for the first `<tag>` of a textpart.
pub fn element_urn(textpart_urn: &str, tagname: &str, prior_same_tag: usize) -> String {
    format!("{textpart_urn}@<{tagname}>[{prior_same_tag}]")
}

// One-based: the first "μῆνιν" of a textpart is `@μῆνιν[1]`.
pub fn token_urn(textpart_urn: &str, text: &str, prior_same_text: usize) -> String {
    format!("{}@{}[{}]", textpart_urn, text, prior_same_text + 1)
}

#[derive(Debug, Default)]
pub struct OccurrenceCounter {
    seen: HashMap<String, HashMap<String, usize>>,
}

impl OccurrenceCounter {
    pub fn next(&mut self, scope: &str, name: &str) -> usize {
        let names = self.seen.entry(scope.to_string()).or_default();
        let count = names.entry(name.to_string()).or_insert(0);
        let prior = *count;
        *count += 1;
        prior
    }
}
