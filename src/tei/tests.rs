use std::collections::HashSet;

use super::error::ParseError;
use super::parser::{Diagnostic, TeiParser};
use super::reader::{ParsedDocument, parse_str};
use super::*;
use crate::model::{AttributeMap, Document, Element, ElementChild, Textpart, Token};

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title>Iliad</title>
        <author>Homer</author>
        <respStmt><resp>edited by</resp><name>D. B. Monro</name></respStmt>
      </titleStmt>
      <editionStmt><edition>Oxford &amp; elsewhere</edition></editionStmt>
      <publicationStmt><publisher>Test Publisher</publisher></publicationStmt>
      <sourceDesc><p>Oxford Classical Texts</p></sourceDesc>
    </fileDesc>
  </teiHeader>
  <text>
    <body>
"#;

const FOOTER: &str = r#"
    </body>
  </text>
</TEI>
"#;

const ILIAD_BODY: &str = r#"
      <div type="edition" n="urn:cts:greekLit:tlg0012.tlg001.test-grc1" xml:lang="grc">
        <div type="textpart" subtype="book" n="1">
          <div type="textpart" subtype="card" n="1">
            <l n="1">μῆνιν ἄειδε θεὰ</l>
            <l n="2">καὶ θεὰ καὶ</l>
          </div>
          <div type="textpart" subtype="card" n="2">
            <p>ἄειδε <note type="marginal">θεὰ</note> μῆνιν</p>
          </div>
        </div>
      </div>"#;

const DOC_URN: &str = "urn:cts:greekLit:tlg0012.tlg001.test-grc1";

fn tei(body: &str) -> String {
    format!("{HEADER}{body}{FOOTER}")
}

fn parse(body: &str) -> ParsedDocument {
    let segmenter = UnicodeWordSegmenter::default();
    parse_str(&tei(body), "test.xml", &segmenter).expect("document should parse")
}

fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn collect<'a>(elements: &'a [Element], found: &mut Vec<&'a Element>, tokens: &mut Vec<&'a Token>) {
    for element in elements {
        found.push(element);
        for child in &element.children {
            match child {
                ElementChild::TextRun(run) => tokens.extend(run.tokens.iter()),
                ElementChild::Element(child) => collect(std::slice::from_ref(child), found, tokens),
            }
        }
    }
}

fn textpart_by_urn<'a>(document: &'a Document, urn: &str) -> &'a Textpart {
    document
        .textparts
        .iter()
        .find(|textpart| textpart.urn == urn)
        .unwrap_or_else(|| panic!("missing textpart {urn}"))
}

#[test]
fn single_paragraph_event_stream_produces_expected_urns() {
    let segmenter = UnicodeWordSegmenter::default();
    let mut parser = TeiParser::new(&segmenter);

    parser.open("body", AttributeMap::new());
    parser.open("div", attrs(&[("type", "edition"), ("n", "u"), ("lang", "grc")]));
    parser.open(
        "div",
        attrs(&[("type", "textpart"), ("subtype", "chapter"), ("n", "1")]),
    );
    parser.open("p", AttributeMap::new());
    parser.characters("Test content").unwrap();
    parser.close("p");
    parser.close("div");
    parser.close("div");
    parser.close("body");

    let parsed = parser.finish().unwrap();

    assert_eq!(parsed.urn, "u");
    assert_eq!(parsed.language.as_deref(), Some("grc"));
    assert_eq!(parsed.textparts.len(), 1);
    assert_eq!(parsed.textparts[0].urn, "u:1");
    assert_eq!(parsed.elements.len(), 1);

    let paragraph = &parsed.elements[0];
    assert_eq!(paragraph.tagname, "p");
    assert_eq!(paragraph.urn, "u:1@<p>[0]");
    assert_eq!(paragraph.textpart_urn, "u:1");

    let ElementChild::TextRun(run) = &paragraph.children[0] else {
        panic!("expected a text run");
    };
    assert_eq!(run.tagname, "text_run");
    assert_eq!(run.tokens.len(), 2);
    assert_eq!(run.tokens[0].text, "Test");
    assert_eq!(run.tokens[0].urn, "u:1@Test[1]");
    assert!(run.tokens[0].whitespace);
    assert_eq!(run.tokens[1].text, "content");
    assert_eq!(run.tokens[1].urn, "u:1@content[1]");
    assert!(!run.tokens[1].whitespace);
    assert_eq!(run.tokens[1].position, 1);

    assert!(parsed.diagnostics.is_empty());
    assert!(parsed.unrecognized_tags.is_empty());
}

#[test]
fn single_paragraph_document_matches_event_stream() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="grc">
             <div type="textpart" subtype="chapter" n="1"><p>Test content</p></div>
           </div>"#,
    );
    let document = &parsed.document;

    assert_eq!(document.urn, "u");
    assert_eq!(document.textparts[0].urn, "u:1");
    assert_eq!(document.elements[0].urn, "u:1@<p>[0]");
    assert_eq!(document.counts().tokens, 2);
    assert_eq!(document.textparts[0].tokens.len(), 2);
}

#[test]
fn header_sections_are_captured() {
    let document = parse(ILIAD_BODY).document;

    assert_eq!(document.title.as_deref(), Some("Iliad"));
    assert_eq!(document.author.as_deref(), Some("Homer"));
    assert_eq!(
        document.edition_stmt,
        "<editionStmt><edition>Oxford &amp; elsewhere</edition></editionStmt>"
    );
    assert_eq!(
        document.resp_stmt.as_deref(),
        Some("<respStmt><resp>edited by</resp><name>D. B. Monro</name></respStmt>")
    );
    assert!(document.publication_stmt.is_some());
    assert_eq!(
        document.source_desc,
        "<sourceDesc><p>Oxford Classical Texts</p></sourceDesc>"
    );
    assert_eq!(document.source_file, "test.xml");
}

#[test]
fn missing_required_section_is_fatal() {
    let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
      <teiHeader><fileDesc><editionStmt><p>ed</p></editionStmt></fileDesc></teiHeader>
      <text><body><div type="edition" n="u" xml:lang="la"/></body></text></TEI>"#;

    let segmenter = UnicodeWordSegmenter::default();
    let err = parse_str(xml, "test.xml", &segmenter).unwrap_err();

    assert!(matches!(err, ParseError::MissingSection("sourceDesc")));
}

#[test]
fn missing_edition_urn_is_fatal() {
    let segmenter = UnicodeWordSegmenter::default();
    let err = parse_str(
        &tei(r#"<div type="textpart" n="1"><p>text</p></div>"#),
        "test.xml",
        &segmenter,
    )
    .unwrap_err();

    assert!(matches!(err, ParseError::MissingUrn));
}

#[test]
fn ill_formed_xml_is_fatal() {
    let segmenter = UnicodeWordSegmenter::default();
    let err = parse_str(
        &tei(r#"<div type="edition" n="u" xml:lang="la"><p>open</div>"#),
        "test.xml",
        &segmenter,
    )
    .unwrap_err();

    assert!(matches!(err, ParseError::Xml { .. }));
}

#[test]
fn nested_textparts_inherit_ancestor_locations() {
    let document = parse(ILIAD_BODY).document;

    assert_eq!(document.textpart_labels, vec!["book", "card"]);

    let closing_order: Vec<&str> = document.textparts.iter().map(|t| t.urn.as_str()).collect();
    assert_eq!(
        closing_order,
        vec![
            format!("{DOC_URN}:1.1"),
            format!("{DOC_URN}:1.2"),
            format!("{DOC_URN}:1"),
        ]
    );

    let book = textpart_by_urn(&document, &format!("{DOC_URN}:1"));
    assert_eq!(book.index, 0);
    assert_eq!(book.location, vec!["1"]);

    let card = textpart_by_urn(&document, &format!("{DOC_URN}:1.2"));
    assert_eq!(card.index, 2);
    assert_eq!(card.location, vec!["1", "2"]);
    assert_eq!(card.subtype.as_deref(), Some("card"));
    assert_eq!(card.kind.as_deref(), Some("textpart"));
}

#[test]
fn location_length_matches_nesting_depth() {
    let document = parse(ILIAD_BODY).document;

    for textpart in &document.textparts {
        let expected_depth = if textpart.subtype.as_deref() == Some("book") { 1 } else { 2 };
        assert_eq!(textpart.location.len(), expected_depth, "{}", textpart.urn);
    }
}

#[test]
fn repeated_words_are_numbered_within_their_textpart() {
    let document = parse(ILIAD_BODY).document;
    let mut elements = Vec::new();
    let mut tokens = Vec::new();
    collect(&document.elements, &mut elements, &mut tokens);

    let urns: Vec<&str> = tokens.iter().map(|token| token.urn.as_str()).collect();
    assert_eq!(
        urns,
        vec![
            format!("{DOC_URN}:1.1@μῆνιν[1]"),
            format!("{DOC_URN}:1.1@ἄειδε[1]"),
            format!("{DOC_URN}:1.1@θεὰ[1]"),
            format!("{DOC_URN}:1.1@καὶ[1]"),
            format!("{DOC_URN}:1.1@θεὰ[2]"),
            format!("{DOC_URN}:1.1@καὶ[2]"),
            format!("{DOC_URN}:1.2@ἄειδε[1]"),
            format!("{DOC_URN}:1.2@θεὰ[1]"),
            format!("{DOC_URN}:1.2@μῆνιν[1]"),
        ]
    );

    let card = textpart_by_urn(&document, &format!("{DOC_URN}:1.1"));
    assert_eq!(card.tokens.len(), 6);
    let book = textpart_by_urn(&document, &format!("{DOC_URN}:1"));
    assert!(book.tokens.is_empty());
}

#[test]
fn element_urns_count_same_tag_siblings() {
    let document = parse(ILIAD_BODY).document;
    let mut elements = Vec::new();
    let mut tokens = Vec::new();
    collect(&document.elements, &mut elements, &mut tokens);

    let urns: Vec<&str> = elements.iter().map(|element| element.urn.as_str()).collect();
    assert_eq!(
        urns,
        vec![
            format!("{DOC_URN}:1.1@<l>[0]"),
            format!("{DOC_URN}:1.1@<l>[1]"),
            format!("{DOC_URN}:1.2@<p>[0]"),
            format!("{DOC_URN}:1.2@<note>[0]"),
        ]
    );
    assert_eq!(elements[0].attributes.get("n").map(String::as_str), Some("1"));
}

#[test]
fn nested_elements_are_not_duplicated_at_top_level() {
    let document = parse(ILIAD_BODY).document;

    let top_level: Vec<&str> = document.elements.iter().map(|e| e.tagname.as_str()).collect();
    assert_eq!(top_level, vec!["l", "l", "p"]);

    let paragraph = &document.elements[2];
    assert_eq!(paragraph.children.len(), 3);
    let ElementChild::Element(note) = &paragraph.children[1] else {
        panic!("expected the note between two text runs");
    };
    assert_eq!(note.tagname, "note");
    assert_eq!(note.attributes.get("type").map(String::as_str), Some("marginal"));

    let counts = document.counts();
    assert_eq!(counts.textparts, 3);
    assert_eq!(counts.elements, 4);
    assert_eq!(counts.tokens, 9);
}

#[test]
fn urns_are_unique_within_a_document() {
    let document = parse(ILIAD_BODY).document;
    let mut elements = Vec::new();
    let mut tokens = Vec::new();
    collect(&document.elements, &mut elements, &mut tokens);

    let textpart_urns: HashSet<&str> = document.textparts.iter().map(|t| t.urn.as_str()).collect();
    assert_eq!(textpart_urns.len(), document.textparts.len());

    let element_urns: HashSet<&str> = elements.iter().map(|e| e.urn.as_str()).collect();
    assert_eq!(element_urns.len(), elements.len());

    let token_urns: HashSet<&str> = tokens.iter().map(|t| t.urn.as_str()).collect();
    assert_eq!(token_urns.len(), tokens.len());

    let indices: HashSet<usize> = elements.iter().map(|e| e.index).collect();
    assert_eq!(indices.len(), elements.len());
}

#[test]
fn parsing_is_deterministic() {
    let first = serde_json::to_string_pretty(&parse(ILIAD_BODY).document).unwrap();
    let second = serde_json::to_string_pretty(&parse(ILIAD_BODY).document).unwrap();

    assert_eq!(first, second);
}

#[test]
fn characters_outside_elements_are_discarded_with_a_diagnostic() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" n="1">Loose prose<p>kept words</p></div>
           </div>"#,
    );

    let tokens: Vec<&str> = parsed.document.textparts[0]
        .tokens
        .iter()
        .map(|token| token.text.as_str())
        .collect();
    assert_eq!(tokens, vec!["kept", "words"]);
    assert!(parsed.diagnostics.contains(&Diagnostic::StrayCharacters {
        text: "Loose prose".to_string()
    }));
}

#[test]
fn elements_without_a_textpart_fall_back_or_are_dropped() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <p>orphan text</p>
             <div type="textpart" n="1"><p>inside</p></div>
             <p>after</p>
           </div>"#,
    );
    let document = &parsed.document;

    let urns: Vec<&str> = document.elements.iter().map(|e| e.urn.as_str()).collect();
    assert_eq!(urns, vec!["u:1@<p>[0]", "u:1@<p>[1]"]);
    assert_eq!(document.elements[1].textpart_index, 0);

    assert!(parsed.diagnostics.contains(&Diagnostic::OrphanedElement {
        tagname: "p".to_string()
    }));
    assert!(parsed.diagnostics.contains(&Diagnostic::ElementOutsideTextpart {
        tagname: "p".to_string()
    }));
    assert!(parsed.diagnostics.contains(&Diagnostic::StrayCharacters {
        text: "orphan text".to_string()
    }));
}

#[test]
fn unknown_tags_are_kept_as_elements() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" n="1"><p>alpha <w lemma="beta">beta</w></p></div>
           </div>"#,
    );

    assert!(parsed.unrecognized_tags.contains("w"));
    assert!(parsed.diagnostics.contains(&Diagnostic::UnrecognizedTag {
        tagname: "w".to_string()
    }));

    let paragraph = &parsed.document.elements[0];
    let ElementChild::Element(word) = &paragraph.children[1] else {
        panic!("expected the unknown element as a child");
    };
    assert_eq!(word.tagname, "w");
    assert_eq!(word.urn, "u:1@<w>[0]");
    assert_eq!(word.attributes.get("lemma").map(String::as_str), Some("beta"));
}

#[test]
fn unnumbered_textparts_are_skipped_in_locations() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" subtype="book">
               <div type="textpart" subtype="chapter" n="3"><p>verba</p></div>
             </div>
           </div>"#,
    );

    let chapter = &parsed.document.textparts[0];
    assert_eq!(chapter.location, vec!["3"]);
    assert_eq!(chapter.urn, "u:3");
    assert!(parsed.diagnostics.contains(&Diagnostic::UnnumberedTextpart {
        urn: "u:".to_string()
    }));
}

#[test]
fn entity_references_stay_in_one_text_run() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" n="1"><p>arma &amp; virum</p></div>
           </div>"#,
    );

    let paragraph = &parsed.document.elements[0];
    assert_eq!(paragraph.children.len(), 1);
    let ElementChild::TextRun(run) = &paragraph.children[0] else {
        panic!("expected a text run");
    };
    let words: Vec<&str> = run.tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(words, vec!["arma", "&", "virum"]);
}

fn paragraph_words(parsed: &ParsedDocument) -> Vec<&str> {
    let mut found = Vec::new();
    let mut tokens = Vec::new();
    collect(&parsed.document.elements, &mut found, &mut tokens);
    tokens.iter().map(|token| token.text.as_str()).collect()
}

#[test]
fn comments_and_processing_instructions_split_text() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" n="1"><p>arma<!-- gloss -->virum<?editor note?>cano</p></div>
           </div>"#,
    );

    assert_eq!(paragraph_words(&parsed), vec!["arma", "virum", "cano"]);
    assert_eq!(parsed.document.elements[0].children.len(), 3);
}

#[test]
fn undefined_entities_are_dropped() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="la">
             <div type="textpart" n="1"><p>arma &nbsp; virum&#32;cano&#x21;</p></div>
           </div>"#,
    );

    assert_eq!(paragraph_words(&parsed), vec!["arma", "virum", "cano", "!"]);
}

#[test]
fn textpart_opened_inside_an_element_is_reported() {
    let segmenter = UnicodeWordSegmenter::default();
    let mut parser = TeiParser::new(&segmenter);

    parser.open("body", AttributeMap::new());
    parser.open("div", attrs(&[("type", "edition"), ("n", "u"), ("lang", "la")]));
    parser.open("div", attrs(&[("type", "textpart"), ("n", "1")]));
    parser.open("p", AttributeMap::new());
    parser.characters("alpha").unwrap();
    parser.open("div", attrs(&[("type", "textpart"), ("n", "2")]));
    parser.open("note", AttributeMap::new());
    parser.characters("beta").unwrap();
    parser.close("note");
    parser.close("div");
    parser.close("p");
    parser.close("div");
    parser.close("div");
    parser.close("body");

    let parsed = parser.finish().unwrap();

    assert!(parsed.diagnostics.contains(&Diagnostic::TextpartMismatch {
        element_urn: "u:1.2@<note>[0]".to_string(),
        textpart_urn: "u:1".to_string(),
    }));

    assert_eq!(parsed.elements.len(), 1);
    let paragraph = &parsed.elements[0];
    assert_eq!(paragraph.urn, "u:1@<p>[0]");
    assert_eq!(paragraph.textpart_index, 0);

    let ElementChild::Element(note) = &paragraph.children[1] else {
        panic!("expected the note to stay under the paragraph");
    };
    assert_eq!(note.tagname, "note");
    assert_eq!(note.textpart_index, 1);
    assert_eq!(note.textpart_urn, "u:1.2");
}

#[test]
fn element_closed_in_another_textpart_is_reported() {
    let segmenter = UnicodeWordSegmenter::default();
    let mut parser = TeiParser::new(&segmenter);

    parser.open("div", attrs(&[("type", "edition"), ("n", "u"), ("lang", "la")]));
    parser.open("div", attrs(&[("type", "textpart"), ("n", "1")]));
    parser.open("p", AttributeMap::new());
    parser.open("div", attrs(&[("type", "textpart"), ("n", "2")]));
    parser.close("p");
    parser.close("div");
    parser.close("div");
    parser.close("div");

    let parsed = parser.finish().unwrap();

    assert!(parsed.diagnostics.contains(&Diagnostic::TextpartMismatch {
        element_urn: "u:1@<p>[0]".to_string(),
        textpart_urn: "u:1.2".to_string(),
    }));
    assert_eq!(parsed.elements.len(), 1);
}

#[test]
fn truncated_stream_is_closed_by_finish() {
    let segmenter = UnicodeWordSegmenter::default();
    let mut parser = TeiParser::new(&segmenter);

    parser.open("body", AttributeMap::new());
    parser.open("div", attrs(&[("type", "edition"), ("n", "u"), ("lang", "la")]));
    parser.open("div", attrs(&[("type", "textpart"), ("n", "1")]));
    parser.open("p", AttributeMap::new());
    parser.characters("arma virumque").unwrap();

    let parsed = parser.finish().unwrap();

    assert!(parsed.diagnostics.contains(&Diagnostic::UnclosedAtEnd {
        elements: 1,
        textparts: 1,
    }));
    assert_eq!(parsed.textparts.len(), 1);
    assert_eq!(parsed.textparts[0].tokens.len(), 2);
    assert_eq!(parsed.elements.len(), 1);
    assert_eq!(parsed.elements[0].urn, "u:1@<p>[0]");
}

#[test]
fn stray_close_events_are_reported_and_ignored() {
    let segmenter = UnicodeWordSegmenter::default();
    let mut parser = TeiParser::new(&segmenter);

    parser.open("div", attrs(&[("type", "edition"), ("n", "u"), ("lang", "la")]));
    parser.open("div", attrs(&[("type", "textpart"), ("n", "1")]));
    parser.close("p");
    parser.open("p", AttributeMap::new());
    parser.characters("verba").unwrap();
    parser.close("p");
    parser.close("div");
    parser.close("div");
    parser.close("div");

    let parsed = parser.finish().unwrap();

    assert!(parsed.diagnostics.contains(&Diagnostic::UnbalancedClose {
        tagname: "p".to_string(),
    }));
    assert!(parsed.diagnostics.contains(&Diagnostic::UnbalancedClose {
        tagname: "div".to_string(),
    }));
    assert_eq!(parsed.elements.len(), 1);
    assert_eq!(parsed.elements[0].urn, "u:1@<p>[0]");
    assert_eq!(parsed.textparts.len(), 1);
}

#[test]
fn unsupported_language_yields_no_tokens() {
    let parsed = parse(
        r#"<div type="edition" n="u" xml:lang="eng">
             <div type="textpart" n="1"><p>Sing, goddess</p></div>
           </div>"#,
    );

    assert_eq!(parsed.document.counts().elements, 1);
    assert_eq!(parsed.document.counts().tokens, 0);
}

#[test]
fn word_segmenter_marks_trailing_whitespace() {
    let segmenter = UnicodeWordSegmenter::default();
    let segments = segmenter.segment("la", "Gallia est omnis divisa.").unwrap();

    let pairs: Vec<(&str, bool)> = segments
        .iter()
        .map(|s| (s.text.as_str(), s.whitespace_after))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Gallia", true),
            ("est", true),
            ("omnis", true),
            ("divisa", false),
            (".", false),
        ]
    );
    assert!(segmenter.segment("eng", "Gallia").unwrap().is_empty());
}

#[test]
fn locations_skip_unnumbered_ancestors() {
    let location = urn::location_of([Some("1"), None, Some("4")], Some("2"));
    assert_eq!(location, vec!["1", "4", "2"]);
    assert_eq!(urn::textpart_urn("u", &location), "u:1.4.2");
    assert_eq!(urn::element_urn("u:1", "lb", 3), "u:1@<lb>[3]");
    assert_eq!(urn::token_urn("u:1", "arma", 0), "u:1@arma[1]");
}

fn textpart(index: usize, subtype: &str, n: &str) -> Textpart {
    Textpart {
        index,
        location: vec![n.to_string()],
        n: Some(n.to_string()),
        subtype: Some(subtype.to_string()),
        kind: Some("textpart".to_string()),
        urn: format!("u:{subtype}{n}"),
        attributes: AttributeMap::new(),
        tokens: Vec::new(),
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn sections_nest_under_their_chapter_in_document_order() {
    let textparts = vec![
        textpart(1, "section", "1"),
        textpart(2, "section", "2"),
        textpart(0, "chapter", "1"),
        textpart(4, "section", "3"),
        textpart(3, "chapter", "2"),
    ];

    let toc = table_of_contents(&textparts, &labels(&["chapter", "section"]));

    assert_eq!(toc.len(), 2);
    assert_eq!(toc[0].label, "Chapter 1");
    let children: Vec<&str> = toc[0].subpassages.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(children, vec!["Section 1", "Section 2"]);
    assert_eq!(toc[1].label, "Chapter 2");
    assert_eq!(toc[1].subpassages.len(), 1);
    assert_eq!(toc[1].subpassages[0].urn, "u:section3");
}

#[test]
fn single_subtype_gives_a_flat_table_of_contents() {
    let textparts = vec![textpart(0, "chapter", "1"), textpart(1, "chapter", "2")];

    let toc = table_of_contents(&textparts, &labels(&["chapter"]));

    assert_eq!(toc.len(), 2);
    assert!(toc.iter().all(|entry| entry.subpassages.is_empty()));
}

#[test]
fn rank_follows_first_appearance_not_name() {
    let textparts = vec![textpart(1, "alpha", "1"), textpart(0, "zeta", "1")];

    let toc = table_of_contents(&textparts, &labels(&["zeta", "alpha"]));

    assert_eq!(toc.len(), 1);
    assert_eq!(toc[0].label, "Zeta 1");
    assert_eq!(toc[0].subpassages[0].label, "Alpha 1");
}

#[test]
fn non_textpart_divisions_are_left_out_of_the_table_of_contents() {
    let mut other = textpart(1, "chapter", "9");
    other.kind = Some("commentary".to_string());
    let textparts = vec![textpart(0, "chapter", "1"), other];

    let toc = table_of_contents(&textparts, &labels(&["chapter"]));

    assert_eq!(toc.len(), 1);
    assert_eq!(toc[0].n.as_deref(), Some("1"));
}

#[test]
fn table_of_contents_from_parsed_document() {
    let document = parse(ILIAD_BODY).document;

    let toc = table_of_contents(&document.textparts, &document.textpart_labels);

    assert_eq!(toc.len(), 1);
    assert_eq!(toc[0].label, "Book 1");
    let cards: Vec<&str> = toc[0].subpassages.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(cards, vec!["Card 1", "Card 2"]);
}
