use quick_xml::Reader;
use quick_xml::events::Event;

/// Text of every `<tag>` element, in document order, at any depth below
/// an element named `parent`.
fn texts_under(xml: &str, parent: &str, tag: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut parent_depth = 0usize;
    let mut in_tag = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == parent.as_bytes() {
                    parent_depth += 1;
                } else if parent_depth > 0 && name.as_ref() == tag.as_bytes() {
                    in_tag = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == parent.as_bytes() {
                    parent_depth = parent_depth.saturating_sub(1);
                } else if name.as_ref() == tag.as_bytes() {
                    in_tag = false;
                }
            }
            Ok(Event::Text(t)) if in_tag => {
                if let Ok(text) = t.unescape() {
                    out.push(text.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed S3 XML");
                break;
            }
            _ => {}
        }
    }
    out
}

/// Bucket names from a `ListAllMyBucketsResult` document.
pub fn parse_bucket_names(xml: &str) -> Vec<String> {
    texts_under(xml, "Bucket", "Name")
}

/// `<Code>` of an S3 `<Error>` document.
pub fn parse_error_code(xml: &str) -> Option<String> {
    texts_under(xml, "Error", "Code").into_iter().next()
}
