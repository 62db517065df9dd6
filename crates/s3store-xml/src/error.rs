//! S3 error XML formatting and the crate's own error type.

use std::io;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

/// Errors that can occur while serializing or deserializing S3 XML bodies.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("a required XML element was missing: {0}")]
    MissingElement(String),

    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// Format an S3 error response body: a flat `<Error>` element, no outer
/// wrapper (S3's RestXml protocol uses `noErrorWrapping`).
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchBucket</Code>
///   <Message>The specified bucket does not exist</Message>
///   <Resource>/mybucket</Resource>
///   <RequestId>...</RequestId>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(code: &str, message: &str, resource: Option<&str>, request_id: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(err) = write_error_xml(&mut buf, code, message, resource, request_id) {
        tracing::error!(error = %err, "failed to serialize S3 error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(
    buf: &mut Vec<u8>,
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: &str,
) -> io::Result<()> {
    let mut writer = Writer::new(buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code").write_text_content(BytesText::new(code))?;
        w.create_element("Message").write_text_content(BytesText::new(message))?;
        if let Some(resource) = resource {
            w.create_element("Resource").write_text_content(BytesText::new(resource))?;
        }
        w.create_element("RequestId").write_text_content(BytesText::new(request_id))?;
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_error_with_resource() {
        let xml = error_to_xml("NoSuchBucket", "The specified bucket does not exist", Some("/mybucket"), "tx000001");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        assert!(xml_str.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml_str.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml_str.contains("<Resource>/mybucket</Resource>"));
        assert!(xml_str.contains("<RequestId>tx000001</RequestId>"));
    }

    #[test]
    fn test_should_format_error_without_resource() {
        let xml = error_to_xml("InternalError", "Internal server error", None, "tx000002");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        assert!(!xml_str.contains("<Resource>"));
    }

    #[test]
    fn test_should_escape_special_characters() {
        let xml = error_to_xml("InvalidArgument", "Value must be < 1024 & > 0", Some("/my&bucket"), "tx000003");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        assert!(xml_str.contains("Value must be &lt; 1024 &amp; &gt; 0"));
        assert!(xml_str.contains("/my&amp;bucket"));
    }
}
