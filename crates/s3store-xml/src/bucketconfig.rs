//! `VersioningConfiguration` and `LocationConstraint` XML bodies.

use std::io::{self, Write};

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlError;
use crate::listing::S3_NAMESPACE;

/// Serialize `GetBucketVersioning`: `<Status>` is omitted entirely when
/// `status` is `None` (the bucket has never had versioning enabled).
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn versioning_configuration(status: Option<&str>) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(192);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element("VersioningConfiguration")
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w: &mut Writer<&mut Vec<u8>>| {
            if let Some(status) = status {
                write_text(w, "Status", status)?;
            }
            Ok(())
        })?;
    Ok(buf)
}

/// Parse a `PutBucketVersioning` request body, returning the raw
/// `<Status>` text (validated against known values by the caller).
///
/// # Errors
///
/// [`XmlError::MissingElement`] if no `<Status>` element is present.
pub fn parse_versioning_configuration(body: &[u8]) -> Result<String, XmlError> {
    use quick_xml::events::Event as Ev;
    use quick_xml::reader::Reader;

    let mut reader = Reader::from_reader(body);
    let mut in_status = false;
    let mut status = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Ev::Start(e) if e.name().as_ref() == b"Status" => in_status = true,
            Ev::Text(t) if in_status => {
                status = Some(t.decode()?.into_owned());
            }
            Ev::End(e) if e.name().as_ref() == b"Status" => in_status = false,
            Ev::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    status.ok_or_else(|| XmlError::MissingElement("Status".to_owned()))
}

/// Serialize `GetBucketLocation`. This service is single-region, so the
/// constraint is always the configured region.
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn location_constraint(region: &str) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(128);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element("LocationConstraint")
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_text_content(BytesText::new(region))?;
    Ok(buf)
}

fn write_text<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer.create_element(tag).write_text_content(BytesText::new(text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_omit_status_element_when_disabled() {
        let xml = String::from_utf8(versioning_configuration(None).unwrap()).unwrap();
        assert!(!xml.contains("<Status>"));
        assert!(xml.contains("<VersioningConfiguration"));
    }

    #[test]
    fn test_should_render_enabled_status() {
        let xml = String::from_utf8(versioning_configuration(Some("Enabled")).unwrap()).unwrap();
        assert!(xml.contains("<Status>Enabled</Status>"));
    }

    #[test]
    fn test_should_parse_versioning_configuration_body() {
        let body = b"<VersioningConfiguration><Status>Suspended</Status></VersioningConfiguration>";
        assert_eq!(parse_versioning_configuration(body).unwrap(), "Suspended");
    }

    #[test]
    fn test_should_reject_missing_status_element() {
        let body = b"<VersioningConfiguration></VersioningConfiguration>";
        assert!(parse_versioning_configuration(body).is_err());
    }

    #[test]
    fn test_should_render_location_constraint() {
        let xml = String::from_utf8(location_constraint("us-east-1").unwrap()).unwrap();
        assert!(xml.contains("<LocationConstraint"));
        assert!(xml.contains("us-east-1"));
    }
}
