//! `CopyObjectResult` XML body.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlError;
use crate::listing::S3_NAMESPACE;

/// Serialize the response body for a successful `PUT` with
/// `x-amz-copy-source`.
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn copy_object_result(etag: &str, last_modified: DateTime<Utc>) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(192);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element("CopyObjectResult")
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w: &mut Writer<&mut Vec<u8>>| {
            w.create_element("LastModified")
                .write_text_content(BytesText::new(&last_modified.to_rfc3339_opts(SecondsFormat::Millis, true)))?;
            w.create_element("ETag").write_text_content(BytesText::new(&format!("\"{etag}\"")))?;
            Ok(())
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_should_render_copy_object_result() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let xml = String::from_utf8(copy_object_result("abc123", ts).unwrap()).unwrap();
        assert!(xml.contains("<ETag>\"abc123\"</ETag>"));
        assert!(xml.contains("<LastModified>2024-01-02T03:04:05.000Z</LastModified>"));
    }
}
