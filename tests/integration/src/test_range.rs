//! S2 — ranged GET (`spec.md` §8).

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;
    use http::{Method, StatusCode};

    use crate::{signed_request, Harness};

    #[tokio::test]
    async fn test_should_return_partial_content_for_range_header() {
        let harness = Harness::new();
        let now = Utc::now();

        harness.send(signed_request(Method::PUT, "/b1", "", &[], b"", now)).await;
        harness
            .send(signed_request(Method::PUT, "/b1/k", "", &[], b"0123456789", now))
            .await;

        let get = signed_request(Method::GET, "/b1/k", "", &[("range", "bytes=2-5")], b"", now);
        let mut resp = harness.send(get).await;

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers().get(http::header::CONTENT_RANGE).unwrap(), "bytes 2-5/10");
        assert_eq!(resp.headers().get(http::header::CONTENT_LENGTH).unwrap(), "4");
        assert_eq!(std::mem::take(resp.body_mut()), Bytes::from_static(b"2345"));
    }

    #[tokio::test]
    async fn test_should_fall_back_to_full_read_for_invalid_range() {
        let harness = Harness::new();
        let now = Utc::now();

        harness.send(signed_request(Method::PUT, "/b1", "", &[], b"", now)).await;
        harness
            .send(signed_request(Method::PUT, "/b1/k", "", &[], b"0123456789", now))
            .await;

        let get = signed_request(Method::GET, "/b1/k", "", &[("range", "bytes=9000-9001")], b"", now);
        let mut resp = harness.send(get).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(std::mem::take(resp.body_mut()), Bytes::from_static(b"0123456789"));
    }
}
