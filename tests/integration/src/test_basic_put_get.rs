//! S1 — basic PUT/GET round trip (`spec.md` §8).

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;
    use http::{Method, StatusCode};

    use crate::{signed_request, Harness};

    #[tokio::test]
    async fn test_should_put_then_get_object_with_matching_etag() {
        let harness = Harness::new();
        let now = Utc::now();

        let create_bucket = signed_request(Method::PUT, "/b1", "", &[], b"", now);
        let resp = harness.send(create_bucket).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let put = signed_request(Method::PUT, "/b1/hello", "", &[("content-type", "text/plain")], b"Hi", now);
        let resp = harness.send(put).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp.headers().get(http::header::ETAG).unwrap().to_str().unwrap().to_owned();
        assert_eq!(etag, "\"c1a5298f939e87e8f962a5edfc206918\"");

        let get = signed_request(Method::GET, "/b1/hello", "", &[], b"", now);
        let mut resp = harness.send(get).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(http::header::ETAG).unwrap().to_str().unwrap(), etag);
        assert_eq!(std::mem::take(resp.body_mut()), Bytes::from_static(b"Hi"));
    }

    #[tokio::test]
    async fn test_should_return_no_such_key_for_missing_object() {
        let harness = Harness::new();
        let now = Utc::now();

        harness.send(signed_request(Method::PUT, "/b1", "", &[], b"", now)).await;

        let get = signed_request(Method::GET, "/b1/missing", "", &[], b"", now);
        let resp = harness.send(get).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = crate::read_body(&resp);
        assert!(body.contains("NoSuchKey"));
    }
}
