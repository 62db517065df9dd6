//! S6 — path traversal safety (`spec.md` §8).

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use http::{Method, StatusCode};

    use crate::{signed_request, Harness};

    #[tokio::test]
    async fn test_should_not_escape_bucket_directory_via_dotdot_segments() {
        let harness = Harness::new();
        let now = Utc::now();
        harness.send(signed_request(Method::PUT, "/b", "", &[], b"", now)).await;

        let outside = std::path::Path::new(&harness.dispatcher.config.storage_root).join("canary.txt");
        std::fs::write(&outside, b"do not read me").expect("writes canary file outside the bucket tree");

        let req = signed_request(Method::GET, "/b/../../../etc/passwd", "versionId=../../../etc/passwd", &[], b"", now);
        let resp = harness.send(req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = crate::read_body(&resp);
        assert!(!body.contains("do not read me"));
        assert!(std::fs::read(&outside).expect("canary file untouched").starts_with(b"do not read me"));
    }
}
