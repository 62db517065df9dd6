//! S4 — SigV4 clock skew rejection (`spec.md` §8).

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use http::{Method, StatusCode};

    use crate::{signed_request, Harness};

    #[tokio::test]
    async fn test_should_reject_request_signed_too_far_in_the_past() {
        let harness = Harness::new();
        let skewed = Utc::now() - Duration::minutes(20);

        let req = signed_request(Method::GET, "/b1/hello", "", &[], b"", skewed);
        let resp = harness.send(req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(crate::read_body(&resp).contains("RequestTimeTooSkewed"));
    }

    #[tokio::test]
    async fn test_should_accept_request_within_skew_tolerance() {
        let harness = Harness::new();
        let now = Utc::now();
        harness.send(signed_request(Method::PUT, "/b1", "", &[], b"", now)).await;

        let slightly_stale = now - Duration::minutes(5);
        let req = signed_request(Method::GET, "/b1", "location", &[], b"", slightly_stale);
        let resp = harness.send(req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }
}
