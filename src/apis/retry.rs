use std::time::Duration;

use reqwest::StatusCode;

/// Bounded retry with linear backoff, applied per candidate URL.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    async fn backoff(&self, attempt: u32) {
        if attempt < self.max_attempts {
            let delay = self.delay(attempt);
            tracing::info!("Retrying after {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

/// GET each candidate URL in order, retrying per `policy`, and return the first
/// non-empty parse. 503s and transport errors back off before the next attempt;
/// other statuses move straight on. Exhausting every candidate yields an empty list.
pub async fn fetch_with_failover<T, F>(
    client: &reqwest::Client,
    urls: &[String],
    policy: &RetryPolicy,
    parse: F,
) -> Vec<T>
where
    F: Fn(&str) -> Vec<T>,
{
    for url in urls {
        for attempt in 1..=policy.max_attempts {
            tracing::debug!(
                "Fetching (attempt {}/{}): {}",
                attempt,
                policy.max_attempts,
                url
            );
            match client.get(url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => match resp.text().await {
                    Ok(body) => {
                        let items = parse(&body);
                        if !items.is_empty() {
                            return items;
                        }
                        tracing::warn!("Empty result from {}", url);
                    }
                    Err(e) => {
                        tracing::warn!("Failed reading body from {}: {}", url, e);
                        policy.backoff(attempt).await;
                    }
                },
                Ok(resp) if resp.status() == StatusCode::SERVICE_UNAVAILABLE => {
                    tracing::warn!("{} returned 503", url);
                    policy.backoff(attempt).await;
                }
                Ok(resp) => {
                    tracing::warn!("{} returned {}", url, resp.status());
                }
                Err(e) => {
                    tracing::warn!("Failed with {}: {}", url, e);
                    policy.backoff(attempt).await;
                }
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn lines(body: &str) -> Vec<String> {
        body.lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_delay_scales_with_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(800));
        assert_eq!(policy.delay(3), Duration::from_millis(2400));
    }

    #[tokio::test]
    async fn test_fails_over_to_second_url() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/first")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/second")
            .with_status(200)
            .with_body("a\nb\n")
            .expect(1)
            .create_async()
            .await;

        let urls = vec![
            format!("{}/first", server.url()),
            format!("{}/second", server.url()),
        ];
        let client = reqwest::Client::new();
        let got = fetch_with_failover(&client, &urls, &fast_policy(), lines).await;

        assert_eq!(got, vec!["a", "b"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_other_statuses_retry_without_delay() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let urls = vec![format!("{}/feed", server.url())];
        let client = reqwest::Client::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_secs(5),
        };
        let start = Instant::now();
        let got = fetch_with_failover(&client, &urls, &policy, lines).await;

        assert!(got.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_ok_body_keeps_trying() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("")
            .expect(3)
            .create_async()
            .await;

        let urls = vec![format!("{}/feed", server.url())];
        let client = reqwest::Client::new();
        let got = fetch_with_failover(&client, &urls, &fast_policy(), lines).await;

        assert!(got.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_errors_exhaust_to_empty() {
        // Nothing listens on port 9 of the loopback interface.
        let urls = vec!["http://127.0.0.1:9/a".to_string()];
        let client = reqwest::Client::new();
        let got = fetch_with_failover(&client, &urls, &fast_policy(), lines).await;
        assert!(got.is_empty());
    }
}
