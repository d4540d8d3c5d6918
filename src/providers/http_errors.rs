use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

/// Attaches the endpoint to a transport failure. The `reqwest::Error` stays
/// the root of the returned error so callers see exactly what the client saw.
pub(crate) fn completion_request_error(err: reqwest::Error, api_url: &str) -> anyhow::Error {
    let context = if err.is_connect() && error_chain_has_connection_refused(&err) {
        format!("Connection refused by chat completion endpoint '{api_url}'")
    } else if err.is_connect() {
        format!("Failed to connect to chat completion endpoint '{api_url}'")
    } else {
        format!("Failed to call chat completion endpoint '{api_url}'")
    };

    anyhow::Error::new(err).context(context)
}

#[cfg(test)]
mod tests {
    use super::{completion_request_error, error_chain_has_connection_refused};
    use reqwest::Client;
    use std::net::TcpListener;

    fn free_local_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn connection_refused_keeps_the_client_error_in_the_chain() {
        let addr = free_local_addr();
        let api_url = format!("http://{addr}/openai/deployments/m/chat/completions");
        let client = Client::new();

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with connection-refused");
        let mapped = completion_request_error(req_err, &api_url);
        let msg = format!("{mapped:#}");

        assert!(
            msg.contains("Connection refused by chat completion endpoint"),
            "unexpected message: {msg}"
        );
        assert!(msg.contains(&api_url), "unexpected message: {msg}");
        assert!(mapped.downcast_ref::<reqwest::Error>().is_some());
    }

    #[test]
    fn detects_connection_refused_from_error_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(error_chain_has_connection_refused(&err));
    }

    #[test]
    fn ignores_unrelated_errors() {
        let err = std::io::Error::other("broken pipe");
        assert!(!error_chain_has_connection_refused(&err));
    }
}
