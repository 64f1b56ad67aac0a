//! Downloading remote images.
//!
//! [`Fetcher`] is the seam between ingestion and the network. The real
//! implementation, [`HttpFetcher`], is a blocking `reqwest` client with a
//! whole-request deadline and a body size cap taken from `[fetch]` in
//! `rehost.toml`. Tests substitute a canned fetcher.

use crate::config::FetchConfig;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error reading response: {0}")]
    Io(#[from] std::io::Error),
    #[error("Response is larger than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Cannot fetch '{0}' URLs, only http and https")]
    UnsupportedScheme(String),
}

/// Something that turns a URL into the bytes behind it.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("rehost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let too_large = FetchError::TooLarge {
            limit: self.max_bytes,
        };

        let response = self.client.get(url.as_str()).send()?.error_for_status()?;
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large);
        }

        // Content-Length can be absent or wrong; the cap holds either way.
        let mut body = Vec::new();
        response.take(self.max_bytes + 1).read_to_end(&mut body)?;
        if body.len() as u64 > self.max_bytes {
            return Err(too_large);
        }

        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Serve one connection on localhost. `respond` gets the stream after the
    /// request headers have been read.
    fn serve_once<F>(respond: F) -> Url
    where
        F: FnOnce(&mut std::net::TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            respond(&mut stream);
        });
        Url::parse(&format!("http://{addr}/image.png")).unwrap()
    }

    fn ok_response(body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn fetcher(timeout_secs: u64, max_bytes: u64) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            timeout_secs,
            max_bytes,
        })
        .unwrap()
    }

    #[test]
    fn fetches_body() {
        let url = serve_once(|stream| {
            stream.write_all(&ok_response(b"pixels")).unwrap();
        });
        assert_eq!(fetcher(5, 1024).fetch(&url).unwrap(), b"pixels");
    }

    #[test]
    fn declared_length_over_cap_is_refused() {
        let url = serve_once(|stream| {
            stream.write_all(&ok_response(&[7u8; 64])).unwrap();
        });
        let err = fetcher(5, 16).fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }

    #[test]
    fn error_status_is_an_error() {
        let url = serve_once(|stream| {
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });
        assert!(matches!(fetcher(5, 1024).fetch(&url), Err(FetchError::Http(_))));
    }

    #[test]
    fn silent_server_hits_the_deadline() {
        let url = serve_once(|_stream| {
            thread::sleep(Duration::from_secs(3));
        });
        match fetcher(1, 1024).fetch(&url) {
            Err(FetchError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn non_http_schemes_are_refused() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(matches!(
            fetcher(5, 1024).fetch(&url),
            Err(FetchError::UnsupportedScheme(scheme)) if scheme == "file"
        ));
    }
}
