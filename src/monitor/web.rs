//! Web-transaction metadata.

use std::fmt;

use http::Method;

/// How the request reached the service.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Transport {
    #[default]
    Unknown,
    Http,
    Https,
}

impl Transport {
    /// Classifies a URL scheme by case-sensitive prefix: `https…` is
    /// [`Https`](Self::Https), any other `http…` is [`Http`](Self::Http),
    /// everything else (including `""`) is [`Unknown`](Self::Unknown).
    pub fn from_scheme(scheme: &str) -> Self {
        if scheme.starts_with("https") {
            Self::Https
        } else if scheme.starts_with("http") {
            Self::Http
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Http    => "HTTP",
            Self::Https   => "HTTPS",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request URL assembled from its pieces.
///
/// Kept as plain fields so a URL can be reported even when the pieces do not
/// form a valid URI (an empty scheme, a host with odd characters).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    /// Query string without the leading `?`.
    pub raw_query: String,
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        if !self.scheme.is_empty() || !self.host.is_empty() {
            write!(f, "//{}", self.host)?;
        }
        f.write_str(&self.path)?;
        if !self.raw_query.is_empty() {
            write!(f, "?{}", self.raw_query)?;
        }
        Ok(())
    }
}

/// Request facts attached to a web transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WebRequest {
    pub host: String,
    pub method: Method,
    pub transport: Transport,
    pub url: RequestUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_prefix_matched() {
        assert_eq!(Transport::from_scheme("https"), Transport::Https);
        assert_eq!(Transport::from_scheme("https://api.example.com"), Transport::Https);
        assert_eq!(Transport::from_scheme("http"), Transport::Http);
        assert_eq!(Transport::from_scheme("http://api.example.com"), Transport::Http);
    }

    #[test]
    fn transport_does_not_fold_case() {
        assert_eq!(Transport::from_scheme("HTTPS"), Transport::Unknown);
        assert_eq!(Transport::from_scheme("Http"), Transport::Unknown);
    }

    #[test]
    fn other_schemes_are_unknown() {
        for scheme in ["", "ftp", "ws", "wss", " http"] {
            assert_eq!(Transport::from_scheme(scheme), Transport::Unknown, "{scheme:?}");
        }
    }

    #[test]
    fn url_renders_all_parts() {
        let url = RequestUrl {
            scheme: "https".into(),
            host: "api.example.com".into(),
            path: "/users/42".into(),
            raw_query: "expand=teams".into(),
        };
        assert_eq!(url.to_string(), "https://api.example.com/users/42?expand=teams");
    }

    #[test]
    fn url_skips_missing_parts() {
        let url = RequestUrl { path: "/health".into(), ..RequestUrl::default() };
        assert_eq!(url.to_string(), "/health");
    }
}
