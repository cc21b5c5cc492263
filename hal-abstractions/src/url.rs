//! Minimal borrowed URL parser for request targets

/// Supported URL schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// URL parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrlError {
    /// Missing `://` or scheme other than http/https
    UnsupportedScheme,
    /// Empty host, user-info or IPv6 literal
    InvalidHost,
    /// Port is not a number in 1..=65535
    InvalidPort,
}

impl core::fmt::Display for UrlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedScheme => write!(f, "Unsupported URL scheme"),
            Self::InvalidHost => write!(f, "Invalid URL host"),
            Self::InvalidPort => write!(f, "Invalid URL port"),
        }
    }
}

impl core::error::Error for UrlError {}

/// A parsed `http://` or `https://` URL borrowing from its source string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub scheme: Scheme,
    pub host: &'a str,
    pub port: u16,
    /// Path and query as written; may be empty
    pub path: &'a str,
}

impl<'a> Url<'a> {
    /// Parse `scheme://host[:port][/path][?query][#fragment]`
    ///
    /// The fragment is dropped.
    pub fn parse(url: &'a str) -> Result<Self, UrlError> {
        let (scheme, rest) = url.split_once("://").ok_or(UrlError::UnsupportedScheme)?;
        let scheme = if scheme.eq_ignore_ascii_case("https") {
            Scheme::Https
        } else if scheme.eq_ignore_ascii_case("http") {
            Scheme::Http
        } else {
            return Err(UrlError::UnsupportedScheme);
        };

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let split = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, path) = rest.split_at(split);

        if authority.contains(['@', '[', ']']) {
            return Err(UrlError::InvalidHost);
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| UrlError::InvalidPort)?;
                if port == 0 {
                    return Err(UrlError::InvalidPort);
                }
                (host, port)
            }
            None => (authority, scheme.default_port()),
        };

        if host.is_empty() {
            return Err(UrlError::InvalidHost);
        }

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }

    /// Write the origin-form request target (`/` when the path is empty)
    pub fn write_target(&self, w: &mut impl core::fmt::Write) -> core::fmt::Result {
        if !self.path.starts_with('/') {
            w.write_char('/')?;
        }
        w.write_str(self.path)
    }

    /// Whether the port is the scheme default
    pub fn has_default_port(&self) -> bool {
        self.port == self.scheme.default_port()
    }
}
