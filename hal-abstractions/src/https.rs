//! HTTPS request collaborator and its TLS context

use core::future::Future;

use embedded_io_async::Read;

use crate::socket::SocketHandle;
use crate::url::Url;

/// Peer certificate verification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RootCaPolicy {
    /// Do not verify the peer chain
    None,
    /// Verify, but continue on failure
    Optional,
    /// Verify and abort the handshake on failure
    Required,
}

/// Certificate material for the TLS handshake, DER or PEM encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateMaterial<'a> {
    pub root_ca: Option<&'a [u8]>,
    pub client_certificate: Option<&'a [u8]>,
    pub client_key: Option<&'a [u8]>,
}

/// TLS settings for one request; read-only during the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsRequestContext<'a> {
    pub use_client_certificate: bool,
    pub root_ca_policy: RootCaPolicy,
    pub certificates: Option<CertificateMaterial<'a>>,
}

impl TlsRequestContext<'_> {
    /// No client certificate, no peer verification
    pub const INSECURE: TlsRequestContext<'static> = TlsRequestContext {
        use_client_certificate: false,
        root_ca_policy: RootCaPolicy::None,
        certificates: None,
    };

    /// Check that the context carries the material its policy needs
    pub fn validate(&self) -> Result<(), RequestError> {
        let material = self.certificates.as_ref();
        if self.use_client_certificate
            && !material.is_some_and(|m| m.client_certificate.is_some() && m.client_key.is_some())
        {
            return Err(RequestError::CertificateUnavailable);
        }
        if self.root_ca_policy == RootCaPolicy::Required
            && !material.is_some_and(|m| m.root_ca.is_some())
        {
            return Err(RequestError::CertificateUnavailable);
        }
        Ok(())
    }
}

/// Resolution and receive limits handed to the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestLimits {
    /// DNS query attempts before giving up
    pub dns_retries: u8,
    /// Receive timeout in milliseconds
    pub recv_timeout_ms: u32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            dns_retries: 5,
            recv_timeout_ms: 10_000,
        }
    }
}

/// What the collaborator wrote into the response buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpResponse {
    /// Bytes written, status line included
    pub len: usize,
    /// The response did not fit and was cut at the buffer size
    pub truncated: bool,
}

/// HTTPS request errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// Target URL could not be parsed
    InvalidUrl,
    /// Target URL is not `https://`
    UnsupportedScheme,
    /// The request head does not fit the response buffer
    RequestTooLarge,
    /// The TLS context needs certificate material it does not carry
    CertificateUnavailable,
    /// DNS resolution failed
    Dns,
    /// TCP connection failed
    Connect,
    /// TLS handshake failed
    Handshake,
    /// Sending the request failed
    Send,
    /// Receiving the response failed
    Receive,
    /// Receive timeout expired
    Timeout,
    /// Network configuration has not completed
    NotConfigured,
    /// The one-shot request has already been issued
    AlreadyIssued,
}

impl core::fmt::Display for RequestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "Invalid URL"),
            Self::UnsupportedScheme => write!(f, "Unsupported URL scheme"),
            Self::RequestTooLarge => write!(f, "Request head exceeds buffer"),
            Self::CertificateUnavailable => write!(f, "Certificate material unavailable"),
            Self::Dns => write!(f, "DNS resolution failed"),
            Self::Connect => write!(f, "Connection failed"),
            Self::Handshake => write!(f, "TLS handshake failed"),
            Self::Send => write!(f, "Send failed"),
            Self::Receive => write!(f, "Receive failed"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::NotConfigured => write!(f, "Network not configured"),
            Self::AlreadyIssued => write!(f, "Request already issued"),
        }
    }
}

impl core::error::Error for RequestError {}

impl embedded_io::Error for RequestError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Connect | Self::Send | Self::Receive => embedded_io::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io::ErrorKind::TimedOut,
            Self::InvalidUrl | Self::UnsupportedScheme | Self::RequestTooLarge => {
                embedded_io::ErrorKind::InvalidInput
            }
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// One blocking HTTPS GET
pub trait HttpsClient {
    /// Connect to `url`'s host, run the TLS handshake per `tls`, send a GET
    /// for the URL's path and write the response into `buf`
    ///
    /// Responses longer than `buf` are cut and reported as truncated.
    fn get(
        &mut self,
        socket: SocketHandle,
        buf: &mut [u8],
        url: &Url<'_>,
        tls: &TlsRequestContext<'_>,
        limits: &RequestLimits,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>>;
}

/// Render the HTTP/1.1 request head for a GET of `url`
pub fn write_get_request(url: &Url<'_>, w: &mut impl core::fmt::Write) -> core::fmt::Result {
    w.write_str("GET ")?;
    url.write_target(w)?;
    w.write_str(" HTTP/1.1\r\nHost: ")?;
    w.write_str(url.host)?;
    if !url.has_default_port() {
        write!(w, ":{}", url.port)?;
    }
    w.write_str("\r\nUser-Agent: wizlink/0.1\r\nAccept: */*\r\nConnection: close\r\n\r\n")
}

/// [`core::fmt::Write`] into a byte slice; fails once the slice is full
struct SliceWriter<'b> {
    buf: &'b mut [u8],
    len: usize,
}

impl core::fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let end = self.len + s.len();
        let dst = self.buf.get_mut(self.len..end).ok_or(core::fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Render the request head for `url` into `buf`, returning its length
pub fn encode_get_request(url: &Url<'_>, buf: &mut [u8]) -> Result<usize, RequestError> {
    let mut w = SliceWriter { buf, len: 0 };
    write_get_request(url, &mut w).map_err(|_| RequestError::RequestTooLarge)?;
    Ok(w.len)
}

/// Offset just past the blank line ending the header block
pub fn header_end(response: &[u8]) -> Option<usize> {
    response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Value of the `Content-Length` header in a complete header block
pub fn content_length(head: &[u8]) -> Option<usize> {
    const NAME: &[u8] = b"content-length:";
    head.split(|&b| b == b'\n').find_map(|line| {
        let value = line
            .get(..NAME.len())
            .filter(|name| name.eq_ignore_ascii_case(NAME))
            .map(|_| &line[NAME.len()..])?;
        core::str::from_utf8(value).ok()?.trim().parse().ok()
    })
}

/// Total message length once the headers announce one
fn message_len(response: &[u8]) -> Option<usize> {
    let end = header_end(response)?;
    Some(end + content_length(&response[..end])?)
}

/// Read a response into `buf`
///
/// Stops when the peer closes, when the `Content-Length` body has arrived,
/// or when `buf` is full. `closed` marks transport errors that mean an
/// orderly close.
pub async fn read_response<R: Read>(
    conn: &mut R,
    buf: &mut [u8],
    closed: impl Fn(&R::Error) -> bool,
) -> Result<HttpResponse, R::Error> {
    let mut len = 0;
    while len < buf.len() {
        if message_len(&buf[..len]).is_some_and(|end| len >= end) {
            break;
        }
        match conn.read(&mut buf[len..]).await {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if closed(&e) => break,
            Err(e) => return Err(e),
        }
    }
    if len < buf.len() {
        return Ok(HttpResponse {
            len,
            truncated: false,
        });
    }

    let truncated = match message_len(buf) {
        Some(end) => end > len,
        // Unknown length: anything further is dropped
        None => {
            let mut extra = [0u8; 1];
            matches!(conn.read(&mut extra).await, Ok(n) if n > 0)
        }
    };
    Ok(HttpResponse { len, truncated })
}
