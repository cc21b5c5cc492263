//! Secure request orchestrator
//!
//! Composes the TLS context, the application socket and the target URL into
//! one blocking HTTPS GET. Unlike a fire-and-forget call, every failure is
//! returned to the caller.

use wizlink_hal::{
    HttpsClient, RequestError, RequestLimits, Scheme, SocketHandle, TlsRequestContext, Url,
};

/// Summary of a buffered response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestOutcome {
    /// Status code from the status line, if one was received
    pub status: Option<u16>,
    /// Bytes in the response buffer
    pub len: usize,
    /// Start of the body within the buffer
    pub body_offset: Option<usize>,
    /// The response was cut at the buffer size
    pub truncated: bool,
}

impl RequestOutcome {
    /// Body bytes within `buf` (empty when headers did not complete)
    pub fn body<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        match self.body_offset {
            Some(start) => buf.get(start..self.len).unwrap_or(&[]),
            None => &[],
        }
    }
}

/// One HTTPS GET with a fixed TLS context and limits
pub struct SecureRequest<'c> {
    tls: &'c TlsRequestContext<'c>,
    limits: &'c RequestLimits,
}

impl<'c> SecureRequest<'c> {
    pub fn new(tls: &'c TlsRequestContext<'c>, limits: &'c RequestLimits) -> Self {
        Self { tls, limits }
    }

    /// Issue the request and buffer the response in `buf`
    ///
    /// Blocks the caller until the collaborator returns.
    pub async fn get<H: HttpsClient>(
        &self,
        client: &mut H,
        socket: SocketHandle,
        buf: &mut [u8],
        url: &str,
    ) -> Result<RequestOutcome, RequestError> {
        let url = Url::parse(url).map_err(|e| {
            warn!("Rejecting target URL: {:?}", e);
            RequestError::InvalidUrl
        })?;
        if url.scheme != Scheme::Https {
            return Err(RequestError::UnsupportedScheme);
        }
        self.tls.validate()?;

        info!("HTTPS GET {}:{} on {:?}", url.host, url.port, socket);
        let response = client
            .get(socket, buf, &url, self.tls, self.limits)
            .await
            .map_err(|e| {
                error!("HTTPS request failed: {:?}", e);
                e
            })?;

        let len = response.len.min(buf.len());
        let head = &buf[..len];
        let outcome = RequestOutcome {
            status: parse_status_line(head),
            len,
            body_offset: body_offset(head),
            truncated: response.truncated,
        };
        if outcome.truncated {
            warn!("HTTPS response truncated at {} bytes", len);
        }
        Ok(outcome)
    }
}

/// Status code of an `HTTP/x.y NNN ...` status line
pub fn parse_status_line(response: &[u8]) -> Option<u16> {
    let end = response
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(response.len());
    let rest = response[..end].strip_prefix(b"HTTP/")?;
    let space = rest.iter().position(|&b| b == b' ')?;
    let code = rest.get(space + 1..space + 4)?;
    if !code.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if !matches!(rest.get(space + 4), None | Some(&b' ') | Some(&b'\r')) {
        return None;
    }
    Some(code.iter().fold(0u16, |acc, &d| acc * 10 + u16::from(d - b'0')))
}

/// Offset just past the blank line ending the header block
pub fn body_offset(response: &[u8]) -> Option<usize> {
    wizlink_hal::https::header_end(response)
}
