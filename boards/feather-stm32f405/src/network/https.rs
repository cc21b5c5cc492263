//! HTTPS GET over embedded-tls and embassy-net
//!
//! TLS 1.3 only, AES-128-GCM-SHA256. Peer certificates are not verified;
//! a context that demands verification or a client certificate is refused
//! rather than silently downgraded.

use core::net::Ipv4Addr;

use defmt::{debug, error, info, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::{Read, Write};
use embedded_tls::{
    Aes128GcmSha256, CryptoProvider, NoVerify, TlsConfig, TlsConnection, TlsContext, TlsVerifier,
};
use wizlink_hal::https::{self, encode_get_request};
use wizlink_hal::{
    HttpResponse, HttpsClient, RequestError, RequestLimits, RootCaPolicy, SocketHandle,
    TlsRequestContext, Url,
};

use super::socket::AsyncTcpSocket;
use crate::tls_buffers::ConnectionBuffers;

/// Delay between DNS attempts
const DNS_RETRY_DELAY_MS: u64 = 500;

/// Simple crypto provider that wraps an RNG for TLS operations
struct SimpleCryptoProvider<RNG> {
    rng: RNG,
    verifier: NoVerify,
}

impl<RNG> SimpleCryptoProvider<RNG> {
    fn new(rng: RNG) -> Self {
        Self {
            rng,
            verifier: NoVerify,
        }
    }
}

impl<RNG> CryptoProvider for SimpleCryptoProvider<RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

/// [`HttpsClient`] on the embassy-net stack
pub struct TlsHttpsClient<RNG> {
    stack: Stack<'static>,
    rng: RNG,
    buffers: ConnectionBuffers,
}

impl<RNG> TlsHttpsClient<RNG>
where
    RNG: rand_core::RngCore + rand_core::CryptoRng,
{
    pub fn new(stack: Stack<'static>, rng: RNG, buffers: ConnectionBuffers) -> Self {
        Self {
            stack,
            rng,
            buffers,
        }
    }

    async fn resolve(&self, host: &str, retries: u8) -> Result<IpAddress, RequestError> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }
        for attempt in 1..=retries.max(1) {
            match self.stack.dns_query(host, DnsQueryType::A).await {
                Ok(addrs) => {
                    if let Some(ip) = addrs.first() {
                        return Ok(*ip);
                    }
                    warn!("DNS returned no results for {} (attempt {})", host, attempt);
                }
                Err(e) => warn!(
                    "DNS query for {} failed (attempt {}): {:?}",
                    host,
                    attempt,
                    Debug2Format(&e)
                ),
            }
            Timer::after_millis(DNS_RETRY_DELAY_MS).await;
        }
        error!("DNS resolution of {} failed", host);
        Err(RequestError::Dns)
    }
}

impl<RNG> HttpsClient for TlsHttpsClient<RNG>
where
    RNG: rand_core::RngCore + rand_core::CryptoRng,
{
    async fn get(
        &mut self,
        socket: SocketHandle,
        buf: &mut [u8],
        url: &Url<'_>,
        tls: &TlsRequestContext<'_>,
        limits: &RequestLimits,
    ) -> Result<HttpResponse, RequestError> {
        if tls.use_client_certificate || tls.root_ca_policy == RootCaPolicy::Required {
            error!("Certificate verification is not available on this board");
            return Err(RequestError::CertificateUnavailable);
        }
        if tls.root_ca_policy == RootCaPolicy::Optional {
            warn!("Proceeding without server certificate verification");
        }

        // The response buffer holds the request head until the response arrives
        let head_len = encode_get_request(url, buf)?;

        let ip = self.resolve(url.host, limits.dns_retries).await?;
        let endpoint = IpEndpoint::new(ip, url.port);
        info!("Resolved {} to {}", url.host, Debug2Format(&endpoint));

        let timeout = Duration::from_millis(u64::from(limits.recv_timeout_ms));
        let ConnectionBuffers {
            tls_read,
            tls_write,
            tcp_rx,
            tcp_tx,
        } = &mut self.buffers;

        let mut tcp = AsyncTcpSocket::new(self.stack, tcp_rx, tcp_tx, timeout);
        debug!("Connecting {} to {}", socket, Debug2Format(&endpoint));
        if let Err(e) = tcp.connect(endpoint).await {
            tcp.close();
            return Err(e);
        }

        let config = TlsConfig::new().with_server_name(url.host);
        let mut conn =
            TlsConnection::<AsyncTcpSocket, Aes128GcmSha256>::new(tcp, tls_read, tls_write);
        let context = TlsContext::new(&config, SimpleCryptoProvider::new(&mut self.rng));
        conn.open(context).await.map_err(|e| {
            error!("TLS handshake failed: {:?}", Debug2Format(&e));
            RequestError::Handshake
        })?;
        info!("TLS 1.3 session established with {}", url.host);

        conn.write_all(&buf[..head_len]).await.map_err(|e| {
            error!("Request send failed: {:?}", Debug2Format(&e));
            RequestError::Send
        })?;
        conn.flush().await.map_err(|_| RequestError::Send)?;

        let response = match with_timeout(timeout, read_response(&mut conn, buf)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout),
        };

        if let Err((_, e)) = conn.close().await {
            debug!("TLS close returned error: {:?}", Debug2Format(&e));
        }
        let response = response?;
        info!(
            "Received {} bytes from {}{}",
            response.len,
            url.host,
            if response.truncated { " (truncated)" } else { "" }
        );
        Ok(response)
    }
}

/// Read the response, treating a TLS close as end of stream
async fn read_response<T>(conn: &mut T, buf: &mut [u8]) -> Result<HttpResponse, RequestError>
where
    T: Read<Error = embedded_tls::TlsError>,
{
    https::read_response(conn, buf, |e| {
        matches!(e, embedded_tls::TlsError::ConnectionClosed)
    })
    .await
    .map_err(|e| {
        error!("Response read failed: {:?}", Debug2Format(&e));
        RequestError::Receive
    })
}
