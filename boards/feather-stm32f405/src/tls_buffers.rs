//! TLS record and TCP socket buffers in main SRAM
//!
//! Each buffer is a `ConstStaticCell`, so it is zero-initialized in `.bss`
//! and handed out at most once. Only one TLS connection ever exists.
//!
//! **Read buffer (18 KB)**: maximum TLS 1.3 plaintext (16384 bytes) plus
//! record header, AEAD tag and padding allowance.
//!
//! **Write buffer (16 KB)**: we control outgoing record sizes, so one full
//! record is enough.

use static_cell::ConstStaticCell;

const TLS_READ_BUF_SIZE: usize = 18 * 1024;
const TLS_WRITE_BUF_SIZE: usize = 16 * 1024;
const TCP_BUF_SIZE: usize = 4 * 1024;

static TLS_READ_BUF: ConstStaticCell<[u8; TLS_READ_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_READ_BUF_SIZE]);
static TLS_WRITE_BUF: ConstStaticCell<[u8; TLS_WRITE_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_WRITE_BUF_SIZE]);
static TCP_RX_BUF: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);
static TCP_TX_BUF: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);

/// Buffers for the one TLS-over-TCP connection
pub struct ConnectionBuffers {
    pub tls_read: &'static mut [u8],
    pub tls_write: &'static mut [u8],
    pub tcp_rx: &'static mut [u8],
    pub tcp_tx: &'static mut [u8],
}

/// Take the connection buffers; `None` if they were already taken
pub fn take() -> Option<ConnectionBuffers> {
    Some(ConnectionBuffers {
        tls_read: TLS_READ_BUF.try_take()?,
        tls_write: TLS_WRITE_BUF.try_take()?,
        tcp_rx: TCP_RX_BUF.try_take()?,
        tcp_tx: TCP_TX_BUF.try_take()?,
    })
}
