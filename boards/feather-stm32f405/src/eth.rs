//! Ethernet packet driver hand-off
//!
//! Bring-up talks to the W5500 through a blocking [`SpiChipBus`]. Once it
//! succeeds the SPI peripheral and chip-select are reclaimed and handed to
//! `embassy-net-wiznet`, which runs the chip in MACRAW mode under
//! `embassy-net`.

use defmt::{error, info};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice as SpiDeviceBus;
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, Runner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;
use wizlink_hal::{MacAddress, SpiChipBus};

/// Blocking bus used during bring-up
pub type BringUpBus = SpiChipBus<Spi<'static, Async>, Output<'static>>;

pub type WiznetRunner = Runner<
    'static,
    W5500,
    SpiDeviceBus<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>,
    ExtiInput<'static>,
    Output<'static>,
>;

/// Packet driver could not be started
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct EthError;

/// Start the packet driver on the bus bring-up just released
///
/// Returns device and runner. Runner must be continuously polled for device operation.
pub async fn init_w5500(
    bus: BringUpBus,
    reset: Output<'static>,
    int: ExtiInput<'static>,
    mac: MacAddress,
) -> Result<(Device<'static>, WiznetRunner), EthError> {
    let (spi, cs) = bus.release();

    type SpiBusType = embassy_sync::mutex::Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;
    static SPI_BUS: StaticCell<SpiBusType> = StaticCell::new();
    let spi_bus = SPI_BUS
        .try_init(embassy_sync::mutex::Mutex::new(spi))
        .ok_or(EthError)?;
    let spi_device = SpiDeviceBus::new(spi_bus, cs);

    static STATE: StaticCell<embassy_net_wiznet::State<8, 8>> = StaticCell::new();
    let state = STATE
        .try_init(embassy_net_wiznet::State::<8, 8>::new())
        .ok_or(EthError)?;

    // The driver pulses reset again and programs the MAC itself
    let (device, runner) = embassy_net_wiznet::new(mac.octets(), state, spi_device, int, reset)
        .await
        .map_err(|_| {
            error!("W5500 packet driver failed to start");
            EthError
        })?;

    info!("W5500 packet driver started");
    Ok((device, runner))
}
