#![deny(unsafe_code)]
#![no_main]
#![no_std]

use core::sync::atomic::{AtomicBool, Ordering};

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod config;
mod console;
mod eth;
mod network;
mod tls_buffers;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Set once the network task has stopped on a fatal condition
static HALTED: AtomicBool = AtomicBool::new(false);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2])]
mod app {
    use super::*;
    use defmt::{error, info, Display2Format};
    use embassy_futures::select::{select3, Either3};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_time::Delay;
    use static_cell::{ConstStaticCell, StaticCell};
    use wizlink_core::config::{ETHERNET_BUF_MAX_SIZE, HTTP_BUF_SIZE};
    use wizlink_core::{bring_up, FatalError, NetworkSession, SessionBuffers, SessionParts};
    use wizlink_hal::{SpiChipBus, W5500};

    use console::DefmtConsole;
    use network::{StackDhcp, StackRegisters, TlsHttpsClient};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;
    type RngPeripheral = embassy_stm32::Peri<'static, peripherals::RNG>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    // RNG interrupt binding for hardware random number generator
    embassy_stm32::bind_interrupts!(struct RngIrqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("wizlink starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (RNG clock)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("PLL configured: SYSCLK=84MHz, PLLQ=48MHz for RNG");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        heartbeat::spawn().ok();
        network_task::spawn(net_periph, p.RNG).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    ///
    /// Short blink while the network runs; solid once it has halted.
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        loop {
            if HALTED.load(Ordering::Relaxed) {
                cx.local.led.set_high();
                Mono::delay(1.secs()).await;
                continue;
            }
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(900.millis()).await;
        }
    }

    /// Network task: bring-up, addressing, the HTTPS GET, then DHCP upkeep
    ///
    /// Returns only after a fatal condition; the stack runners are dropped
    /// with it so no further network activity takes place.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        rng_periph: RngPeripheral,
    ) {
        use embassy_net::{Config, StackResources};
        use embassy_stm32::rng::Rng;

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(config::SPI_FREQUENCY_HZ);

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );
        let cs = Output::new(periph.cs, Level::High, Speed::VeryHigh);
        let mut reset = Output::new(periph.reset, Level::High, Speed::Low);
        let int = ExtiInput::new(periph.int, periph.exti, Pull::Up);

        let mut chip = W5500::new();
        let ready = match bring_up(
            &mut chip,
            SpiChipBus::new(spi, cs),
            &mut reset,
            &mut Delay,
            &config::bring_up(),
        )
        .await
        {
            Ok(ready) => ready,
            Err(e) => return halt(e),
        };
        let Some(bus) = chip.release() else {
            error!("W5500 bus was not registered");
            return stop();
        };

        let session_config = config::session();
        let identity = session_config.identity;
        let Ok((device, w5500_runner)) = eth::init_w5500(bus, reset, int, identity.mac()).await
        else {
            return stop();
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let Some(resources) = RESOURCES.try_init(StackResources::new()) else {
            error!("Network stack resources already taken");
            return stop();
        };
        let (stack, mut net_runner) =
            embassy_net::new(device, Config::default(), resources, config::STACK_SEED);
        info!("Network stack initialized");

        static SCRATCH: ConstStaticCell<[u8; ETHERNET_BUF_MAX_SIZE]> =
            ConstStaticCell::new([0; ETHERNET_BUF_MAX_SIZE]);
        static RESPONSE: ConstStaticCell<[u8; HTTP_BUF_SIZE]> =
            ConstStaticCell::new([0; HTTP_BUF_SIZE]);
        let (Some(scratch), Some(response), Some(tls)) =
            (SCRATCH.try_take(), RESPONSE.try_take(), tls_buffers::take())
        else {
            error!("Session buffers already taken");
            return stop();
        };

        let rng = Rng::new(rng_periph, RngIrqs);
        let mut session = NetworkSession::new(
            ready,
            &session_config,
            SessionParts {
                regs: StackRegisters::new(stack, identity.net_info()),
                dhcp: StackDhcp::new(stack),
                https: TlsHttpsClient::new(stack, rng, tls),
                delay: Delay,
                console: DefmtConsole::new(),
            },
            SessionBuffers { scratch, response },
        );

        let app_logic = async {
            match session.run().await {
                Ok(never) => match never {},
                Err(e) => e,
            }
        };

        let fatal = match select3(w5500_runner.run(), net_runner.run(), app_logic).await {
            Either3::First(never) => never,
            Either3::Second(never) => never,
            Either3::Third(e) => e,
        };
        halt(fatal);
    }

    fn halt(reason: FatalError) {
        error!("Network halted: {}", Display2Format(&reason));
        stop();
    }

    fn stop() {
        HALTED.store(true, Ordering::Relaxed);
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
