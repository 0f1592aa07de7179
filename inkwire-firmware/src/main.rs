//! Inkwire - e-paper frame receiver firmware
//!
//! Runs on an RP2040 wired to a 7.5" 800×480 UC8179 panel. The host pushes
//! one packed 4-gray frame over UART0 as hex lines; the device stores it and
//! refreshes the panel.
//!
//! Pinout (Waveshare Pico e-Paper layout):
//!
//! | Signal | GPIO |
//! |--------|------|
//! | UART TX / RX | 0 / 1 |
//! | SPI1 CLK / MOSI | 10 / 11 |
//! | Panel CS | 9 |
//! | Panel DC | 8 |
//! | Panel RST | 12 |
//! | Panel BUSY | 13 |
//! | Status LED | 25 |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use embedded_alloc::LlffHeap as Heap;
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use inkwire_core::{DeviceServer, Hardware, ServerConfig, ServerEvent};
use inkwire_drivers::panel::{Uc8179, Uc8179Config};
use inkwire_hal::{IoLink, PinIndicator};
use inkwire_protocol::{BAUDRATE, FRAME_SIZE};

// Heap for the frame buffer
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Frame buffer plus allocator slack
const HEAP_SIZE: usize = 128 * 1024;

/// Panel SPI clock
const SPI_FREQUENCY_HZ: u32 = 4_000_000;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// UART ring buffers; RX holds more than one full chunk line
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 2048]> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Inkwire firmware starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Host link
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BAUDRATE;

    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 2048]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let link = IoLink::new(uart);

    info!("UART initialized at {} baud", BAUDRATE);

    // Panel
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = SPI_FREQUENCY_HZ;
    let spi = Spi::new_blocking_txonly(p.SPI1, p.PIN_10, p.PIN_11, spi_config);
    let cs = Output::new(p.PIN_9, Level::High);
    let spi = match ExclusiveDevice::new(spi, cs, Delay) {
        Ok(device) => device,
        Err(never) => match never {},
    };

    let panel = Uc8179::new(
        spi,
        Output::new(p.PIN_8, Level::Low),
        Output::new(p.PIN_12, Level::High),
        Input::new(p.PIN_13, Pull::Up),
        Delay,
        Uc8179Config::default(),
    );

    info!("Panel SPI initialized");

    let indicator = PinIndicator::new(Output::new(p.PIN_25, Level::Low));

    let hw = Hardware {
        link,
        panel,
        indicator,
        delay: Delay,
    };
    let mut server = DeviceServer::new(hw, ServerConfig::default());

    // The server polls with its own backoff; nothing else shares the core
    loop {
        match server.step() {
            Ok(ServerEvent::Idle) => {}
            Ok(ServerEvent::Booted { framebuffer }) => {
                if framebuffer {
                    info!("Ready, {} byte frame buffer", FRAME_SIZE);
                } else {
                    warn!("Ready without frame buffer, will retry on query");
                }
            }
            Ok(ServerEvent::ChunkAccepted { received }) => {
                trace!("{}/{} bytes", received, FRAME_SIZE);
            }
            Ok(ServerEvent::Granted) => info!("Transfer started"),
            Ok(ServerEvent::Displayed) => info!("Frame displayed"),
            Ok(ServerEvent::DisplayFailed(e)) => error!("Panel refresh failed: {}", e),
            Ok(ServerEvent::Aborted(e)) => warn!("Transfer aborted: {}", e),
            Ok(event) => debug!("{}", event),
            Err(fault) => {
                error!("Fatal: {}", fault);
                server.halt(fault);
            }
        }
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
