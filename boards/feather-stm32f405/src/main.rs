#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod device_id;
mod eth;
mod network;
mod time;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{debug, error, info, warn};
    use embassy_futures::join::join3;
    use embassy_net::Stack;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use redlight_core::{
        BatchStore, ChannelConfig, ClockStatus, MonitorConfig, PendingBatch, SignalMonitor,
        Uploader, UplinkError,
    };
    use rtic::mutex_prelude::*;

    use network::{manager, NetworkClient, NetworkConfig, SharedBatch, SntpClient, SntpConfig, TcpTransport};

    /// Monitored signal lines
    const CHANNELS: usize = 2;

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

    #[shared]
    struct Shared {
        batch: PendingBatch,
        clock: time::RtcClock,
    }

    #[local]
    struct Local {
        monitor: SignalMonitor<CHANNELS>,
        inputs: [Input<'static>; CHANNELS],
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Red-light monitor starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz
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

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);
        info!("System initialized with HSE (12MHz) and LSE (32.768kHz)");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let clock = time::init_clock(p.RTC);

        // Feather D9 / D10, pulled up; the lamp interface pulls the line low
        let mut inputs = [Input::new(p.PB8, Pull::Up), Input::new(p.PB9, Pull::Up)];
        let channels = [ChannelConfig::active_low(9), ChannelConfig::active_low(10)];
        let monitor = SignalMonitor::new(&MonitorConfig::default(), channels, &mut inputs);

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

        input_task::spawn().ok();
        network_task::spawn(net_periph).ok();

        (
            Shared {
                batch: PendingBatch::new(),
                clock,
            },
            Local { monitor, inputs },
        )
    }

    /// Input task - samples every signal line each tick
    ///
    /// Runs above the network task so uploads never stretch a debounce window.
    #[task(priority = 2, shared = [batch, clock], local = [monitor, inputs])]
    async fn input_task(cx: input_task::Context) -> ! {
        let input_task::SharedResources {
            mut batch,
            mut clock,
            ..
        } = cx.shared;
        let monitor = cx.local.monitor;
        let inputs = cx.local.inputs;

        let config = MonitorConfig::default();
        let mut next_status_ms = config.status_log_interval_ms;
        info!(
            "Input task started: {} channels, {} ms tick, {} ms debounce",
            CHANNELS, config.poll_interval_ms, config.debounce_ms
        );

        loop {
            let now_ms = Mono::now().duration_since_epoch().to_millis();
            (&mut clock, &mut batch).lock(|clock, batch| {
                monitor.poll(inputs, now_ms, clock, batch);
            });

            if now_ms >= next_status_ms {
                monitor.log_status();
                next_status_ms = now_ms + config.status_log_interval_ms;
            }

            Mono::delay(config.poll_interval_ms.millis()).await;
        }
    }

    /// Network task - owns the network stack, time sync and the uplink
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1, shared = [batch, clock])]
    async fn network_task(cx: network_task::Context, periph: NetworkPeripherals) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Network task started");

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

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
        let reset = Output::new(periph.reset, Level::High, Speed::Low);
        let int = ExtiInput::new(periph.int, periph.exti, Pull::Up);

        let eth_periph = eth::EthPeripherals {
            spi,
            cs,
            reset,
            int,
        };

        let net_config = NetworkConfig::for_device();
        let (device, w5500_runner) = match eth::init_w5500(eth_periph, net_config.mac_addr).await {
            Ok(parts) => parts,
            Err(e) => {
                // Capture keeps running; sessions queue until the batch is full
                error!("{}: uplink disabled", e);
                loop {
                    Mono::delay(60_u64.secs()).await;
                }
            }
        };

        static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let network_task::SharedResources { batch, clock, .. } = cx.shared;
        let (never, _, _) = join3(
            run_uplink(stack, batch, clock),
            w5500_runner.run(),
            net_runner.run(),
        )
        .await;
        never
    }

    /// Time sync and transmit loop
    async fn run_uplink<B, C>(stack: Stack<'static>, batch: B, mut clock: C) -> !
    where
        B: rtic::Mutex<T = PendingBatch>,
        C: rtic::Mutex<T = time::RtcClock>,
    {
        let device_id = device_id::device_id();
        info!("Device ID: {}", device_id);

        let mut uploader: Uploader<'_> = Uploader::new(network::uplink_config(device_id));
        let mut store = SharedBatch(batch);
        let mut sntp = SntpClient::new(SntpConfig::default());

        let mut rx_buffer = [0u8; 1024];
        // One full request fits without waiting on a flush
        let mut tx_buffer = [0u8; redlight_core::http::HEAD_CAPACITY + redlight_core::BODY_CAPACITY];
        let mut transport = TcpTransport::new(stack, &mut rx_buffer, &mut tx_buffer);

        manager::wait_for_config(&stack).await;
        sync_time(&stack, &mut sntp, &mut clock).await;

        let resync_interval = sntp.config().resync_interval_secs;
        let mut next_resync = Mono::now() + resync_interval.secs();
        let interval_ms = uploader.config().interval_ms;
        info!(
            "Uplink to {}:{} every {} ms",
            uploader.config().host,
            uploader.config().port,
            interval_ms
        );

        loop {
            Mono::delay(interval_ms.millis()).await;

            if !manager::is_up(&stack) {
                uploader.skip(UplinkError::NetworkDown);
                continue;
            }

            if Mono::now() >= next_resync {
                info!("SNTP resync triggered");
                sync_time(&stack, &mut sntp, &mut clock).await;
                next_resync = Mono::now() + resync_interval.secs();
            }

            let (pending, dropped) = store.with_batch(|b| (b.count(), b.dropped()));
            info!("Transmit cycle: {} pending, {} dropped", pending, dropped);

            let status = clock.lock(|c| ClockStatus::read(c));
            let uptime_secs = Mono::now().duration_since_epoch().to_secs();
            let result = uploader
                .drain_and_send(&mut transport, &mut store, status, uptime_secs)
                .await;
            debug!("Cycle result: {} ({})", result, uploader.stats());
        }
    }

    async fn sync_time<C>(stack: &Stack<'static>, sntp: &mut SntpClient, clock: &mut C)
    where
        C: rtic::Mutex<T = time::RtcClock>,
    {
        let synced = match sntp.run(stack).await {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!("SNTP sync failed: {}", e);
                None
            }
        };
        let source = clock.lock(|c| time::resync(c, synced));
        info!("Clock source: {}", source);
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
