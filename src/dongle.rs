//! The dongle client: connection lifecycle, the read thread and command issuance.

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, trace, warn};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use snafu::{ensure, OptionExt, ResultExt};

use crate::buffer::{LineBuffer, MAX_LINE_LEN};
use crate::bus::{MessageBus, MessageFilter, Subscription};
use crate::config::DongleConfig;
use crate::decoder::MessageDecoder;
use crate::dedup::DedupFilter;
use crate::discovery::{DeviceList, SlotDiscovery};
use crate::error::{
    AlreadyConnectedSnafu, ConnectSnafu, IoSnafu, NotConnectedSnafu, Result, SpawnReaderSnafu,
};
use crate::lock;
use crate::message::{Message, MessageType};
use crate::tx::TxState;
use crate::types::{BeepMode, OutputChannel};

type Writer = Box<dyn Write + Send>;

/// State shared by the client and its read thread.
struct Link {
    /// The write half; its lock keeps commands from interleaving on the wire.
    writer: Mutex<Option<Writer>>,
    tx_state: Mutex<TxState>,
    bus: MessageBus,
    discovery: SlotDiscovery,
}

impl Link {
    fn write_line(&self, line: &str) -> Result<()> {
        self.write_raw(&format!("\n{}\n", line))
    }

    fn write_raw(&self, data: &str) -> Result<()> {
        let mut writer = lock(&self.writer);
        let port = writer.as_mut().context(NotConnectedSnafu)?;
        trace!("Sending {:?}", data);
        port.write_all(data.as_bytes()).context(IoSnafu)?;
        port.flush().context(IoSnafu)
    }

    /// Route one decoded line. Runs on the read thread only.
    fn dispatch(&self, msg: Message, dedup: &mut DedupFilter) {
        if !dedup.accept(&msg) {
            trace!("Dropping repeated {} message '{}'", msg.kind(), msg.text());
            return;
        }

        match msg.kind() {
            MessageType::Undef => warn!("Unknown message received: '{}'", msg.text()),
            MessageType::Slot => {
                if let Some(number) = msg.slot_number() {
                    self.discovery.record(number, msg.slot_value());
                }
            }
            kind => {
                if kind.is_device_event() {
                    info!(
                        "Received message of type {} from device {} ({})",
                        kind,
                        msg.device_id().unwrap_or_default(),
                        msg.device_model().unwrap_or_default()
                    );
                } else {
                    debug!("Received {} message '{}'", kind, msg.text());
                }
                self.bus.publish(&msg);
            }
        }
    }
}

fn read_loop<R: Read>(
    mut port: R,
    decoder: MessageDecoder,
    link: Arc<Link>,
    shutdown: Arc<AtomicBool>,
    session: u64,
) {
    let mut buffer = LineBuffer::new();
    let mut dedup = DedupFilter::new();
    let mut chunk = [0u8; 64];

    while !shutdown.load(Ordering::SeqCst) {
        match port.read(&mut chunk) {
            Ok(0) => {
                info!("Serial link closed");
                break;
            }
            Ok(len) => buffer.write(&chunk[..len]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(e) => {
                error!("Serial read failed: {}", e);
                break;
            }
        }

        // a subscriber may disconnect; nothing after that is delivered
        while !shutdown.load(Ordering::SeqCst) {
            let Some(line) = buffer.next_line() else {
                break;
            };
            // a bare terminator is a keep-alive
            if !line.is_empty() {
                link.dispatch(decoder.decode(&line), &mut dedup);
            }
        }
        if buffer.len() > MAX_LINE_LEN {
            warn!("Discarding {} bytes of unterminated input", buffer.len());
            buffer.clear();
        }
    }

    // nothing will answer a pending discovery anymore, unless the link was
    // already handed to a newer connection
    link.discovery.close_session(session);
    debug!("Read thread stopped");
}

struct Reader {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Reader {
    /// The loop ended on its own, after end of input or a read error.
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Make room for a new connection, reaping a reader whose link dropped.
fn release_finished(reader: &mut Option<Reader>) -> Result<()> {
    if reader.as_ref().map_or(false, Reader::is_finished) {
        if let Some(old) = reader.take() {
            if old.handle.join().is_err() {
                error!("Read thread panicked");
            }
            debug!("Released the previous link");
        }
    }
    ensure!(reader.is_none(), AlreadyConnectedSnafu);
    Ok(())
}

/// Client for one Turris Dongle.
///
/// The client is shared by reference (or `Arc`) between everything that talks
/// to the dongle. While connected, a dedicated thread reads and decodes lines,
/// feeding `SLOT` replies to [`discover`](Self::discover) and publishing all
/// other accepted messages to subscribers.
///
/// ```no_run
/// use turris_dongle::{Dongle, DongleConfig, OutputChannel};
///
/// # fn main() -> Result<(), turris_dongle::Error> {
/// let dongle = Dongle::new(DongleConfig::default());
/// dongle.connect("/dev/ttyUSB0")?;
/// for slot in dongle.discover()? {
///     println!("{}: {} ({})", slot.slot(), slot.device_id(), slot.model());
/// }
/// dongle.subscribe(|msg| println!("{} {:?}", msg.kind(), msg.device_id()));
/// dongle.set_output(OutputChannel::Pgx, true)?;
/// dongle.disconnect();
/// # Ok(()) }
/// ```
pub struct Dongle {
    config: DongleConfig,
    link: Arc<Link>,
    reader: Mutex<Option<Reader>>,
    devices: Mutex<DeviceList>,
}

impl Dongle {
    pub fn new(config: DongleConfig) -> Self {
        Dongle {
            config,
            link: Arc::new(Link {
                writer: Mutex::new(None),
                tx_state: Mutex::new(TxState::default()),
                bus: MessageBus::new(),
                discovery: SlotDiscovery::new(),
            }),
            reader: Mutex::new(None),
            devices: Mutex::new(DeviceList::new()),
        }
    }

    pub fn config(&self) -> &DongleConfig {
        &self.config
    }

    /// Open the serial port (8N1 at the configured baud rate) and start the read thread.
    /// # Errors
    /// [`Error::Connect`](crate::Error::Connect) if the port cannot be opened, in which
    /// case the client stays disconnected.
    pub fn connect(&self, port: &str) -> Result<()> {
        let mut reader = lock(&self.reader);
        release_finished(&mut reader)?;

        let serial = serialport::new(port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.read_timeout)
            .open()
            .context(ConnectSnafu { port })?;
        let input = serial.try_clone().context(ConnectSnafu { port })?;
        info!("Serial port {} opened", port);

        *reader = Some(self.start(input, Box::new(serial))?);
        Ok(())
    }

    /// Connect over an already open link, e.g. a simulator.
    ///
    /// Reads from `input` should time out now and then (with `TimedOut` or
    /// `WouldBlock`) so that [`disconnect`](Self::disconnect) is noticed.
    pub fn attach<R, W>(&self, input: R, output: W) -> Result<()>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let mut reader = lock(&self.reader);
        release_finished(&mut reader)?;
        *reader = Some(self.start(input, Box::new(output))?);
        Ok(())
    }

    fn start<R: Read + Send + 'static>(&self, input: R, output: Writer) -> Result<Reader> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let decoder = MessageDecoder::new(self.config.firmware);
        let link = Arc::clone(&self.link);
        let stop = Arc::clone(&shutdown);

        let session = self.link.discovery.reopen();
        let handle = thread::Builder::new()
            .name("dongle-reader".into())
            .spawn(move || read_loop(input, decoder, link, stop, session))
            .context(SpawnReaderSnafu)?;
        *lock(&self.link.writer) = Some(output);
        info!("Receiving thread started");

        Ok(Reader { shutdown, handle })
    }

    /// Stop the read thread and close the link. Does nothing when not connected.
    ///
    /// The read thread is signalled and joined; it exits within one read timeout.
    pub fn disconnect(&self) {
        let Some(reader) = lock(&self.reader).take() else {
            return;
        };
        reader.shutdown.store(true, Ordering::SeqCst);
        self.link.discovery.close();
        lock(&self.link.writer).take();

        if reader.handle.thread().id() == thread::current().id() {
            // called by a subscriber; the loop ends once the callback returns
            debug!("Disconnect requested from the read thread");
        } else if reader.handle.join().is_err() {
            error!("Read thread panicked");
        }
        info!("Disconnected");
    }

    /// False once [`disconnect`](Self::disconnect) was called, or once the read
    /// thread stopped because the link dropped. A dropped link may be
    /// reconnected without calling `disconnect` first.
    pub fn is_connected(&self) -> bool {
        lock(&self.reader)
            .as_ref()
            .map_or(false, |reader| !reader.is_finished())
    }

    /// Send `line` framed by newlines, as one uninterrupted write.
    pub fn write(&self, line: &str) -> Result<()> {
        self.link.write_line(line)
    }

    /// Enumerate the devices registered in all 32 slots. Blocks the calling thread.
    ///
    /// The result also replaces the snapshot returned by [`devices`](Self::devices).
    /// # Errors
    /// [`Error::DiscoveryTimeout`](crate::Error::DiscoveryTimeout) if a slot is not
    /// answered within the configured timeout.
    pub fn discover(&self) -> Result<DeviceList> {
        ensure!(self.is_connected(), NotConnectedSnafu);
        let link = &self.link;
        let devices = link.discovery.run(self.config.discovery_timeout, |slot| {
            link.write_line(&format!("GET SLOT:{}", slot))
        })?;
        info!("Discovery finished, {} devices registered", devices.len());

        *lock(&self.devices) = devices.clone();
        Ok(devices)
    }

    /// Devices found by the last completed discovery.
    pub fn devices(&self) -> DeviceList {
        lock(&self.devices).clone()
    }

    /// Receive every accepted message. The callback runs on the read thread.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.link.bus.subscribe(MessageFilter::all(), callback)
    }

    pub fn subscribe_filtered<F>(&self, filter: MessageFilter, callback: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.link.bus.subscribe(filter, callback)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.link.bus.unsubscribe(subscription)
    }

    pub fn tx_state(&self) -> TxState {
        *lock(&self.link.tx_state)
    }

    /// Change the transmit state and send it, atomically with respect to other callers.
    ///
    /// The new state is kept only if it was written successfully.
    pub fn mutate_tx_state<F>(&self, patch: F) -> Result<()>
    where
        F: FnOnce(&mut TxState),
    {
        let mut state = lock(&self.link.tx_state);
        let mut next = *state;
        patch(&mut next);
        self.link.write_raw(&next.encode())?;
        *state = next;
        Ok(())
    }

    pub fn set_output(&self, channel: OutputChannel, on: bool) -> Result<()> {
        self.mutate_tx_state(|state| state.set_output(channel, on))
    }

    pub fn set_beep(&self, beep: BeepMode) -> Result<()> {
        self.mutate_tx_state(|state| state.beep = beep)
    }

    /// Send the current transmit state again.
    pub fn transmit_state(&self) -> Result<()> {
        self.mutate_tx_state(|_| ())
    }
}

impl Drop for Dongle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Dongle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dongle")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("bus", &self.link.bus)
            .finish()
    }
}
