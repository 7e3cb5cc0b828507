//! Co-simulated scriptable RTC.
//!
//! A PL031-compatible real-time-clock register file with one extra register
//! routed to an externally loaded model script. The RTC side counts reference
//! (wall-clock-like) seconds through an additive offset; the script side is
//! driven both by guest accesses to the exchange register and by the
//! time-step synchronizer on the virtual clock.
//!
//! # Memory Map
//!
//! * `0x00`: DATA (R): current counter value
//! * `0x04`: MATCH (R/W): alarm compare value
//! * `0x08`: LOAD (R/W): set counter, recomputes the offset
//! * `0x0C`: CONTROL (R/W, writes ignored): always reads as enabled
//! * `0x10`: INT_MASK (R/W): bit 0 only
//! * `0x14`: RAW_STATUS (R): raw alarm flag
//! * `0x18`: MASKED_STATUS (R): `RAW_STATUS & INT_MASK`
//! * `0x1C`: INT_CLEAR (W): clears bits in RAW_STATUS
//! * `0x20`: EXCHANGE (R/W): routed to the model's read_data/write_data
//! * `0xFE0..=0xFFF`: IDENTIFICATION (R): fixed device/cell id bytes

use tracing::{debug, trace, warn};

use crate::bridge::CosimModel;
use crate::common::DeviceError;
use crate::irq::{InterruptLine, IrqSink};
use crate::snapshot::{
    DeviceSnapshot, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};
use crate::soc::devices::step_sync::StepSynchronizer;
use crate::soc::traits::{Device, NullWallClockListener, WallClockListener};
use crate::time::{Clock, OneShotTimer};

/// Offset of the counter (DATA) register.
const REG_DATA: u64 = 0x00;
/// Offset of the alarm compare (MATCH) register.
const REG_MATCH: u64 = 0x04;
/// Offset of the counter load (LOAD) register.
const REG_LOAD: u64 = 0x08;
/// Offset of the CONTROL register.
const REG_CONTROL: u64 = 0x0C;
/// Offset of the interrupt mask register.
const REG_INT_MASK: u64 = 0x10;
/// Offset of the raw interrupt status register.
const REG_RAW_STATUS: u64 = 0x14;
/// Offset of the masked interrupt status register.
const REG_MASKED_STATUS: u64 = 0x18;
/// Offset of the write-only interrupt clear register.
const REG_INT_CLEAR: u64 = 0x1C;
/// Offset of the exchange register routed to the model script.
const REG_EXCHANGE: u64 = 0x20;
/// First offset of the identification block.
const ID_BASE: u64 = 0xFE0;
/// Last offset of the identification block.
const ID_END: u64 = 0xFFF;

/// CONTROL always reads back as enabled; the RTC cannot be stopped.
const CONTROL_ENABLED: u32 = 1;
/// Alarm bit in RAW_STATUS.
const INT_RTC: u32 = 1;
/// Bits of INT_MASK that are wired; the rest read as zero.
const INT_MASK_BITS: u32 = 1;

/// Device and cell identification bytes, one per word of the id block.
const DEVICE_ID: [u8; 8] = [0xFF, 0x10, 0x14, 0x00, 0x0D, 0xF0, 0x05, 0xB1];

/// Size of the MMIO region claimed on the bus.
pub const MMIO_SIZE: u64 = 0x1000;

/// Bus name under which the device registers.
pub const DEVICE_NAME: &str = "ScriptedRTC";

/// Snapshot section id.
const SNAPSHOT_ID: [u8; 4] = *b"SRTC";
/// Snapshot format version.
const SNAPSHOT_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

/// Legacy-compatible tick offset, rebased against the virtual clock.
const TAG_TICK_OFFSET_VMSTATE: u16 = 1;
/// Alarm compare register.
const TAG_MATCH: u16 = 2;
/// Counter load register.
const TAG_LOAD: u16 = 3;
/// Control register.
const TAG_CONTROL: u16 = 4;
/// Interrupt mask register.
const TAG_INT_MASK: u16 = 5;
/// Raw interrupt status register.
const TAG_RAW_STATUS: u16 = 6;
/// Raw tick offset; written only when offset migration is enabled.
const TAG_TICK_OFFSET: u16 = 7;

/// Co-simulated RTC device state.
///
/// One instance per peripheral. The model handle, both timers, and the
/// interrupt line are exclusively owned; the host event loop serializes
/// register accesses and [`poll`](Device::poll) calls, so no interior locking
/// is needed and the model is never reentered.
pub struct ScriptedRtc<M: CosimModel, C: Clock> {
    base_addr: u64,
    clock: C,
    model: M,
    line: InterruptLine,
    listener: Box<dyn WallClockListener>,

    /// Alarm compare value (MATCH).
    match_reg: u32,
    /// Last value written to LOAD.
    load_reg: u32,
    /// Stored control value; reads are hardwired to [`CONTROL_ENABLED`].
    control_reg: u32,
    /// Interrupt mask; only [`INT_MASK_BITS`] are wired.
    int_mask: u32,
    /// Raw interrupt status.
    raw_status: u32,

    /// Additive correction: counter = reference seconds + offset.
    tick_offset: u32,
    /// Legacy-compatible offset as last decoded from a snapshot.
    tick_offset_vmstate: u32,
    /// Whether the last restore carried the exact offset.
    tick_offset_migrated: bool,
    /// Snapshot mode switch; fixed at construction.
    migrate_tick_offset: bool,

    /// Alarm deadline in reference-clock seconds.
    alarm: OneShotTimer,
    /// Time-step synchronizer on the virtual clock.
    sync: StepSynchronizer,
}

impl<M: CosimModel, C: Clock> ScriptedRtc<M, C> {
    /// Creates the device and arms the exchange timer.
    ///
    /// The counter is tuned so that it reads `boot_wall_secs` at the current
    /// reference instant, mirroring an RTC seeded from host wall-clock time
    /// at attach.
    ///
    /// # Arguments
    ///
    /// * `base_addr` - Base physical address of the MMIO region.
    /// * `clock` - Virtual/reference time sources.
    /// * `model` - Loaded co-simulation model (one per device).
    /// * `step_interval_ns` - Synchronizer cadence from script initialization.
    /// * `sink` - Output interrupt line.
    /// * `migrate_tick_offset` - Snapshot mode (see `Config`).
    /// * `boot_wall_secs` - Wall-clock seconds at attach time.
    pub fn new(
        base_addr: u64,
        clock: C,
        model: M,
        step_interval_ns: u64,
        sink: Box<dyn IrqSink>,
        migrate_tick_offset: bool,
        boot_wall_secs: u64,
    ) -> Self {
        let now_ns = clock.virtual_now_ns();
        let tick_offset = (boot_wall_secs as u32).wrapping_sub(clock.reference_now_secs() as u32);

        Self {
            base_addr,
            model,
            line: InterruptLine::new(sink),
            listener: Box::new(NullWallClockListener),
            match_reg: 0,
            load_reg: 0,
            control_reg: 0,
            int_mask: 0,
            raw_status: 0,
            tick_offset,
            tick_offset_vmstate: 0,
            tick_offset_migrated: false,
            migrate_tick_offset,
            alarm: OneShotTimer::default(),
            sync: StepSynchronizer::new(step_interval_ns, now_ns),
            clock,
        }
    }

    /// Replaces the wall-clock-change listener (defaults to a no-op).
    pub fn set_wall_clock_listener(&mut self, listener: Box<dyn WallClockListener>) {
        self.listener = listener;
    }

    /// Current guest-visible counter value.
    ///
    /// Wraps modulo 2^32 together with the reference clock.
    pub fn current_count(&self) -> u32 {
        self.tick_offset
            .wrapping_add(self.clock.reference_now_secs() as u32)
    }

    /// Current output interrupt line level.
    pub fn irq_level(&self) -> bool {
        self.line.level()
    }

    /// Whether the alarm timer currently holds a deadline.
    pub fn alarm_armed(&self) -> bool {
        self.alarm.is_armed()
    }

    /// Whether the last restore carried the exact tick offset.
    pub fn tick_offset_migrated(&self) -> bool {
        self.tick_offset_migrated
    }

    /// Synchronizer cadence in virtual nanoseconds.
    pub fn step_interval_ns(&self) -> u64 {
        self.sync.step_interval_ns()
    }

    /// Pushes `RAW_STATUS & INT_MASK` to the interrupt line.
    fn update_irq(&mut self) {
        self.line.set_level(self.raw_status & self.int_mask != 0);
    }

    /// Re-evaluates the alarm against the current counter.
    ///
    /// The distance to the match value is computed with wrapping unsigned
    /// arithmetic, so an alarm "behind" a wrapped counter still fires at the
    /// correct instant. A distance of zero fires immediately instead of
    /// arming a zero-length timer.
    fn rearm_alarm(&mut self) {
        let ticks = self.match_reg.wrapping_sub(self.current_count());
        if ticks == 0 {
            self.alarm.cancel();
            self.raw_status |= INT_RTC;
            self.update_irq();
        } else {
            self.alarm
                .arm(self.clock.reference_now_secs() + u64::from(ticks));
        }
    }

    /// Routes an exchange-register read to the model.
    fn exchange_read(&mut self, offset: u64) -> Result<u32, DeviceError> {
        let now_ns = self.clock.virtual_now_ns();
        let (status, data) = self.model.read_data(now_ns, offset)?;
        if status.wants_interrupt() {
            self.line.pulse();
        }
        Ok(data)
    }

    /// Routes an exchange-register write to the model.
    fn exchange_write(&mut self, offset: u64, value: u32) -> Result<(), DeviceError> {
        let now_ns = self.clock.virtual_now_ns();
        let status = self.model.write_data(now_ns, offset, value)?;
        if status.wants_interrupt() {
            self.line.pulse();
        }
        Ok(())
    }

    fn read_offset(&mut self, offset: u64) -> Result<u32, DeviceError> {
        let value = match offset {
            REG_DATA => self.current_count(),
            REG_MATCH => self.match_reg,
            REG_LOAD => self.load_reg,
            REG_CONTROL => CONTROL_ENABLED,
            REG_INT_MASK => self.int_mask,
            REG_RAW_STATUS => self.raw_status,
            REG_MASKED_STATUS => self.raw_status & self.int_mask,
            REG_INT_CLEAR => {
                warn!(target: "guest", "read of write-only INT_CLEAR register");
                0
            }
            REG_EXCHANGE => self.exchange_read(offset)?,
            ID_BASE..=ID_END => u32::from(DEVICE_ID[((offset - ID_BASE) >> 2) as usize]),
            _ => return Err(DeviceError::BadRegisterOffset { offset }),
        };
        Ok(value)
    }

    fn write_offset(&mut self, offset: u64, value: u32) -> Result<(), DeviceError> {
        match offset {
            REG_MATCH => {
                self.match_reg = value;
                self.rearm_alarm();
            }
            REG_LOAD => {
                self.load_reg = value;
                self.tick_offset = value.wrapping_sub(self.clock.reference_now_secs() as u32);
                self.listener.wall_clock_changed(u64::from(value));
                self.rearm_alarm();
            }
            REG_CONTROL => {
                // The RTC is permanently enabled.
                debug!(target: "guest", "ignoring write of {value:#x} to CONTROL");
            }
            REG_INT_MASK => {
                self.int_mask = value & INT_MASK_BITS;
                self.update_irq();
            }
            REG_INT_CLEAR => {
                self.raw_status &= !value;
                self.update_irq();
            }
            REG_DATA | REG_RAW_STATUS | REG_MASKED_STATUS | ID_BASE..=ID_END => {
                warn!(target: "guest", "write to read-only register {offset:#x} ignored");
            }
            REG_EXCHANGE => self.exchange_write(offset, value)?,
            _ => return Err(DeviceError::BadRegisterOffset { offset }),
        }
        Ok(())
    }
}

impl<M: CosimModel, C: Clock> Device for ScriptedRtc<M, C> {
    /// Returns the device name.
    fn name(&self) -> &str {
        DEVICE_NAME
    }

    /// Returns the address range (Base, Size).
    fn address_range(&self) -> (u64, u64) {
        (self.base_addr, MMIO_SIZE)
    }

    /// Reads a word (32-bit) from the device.
    ///
    /// Steady-state script faults and unknown offsets are logged and read as
    /// zero; the guest access never fails.
    fn read_u32(&mut self, offset: u64) -> u32 {
        let value = match self.read_offset(offset) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "guest", "read at {offset:#x} recovered with 0: {e}");
                0
            }
        };
        trace!(target: "registers", "read  {offset:#05x} -> {value:#010x}");
        value
    }

    /// Writes a word (32-bit) to the device.
    ///
    /// Side effects (offset retune, alarm rearm, interrupt update) are fully
    /// applied before this returns. Steady-state script faults and unknown
    /// offsets are logged and the write has no effect.
    fn write_u32(&mut self, offset: u64, val: u32) {
        trace!(target: "registers", "write {offset:#05x} <- {val:#010x}");
        if let Err(e) = self.write_offset(offset, val) {
            warn!(target: "guest", "write at {offset:#x} ignored: {e}");
        }
    }

    /// Services the alarm timer and the time-step synchronizer.
    ///
    /// The two timers are independent; neither firing implies or reorders the
    /// other.
    fn poll(&mut self) {
        if self.alarm.take_expired(self.clock.reference_now_secs()) {
            self.raw_status |= INT_RTC;
            self.update_irq();
        }

        let now_ns = self.clock.virtual_now_ns();
        if self.sync.due(now_ns) {
            self.sync.run(now_ns, &mut self.model, &mut self.line);
        }
    }

    fn as_snapshot_mut(&mut self) -> Option<&mut dyn DeviceSnapshot> {
        Some(self)
    }
}

impl<M: CosimModel, C: Clock> DeviceSnapshot for ScriptedRtc<M, C> {
    fn device_id(&self) -> [u8; 4] {
        SNAPSHOT_ID
    }

    fn device_version(&self) -> SnapshotVersion {
        SNAPSHOT_VERSION
    }

    /// Serializes the register file and tick offset.
    ///
    /// The legacy-compatible offset is always written, rebased so a receiver
    /// without the raw-offset field can reconstruct an approximation against
    /// its own clocks. The raw offset itself is written only when offset
    /// migration is enabled.
    fn save_state(&self) -> Vec<u8> {
        let legacy_offset = self
            .tick_offset
            .wrapping_add(self.clock.reference_now_secs() as u32)
            .wrapping_sub(self.clock.virtual_now_secs() as u32);

        let mut w = SnapshotWriter::new(SNAPSHOT_ID, SNAPSHOT_VERSION);
        w.field_u32(TAG_TICK_OFFSET_VMSTATE, legacy_offset);
        w.field_u32(TAG_MATCH, self.match_reg);
        w.field_u32(TAG_LOAD, self.load_reg);
        w.field_u32(TAG_CONTROL, self.control_reg);
        w.field_u32(TAG_INT_MASK, self.int_mask);
        w.field_u32(TAG_RAW_STATUS, self.raw_status);
        if self.migrate_tick_offset {
            w.field_u32(TAG_TICK_OFFSET, self.tick_offset);
        }
        w.finish()
    }

    /// Restores the register file and tick offset, then rearms both timers.
    ///
    /// When the raw offset is absent the counter is reconstructed from the
    /// legacy field and the current clock delta. That reconstruction is
    /// deliberately approximate and may move the guest clock backward
    /// relative to host time; it exists for snapshots written by older
    /// encoders.
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, SNAPSHOT_ID)?;
        r.ensure_major(SNAPSHOT_VERSION.major)?;

        if let Some(v) = r.u32(TAG_TICK_OFFSET_VMSTATE)? {
            self.tick_offset_vmstate = v;
        }
        if let Some(v) = r.u32(TAG_MATCH)? {
            self.match_reg = v;
        }
        if let Some(v) = r.u32(TAG_LOAD)? {
            self.load_reg = v;
        }
        if let Some(v) = r.u32(TAG_CONTROL)? {
            self.control_reg = v;
        }
        if let Some(v) = r.u32(TAG_INT_MASK)? {
            self.int_mask = v & INT_MASK_BITS;
        }
        if let Some(v) = r.u32(TAG_RAW_STATUS)? {
            self.raw_status = v;
        }

        if let Some(raw) = r.u32(TAG_TICK_OFFSET)? {
            self.tick_offset = raw;
            self.tick_offset_migrated = true;
        } else {
            self.tick_offset = self
                .tick_offset_vmstate
                .wrapping_sub(self.clock.reference_now_secs() as u32)
                .wrapping_add(self.clock.virtual_now_secs() as u32);
            self.tick_offset_migrated = false;
        }

        // Timers are not serialized; recompute both against current time.
        self.rearm_alarm();
        self.sync.reschedule(self.clock.virtual_now_ns());
        self.update_irq();
        Ok(())
    }
}
