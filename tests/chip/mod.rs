#![allow(dead_code)]

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};
use enc28j60::{register, Config, Enc28j60};
use std::cell::RefCell;

pub const MEMORY_SIZE: usize = 0x2000;
pub const REVISION: u8 = 0x06;

const ECON1: usize = 0x1F;
const ECON2: usize = 0x1E;
const ESTAT: usize = 0x1D;
const EIR: usize = 0x1C;

// Bank-local offsets.
const ERDPT: usize = 0x00;
const EWRPT: usize = 0x02;
const ETXST: usize = 0x04;
const ETXND: usize = 0x06;
const ERXST: usize = 0x08;
const ERXND: usize = 0x0A;
const ERXWRPT: usize = 0x0E;
const EPKTCNT: usize = 0x19;
const MICMD: usize = 0x12;
const MIREGADR: usize = 0x14;
const MIWRL: usize = 0x16;
const MIWRH: usize = 0x17;
const MIRDL: usize = 0x18;
const MIRDH: usize = 0x19;
const MISTAT: usize = 0x0A;
const EREVID: usize = 0x12;

const PHCON1: usize = 0x00;
const PHSTAT2: usize = 0x11;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A register and memory level model of the controller.
pub struct Chip {
    // Common registers are stored in bank 0 only.
    banks: [[u8; 32]; 4],
    pub memory: Vec<u8>,
    pub phy: [u16; 32],

    pub transactions: usize,
    pub mistat_reads: usize,
    pub packet_count_reads: usize,
    pub soft_resets: usize,
    pub phy_resets: usize,
    pub bank_switches: usize,
    pub transmitted: Vec<Vec<u8>>,

    /// Every transaction fails once set.
    pub fail: bool,
    /// The transaction with this sequence number fails.
    pub fail_at: Option<usize>,
    /// A frame that arrives while EPKTCNT is read for the given time.
    pub arrival: Option<(usize, Vec<u8>)>,
    /// MISTAT reads reporting busy after each MII operation.
    pub mii_busy_polls: u32,
    /// MISTAT never reports idle.
    pub mii_stuck: bool,
    /// PHCON1.PRST never self-clears.
    pub phy_reset_stuck: bool,
    /// ECON1 reads reporting TXRTS after a transmission is requested.
    pub transmit_polls: u32,
    /// TXRTS never clears.
    pub transmit_stuck: bool,
    /// The next transmission is aborted.
    pub abort_transmit: bool,

    mii_busy: u32,
    transmit_busy: u32,
}

impl Chip {
    pub fn new() -> Self {
        let mut chip = Self {
            banks: [[0; 32]; 4],
            memory: vec![0; MEMORY_SIZE],
            phy: [0; 32],
            transactions: 0,
            mistat_reads: 0,
            packet_count_reads: 0,
            soft_resets: 0,
            phy_resets: 0,
            bank_switches: 0,
            transmitted: Vec::new(),
            fail: false,
            fail_at: None,
            arrival: None,
            mii_busy_polls: 1,
            mii_stuck: false,
            phy_reset_stuck: false,
            transmit_polls: 2,
            transmit_stuck: false,
            abort_transmit: false,
            mii_busy: 0,
            transmit_busy: 0,
        };
        chip.reset_registers();
        chip.phy[0x02] = 0x0083;
        chip.phy[0x03] = 0x1400;
        chip
    }

    fn reset_registers(&mut self) {
        self.banks = [[0; 32]; 4];
        self.banks[0][ESTAT] = register::estat::CLKRDY;
        self.banks[0][ERXND] = 0xFF;
        self.banks[0][ERXND + 1] = 0x1F;
        self.banks[3][EREVID] = REVISION;
        self.mii_busy = 0;
        self.transmit_busy = 0;
    }

    fn bank(&self) -> usize {
        (self.banks[0][ECON1] & 0x03) as usize
    }

    fn slot(bank: usize, offset: usize) -> (usize, usize) {
        if offset >= 0x1B {
            (0, offset)
        } else {
            (bank, offset)
        }
    }

    fn is_mac_mii(bank: usize, offset: usize) -> bool {
        match bank {
            2 => offset <= 0x19,
            3 => offset <= 0x05 || offset == MISTAT,
            _ => false,
        }
    }

    fn get(&self, bank: usize, offset: usize) -> u8 {
        let (bank, offset) = Self::slot(bank, offset);
        self.banks[bank][offset]
    }

    fn get_pair(&self, bank: usize, offset: usize) -> u16 {
        u16::from_le_bytes([self.get(bank, offset), self.get(bank, offset + 1)])
    }

    fn put_pair(&mut self, bank: usize, offset: usize, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.banks[bank][offset] = low;
        self.banks[bank][offset + 1] = high;
    }

    /// Read a register by its driver-side logical address.
    pub fn register(&self, address: u8) -> u8 {
        self.get(((address >> 5) & 0x03) as usize, (address & 0x1F) as usize)
    }

    pub fn register_pair(&self, address: u8) -> u16 {
        self.get_pair(((address >> 5) & 0x03) as usize, (address & 0x1F) as usize)
    }

    pub fn set_register(&mut self, address: u8, value: u8) {
        let (bank, offset) = Self::slot(
            ((address >> 5) & 0x03) as usize,
            (address & 0x1F) as usize,
        );
        self.banks[bank][offset] = value;
    }

    pub fn set_link(&mut self, up: bool) {
        self.phy[PHSTAT2] = if up { 0x0400 } else { 0x0000 };
    }

    pub fn pending(&self) -> u8 {
        self.banks[1][EPKTCNT]
    }

    /// Place a received frame into the receive ring at the hardware write pointer.
    pub fn inject_frame(&mut self, payload: &[u8], crc_ok: bool) {
        let start = self.get_pair(0, ERXST) as usize;
        let end = self.get_pair(0, ERXND) as usize;
        let wrap = |address: usize| {
            if address > end {
                start + (address - end - 1)
            } else {
                address
            }
        };

        let write = self.get_pair(0, ERXWRPT) as usize;
        let byte_count = payload.len() + 4;
        let mut next = write + 6 + byte_count;
        if next % 2 == 1 {
            next += 1;
        }
        let next = wrap(next);

        let mut frame = Vec::new();
        frame.extend_from_slice(&(next as u16).to_le_bytes());
        frame.extend_from_slice(&(byte_count as u16).to_le_bytes());
        frame.push(if crc_ok { 0x80 } else { 0x10 });
        frame.push(0x00);
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&[0xAA; 4]);

        for (index, byte) in frame.iter().enumerate() {
            let address = wrap(write + index);
            self.memory[address] = *byte;
        }

        self.put_pair(0, ERXWRPT, next as u16);
        self.banks[1][EPKTCNT] += 1;
    }

    fn read_register(&mut self, offset: usize) -> u8 {
        let bank = self.bank();

        if bank == 3 && offset == MISTAT {
            self.mistat_reads += 1;
            let busy = if self.mii_stuck {
                true
            } else if self.mii_busy > 0 {
                self.mii_busy -= 1;
                true
            } else {
                false
            };
            return if busy { register::mistat::BUSY } else { 0 };
        }

        if bank == 1 && offset == EPKTCNT {
            self.packet_count_reads += 1;
            if matches!(&self.arrival, Some((read, _)) if *read == self.packet_count_reads) {
                if let Some((_, payload)) = self.arrival.take() {
                    self.inject_frame(&payload, true);
                }
            }
        }

        let value = self.get(bank, offset);
        if offset == ECON1 && value & register::econ1::TXRTS != 0 && !self.transmit_stuck {
            if self.transmit_busy > 0 {
                self.transmit_busy -= 1;
            } else {
                self.banks[0][ECON1] &= !register::econ1::TXRTS;
            }
        }

        value
    }

    fn write_register(&mut self, offset: usize, value: u8) {
        let bank = self.bank();
        let (slot_bank, slot_offset) = Self::slot(bank, offset);
        let previous = self.banks[slot_bank][slot_offset];
        self.banks[slot_bank][slot_offset] = value;

        match (slot_bank, slot_offset) {
            (0, ECON1) => {
                if (previous ^ value) & 0x03 != 0 {
                    self.bank_switches += 1;
                }
                if value & register::econ1::TXRST != 0 {
                    self.banks[0][ESTAT] &= !register::estat::TXABRT;
                }
                if previous & register::econ1::TXRTS == 0 && value & register::econ1::TXRTS != 0 {
                    self.start_transmit();
                }
            }
            (0, ECON2) => {
                if value & register::econ2::PKTDEC != 0 {
                    self.banks[1][EPKTCNT] = self.banks[1][EPKTCNT].saturating_sub(1);
                    self.banks[0][ECON2] &= !register::econ2::PKTDEC;
                }
                if value & register::econ2::PWRSV != 0 {
                    self.banks[0][ESTAT] &= !register::estat::CLKRDY;
                } else {
                    self.banks[0][ESTAT] |= register::estat::CLKRDY;
                }
            }
            (2, MICMD) => {
                if value & register::micmd::MIIRD != 0 {
                    let address = self.banks[2][MIREGADR] as usize & 0x1F;
                    let data = self.phy[address];
                    self.put_pair(2, MIRDL, data);
                    self.mii_busy = self.mii_busy_polls;
                }
            }
            (2, MIWRH) => {
                let address = self.banks[2][MIREGADR] as usize & 0x1F;
                let mut data = u16::from_le_bytes([self.banks[2][MIWRL], value]);
                if address == PHCON1 && data & register::phcon1::PRST != 0 {
                    self.phy_resets += 1;
                    if !self.phy_reset_stuck {
                        data &= !register::phcon1::PRST;
                    }
                }
                self.phy[address] = data;
                self.mii_busy = self.mii_busy_polls;
            }
            _ => {}
        }
    }

    fn start_transmit(&mut self) {
        let start = self.get_pair(0, ETXST) as usize;
        let end = self.get_pair(0, ETXND) as usize;

        // Skip the per-packet control byte.
        self.transmitted.push(self.memory[start + 1..=end].to_vec());
        self.banks[0][EIR] |= register::eir::TXIF;

        if self.abort_transmit {
            self.abort_transmit = false;
            self.banks[0][ESTAT] |= register::estat::TXABRT;
            self.banks[0][ECON1] &= !register::econ1::TXRTS;
        } else {
            self.transmit_busy = self.transmit_polls;
        }
    }

    fn read_buffer(&mut self, buf: &mut [u8]) {
        let start = self.get_pair(0, ERXST);
        let end = self.get_pair(0, ERXND);
        let mut pointer = self.get_pair(0, ERDPT);

        for byte in buf.iter_mut() {
            *byte = self.memory[pointer as usize];
            pointer = if pointer == end {
                start
            } else {
                (pointer + 1) & 0x1FFF
            };
        }

        self.put_pair(0, ERDPT, pointer);
    }

    fn write_buffer(&mut self, data: &[u8]) {
        let mut pointer = self.get_pair(0, EWRPT);
        for byte in data {
            self.memory[pointer as usize] = *byte;
            pointer = (pointer + 1) & 0x1FFF;
        }
        self.put_pair(0, EWRPT, pointer);
    }

    fn execute(&mut self, command: u8, write: &[u8], read: Option<&mut [u8]>) {
        let offset = (command & 0x1F) as usize;

        match command {
            0xFF => {
                self.soft_resets += 1;
                self.reset_registers();
            }
            0x3A => {
                if let Some(buf) = read {
                    self.read_buffer(buf);
                }
            }
            0x7A => self.write_buffer(write),
            _ => match command & 0xE0 {
                0x00 => {
                    if let Some(buf) = read {
                        let value = self.read_register(offset);
                        let dummy = Self::is_mac_mii(self.bank(), offset);
                        for (index, byte) in buf.iter_mut().enumerate() {
                            *byte = if dummy && index == 0 { 0xEE } else { value };
                        }
                    }
                }
                0x40 => {
                    if let Some(value) = write.first() {
                        self.write_register(offset, *value);
                    }
                }
                0x80 => {
                    if let Some(mask) = write.first() {
                        let value = self.get(self.bank(), offset) | mask;
                        self.write_register(offset, value);
                    }
                }
                0xA0 => {
                    if let Some(mask) = write.first() {
                        let value = self.get(self.bank(), offset) & !mask;
                        self.write_register(offset, value);
                    }
                }
                other => panic!("Unsupported opcode {:#04x}", other),
            },
        }
    }
}

/// An SPI device attached to a shared [Chip].
pub struct SimSpi<'a> {
    pub chip: &'a RefCell<Chip>,
}

impl<'a> SimSpi<'a> {
    pub fn new(chip: &'a RefCell<Chip>) -> Self {
        Self { chip }
    }
}

impl ErrorType for SimSpi<'_> {
    type Error = SimError;
}

impl SpiDevice for SimSpi<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        chip.transactions += 1;
        if chip.fail || chip.fail_at == Some(chip.transactions) {
            return Err(SimError);
        }

        let mut command = None;
        let mut written = Vec::new();
        let mut executed = false;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(data) => {
                    for byte in data.iter() {
                        if command.is_none() {
                            command.replace(*byte);
                        } else {
                            written.push(*byte);
                        }
                    }
                }
                Operation::Read(buf) => {
                    let command = command.ok_or(SimError)?;
                    chip.execute(command, &written, Some(&mut buf[..]));
                    executed = true;
                }
                Operation::DelayNs(_) => {}
                _ => return Err(SimError),
            }
        }

        if !executed {
            let command = command.ok_or(SimError)?;
            chip.execute(command, &written, None);
        }

        Ok(())
    }
}

/// A delay provider that records how long it was asked to wait.
#[derive(Default)]
pub struct Delay {
    pub nanoseconds: u64,
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanoseconds += ns as u64;
    }
}

pub fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Construct and initialize a driver against `chip`.
pub fn driver(chip: &RefCell<Chip>, config: Config) -> Enc28j60<SimSpi<'_>, Delay> {
    setup_logging();
    let mut eth = Enc28j60::new(SimSpi::new(chip), Delay::default(), config);
    eth.init().unwrap();
    eth
}
