//! # Register map
//! Control registers are addressed with an 8-bit logical address. Bits 0..=4 hold the offset
//! within a bank, bits 5..=6 the bank and bit 7 marks MAC and MII registers, which shift out a
//! dummy byte before their value when read.
//!
//! Offsets 0x1B..=0x1F are mapped in every bank.

pub const ADDR_MASK: u8 = 0x1F;
pub const BANK_MASK: u8 = 0x60;
pub const SPRD_MASK: u8 = 0x80;

/// The first offset of the registers shared by all banks.
pub const COMMON_OFFSET: u8 = 0x1B;

// Common registers
pub const EIE: u8 = 0x1B;
pub const EIR: u8 = 0x1C;
pub const ESTAT: u8 = 0x1D;
pub const ECON2: u8 = 0x1E;
pub const ECON1: u8 = 0x1F;

// Bank 0
pub const ERDPTL: u8 = 0x00;
pub const ERDPTH: u8 = 0x01;
pub const EWRPTL: u8 = 0x02;
pub const EWRPTH: u8 = 0x03;
pub const ETXSTL: u8 = 0x04;
pub const ETXSTH: u8 = 0x05;
pub const ETXNDL: u8 = 0x06;
pub const ETXNDH: u8 = 0x07;
pub const ERXSTL: u8 = 0x08;
pub const ERXSTH: u8 = 0x09;
pub const ERXNDL: u8 = 0x0A;
pub const ERXNDH: u8 = 0x0B;
pub const ERXRDPTL: u8 = 0x0C;
pub const ERXRDPTH: u8 = 0x0D;
pub const ERXWRPTL: u8 = 0x0E;
pub const ERXWRPTH: u8 = 0x0F;
pub const EDMASTL: u8 = 0x10;
pub const EDMASTH: u8 = 0x11;
pub const EDMANDL: u8 = 0x12;
pub const EDMANDH: u8 = 0x13;
pub const EDMADSTL: u8 = 0x14;
pub const EDMADSTH: u8 = 0x15;
pub const EDMACSL: u8 = 0x16;
pub const EDMACSH: u8 = 0x17;

// Bank 1
pub const EHT0: u8 = 0x20;
pub const EHT1: u8 = 0x21;
pub const EHT2: u8 = 0x22;
pub const EHT3: u8 = 0x23;
pub const EHT4: u8 = 0x24;
pub const EHT5: u8 = 0x25;
pub const EHT6: u8 = 0x26;
pub const EHT7: u8 = 0x27;
pub const EPMM0: u8 = 0x28;
pub const EPMM1: u8 = 0x29;
pub const EPMM2: u8 = 0x2A;
pub const EPMM3: u8 = 0x2B;
pub const EPMM4: u8 = 0x2C;
pub const EPMM5: u8 = 0x2D;
pub const EPMM6: u8 = 0x2E;
pub const EPMM7: u8 = 0x2F;
pub const EPMCSL: u8 = 0x30;
pub const EPMCSH: u8 = 0x31;
pub const EPMOL: u8 = 0x34;
pub const EPMOH: u8 = 0x35;
pub const ERXFCON: u8 = 0x38;
pub const EPKTCNT: u8 = 0x39;

// Bank 2
pub const MACON1: u8 = 0xC0;
pub const MACON2: u8 = 0xC1;
pub const MACON3: u8 = 0xC2;
pub const MACON4: u8 = 0xC3;
pub const MABBIPG: u8 = 0xC4;
pub const MAIPGL: u8 = 0xC6;
pub const MAIPGH: u8 = 0xC7;
pub const MACLCON1: u8 = 0xC8;
pub const MACLCON2: u8 = 0xC9;
pub const MAMXFLL: u8 = 0xCA;
pub const MAMXFLH: u8 = 0xCB;
pub const MICMD: u8 = 0xD2;
pub const MIREGADR: u8 = 0xD4;
pub const MIWRL: u8 = 0xD6;
pub const MIWRH: u8 = 0xD7;
pub const MIRDL: u8 = 0xD8;
pub const MIRDH: u8 = 0xD9;

// Bank 3
pub const MAADR5: u8 = 0xE0;
pub const MAADR6: u8 = 0xE1;
pub const MAADR3: u8 = 0xE2;
pub const MAADR4: u8 = 0xE3;
pub const MAADR1: u8 = 0xE4;
pub const MAADR2: u8 = 0xE5;
pub const EBSTSD: u8 = 0x66;
pub const EBSTCON: u8 = 0x67;
pub const EBSTCSL: u8 = 0x68;
pub const EBSTCSH: u8 = 0x69;
pub const MISTAT: u8 = 0xEA;
pub const EREVID: u8 = 0x72;
pub const ECOCON: u8 = 0x75;
pub const EFLOCON: u8 = 0x77;
pub const EPAUSL: u8 = 0x78;
pub const EPAUSH: u8 = 0x79;

/// MAC address registers, ordered from the first byte on the wire to the last.
pub const MAC_ADDRESS: [u8; 6] = [MAADR1, MAADR2, MAADR3, MAADR4, MAADR5, MAADR6];

pub mod erxfcon {
    pub const UCEN: u8 = 0x80;
    pub const ANDOR: u8 = 0x40;
    pub const CRCEN: u8 = 0x20;
    pub const PMEN: u8 = 0x10;
    pub const MPEN: u8 = 0x08;
    pub const HTEN: u8 = 0x04;
    pub const MCEN: u8 = 0x02;
    pub const BCEN: u8 = 0x01;
}

pub mod eie {
    pub const INTIE: u8 = 0x80;
    pub const PKTIE: u8 = 0x40;
    pub const DMAIE: u8 = 0x20;
    pub const LINKIE: u8 = 0x10;
    pub const TXIE: u8 = 0x08;
    pub const WOLIE: u8 = 0x04;
    pub const TXERIE: u8 = 0x02;
    pub const RXERIE: u8 = 0x01;
}

pub mod eir {
    pub const PKTIF: u8 = 0x40;
    pub const DMAIF: u8 = 0x20;
    pub const LINKIF: u8 = 0x10;
    pub const TXIF: u8 = 0x08;
    pub const WOLIF: u8 = 0x04;
    pub const TXERIF: u8 = 0x02;
    pub const RXERIF: u8 = 0x01;
}

pub mod estat {
    pub const INT: u8 = 0x80;
    pub const BUFER: u8 = 0x40;
    pub const LATECOL: u8 = 0x10;
    pub const RXBUSY: u8 = 0x04;
    pub const TXABRT: u8 = 0x02;
    pub const CLKRDY: u8 = 0x01;
}

pub mod econ2 {
    pub const AUTOINC: u8 = 0x80;
    pub const PKTDEC: u8 = 0x40;
    pub const PWRSV: u8 = 0x20;
    pub const VRPS: u8 = 0x08;
}

pub mod econ1 {
    pub const TXRST: u8 = 0x80;
    pub const RXRST: u8 = 0x40;
    pub const DMAST: u8 = 0x20;
    pub const CSUMEN: u8 = 0x10;
    pub const TXRTS: u8 = 0x08;
    pub const RXEN: u8 = 0x04;
    pub const BSEL1: u8 = 0x02;
    pub const BSEL0: u8 = 0x01;
}

pub mod macon1 {
    pub const LOOPBK: u8 = 0x10;
    pub const TXPAUS: u8 = 0x08;
    pub const RXPAUS: u8 = 0x04;
    pub const PASSALL: u8 = 0x02;
    pub const MARXEN: u8 = 0x01;
}

pub mod macon3 {
    pub const PADCFG2: u8 = 0x80;
    pub const PADCFG1: u8 = 0x40;
    pub const PADCFG0: u8 = 0x20;
    pub const TXCRCEN: u8 = 0x10;
    pub const PHDRLEN: u8 = 0x08;
    pub const HFRMLEN: u8 = 0x04;
    pub const FRMLNEN: u8 = 0x02;
    pub const FULDPX: u8 = 0x01;
}

pub mod macon4 {
    pub const DEFER: u8 = 0x40;
    pub const BPEN: u8 = 0x20;
    pub const NOBKOFF: u8 = 0x10;
}

pub mod micmd {
    pub const MIISCAN: u8 = 0x02;
    pub const MIIRD: u8 = 0x01;
}

pub mod mistat {
    pub const NVALID: u8 = 0x04;
    pub const SCAN: u8 = 0x02;
    pub const BUSY: u8 = 0x01;
}

pub mod phcon1 {
    pub const PRST: u16 = 0x8000;
    pub const PLOOPBK: u16 = 0x4000;
    pub const PPWRSV: u16 = 0x0800;
    pub const PDPXMD: u16 = 0x0100;
}

pub mod phstat1 {
    pub const PFDPX: u16 = 0x1000;
    pub const PHDPX: u16 = 0x0800;
    pub const LLSTAT: u16 = 0x0004;
    pub const JBSTAT: u16 = 0x0002;
}

pub mod phstat2 {
    pub const TXSTAT: u16 = 0x2000;
    pub const RXSTAT: u16 = 0x1000;
    pub const COLSTAT: u16 = 0x0800;
    pub const LSTAT: u16 = 0x0400;
    pub const DPXSTAT: u16 = 0x0200;
    pub const PLRITY: u16 = 0x0020;
}

pub mod phcon2 {
    pub const FRCLINK: u16 = 0x4000;
    pub const TXDIS: u16 = 0x2000;
    pub const JABBER: u16 = 0x0400;
    pub const HDLDIS: u16 = 0x0100;
}

pub mod phie {
    pub const PLNKIE: u16 = 0x0010;
    pub const PGEIE: u16 = 0x0002;
}

/// Determine if a logical register address is mapped in every bank.
pub const fn is_common(address: u8) -> bool {
    (address & ADDR_MASK) >= COMMON_OFFSET
}

/// Determine if a logical register address is a MAC or MII register.
pub const fn is_mac_mii(address: u8) -> bool {
    (address & SPRD_MASK) != 0
}
