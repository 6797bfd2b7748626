//! # CRC-16 Engine
//!
//! Table-driven CRC-16 checksum calculation for frame postambles.
//!
//! **Default parameters** (CRC-16/CCITT-FALSE): polynomial 0x1021
//! (x^16 + x^12 + x^5 + 1), initial value 0xFFFF, final XOR 0x0000.
//!
//! The polynomial, initial value, and final XOR are configurable at
//! construction so both sides of the link can agree on a different CRC
//! variant without code changes. The 256-entry lookup table is generated
//! once per engine instance.

/// CRC-16/CCITT-FALSE polynomial
pub const CRC16_DEFAULT_POLYNOMIAL: u16 = 0x1021;

/// CRC-16/CCITT-FALSE initial value
pub const CRC16_DEFAULT_INITIAL: u16 = 0xFFFF;

/// CRC-16/CCITT-FALSE final XOR value
pub const CRC16_DEFAULT_FINAL_XOR: u16 = 0x0000;

/// CRC-16 checksum engine with a precomputed lookup table
#[derive(Debug, Clone)]
pub struct Crc16 {
    table: [u16; 256],
    initial: u16,
    final_xor: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new(
            CRC16_DEFAULT_POLYNOMIAL,
            CRC16_DEFAULT_INITIAL,
            CRC16_DEFAULT_FINAL_XOR,
        )
    }
}

impl Crc16 {
    /// Create a CRC-16 engine for the given parameters
    ///
    /// # Arguments
    ///
    /// * `polynomial` - Generator polynomial (MSB-first, normal representation)
    /// * `initial` - Initial shift-register value
    /// * `final_xor` - Value XOR-ed into the checksum before it is returned
    pub fn new(polynomial: u16, initial: u16, final_xor: u16) -> Self {
        Self {
            table: generate_crc16_table(polynomial),
            initial,
            final_xor,
        }
    }

    /// Calculate the CRC-16 checksum of a byte slice using the lookup table
    ///
    /// # Examples
    ///
    /// ```
    /// use mcu_link::frame::crc::Crc16;
    ///
    /// let crc = Crc16::default();
    /// assert_eq!(crc.checksum(b"123456789"), 0x29B1);
    /// ```
    pub fn checksum(&self, data: &[u8]) -> u16 {
        let mut crc = self.initial;

        for &byte in data {
            let index = ((crc >> 8) ^ byte as u16) & 0xFF;
            crc = (crc << 8) ^ self.table[index as usize];
        }

        crc ^ self.final_xor
    }
}

/// Generate the 256-entry CRC-16 lookup table for a polynomial
fn generate_crc16_table(polynomial: u16) -> [u16; 256] {
    let mut table = [0u16; 256];

    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = (i as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ polynomial;
            } else {
                crc <<= 1;
            }
        }

        *entry = crc;
    }

    table
}

/// Calculate CRC-16 bit-by-bit (slow, for verifying the lookup table)
#[allow(dead_code)]
fn crc16_slow(data: &[u8], polynomial: u16, initial: u16, final_xor: u16) -> u16 {
    let mut crc = initial;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ polynomial;
            } else {
                crc <<= 1;
            }
        }
    }

    crc ^ final_xor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_check_value() {
        // Standard CRC-16/CCITT-FALSE check value
        let crc = Crc16::default();
        assert_eq!(crc.checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_crc16_empty() {
        let crc = Crc16::default();
        // Empty input returns the initial value (no final XOR with defaults)
        assert_eq!(crc.checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let crc = Crc16::default();
        let test_data: [&[u8]; 5] = [
            &[0x01, 0x02, 0x03],
            &[0xFF, 0xFE, 0xFD],
            &[0x81, 0x05, 0x05, 0x08],
            &[0x00; 24],
            b"123456789",
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc.checksum(data),
                crc16_slow(data, 0x1021, 0xFFFF, 0x0000),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_custom_parameters() {
        // CRC-16/XMODEM: same polynomial, zero initial value
        let crc = Crc16::new(0x1021, 0x0000, 0x0000);
        assert_eq!(crc.checksum(b"123456789"), 0x31C3);

        // CRC-16/GENIBUS: inverted output
        let crc = Crc16::new(0x1021, 0xFFFF, 0xFFFF);
        assert_eq!(crc.checksum(b"123456789"), 0xD64E);
    }

    #[test]
    fn test_crc16_changes_with_data() {
        let crc = Crc16::default();
        let crc1 = crc.checksum(&[0x08, 0x58, 0xDD, 0x02]);
        let crc2 = crc.checksum(&[0x08, 0x58, 0xDD, 0x03]);
        assert_ne!(crc1, crc2, "CRC should change when data changes");
    }

    #[test]
    fn test_crc16_single_bit_corruption_detected() {
        let crc = Crc16::default();
        let data = [0x05, 0x08, 0x58, 0xDD, 0x02, 0x01, 0x00];
        let reference = crc.checksum(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(crc.checksum(&corrupted), reference);
            }
        }
    }
}
