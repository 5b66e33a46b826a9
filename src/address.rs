use crate::ConnError;

/// LE address type of a peer device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    /// Public device address
    #[default]
    Public,
    /// Random (static or private) device address
    Random,
}

/// An LE device address: the 6-byte `BD_ADDR` plus its address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress {
    /// Address type
    pub kind: AddressKind,
    /// Raw address bytes, as transported over HCI
    pub addr: [u8; 6],
}

impl DeviceAddress {
    /// Create a public device address
    #[must_use]
    pub const fn public(addr: [u8; 6]) -> Self {
        Self {
            kind: AddressKind::Public,
            addr,
        }
    }

    /// Create a random device address
    #[must_use]
    pub const fn random(addr: [u8; 6]) -> Self {
        Self {
            kind: AddressKind::Random,
            addr,
        }
    }

    /// Get the raw address bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.addr
    }

    /// Format the address as a colon-separated hex string
    #[must_use]
    pub fn format_hex(&self) -> heapless::String<17> {
        const HEX: [char; 16] = [
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F',
        ];
        let mut result = heapless::String::new();
        for (i, byte) in self.addr.iter().enumerate() {
            if i > 0 {
                result.push(':').ok();
            }
            result.push(HEX[(byte >> 4) as usize]).ok();
            result.push(HEX[(byte & 0x0F) as usize]).ok();
        }
        result
    }

    /// Parse a public address from a colon-separated hex string
    ///
    /// # Errors
    /// Returns `ConnError::InvalidParameter` if the string is not exactly 17 characters
    /// long or contains anything other than hex digits and colons
    pub fn from_hex(hex: &str) -> Result<Self, ConnError> {
        if hex.len() != 17 || !hex.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(ConnError::InvalidParameter);
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in hex.split(':').enumerate() {
            if i >= 6 || byte.len() != 2 {
                return Err(ConnError::InvalidParameter);
            }
            bytes[i] = u8::from_str_radix(byte, 16).map_err(|_| ConnError::InvalidParameter)?;
        }
        Ok(Self::public(bytes))
    }
}

impl From<DeviceAddress> for bt_hci::param::BdAddr {
    fn from(addr: DeviceAddress) -> Self {
        bt_hci::param::BdAddr::new(addr.addr)
    }
}

impl From<AddressKind> for bt_hci::param::AddrKind {
    fn from(kind: AddressKind) -> Self {
        match kind {
            AddressKind::Public => bt_hci::param::AddrKind::PUBLIC,
            AddressKind::Random => bt_hci::param::AddrKind::RANDOM,
        }
    }
}

impl TryFrom<&str> for DeviceAddress {
    type Error = ConnError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        DeviceAddress::from_hex(hex)
    }
}

impl TryFrom<(AddressKind, &[u8])> for DeviceAddress {
    type Error = ConnError;

    fn try_from((kind, bytes): (AddressKind, &[u8])) -> Result<Self, Self::Error> {
        let addr: [u8; 6] = bytes.try_into().map_err(|_| ConnError::InvalidParameter)?;
        Ok(Self { kind, addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_address_constructors() {
        let public = DeviceAddress::public([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        let random = DeviceAddress::random([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert_eq!(public.kind, AddressKind::Public);
        assert_eq!(random.kind, AddressKind::Random);
        assert_eq!(public.as_bytes(), random.as_bytes());
        assert_ne!(public, random);
    }

    #[test]
    fn test_device_address_format_hex() {
        let addr = DeviceAddress::public([0x0A, 0xB1, 0x2C, 0xD3, 0x4E, 0xF5]);
        assert_eq!(addr.format_hex().as_str(), "0A:B1:2C:D3:4E:F5");

        let zero = DeviceAddress::public([0; 6]);
        assert_eq!(zero.format_hex().as_str(), "00:00:00:00:00:00");
    }

    #[test]
    fn test_device_address_from_hex() {
        let addr = DeviceAddress::from_hex("12:34:56:78:9A:BC").unwrap();
        assert_eq!(addr, DeviceAddress::public([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]));

        assert_eq!(
            DeviceAddress::from_hex("12:34:56:78:9A"),
            Err(ConnError::InvalidParameter)
        );
        assert_eq!(
            DeviceAddress::from_hex("12-34-56-78-9A-BC"),
            Err(ConnError::InvalidParameter)
        );
        assert_eq!(
            DeviceAddress::from_hex("123:4:56:78:9A:BC"),
            Err(ConnError::InvalidParameter)
        );
    }

    #[test]
    fn test_device_address_try_from_slice() {
        let bytes = &[0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC][..];
        let addr = DeviceAddress::try_from((AddressKind::Random, bytes)).unwrap();
        assert_eq!(addr.kind, AddressKind::Random);
        assert_eq!(addr.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        let short = &[0x12u8, 0x34, 0x56][..];
        assert!(DeviceAddress::try_from((AddressKind::Public, short)).is_err());
    }

    #[test]
    fn test_device_address_into_bd_addr() {
        let addr = DeviceAddress::public([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        let bd_addr: bt_hci::param::BdAddr = addr.into();
        assert_eq!(bd_addr.raw(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
    }
}
