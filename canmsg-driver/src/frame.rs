//! Classic CAN frame object

use crate::core::{DataLength, Id, MAX_DATA_LENGTH};

/// Frame data encoded in the arbitration and control fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub id: Id,
    /// Remote transmission request. A remote frame carries no payload, but `length` is still
    /// transmitted as the requested data length code.
    pub remote_request: bool,
    pub length: DataLength,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// Classic CAN data vector
///
/// Holds up to 8 bytes. Dereferences to the meaningful prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: DataLength,
    bytes: [u8; MAX_DATA_LENGTH],
}

impl Data {
    /// Creates a new vector from a slice of compatible length.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        let length = DataLength::new(data.len()).ok_or(InvalidLength)?;
        let mut bytes = [0; MAX_DATA_LENGTH];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self { length, bytes })
    }

    /// Creates a vector of `length` bytes taken from the front of a full-size buffer.
    pub const fn from_array(bytes: [u8; MAX_DATA_LENGTH], length: DataLength) -> Self {
        Self { length, bytes }
    }

    pub const fn new_zeros(length: DataLength) -> Self {
        Self {
            length,
            bytes: [0; MAX_DATA_LENGTH],
        }
    }

    pub fn length(&self) -> DataLength {
        self.length
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..usize::from(self.length)]
    }
}

impl core::ops::DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes[..usize::from(self.length)]
    }
}

/// Classic CAN frame
///
/// `data.length()` should match `header.length` for data frames. Remote frames carry zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub header: Header,
    pub data: Data,
}

impl Frame {
    /// Creates a data frame. The header length is taken from `data`.
    pub fn new_data(id: Id, data: Data) -> Self {
        Self {
            header: Header {
                id,
                remote_request: false,
                length: data.length(),
            },
            data,
        }
    }

    /// Creates a remote frame requesting `length` bytes.
    pub fn new_remote(id: Id, length: DataLength) -> Self {
        Self {
            header: Header {
                id,
                remote_request: true,
                length,
            },
            data: Data::new_zeros(length),
        }
    }
}
